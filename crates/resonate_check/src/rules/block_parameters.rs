//! `block-parameters`: branch arguments against block parameters.

use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::{BlockId, Expr, Function, Program, Terminator, TypeRules};
use resonate_source::Span;

use crate::errors;
use crate::{CheckContext, ProgramCheck};

/// Checks that every branch supplies arguments matching the target block's
/// parameters.
pub struct BlockParameters;

impl ProgramCheck for BlockParameters {
    fn code(&self) -> DiagnosticCode {
        errors::S308
    }

    fn name(&self) -> &str {
        "block-parameters"
    }

    fn description(&self) -> &str {
        "branch arguments match the parameters of their target blocks"
    }

    fn check(&self, program: &Program, _context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        for (id, function) in program.functions.iter() {
            let name = || program.function_full_name(id);

            if let Some(entry) = function.entry_block() {
                let entry = &function.blocks[entry];
                if !entry.parameters.is_empty() {
                    return Err(errors::entry_block_has_parameters(&name(), entry.span));
                }
            }

            for block in function.blocks.values() {
                for param in &block.parameters {
                    let ty = &program.variables[*param].ty;
                    if ty.is_void() || ty.is_reference() {
                        return Err(errors::invalid_block_parameter_type(
                            &block.name,
                            &program.type_description(ty),
                            block.span,
                        ));
                    }
                }
            }

            for block in function.blocks.values() {
                match &block.terminator {
                    Terminator::Branch { target, args } => {
                        check_branch(program, function, &name(), *target, args, block.span)?;
                    }
                    Terminator::BranchIf { targets, args, .. } => {
                        if args.iter().any(|a| !a.is_empty()) {
                            return Err(errors::branch_if_with_args_not_supported(&name(), block.span));
                        }
                        for target in targets {
                            check_branch(program, function, &name(), *target, &[], block.span)?;
                        }
                    }
                    Terminator::ReturnVoid | Terminator::ReturnValue(_) => {}
                }
            }
        }
        Ok(())
    }
}

fn check_branch(
    program: &Program,
    function: &Function,
    function_name: &str,
    target: BlockId,
    args: &[Expr],
    span: Span,
) -> Result<(), Diagnostic> {
    let block = function
        .blocks
        .try_get(target)
        .ok_or_else(|| errors::invalid_branch_target(function_name, span))?;
    if block.parameters.len() != args.len() {
        return Err(errors::wrong_number_of_block_args(
            &block.name,
            block.parameters.len(),
            args.len(),
            span,
        ));
    }
    for (param, arg) in block.parameters.iter().zip(args) {
        let expected = &program.variables[*param].ty;
        let found = program.expr_type(arg);
        if !TypeRules::can_silently_cast(expected, &found) {
            return Err(errors::wrong_type_for_block_arg(
                &block.name,
                &program.type_description(expected),
                &program.type_description(&found),
                span,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::{code, run};
    use resonate_ir::{Block, FunctionKind, ModuleKind, Type, Variable, VariableRole};

    const SELECT: &str = "#HEART 1
namespace M
{
    function select (bool $c, int32 $x) -> int64
    {
        @block_0:
            branch_if $c ? @yes : @no;
        @yes:
            branch @done ($x);
        @no:
            branch @done (0);
        @done (int64 $r):
            return $r;
    }
}
";

    #[test]
    fn matching_arguments() {
        run(&BlockParameters, SELECT).unwrap();
    }

    #[test]
    fn argument_mismatches() {
        let count = SELECT.replace("branch @done (0);", "branch @done (0, 1);");
        assert_eq!(code(&BlockParameters, &count), "S308");
        let ty = SELECT.replace("branch @done (0);", "branch @done (1.5);");
        let err = run(&BlockParameters, &ty).unwrap_err();
        assert_eq!(err.code, errors::T305);
        assert!(err.message.contains("float64"));
        let conditional = SELECT.replace("? @yes : @no;", "? @yes : @done ($x);");
        assert_eq!(code(&BlockParameters, &conditional), "U302");
    }

    #[test]
    fn parameter_types() {
        let void = SELECT.replace("@done (int64 $r):\n            return $r;", "@done (void $r):\n            return;");
        assert_eq!(code(&BlockParameters, &void), "T304");
    }

    #[test]
    fn entry_parameters_and_foreign_targets() {
        let mut program = Program::new();
        let module = program.add_module(ModuleKind::Namespace, "M");
        let mut function = Function::new("f", module, FunctionKind::Normal, Type::void());
        let mut entry = Block::new("@entry");
        entry.parameters.push(
            program
                .variables
                .alloc(Variable::new("p", Type::int32(), VariableRole::Parameter)),
        );
        function.blocks.alloc(entry);
        program.add_function(function);

        let settings = resonate_config::BuildSettings::default();
        let context = CheckContext::new(&program, &settings).unwrap();
        let err = BlockParameters.check(&program, &context).unwrap_err();
        assert_eq!(err.code, errors::S307);

        let f = program.find_function_by_path("M::f").unwrap();
        let function = &mut program.functions[f];
        function.blocks[BlockId::from_raw(0)].parameters.clear();
        function.blocks[BlockId::from_raw(0)].terminator = Terminator::Branch {
            target: BlockId::from_raw(7),
            args: Vec::new(),
        };
        let err = BlockParameters.check(&program, &context).unwrap_err();
        assert_eq!(err.code, errors::S309);
    }
}
