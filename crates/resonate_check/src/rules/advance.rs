//! `advance-and-stream-calls`: who may advance, and who may call runtime
//! entry points.

use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::{FunctionKind, Program, Statement};
use resonate_link::call_graph::function_calls;

use crate::errors;
use crate::{CheckContext, ProgramCheck};

/// Checks the placement of `advance` and of calls to `run`, `init` and
/// event functions.
///
/// Every processor's `run` must advance, and nothing else may. Runtime
/// entry points are only called by the generated initialiser. The user
/// initialiser runs before any frame exists, so it may not touch endpoints.
pub struct AdvanceAndStreamCalls;

impl ProgramCheck for AdvanceAndStreamCalls {
    fn code(&self) -> DiagnosticCode {
        errors::I301
    }

    fn name(&self) -> &str {
        "advance-and-stream-calls"
    }

    fn description(&self) -> &str {
        "advance is only called from run, and runtime entry points are not called directly"
    }

    fn check(&self, program: &Program, _context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        for (id, function) in program.functions.iter() {
            let module = &program.modules[function.module];
            let is_processor_run = module.is_processor() && function.kind == FunctionKind::Run;

            if is_processor_run && function.has_body() && !function.calls_advance() {
                return Err(errors::run_function_must_call_advance(&module.full_name, function.span));
            }
            if function.calls_advance() && !is_processor_run {
                return Err(errors::advance_outside_run(
                    &program.function_full_name(id),
                    function.span,
                ));
            }

            if function.kind != FunctionKind::SystemInit {
                let entry_point = function_calls(function)
                    .into_iter()
                    .find(|callee| program.functions[*callee].kind.is_runtime_entry_point());
                if let Some(callee) = entry_point {
                    return Err(errors::cannot_call_runtime_function(
                        &program.function_full_name(callee),
                        &program.function_full_name(id),
                        function.span,
                    ));
                }
            }

            if function.kind == FunctionKind::UserInit {
                let touches_endpoints = function.statements().any(|s| {
                    matches!(s, Statement::ReadStream { .. } | Statement::WriteStream { .. })
                });
                if touches_endpoints {
                    return Err(errors::streams_used_in_init(
                        &program.function_full_name(id),
                        function.span,
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::{code, run};

    fn processor(functions: &str) -> String {
        format!(
            "#HEART 1
processor P
{{
    input in stream float32;
    output out stream float32;
    var float32 level;
{functions}}}
"
        )
    }

    const RUN: &str = "    function run () -> void
    {
        @block_0:
            advance;
            branch @block_0;
    }
";

    #[test]
    fn run_advances() {
        run(&AdvanceAndStreamCalls, &processor(RUN)).unwrap();
        let without = "    function run () -> void\n    {\n        @block_0:\n            return;\n    }\n";
        assert_eq!(code(&AdvanceAndStreamCalls, &processor(without)), "I301");
    }

    #[test]
    fn advance_only_in_run() {
        let helper = "    function step () -> void\n    {\n        @block_0:\n            advance;\n            return;\n    }\n";
        let err = run(&AdvanceAndStreamCalls, &processor(&format!("{RUN}{helper}"))).unwrap_err();
        assert_eq!(err.code, errors::I302);
        assert!(err.message.contains("'P::step'"));

        let graph = "#HEART 1\ngraph G\n{\n    output o stream float32;\n    function run () -> void\n    {\n        @block_0:\n            advance;\n            branch @block_0;\n    }\n}\n";
        assert_eq!(code(&AdvanceAndStreamCalls, graph), "I302");
    }

    #[test]
    fn entry_points_are_not_called() {
        let caller = "    function helper () -> void\n    {\n        @block_0:\n            call P::run ();\n            return;\n    }\n";
        let err = run(&AdvanceAndStreamCalls, &processor(&format!("{RUN}{caller}"))).unwrap_err();
        assert_eq!(err.code, errors::I303);
        assert!(err.message.contains("'P::run' cannot be called from 'P::helper'"));

        let system_init = "    function _init () -> void\n    {\n        @block_0:\n            call P::init ();\n            return;\n    }\n    function init () -> void\n    {\n        @block_0:\n            P::level = 1.0f;\n            return;\n    }\n";
        run(&AdvanceAndStreamCalls, &processor(&format!("{RUN}{system_init}"))).unwrap();
    }

    #[test]
    fn init_does_not_touch_endpoints() {
        let init = "    function init () -> void\n    {\n        @block_0:\n            write out 0.0f;\n            return;\n    }\n";
        assert_eq!(
            code(&AdvanceAndStreamCalls, &processor(&format!("{RUN}{init}"))),
            "I304"
        );
    }
}
