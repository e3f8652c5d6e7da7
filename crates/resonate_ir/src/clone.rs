//! Deep copies of module sets with every internal reference remapped.
//!
//! Cloning runs in two phases. The first creates placeholder structs and
//! functions so that forward and mutual references have something to map
//! to. The second fills in endpoints, instances, connections, variables
//! and function bodies through the maps built in the first.

use crate::annotation::Annotation;
use crate::connection::{Connection, EndpointRef};
use crate::endpoint::{Endpoint, EndpointDetails};
use crate::function::{Block, Function};
use crate::ids::{BlockId, ConstantId, FunctionId, InstanceId, ModuleId, StructId, VariableId};
use crate::instance::ProcessorInstance;
use crate::program::Program;
use crate::stmt::{Expr, Statement, SubElementIndex, Terminator};
use crate::types::{StructMember, Type};
use crate::variable::Variable;
use resonate_common::{Ident, InternalError, InternalResult};
use std::collections::HashMap;
use tracing::debug;

struct ModuleCloner<'s, 'd> {
    source: &'s Program,
    dest: &'d mut Program,
    keep_external: bool,
    modules: HashMap<ModuleId, ModuleId>,
    structs: HashMap<StructId, StructId>,
    functions: HashMap<FunctionId, FunctionId>,
    variables: HashMap<VariableId, VariableId>,
    blocks: HashMap<BlockId, BlockId>,
    instances: HashMap<InstanceId, InstanceId>,
}

/// Copies `modules` from `source` into `dest`, keeping their names.
///
/// Every reference inside the copied modules must point at something in
/// the copied set. One that does not is an internal error.
pub fn clone_modules(
    source: &Program,
    modules: &[ModuleId],
    dest: &mut Program,
) -> InternalResult<Vec<ModuleId>> {
    let mut cloner = ModuleCloner::new(source, dest, false);
    cloner.run(modules, &HashMap::new())
}

/// Copies one module within `program` under a new name.
///
/// References from the module to anything outside it are kept unchanged.
pub fn specialise_module(
    program: &mut Program,
    module: ModuleId,
    new_name: &str,
) -> InternalResult<ModuleId> {
    let snapshot = program.clone();
    let renames = HashMap::from([(module, new_name.to_string())]);
    let mut cloner = ModuleCloner::new(&snapshot, program, true);
    let cloned = cloner.run(&[module], &renames)?;
    let id = cloned
        .first()
        .copied()
        .ok_or_else(|| InternalError::new("module clone produced no module"))?;
    debug!(from = %snapshot.modules[module].full_name, to = new_name, "cloned module");
    Ok(id)
}

impl Program {
    /// Returns an independent copy of the whole program.
    pub fn duplicate(&self) -> InternalResult<Program> {
        let mut copy = Program::new();
        let all: Vec<ModuleId> = self.modules.ids().collect();
        clone_modules(self, &all, &mut copy)?;
        Ok(copy)
    }
}

impl<'s, 'd> ModuleCloner<'s, 'd> {
    fn new(source: &'s Program, dest: &'d mut Program, keep_external: bool) -> Self {
        Self {
            source,
            dest,
            keep_external,
            modules: HashMap::new(),
            structs: HashMap::new(),
            functions: HashMap::new(),
            variables: HashMap::new(),
            blocks: HashMap::new(),
            instances: HashMap::new(),
        }
    }

    fn run(
        &mut self,
        modules: &[ModuleId],
        renames: &HashMap<ModuleId, String>,
    ) -> InternalResult<Vec<ModuleId>> {
        let source = self.source;

        for &m in modules {
            let module = &source.modules[m];
            let name = renames.get(&m).unwrap_or(&module.full_name);
            let new_id = self.dest.add_module(module.kind, name.clone());
            self.dest.modules[new_id].span = module.span;
            self.modules.insert(m, new_id);
        }

        for &m in modules {
            let new_module = self.map_module(m)?;
            for &s in &source.modules[m].structs {
                let original = &source.structs[s];
                let new_id = self.dest.add_struct(new_module, original.name.clone());
                self.dest.structs[new_id].span = original.span;
                self.structs.insert(s, new_id);
            }
        }

        for &m in modules {
            for &s in &source.modules[m].structs {
                let members = source.structs[s]
                    .members
                    .iter()
                    .map(|member| {
                        Ok(StructMember {
                            name: member.name.clone(),
                            ty: self.map_type(&member.ty)?,
                        })
                    })
                    .collect::<InternalResult<Vec<_>>>()?;
                let new_id = self.map_struct(s)?;
                self.dest.structs[new_id].members = members;
            }
        }

        for &m in modules {
            self.clone_module_variables(m)?;
        }

        for &m in modules {
            for &f in &source.modules[m].functions {
                self.create_function_placeholder(f)?;
            }
        }

        for &m in modules {
            self.clone_module_contents(m)?;
        }

        modules.iter().map(|m| self.map_module(*m)).collect()
    }

    fn create_function_placeholder(&mut self, f: FunctionId) -> InternalResult<()> {
        let source = self.source;
        let original = &source.functions[f];
        let mut function = Function::new(
            original.name.clone(),
            self.map_module(original.module)?,
            original.kind,
            self.map_type(&original.return_type)?,
        );
        function.annotation = self.map_annotation(&original.annotation)?;
        function.span = original.span;
        for &p in &original.parameters {
            function.parameters.push(self.clone_variable(p)?);
        }
        for &l in &original.locals {
            function.locals.push(self.clone_variable(l)?);
        }
        let new_id = self.dest.add_function(function);
        self.functions.insert(f, new_id);
        Ok(())
    }

    /// Function bodies may name state variables of any cloned module, so
    /// these are all mapped before the first body is copied.
    fn clone_module_variables(&mut self, m: ModuleId) -> InternalResult<()> {
        let source = self.source;
        let original = &source.modules[m];
        let target = self.map_module(m)?;
        for &v in &original.specialisation_params {
            let new_id = self.clone_variable(v)?;
            self.dest.modules[target].specialisation_params.push(new_id);
        }
        for &v in &original.state_variables {
            let new_id = self.clone_variable(v)?;
            self.dest.modules[target].state_variables.push(new_id);
        }
        Ok(())
    }

    fn clone_module_contents(&mut self, m: ModuleId) -> InternalResult<()> {
        let source = self.source;
        let original = &source.modules[m];
        let target = self.map_module(m)?;
        self.dest.modules[target].annotation = self.map_annotation(&original.annotation)?;

        for endpoint in original.endpoints.values() {
            let details = endpoint
                .details
                .as_ref()
                .map(|d| {
                    Ok::<_, InternalError>(EndpointDetails {
                        kind: d.kind,
                        data_types: d
                            .data_types
                            .iter()
                            .map(|t| self.map_type(t))
                            .collect::<InternalResult<_>>()?,
                        array_size: d.array_size,
                    })
                })
                .transpose()?;
            let copy = Endpoint {
                name: endpoint.name.clone(),
                direction: endpoint.direction,
                details,
                annotation: self.map_annotation(&endpoint.annotation)?,
                hoisted_path: endpoint.hoisted_path.clone(),
                needs_exposure: endpoint.needs_exposure,
                span: endpoint.span,
            };
            self.dest.modules[target].add_endpoint(copy);
        }

        self.instances.clear();
        for (id, instance) in original.instances.iter() {
            let copy = ProcessorInstance {
                name: instance.name.clone(),
                source_name: instance.source_name.clone(),
                specialisation_args: instance
                    .specialisation_args
                    .iter()
                    .map(|c| self.map_constant(*c))
                    .collect::<InternalResult<_>>()?,
                array_size: instance.array_size,
                clock_ratio: instance.clock_ratio,
                span: instance.span,
            };
            let new_id = self.dest.modules[target].add_instance(copy);
            self.instances.insert(id, new_id);
        }

        for connection in original.connections.values() {
            let copy = Connection {
                source: self.map_endpoint_ref(&connection.source)?,
                dest: self.map_endpoint_ref(&connection.dest)?,
                interpolation: connection.interpolation,
                delay_length: connection.delay_length,
                span: connection.span,
            };
            self.dest.modules[target].add_connection(copy);
        }

        for &f in &original.functions {
            self.clone_function_body(f)?;
        }
        Ok(())
    }

    fn clone_function_body(&mut self, f: FunctionId) -> InternalResult<()> {
        let source = self.source;
        let original = &source.functions[f];
        let target = self.map_function(f)?;
        self.blocks.clear();

        for (id, block) in original.blocks.iter() {
            let mut copy = Block::new(block.name.clone());
            copy.span = block.span;
            for &p in &block.parameters {
                copy.parameters.push(self.clone_variable(p)?);
            }
            let new_id = self.dest.functions[target].blocks.alloc(copy);
            self.blocks.insert(id, new_id);
        }

        for (id, block) in original.blocks.iter() {
            let statements = block
                .statements
                .iter()
                .map(|s| self.map_statement(s))
                .collect::<InternalResult<Vec<_>>>()?;
            let terminator = self.map_terminator(&block.terminator)?;
            let new_id = self.map_block(id)?;
            let copy = &mut self.dest.functions[target].blocks[new_id];
            copy.statements = statements;
            copy.terminator = terminator;
        }
        Ok(())
    }

    fn clone_variable(&mut self, v: VariableId) -> InternalResult<VariableId> {
        let source = self.source;
        let original = &source.variables[v];
        let copy = Variable {
            name: original.name.clone(),
            ty: self.map_type(&original.ty)?,
            role: original.role,
            initial_value: original
                .initial_value
                .map(|c| self.map_constant(c))
                .transpose()?,
            annotation: self.map_annotation(&original.annotation)?,
            span: original.span,
        };
        let new_id = self.dest.add_variable(copy);
        self.variables.insert(v, new_id);
        Ok(new_id)
    }

    fn map_statement(&mut self, statement: &Statement) -> InternalResult<Statement> {
        Ok(match statement {
            Statement::Assign { target, value } => Statement::Assign {
                target: self.map_expr(target)?,
                value: self.map_expr(value)?,
            },
            Statement::Call {
                target,
                function,
                args,
            } => Statement::Call {
                target: target.as_ref().map(|t| self.map_expr(t)).transpose()?,
                function: self.map_function(*function)?,
                args: self.map_exprs(args)?,
            },
            Statement::ReadStream { target, endpoint } => Statement::ReadStream {
                target: self.map_expr(target)?,
                endpoint: endpoint.clone(),
            },
            Statement::WriteStream {
                endpoint,
                element,
                value,
            } => Statement::WriteStream {
                endpoint: endpoint.clone(),
                element: element.as_ref().map(|e| self.map_expr(e)).transpose()?,
                value: self.map_expr(value)?,
            },
            Statement::AdvanceClock => Statement::AdvanceClock,
        })
    }

    fn map_terminator(&mut self, terminator: &Terminator) -> InternalResult<Terminator> {
        Ok(match terminator {
            Terminator::Branch { target, args } => Terminator::Branch {
                target: self.map_block(*target)?,
                args: self.map_exprs(args)?,
            },
            Terminator::BranchIf {
                condition,
                targets,
                args,
            } => Terminator::BranchIf {
                condition: self.map_expr(condition)?,
                targets: [self.map_block(targets[0])?, self.map_block(targets[1])?],
                args: [self.map_exprs(&args[0])?, self.map_exprs(&args[1])?],
            },
            Terminator::ReturnVoid => Terminator::ReturnVoid,
            Terminator::ReturnValue(value) => Terminator::ReturnValue(self.map_expr(value)?),
        })
    }

    fn map_exprs(&mut self, exprs: &[Expr]) -> InternalResult<Vec<Expr>> {
        exprs.iter().map(|e| self.map_expr(e)).collect()
    }

    fn map_expr(&mut self, expr: &Expr) -> InternalResult<Expr> {
        Ok(match expr {
            Expr::Variable(v) => Expr::Variable(self.map_variable(*v)?),
            Expr::Constant(c) => Expr::Constant(self.map_constant(*c)?),
            Expr::SubElement { parent, index } => Expr::SubElement {
                parent: Box::new(self.map_expr(parent)?),
                index: match index {
                    SubElementIndex::Dynamic(e) => {
                        SubElementIndex::Dynamic(Box::new(self.map_expr(e)?))
                    }
                    other => other.clone(),
                },
            },
            Expr::Cast { ty, source } => Expr::Cast {
                ty: self.map_type(ty)?,
                source: Box::new(self.map_expr(source)?),
            },
            Expr::Unary { op, source } => Expr::Unary {
                op: *op,
                source: Box::new(self.map_expr(source)?),
            },
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: Box::new(self.map_expr(lhs)?),
                rhs: Box::new(self.map_expr(rhs)?),
            },
            Expr::PureCall { function, args } => Expr::PureCall {
                function: self.map_function(*function)?,
                args: self.map_exprs(args)?,
            },
            Expr::ProcessorProperty(p) => Expr::ProcessorProperty(*p),
        })
    }

    fn map_endpoint_ref(&self, r: &EndpointRef) -> InternalResult<EndpointRef> {
        let processor = match r.processor {
            Some(id) => Some(*self.instances.get(&id).ok_or_else(|| {
                InternalError::new(format!("connection refers to unknown instance {}", id.as_raw()))
            })?),
            None => None,
        };
        Ok(EndpointRef {
            processor,
            endpoint: r.endpoint.clone(),
            index: r.index,
        })
    }

    fn map_annotation(&mut self, annotation: &Annotation) -> InternalResult<Annotation> {
        annotation.try_map_constants(&mut |c| self.map_constant(c))
    }

    fn map_constant(&mut self, id: ConstantId) -> InternalResult<ConstantId> {
        let source = self.source;
        let rewritten = source
            .constants
            .get(id)
            .try_rewrite(&mut |ty| self.map_type(ty), &mut |s| self.map_string(s))?;
        Ok(self.dest.intern(rewritten))
    }

    fn map_string(&self, ident: Ident) -> InternalResult<Ident> {
        let text = self
            .source
            .strings
            .try_resolve(ident)
            .ok_or_else(|| InternalError::new(format!("unknown string handle {}", ident.as_raw())))?;
        Ok(self.dest.strings.intern(text))
    }

    fn map_type(&self, ty: &Type) -> InternalResult<Type> {
        ty.try_map_structs(&mut |s| self.map_struct(s))
    }

    fn map_module(&self, id: ModuleId) -> InternalResult<ModuleId> {
        remap(&self.modules, id, self.keep_external, "module", |id| {
            self.source.modules[id].full_name.clone()
        })
    }

    fn map_struct(&self, id: StructId) -> InternalResult<StructId> {
        remap(&self.structs, id, self.keep_external, "struct", |id| {
            self.source.struct_full_name(id)
        })
    }

    fn map_function(&self, id: FunctionId) -> InternalResult<FunctionId> {
        remap(&self.functions, id, self.keep_external, "function", |id| {
            self.source.function_full_name(id)
        })
    }

    fn map_variable(&self, id: VariableId) -> InternalResult<VariableId> {
        remap(&self.variables, id, self.keep_external, "variable", |id| {
            self.source.variables[id].name.clone()
        })
    }

    fn map_block(&self, id: BlockId) -> InternalResult<BlockId> {
        self.blocks
            .get(&id)
            .copied()
            .ok_or_else(|| InternalError::new(format!("branch to unknown block {}", id.as_raw())))
    }
}

fn remap<I: Copy + Eq + std::hash::Hash>(
    map: &HashMap<I, I>,
    id: I,
    keep_external: bool,
    what: &str,
    name: impl Fn(I) -> String,
) -> InternalResult<I> {
    match map.get(&id) {
        Some(mapped) => Ok(*mapped),
        None if keep_external => Ok(id),
        None => Err(InternalError::new(format!(
            "{what} '{}' is outside the cloned modules",
            name(id)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::endpoint::{EndpointDirection, EndpointKind};
    use crate::module::ModuleKind;
    use crate::value::Value;
    use crate::variable::VariableRole;
    use resonate_source::Span;

    fn voice_program() -> (Program, ModuleId, StructId) {
        let mut program = Program::new();
        let m = program.add_module(ModuleKind::Processor, "Voice");
        let state = program.add_struct(m, "State");
        program
            .add_struct_member(state, "phase", Type::float32(), Span::DUMMY)
            .unwrap();
        let zero = program.intern(Value::Zero(Type::Struct(state)));
        let mut var = Variable::new("s", Type::Struct(state), VariableRole::State);
        var.initial_value = Some(zero);
        let s = program.add_state_variable(m, var);
        program.modules[m].add_endpoint(Endpoint::new(
            "out",
            EndpointDirection::Output,
            EndpointDetails::new(EndpointKind::Stream, Type::float32()),
        ));

        let mut b = FunctionBuilder::new(&mut program, m, "run", Type::void());
        let tmp = b.add_local("tmp", Type::Struct(state));
        let body = b.add_block("@loop");
        b.branch(body, vec![]);
        b.begin_block(body);
        b.assign(Expr::Variable(tmp), Expr::Variable(s));
        b.write_stream("out", None, Expr::Variable(tmp).member("phase"));
        b.advance();
        b.branch(body, vec![]);
        b.finish();
        (program, m, state)
    }

    #[test]
    fn specialise_remaps_structs_and_variables() {
        let (mut program, voice, state) = voice_program();
        let copy = specialise_module(&mut program, voice, "Voice_specialised_0").unwrap();
        assert_eq!(program.modules[copy].full_name, "Voice_specialised_0");

        let new_state = program.modules[copy].structs[0];
        assert_ne!(new_state, state);
        let new_var = program.modules[copy].state_variables[0];
        assert_eq!(program.variables[new_var].ty, Type::Struct(new_state));
        let init = program.variables[new_var].initial_value.unwrap();
        assert_eq!(program.constant(init), &Value::Zero(Type::Struct(new_state)));

        let run = program.find_function(copy, "run").unwrap();
        let f = &program.functions[run];
        let loop_block = f.find_block("@loop").unwrap();
        match &f.blocks[loop_block].statements[0] {
            Statement::Assign { value, .. } => assert_eq!(value, &Expr::Variable(new_var)),
            other => panic!("unexpected statement {other:?}"),
        }
        match &f.blocks[loop_block].terminator {
            Terminator::Branch { target, .. } => assert_eq!(*target, loop_block),
            other => panic!("unexpected terminator {other:?}"),
        }
        assert_eq!(program.modules[voice].functions.len(), 1);
    }

    #[test]
    fn duplicate_is_independent() {
        let (program, voice, _) = voice_program();
        let mut copy = program.duplicate().unwrap();
        assert_eq!(copy.modules.len(), program.modules.len());
        assert_eq!(copy.functions.len(), program.functions.len());

        let var = copy.modules[voice].state_variables[0];
        let one = copy.intern(Value::Int32(1));
        copy.variables[var].initial_value = Some(one);
        let original = program.modules[voice].state_variables[0];
        assert_ne!(program.variables[original].initial_value, Some(one));
    }

    #[test]
    fn body_may_read_a_later_module_variable() {
        let mut program = Program::new();
        let p = program.add_module(ModuleKind::Processor, "P");
        let n = program.add_module(ModuleKind::Namespace, "N");
        let x = program.add_state_variable(
            n,
            Variable::new("x", Type::float32(), VariableRole::State),
        );
        let mut b = FunctionBuilder::new(&mut program, p, "run", Type::void());
        b.write_stream("out", None, Expr::Variable(x));
        b.advance();
        b.return_void();
        let run = b.finish();

        let copy = program.duplicate().unwrap();
        let mapped = copy.modules[n].state_variables[0];
        assert_eq!(copy.variables[mapped].name, "x");
        let written = copy.functions[run]
            .blocks
            .iter()
            .flat_map(|(_, block)| block.statements.iter())
            .find_map(|s| match s {
                Statement::WriteStream { value, .. } => Some(value.clone()),
                _ => None,
            });
        assert_eq!(written, Some(Expr::Variable(mapped)));
    }

    #[test]
    fn connections_follow_instance_map() {
        let mut program = Program::new();
        let g = program.add_module(ModuleKind::Graph, "G");
        let a = program.modules[g].add_instance(ProcessorInstance::new("a", "Voice"));
        let b = program.modules[g].add_instance(ProcessorInstance::new("b", "Voice"));
        program.modules[g].add_connection(Connection::new(
            EndpointRef::child(b, "out"),
            EndpointRef::child(a, "in"),
        ));
        let copy = specialise_module(&mut program, g, "G2").unwrap();
        let conn = program.modules[copy].connections.values().next().unwrap();
        assert_eq!(conn.source.processor, Some(b));
        assert_eq!(conn.dest.processor, Some(a));
        assert_eq!(program.modules[copy].instances.len(), 2);
    }

    #[test]
    fn strings_are_reinterned() {
        let mut program = Program::new();
        let m = program.add_module(ModuleKind::Processor, "P");
        program.strings.intern("unused");
        let text = program.strings.intern("gain");
        let label = program.intern(Value::String(text));
        program.modules[m].annotation.set("name", label);
        let copy = program.duplicate().unwrap();
        let id = copy.modules[m].annotation.get("name").unwrap();
        match copy.constant(id) {
            Value::String(s) => assert_eq!(copy.strings.resolve(*s), "gain"),
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn cross_program_escape_is_internal_error() {
        let mut program = Program::new();
        let lib = program.add_module(ModuleKind::Namespace, "Lib");
        let helper = FunctionBuilder::new(&mut program, lib, "helper", Type::void()).finish();
        let user = program.add_module(ModuleKind::Processor, "User");
        let mut b = FunctionBuilder::new(&mut program, user, "run", Type::void());
        b.call(None, helper, vec![]);
        b.finish();

        let mut dest = Program::new();
        let err = clone_modules(&program, &[user], &mut dest).unwrap_err();
        assert!(err.message.contains("Lib::helper"));
    }
}
