//! `stream-operations`: reads from inputs and writes to outputs.

use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::{EndpointKind, Expr, Function, FunctionKind, Module, Program, Statement};
use resonate_source::Span;

use crate::errors;
use crate::{CheckContext, ProgramCheck};

/// Checks every endpoint read and write against the endpoint's direction,
/// kind, types and array size, and against the function doing it.
///
/// Streams and values are only touched by `run`. Events may be sent from
/// any function except the initialisers.
pub struct StreamOperations;

impl ProgramCheck for StreamOperations {
    fn code(&self) -> DiagnosticCode {
        errors::I305
    }

    fn name(&self) -> &str {
        "stream-operations"
    }

    fn description(&self) -> &str {
        "endpoint reads and writes happen in the right functions with the right types"
    }

    fn check(&self, program: &Program, _context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        for (id, function) in program.functions.iter() {
            let module = &program.modules[function.module];
            let op = Operation {
                program,
                module,
                function,
                function_name: program.function_full_name(id),
            };
            for block in function.blocks.values() {
                for statement in &block.statements {
                    match statement {
                        Statement::ReadStream { endpoint, .. } => op.check_read(endpoint, block.span)?,
                        Statement::WriteStream {
                            endpoint,
                            element,
                            value,
                        } => op.check_write(endpoint, element.as_ref(), value, block.span)?,
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

struct Operation<'a> {
    program: &'a Program,
    module: &'a Module,
    function: &'a Function,
    function_name: String,
}

impl Operation<'_> {
    fn check_read(&self, name: &str, span: Span) -> Result<(), Diagnostic> {
        let kind = self
            .module
            .find_input(name)
            .and_then(|id| self.module.endpoints[id].kind());
        if !matches!(kind, Some(EndpointKind::Stream | EndpointKind::Value)) {
            return Err(errors::cannot_read_from(name, span));
        }
        if self.function.kind != FunctionKind::Run {
            return Err(errors::read_outside_run(name, &self.function_name, span));
        }
        Ok(())
    }

    fn check_write(&self, name: &str, element: Option<&Expr>, value: &Expr, span: Span) -> Result<(), Diagnostic> {
        let details = self
            .module
            .find_output(name)
            .and_then(|id| self.module.endpoints[id].details.as_ref())
            .ok_or_else(|| errors::cannot_write_to(name, span))?;

        match details.kind {
            EndpointKind::Event => {
                if matches!(self.function.kind, FunctionKind::UserInit | FunctionKind::SystemInit) {
                    return Err(errors::event_sent_from_init(name, &self.function_name, span));
                }
            }
            EndpointKind::Stream | EndpointKind::Value => {
                if self.function.kind != FunctionKind::Run {
                    return Err(errors::write_outside_run(name, &self.function_name, span));
                }
            }
        }

        if let Some(element) = element {
            let size = details
                .array_size
                .ok_or_else(|| errors::endpoint_index_invalid(name, span))?;
            if let Expr::Constant(c) = element {
                if let Some(index) = self.program.constant(*c).as_i64() {
                    if index < 0 || index >= i64::from(size) {
                        return Err(errors::endpoint_index_out_of_range(name, index, size, span));
                    }
                }
            }
        }

        let value_type = self.program.expr_type(value);
        let accepted = details.accepted_type(&value_type).is_some()
            || (element.is_none()
                && details.array_size.is_some()
                && value_type.element_count() == details.array_size
                && value_type
                    .element_type()
                    .is_some_and(|e| details.accepted_type(&e).is_some()));
        if !accepted {
            return Err(errors::wrong_type_for_endpoint(
                name,
                &self.program.type_description(&value_type),
                span,
            ));
        }
        Ok(())
    }
}
