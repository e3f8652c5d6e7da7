//! `function-return-types`: functions return values, not references.

use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::Program;

use crate::errors;
use crate::{CheckContext, ProgramCheck};

/// Rejects functions declared to return a reference.
pub struct FunctionReturnTypes;

impl ProgramCheck for FunctionReturnTypes {
    fn code(&self) -> DiagnosticCode {
        errors::T307
    }

    fn name(&self) -> &str {
        "function-return-types"
    }

    fn description(&self) -> &str {
        "no function returns a reference"
    }

    fn check(&self, program: &Program, _context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        match program.functions.iter().find(|(_, f)| f.return_type.is_reference()) {
            Some((id, function)) => Err(errors::reference_return_type(
                &program.function_full_name(id),
                function.span,
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::{code, run};

    #[test]
    fn reference_returns() {
        let text = "#HEART 1
namespace M
{
    function get (float32& $x) -> float32
    {
        @block_0:
            return $x;
    }
}
";
        run(&FunctionReturnTypes, text).unwrap();
        assert_eq!(code(&FunctionReturnTypes, &text.replace("-> float32\n", "-> float32&\n")), "T307");
    }
}
