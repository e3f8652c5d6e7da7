//! `recursion-and-stack`: call-graph recursion and stack budget.

use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::Program;
use resonate_link::{check_recursion, check_stack_size};

use crate::{CheckContext, ProgramCheck};

/// Rejects recursive calls and programs whose deepest call chain needs more
/// stack than the configured budget.
pub struct RecursionAndStack;

impl ProgramCheck for RecursionAndStack {
    fn code(&self) -> DiagnosticCode {
        resonate_link::errors::I201
    }

    fn name(&self) -> &str {
        "recursion-and-stack"
    }

    fn description(&self) -> &str {
        "no function is recursive and the call stack fits the budget"
    }

    fn check(&self, program: &Program, context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        check_recursion(program)?;
        check_stack_size(program, context.settings.max_stack_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::{code, run, run_with};
    use resonate_config::BuildSettings;

    const CHAIN: &str = "#HEART 1
namespace M
{
    function a (float64<8> $x) -> float64<8>
    {
        @block_0:
            return pure_call M::b ($x);
    }
    function b (float64<8> $x) -> float64<8>
    {
        @block_0:
            return $x;
    }
}
";

    #[test]
    fn chain_within_budget() {
        run(&RecursionAndStack, CHAIN).unwrap();
        let settings = BuildSettings {
            max_stack_size: 128,
            ..BuildSettings::default()
        };
        let err = run_with(&RecursionAndStack, CHAIN, &settings).unwrap_err();
        assert_eq!(err.code, resonate_link::errors::L202);
        assert!(err.message.contains("256 bytes"));
    }

    #[test]
    fn mutual_recursion() {
        let text = CHAIN.replace("return $x;", "return pure_call M::a ($x);");
        assert_eq!(code(&RecursionAndStack, &text), "I202");
    }
}
