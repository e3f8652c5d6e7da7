//! `infinite-loops`: loops that can neither exit nor advance.

use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::Program;
use resonate_link::check_infinite_loops;

use crate::{CheckContext, ProgramCheck};

/// Rejects functions in which no path from the entry returns or advances.
pub struct InfiniteLoops;

impl ProgramCheck for InfiniteLoops {
    fn code(&self) -> DiagnosticCode {
        resonate_link::errors::I204
    }

    fn name(&self) -> &str {
        "infinite-loops"
    }

    fn description(&self) -> &str {
        "every function can return or advance"
    }

    fn check(&self, program: &Program, _context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        check_infinite_loops(program)
    }
}
