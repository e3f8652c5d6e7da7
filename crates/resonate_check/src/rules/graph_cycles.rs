//! `graph-cycles`: feedback between instances without a delay.

use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::Program;
use resonate_link::check_graph_cycles;

use crate::{CheckContext, ProgramCheck};

/// Rejects graphs whose undelayed connections form a cycle.
///
/// Each graph is checked on its own. Nested graphs are checked when their
/// own module is visited.
pub struct GraphCycles;

impl ProgramCheck for GraphCycles {
    fn code(&self) -> DiagnosticCode {
        resonate_link::errors::G201
    }

    fn name(&self) -> &str {
        "graph-cycles"
    }

    fn description(&self) -> &str {
        "graphs contain no feedback loop without a delay"
    }

    fn check(&self, program: &Program, _context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        for (id, _) in program.modules.iter().filter(|(_, m)| m.is_graph()) {
            check_graph_cycles(program, id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::run;

    const LOOP: &str = "#HEART 1
processor P
{
    input in stream float32;
    output out stream float32;
}
graph G
{
    output out stream float32;
    node a = P;
    node b = P;
    connection a.out -> b.in;
    connection b.out -> a.in;
}
";

    #[test]
    fn feedback_needs_a_delay() {
        let err = run(&GraphCycles, LOOP).unwrap_err();
        assert_eq!(err.code, resonate_link::errors::G201);
        assert!(err.message.ends_with("a -> b -> a"));
        run(&GraphCycles, &LOOP.replace("b.out -> a.in", "b.out -> [1] -> a.in")).unwrap();
    }
}
