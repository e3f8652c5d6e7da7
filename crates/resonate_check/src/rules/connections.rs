//! `connections`: every connection of every graph, re-resolved.

use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::Program;
use resonate_link::check_graph_connections;

use crate::{CheckContext, ProgramCheck};

/// Resolves and type-checks every connection against the linked program.
pub struct Connections;

impl ProgramCheck for Connections {
    fn code(&self) -> DiagnosticCode {
        resonate_link::errors::T201
    }

    fn name(&self) -> &str {
        "connections"
    }

    fn description(&self) -> &str {
        "connections join compatible endpoints with a legal delay"
    }

    fn check(&self, program: &Program, context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        for (id, _) in program.modules.iter().filter(|(_, m)| m.is_graph()) {
            check_graph_connections(program, id, context.settings)?;
        }
        Ok(())
    }
}
