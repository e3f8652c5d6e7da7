//! Built-in program checks, in the order they run.

mod advance;
mod block_parameters;
mod connections;
mod graph_cycles;
mod infinite_loops;
mod module_structure;
mod recursion;
mod return_types;
mod stream_operations;

pub use advance::AdvanceAndStreamCalls;
pub use block_parameters::BlockParameters;
pub use connections::Connections;
pub use graph_cycles::GraphCycles;
pub use infinite_loops::InfiniteLoops;
pub use module_structure::ModuleStructure;
pub use recursion::RecursionAndStack;
pub use return_types::FunctionReturnTypes;
pub use stream_operations::StreamOperations;

use crate::CheckEngine;

/// Registers the nine built-in checks with the engine.
///
/// Later checks rely on earlier ones: connections are only resolved once
/// every endpoint is known to be well formed, and the stack size is only
/// computed for a call graph without cycles.
pub fn register_builtin_rules(engine: &mut CheckEngine) {
    engine.register(Box::new(ModuleStructure));
    engine.register(Box::new(AdvanceAndStreamCalls));
    engine.register(Box::new(Connections));
    engine.register(Box::new(RecursionAndStack));
    engine.register(Box::new(InfiniteLoops));
    engine.register(Box::new(BlockParameters));
    engine.register(Box::new(GraphCycles));
    engine.register(Box::new(StreamOperations));
    engine.register(Box::new(FunctionReturnTypes));
}

#[cfg(test)]
pub(crate) mod fixtures {
    use resonate_config::BuildSettings;
    use resonate_diagnostics::Diagnostic;
    use resonate_ir::Program;

    use crate::{CheckContext, ProgramCheck};

    /// Parses HEART text and runs one check with default settings.
    pub fn run(check: &dyn ProgramCheck, text: &str) -> Result<(), Diagnostic> {
        run_with(check, text, &BuildSettings::default())
    }

    /// Parses HEART text and runs one check.
    pub fn run_with(check: &dyn ProgramCheck, text: &str, settings: &BuildSettings) -> Result<(), Diagnostic> {
        let program: Program = resonate_heart::parse(text).unwrap();
        let context = CheckContext::new(&program, settings).unwrap();
        check.check(&program, &context)
    }

    /// Returns the code of the check's failure as text.
    pub fn code(check: &dyn ProgramCheck, text: &str) -> String {
        run(check, text).unwrap_err().code.to_string()
    }
}
