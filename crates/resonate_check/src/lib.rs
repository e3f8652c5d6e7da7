//! Whole-program verification of a linked resonate program.
//!
//! After specialisation and endpoint linking, the program is checked by an
//! ordered list of [`ProgramCheck`]s. The first failing check aborts
//! verification with a single diagnostic, since later checks assume the
//! invariants of earlier ones.
//!
//! [`link_and_verify`] runs the whole pipeline for one program and
//! [`verify_programs`] runs it for several independent programs in parallel.
//!
//! # Checks
//!
//! 1. `module-structure`: names, endpoint declarations, instances, the main module
//! 2. `advance-and-stream-calls`: where `advance` and runtime entry points may be called
//! 3. `connections`: every connection re-resolved and type-checked
//! 4. `recursion-and-stack`: no recursion, bounded call-stack
//! 5. `infinite-loops`: every loop can exit or advance
//! 6. `block-parameters`: branch arguments match block parameters
//! 7. `graph-cycles`: no feedback without a delay
//! 8. `stream-operations`: endpoint reads and writes
//! 9. `function-return-types`: no reference returns

#![warn(missing_docs)]

mod engine;
pub mod errors;
mod pipeline;
mod rules;

pub use engine::{check_program, CheckEngine};
pub use pipeline::{link_and_verify, verify_programs};
pub use rules::register_builtin_rules;
pub use rules::{
    AdvanceAndStreamCalls, BlockParameters, Connections, FunctionReturnTypes, GraphCycles,
    InfiniteLoops, ModuleStructure, RecursionAndStack, StreamOperations,
};

use resonate_config::BuildSettings;
use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::{ModuleId, Program};

/// One whole-program invariant.
///
/// A check reads the program and returns the first violation it finds.
pub trait ProgramCheck: Send + Sync {
    /// Returns the code of the check's most typical diagnostic.
    fn code(&self) -> DiagnosticCode;

    /// Returns the short kebab-case name of this check.
    fn name(&self) -> &str;

    /// Returns a human-readable description of what this check verifies.
    fn description(&self) -> &str;

    /// Checks the program, returning the first violation.
    fn check(&self, program: &Program, context: &CheckContext<'_>) -> Result<(), Diagnostic>;
}

/// Settings and derived facts shared by every check.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// The build limits.
    pub settings: &'a BuildSettings,
    /// The module the runtime will instantiate, if the program has one.
    pub main_module: Option<ModuleId>,
}

impl<'a> CheckContext<'a> {
    /// Selects the main module. A configured main processor that does not
    /// exist is an error.
    pub fn new(program: &Program, settings: &'a BuildSettings) -> Result<Self, Diagnostic> {
        let configured = settings.main_processor.as_deref();
        let main_module = program.main_module(configured);
        if let (Some(name), None) = (configured, main_module) {
            return Err(errors::cannot_find_main_processor(name));
        }
        Ok(Self {
            settings,
            main_module,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_heart::parse;

    #[test]
    fn main_module_selection() {
        let program = parse("#HEART 1\nnamespace L\n{\n}\nprocessor P\n{\n    output o stream float32;\n}\n").unwrap();
        let settings = BuildSettings::default();
        let context = CheckContext::new(&program, &settings).unwrap();
        assert_eq!(context.main_module, program.find_module("P"));

        let settings = BuildSettings {
            main_processor: Some("Q".into()),
            ..BuildSettings::default()
        };
        let err = CheckContext::new(&program, &settings).unwrap_err();
        assert_eq!(err.code, errors::R305);
    }
}
