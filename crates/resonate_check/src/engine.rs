//! The check engine: an ordered registry of program checks.

use resonate_config::BuildSettings;
use resonate_diagnostics::Diagnostic;
use resonate_ir::Program;
use tracing::debug;

use crate::rules::register_builtin_rules;
use crate::{CheckContext, ProgramCheck};

/// Runs registered checks in registration order, stopping at the first
/// failure.
pub struct CheckEngine {
    checks: Vec<Box<dyn ProgramCheck>>,
}

impl CheckEngine {
    /// Creates an engine with every built-in check registered.
    pub fn new() -> Self {
        let mut engine = Self::empty();
        register_builtin_rules(&mut engine);
        engine
    }

    /// Creates an engine with no checks.
    pub fn empty() -> Self {
        Self { checks: Vec::new() }
    }

    /// Appends a check.
    pub fn register(&mut self, check: Box<dyn ProgramCheck>) {
        self.checks.push(check);
    }

    /// Returns the number of registered checks.
    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    /// Returns the names of all registered checks, in run order.
    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Runs every check against the program.
    pub fn run(&self, program: &Program, context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        for check in &self.checks {
            debug!(check = check.name(), "running check");
            check.check(program, context)?;
        }
        Ok(())
    }
}

impl Default for CheckEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs all built-in checks against a linked program.
pub fn check_program(program: &Program, settings: &BuildSettings) -> Result<(), Diagnostic> {
    let context = CheckContext::new(program, settings)?;
    CheckEngine::new().run(program, &context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_diagnostics::{Category, DiagnosticCode};
    use resonate_source::Span;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        name: &'static str,
        fail: bool,
        runs: Arc<AtomicUsize>,
    }

    impl ProgramCheck for Counting {
        fn code(&self) -> DiagnosticCode {
            DiagnosticCode::new(Category::Invariant, 399)
        }
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "a test check"
        }
        fn check(&self, _program: &Program, _context: &CheckContext<'_>) -> Result<(), Diagnostic> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Diagnostic::error(self.code(), "failed", Span::DUMMY))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn builtin_order() {
        let engine = CheckEngine::new();
        assert_eq!(
            engine.check_names(),
            vec![
                "module-structure",
                "advance-and-stream-calls",
                "connections",
                "recursion-and-stack",
                "infinite-loops",
                "block-parameters",
                "graph-cycles",
                "stream-operations",
                "function-return-types",
            ]
        );
    }

    #[test]
    fn stops_at_first_failure() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut engine = CheckEngine::empty();
        for (name, fail) in [("a", false), ("b", true), ("c", false)] {
            engine.register(Box::new(Counting {
                name,
                fail,
                runs: Arc::clone(&runs),
            }));
        }
        assert_eq!(engine.check_count(), 3);

        let program = Program::new();
        let settings = BuildSettings::default();
        let context = CheckContext::new(&program, &settings).unwrap();
        let err = engine.run(&program, &context).unwrap_err();
        assert_eq!(err.message, "failed");
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_program_passes() {
        check_program(&Program::new(), &BuildSettings::default()).unwrap();
    }
}
