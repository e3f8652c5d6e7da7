//! Self-checks built on the canonical text form.

use crate::{parse, to_heart};
use resonate_common::{ContentHash, InternalError};
use resonate_diagnostics::Diagnostic;
use resonate_ir::Program;
use tracing::trace;

/// Checks that the program survives cloning and a trip through HEART text.
///
/// Prints the program, then compares that text with the printed form of a
/// deep copy and with the printed form of the re-parsed text. Any mismatch is
/// an internal error naming the first line that differs.
pub fn check_round_trip(program: &Program) -> Result<(), Diagnostic> {
    let text = to_heart(program);

    let copy = program.duplicate()?;
    compare("cloned", &text, &to_heart(&copy))?;

    let reparsed = parse(&text)?;
    compare("re-parsed", &text, &to_heart(&reparsed))?;

    trace!(bytes = text.len(), "HEART round trip succeeded");
    Ok(())
}

/// Fingerprints a program by its canonical HEART text.
pub fn program_hash(program: &Program) -> ContentHash {
    ContentHash::from_text(&to_heart(program))
}

fn compare(what: &str, expected: &str, actual: &str) -> Result<(), Diagnostic> {
    if expected == actual {
        return Ok(());
    }
    let (line, (want, got)) = expected
        .lines()
        .zip(actual.lines())
        .enumerate()
        .find(|(_, (a, b))| a != b)
        .unwrap_or((
            expected.lines().count().min(actual.lines().count()),
            ("<end of text>", "<end of text>"),
        ));
    let error = InternalError::new(format!(
        "{what} program differs from the original at line {}: expected `{want}`, found `{got}`",
        line + 1
    ));
    Err(Diagnostic::internal(&error))
}
