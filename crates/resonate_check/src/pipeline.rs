//! The link-and-verify pipeline.

use rayon::prelude::*;
use resonate_config::BuildSettings;
use resonate_diagnostics::{Diagnostic, DiagnosticList};
use resonate_ir::Program;
use resonate_link::{link_endpoints, specialise_instances};
use tracing::info;

use crate::engine::check_program;

/// Specialises, links and checks a program.
///
/// On success the linked program is returned. On failure the program is
/// dropped and the list holds the diagnostic that stopped the pipeline.
pub fn link_and_verify(mut program: Program, settings: &BuildSettings) -> Result<Program, DiagnosticList> {
    match run_stages(&mut program, settings) {
        Ok(()) => Ok(program),
        Err(diag) => {
            let mut list = DiagnosticList::new();
            list.push(diag);
            Err(list)
        }
    }
}

/// Runs [`link_and_verify`] on independent programs in parallel.
///
/// Each program is owned by exactly one worker. Results keep the input
/// order.
pub fn verify_programs(
    programs: Vec<Program>,
    settings: &BuildSettings,
) -> Vec<Result<Program, DiagnosticList>> {
    programs
        .into_par_iter()
        .map(|program| link_and_verify(program, settings))
        .collect()
}

fn run_stages(program: &mut Program, settings: &BuildSettings) -> Result<(), Diagnostic> {
    info!(modules = program.modules.len(), "specialising processor instances");
    specialise_instances(program, settings)?;

    info!("linking endpoints");
    link_endpoints(program)?;

    info!("checking program");
    check_program(program, settings)?;

    info!(modules = program.modules.len(), "program verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_heart::{check_round_trip, parse, to_heart};

    const SYNTH: &str = "#HEART 1
namespace Dsp
{
    function scale (float32 $x, float32 $amount) -> float32
    {
        @block_0:
            return multiply ($x, $amount);
    }
}
processor Osc
{
    output out stream float32;
    param float32 gain;
    var float32 phase;
    function run () -> void
    {
        @block_0:
            write out pure_call Dsp::scale (Osc::phase, Osc::gain);
            advance;
            branch @block_0;
    }
}
processor Mixer
{
    input in stream float32;
    input level event float32;
    output out stream float32;
    var float32 amount = 1.0f;
    event level (float32 $v) -> void
    {
        @block_0:
            Mixer::amount = $v;
            return;
    }
    function run () -> void
    {
        var float32 $x;
        @block_0:
            $x = read in;
            write out multiply ($x, Mixer::amount);
            advance;
            branch @block_0;
    }
}
graph Voice
{
    output out stream float32;
    node osc = Osc (0.5f);
    node mix = Mixer;
    connection osc.out -> mix.in;
    connection mix.out -> out;
}
graph Top [[main: true]]
{
    input level = voice.mix.level;
    output out stream float32;
    node voice = Voice;
    connection voice.out -> out;
}
";

    #[test]
    fn links_and_verifies_a_synth() {
        let program = link_and_verify(parse(SYNTH).unwrap(), &BuildSettings::default()).unwrap();
        let text = to_heart(&program);
        assert!(text.contains("    node osc = Osc_specialised_1;\n"));
        assert!(text.contains("    let float32 gain = 0.5f;\n"));
        assert!(text.contains("    input level event float32;\n"));
        assert!(text.contains("    connection level -> voice.expose_voice_mix_level;\n"));
        assert!(text.contains("    connection expose_voice_mix_level -> mix.level;\n"));
        check_round_trip(&program).unwrap();
    }

    #[test]
    fn failure_returns_one_diagnostic() {
        let broken = SYNTH.replace("connection osc.out -> mix.in;", "connection osc.out -> mix.level;");
        let list = link_and_verify(parse(&broken).unwrap(), &BuildSettings::default()).unwrap_err();
        assert_eq!(list.len(), 1);
        assert!(list.has_errors());
        assert_eq!(list.first_error().unwrap().code.to_string(), "T202");
    }

    #[test]
    fn parallel_programs_are_independent() {
        let looping = SYNTH.replace(
            "connection mix.out -> out;",
            "connection mix.out -> out;\n    connection mix.out -> osc.out;",
        );
        let programs = vec![
            parse(SYNTH).unwrap(),
            parse(&looping).unwrap(),
            parse(SYNTH).unwrap(),
        ];
        let results = verify_programs(programs, &BuildSettings::default());
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        let a = to_heart(results[0].as_ref().unwrap());
        let b = to_heart(results[2].as_ref().unwrap());
        assert_eq!(a, b);
    }
}
