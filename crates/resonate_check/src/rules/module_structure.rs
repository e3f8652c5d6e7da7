//! `module-structure`: names, endpoint declarations and instances.

use std::collections::HashSet;

use resonate_config::BuildSettings;
use resonate_diagnostics::{Diagnostic, DiagnosticCode};
use resonate_ir::{Endpoint, EndpointKind, Module, Program};
use resonate_source::Span;

use crate::errors;
use crate::{CheckContext, ProgramCheck};

/// Checks that modules, endpoints and instances are declared consistently,
/// and that the main module's endpoints can be driven by a host.
pub struct ModuleStructure;

impl ProgramCheck for ModuleStructure {
    fn code(&self) -> DiagnosticCode {
        errors::S301
    }

    fn name(&self) -> &str {
        "module-structure"
    }

    fn description(&self) -> &str {
        "module, endpoint and instance declarations are well formed"
    }

    fn check(&self, program: &Program, context: &CheckContext<'_>) -> Result<(), Diagnostic> {
        let mut names = HashSet::new();
        for (id, module) in program.modules.iter() {
            if !names.insert(module.full_name.as_str()) {
                return Err(errors::duplicate_module_name(&module.full_name, module.span));
            }
            if let Some(parent) = program.parent_module(id) {
                let parent = &program.modules[parent];
                if !parent.is_namespace() {
                    return Err(errors::module_inside_non_namespace(
                        &module.full_name,
                        &parent.full_name,
                        module.span,
                    ));
                }
            }
        }

        for (_, module) in program.processors_and_graphs() {
            check_endpoints(module, context.settings)?;
            check_instances(program, module, context.settings)?;
            if module.outputs().next().is_none() {
                return Err(errors::processor_needs_an_output(&module.full_name, module.span));
            }
        }

        if let Some(main) = context.main_module {
            check_main_endpoints(&program.modules[main])?;
        }
        Ok(())
    }
}

fn check_endpoints(module: &Module, settings: &BuildSettings) -> Result<(), Diagnostic> {
    let mut names = HashSet::new();
    for endpoint in module.endpoints.values() {
        if !names.insert(endpoint.name.as_str()) {
            return Err(errors::duplicate_endpoint_name(&endpoint.name, endpoint.span));
        }
        let Some(details) = &endpoint.details else {
            return Err(errors::unresolved_endpoint(&endpoint.name, endpoint.span));
        };
        match details.data_types.len() {
            0 => return Err(errors::endpoint_has_no_types(&endpoint.name, endpoint.span)),
            1 => {}
            _ if details.kind != EndpointKind::Event => {
                return Err(errors::only_events_have_multiple_types(&endpoint.name, endpoint.span))
            }
            _ => {}
        }
        check_array_size(&endpoint.name, details.array_size, settings, endpoint.span)?;
    }
    Ok(())
}

fn check_instances(program: &Program, module: &Module, settings: &BuildSettings) -> Result<(), Diagnostic> {
    let mut names = HashSet::new();
    for instance in module.instances.values() {
        if !names.insert(instance.name.as_str()) {
            return Err(errors::duplicate_instance_name(&instance.name, instance.span));
        }
        check_array_size(&instance.name, instance.array_size, settings, instance.span)?;
        let source = program
            .find_module(&instance.source_name)
            .ok_or_else(|| errors::cannot_find_processor(&instance.source_name, instance.span))?;
        if program.modules[source].is_namespace() {
            return Err(errors::cannot_instantiate_namespace(&instance.source_name, instance.span));
        }
    }
    Ok(())
}

fn check_array_size(name: &str, size: Option<u32>, settings: &BuildSettings, span: Span) -> Result<(), Diagnostic> {
    let max = settings.max_processor_array_size;
    match size {
        Some(size) if size == 0 || size > max => Err(errors::illegal_array_size(name, size, max, span)),
        _ => Ok(()),
    }
}

fn check_main_endpoints(module: &Module) -> Result<(), Diagnostic> {
    let is_array = |e: &Endpoint| e.array_size().is_some();
    for (_, input) in module.inputs() {
        let types = input.details.as_ref().map_or(0, |d| d.data_types.len());
        if types != 1 {
            return Err(errors::main_input_needs_one_type(&input.name, input.span));
        }
        if is_array(input) {
            return Err(errors::main_endpoint_array_not_supported(&input.name, input.span));
        }
    }
    for (_, output) in module.outputs() {
        if is_array(output) {
            return Err(errors::main_endpoint_array_not_supported(&output.name, output.span));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::{code, run, run_with};

    fn with(body: &str) -> String {
        format!("#HEART 1\nprocessor P\n{{\n{body}}}\n")
    }

    #[test]
    fn well_formed_program() {
        let text = "#HEART 1
namespace Lib
{
}
processor Lib::Osc
{
    output out stream float32;
}
processor Top [[main: true]]
{
    input in stream float32;
    input note event (int32, float32);
    output out stream float32;
}
";
        let err = run(&ModuleStructure, text).unwrap_err();
        assert_eq!(err.code, errors::T303);
        run(&ModuleStructure, &text.replace("(int32, float32)", "int32")).unwrap();
    }

    #[test]
    fn duplicate_names() {
        let modules = "#HEART 1\nprocessor P\n{\n    output o stream float32;\n}\nprocessor P\n{\n    output o stream float32;\n}\n";
        assert_eq!(code(&ModuleStructure, modules), "S301");
        assert_eq!(
            code(&ModuleStructure, &with("    output o stream float32;\n    output o event int32;\n")),
            "S303"
        );
        let nodes = "#HEART 1\nprocessor P\n{\n    output o stream float32;\n}\ngraph G [[main: true]]\n{\n    output o stream float32;\n    node a = P;\n    node a = P;\n}\n";
        assert_eq!(code(&ModuleStructure, nodes), "S304");
    }

    #[test]
    fn nested_module_needs_a_namespace_parent() {
        let text = "#HEART 1\nprocessor P\n{\n    output o stream float32;\n}\nprocessor P::Q\n{\n    output o stream float32;\n}\n";
        assert_eq!(code(&ModuleStructure, text), "S302");
    }

    #[test]
    fn endpoint_declarations() {
        assert_eq!(code(&ModuleStructure, &with("    input a stream (int32, float32);\n    output o stream float32;\n")), "T302");
        assert_eq!(code(&ModuleStructure, &with("    output x = p.o;\n")), "R301");
        assert_eq!(code(&ModuleStructure, &with("    input e event int32;\n")), "S305");
    }

    #[test]
    fn array_limits() {
        let text = "#HEART 1
processor P
{
    output o stream float32;
}
graph G [[main: true]]
{
    output o stream float32;
    node voices = P[8];
}
";
        run(&ModuleStructure, text).unwrap();
        let settings = BuildSettings {
            max_processor_array_size: 4,
            ..BuildSettings::default()
        };
        let err = run_with(&ModuleStructure, text, &settings).unwrap_err();
        assert_eq!(err.code, errors::L301);
        assert_eq!(code(&ModuleStructure, &text.replace("P[8]", "P[0]")), "L301");
    }

    #[test]
    fn instance_sources() {
        let text = "#HEART 1
namespace Lib
{
}
graph G
{
    output o stream float32;
    node a = Missing;
}
";
        assert_eq!(code(&ModuleStructure, text), "R302");
        assert_eq!(code(&ModuleStructure, &text.replace("Missing", "Lib")), "S306");
    }

    #[test]
    fn main_endpoint_arrays() {
        assert_eq!(code(&ModuleStructure, &with("    input in[2] stream float32;\n    output o stream float32;\n")), "U301");
        assert_eq!(code(&ModuleStructure, &with("    output o[2] stream float32;\n")), "U301");
        let not_main = "#HEART 1
processor P
{
    input in[2] stream float32;
    output o stream float32;
}
processor Top [[main: true]]
{
    output o stream float32;
}
";
        run(&ModuleStructure, not_main).unwrap();
    }
}
