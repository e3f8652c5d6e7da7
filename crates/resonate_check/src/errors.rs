//! Diagnostics raised by the whole-program checks.
//!
//! Codes use the `3xx` range of each category.

use resonate_diagnostics::{Category, Diagnostic, DiagnosticCode};
use resonate_source::Span;

/// S301: two modules share a fully-qualified name.
pub const S301: DiagnosticCode = DiagnosticCode::new(Category::Structure, 301);
/// S302: a module is nested inside a processor or graph.
pub const S302: DiagnosticCode = DiagnosticCode::new(Category::Structure, 302);
/// S303: two endpoints of one module share a name.
pub const S303: DiagnosticCode = DiagnosticCode::new(Category::Structure, 303);
/// S304: two processor instances of one graph share a name.
pub const S304: DiagnosticCode = DiagnosticCode::new(Category::Structure, 304);
/// S305: a processor or graph has no output.
pub const S305: DiagnosticCode = DiagnosticCode::new(Category::Structure, 305);
/// S306: an instance refers to a namespace.
pub const S306: DiagnosticCode = DiagnosticCode::new(Category::Structure, 306);
/// S307: a function's entry block has parameters.
pub const S307: DiagnosticCode = DiagnosticCode::new(Category::Structure, 307);
/// S308: a branch passes the wrong number of block arguments.
pub const S308: DiagnosticCode = DiagnosticCode::new(Category::Structure, 308);
/// S309: a branch targets a block outside its function.
pub const S309: DiagnosticCode = DiagnosticCode::new(Category::Structure, 309);

/// R301: an endpoint was never resolved.
pub const R301: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 301);
/// R302: an instance refers to a module that does not exist.
pub const R302: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 302);
/// R303: a read names something that is not a readable input.
pub const R303: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 303);
/// R304: a write names something that is not an output.
pub const R304: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 304);
/// R305: the configured main processor does not exist.
pub const R305: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 305);

/// T301: an endpoint declares no data type.
pub const T301: DiagnosticCode = DiagnosticCode::new(Category::Type, 301);
/// T302: a stream or value endpoint declares several data types.
pub const T302: DiagnosticCode = DiagnosticCode::new(Category::Type, 302);
/// T303: an input of the main module has several data types.
pub const T303: DiagnosticCode = DiagnosticCode::new(Category::Type, 303);
/// T304: a block parameter is void or a reference.
pub const T304: DiagnosticCode = DiagnosticCode::new(Category::Type, 304);
/// T305: a block argument does not convert to its parameter's type.
pub const T305: DiagnosticCode = DiagnosticCode::new(Category::Type, 305);
/// T306: a written value has a type the endpoint does not accept.
pub const T306: DiagnosticCode = DiagnosticCode::new(Category::Type, 306);
/// T307: a function returns a reference.
pub const T307: DiagnosticCode = DiagnosticCode::new(Category::Type, 307);

/// G301: an element index is used on an endpoint that is not an array.
pub const G301: DiagnosticCode = DiagnosticCode::new(Category::Graph, 301);
/// G302: a constant element index lies outside an endpoint array.
pub const G302: DiagnosticCode = DiagnosticCode::new(Category::Graph, 302);

/// I301: a `run` function never advances.
pub const I301: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 301);
/// I302: `advance` outside a processor's `run` function.
pub const I302: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 302);
/// I303: a call to a function only the runtime may call.
pub const I303: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 303);
/// I304: the user initialiser reads or writes an endpoint.
pub const I304: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 304);
/// I305: a stream is read outside `run`.
pub const I305: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 305);
/// I306: a stream or value is written outside `run`.
pub const I306: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 306);
/// I307: an event is sent from an initialiser.
pub const I307: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 307);

/// L301: an endpoint or instance array size is zero or too large.
pub const L301: DiagnosticCode = DiagnosticCode::new(Category::Limit, 301);

/// U301: an endpoint array on the main module.
pub const U301: DiagnosticCode = DiagnosticCode::new(Category::Unsupported, 301);
/// U302: a conditional branch passing block arguments.
pub const U302: DiagnosticCode = DiagnosticCode::new(Category::Unsupported, 302);

/// Creates an error for a module name declared twice.
pub fn duplicate_module_name(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(S301, format!("The module name '{name}' is already in use"), span)
}

/// Creates an error for a module nested in something other than a namespace.
pub fn module_inside_non_namespace(name: &str, parent: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        S302,
        format!("The module '{name}' cannot be declared inside '{parent}'"),
        span,
    )
    .with_help("only namespaces may contain other modules")
}

/// Creates an error for an endpoint name declared twice.
pub fn duplicate_endpoint_name(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(S303, format!("The endpoint name '{name}' is already in use"), span)
}

/// Creates an error for an instance name declared twice.
pub fn duplicate_instance_name(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(S304, format!("The processor name '{name}' is already in use"), span)
}

/// Creates an error for a processor or graph without outputs.
pub fn processor_needs_an_output(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        S305,
        format!("The processor '{name}' must declare at least one output"),
        span,
    )
}

/// Creates an error for an instance of a namespace.
pub fn cannot_instantiate_namespace(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        S306,
        format!("'{name}' is a namespace, not a processor or graph"),
        span,
    )
}

/// Creates an error for an entry block that takes parameters.
pub fn entry_block_has_parameters(function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        S307,
        format!("The entry block of '{function}' cannot take parameters"),
        span,
    )
}

/// Creates an error for a branch with the wrong number of block arguments.
pub fn wrong_number_of_block_args(block: &str, expected: usize, found: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        S308,
        format!("Block {block} takes {expected} arguments, but {found} were passed"),
        span,
    )
}

/// Creates an error for a branch to a block of another function.
pub fn invalid_branch_target(function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        S309,
        format!("A branch in '{function}' targets a block that does not exist"),
        span,
    )
}

/// Creates an error for an endpoint whose hoisted path was never resolved.
pub fn unresolved_endpoint(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R301, format!("The endpoint '{name}' could not be resolved"), span)
}

/// Creates an error for an instance of a module that does not exist.
pub fn cannot_find_processor(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R302, format!("Cannot find processor '{name}'"), span)
}

/// Creates an error for a read from something that cannot be read.
pub fn cannot_read_from(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        R303,
        format!("'{name}' is not a stream or value input that can be read"),
        span,
    )
}

/// Creates an error for a write to something that is not an output.
pub fn cannot_write_to(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R304, format!("'{name}' is not an output that can be written"), span)
}

/// Creates an error for a configured main processor that does not exist.
pub fn cannot_find_main_processor(name: &str) -> Diagnostic {
    Diagnostic::error(
        R305,
        format!("Cannot find the main processor '{name}'"),
        Span::DUMMY,
    )
}

/// Creates an error for an endpoint without a data type.
pub fn endpoint_has_no_types(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(T301, format!("The endpoint '{name}' has no data type"), span)
}

/// Creates an error for a stream or value endpoint with several types.
pub fn only_events_have_multiple_types(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        T302,
        format!("The endpoint '{name}' declares several types, but only event endpoints may"),
        span,
    )
}

/// Creates an error for a main-module input with several data types.
pub fn main_input_needs_one_type(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        T303,
        format!("The top-level input '{name}' must have exactly one data type"),
        span,
    )
}

/// Creates an error for a void or reference block parameter.
pub fn invalid_block_parameter_type(block: &str, ty: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        T304,
        format!("Block {block} cannot take a parameter of type {ty}"),
        span,
    )
}

/// Creates an error for a block argument of the wrong type.
pub fn wrong_type_for_block_arg(block: &str, expected: &str, found: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        T305,
        format!("Cannot pass {found} to a parameter of type {expected} of block {block}"),
        span,
    )
}

/// Creates an error for a value an endpoint does not accept.
pub fn wrong_type_for_endpoint(name: &str, ty: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        T306,
        format!("The endpoint '{name}' cannot accept a value of type {ty}"),
        span,
    )
}

/// Creates an error for a function returning a reference.
pub fn reference_return_type(function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        T307,
        format!("The function '{function}' cannot return a reference"),
        span,
    )
}

/// Creates an error for an element index on a non-array endpoint.
pub fn endpoint_index_invalid(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        G301,
        format!("The endpoint '{name}' is not an array and cannot be indexed"),
        span,
    )
}

/// Creates an error for a constant index outside an endpoint array.
pub fn endpoint_index_out_of_range(name: &str, index: i64, size: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        G302,
        format!("Index {index} is out of range for the endpoint '{name}', which has {size} elements"),
        span,
    )
}

/// Creates an error for a `run` function that never advances.
pub fn run_function_must_call_advance(processor: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I301,
        format!("The run function of '{processor}' must call advance()"),
        span,
    )
    .with_help("a run function that never advances never finishes a frame")
}

/// Creates an error for `advance` outside a processor's `run` function.
pub fn advance_outside_run(function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I302,
        format!("advance() can only be called from a processor's run function, not from '{function}'"),
        span,
    )
}

/// Creates an error for a call to a runtime entry point.
pub fn cannot_call_runtime_function(callee: &str, caller: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I303,
        format!("The function '{callee}' cannot be called from '{caller}'"),
        span,
    )
    .with_note("run, init and event functions are only called by the runtime")
}

/// Creates an error for endpoint access in the user initialiser.
pub fn streams_used_in_init(function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I304,
        format!("'{function}' cannot read or write endpoints"),
        span,
    )
}

/// Creates an error for a stream read outside `run`.
pub fn read_outside_run(endpoint: &str, function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I305,
        format!("'{endpoint}' can only be read from the run function, not from '{function}'"),
        span,
    )
}

/// Creates an error for a stream or value write outside `run`.
pub fn write_outside_run(endpoint: &str, function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I306,
        format!("'{endpoint}' can only be written from the run function, not from '{function}'"),
        span,
    )
}

/// Creates an error for an event sent from an initialiser.
pub fn event_sent_from_init(endpoint: &str, function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I307,
        format!("The event '{endpoint}' cannot be sent from '{function}'"),
        span,
    )
}

/// Creates an error for an array size of zero or above the limit.
pub fn illegal_array_size(name: &str, size: u32, max: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        L301,
        format!("The array size of '{name}' is {size}, but must be between 1 and {max}"),
        span,
    )
}

/// Creates an error for an endpoint array on the main module.
pub fn main_endpoint_array_not_supported(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        U301,
        format!("Not yet implemented: top-level endpoint arrays ('{name}')"),
        span,
    )
}

/// Creates an error for a conditional branch passing block arguments.
pub fn branch_if_with_args_not_supported(function: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        U302,
        format!("Not yet implemented: block arguments on a conditional branch in '{function}'"),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_codes() {
        assert_eq!(duplicate_module_name("Top", Span::DUMMY).code.to_string(), "S301");
        let diag = module_inside_non_namespace("P::Q", "P", Span::DUMMY);
        assert_eq!(diag.code, S302);
        assert_eq!(diag.help.len(), 1);
        assert_eq!(duplicate_endpoint_name("out", Span::DUMMY).code, S303);
        assert_eq!(duplicate_instance_name("osc", Span::DUMMY).code, S304);
        assert_eq!(processor_needs_an_output("P", Span::DUMMY).code, S305);
        assert_eq!(cannot_instantiate_namespace("Lib", Span::DUMMY).code, S306);
        assert_eq!(entry_block_has_parameters("M::f", Span::DUMMY).code, S307);
        let diag = wrong_number_of_block_args("@done", 1, 2, Span::DUMMY);
        assert_eq!(diag.message, "Block @done takes 1 arguments, but 2 were passed");
        assert_eq!(invalid_branch_target("M::f", Span::DUMMY).code, S309);
    }

    #[test]
    fn resolution_and_type_codes() {
        assert_eq!(unresolved_endpoint("x", Span::DUMMY).code.to_string(), "R301");
        assert_eq!(cannot_find_processor("Osc", Span::DUMMY).code, R302);
        assert_eq!(cannot_read_from("out", Span::DUMMY).code, R303);
        assert_eq!(cannot_write_to("in", Span::DUMMY).code, R304);
        assert!(cannot_find_main_processor("Top").primary_span.is_dummy());
        assert_eq!(endpoint_has_no_types("in", Span::DUMMY).code, T301);
        assert_eq!(only_events_have_multiple_types("in", Span::DUMMY).code, T302);
        assert_eq!(main_input_needs_one_type("in", Span::DUMMY).code, T303);
        assert_eq!(invalid_block_parameter_type("@b", "void", Span::DUMMY).code, T304);
        let diag = wrong_type_for_block_arg("@b", "int32", "float64", Span::DUMMY);
        assert_eq!(diag.code.to_string(), "T305");
        assert!(diag.message.contains("float64"));
        assert_eq!(wrong_type_for_endpoint("out", "bool", Span::DUMMY).code, T306);
        assert_eq!(reference_return_type("M::f", Span::DUMMY).code, T307);
        assert_eq!(endpoint_index_invalid("out", Span::DUMMY).code.to_string(), "G301");
    }

    #[test]
    fn invariant_limit_and_unsupported_codes() {
        assert_eq!(endpoint_index_out_of_range("outs", 5, 2, Span::DUMMY).code.to_string(), "G302");
        assert_eq!(run_function_must_call_advance("P", Span::DUMMY).code.to_string(), "I301");
        assert_eq!(advance_outside_run("P::f", Span::DUMMY).code, I302);
        let diag = cannot_call_runtime_function("P::run", "P::f", Span::DUMMY);
        assert_eq!(diag.code, I303);
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(streams_used_in_init("P::init", Span::DUMMY).code, I304);
        assert_eq!(read_outside_run("in", "P::f", Span::DUMMY).code, I305);
        assert_eq!(write_outside_run("out", "P::f", Span::DUMMY).code, I306);
        assert_eq!(event_sent_from_init("e", "P::init", Span::DUMMY).code, I307);
        let diag = illegal_array_size("in", 0, 256, Span::DUMMY);
        assert_eq!(diag.code.to_string(), "L301");
        assert!(diag.message.ends_with("between 1 and 256"));
        assert_eq!(main_endpoint_array_not_supported("in", Span::DUMMY).code, U301);
        assert_eq!(branch_if_with_args_not_supported("M::f", Span::DUMMY).code, U302);
    }
}
