//! Diagnostic codes and helper functions for linking errors.
//!
//! Codes `R2xx` cover names that do not resolve, `T2xx` incompatible
//! connections and specialisation arguments, `G2xx` graph shape problems,
//! `I2xx` call-flow invariants, `L2xx` configured limits and `U2xx` graph
//! constructs that are not supported yet.

use resonate_diagnostics::{Category, Diagnostic, DiagnosticCode};
use resonate_source::Span;

/// The source of a connection does not name an endpoint.
pub const R201: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 201);
/// The destination of a connection does not name an endpoint.
pub const R202: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 202);
/// A connection reads from an endpoint that cannot act as a source.
pub const R203: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 203);
/// A connection writes to an endpoint that cannot act as a destination.
pub const R204: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 204);
/// A processor instance or module name does not resolve.
pub const R205: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 205);
/// A hoisted path names an endpoint the child does not have.
pub const R206: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 206);
/// A hoisted path continues through a module that is not a graph.
pub const R207: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 207);
/// An endpoint is still unresolved when its details are needed.
pub const R208: DiagnosticCode = DiagnosticCode::new(Category::Resolution, 208);

/// Two endpoints have incompatible data types.
pub const T201: DiagnosticCode = DiagnosticCode::new(Category::Type, 201);
/// Two endpoints have different kinds.
pub const T202: DiagnosticCode = DiagnosticCode::new(Category::Type, 202);
/// A specialisation argument does not convert to its parameter's type.
pub const T203: DiagnosticCode = DiagnosticCode::new(Category::Type, 203);
/// An instance passes the wrong number of specialisation arguments.
pub const T204: DiagnosticCode = DiagnosticCode::new(Category::Type, 204);

/// Delay-free connections form a loop.
pub const G201: DiagnosticCode = DiagnosticCode::new(Category::Graph, 201);
/// A source index is not below the source's array size.
pub const G202: DiagnosticCode = DiagnosticCode::new(Category::Graph, 202);
/// A destination index is not below the destination's array size.
pub const G203: DiagnosticCode = DiagnosticCode::new(Category::Graph, 203);
/// Event arrays of incompatible sizes are connected.
pub const G204: DiagnosticCode = DiagnosticCode::new(Category::Graph, 204);
/// A graph instantiates itself.
pub const G205: DiagnosticCode = DiagnosticCode::new(Category::Graph, 205);
/// A delay length below one frame.
pub const G206: DiagnosticCode = DiagnosticCode::new(Category::Graph, 206);

/// A function calls itself.
pub const I201: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 201);
/// Two functions call each other.
pub const I202: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 202);
/// A longer cycle of function calls.
pub const I203: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 203);
/// A loop that neither returns nor advances.
pub const I204: DiagnosticCode = DiagnosticCode::new(Category::Invariant, 204);

/// A delay length above the configured maximum.
pub const L201: DiagnosticCode = DiagnosticCode::new(Category::Limit, 201);
/// The worst-case call stack exceeds the configured budget.
pub const L202: DiagnosticCode = DiagnosticCode::new(Category::Limit, 202);
/// More distinct specialisations than the configured maximum.
pub const L203: DiagnosticCode = DiagnosticCode::new(Category::Limit, 203);

/// A graph construct that linking does not support yet.
pub const U201: DiagnosticCode = DiagnosticCode::new(Category::Unsupported, 201);

/// Creates an error for a connection source that is not an endpoint.
pub fn cannot_find_source(desc: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R201, format!("Cannot find source endpoint '{desc}'"), span)
}

/// Creates an error for a connection destination that is not an endpoint.
pub fn cannot_find_destination(desc: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R202, format!("Cannot find destination endpoint '{desc}'"), span)
}

/// Creates an error for connecting from an endpoint of the wrong direction.
pub fn cannot_connect_from(direction: &str, desc: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R203, format!("Cannot connect from the {direction} '{desc}'"), span)
}

/// Creates an error for connecting to an endpoint of the wrong direction.
pub fn cannot_connect_to(direction: &str, desc: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R204, format!("Cannot connect to the {direction} '{desc}'"), span)
}

/// Creates an error for an unknown processor instance or module.
pub fn cannot_find_processor(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R205, format!("Cannot find processor '{name}'"), span)
}

/// Creates an error for an endpoint missing from a child module.
pub fn cannot_find_endpoint(name: &str, module: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        R206,
        format!("Cannot find endpoint '{name}' in '{module}'"),
        span,
    )
}

/// Creates an error for a hoisted path that passes through a processor.
pub fn target_is_not_a_graph(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R207, format!("'{name}' is not a graph"), span)
        .with_help("only graphs can forward endpoints of their own children")
}

/// Creates an error for an endpoint that has not been resolved.
pub fn unresolved_endpoint(desc: &str, span: Span) -> Diagnostic {
    Diagnostic::error(R208, format!("The endpoint '{desc}' could not be resolved"), span)
}

/// Creates an error for two endpoints whose types do not match.
pub fn cannot_connect(
    source: &str,
    source_type: &str,
    dest: &str,
    dest_type: &str,
    span: Span,
) -> Diagnostic {
    Diagnostic::error(
        T201,
        format!("Cannot connect {source} ({source_type}) to {dest} ({dest_type})"),
        span,
    )
}

/// Creates an error for two endpoints of different kinds.
pub fn endpoint_kind_mismatch(
    source: &str,
    source_kind: &str,
    dest: &str,
    dest_kind: &str,
    span: Span,
) -> Diagnostic {
    Diagnostic::error(
        T202,
        format!("Cannot connect {source} ({source_kind}) to {dest} ({dest_kind})"),
        span,
    )
}

/// Creates an error for a specialisation argument of the wrong type.
pub fn wrong_type_for_specialisation_argument(
    param: &str,
    expected: &str,
    found: &str,
    span: Span,
) -> Diagnostic {
    Diagnostic::error(
        T203,
        format!("Specialisation argument for '{param}' has type {found}, expected {expected}"),
        span,
    )
}

/// Creates an error for the wrong number of specialisation arguments.
pub fn wrong_number_of_specialisation_args(
    module: &str,
    expected: usize,
    found: usize,
    span: Span,
) -> Diagnostic {
    Diagnostic::error(
        T204,
        format!("'{module}' takes {expected} specialisation arguments, but {found} were given"),
        span,
    )
}

/// Creates an error for a feedback loop, given the instance names in order.
pub fn feedback_in_graph(cycle: &[String], span: Span) -> Diagnostic {
    Diagnostic::error(
        G201,
        format!("Feedback cycle in graph: {}", cycle.join(" -> ")),
        span,
    )
    .with_help("add a delay to one of the connections to break the loop")
}

/// Creates an error for a source index out of range.
pub fn source_index_out_of_range(desc: &str, index: u32, size: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        G202,
        format!("Source endpoint index {index} is out of range for '{desc}', which has {size} elements"),
        span,
    )
}

/// Creates an error for a destination index out of range.
pub fn destination_index_out_of_range(desc: &str, index: u32, size: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        G203,
        format!(
            "Destination endpoint index {index} is out of range for '{desc}', which has {size} elements"
        ),
        span,
    )
}

/// Creates an error for event arrays whose sizes cannot be fanned.
pub fn incompatible_event_sizes(
    source: &str,
    source_size: u32,
    dest: &str,
    dest_size: u32,
    span: Span,
) -> Diagnostic {
    Diagnostic::error(
        G204,
        format!("Cannot connect {source} (size {source_size}) to {dest} (size {dest_size})"),
        span,
    )
    .with_note("event arrays connect one to many, many to one, or between equal sizes")
}

/// Creates an error for a graph that contains itself.
pub fn recursive_graph(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(G205, format!("The graph '{name}' contains itself recursively"), span)
}

/// Creates an error for a delay shorter than one frame.
pub fn delay_line_too_short(span: Span) -> Diagnostic {
    Diagnostic::error(G206, "A delay line length must be greater than zero", span)
}

/// Creates an error for a delay longer than the configured maximum.
pub fn delay_line_too_long(length: i64, max: u64, span: Span) -> Diagnostic {
    Diagnostic::error(
        L201,
        format!("Illegal delay line length {length}, the maximum is {max}"),
        span,
    )
}

/// Creates an error for a function that calls itself.
pub fn function_calls_itself_recursively(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(I201, format!("The function '{name}' calls itself recursively"), span)
}

/// Creates an error for two functions that call each other.
pub fn functions_call_each_other_recursively(first: &str, second: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I202,
        format!("The functions '{first}' and '{second}' call each other recursively"),
        span,
    )
}

/// Creates an error for a longer cycle of calls.
pub fn recursive_function_call_sequence(names: &[String], span: Span) -> Diagnostic {
    Diagnostic::error(
        I203,
        format!("Recursive call sequence via functions: {}", names.join(", ")),
        span,
    )
}

/// Creates an error for a loop without a way out.
pub fn function_contains_infinite_loop(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        I204,
        format!("The function '{name}' contains at least one infinite loop"),
        span,
    )
    .with_help("loops that never return must call advance")
}

/// Creates an error for a call stack above the configured budget.
pub fn maximum_stack_size_exceeded(required: &str, max: &str) -> Diagnostic {
    Diagnostic::error(
        L202,
        format!("Stack size limit exceeded - program requires {required}, maximum allowed is {max}"),
        Span::DUMMY,
    )
}

/// Creates an error for too many distinct specialisations.
pub fn too_many_specialisations(max: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        L203,
        format!("Exceeded the maximum number of specialised processor instances ({max})"),
        span,
    )
}

/// Creates an error for an unsupported graph construct.
pub fn not_yet_implemented(what: &str, span: Span) -> Diagnostic {
    Diagnostic::error(U201, format!("Not yet implemented: {what}"), span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_display_with_prefix() {
        assert_eq!(R201.to_string(), "R201");
        assert_eq!(T202.to_string(), "T202");
        assert_eq!(G201.to_string(), "G201");
        assert_eq!(L202.to_string(), "L202");
        assert_eq!(U201.to_string(), "U201");
    }

    #[test]
    fn connection_messages() {
        let d = cannot_connect("osc.out", "float32", "out", "int32", Span::DUMMY);
        assert_eq!(d.message, "Cannot connect osc.out (float32) to out (int32)");
        let d = endpoint_kind_mismatch("a.out", "stream", "b.in", "event", Span::DUMMY);
        assert_eq!(d.code, T202);
        assert!(d.message.ends_with("b.in (event)"));
        assert_eq!(
            delay_line_too_short(Span::DUMMY).message,
            "A delay line length must be greater than zero"
        );
        assert_eq!(delay_line_too_long(10, 5, Span::DUMMY).code, L201);
    }

    #[test]
    fn cycle_and_recursion_messages() {
        let names = ["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(
            feedback_in_graph(&names, Span::DUMMY).message,
            "Feedback cycle in graph: a -> b -> a"
        );
        let names = ["M::f".to_string(), "M::g".to_string(), "M::h".to_string()];
        assert_eq!(
            recursive_function_call_sequence(&names, Span::DUMMY).message,
            "Recursive call sequence via functions: M::f, M::g, M::h"
        );
        assert_eq!(function_calls_itself_recursively("M::f", Span::DUMMY).code, I201);
        assert_eq!(functions_call_each_other_recursively("a", "b", Span::DUMMY).code, I202);
        assert_eq!(function_contains_infinite_loop("M::f", Span::DUMMY).code, I204);
    }

    #[test]
    fn limit_messages() {
        let d = maximum_stack_size_exceeded("2.0 MB", "1.0 MB");
        assert_eq!(
            d.message,
            "Stack size limit exceeded - program requires 2.0 MB, maximum allowed is 1.0 MB"
        );
        assert_eq!(too_many_specialisations(4, Span::DUMMY).code, L203);
        assert_eq!(not_yet_implemented("arrays", Span::DUMMY).message, "Not yet implemented: arrays");
        assert_eq!(cannot_find_endpoint("x", "M", Span::DUMMY).code, R206);
        assert_eq!(target_is_not_a_graph("p", Span::DUMMY).code, R207);
        assert_eq!(recursive_graph("G", Span::DUMMY).code, G205);
        assert_eq!(wrong_number_of_specialisation_args("M", 1, 2, Span::DUMMY).code, T204);
        assert_eq!(wrong_type_for_specialisation_argument("n", "int32", "bool", Span::DUMMY).code, T203);
        assert_eq!(unresolved_endpoint("x", Span::DUMMY).code, R208);
        assert_eq!(cannot_connect_from("input", "a.in", Span::DUMMY).code, R203);
        assert_eq!(cannot_connect_to("output", "a.out", Span::DUMMY).code, R204);
        assert_eq!(cannot_find_source("x", Span::DUMMY).code, R201);
        assert_eq!(cannot_find_destination("x", Span::DUMMY).code, R202);
        assert_eq!(cannot_find_processor("x", Span::DUMMY).code, R205);
        assert_eq!(source_index_out_of_range("x", 4, 4, Span::DUMMY).code, G202);
        assert_eq!(destination_index_out_of_range("x", 4, 4, Span::DUMMY).code, G203);
        assert_eq!(incompatible_event_sizes("a", 3, "b", 4, Span::DUMMY).code, G204);
    }
}
