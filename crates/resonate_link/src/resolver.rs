//! Connection resolution and type checking.
//!
//! Each side of a connection is resolved to a concrete endpoint together with
//! the number of values that flow through it: the instance multiplicity for
//! arrays of processors, and the endpoint array size for endpoint arrays. An
//! index on either narrows that side to a single element.

use crate::errors;
use resonate_config::BuildSettings;
use resonate_diagnostics::Diagnostic;
use resonate_ir::{
    Connection, EndpointDetails, EndpointId, EndpointKind, EndpointRef, InstanceId, Module,
    ModuleId, Program, Type, TypeRules,
};
use resonate_source::Span;
use tracing::trace;

/// One side of a resolved connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedEnd {
    /// The module that declares the endpoint.
    pub module: ModuleId,
    /// The endpoint within `module`.
    pub endpoint: EndpointId,
    /// The instance the endpoint belongs to, or `None` for the graph's own
    /// endpoint.
    pub instance: Option<InstanceId>,
    /// How many instances the reference covers.
    pub multiplicity: u32,
    /// How many endpoint array elements the reference covers.
    pub array_size: u32,
}

impl ResolvedEnd {
    /// The total number of values flowing through this side.
    pub fn fan_size(&self) -> u32 {
        self.multiplicity * self.array_size
    }
}

/// Both sides of a connection that passed resolution and type checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedConnection {
    /// Where values come from.
    pub source: ResolvedEnd,
    /// Where values go.
    pub dest: ResolvedEnd,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Destination,
}

/// Resolves both ends of `connection` inside `graph` and checks that they
/// can be connected.
///
/// The delay length is not checked here, see [`check_delay`].
pub fn resolve_connection(
    program: &Program,
    graph: ModuleId,
    connection: &Connection,
) -> Result<ResolvedConnection, Diagnostic> {
    let span = connection.span;
    let module = &program.modules[graph];
    let (source, source_details) =
        resolve_end(program, graph, &connection.source, Side::Source, span)?;
    let (dest, dest_details) =
        resolve_end(program, graph, &connection.dest, Side::Destination, span)?;
    let source_desc = describe_ref(module, &connection.source);
    let dest_desc = describe_ref(module, &connection.dest);

    if source_details.kind != dest_details.kind {
        return Err(errors::endpoint_kind_mismatch(
            &source_desc,
            source_details.kind.name(),
            &dest_desc,
            dest_details.kind.name(),
            span,
        ));
    }

    let type_error = || {
        errors::cannot_connect(
            &source_desc,
            &describe_types(program, source_details),
            &dest_desc,
            &describe_types(program, dest_details),
            span,
        )
    };

    match source_details.kind {
        EndpointKind::Event => {
            let (a, b) = (source.fan_size(), dest.fan_size());
            if !(a == 1 || b == 1 || a == b) {
                return Err(errors::incompatible_event_sizes(
                    &source_desc,
                    a,
                    &dest_desc,
                    b,
                    span,
                ));
            }
            let convertible = source_details.data_types.iter().any(|s| {
                dest_details
                    .data_types
                    .iter()
                    .any(|d| TypeRules::can_silently_cast(d, s))
            });
            if !convertible {
                return Err(type_error());
            }
        }
        EndpointKind::Stream | EndpointKind::Value => {
            match (source_details.single_type(), dest_details.single_type()) {
                (Some(s), Some(d)) if frame_types_match(s, d) => {}
                _ => return Err(type_error()),
            }
        }
    }

    trace!(from = %source_desc, to = %dest_desc, "resolved connection");
    Ok(ResolvedConnection { source, dest })
}

/// Checks a connection's delay length against the configured maximum.
///
/// A delay of zero means no delay at all.
pub fn check_delay(connection: &Connection, max_length: u64) -> Result<(), Diagnostic> {
    let Some(length) = connection.delay_length else {
        return Ok(());
    };
    if length < 0 {
        return Err(errors::delay_line_too_short(connection.span));
    }
    if u64::try_from(length).is_ok_and(|l| l > max_length) {
        return Err(errors::delay_line_too_long(length, max_length, connection.span));
    }
    Ok(())
}

/// Resolves, type-checks and delay-checks one connection.
pub fn check_connection(
    program: &Program,
    graph: ModuleId,
    connection: &Connection,
    settings: &BuildSettings,
) -> Result<ResolvedConnection, Diagnostic> {
    let resolved = resolve_connection(program, graph, connection)?;
    check_delay(connection, settings.max_delay_line_length)?;
    Ok(resolved)
}

/// Checks every connection of a graph, in declaration order.
pub fn check_graph_connections(
    program: &Program,
    graph: ModuleId,
    settings: &BuildSettings,
) -> Result<(), Diagnostic> {
    for connection in program.modules[graph].connections.values() {
        check_connection(program, graph, connection, settings)?;
    }
    Ok(())
}

/// Describes an endpoint reference as `instance.endpoint` or `endpoint`.
pub fn describe_ref(module: &Module, endpoint: &EndpointRef) -> String {
    match endpoint
        .processor
        .and_then(|id| module.instances.try_get(id))
    {
        Some(instance) => format!("{}.{}", instance.name, endpoint.endpoint),
        None => endpoint.endpoint.clone(),
    }
}

/// Describes an endpoint's candidate types, parenthesised when there are
/// several.
pub fn describe_types(program: &Program, details: &EndpointDetails) -> String {
    match details.data_types.as_slice() {
        [single] => program.type_description(single),
        types => {
            let names: Vec<String> = types.iter().map(|t| program.type_description(t)).collect();
            format!("({})", names.join(", "))
        }
    }
}

fn resolve_end<'p>(
    program: &'p Program,
    graph: ModuleId,
    endpoint_ref: &EndpointRef,
    side: Side,
    span: Span,
) -> Result<(ResolvedEnd, &'p EndpointDetails), Diagnostic> {
    let module = &program.modules[graph];
    let desc = describe_ref(module, endpoint_ref);

    let (owner, instance) = match endpoint_ref.processor {
        None => (graph, None),
        Some(id) => {
            let instance = module
                .instances
                .try_get(id)
                .ok_or_else(|| errors::cannot_find_processor(&desc, span))?;
            let source = program
                .find_module(&instance.source_name)
                .ok_or_else(|| errors::cannot_find_processor(&instance.source_name, span))?;
            (source, Some((id, instance)))
        }
    };

    let endpoint_id = program.modules[owner]
        .find_endpoint(&endpoint_ref.endpoint)
        .ok_or_else(|| match side {
            Side::Source => errors::cannot_find_source(&desc, span),
            Side::Destination => errors::cannot_find_destination(&desc, span),
        })?;
    let endpoint = &program.modules[owner].endpoints[endpoint_id];

    // A graph's own inputs feed its children, and its own outputs are fed by
    // them. Child endpoints work the other way round.
    let usable = match (side, instance.is_some()) {
        (Side::Source, false) | (Side::Destination, true) => endpoint.is_input(),
        (Side::Source, true) | (Side::Destination, false) => endpoint.is_output(),
    };
    if !usable {
        let direction = endpoint.direction.keyword();
        return Err(match side {
            Side::Source => errors::cannot_connect_from(direction, &desc, span),
            Side::Destination => errors::cannot_connect_to(direction, &desc, span),
        });
    }

    let details = endpoint
        .details
        .as_ref()
        .ok_or_else(|| errors::unresolved_endpoint(&desc, span))?;

    let instance_size = instance.map_or(1, |(_, i)| i.array_len());
    let instance_is_array = instance.is_some_and(|(_, i)| i.array_size.is_some());
    let (multiplicity, array_size) = match endpoint_ref.index {
        None => (instance_size, details.array_len()),
        Some(index) => {
            let size = if instance_is_array {
                instance_size
            } else {
                details.array_len()
            };
            if index >= size {
                return Err(match side {
                    Side::Source => errors::source_index_out_of_range(&desc, index, size, span),
                    Side::Destination => {
                        errors::destination_index_out_of_range(&desc, index, size, span)
                    }
                });
            }
            if instance_is_array {
                (1, details.array_len())
            } else {
                (instance_size, 1)
            }
        }
    };

    let end = ResolvedEnd {
        module: owner,
        endpoint: endpoint_id,
        instance: instance.map(|(id, _)| id),
        multiplicity,
        array_size,
    };
    Ok((end, details))
}

/// Stream and value frame types match when they are equal, or when one is a
/// fixed-size array of the other.
fn frame_types_match(source: &Type, dest: &Type) -> bool {
    let (source, dest) = (source.remove_qualifiers(), dest.remove_qualifiers());
    TypeRules::equal_ignoring_vector_size1(source, dest)
        || is_array_of(source, dest)
        || is_array_of(dest, source)
}

fn is_array_of(array: &Type, element: &Type) -> bool {
    array.is_fixed_size_array()
        && array
            .element_type()
            .is_some_and(|e| TypeRules::equal_ignoring_vector_size1(&e, element))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_heart::parse;

    const FIXTURE: &str = "#HEART 1
processor Voice
{
    input in stream float32;
    input chans stream float32[2];
    input level stream int32;
    input note event (int32, float32);
    input gate[4] event int32;
    output out stream float32;
    output mix stream float32[2];
}
graph Top
{
    input notes[4] event int32;
    input single event int32;
    input trio[3] event int32;
    input pair[2] event int32;
    input fine event float64;
    output out stream float32;
    node v = Voice;
    node vs = Voice[4];
    // connection
}
";

    fn resolve(line: &str) -> Result<ResolvedConnection, Diagnostic> {
        let text = FIXTURE.replace("    // connection\n", &format!("    {line}\n"));
        let program = parse(&text).unwrap();
        let top = program.find_module("Top").unwrap();
        let (_, connection) = program.modules[top].connections.iter().next().unwrap();
        resolve_connection(&program, top, connection)
    }

    fn code(line: &str) -> String {
        resolve(line).unwrap_err().code.to_string()
    }

    #[test]
    fn plain_stream() {
        let r = resolve("connection v.out -> out;").unwrap();
        assert_eq!(r.source.fan_size(), 1);
        assert!(r.source.instance.is_some());
        assert!(r.dest.instance.is_none());
    }

    #[test]
    fn stream_array_fan_out_and_in() {
        assert!(resolve("connection v.out -> v.chans;").is_ok());
        assert!(resolve("connection v.mix -> v.in;").is_ok());
        assert_eq!(code("connection v.out -> v.level;"), "T201");
    }

    #[test]
    fn event_fan_rules() {
        assert!(resolve("connection notes -> vs.note;").is_ok());
        assert!(resolve("connection single -> vs.note;").is_ok());
        assert!(resolve("connection notes -> v.gate;").is_ok());
        assert!(resolve("connection notes -> v.note;").is_ok());
        assert_eq!(code("connection trio -> vs.note;"), "G204");
        assert_eq!(code("connection pair -> vs.note;"), "G204");
    }

    #[test]
    fn event_types_must_convert() {
        assert!(resolve("connection single -> v.note;").is_ok());
        assert_eq!(code("connection fine -> v.note;"), "T201");
    }

    #[test]
    fn indices() {
        let r = resolve("connection notes[1] -> v.note;").unwrap();
        assert_eq!(r.source.fan_size(), 1);
        let r = resolve("connection single -> vs.note[2];").unwrap();
        assert_eq!(r.dest.multiplicity, 1);
        assert_eq!(code("connection notes[4] -> v.note;"), "G202");
        assert_eq!(code("connection single -> vs.note[5];"), "G203");

        let r = resolve("connection single -> v.gate[3];").unwrap();
        assert_eq!(r.dest.array_size, 1);
        assert_eq!(code("connection single -> v.gate[4];"), "G203");
    }

    #[test]
    fn kinds_and_directions() {
        assert_eq!(code("connection single -> v.in;"), "T202");
        assert_eq!(code("connection out -> v.in;"), "R203");
        assert_eq!(code("connection v.in -> out;"), "R203");
        assert_eq!(code("connection v.out -> v.mix;"), "R204");
        assert_eq!(code("connection v.nothing -> out;"), "R201");
        assert_eq!(code("connection v.out -> nowhere;"), "R202");
    }

    #[test]
    fn kind_mismatch_message() {
        let err = resolve("connection single -> v.in;").unwrap_err();
        assert_eq!(err.message, "Cannot connect single (event) to v.in (stream)");
    }

    #[test]
    fn delays() {
        let base = Connection::new(EndpointRef::own("a"), EndpointRef::own("b"));
        assert!(check_delay(&base, 100).is_ok());
        assert!(check_delay(&base.clone().with_delay(0), 100).is_ok());
        assert!(check_delay(&base.clone().with_delay(100), 100).is_ok());
        assert_eq!(
            check_delay(&base.clone().with_delay(-1), 100).unwrap_err().code,
            errors::G206
        );
        assert_eq!(
            check_delay(&base.with_delay(101), 100).unwrap_err().code,
            errors::L201
        );
    }
}
