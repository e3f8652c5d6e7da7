//! Endpoint hoisting and exposure.
//!
//! Hoisting resolves graph endpoints declared as a path into a child, such as
//! `output out = voices.mixer.out;`, by copying the child endpoint's details
//! and wiring the two together. Exposure pushes child endpoints flagged as
//! `exposed` up into every graph that instantiates the child.
//!
//! Both rewrites can create endpoints that feed further rewrites in the
//! graphs above, so [`link_endpoints`] runs them over a worklist of dirty
//! graphs until nothing changes.

use crate::errors;
use resonate_common::InternalError;
use resonate_diagnostics::Diagnostic;
use resonate_ir::{
    Connection, Endpoint, EndpointDirection, EndpointId, EndpointKind, EndpointRef, InstanceId,
    Module, ModuleId, PathSegment, Program,
};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

/// Prefix of the intermediate endpoints created for multi-level paths.
pub const INTERMEDIATE_PREFIX: &str = "expose_";

/// Resolves all hoisted endpoints and exposes all flagged endpoints, across
/// every graph in the program.
pub fn link_endpoints(program: &mut Program) -> Result<(), Diagnostic> {
    check_graph_recursion(program)?;

    let graphs: Vec<ModuleId> = program
        .modules
        .iter()
        .filter(|(_, m)| m.is_graph())
        .map(|(id, _)| id)
        .collect();
    let mut queue: VecDeque<ModuleId> = graphs.iter().copied().collect();
    let mut queued: HashSet<ModuleId> = graphs.iter().copied().collect();
    let mut consumed: Vec<(ModuleId, EndpointId)> = Vec::new();

    let work: usize = program
        .modules
        .values()
        .flat_map(|m| m.endpoints.values())
        .map(|e| 1 + e.hoisted_path.as_ref().map_or(0, Vec::len))
        .sum();
    let limit = (graphs.len() + 1) * (work + 1);
    let mut iterations = 0usize;

    while let Some(graph) = queue.pop_front() {
        queued.remove(&graph);
        iterations += 1;
        if iterations > limit {
            return Err(InternalError::new(format!(
                "endpoint linking did not settle after {limit} iterations"
            ))
            .into());
        }
        trace!(graph = %program.modules[graph].full_name, "linking graph");

        let mut stack = Vec::new();
        let mut changed = hoist_endpoints(program, graph, &mut stack)?;
        changed |= expose_child_endpoints(program, graph, &mut consumed)?;

        if changed {
            let name = program.modules[graph].full_name.clone();
            for parent in instantiating_graphs(program, &name) {
                if queued.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
    }

    for (module, endpoint) in consumed {
        program.modules[module].endpoints[endpoint].needs_exposure = false;
    }
    Ok(())
}

/// Rejects graphs that instantiate themselves, directly or through other
/// graphs.
fn check_graph_recursion(program: &Program) -> Result<(), Diagnostic> {
    fn visit(
        program: &Program,
        module: ModuleId,
        stack: &mut Vec<ModuleId>,
        done: &mut HashSet<ModuleId>,
    ) -> Result<(), Diagnostic> {
        let m = &program.modules[module];
        if stack.contains(&module) {
            return Err(errors::recursive_graph(&m.full_name, m.span));
        }
        if !done.insert(module) {
            return Ok(());
        }
        stack.push(module);
        for instance in m.instances.values() {
            if let Some(child) = program.find_module(&instance.source_name) {
                if program.modules[child].is_graph() {
                    visit(program, child, stack, done)?;
                }
            }
        }
        stack.pop();
        Ok(())
    }

    let mut done = HashSet::new();
    for (id, module) in program.modules.iter() {
        if module.is_graph() {
            visit(program, id, &mut Vec::new(), &mut done)?;
        }
    }
    Ok(())
}

fn instantiating_graphs(program: &Program, name: &str) -> Vec<ModuleId> {
    program
        .modules
        .iter()
        .filter(|(_, m)| m.is_graph() && m.instances.values().any(|i| i.source_name == name))
        .map(|(id, _)| id)
        .collect()
}

/// Resolves every unresolved endpoint of `graph`, first declared first.
/// Returns `true` if any endpoint was resolved.
fn hoist_endpoints(
    program: &mut Program,
    graph: ModuleId,
    stack: &mut Vec<ModuleId>,
) -> Result<bool, Diagnostic> {
    if stack.contains(&graph) {
        let module = &program.modules[graph];
        return Err(errors::recursive_graph(&module.full_name, module.span));
    }
    stack.push(graph);
    let mut changed = false;
    while let Some(endpoint) = program.modules[graph]
        .endpoints
        .position(|e| e.is_unresolved())
    {
        hoist_endpoint(program, graph, endpoint, stack)?;
        changed = true;
    }
    stack.pop();
    Ok(changed)
}

fn hoist_endpoint(
    program: &mut Program,
    graph: ModuleId,
    endpoint: EndpointId,
    stack: &mut Vec<ModuleId>,
) -> Result<(), Diagnostic> {
    let module = &program.modules[graph];
    let target = &module.endpoints[endpoint];
    let (name, direction, span) = (target.name.clone(), target.direction, target.span);
    let path = target.hoisted_path.clone().unwrap_or_default();

    let [first, rest @ ..] = path.as_slice() else {
        return Err(errors::unresolved_endpoint(&name, span));
    };
    if rest.is_empty() {
        return Err(errors::cannot_find_endpoint(&first.name, &module.full_name, span));
    }
    if path.iter().any(|segment| segment.index.is_some()) {
        return Err(errors::not_yet_implemented(
            "indexed segments in hoisted endpoint paths",
            span,
        ));
    }

    let instance_id = module
        .find_instance(&first.name)
        .ok_or_else(|| errors::cannot_find_processor(&first.name, span))?;
    let instance = &module.instances[instance_id];
    if instance.array_size.is_some() {
        return Err(errors::not_yet_implemented(
            "hoisting endpoints from arrays of processors",
            span,
        ));
    }
    let child = program
        .find_module(&instance.source_name)
        .ok_or_else(|| errors::cannot_find_processor(&instance.source_name, span))?;

    let child_endpoint_name = match rest {
        [single] => single.name.clone(),
        deeper => add_intermediate_endpoint(program, child, &first.name, direction, &path, deeper, span)?,
    };

    let child_module = &program.modules[child];
    let child_endpoint = find_directed(child_module, &child_endpoint_name, direction)
        .ok_or_else(|| {
            errors::cannot_find_endpoint(&child_endpoint_name, &child_module.full_name, span)
        })?;
    if child_module.endpoints[child_endpoint].is_unresolved() {
        hoist_endpoints(program, child, stack)?;
    }

    let source = &program.modules[child].endpoints[child_endpoint];
    let Some(details) = source.details.clone() else {
        return Err(errors::unresolved_endpoint(&child_endpoint_name, span));
    };
    if details.array_size.is_some() {
        return Err(errors::not_yet_implemented("hoisting endpoint arrays", span));
    }
    let annotation = source.annotation.clone();

    let target = &mut program.modules[graph].endpoints[endpoint];
    target.details = Some(details);
    target.annotation = annotation;
    target.hoisted_path = None;

    let own = EndpointRef::own(name.clone());
    let inner = EndpointRef::child(instance_id, child_endpoint_name);
    let mut connection = match direction {
        EndpointDirection::Input => Connection::new(own, inner),
        EndpointDirection::Output => Connection::new(inner, own),
    };
    connection.span = span;
    let graph_module = &mut program.modules[graph];
    graph_module.add_connection(connection);
    debug!(graph = %graph_module.full_name, endpoint = %name, "hoisted endpoint");
    Ok(())
}

/// Adds an unresolved endpoint to the child graph that forwards the rest of
/// the path, and returns its name. The name is built from the whole path as
/// seen from the parent graph.
fn add_intermediate_endpoint(
    program: &mut Program,
    child: ModuleId,
    instance_name: &str,
    direction: EndpointDirection,
    full_path: &[PathSegment],
    path: &[PathSegment],
    span: resonate_source::Span,
) -> Result<String, Diagnostic> {
    let module = &mut program.modules[child];
    if !module.is_graph() {
        return Err(errors::target_is_not_a_graph(instance_name, span));
    }
    let parts: Vec<&str> = full_path.iter().map(|s| s.name.as_str()).collect();
    let name = unique_endpoint_name(module, &format!("{INTERMEDIATE_PREFIX}{}", parts.join("_")));
    let mut endpoint = Endpoint::hoisted(name.clone(), direction, path.to_vec());
    endpoint.span = span;
    module.add_endpoint(endpoint);
    debug!(graph = %module.full_name, endpoint = %name, "added intermediate endpoint");
    Ok(name)
}

/// Returns `base`, or `base` suffixed with `_2`, `_3` and so on until no
/// endpoint of `module` has that name.
pub fn unique_endpoint_name(module: &Module, base: &str) -> String {
    if module.find_endpoint(base).is_none() {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| module.find_endpoint(candidate).is_none())
        .unwrap_or_else(|| base.to_string())
}

fn find_directed(module: &Module, name: &str, direction: EndpointDirection) -> Option<EndpointId> {
    match direction {
        EndpointDirection::Input => module.find_input(name),
        EndpointDirection::Output => module.find_output(name),
    }
}

/// Copies the flagged endpoints of every child into `graph` and connects
/// them. Returns `true` if the graph's endpoints changed.
fn expose_child_endpoints(
    program: &mut Program,
    graph: ModuleId,
    consumed: &mut Vec<(ModuleId, EndpointId)>,
) -> Result<bool, Diagnostic> {
    let instances: Vec<(InstanceId, String, bool)> = program.modules[graph]
        .instances
        .iter()
        .map(|(id, i)| (id, i.source_name.clone(), i.array_size.is_some()))
        .collect();

    let mut changed = false;
    for (instance, source_name, is_array) in instances {
        let child = program
            .find_module(&source_name)
            .ok_or_else(|| errors::cannot_find_processor(&source_name, program.modules[graph].span))?;
        let flagged: Vec<(EndpointId, Endpoint)> = program.modules[child]
            .endpoints
            .iter()
            .filter(|(_, e)| e.needs_exposure && !e.is_unresolved())
            .map(|(id, e)| (id, e.clone()))
            .collect();

        for (child_endpoint, endpoint) in flagged {
            if is_array {
                return Err(errors::not_yet_implemented(
                    "exposing endpoints of arrays of processors",
                    endpoint.span,
                ));
            }
            consumed.push((child, child_endpoint));
            changed |= merge_exposed_endpoint(program, graph, instance, &endpoint)?;

            let own = EndpointRef::own(endpoint.name.clone());
            let inner = EndpointRef::child(instance, endpoint.name.clone());
            let mut connection = match endpoint.direction {
                EndpointDirection::Input => Connection::new(own, inner),
                EndpointDirection::Output => Connection::new(inner, own),
            };
            connection.span = endpoint.span;
            let module = &mut program.modules[graph];
            if !module.has_connection(&connection) {
                module.add_connection(connection);
                debug!(graph = %module.full_name, endpoint = %endpoint.name, "connected exposed endpoint");
            }
        }
    }
    Ok(changed)
}

/// Adds `endpoint` to `graph`, or unions its event types into a same-named
/// endpoint. Returns `true` if the graph changed.
fn merge_exposed_endpoint(
    program: &mut Program,
    graph: ModuleId,
    instance: InstanceId,
    endpoint: &Endpoint,
) -> Result<bool, Diagnostic> {
    let Some(incoming) = endpoint.details.as_ref() else {
        return Ok(false);
    };
    let module = &program.modules[graph];
    let Some(existing_id) = module.find_endpoint(&endpoint.name) else {
        let mut exposed = Endpoint::new(endpoint.name.clone(), endpoint.direction, incoming.clone());
        exposed.annotation = endpoint.annotation.clone();
        exposed.needs_exposure = true;
        exposed.span = endpoint.span;
        let module = &mut program.modules[graph];
        module.add_endpoint(exposed);
        debug!(graph = %module.full_name, endpoint = %endpoint.name, "exposed endpoint");
        return Ok(true);
    };

    let existing = &module.endpoints[existing_id];
    let clash = || {
        let instance_name = &module.instances[instance].name;
        let existing_types = existing
            .details
            .as_ref()
            .map_or_else(|| "unresolved".to_string(), |d| crate::resolver::describe_types(program, d));
        errors::cannot_connect(
            &format!("{instance_name}.{}", endpoint.name),
            &crate::resolver::describe_types(program, incoming),
            &endpoint.name,
            &existing_types,
            endpoint.span,
        )
    };
    let Some(details) = existing.details.as_ref() else {
        return Err(clash());
    };
    if existing.direction != endpoint.direction || details.kind != incoming.kind {
        return Err(clash());
    }
    if details.kind != EndpointKind::Event {
        return if details.data_types == incoming.data_types {
            Ok(false)
        } else {
            Err(clash())
        };
    }

    let missing: Vec<_> = incoming
        .data_types
        .iter()
        .filter(|t| !details.has_type(t))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(false);
    }
    if let Some(details) = program.modules[graph].endpoints[existing_id].details.as_mut() {
        details.data_types.extend(missing);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_heart::{parse, to_heart};

    fn link(text: &str) -> Result<Program, Diagnostic> {
        let mut program = parse(text).unwrap();
        link_endpoints(&mut program)?;
        Ok(program)
    }

    fn link_err(text: &str) -> String {
        link(text).unwrap_err().code.to_string()
    }

    #[test]
    fn hoists_a_child_endpoint() {
        let program = link(
            "#HEART 1
processor P
{
    input e event float32 [[min: 0.0f]];
    output out stream float32;
}
graph G
{
    input fwd = inner.e;
    output out stream float32;
    node inner = P;
}
",
        )
        .unwrap();
        let g = program.find_module("G").unwrap();
        let module = &program.modules[g];
        let fwd = &module.endpoints[module.find_input("fwd").unwrap()];
        assert!(!fwd.is_unresolved());
        assert!(fwd.hoisted_path.is_none());
        assert!(fwd.annotation.has("min"));
        assert_eq!(module.connections.len(), 1);

        let text = to_heart(&program);
        assert!(text.contains("    input fwd event float32 [[min: 0.0f]];\n"));
        assert!(text.contains("    connection fwd -> inner.e;\n"));
    }

    #[test]
    fn hoists_through_an_intermediate_graph() {
        let program = link(
            "#HEART 1
processor P
{
    output o stream float32;
}
graph Mid
{
    output out stream float32;
    output expose_mid_p_o stream float32;
    node p = P;
}
graph Top
{
    output deep = mid.p.o;
    node mid = Mid;
}
",
        )
        .unwrap();
        let text = to_heart(&program);
        assert!(text.contains("    output expose_mid_p_o_2 stream float32;\n"));
        assert!(text.contains("    connection p.o -> expose_mid_p_o_2;\n"));
        assert!(text.contains("    output deep stream float32;\n"));
        assert!(text.contains("    connection mid.expose_mid_p_o_2 -> deep;\n"));
    }

    #[test]
    fn hoisting_errors() {
        let processor = "#HEART 1
processor P
{
    output o stream float32;
}
";
        let through_processor = format!("{processor}graph G\n{{\n    output x = p.o.z;\n    node p = P;\n}}\n");
        assert_eq!(link_err(&through_processor), "R207");
        let unknown_instance = format!("{processor}graph G\n{{\n    output x = q.o;\n    node p = P;\n}}\n");
        assert_eq!(link_err(&unknown_instance), "R205");
        let unknown_endpoint = format!("{processor}graph G\n{{\n    output x = p.zz;\n    node p = P;\n}}\n");
        assert_eq!(link_err(&unknown_endpoint), "R206");
        let wrong_direction = format!("{processor}graph G\n{{\n    input x = p.o;\n    node p = P;\n}}\n");
        assert_eq!(link_err(&wrong_direction), "R206");
        let array = format!("{processor}graph G\n{{\n    output x = p.o;\n    node p = P[2];\n}}\n");
        assert_eq!(link_err(&array), "U201");
        let indexed = format!("{processor}graph G\n{{\n    output x = p[1].o;\n    node p = P;\n}}\n");
        assert_eq!(link_err(&indexed), "U201");
    }

    #[test]
    fn recursive_graph_is_rejected() {
        let text = "#HEART 1
graph A
{
    output o = a.o;
    node a = A;
}
";
        assert_eq!(link_err(text), "G205");
    }

    const EXPOSING: &str = "#HEART 1
processor P
{
    output log event int32 exposed;
    output out stream float32;
}
processor Q
{
    output log event float32 exposed;
    output out stream float32;
}
graph G
{
    output out stream float32;
    node p = P;
    node q = Q;
}
graph Top
{
    output out stream float32;
    node g = G;
}
";

    #[test]
    fn exposes_and_unions_event_types() {
        let program = link(EXPOSING).unwrap();
        let text = to_heart(&program);
        assert!(text.contains("    output log event (int32, float32);\n"));
        assert!(text.contains("    connection p.log -> log;\n"));
        assert!(text.contains("    connection q.log -> log;\n"));
        assert!(text.contains("    connection g.log -> log;\n"));
        assert!(text.contains("    output log event (int32, float32) exposed;\n"));

        let top = program.find_module("Top").unwrap();
        assert_eq!(program.modules[top].connections.len(), 1);
        let p = program.find_module("P").unwrap();
        assert!(program.modules[p].endpoints.values().all(|e| !e.needs_exposure));
    }

    #[test]
    fn linking_is_idempotent() {
        let mut program = link(EXPOSING).unwrap();
        let before = to_heart(&program);
        link_endpoints(&mut program).unwrap();
        assert_eq!(to_heart(&program), before);
    }

    #[test]
    fn non_event_clash() {
        let text = "#HEART 1
processor P
{
    output meter stream float32 exposed;
}
graph G
{
    output meter stream int32;
    node p = P;
}
";
        assert_eq!(link_err(text), "T201");
    }

    #[test]
    fn unique_names() {
        let mut module = Module::new(resonate_ir::ModuleKind::Graph, "G");
        assert_eq!(unique_endpoint_name(&module, "expose_a"), "expose_a");
        module.add_endpoint(Endpoint::hoisted("expose_a", EndpointDirection::Output, Vec::new()));
        module.add_endpoint(Endpoint::hoisted("expose_a_2", EndpointDirection::Output, Vec::new()));
        assert_eq!(unique_endpoint_name(&module, "expose_a"), "expose_a_3");
    }
}
