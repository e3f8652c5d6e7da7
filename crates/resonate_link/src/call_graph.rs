//! Call-flow analysis: recursion, worst-case stack depth and loops that can
//! never exit.

use crate::errors;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use resonate_diagnostics::Diagnostic;
use resonate_ir::{Expr, Function, FunctionId, Program};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// The functions of a program and who calls whom.
pub struct CallGraph {
    graph: DiGraph<FunctionId, ()>,
    callees: Vec<Vec<FunctionId>>,
}

impl CallGraph {
    /// Builds the call graph from every call statement and pure call.
    pub fn build(program: &Program) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = program
            .functions
            .ids()
            .map(|id| graph.add_node(id))
            .collect();
        let callees: Vec<Vec<FunctionId>> =
            program.functions.values().map(function_calls).collect();
        for (caller, calls) in callees.iter().enumerate() {
            for callee in calls {
                if let Some(&target) = nodes.get(callee.as_raw() as usize) {
                    graph.add_edge(nodes[caller], target, ());
                }
            }
        }
        Self { graph, callees }
    }

    /// Returns the distinct functions `function` calls, in first-call order.
    pub fn callees(&self, function: FunctionId) -> &[FunctionId] {
        self.callees
            .get(function.as_raw() as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Finds the first cycle of calls, as the functions along it.
    pub fn find_recursion(&self) -> Option<Vec<FunctionId>> {
        let mut done = HashSet::new();
        let mut stack = Vec::new();
        for index in 0..self.callees.len() {
            let function = FunctionId::from_raw(index as u32);
            if let Some(cycle) = self.visit(function, &mut stack, &mut done) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit(
        &self,
        function: FunctionId,
        stack: &mut Vec<FunctionId>,
        done: &mut HashSet<FunctionId>,
    ) -> Option<Vec<FunctionId>> {
        if let Some(start) = stack.iter().position(|f| *f == function) {
            return Some(stack[start..].to_vec());
        }
        if done.contains(&function) {
            return None;
        }
        stack.push(function);
        for callee in self.callees(function) {
            if let Some(cycle) = self.visit(*callee, stack, done) {
                return Some(cycle);
            }
        }
        stack.pop();
        done.insert(function);
        None
    }

    /// Returns the largest sum of frame sizes along any call chain, or
    /// `None` if the calls are recursive.
    pub fn maximum_stack_size(&self, program: &Program) -> Option<u64> {
        let order = toposort(&self.graph, None).ok()?;
        let mut needed = vec![0u64; self.callees.len()];
        for node in order.iter().rev() {
            let function = self.graph[*node];
            let deepest_callee = self
                .callees(function)
                .iter()
                .map(|c| needed[c.as_raw() as usize])
                .max()
                .unwrap_or(0);
            needed[function.as_raw() as usize] =
                frame_size(program, function).saturating_add(deepest_callee);
        }
        Some(needed.into_iter().max().unwrap_or(0))
    }
}

/// Returns the distinct functions called from a function body, including pure
/// calls in terminators.
pub fn function_calls(function: &Function) -> Vec<FunctionId> {
    let mut calls = Vec::new();
    let mut add = |f: FunctionId| {
        if !calls.contains(&f) {
            calls.push(f);
        }
    };
    for block in function.blocks.values() {
        for statement in &block.statements {
            statement.called_functions().into_iter().for_each(&mut add);
        }
        block.terminator.walk_exprs(&mut |e| {
            if let Expr::PureCall { function, .. } = e {
                add(*function);
            }
        });
    }
    calls
}

/// The bytes a call to `function` puts on the stack: its return value,
/// parameters and locals.
pub fn frame_size(program: &Program, function: FunctionId) -> u64 {
    let f = &program.functions[function];
    let variables = f.parameters.iter().chain(&f.locals);
    variables.fold(f.return_type.packed_size(&program.structs), |total, v| {
        total.saturating_add(program.variables[*v].ty.packed_size(&program.structs))
    })
}

/// Finds the first recursive call sequence in the program.
pub fn find_recursive_call_sequence(program: &Program) -> Option<Vec<FunctionId>> {
    CallGraph::build(program).find_recursion()
}

/// Returns the worst-case stack size, or `None` if the program recurses.
pub fn maximum_stack_size(program: &Program) -> Option<u64> {
    CallGraph::build(program).maximum_stack_size(program)
}

/// Returns `true` if the function can enter a loop that neither returns nor
/// advances.
///
/// A function without blocks, or whose entry block returns, cannot. Otherwise
/// some block reachable from the entry must return or call advance.
pub fn function_contains_infinite_loop(function: &Function) -> bool {
    let Some(entry) = function.entry_block() else {
        return false;
    };
    if function.blocks[entry].terminator.is_return() {
        return false;
    }

    let mut seen = HashSet::from([entry]);
    let mut queue = VecDeque::from([entry]);
    while let Some(id) = queue.pop_front() {
        let block = &function.blocks[id];
        if block.terminator.is_return() || block.calls_advance() {
            return false;
        }
        for next in block.terminator.successors() {
            if function.blocks.try_get(next).is_some() && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    true
}

/// Rejects recursive calls, naming the functions involved.
pub fn check_recursion(program: &Program) -> Result<(), Diagnostic> {
    let Some(cycle) = find_recursive_call_sequence(program) else {
        return Ok(());
    };
    let names: Vec<String> = cycle.iter().map(|f| program.function_full_name(*f)).collect();
    let span = program.functions[cycle[0]].span;
    Err(match names.as_slice() {
        [single] => errors::function_calls_itself_recursively(single, span),
        [first, second] => errors::functions_call_each_other_recursively(first, second, span),
        _ => errors::recursive_function_call_sequence(&names, span),
    })
}

/// Rejects programs whose worst-case stack exceeds `max_bytes`. A budget of
/// zero disables the check.
pub fn check_stack_size(program: &Program, max_bytes: u64) -> Result<(), Diagnostic> {
    if max_bytes == 0 {
        return Ok(());
    }
    let Some(required) = maximum_stack_size(program) else {
        return Ok(());
    };
    debug!(required, max_bytes, "computed maximum stack size");
    if required > max_bytes {
        return Err(errors::maximum_stack_size_exceeded(
            &describe_size(required),
            &describe_size(max_bytes),
        ));
    }
    Ok(())
}

/// Rejects the first function that contains an infinite loop.
pub fn check_infinite_loops(program: &Program) -> Result<(), Diagnostic> {
    for (id, function) in program.functions.iter() {
        if function_contains_infinite_loop(function) {
            return Err(errors::function_contains_infinite_loop(
                &program.function_full_name(id),
                function.span,
            ));
        }
    }
    Ok(())
}

/// Formats a byte count for messages: `512 bytes`, `1.5 KB`, `20.0 MB`.
pub fn describe_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes < KB {
        format!("{bytes} bytes")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resonate_heart::parse;

    fn namespace(functions: &str) -> Program {
        parse(&format!("#HEART 1\nnamespace M\n{{\n{functions}}}\n")).unwrap()
    }

    fn calling(name: &str, callee: &str) -> String {
        format!(
            "    function {name} () -> void\n    {{\n        var float32[1000] $buf;\n        @block_0:\n            call M::{callee} ();\n            return;\n    }}\n"
        )
    }

    fn leaf(name: &str) -> String {
        format!(
            "    function {name} () -> void\n    {{\n        var float32[1000] $buf;\n        @block_0:\n            return;\n    }}\n"
        )
    }

    #[test]
    fn direct_recursion() {
        let program = namespace(&calling("f", "f"));
        let err = check_recursion(&program).unwrap_err();
        assert_eq!(err.message, "The function 'M::f' calls itself recursively");
        assert!(maximum_stack_size(&program).is_none());
    }

    #[test]
    fn mutual_and_longer_recursion() {
        let program = namespace(&format!("{}{}", calling("a", "b"), calling("b", "a")));
        assert_eq!(check_recursion(&program).unwrap_err().code, errors::I202);

        let program = namespace(&format!(
            "{}{}{}",
            calling("a", "b"),
            calling("b", "c"),
            calling("c", "a")
        ));
        let err = check_recursion(&program).unwrap_err();
        assert_eq!(err.code, errors::I203);
        assert_eq!(err.message, "Recursive call sequence via functions: M::a, M::b, M::c");
    }

    #[test]
    fn stack_budget() {
        let program = namespace(&format!("{}{}{}", calling("a", "b"), calling("b", "c"), leaf("c")));
        check_recursion(&program).unwrap();
        assert_eq!(maximum_stack_size(&program), Some(12_000));
        check_stack_size(&program, 12_000).unwrap();
        check_stack_size(&program, 0).unwrap();
        let err = check_stack_size(&program, 11_999).unwrap_err();
        assert_eq!(err.code, errors::L202);
        assert!(err.message.contains("11.7 KB"));
    }

    #[test]
    fn oversized_frame_exceeds_budget() {
        let text = "    function big () -> void\n    {\n        var float64[4294967295][4294967295] $big;\n        @block_0:\n            return;\n    }\n";
        let program = namespace(&format!("{}{text}", calling("a", "big")));
        assert_eq!(maximum_stack_size(&program), Some(u64::MAX));
        let err = check_stack_size(&program, 1024 * 1024).unwrap_err();
        assert_eq!(err.code, errors::L202);
    }

    #[test]
    fn shared_callee_counts_once_per_chain() {
        let text = "    function top () -> void\n    {\n        @block_0:\n            call M::x ();\n            call M::y ();\n            return;\n    }\n";
        let program = namespace(&format!("{text}{}{}", calling("x", "y"), leaf("y")));
        assert_eq!(maximum_stack_size(&program), Some(8_000));
    }

    #[test]
    fn infinite_loops() {
        let program = namespace(
            "    function spin () -> void
    {
        @block_0:
            branch @loop;
        @loop:
            branch @loop;
    }
    function exits () -> void
    {
        @block_0:
            branch @loop;
        @loop:
            branch_if true ? @loop : @done;
        @done:
            return;
    }
    function straight () -> void
    {
        @block_0:
            return;
    }
",
        );
        let find = |name: &str| &program.functions[program.find_function_by_path(name).unwrap()];
        assert!(function_contains_infinite_loop(find("M::spin")));
        assert!(!function_contains_infinite_loop(find("M::exits")));
        assert!(!function_contains_infinite_loop(find("M::straight")));
        let err = check_infinite_loops(&program).unwrap_err();
        assert_eq!(err.code, errors::I204);
        assert!(err.message.contains("M::spin"));
    }

    #[test]
    fn sizes() {
        assert_eq!(describe_size(512), "512 bytes");
        assert_eq!(describe_size(1536), "1.5 KB");
        assert_eq!(describe_size(20 * 1024 * 1024), "20.0 MB");
    }
}
