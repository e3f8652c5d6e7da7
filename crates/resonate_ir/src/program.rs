//! The top-level container for a compilation.

use crate::arena::Arena;
use crate::constants::ConstantTable;
use crate::errors;
use crate::function::Function;
use crate::ids::{ConstantId, FunctionId, InstanceId, ModuleId, StructId, VariableId};
use crate::module::{Module, ModuleKind, PATH_SEPARATOR};
use crate::types::{find_struct_cycle, StructMember, Structure, Type};
use crate::value::Value;
use crate::variable::{Variable, VariableRole};
use resonate_common::StringDictionary;
use resonate_diagnostics::Diagnostic;
use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// Annotation key that marks the main processor or graph.
pub const MAIN_ANNOTATION: &str = "main";

/// Every module of one compilation, plus the constant table and string
/// dictionary they share.
///
/// Modules, structs, functions and variables live in program-level arenas
/// and refer to each other by ID. Cloning a `Program` gives an independent
/// copy with identical IDs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Program {
    /// All modules, in declaration order.
    pub modules: Arena<ModuleId, Module>,
    /// All struct definitions.
    pub structs: Arena<StructId, Structure>,
    /// All functions.
    pub functions: Arena<FunctionId, Function>,
    /// All variables of every role.
    pub variables: Arena<VariableId, Variable>,
    /// The shared constant table.
    pub constants: ConstantTable,
    /// The shared string dictionary.
    pub strings: StringDictionary,
}

impl Program {
    /// Creates an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty module.
    pub fn add_module(&mut self, kind: ModuleKind, full_name: impl Into<String>) -> ModuleId {
        self.modules.alloc(Module::new(kind, full_name))
    }

    /// Finds the first module with the given fully-qualified name.
    pub fn find_module(&self, full_name: &str) -> Option<ModuleId> {
        self.modules.position(|m| m.full_name == full_name)
    }

    /// Returns the enclosing module, if it exists.
    pub fn parent_module(&self, module: ModuleId) -> Option<ModuleId> {
        self.modules[module]
            .parent_name()
            .and_then(|name| self.find_module(name))
    }

    /// Returns the modules directly nested in `module`.
    pub fn sub_modules(&self, module: ModuleId) -> Vec<ModuleId> {
        let name = &self.modules[module].full_name;
        self.modules
            .iter()
            .filter(|(_, m)| m.parent_name() == Some(name.as_str()))
            .map(|(id, _)| id)
            .collect()
    }

    /// Selects the main processor or graph.
    ///
    /// A configured name wins. Otherwise the first module annotated
    /// `main: true` is chosen, and failing that the first processor or
    /// graph with no `main` annotation at all.
    pub fn main_module(&self, configured: Option<&str>) -> Option<ModuleId> {
        let candidates = || self.modules.iter().filter(|(_, m)| !m.is_namespace());
        if let Some(name) = configured {
            return candidates().find(|(_, m)| m.full_name == name).map(|(id, _)| id);
        }
        candidates()
            .find(|(_, m)| m.annotation.get_bool(MAIN_ANNOTATION, &self.constants))
            .or_else(|| candidates().find(|(_, m)| !m.annotation.has(MAIN_ANNOTATION)))
            .map(|(id, _)| id)
    }

    /// Returns the module an instance refers to.
    pub fn instance_source(&self, graph: ModuleId, instance: InstanceId) -> Option<ModuleId> {
        let source_name = &self.modules[graph].instances[instance].source_name;
        self.find_module(source_name)
    }

    /// Adds a struct with no members to `module`.
    pub fn add_struct(&mut self, module: ModuleId, name: impl Into<String>) -> StructId {
        let id = self.structs.alloc(Structure::new(name, module));
        self.modules[module].structs.push(id);
        id
    }

    /// Appends a member to a struct, rejecting it if the struct would then
    /// contain itself.
    pub fn add_struct_member(
        &mut self,
        id: StructId,
        name: impl Into<String>,
        ty: Type,
        span: Span,
    ) -> Result<(), Diagnostic> {
        self.structs[id].members.push(StructMember {
            name: name.into(),
            ty,
        });
        let Some(cycle) = find_struct_cycle(&self.structs, id) else {
            return Ok(());
        };
        self.structs[id].members.pop();
        let names: Vec<String> = cycle.iter().map(|s| self.struct_full_name(*s)).collect();
        Err(match names.as_slice() {
            [only] => errors::type_contains_itself(only, span),
            [first, second] => errors::types_refer_to_each_other(first, second, span),
            _ => errors::recursive_types(&names[0], span),
        })
    }

    /// Finds a struct declared in `module`.
    pub fn find_struct(&self, module: ModuleId, name: &str) -> Option<StructId> {
        self.modules[module]
            .structs
            .iter()
            .copied()
            .find(|id| self.structs[*id].name == name)
    }

    /// Finds a struct by qualified name, such as `Synth::Voice`.
    pub fn find_struct_by_path(&self, path: &str) -> Option<StructId> {
        let (module, name) = path.rsplit_once(PATH_SEPARATOR)?;
        self.find_struct(self.find_module(module)?, name)
    }

    /// Returns a struct's qualified name.
    pub fn struct_full_name(&self, id: StructId) -> String {
        let s = &self.structs[id];
        format!("{}{PATH_SEPARATOR}{}", self.modules[s.module].full_name, s.name)
    }

    /// Formats a type in HEART syntax, with qualified struct names.
    pub fn type_description(&self, ty: &Type) -> String {
        ty.describe(&|id| self.struct_full_name(id))
    }

    /// Adds a free-standing variable.
    pub fn add_variable(&mut self, variable: Variable) -> VariableId {
        self.variables.alloc(variable)
    }

    /// Adds a state, external or constant variable to `module`.
    pub fn add_state_variable(&mut self, module: ModuleId, variable: Variable) -> VariableId {
        let id = self.variables.alloc(variable);
        self.modules[module].state_variables.push(id);
        id
    }

    /// Adds an unbound compile-time parameter to `module`.
    pub fn add_specialisation_param(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        ty: Type,
    ) -> VariableId {
        let id = self
            .variables
            .alloc(Variable::new(name, ty, VariableRole::Constant));
        self.modules[module].specialisation_params.push(id);
        id
    }

    /// Finds a module-level variable of `module` by name.
    pub fn find_state_variable(&self, module: ModuleId, name: &str) -> Option<VariableId> {
        let m = &self.modules[module];
        m.state_variables
            .iter()
            .chain(&m.specialisation_params)
            .copied()
            .find(|id| self.variables[*id].name == name)
    }

    /// Finds a module-level variable by qualified name, such as `Gain::level`.
    pub fn find_variable_by_path(&self, path: &str) -> Option<VariableId> {
        let (module, name) = path.rsplit_once(PATH_SEPARATOR)?;
        self.find_state_variable(self.find_module(module)?, name)
    }

    /// Adds a function to the module named in `function.module`.
    pub fn add_function(&mut self, function: Function) -> FunctionId {
        let module = function.module;
        let id = self.functions.alloc(function);
        self.modules[module].functions.push(id);
        id
    }

    /// Finds a function declared in `module`.
    pub fn find_function(&self, module: ModuleId, name: &str) -> Option<FunctionId> {
        self.modules[module]
            .functions
            .iter()
            .copied()
            .find(|id| self.functions[*id].name == name)
    }

    /// Finds a function by qualified name, such as `Gain::run`.
    pub fn find_function_by_path(&self, path: &str) -> Option<FunctionId> {
        let (module, name) = path.rsplit_once(PATH_SEPARATOR)?;
        self.find_function(self.find_module(module)?, name)
    }

    /// Returns the module that declares a function.
    pub fn module_of_function(&self, function: FunctionId) -> ModuleId {
        self.functions[function].module
    }

    /// Returns a function's qualified name.
    pub fn function_full_name(&self, function: FunctionId) -> String {
        let f = &self.functions[function];
        format!("{}{PATH_SEPARATOR}{}", self.modules[f.module].full_name, f.name)
    }

    /// Interns a constant.
    pub fn intern(&mut self, value: Value) -> ConstantId {
        self.constants.intern(value)
    }

    /// Returns a constant's value.
    pub fn constant(&self, id: ConstantId) -> &Value {
        self.constants.get(id)
    }

    /// Iterates over processors and graphs, skipping namespaces.
    pub fn processors_and_graphs(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().filter(|(_, m)| !m.is_namespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionKind;

    #[test]
    fn module_tree() {
        let mut program = Program::new();
        let ns = program.add_module(ModuleKind::Namespace, "Synth");
        let osc = program.add_module(ModuleKind::Processor, "Synth::Osc");
        let top = program.add_module(ModuleKind::Graph, "Top");
        assert_eq!(program.find_module("Synth::Osc"), Some(osc));
        assert_eq!(program.parent_module(osc), Some(ns));
        assert_eq!(program.parent_module(top), None);
        assert_eq!(program.sub_modules(ns), vec![osc]);
    }

    #[test]
    fn main_module_selection() {
        let mut program = Program::new();
        program.add_module(ModuleKind::Namespace, "Lib");
        let voice = program.add_module(ModuleKind::Processor, "Voice");
        let top = program.add_module(ModuleKind::Graph, "Top");
        assert_eq!(program.main_module(None), Some(voice));

        let yes = program.intern(Value::Bool(true));
        program.modules[top].annotation.set(MAIN_ANNOTATION, yes);
        assert_eq!(program.main_module(None), Some(top));
        assert_eq!(program.main_module(Some("Voice")), Some(voice));
        assert_eq!(program.main_module(Some("Lib")), None);
    }

    #[test]
    fn main_false_is_skipped() {
        let mut program = Program::new();
        let voice = program.add_module(ModuleKind::Processor, "Voice");
        let top = program.add_module(ModuleKind::Graph, "Top");
        let no = program.intern(Value::Bool(false));
        program.modules[voice].annotation.set(MAIN_ANNOTATION, no);
        assert_eq!(program.main_module(None), Some(top));
    }

    #[test]
    fn recursive_struct_rejected() {
        let mut program = Program::new();
        let m = program.add_module(ModuleKind::Namespace, "Types");
        let a = program.add_struct(m, "A");
        let b = program.add_struct(m, "B");
        program.add_struct_member(a, "b", Type::Struct(b), Span::DUMMY).unwrap();
        let err = program
            .add_struct_member(b, "a", Type::array(Type::Struct(a), 2), Span::DUMMY)
            .unwrap_err();
        assert_eq!(err.code, errors::S102);
        assert!(err.message.contains("Types::B"));
        assert!(program.structs[b].members.is_empty());

        let err = program
            .add_struct_member(a, "me", Type::Struct(a), Span::DUMMY)
            .unwrap_err();
        assert_eq!(err.code, errors::S101);
    }

    #[test]
    fn three_struct_cycle() {
        let mut program = Program::new();
        let m = program.add_module(ModuleKind::Namespace, "T");
        let a = program.add_struct(m, "A");
        let b = program.add_struct(m, "B");
        let c = program.add_struct(m, "C");
        program.add_struct_member(a, "b", Type::Struct(b), Span::DUMMY).unwrap();
        program.add_struct_member(b, "c", Type::Struct(c), Span::DUMMY).unwrap();
        let err = program
            .add_struct_member(c, "a", Type::Struct(a), Span::DUMMY)
            .unwrap_err();
        assert_eq!(err.code, errors::S103);
    }

    #[test]
    fn qualified_lookups() {
        let mut program = Program::new();
        let m = program.add_module(ModuleKind::Processor, "Fx::Gain");
        let s = program.add_struct(m, "Params");
        let level = program.add_state_variable(m, Variable::new("level", Type::float32(), VariableRole::State));
        let run = program.add_function(Function::new("run", m, FunctionKind::Run, Type::void()));
        assert_eq!(program.find_struct_by_path("Fx::Gain::Params"), Some(s));
        assert_eq!(program.find_variable_by_path("Fx::Gain::level"), Some(level));
        assert_eq!(program.find_function_by_path("Fx::Gain::run"), Some(run));
        assert_eq!(program.function_full_name(run), "Fx::Gain::run");
        assert_eq!(program.module_of_function(run), m);
        assert_eq!(program.type_description(&Type::array(Type::Struct(s), 2)), "Fx::Gain::Params[2]");
    }
}
