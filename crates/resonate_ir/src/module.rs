//! Modules: processors, graphs and namespaces.

use crate::annotation::Annotation;
use crate::arena::Arena;
use crate::connection::Connection;
use crate::endpoint::{Endpoint, EndpointDirection};
use crate::ids::{ConnectionId, EndpointId, FunctionId, InstanceId, StructId, VariableId};
use crate::instance::ProcessorInstance;
use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// Separator between the parts of a qualified module name.
pub const PATH_SEPARATOR: &str = "::";

/// What a module is.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ModuleKind {
    /// A leaf unit of computation with a `run` function.
    Processor,
    /// A set of processor instances and the connections between them.
    Graph,
    /// A container for other modules, structs, functions and constants.
    Namespace,
}

impl ModuleKind {
    /// Returns the HEART keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            ModuleKind::Processor => "processor",
            ModuleKind::Graph => "graph",
            ModuleKind::Namespace => "namespace",
        }
    }

    /// Looks up a kind by its HEART keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "processor" => Some(ModuleKind::Processor),
            "graph" => Some(ModuleKind::Graph),
            "namespace" => Some(ModuleKind::Namespace),
            _ => None,
        }
    }
}

/// A processor, graph or namespace with everything it declares.
///
/// Endpoints, instances and connections live in the module's own arenas.
/// Structs, functions and variables live in the program and are listed here
/// by ID.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Module {
    /// What the module is.
    pub kind: ModuleKind,
    /// The fully-qualified name, such as `Synth::Voice`.
    pub full_name: String,
    /// Free-form metadata, such as `main: true`.
    pub annotation: Annotation,
    /// Inputs and outputs, in declaration order.
    pub endpoints: Arena<EndpointId, Endpoint>,
    /// Graph nodes.
    pub instances: Arena<InstanceId, ProcessorInstance>,
    /// Graph wires.
    pub connections: Arena<ConnectionId, Connection>,
    /// Structs declared here.
    pub structs: Vec<StructId>,
    /// Functions declared here.
    pub functions: Vec<FunctionId>,
    /// State, external and module-level constant variables.
    pub state_variables: Vec<VariableId>,
    /// Compile-time parameters that are still unbound.
    pub specialisation_params: Vec<VariableId>,
    /// Where the module was declared.
    pub span: Span,
}

impl Module {
    /// Creates an empty module.
    pub fn new(kind: ModuleKind, full_name: impl Into<String>) -> Self {
        Self {
            kind,
            full_name: full_name.into(),
            annotation: Annotation::new(),
            endpoints: Arena::new(),
            instances: Arena::new(),
            connections: Arena::new(),
            structs: Vec::new(),
            functions: Vec::new(),
            state_variables: Vec::new(),
            specialisation_params: Vec::new(),
            span: Span::DUMMY,
        }
    }

    /// Returns the last part of the qualified name.
    pub fn short_name(&self) -> &str {
        self.full_name
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(&self.full_name)
    }

    /// Returns the qualified name of the enclosing module, if any.
    pub fn parent_name(&self) -> Option<&str> {
        self.full_name
            .rfind(PATH_SEPARATOR)
            .map(|pos| &self.full_name[..pos])
    }

    /// Returns `true` for a processor.
    pub fn is_processor(&self) -> bool {
        self.kind == ModuleKind::Processor
    }

    /// Returns `true` for a graph.
    pub fn is_graph(&self) -> bool {
        self.kind == ModuleKind::Graph
    }

    /// Returns `true` for a namespace.
    pub fn is_namespace(&self) -> bool {
        self.kind == ModuleKind::Namespace
    }

    /// Finds an endpoint by name.
    pub fn find_endpoint(&self, name: &str) -> Option<EndpointId> {
        self.endpoints.position(|e| e.name == name)
    }

    /// Finds an input by name.
    pub fn find_input(&self, name: &str) -> Option<EndpointId> {
        self.endpoints
            .position(|e| e.name == name && e.direction == EndpointDirection::Input)
    }

    /// Finds an output by name.
    pub fn find_output(&self, name: &str) -> Option<EndpointId> {
        self.endpoints
            .position(|e| e.name == name && e.direction == EndpointDirection::Output)
    }

    /// Iterates over the inputs.
    pub fn inputs(&self) -> impl Iterator<Item = (EndpointId, &Endpoint)> {
        self.endpoints.iter().filter(|(_, e)| e.is_input())
    }

    /// Iterates over the outputs.
    pub fn outputs(&self) -> impl Iterator<Item = (EndpointId, &Endpoint)> {
        self.endpoints.iter().filter(|(_, e)| e.is_output())
    }

    /// Finds an instance by name.
    pub fn find_instance(&self, name: &str) -> Option<InstanceId> {
        self.instances.position(|i| i.name == name)
    }

    /// Adds an endpoint.
    pub fn add_endpoint(&mut self, endpoint: Endpoint) -> EndpointId {
        self.endpoints.alloc(endpoint)
    }

    /// Adds an instance.
    pub fn add_instance(&mut self, instance: ProcessorInstance) -> InstanceId {
        self.instances.alloc(instance)
    }

    /// Adds a connection.
    pub fn add_connection(&mut self, connection: Connection) -> ConnectionId {
        self.connections.alloc(connection)
    }

    /// Returns `true` if an identical source/destination pair is already
    /// connected.
    pub fn has_connection(&self, connection: &Connection) -> bool {
        self.connections
            .values()
            .any(|c| c.source == connection.source && c.dest == connection.dest)
    }
}
