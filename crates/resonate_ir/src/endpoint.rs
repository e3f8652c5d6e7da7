//! Input and output endpoints of processors and graphs.

use crate::annotation::Annotation;
use crate::types::{Type, TypeRules};
use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// Name of the event output that carries console messages.
pub const CONSOLE_ENDPOINT_NAME: &str = "_console";

/// Whether an endpoint receives or produces data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EndpointDirection {
    /// Data flows into the module.
    Input,
    /// Data flows out of the module.
    Output,
}

impl EndpointDirection {
    /// Returns the HEART keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            EndpointDirection::Input => "input",
            EndpointDirection::Output => "output",
        }
    }
}

/// How data travels through an endpoint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EndpointKind {
    /// One value per frame.
    Stream,
    /// A value that is sampled rather than streamed.
    Value,
    /// Discrete, timestamped messages.
    Event,
}

impl EndpointKind {
    /// Returns the HEART keyword.
    pub fn name(self) -> &'static str {
        match self {
            EndpointKind::Stream => "stream",
            EndpointKind::Value => "value",
            EndpointKind::Event => "event",
        }
    }

    /// Looks up a kind by its HEART keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "stream" => Some(EndpointKind::Stream),
            "value" => Some(EndpointKind::Value),
            "event" => Some(EndpointKind::Event),
            _ => None,
        }
    }
}

/// The kind, data types and array size of a resolved endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDetails {
    /// The endpoint kind.
    pub kind: EndpointKind,
    /// Candidate data types. Only event endpoints may list more than one.
    pub data_types: Vec<Type>,
    /// The array size for endpoint arrays.
    pub array_size: Option<u32>,
}

impl EndpointDetails {
    /// Creates details with a single data type.
    pub fn new(kind: EndpointKind, data_type: Type) -> Self {
        Self {
            kind,
            data_types: vec![data_type],
            array_size: None,
        }
    }

    /// Returns the number of array elements, counting a plain endpoint as 1.
    pub fn array_len(&self) -> u32 {
        self.array_size.unwrap_or(1)
    }

    /// Returns the only data type, or `None` if there is not exactly one.
    pub fn single_type(&self) -> Option<&Type> {
        match self.data_types.as_slice() {
            [ty] => Some(ty),
            _ => None,
        }
    }

    /// Returns the first data type that `ty` converts to silently.
    pub fn accepted_type(&self, ty: &Type) -> Option<&Type> {
        self.data_types
            .iter()
            .find(|candidate| TypeRules::can_silently_cast(candidate, ty))
    }

    /// Returns `true` if any data type is exactly `ty`, ignoring qualifiers.
    pub fn has_type(&self, ty: &Type) -> bool {
        self.data_types
            .iter()
            .any(|t| t.remove_qualifiers() == ty.remove_qualifiers())
    }
}

/// One step of a hoisted endpoint path, such as `voices[2]` or `gain`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// The instance or endpoint name.
    pub name: String,
    /// An optional index into an instance array.
    pub index: Option<u32>,
}

impl PathSegment {
    /// Creates a segment without an index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }
}

/// An input or output of a processor or graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Endpoint {
    /// The endpoint name, unique within its module.
    pub name: String,
    /// Input or output.
    pub direction: EndpointDirection,
    /// The resolved details, or `None` while a hoisted path is pending.
    pub details: Option<EndpointDetails>,
    /// Free-form metadata.
    pub annotation: Annotation,
    /// The child path this endpoint forwards to, such as `inner.osc.out`.
    pub hoisted_path: Option<Vec<PathSegment>>,
    /// Set on an endpoint that must be surfaced in every enclosing graph.
    pub needs_exposure: bool,
    /// Where the endpoint was declared.
    pub span: Span,
}

impl Endpoint {
    /// Creates a resolved endpoint.
    pub fn new(name: impl Into<String>, direction: EndpointDirection, details: EndpointDetails) -> Self {
        Self {
            name: name.into(),
            direction,
            details: Some(details),
            annotation: Annotation::new(),
            hoisted_path: None,
            needs_exposure: false,
            span: Span::DUMMY,
        }
    }

    /// Creates an unresolved endpoint that forwards to a child path.
    pub fn hoisted(name: impl Into<String>, direction: EndpointDirection, path: Vec<PathSegment>) -> Self {
        Self {
            name: name.into(),
            direction,
            details: None,
            annotation: Annotation::new(),
            hoisted_path: Some(path),
            needs_exposure: false,
            span: Span::DUMMY,
        }
    }

    /// Returns `true` for an input.
    pub fn is_input(&self) -> bool {
        self.direction == EndpointDirection::Input
    }

    /// Returns `true` for an output.
    pub fn is_output(&self) -> bool {
        self.direction == EndpointDirection::Output
    }

    /// Returns `true` while the details have not been resolved.
    pub fn is_unresolved(&self) -> bool {
        self.details.is_none()
    }

    /// Returns the kind, if resolved.
    pub fn kind(&self) -> Option<EndpointKind> {
        self.details.as_ref().map(|d| d.kind)
    }

    /// Returns the array size, if resolved and arrayed.
    pub fn array_size(&self) -> Option<u32> {
        self.details.as_ref().and_then(|d| d.array_size)
    }
}
