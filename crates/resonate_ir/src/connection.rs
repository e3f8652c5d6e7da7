//! Connections between endpoints inside a graph.

use crate::ids::InstanceId;
use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// How a value is resampled when it crosses between clock rates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum InterpolationType {
    /// Let the compiler choose.
    #[default]
    None,
    /// Hold the last value.
    Latch,
    /// Linear interpolation.
    Linear,
    /// Band-limited sinc interpolation.
    Sinc,
    /// The cheapest acceptable method.
    Fast,
    /// The highest-quality method.
    Best,
}

impl InterpolationType {
    /// Returns the HEART keyword.
    pub fn name(self) -> &'static str {
        match self {
            InterpolationType::None => "none",
            InterpolationType::Latch => "latch",
            InterpolationType::Linear => "linear",
            InterpolationType::Sinc => "sinc",
            InterpolationType::Fast => "fast",
            InterpolationType::Best => "best",
        }
    }

    /// Looks up an interpolation type by its HEART keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "none" => InterpolationType::None,
            "latch" => InterpolationType::Latch,
            "linear" => InterpolationType::Linear,
            "sinc" => InterpolationType::Sinc,
            "fast" => InterpolationType::Fast,
            "best" => InterpolationType::Best,
            _ => return None,
        })
    }
}

/// One side of a connection: either the graph's own endpoint or an endpoint
/// of one of its instances.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointRef {
    /// The instance, or `None` for the graph's own endpoint.
    pub processor: Option<InstanceId>,
    /// The endpoint name.
    pub endpoint: String,
    /// An index into an instance array or endpoint array.
    pub index: Option<u32>,
}

impl EndpointRef {
    /// Refers to one of the graph's own endpoints.
    pub fn own(endpoint: impl Into<String>) -> Self {
        Self {
            processor: None,
            endpoint: endpoint.into(),
            index: None,
        }
    }

    /// Refers to an endpoint of an instance.
    pub fn child(processor: InstanceId, endpoint: impl Into<String>) -> Self {
        Self {
            processor: Some(processor),
            endpoint: endpoint.into(),
            index: None,
        }
    }

    /// Adds an index.
    pub fn at(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }
}

/// A wire between two endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Connection {
    /// Where data comes from.
    pub source: EndpointRef,
    /// Where data goes.
    pub dest: EndpointRef,
    /// The resampling method across clock rates.
    pub interpolation: InterpolationType,
    /// A deliberate delay in frames.
    pub delay_length: Option<i64>,
    /// Where the connection was declared.
    pub span: Span,
}

impl Connection {
    /// Creates an undelayed connection.
    pub fn new(source: EndpointRef, dest: EndpointRef) -> Self {
        Self {
            source,
            dest,
            interpolation: InterpolationType::None,
            delay_length: None,
            span: Span::DUMMY,
        }
    }

    /// Sets the delay length.
    pub fn with_delay(mut self, frames: i64) -> Self {
        self.delay_length = Some(frames);
        self
    }

    /// Returns `true` if the connection buffers at least one frame and so
    /// breaks a feedback loop.
    pub fn is_delayed(&self) -> bool {
        self.delay_length.is_some_and(|d| d > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_delay_is_not_delayed() {
        let a = InstanceId::from_raw(0);
        let conn = Connection::new(EndpointRef::child(a, "out"), EndpointRef::own("out"));
        assert!(!conn.is_delayed());
        assert!(!conn.clone().with_delay(0).is_delayed());
        assert!(conn.with_delay(16).is_delayed());
    }

    #[test]
    fn endpoint_refs() {
        let r = EndpointRef::child(InstanceId::from_raw(2), "in").at(3);
        assert_eq!(r.index, Some(3));
        assert_eq!(EndpointRef::own("gain").processor, None);
    }

    #[test]
    fn interpolation_names_roundtrip() {
        for ty in [InterpolationType::Latch, InterpolationType::Sinc, InterpolationType::Best] {
            assert_eq!(InterpolationType::from_name(ty.name()), Some(ty));
        }
    }
}
