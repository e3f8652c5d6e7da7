//! Processor instances: the nodes of a graph.

use crate::errors;
use crate::ids::ConstantId;
use resonate_diagnostics::Diagnostic;
use resonate_source::Span;
use serde::{Deserialize, Serialize};

/// Largest allowed clock multiplier or divider.
pub const MAX_CLOCK_RATIO: u32 = 512;

/// How fast an instance runs relative to its graph.
///
/// At most one of the two factors differs from 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ClockRatio {
    multiplier: u32,
    divider: u32,
}

impl ClockRatio {
    /// Runs at the graph's rate.
    pub const ONE: ClockRatio = ClockRatio {
        multiplier: 1,
        divider: 1,
    };

    fn checked(value: i64, span: Span) -> Result<u32, Diagnostic> {
        u32::try_from(value)
            .ok()
            .filter(|v| (1..=MAX_CLOCK_RATIO).contains(v) && v.is_power_of_two())
            .ok_or_else(|| errors::invalid_clock_ratio(value, span))
    }

    /// Runs `value` times faster than the graph.
    pub fn multiplier(value: i64, span: Span) -> Result<Self, Diagnostic> {
        Ok(Self {
            multiplier: Self::checked(value, span)?,
            divider: 1,
        })
    }

    /// Runs `value` times slower than the graph.
    pub fn divider(value: i64, span: Span) -> Result<Self, Diagnostic> {
        Ok(Self {
            multiplier: 1,
            divider: Self::checked(value, span)?,
        })
    }

    /// Returns the multiplier.
    pub fn multiplier_value(self) -> u32 {
        self.multiplier
    }

    /// Returns the divider.
    pub fn divider_value(self) -> u32 {
        self.divider
    }

    /// Returns `true` when the instance runs at the graph's rate.
    pub fn is_one(self) -> bool {
        self == Self::ONE
    }

    /// Returns the rate relative to the graph.
    pub fn as_f64(self) -> f64 {
        f64::from(self.multiplier) / f64::from(self.divider)
    }
}

impl Default for ClockRatio {
    fn default() -> Self {
        Self::ONE
    }
}

/// A named use of a processor or graph inside a graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessorInstance {
    /// The node name, unique within the graph.
    pub name: String,
    /// The full name of the module being instantiated.
    pub source_name: String,
    /// Compile-time arguments bound to the source's specialisation
    /// parameters.
    pub specialisation_args: Vec<ConstantId>,
    /// The number of copies, for instance arrays.
    pub array_size: Option<u32>,
    /// The instance's clock relative to the graph.
    pub clock_ratio: ClockRatio,
    /// Where the node was declared.
    pub span: Span,
}

impl ProcessorInstance {
    /// Creates a single, unspecialised instance running at the graph rate.
    pub fn new(name: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_name: source_name.into(),
            specialisation_args: Vec::new(),
            array_size: None,
            clock_ratio: ClockRatio::ONE,
            span: Span::DUMMY,
        }
    }

    /// Returns the number of copies, counting a plain instance as 1.
    pub fn array_len(&self) -> u32 {
        self.array_size.unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ratios() {
        let ratio = ClockRatio::multiplier(4, Span::DUMMY).unwrap();
        assert_eq!(ratio.multiplier_value(), 4);
        assert_eq!(ratio.as_f64(), 4.0);
        let ratio = ClockRatio::divider(512, Span::DUMMY).unwrap();
        assert_eq!(ratio.as_f64(), 1.0 / 512.0);
        assert!(ClockRatio::multiplier(1, Span::DUMMY).unwrap().is_one());
    }

    #[test]
    fn invalid_ratios() {
        for value in [0, 3, 1024, -2] {
            let err = ClockRatio::divider(value, Span::DUMMY).unwrap_err();
            assert_eq!(err.code, errors::L101);
        }
    }

    #[test]
    fn instance_defaults() {
        let node = ProcessorInstance::new("osc", "Synth::Oscillator");
        assert_eq!(node.array_len(), 1);
        assert!(node.clock_ratio.is_one());
    }
}
