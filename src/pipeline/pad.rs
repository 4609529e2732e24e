//! Pad descriptors for graph entities.
//!
//! Each entity exposes a fixed, ordered list of pads queried from its device.
//! The link builder uses the direction flag to decide which end of a declared
//! connection creates the link: only source pads originate links.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a pad emits or receives data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadDirection {
    Source,
    Sink,
}

impl fmt::Display for PadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PadDirection::Source => write!(f, "source"),
            PadDirection::Sink => write!(f, "sink"),
        }
    }
}

/// Descriptor for one pad of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PadDescriptor {
    pub index: u16,
    pub direction: PadDirection,
}

impl PadDescriptor {
    pub const fn source(index: u16) -> Self {
        Self {
            index,
            direction: PadDirection::Source,
        }
    }

    pub const fn sink(index: u16) -> Self {
        Self {
            index,
            direction: PadDirection::Sink,
        }
    }

    #[inline]
    pub fn is_source(&self) -> bool {
        self.direction == PadDirection::Source
    }

    #[inline]
    pub fn is_sink(&self) -> bool {
        self.direction == PadDirection::Sink
    }
}

/// Build a pad list from directions, numbering pads by position.
pub fn pads_from_directions(directions: &[PadDirection]) -> Vec<PadDescriptor> {
    directions
        .iter()
        .enumerate()
        .map(|(i, &direction)| PadDescriptor {
            index: i as u16,
            direction,
        })
        .collect()
}
