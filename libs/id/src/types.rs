//! Action phases and the action name codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::IdError;

/// Separator between the three identifier segments.
pub const SEPARATOR: char = '/';

/// Store-safe stand-in for `:` inside the offset segment.
const OFFSET_COLON_TOKEN: char = '/';

/// Replacement for separators found inside a logical name.
const NAME_SEPARATOR_REPLACEMENT: char = '-';

// =============================================================================
// Phase
// =============================================================================

/// Which half of a capacity window an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Ramp-up at the start of the window.
    Start,
    /// Ramp-down at the end of the window.
    Finish,
}

impl Phase {
    /// The segment string used in identifiers.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "START",
            Phase::Finish => "FINISH",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "START" => Ok(Phase::Start),
            "FINISH" => Ok(Phase::Finish),
            other => Err(IdError::UnknownPhase(other.to_string())),
        }
    }
}

// =============================================================================
// ActionName
// =============================================================================

/// Decoded form of a scheduled action identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionName {
    /// Logical schedule name shared by the START and FINISH actions.
    pub name: String,

    /// Phase of this action.
    pub phase: Phase,

    /// Display offset of the originating timestamp, e.g. `-0700`.
    pub tz_offset: String,
}

impl ActionName {
    /// Creates an action name.
    pub fn new(name: impl Into<String>, phase: Phase, tz_offset: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase,
            tz_offset: tz_offset.into(),
        }
    }

    /// Encodes into the store identifier.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(&self.name, self.phase, &self.tz_offset)
    }

    /// Decodes a store identifier, returning `None` for anything that is not
    /// a schedule action.
    #[must_use]
    pub fn decode(identifier: &str) -> Option<Self> {
        Self::parse(identifier).ok()
    }

    /// Parses a store identifier with a descriptive error.
    pub fn parse(identifier: &str) -> Result<Self, IdError> {
        if identifier.is_empty() {
            return Err(IdError::Empty);
        }

        let mut parts = identifier.splitn(3, SEPARATOR);
        let (Some(name), Some(phase), Some(offset)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(IdError::MissingSegments {
                identifier: identifier.to_string(),
                found: identifier.split(SEPARATOR).count(),
            });
        };

        Ok(Self {
            name: name.to_string(),
            phase: phase.parse()?,
            tz_offset: offset.replace(OFFSET_COLON_TOKEN, ":"),
        })
    }

    /// Makes an arbitrary label usable as a logical name by replacing
    /// separator characters.
    #[must_use]
    pub fn sanitize_name(name: &str) -> String {
        name.replace(SEPARATOR, &NAME_SEPARATOR_REPLACEMENT.to_string())
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ActionName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encodes a logical name, phase and offset into a store identifier.
///
/// `name` must not contain [`SEPARATOR`]; see [`ActionName::sanitize_name`].
#[must_use]
pub fn encode(name: &str, phase: Phase, tz_offset: &str) -> String {
    let offset = tz_offset.replace(':', &OFFSET_COLON_TOKEN.to_string());
    format!("{name}{SEPARATOR}{phase}{SEPARATOR}{offset}")
}

/// Decodes a store identifier into `(name, phase, tz_offset)`.
#[must_use]
pub fn decode(identifier: &str) -> Option<(String, Phase, String)> {
    ActionName::decode(identifier).map(|a| (a.name, a.phase, a.tz_offset))
}
