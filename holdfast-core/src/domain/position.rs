//! Position labels and trade direction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of an open (or pending) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Direction implied by the sign of a score. Zero and NaN have no direction.
    pub fn from_score(score: f64) -> Option<Side> {
        if score > 0.0 {
            Some(Side::Long)
        } else if score < 0.0 {
            Some(Side::Short)
        } else {
            None
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

/// Position held by an instrument after a bar has been processed.
///
/// Serialized as its integer label: `1` (Long), `0` (Flat), `-1` (Short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

impl Position {
    pub fn label(self) -> i8 {
        match self {
            Position::Long => 1,
            Position::Flat => 0,
            Position::Short => -1,
        }
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Position::Long => Some(Side::Long),
            Position::Short => Some(Side::Short),
            Position::Flat => None,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }
}

impl From<Side> for Position {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Position::Long,
            Side::Short => Position::Short,
        }
    }
}

impl From<Position> for i8 {
    fn from(position: Position) -> Self {
        position.label()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid position label {0} (expected -1, 0 or 1)")]
pub struct PositionLabelError(pub i8);

impl TryFrom<i8> for Position {
    type Error = PositionLabelError;

    fn try_from(label: i8) -> Result<Self, Self::Error> {
        match label {
            1 => Ok(Position::Long),
            0 => Ok(Position::Flat),
            -1 => Ok(Position::Short),
            other => Err(PositionLabelError(other)),
        }
    }
}
