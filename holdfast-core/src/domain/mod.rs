//! Domain types for HoldFast

pub mod bar;
pub mod position;

pub use bar::{Bar, ChannelBounds};
pub use position::{Position, PositionLabelError, Side};

/// Symbol type alias
pub type Symbol = String;
