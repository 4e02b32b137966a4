//! # fleetcal-id
//!
//! Identifier codec for scheduled actions stored in the remote scheduling
//! store.
//!
//! ## Design Principles
//!
//! - The store has no grouping primitive, so the pairing of a ramp-up and a
//!   ramp-down action lives entirely in the action identifier
//! - Identifiers round-trip: decode(encode(name, phase, tz)) == (name, phase, tz)
//! - Unrecognized identifiers are a value (`None`), never a panic
//!
//! ## Identifier Format
//!
//! Three segments joined by `/`: `{name}/{phase}/{tz_offset}`
//!
//! Examples:
//! - `Standup Review 04-05/START/-0700`
//! - `Standup Review 04-05/FINISH/-0700`
//! - `Launch 11-02/START/+05/30` (offset `+05:30`, `:` stored as `/`)
//!
//! Decoding splits on the first two separators only; everything after the
//! second separator is the offset segment.

mod error;
mod types;

pub use error::IdError;
pub use types::*;
