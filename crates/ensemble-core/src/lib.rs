//! Ensemble Core -- matching vocabulary for multi-actor scene content.
//!
//! This crate holds the leaf types shared by the registry: what a role
//! requires, what an observed actor looks like, and the algebra between the
//! two. Nothing here knows about packages or scenes.
//!
//! # Modules
//!
//! - [`fragment`]: observed actor state ([`Fragment`](fragment::Fragment)),
//!   sexes, races and their 11-bit interop encoding.
//! - [`requirement`]: role templates and fragment derivation/compatibility.
//! - [`tags`]: case-insensitive tag sets and tag queries.
//! - [`transform`]: placement coordinates and runtime-adjustable offsets.
//! - [`combinatorics`]: lazy cartesian enumeration with early exit.
//!
//! # Quick Start
//!
//! ```
//! use ensemble_core::prelude::*;
//!
//! let slot = RequirementSlot::new(RaceKey::Human, SexSet::MALE, Extra::empty());
//! assert!(slot.can_fill(&Fragment::human(Sex::Male)));
//! assert!(!slot.can_fill(&Fragment::human(Sex::Female)));
//!
//! for fragment in slot.make_fragments() {
//!     assert!(slot.can_fill(&fragment));
//! }
//! ```

#![deny(unsafe_code)]

pub mod combinatorics;
pub mod fragment;
pub mod requirement;
pub mod tags;
pub mod transform;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced when converting external data into core types.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A wire-form fragment could not be decoded.
    #[error("invalid fragment bits {bits:#013b}: {reason}")]
    InvalidFragment {
        bits: u16,
        reason: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::combinatorics::{for_each_combination, Combinations};
    pub use crate::fragment::{
        CreatureFragment, Fragment, HumanFragment, HumanTraits, RaceKey, Sex, SexSet, Status,
    };
    pub use crate::requirement::{Extra, RequirementSlot};
    pub use crate::tags::{TagQuery, TagSet};
    pub use crate::transform::{Axis, Coordinate, Offset, Transform};
    pub use crate::CoreError;
}
