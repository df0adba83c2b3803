//! Change tracking and blame attribution for an editable document.
//!
//! This crate keeps, across a sequence of edit batches, a partition of the live document into
//! contiguous ranges each attributed to the commit that last touched them, plus the inverse
//! steps needed to walk the document back to any earlier commit boundary.
//!
//! Entry points:
//!
//! - [`track`] contains [`TrackState`], the persistent aggregate the host advances with
//!   [`TrackState::apply_transform`] and [`TrackState::apply_commit`].
//!
//! Internals:
//!
//! - [`mapping`] holds position mapping ([`StepMap`], [`Mapping`], [`Bias`]).
//! - [`transform`] defines the document/step seams and the [`Transform`] batch.
//! - [`edit`] is the plain-text step implementation ([`Edit`] over `String`).
//! - [`span`], [`blame`] and [`commit`] hold the blame map and history value types.
//! - [`script`] parses and replays line-based edit scripts (fixtures, demos, fuzzing).

pub mod blame;
pub mod commit;
pub mod edit;
pub mod mapping;
pub mod script;
pub mod span;
pub mod track;
pub mod transform;

pub use commit::Commit;
pub use edit::Edit;
pub use mapping::{Bias, Mappable, Mapping, ReplacedRange, StepMap};
pub use span::{CommitId, Span};
pub use track::{TrackConfig, TrackState};
pub use transform::{Document, Step, Transform};

/// Errors that can occur while tracking changes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    #[error("stale transform: blame map covers {expected} positions, transform starts at {actual}")]
    StaleTransform { expected: usize, actual: usize },

    #[error("invalid blame map: {0}")]
    InvalidBlameMap(String),

    #[error("unknown commit {index} (history has {len} commits)")]
    UnknownCommit { index: usize, len: usize },

    #[error("script line {line}: {message}")]
    Script { line: usize, message: String },
}
