//! Change-tracking engine for dirtycheck.
//!
//! Given an entity's proposed in-memory state and the previously loaded
//! database snapshot of the same logical row, this crate computes which
//! scalar columns and which owning single-valued relations changed, and
//! derives the persistence intent (insert / update / remove) for that
//! entity:
//!
//! - [`Subject`] — the per-entity unit of change-tracking for one flush
//! - [`diff_columns`] / [`diff_relations`] — the diff engines
//! - [`RelationUpdate`] / [`JunctionInsert`] / [`JunctionRemove`] —
//!   pending-operation storage filled by the flush orchestrator
//!
//! No I/O happens here; everything is synchronous value computation over
//! already-loaded data.

pub mod diff;
pub mod ops;
pub mod subject;

pub use diff::{diff_columns, diff_relations, updated_relation_identifier};
pub use ops::{JunctionInsert, JunctionRemove, RelationUpdate};
pub use subject::Subject;
