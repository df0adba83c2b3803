use std::sync::Arc;

use crate::mapping::StepMap;

/// A sealed batch of edits in the tracked history.
///
/// `steps[i]` undoes the i-th forward step of the batch and `maps[i]` is that forward step's
/// position mapping. Walking the document back one step means applying `steps[i]` to the
/// document produced by forward step `i`.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Commit<S> {
    pub message: String,
    /// Milliseconds since the Unix epoch, or any monotonic counter the host prefers.
    pub time: i64,
    pub steps: Arc<[Arc<S>]>,
    pub maps: Arc<[StepMap]>,
    pub hidden: bool,
}

impl<S> Commit<S> {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
