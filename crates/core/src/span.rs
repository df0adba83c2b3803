use std::fmt;

use crate::mapping::{Bias, Mappable};

/// Index of a commit in [`TrackState::commits`](crate::TrackState::commits).
pub type CommitId = usize;

/// A half-open range of document positions attributed to a commit.
///
/// `commit == None` marks content that no tracked commit produced, such as the document the
/// tracker was seeded with.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub from: usize,
    pub to: usize,
    pub commit: Option<CommitId>,
}

impl Span {
    pub fn new(from: usize, to: usize, commit: Option<CommitId>) -> Self {
        debug_assert!(from < to, "span [{from}, {to}) is empty");
        Self { from, to, commit }
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.from <= pos && pos < self.to
    }

    /// Project this span through `mapping`, or `None` if its content was deleted.
    ///
    /// The start leans right and the end leans left, so content inserted at either edge is not
    /// absorbed into the span.
    pub fn map_through<M: Mappable + ?Sized>(&self, mapping: &M) -> Option<Span> {
        let from = mapping.map(self.from, Bias::Right);
        let to = mapping.map(self.to, Bias::Left);
        (from < to).then_some(Span {
            from,
            to,
            commit: self.commit,
        })
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.commit {
            Some(id) => write!(f, "[{}, {}) #{id}", self.from, self.to),
            None => write!(f, "[{}, {}) -", self.from, self.to),
        }
    }
}

impl From<(usize, usize, Option<CommitId>)> for Span {
    fn from((from, to, commit): (usize, usize, Option<CommitId>)) -> Span {
        Span { from, to, commit }
    }
}
