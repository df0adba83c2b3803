//! Document and step seams, and the [`Transform`] edit batch.
//!
//! The tracker does not know what a document is. It needs three things from the host's edit
//! model: a way to apply a step, a way to invert a step against the document it was applied to,
//! and the step's position mapping. [`Step`] captures exactly that.

use std::mem;

use crate::{
    TrackError,
    mapping::{Mapping, StepMap},
};

/// A document revision the tracker can measure.
pub trait Document: Clone {
    /// Size of the document's position space.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single invertible edit.
pub trait Step: Clone {
    type Doc: Document;

    /// Apply this step to `doc`, producing the next revision.
    fn apply(&self, doc: &Self::Doc) -> Result<Self::Doc, TrackError>;

    /// The step that undoes this one, given the document this step was applied to.
    fn invert(&self, doc: &Self::Doc) -> Self;

    /// Position mapping from the pre-step document to the post-step document.
    fn get_map(&self) -> StepMap;
}

/// A batch of steps applied together, with the pre-step snapshot and map of each step.
#[derive(Debug, Clone)]
pub struct Transform<S: Step> {
    doc: S::Doc,
    steps: Vec<S>,
    docs: Vec<S::Doc>,
    mapping: Mapping,
}

impl<S: Step> Transform<S> {
    /// Start an empty batch on `doc`.
    pub fn new(doc: S::Doc) -> Self {
        Self {
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::default(),
        }
    }

    /// Apply `step` to the current document and record it.
    ///
    /// On error the transform is left unchanged.
    pub fn step(&mut self, step: S) -> Result<&mut Self, TrackError> {
        let next = step.apply(&self.doc)?;
        self.docs.push(mem::replace(&mut self.doc, next));
        self.mapping.append(step.get_map());
        self.steps.push(step);
        Ok(self)
    }

    /// The current (post-batch) document.
    pub fn doc(&self) -> &S::Doc {
        &self.doc
    }

    /// The document the batch started from.
    pub fn before(&self) -> &S::Doc {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[S] {
        &self.steps
    }

    /// Pre-step snapshots; `docs()[i]` is the document `steps()[i]` was applied to.
    pub fn docs(&self) -> &[S::Doc] {
        &self.docs
    }

    /// The cumulative mapping of the batch (one step map per step).
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Consume the transform, returning the resulting document.
    pub fn into_doc(self) -> S::Doc {
        self.doc
    }
}
