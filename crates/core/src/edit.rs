//! Plain-text edits.
//!
//! This module defines [`Edit`], a byte-range replacement over a `String` document, and makes it
//! a [`Step`] so plain text can be tracked directly (the fixtures, the wasm bindings and the fuzz
//! targets all track text this way).
//!
//! Invariants:
//!
//! - Offsets are byte offsets and must fall on UTF-8 character boundaries.
//! - `start <= end <= doc.len()`; [`validate_edit`] checks both before anything is applied.

use crate::{
    TrackError,
    mapping::StepMap,
    transform::{Document, Step, Transform},
};

impl Document for String {
    fn len(&self) -> usize {
        String::len(self)
    }
}

/// Replace the bytes `start..end` of a text document with `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edit {
    /// Start byte offset (inclusive) in the pre-edit document.
    pub start: usize,
    /// End byte offset (exclusive) in the pre-edit document.
    pub end: usize,
    /// Text inserted in place of the removed range.
    pub replacement: String,
}

impl Edit {
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::replace(start, end, String::new())
    }
}

/// Check that `edit` can be applied to `doc`.
pub fn validate_edit(doc: &str, edit: &Edit) -> Result<(), TrackError> {
    if edit.start > edit.end {
        return Err(TrackError::InvalidEdit(format!(
            "start > end: start={}, end={}",
            edit.start, edit.end
        )));
    }
    if edit.end > doc.len() {
        return Err(TrackError::InvalidEdit(format!(
            "edit out of bounds: end={} > doc_len={}",
            edit.end,
            doc.len()
        )));
    }
    for at in [edit.start, edit.end] {
        if !doc.is_char_boundary(at) {
            return Err(TrackError::InvalidEdit(format!(
                "offset {at} is not on a character boundary"
            )));
        }
    }
    Ok(())
}

impl Step for Edit {
    type Doc = String;

    fn apply(&self, doc: &String) -> Result<String, TrackError> {
        validate_edit(doc, self)?;
        let mut out =
            String::with_capacity(doc.len() - (self.end - self.start) + self.replacement.len());
        out.push_str(&doc[..self.start]);
        out.push_str(&self.replacement);
        out.push_str(&doc[self.end..]);
        Ok(out)
    }

    fn invert(&self, doc: &String) -> Self {
        // `doc` is the document this edit was applied to, so the range is known to be valid.
        let removed = doc.get(self.start..self.end).unwrap_or_default();
        Self::replace(self.start, self.start + self.replacement.len(), removed)
    }

    fn get_map(&self) -> StepMap {
        StepMap::replace(self.start, self.end - self.start, self.replacement.len())
    }
}

impl Transform<Edit> {
    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<&mut Self, TrackError> {
        self.step(Edit::replace(start, end, text))
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) -> Result<&mut Self, TrackError> {
        self.step(Edit::insert(at, text))
    }

    pub fn delete(&mut self, start: usize, end: usize) -> Result<&mut Self, TrackError> {
        self.step(Edit::delete(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Bias, Mappable};

    #[test]
    fn apply_replaces_range() {
        let doc = "hello world".to_string();
        let out = Edit::replace(0, 5, "howdy").apply(&doc).unwrap();
        assert_eq!(out, "howdy world");
    }

    /// Applying the inverse against the post-edit document restores the original.
    #[test]
    fn invert_restores_original() {
        let doc = "hello world".to_string();
        let edit = Edit::replace(6, 11, "there, friend");
        let out = edit.apply(&doc).unwrap();
        let inverse = edit.invert(&doc);
        assert_eq!(inverse, Edit::replace(6, 19, "world"));
        assert_eq!(inverse.apply(&out).unwrap(), doc);
    }

    #[test]
    fn validate_edit_rejects_out_of_bounds() {
        let err = validate_edit("abc", &Edit::delete(1, 4)).unwrap_err();
        assert!(matches!(err, TrackError::InvalidEdit(_)));
    }

    #[test]
    fn validate_edit_rejects_reversed_range() {
        let err = validate_edit("abc", &Edit::delete(2, 1)).unwrap_err();
        assert!(matches!(err, TrackError::InvalidEdit(_)));
    }

    /// Offsets inside a multi-byte character are rejected instead of panicking on slicing.
    #[test]
    fn validate_edit_rejects_split_character() {
        let doc = "aé".to_string();
        assert!(Edit::insert(2, "x").apply(&doc).is_err());
        assert_eq!(Edit::insert(3, "x").apply(&doc).unwrap(), "aéx");
    }

    #[test]
    fn get_map_describes_replacement() {
        let map = Edit::replace(2, 4, "xyz").get_map();
        assert_eq!(map.map(10, Bias::Left), 11);
        assert!(Edit::insert(3, "").get_map().is_empty());
    }

    /// A failing step leaves the transform untouched.
    #[test]
    fn transform_records_steps_and_snapshots() {
        let mut tr = Transform::<Edit>::new("abc".to_string());
        tr.insert(3, "def").unwrap().delete(0, 1).unwrap();
        assert!(tr.delete(0, 99).is_err());

        assert_eq!(tr.doc(), "bcdef");
        assert_eq!(tr.before(), "abc");
        assert_eq!(tr.docs(), &["abc".to_string(), "abcdef".to_string()]);
        assert_eq!(tr.steps().len(), 2);
        assert_eq!(tr.mapping().len(), 2);
        assert!(tr.doc_changed());
    }
}
