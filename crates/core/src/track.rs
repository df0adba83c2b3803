//! The persistent tracking state.
//!
//! A [`TrackState`] is a value: every operation returns a new state and leaves the receiver
//! untouched, so the host's undo history can keep old states around and compare them later.
//! Unchanged parts are shared between states through `Arc`s. Steps and commits are never
//! deep-copied: folding a transform or sealing a commit copies one pointer per existing
//! uncommitted step or commit into the new state, and sealing moves the uncommitted steps into
//! the commit as they are.
//!
//! Transforms must be folded in the order they were applied to the live document. Each
//! transform's position maps are only meaningful relative to the revision it was computed
//! against; folding a stale transform yields an unspecified blame map. The checked entry point
//! [`TrackState::try_apply_transform`] can catch the common case cheaply (see [`TrackConfig`]).

use std::{iter, sync::Arc};

use tracing::{debug, trace, warn};

use crate::{
    TrackError,
    blame::{update_blame_map, validate_blame_map},
    commit::Commit,
    mapping::{Mapping, StepMap},
    span::{CommitId, Span},
    transform::{Document, Step, Transform},
};

/// Checks performed by [`TrackState::try_apply_transform`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackConfig {
    /// Reject a transform whose starting document length differs from the length the blame map
    /// covers. Only applies once the blame map is non-empty.
    pub verify_base: bool,

    /// Validate the coverage invariant of the resulting blame map against the transform's
    /// result document.
    ///
    /// This only holds for states seeded with [`TrackState::from_doc`] (or an equivalent full
    /// cover); a state started empty on a non-empty document tracks inserted ranges only.
    pub verify_coverage: bool,
}

/// Blame map, commit history and not-yet-committed inverse steps.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackState<S> {
    blame_map: Arc<[Span]>,
    commits: Arc<[Arc<Commit<S>>]>,
    uncommitted_steps: Arc<[Arc<S>]>,
    uncommitted_maps: Arc<[StepMap]>,
}

impl<S> Clone for TrackState<S> {
    fn clone(&self) -> Self {
        Self {
            blame_map: Arc::clone(&self.blame_map),
            commits: Arc::clone(&self.commits),
            uncommitted_steps: Arc::clone(&self.uncommitted_steps),
            uncommitted_maps: Arc::clone(&self.uncommitted_maps),
        }
    }
}

impl<S> Default for TrackState<S> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<S> TrackState<S> {
    /// Start tracking with `blame_map` and no history.
    pub fn new(blame_map: Vec<Span>) -> Self {
        Self {
            blame_map: blame_map.into(),
            commits: Vec::new().into(),
            uncommitted_steps: Vec::new().into(),
            uncommitted_maps: Vec::new().into(),
        }
    }

    pub fn blame_map(&self) -> &[Span] {
        &self.blame_map
    }

    pub fn commits(&self) -> &[Arc<Commit<S>>] {
        &self.commits
    }

    /// Inverse steps recorded since the last commit, oldest first.
    pub fn uncommitted_steps(&self) -> &[Arc<S>] {
        &self.uncommitted_steps
    }

    /// Forward maps matching [`uncommitted_steps`](Self::uncommitted_steps).
    pub fn uncommitted_maps(&self) -> &[StepMap] {
        &self.uncommitted_maps
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.uncommitted_steps.is_empty()
    }

    /// Commits that are not hidden, with their ids.
    pub fn visible_commits(&self) -> impl Iterator<Item = (CommitId, &Commit<S>)> {
        self.commits
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.hidden)
            .map(|(id, c)| (id, &**c))
    }

    /// End of the range covered by the blame map.
    pub fn covered_len(&self) -> usize {
        self.blame_map.last().map_or(0, |s| s.to)
    }

    /// The span containing `pos`, if any.
    pub fn blame_at(&self, pos: usize) -> Option<&Span> {
        let idx = self.blame_map.partition_point(|s| s.to <= pos);
        self.blame_map.get(idx).filter(|s| s.contains(pos))
    }

    /// Spans currently attributed to commit `id` (`None` for unattributed content).
    pub fn spans_for_commit(&self, id: Option<CommitId>) -> impl Iterator<Item = &Span> {
        self.blame_map.iter().filter(move |s| s.commit == id)
    }

    /// Composed forward mapping from the document just before commit `index` to the live
    /// document, including uncommitted steps.
    pub fn mapping_since(&self, index: usize) -> Result<Mapping, TrackError> {
        let commits = self.commits_from(index)?;
        Ok(commits
            .iter()
            .flat_map(|c| c.maps.iter())
            .chain(self.uncommitted_maps.iter())
            .cloned()
            .collect())
    }

    /// Whether both states share every part of their storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.blame_map, &other.blame_map)
            && Arc::ptr_eq(&self.commits, &other.commits)
            && Arc::ptr_eq(&self.uncommitted_steps, &other.uncommitted_steps)
            && Arc::ptr_eq(&self.uncommitted_maps, &other.uncommitted_maps)
    }

    /// Seal the uncommitted steps into a new commit.
    ///
    /// Returns a state sharing all storage with `self` when there is nothing to commit. The
    /// blame map is unchanged either way: attribution already targets the next commit id.
    ///
    /// Existing commits are shared, but the list of pointers to them is rebuilt, so sealing
    /// costs O(n) pointer copies in the number of commits.
    pub fn apply_commit(&self, message: impl Into<String>, time: i64) -> Self {
        self.seal(message.into(), time, false)
    }

    /// Like [`apply_commit`](Self::apply_commit), but the commit is marked hidden.
    pub fn apply_hidden_commit(&self, message: impl Into<String>, time: i64) -> Self {
        self.seal(message.into(), time, true)
    }

    fn seal(&self, message: String, time: i64, hidden: bool) -> Self {
        if self.uncommitted_steps.is_empty() {
            debug!(%message, "nothing to commit");
            return self.clone();
        }

        debug!(
            id = self.commits.len(),
            %message,
            steps = self.uncommitted_steps.len(),
            hidden,
            "sealing commit"
        );
        let commit = Commit {
            message,
            time,
            steps: Arc::clone(&self.uncommitted_steps),
            maps: Arc::clone(&self.uncommitted_maps),
            hidden,
        };

        Self {
            blame_map: Arc::clone(&self.blame_map),
            commits: self
                .commits
                .iter()
                .cloned()
                .chain(iter::once(Arc::new(commit)))
                .collect(),
            uncommitted_steps: Vec::new().into(),
            uncommitted_maps: Vec::new().into(),
        }
    }

    fn commits_from(&self, index: usize) -> Result<&[Arc<Commit<S>>], TrackError> {
        self.commits
            .get(index..)
            .ok_or(TrackError::UnknownCommit {
                index,
                len: self.commits.len(),
            })
    }
}

impl<S: Step> TrackState<S> {
    /// Start tracking `doc`, attributing all of its content to no commit.
    pub fn from_doc(doc: &S::Doc) -> Self {
        let len = doc.len();
        if len == 0 {
            Self::default()
        } else {
            Self::new(vec![Span::new(0, len, None)])
        }
    }

    /// Fold a transform into the state.
    ///
    /// The blame map is carried through the transform and every changed range is attributed to
    /// the commit that will be created next. The inverse of each step is recorded for that
    /// commit. `tr` must have been applied to the document this state describes.
    pub fn apply_transform(&self, tr: &Transform<S>) -> Self {
        if !tr.doc_changed() {
            return self.clone();
        }

        let id = self.commits.len();
        let blame_map = update_blame_map(&self.blame_map, tr.mapping(), id);
        trace!(
            steps = tr.steps().len(),
            spans = blame_map.len(),
            commit = id,
            "folded transform"
        );

        let inverted = tr
            .steps()
            .iter()
            .zip(tr.docs())
            .map(|(step, doc)| Arc::new(step.invert(doc)));

        Self {
            blame_map: blame_map.into(),
            commits: Arc::clone(&self.commits),
            uncommitted_steps: self
                .uncommitted_steps
                .iter()
                .cloned()
                .chain(inverted)
                .collect(),
            uncommitted_maps: self
                .uncommitted_maps
                .iter()
                .chain(tr.mapping().maps())
                .cloned()
                .collect(),
        }
    }

    /// [`apply_transform`](Self::apply_transform) with the checks enabled in `config`.
    pub fn try_apply_transform(
        &self,
        tr: &Transform<S>,
        config: &TrackConfig,
    ) -> Result<Self, TrackError> {
        if config.verify_base && !self.blame_map.is_empty() {
            let expected = self.covered_len();
            let actual = tr.before().len();
            if expected != actual {
                warn!(expected, actual, "rejecting stale transform");
                return Err(TrackError::StaleTransform { expected, actual });
            }
        }

        let next = self.apply_transform(tr);
        if config.verify_coverage {
            validate_blame_map(&next.blame_map, tr.doc().len())?;
        }
        Ok(next)
    }

    /// Reconstruct the document as it was just before commit `index`, starting from the live
    /// document `doc`.
    ///
    /// `index == commits().len()` yields the last committed revision (uncommitted steps undone).
    pub fn revision(&self, doc: &S::Doc, index: usize) -> Result<S::Doc, TrackError> {
        let commits = self.commits_from(index)?;
        let batches = iter::once(&*self.uncommitted_steps)
            .chain(commits.iter().rev().map(|c| &*c.steps));

        let mut doc = doc.clone();
        for steps in batches {
            for step in steps.iter().rev() {
                doc = step.apply(&doc)?;
            }
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::SmallRng};

    use super::*;
    use crate::{
        edit::Edit,
        mapping::{Bias, Mappable},
    };

    type State = TrackState<Edit>;

    fn spans(list: &[(usize, usize, Option<CommitId>)]) -> Vec<Span> {
        list.iter().copied().map(Span::from).collect()
    }

    fn transform(doc: &str, build: impl FnOnce(&mut Transform<Edit>)) -> Transform<Edit> {
        let mut tr = Transform::new(doc.to_string());
        build(&mut tr);
        tr
    }

    #[test]
    fn from_doc_seeds_single_unattributed_span() {
        let state = State::from_doc(&"hello".to_string());
        assert_eq!(state.blame_map(), spans(&[(0, 5, None)]).as_slice());
        assert!(State::from_doc(&String::new()).blame_map().is_empty());
    }

    #[test]
    fn apply_transform_attributes_to_next_commit() {
        let state = State::from_doc(&"hello world".to_string());
        let tr = transform("hello world", |tr| {
            tr.replace(0, 5, "howdy").unwrap();
        });
        let state = state.apply_transform(&tr);
        assert_eq!(
            state.blame_map(),
            spans(&[(0, 5, Some(0)), (5, 11, None)]).as_slice()
        );
        assert_eq!(state.uncommitted_steps(), &[Arc::new(Edit::replace(0, 5, "hello"))]);
        assert_eq!(state.uncommitted_maps().len(), 1);
        assert!(state.commits().is_empty());

        let state = state.apply_commit("greeting", 1);
        let tr = transform("howdy world", |tr| {
            tr.insert(11, "!").unwrap();
        });
        let state = state.apply_transform(&tr);
        assert_eq!(
            state.blame_map(),
            spans(&[(0, 5, Some(0)), (5, 11, None), (11, 12, Some(1))]).as_slice()
        );
    }

    /// Several transforms before a commit all paint with the same id and merge.
    #[test]
    fn consecutive_transforms_merge_into_one_span() {
        let mut doc = "ab".to_string();
        let mut state = State::from_doc(&doc);
        for (at, text) in [(1, "x"), (2, "y"), (3, "z")] {
            let tr = transform(&doc, |tr| {
                tr.insert(at, text).unwrap();
            });
            state = state.apply_transform(&tr);
            doc = tr.into_doc();
        }
        assert_eq!(doc, "axyzb");
        assert_eq!(
            state.blame_map(),
            spans(&[(0, 1, None), (1, 4, Some(0)), (4, 5, None)]).as_slice()
        );
        assert_eq!(state.uncommitted_steps().len(), 3);
    }

    #[test]
    fn empty_transform_changes_nothing() {
        let state = State::from_doc(&"abc".to_string());
        let state = state.apply_transform(&transform("abc", |tr| {
            tr.insert(1, "x").unwrap();
        }));
        let next = state.apply_transform(&Transform::new("axbc".to_string()));
        assert_eq!(next, state);
        assert!(next.ptr_eq(&state));
    }

    #[test]
    fn commit_without_changes_is_identity() {
        let state = State::from_doc(&"abc".to_string());
        let next = state.apply_commit("nothing", 5);
        assert!(next.ptr_eq(&state));
        assert!(next.commits().is_empty());
    }

    /// Sealing moves the uncommitted steps into the commit without copying them.
    #[test]
    fn commit_seals_uncommitted_steps() {
        let state = State::from_doc(&"abc".to_string());
        let state = state.apply_transform(&transform("abc", |tr| {
            tr.insert(3, "def").unwrap().delete(0, 1).unwrap();
        }));
        let before = state.clone();
        let committed = state.apply_commit("edit", 42);

        assert_eq!(committed.commits().len(), 1);
        let commit = &committed.commits()[0];
        assert_eq!(commit.message, "edit");
        assert_eq!(commit.time, 42);
        assert!(!commit.hidden);
        assert_eq!(&*commit.steps, before.uncommitted_steps());
        assert_eq!(&*commit.maps, before.uncommitted_maps());
        assert!(Arc::ptr_eq(&commit.steps, &before.uncommitted_steps));
        assert!(!committed.has_uncommitted());
        assert!(committed.uncommitted_maps().is_empty());
        assert_eq!(committed.blame_map(), before.blame_map());
    }

    /// Folding another transform shares the earlier inverse steps instead of cloning them.
    #[test]
    fn apply_transform_shares_uncommitted_steps() {
        let s0 = State::from_doc(&"abc".to_string());
        let s1 = s0.apply_transform(&transform("abc", |tr| {
            tr.insert(3, "def").unwrap();
        }));
        let s2 = s1.apply_transform(&transform("abcdef", |tr| {
            tr.delete(0, 2).unwrap();
        }));

        assert_eq!(s2.uncommitted_steps().len(), 2);
        assert!(Arc::ptr_eq(&s1.uncommitted_steps()[0], &s2.uncommitted_steps()[0]));
    }

    /// Sealing keeps earlier commits shared with the previous state.
    #[test]
    fn apply_commit_shares_existing_commits() {
        let s0 = State::from_doc(&"abc".to_string());
        let s1 = s0
            .apply_transform(&transform("abc", |tr| {
                tr.insert(0, "x").unwrap();
            }))
            .apply_commit("one", 1);
        let s2 = s1
            .apply_transform(&transform("xabc", |tr| {
                tr.insert(4, "y").unwrap();
            }))
            .apply_commit("two", 2);

        assert_eq!(s2.commits().len(), 2);
        assert!(Arc::ptr_eq(&s1.commits()[0], &s2.commits()[0]));
    }

    /// Older states observe no change after newer states are derived from them.
    #[test]
    fn operations_do_not_mutate_receiver() {
        let doc = "hello".to_string();
        let s0 = State::from_doc(&doc);
        let s1 = s0.apply_transform(&transform(&doc, |tr| {
            tr.insert(5, " world").unwrap();
        }));
        let s1_snapshot = format!("{s1:?}");
        let s2 = s1.apply_commit("one", 1);
        let s3 = s2.apply_transform(&transform("hello world", |tr| {
            tr.delete(0, 6).unwrap();
        }));
        let _s4 = s3.apply_commit("two", 2);

        assert_eq!(s0.blame_map(), spans(&[(0, 5, None)]).as_slice());
        assert!(s0.commits().is_empty());
        assert_eq!(format!("{s1:?}"), s1_snapshot);
        assert_eq!(s2.commits().len(), 1);
        assert_eq!(s3.commits().len(), 1);
        assert!(Arc::ptr_eq(&s2.commits, &s3.commits));
    }

    #[test]
    fn revision_walks_back_through_commits() {
        let d0 = "the quick fox".to_string();
        let mut state = State::from_doc(&d0);
        let mut docs = vec![d0.clone()];
        let batches: [&dyn Fn(&mut Transform<Edit>); 3] = [
            &|tr: &mut Transform<Edit>| {
                tr.insert(10, "brown ").unwrap();
            },
            &|tr: &mut Transform<Edit>| {
                tr.replace(0, 3, "A").unwrap().delete(1, 2).unwrap();
            },
            &|tr: &mut Transform<Edit>| {
                tr.insert(0, ">> ").unwrap().insert(19, " jumps").unwrap();
            },
        ];
        for (i, build) in batches.iter().enumerate() {
            let tr = transform(docs.last().unwrap(), |tr| build(tr));
            state = state.apply_transform(&tr).apply_commit(format!("c{i}"), i as i64);
            docs.push(tr.into_doc());
        }
        let live = docs.last().unwrap().clone();
        assert_eq!(live, ">> Aquick brown fox jumps");

        for (index, expected) in docs.iter().enumerate() {
            assert_eq!(&state.revision(&live, index).unwrap(), expected);
        }
        assert_eq!(
            state.revision(&live, 9),
            Err(TrackError::UnknownCommit { index: 9, len: 3 })
        );
    }

    #[test]
    fn revision_undoes_uncommitted_steps_first() {
        let doc = "abc".to_string();
        let state = State::from_doc(&doc)
            .apply_transform(&transform("abc", |tr| {
                tr.insert(0, "1").unwrap();
            }))
            .apply_commit("one", 1)
            .apply_transform(&transform("1abc", |tr| {
                tr.delete(1, 2).unwrap();
            }));
        let live = "1bc".to_string();
        assert_eq!(state.revision(&live, 1).unwrap(), "1abc");
        assert_eq!(state.revision(&live, 0).unwrap(), "abc");
    }

    /// Positions in an old revision project onto the live document.
    #[test]
    fn mapping_since_projects_old_positions() {
        let state = State::from_doc(&"abcdef".to_string())
            .apply_transform(&transform("abcdef", |tr| {
                tr.insert(0, "xx").unwrap();
            }))
            .apply_commit("one", 1)
            .apply_transform(&transform("xxabcdef", |tr| {
                tr.delete(2, 4).unwrap();
            }));
        // 'e' sits at 4 in the original, 6 after commit 0, 4 in the live "xxcdef".
        assert_eq!(state.mapping_since(0).unwrap().map(4, Bias::Left), 4);
        assert_eq!(state.mapping_since(1).unwrap().map(6, Bias::Left), 4);
        assert_eq!(state.mapping_since(0).unwrap().len(), 2);
        assert!(state.mapping_since(2).is_err());
    }

    #[test]
    fn hidden_commits_are_skipped_by_visible_commits() {
        let state = State::from_doc(&"a".to_string())
            .apply_transform(&transform("a", |tr| {
                tr.insert(1, "b").unwrap();
            }))
            .apply_hidden_commit("autosave", 1)
            .apply_transform(&transform("ab", |tr| {
                tr.insert(2, "c").unwrap();
            }))
            .apply_commit("real", 2);
        assert!(state.commits()[0].hidden);
        let visible: Vec<_> = state
            .visible_commits()
            .map(|(id, c)| (id, c.message.as_str()))
            .collect();
        assert_eq!(visible, vec![(1, "real")]);
    }

    #[test]
    fn blame_queries() {
        let state = State::new(spans(&[
            (0, 2, None),
            (2, 5, Some(1)),
            (5, 9, Some(0)),
            (9, 10, Some(1)),
        ]));
        assert_eq!(state.blame_at(0).map(|s| s.commit), Some(None));
        assert_eq!(state.blame_at(2).map(|s| s.commit), Some(Some(1)));
        assert_eq!(state.blame_at(8).map(|s| s.commit), Some(Some(0)));
        assert_eq!(state.blame_at(10), None);
        assert_eq!(state.spans_for_commit(Some(1)).count(), 2);
        assert_eq!(state.covered_len(), 10);
    }

    #[test]
    fn try_apply_transform_rejects_stale_base() {
        let config = TrackConfig {
            verify_base: true,
            verify_coverage: true,
        };
        let state = State::from_doc(&"abc".to_string());
        let stale = transform("abcdef", |tr| {
            tr.insert(0, "x").unwrap();
        });
        assert_eq!(
            state.try_apply_transform(&stale, &config),
            Err(TrackError::StaleTransform {
                expected: 3,
                actual: 6
            })
        );

        let fresh = transform("abc", |tr| {
            tr.insert(0, "x").unwrap();
        });
        let next = state.try_apply_transform(&fresh, &config).unwrap();
        assert_eq!(next.covered_len(), 4);
    }

    #[test]
    fn try_apply_transform_without_checks_matches_apply() {
        let state = State::from_doc(&"abc".to_string());
        let stale = transform("abcdef", |tr| {
            tr.delete(4, 6).unwrap();
        });
        let next = state
            .try_apply_transform(&stale, &TrackConfig::default())
            .unwrap();
        assert_eq!(next, state.apply_transform(&stale));
    }

    #[test]
    fn track_state_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<State>();
    }

    /// Random edits and commits: coverage, per-byte attribution and reconstruction all hold.
    #[test]
    fn random_edits_keep_invariants() {
        const WORDS: [&str; 5] = ["a", "bc", "def", "", "ghij"];

        for seed in 0..20u64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let d0 = "0123456789".to_string();
            let mut doc = d0.clone();
            let mut state = State::from_doc(&doc);
            let mut model: Vec<Option<CommitId>> = vec![None; doc.len()];
            let mut revisions = vec![d0.clone()];

            for _ in 0..40 {
                let id = state.commits().len();
                let mut tr = Transform::<Edit>::new(doc.clone());
                for _ in 0..rng.gen_range(0..4) {
                    let len = tr.doc().len();
                    let start = rng.gen_range(0..=len);
                    let end = rng.gen_range(start..=len.min(start + 4));
                    let text = WORDS[rng.gen_range(0..WORDS.len())];
                    tr.replace(start, end, text).unwrap();
                    model.splice(start..end, iter::repeat(Some(id)).take(text.len()));
                }

                state = state.apply_transform(&tr);
                doc = tr.into_doc();
                validate_blame_map(state.blame_map(), doc.len()).unwrap();
                for span in state.blame_map() {
                    assert!(
                        model[span.from..span.to].iter().all(|c| *c == span.commit),
                        "seed {seed}: span {span:?} disagrees with model"
                    );
                }

                if rng.gen_bool(0.3) && state.has_uncommitted() {
                    state = state.apply_commit(format!("c{id}"), id as i64);
                    revisions.push(doc.clone());
                }
            }

            let committed = state.commits().len();
            for (index, expected) in revisions.iter().enumerate() {
                assert_eq!(&state.revision(&doc, index).unwrap(), expected);
            }
            assert_eq!(revisions.len(), committed + 1);
        }
    }
}
