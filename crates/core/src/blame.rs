//! Blame map maintenance.
//!
//! A blame map is a sorted list of non-overlapping [`Span`]s covering the live document. Every
//! transform rebuilds it in two passes:
//!
//! 1. Carry forward: every old span is mapped through the transform; spans whose content was
//!    deleted disappear.
//! 2. Attribution: every range a step inserted or replaced is projected onto the final document
//!    and painted over the map with the in-progress commit id (see [`insert_into_blame_map`]).
//!
//! Painting merges with spans of the same commit (including ones that merely touch the painted
//! range) and clips or removes spans of other commits. The scan is linear; span counts grow with
//! edit locality, not document size.

use std::fmt::Write as _;

use crate::{
    TrackError,
    mapping::{Bias, Mappable, Mapping},
    span::{CommitId, Span},
};

/// Carry `map` forward through `mapping` and attribute every changed range to `id`.
pub fn update_blame_map(map: &[Span], mapping: &Mapping, id: CommitId) -> Vec<Span> {
    let mut result: Vec<Span> = map
        .iter()
        .filter_map(|span| span.map_through(mapping))
        .collect();

    for (index, step_map) in mapping.maps().iter().enumerate() {
        let after = mapping.slice(index + 1);
        step_map.for_each(|_old_start, _old_end, start, end| {
            insert_into_blame_map(
                &mut result,
                after.map(start, Bias::Right),
                after.map(end, Bias::Left),
                id,
            );
        });
    }

    result
}

/// Paint `[from, to)` with `commit` over a sorted, non-overlapping span list.
///
/// Same-commit spans overlapping or touching the range are merged into it. Spans of other
/// commits are split, clipped or removed so that nothing overlaps the new span. Empty or
/// reversed ranges are ignored.
pub fn insert_into_blame_map(map: &mut Vec<Span>, from: usize, to: usize, commit: CommitId) {
    if from >= to {
        return;
    }

    let pos = split_at_insert_point(map, from, to, commit);
    let (pos, from, to) = absorb_overlapping(map, pos, from, to, commit);
    map.insert(pos, Span::new(from, to, Some(commit)));
}

/// Find where a span painted over `[from, to)` goes, splitting off the left remainder of a
/// foreign span that starts before `from`.
///
/// After this returns, every span before the returned index ends at or before `from` (or
/// belongs to `commit` and ends before `from`).
fn split_at_insert_point(map: &mut Vec<Span>, from: usize, to: usize, commit: CommitId) -> usize {
    let mut pos = 0;
    while let Some(&next) = map.get(pos) {
        if next.commit == Some(commit) {
            if next.to >= from {
                break;
            }
            pos += 1;
            continue;
        }

        if next.to <= from {
            pos += 1;
            continue;
        }

        if next.from < from {
            let left = Span::new(next.from, from, next.commit);
            if next.to > to {
                // Sticks out on both sides; the right part is clipped by `absorb_overlapping`.
                map.insert(pos, left);
            } else {
                map[pos] = left;
            }
            pos += 1;
        }
        break;
    }
    pos
}

/// Starting at `pos`, merge same-commit spans into `[from, to)` and clear foreign spans out of
/// it. Returns the insertion index and the (possibly widened) range.
fn absorb_overlapping(
    map: &mut Vec<Span>,
    pos: usize,
    mut from: usize,
    mut to: usize,
    commit: CommitId,
) -> (usize, usize, usize) {
    while let Some(&next) = map.get(pos) {
        if next.commit == Some(commit) {
            if next.from > to {
                break;
            }
            from = from.min(next.from);
            to = to.max(next.to);
            map.remove(pos);
            continue;
        }

        if next.from >= to {
            break;
        }

        if next.to > to {
            map[pos] = Span::new(to, next.to, next.commit);
            break;
        }

        map.remove(pos);
    }
    (pos, from, to)
}

/// Check that `map` covers exactly `[0, doc_len)` with sorted, contiguous, non-empty spans.
///
/// An empty map is accepted for any document: it means nothing is tracked yet.
pub fn validate_blame_map(map: &[Span], doc_len: usize) -> Result<(), TrackError> {
    let Some(first) = map.first() else {
        return Ok(());
    };
    if first.from != 0 {
        return Err(TrackError::InvalidBlameMap(format!(
            "first span starts at {}, expected 0",
            first.from
        )));
    }

    let mut prev_end = 0;
    for (idx, span) in map.iter().enumerate() {
        if span.is_empty() {
            return Err(TrackError::InvalidBlameMap(format!(
                "empty span at index {idx}: {span:?}"
            )));
        }
        if span.from != prev_end {
            return Err(TrackError::InvalidBlameMap(format!(
                "span at index {idx} starts at {}, previous span ended at {prev_end}",
                span.from
            )));
        }
        prev_end = span.to;
    }

    if prev_end != doc_len {
        return Err(TrackError::InvalidBlameMap(format!(
            "spans end at {prev_end}, document length is {doc_len}"
        )));
    }
    Ok(())
}

/// Render one line per span: `from..to #id`, or `from..to -` for unattributed content.
pub fn render_blame(map: &[Span]) -> String {
    let mut out = String::new();
    for span in map {
        let _ = match span.commit {
            Some(id) => writeln!(out, "{}..{} #{id}", span.from, span.to),
            None => writeln!(out, "{}..{} -", span.from, span.to),
        };
    }
    out
}
