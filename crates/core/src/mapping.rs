//! Position mapping across edits.
//!
//! A [`StepMap`] describes the ranges one step replaced, in the coordinates of the document
//! before that step. A [`Mapping`] is an ordered list of step maps; mapping a position through it
//! maps through each step map in turn.
//!
//! Positions that sit exactly on an insertion point are ambiguous: the inserted content could be
//! considered before or after them. [`Bias`] resolves that ambiguity.

/// Which side of an insertion a position should land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bias {
    /// Stay before inserted content.
    Left,
    /// Move past inserted content.
    Right,
}

/// Anything that can project a position from one document revision onto a later one.
pub trait Mappable {
    fn map(&self, pos: usize, bias: Bias) -> usize;
}

/// One replaced range of a step: `old_size` bytes at `start` became `new_size` bytes.
///
/// `start` is expressed in the coordinates of the document before the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplacedRange {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

/// The position mapping of a single step.
///
/// Ranges must be sorted by `start` and must not overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepMap {
    ranges: Vec<ReplacedRange>,
}

impl StepMap {
    pub fn new(ranges: Vec<ReplacedRange>) -> Self {
        debug_assert!(
            ranges
                .windows(2)
                .all(|w| w[0].start + w[0].old_size <= w[1].start),
            "step map ranges must be sorted and disjoint"
        );
        Self { ranges }
    }

    /// A map replacing `old_size` bytes at `start` with `new_size` bytes.
    pub fn replace(start: usize, old_size: usize, new_size: usize) -> Self {
        if old_size == 0 && new_size == 0 {
            return Self::default();
        }
        Self {
            ranges: vec![ReplacedRange {
                start,
                old_size,
                new_size,
            }],
        }
    }

    pub fn ranges(&self) -> &[ReplacedRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Call `f(old_start, old_end, new_start, new_end)` for every replaced range.
    pub fn for_each(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let mut diff: isize = 0;
        for r in &self.ranges {
            let new_start = offset(r.start, diff);
            f(
                r.start,
                r.start + r.old_size,
                new_start,
                new_start + r.new_size,
            );
            diff += r.new_size as isize - r.old_size as isize;
        }
    }
}

impl Mappable for StepMap {
    fn map(&self, pos: usize, bias: Bias) -> usize {
        let mut diff: isize = 0;
        for r in &self.ranges {
            if r.start > pos {
                break;
            }
            let end = r.start + r.old_size;
            if pos <= end {
                // Inside a deletion the bias decides; on the edges of a non-empty range the
                // position keeps to the side it was on.
                let side = if r.old_size == 0 {
                    bias
                } else if pos == r.start {
                    Bias::Left
                } else if pos == end {
                    Bias::Right
                } else {
                    bias
                };
                let base = offset(r.start, diff);
                return match side {
                    Bias::Left => base,
                    Bias::Right => base + r.new_size,
                };
            }
            diff += r.new_size as isize - r.old_size as isize;
        }
        offset(pos, diff)
    }
}

impl Mappable for [StepMap] {
    fn map(&self, pos: usize, bias: Bias) -> usize {
        self.iter().fold(pos, |pos, m| m.map(pos, bias))
    }
}

/// An ordered composition of step maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new(maps: Vec<StepMap>) -> Self {
        Self { maps }
    }

    /// The per-step maps, in application order.
    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn append(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    /// The maps of steps `from..`, which project positions from the document after step
    /// `from - 1` onto the final document.
    pub fn slice(&self, from: usize) -> &[StepMap] {
        &self.maps[from.min(self.maps.len())..]
    }
}

impl Mappable for Mapping {
    fn map(&self, pos: usize, bias: Bias) -> usize {
        self.maps.as_slice().map(pos, bias)
    }
}

impl FromIterator<StepMap> for Mapping {
    fn from_iter<T: IntoIterator<Item = StepMap>>(iter: T) -> Self {
        Self {
            maps: iter.into_iter().collect(),
        }
    }
}

/// Apply a signed delta to a position.
///
/// Well-formed maps never push a position below zero, so this saturates instead of wrapping.
fn offset(pos: usize, diff: isize) -> usize {
    pos.saturating_add_signed(diff)
}
