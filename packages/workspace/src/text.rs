//! Byte-offset text ranges and minimal text changes.

use crate::WorkspaceError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted range {start}..{end}");
        Self { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains_range(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Half-open overlap test; ranges that merely touch do not overlap.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub(crate) fn validate(&self, text: &str) -> Result<(), WorkspaceError> {
        if self.start > self.end || self.end > text.len() {
            return Err(WorkspaceError::RangeOutOfBounds {
                range: *self,
                len: text.len(),
            });
        }
        if !text.is_char_boundary(self.start) || !text.is_char_boundary(self.end) {
            return Err(WorkspaceError::NotCharBoundary(*self));
        }
        Ok(())
    }
}

/// Replacement of `range` in the old text with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    pub range: TextRange,
    pub new_text: String,
}

impl TextChange {
    pub fn new(range: TextRange, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    /// Length delta this change introduces.
    pub fn delta(&self) -> isize {
        self.new_text.len() as isize - self.range.len() as isize
    }
}

/// Compute the minimal single change turning `old` into `new`.
///
/// Returns `None` when both texts are equal.
pub fn diff_text(old: &str, new: &str) -> Option<TextChange> {
    if old == new {
        return None;
    }

    let mut prefix = old
        .bytes()
        .zip(new.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    while !old.is_char_boundary(prefix) || !new.is_char_boundary(prefix) {
        prefix -= 1;
    }

    let max_suffix = old.len().min(new.len()) - prefix;
    let mut suffix = old
        .bytes()
        .rev()
        .zip(new.bytes().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    while !old.is_char_boundary(old.len() - suffix) || !new.is_char_boundary(new.len() - suffix) {
        suffix -= 1;
    }

    Some(TextChange {
        range: TextRange::new(prefix, old.len() - suffix),
        new_text: new[prefix..new.len() - suffix].to_string(),
    })
}

/// Line pairs above which `diff_hunks` stops aligning lines and reports the
/// differing middle as a single change.
const MAX_ALIGNED_LINE_PAIRS: usize = 4_000_000;

/// Compute the changes turning `old` into `new`, one per differing region.
///
/// Lines are aligned first, so edits far apart in the text stay separate
/// changes. Each change is then trimmed to its minimal character range.
pub fn diff_hunks(old: &str, new: &str) -> Vec<TextChange> {
    if old == new {
        return Vec::new();
    }

    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();

    let prefix = old_lines
        .iter()
        .zip(&new_lines)
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old_lines.len().min(new_lines.len()) - prefix;
    let suffix = old_lines
        .iter()
        .rev()
        .zip(new_lines.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_middle = &old_lines[prefix..old_lines.len() - suffix];
    let new_middle = &new_lines[prefix..new_lines.len() - suffix];
    let old_start: usize = old_lines[..prefix].iter().map(|l| l.len()).sum();
    let new_start = old_start;

    let regions = if old_middle.len().saturating_mul(new_middle.len()) > MAX_ALIGNED_LINE_PAIRS {
        vec![(0..old_middle.len(), 0..new_middle.len())]
    } else {
        differing_regions(old_middle, new_middle)
    };

    let old_offsets = line_offsets(old_middle, old_start);
    let new_offsets = line_offsets(new_middle, new_start);

    regions
        .into_iter()
        .filter_map(|(old_span, new_span)| {
            let old_range = old_offsets[old_span.start]..old_offsets[old_span.end];
            let new_range = new_offsets[new_span.start]..new_offsets[new_span.end];
            let change = diff_text(&old[old_range.clone()], &new[new_range])?;
            Some(TextChange {
                range: TextRange::new(
                    old_range.start + change.range.start,
                    old_range.start + change.range.end,
                ),
                new_text: change.new_text,
            })
        })
        .collect()
}

/// Byte offset of each line start, plus the end of the last line.
fn line_offsets(lines: &[&str], start: usize) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(lines.len() + 1);
    let mut at = start;
    offsets.push(at);
    for line in lines {
        at += line.len();
        offsets.push(at);
    }
    offsets
}

/// Line index ranges that differ, from a longest common subsequence of lines.
fn differing_regions(
    old: &[&str],
    new: &[&str],
) -> Vec<(std::ops::Range<usize>, std::ops::Range<usize>)> {
    let (n, m) = (old.len(), new.len());
    // lcs[i][j] is the common subsequence length of old[i..] and new[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old[i] == new[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut regions = Vec::new();
    let (mut i, mut j) = (0, 0);
    let (mut region_i, mut region_j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old[i] == new[j] {
            if region_i < i || region_j < j {
                regions.push((region_i..i, region_j..j));
            }
            i += 1;
            j += 1;
            region_i = i;
            region_j = j;
        } else if j < m && (i == n || lcs[i][j + 1] >= lcs[i + 1][j]) {
            j += 1;
        } else {
            i += 1;
        }
    }
    if region_i < n || region_j < m {
        regions.push((region_i..n, region_j..m));
    }
    regions
}

/// Apply non-overlapping changes, all expressed against `text`.
pub fn apply_text_changes(text: &str, changes: &[TextChange]) -> Result<String, WorkspaceError> {
    let mut sorted: Vec<&TextChange> = changes.iter().collect();
    sorted.sort_by_key(|c| (c.range.start, c.range.end));

    for change in &sorted {
        change.range.validate(text)?;
    }
    for pair in sorted.windows(2) {
        if pair[0].range.end > pair[1].range.start {
            return Err(WorkspaceError::OverlappingChanges(pair[1].range));
        }
    }

    let mut result = text.to_string();
    for change in sorted.iter().rev() {
        result.replace_range(change.range.start..change.range.end, &change.new_text);
    }
    Ok(result)
}
