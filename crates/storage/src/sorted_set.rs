//! Score-ordered membership set
//!
//! Members are unique; each carries one `f64` score. Iteration order is
//! ascending score, ties broken by member. Lookups by member are O(1) via
//! an FxHashMap, range reads are O(log n + k) via a BTreeSet.

use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Bound;

use crate::range::{Page, ScoreRange};

/// Totally ordered score
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl Score {
    fn new(score: f64) -> Self {
        // -0.0 and 0.0 order apart under total_cmp
        if score == 0.0 {
            Score(0.0)
        } else {
            Score(score)
        }
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Ordered set of members by score
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: FxHashMap<String, f64>,
    ordered: BTreeSet<(Score, String)>,
}

impl SortedSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or re-score a member; true if the member is new
    pub fn insert(&mut self, member: &str, score: f64) -> bool {
        let score = Score::new(score);
        match self.scores.insert(member.to_string(), score.0) {
            Some(previous) => {
                self.ordered.remove(&(Score::new(previous), member.to_string()));
                self.ordered.insert((score, member.to_string()));
                false
            }
            None => {
                self.ordered.insert((score, member.to_string()));
                true
            }
        }
    }

    /// Remove a member; true if it was present
    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&(Score::new(score), member.to_string()));
                true
            }
            None => false,
        }
    }

    /// Score of a member
    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// Members within `range`, ascending, after applying `page`
    pub fn range_by_score(&self, range: ScoreRange, page: Option<Page>) -> Vec<String> {
        let members = self.iter_range(range).map(|(_, member)| member.clone());
        match page {
            Some(page) => members.skip(page.skip).take(page.take).collect(),
            None => members.collect(),
        }
    }

    /// Number of members within `range`
    pub fn count_by_score(&self, range: ScoreRange) -> usize {
        self.iter_range(range).count()
    }

    fn iter_range(&self, range: ScoreRange) -> impl Iterator<Item = &(Score, String)> + '_ {
        let empty = range.is_empty();
        let max = Score::new(range.max);
        let start = (Score::new(range.min), String::new());
        self.ordered
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(move |(score, _)| !empty && *score <= max)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the set has no members
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}
