//! Score ranges and paging for ordered-set reads

/// Inclusive score range `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl ScoreRange {
    /// `[min, max]`
    pub const fn new(min: f64, max: f64) -> Self {
        ScoreRange { min, max }
    }

    /// Every score
    pub const fn all() -> Self {
        ScoreRange::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    /// `[min, +∞]`
    pub const fn from(min: f64) -> Self {
        ScoreRange::new(min, f64::INFINITY)
    }

    /// `[-∞, max]`
    pub const fn to(max: f64) -> Self {
        ScoreRange::new(f64::NEG_INFINITY, max)
    }

    /// Whether `score` falls inside the range
    pub fn contains(&self, score: f64) -> bool {
        self.min <= score && score <= self.max
    }

    /// Whether no score can fall inside the range
    pub fn is_empty(&self) -> bool {
        self.min.is_nan() || self.max.is_nan() || self.min > self.max
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        ScoreRange::all()
    }
}

/// Offset/limit applied after the range filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Members to skip
    pub skip: usize,
    /// Members to return at most
    pub take: usize,
}

impl Page {
    /// Create a page
    pub const fn new(skip: usize, take: usize) -> Self {
        Page { skip, take }
    }
}
