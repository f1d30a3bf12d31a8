//! Parameters of the "top stores by rating" aggregation.
//!
//! The ranking joins every store to its reviews, keeps stores with at least
//! [`MIN_REVIEWS`] reviews, averages their ratings, sorts by that average
//! (highest first), and keeps the first `limit` rows. Stores with a single
//! review are left out so one enthusiastic rating cannot top the chart.

/// Fewest reviews a store needs to be ranked.
pub const MIN_REVIEWS: i64 = 2;

/// Rows returned when no limit is given.
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest limit accepted from callers.
pub const MAX_LIMIT: i64 = 100;

/// A top-stores request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopStoresQuery {
    limit: i64,
}

impl Default for TopStoresQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }
}

impl TopStoresQuery {
    /// Request `limit` rows, clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn with_limit(limit: i64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.limit
    }

    #[must_use]
    pub const fn min_reviews(&self) -> i64 {
        MIN_REVIEWS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limit_is_ten() {
        assert_eq!(TopStoresQuery::default().limit(), 10);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(TopStoresQuery::with_limit(0).limit(), 1);
        assert_eq!(TopStoresQuery::with_limit(5_000).limit(), MAX_LIMIT);
        assert_eq!(TopStoresQuery::with_limit(3).limit(), 3);
    }

    #[test]
    fn test_single_review_stores_are_excluded() {
        assert_eq!(TopStoresQuery::default().min_reviews(), 2);
    }
}
