//! Store catalog records.
//!
//! These are the plain records handed to templates and JSON responses:
//! stores, their reviews, tag counts, and ranked stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{Coordinates, GeoError, Location};
use crate::slug::{SlugCandidate, SlugError};
use crate::types::{ReviewId, StoreId, UserId};

/// Tags offered as checkboxes on the store form.
pub const STORE_TAGS: &[&str] = &[
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

/// Validation failures for store input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Name(#[from] SlugError),
    #[error("you must supply an address")]
    MissingAddress,
    #[error("you must supply coordinates: {0}")]
    Location(#[from] GeoError),
}

/// A store listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created: DateTime<Utc>,
    pub location: Location,
    pub photo: Option<String>,
    /// Set at creation and never changed.
    pub author: UserId,
}

/// Raw store fields as submitted by a form or seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Store fields that passed validation, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDraft {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    pub photo: Option<String>,
}

impl StoreInput {
    /// Trim and validate the input.
    ///
    /// Blank descriptions become `None`; tags are trimmed and de-duplicated
    /// keeping their first position.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Name` for a blank name, `StoreError::MissingAddress`
    /// for a blank address, and `StoreError::Location` for unusable coordinates.
    pub fn validate(self) -> Result<StoreDraft, StoreError> {
        SlugCandidate::from_name(&self.name)?;

        let address = self.address.trim();
        if address.is_empty() {
            return Err(StoreError::MissingAddress);
        }
        let coordinates = Coordinates::new(self.longitude, self.latitude)?;

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_owned());
            }
        }

        Ok(StoreDraft {
            name: self.name.trim().to_owned(),
            description: self
                .description
                .map(|d| d.trim().to_owned())
                .filter(|d| !d.is_empty()),
            tags,
            location: Location::point(coordinates, address),
            photo: self.photo.filter(|p| !p.is_empty()),
        })
    }
}

/// Star rating, 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct Rating(u8);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max}, got {got}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    pub got: i16,
}

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// # Errors
    ///
    /// Returns `RatingError` outside `1..=5`.
    pub fn new(value: i16) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { got: value })
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i16> for Rating {
    type Error = RatingError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

/// A review left on a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub store: StoreId,
    pub author: UserId,
    pub author_name: String,
    pub text: String,
    pub rating: Rating,
    pub created: DateTime<Utc>,
}

/// A store with its reviews joined in on request.
///
/// `reviews` is `None` when the caller did not ask for the join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreWithReviews {
    #[serde(flatten)]
    pub store: Store,
    pub reviews: Option<Vec<Review>>,
}

/// One row of the tag aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// One row of the top-stores ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreWithRating {
    pub id: StoreId,
    pub name: String,
    pub slug: String,
    pub photo: Option<String>,
    pub reviews: Vec<Review>,
    /// Arithmetic mean of `reviews[].rating`.
    pub average_rating: f64,
}

/// Page arithmetic for the store listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub total: i64,
}

impl Pagination {
    /// Stores shown per listing page.
    pub const DEFAULT_PER_PAGE: u32 = 6;

    /// `page` is 1-based; zero is treated as the first page.
    #[must_use]
    pub fn new(page: u32, per_page: u32, total: i64) -> Self {
        let per_page = per_page.max(1);
        let total_u = u64::try_from(total).unwrap_or(0);
        let pages = u32::try_from(total_u.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX);
        Self {
            page: page.max(1),
            pages,
            per_page,
            total,
        }
    }

    /// Row offset of the first store on this page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    /// Whether the requested page lies beyond the last non-empty page.
    #[must_use]
    pub const fn is_past_end(&self) -> bool {
        self.pages > 0 && self.page > self.pages
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.pages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> StoreInput {
        StoreInput {
            name: "  Cafe Luna ".to_owned(),
            description: Some("   ".to_owned()),
            tags: vec![
                "Wifi".to_owned(),
                " Open Late ".to_owned(),
                "Wifi".to_owned(),
                String::new(),
            ],
            address: " 12 Main St ".to_owned(),
            longitude: -79.38,
            latitude: 43.65,
            photo: None,
        }
    }

    #[test]
    fn test_validate_trims_and_dedupes() {
        let draft = input().validate().unwrap();
        assert_eq!(draft.name, "Cafe Luna");
        assert_eq!(draft.description, None);
        assert_eq!(draft.tags, ["Wifi", "Open Late"]);
        assert_eq!(draft.location.address, "12 Main St");
        assert!((draft.location.coordinates.longitude() + 79.38).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_requires_name() {
        let err = StoreInput {
            name: "  ".to_owned(),
            ..input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, StoreError::Name(SlugError::EmptyName));
    }

    #[test]
    fn test_validate_requires_address() {
        let err = StoreInput {
            address: String::new(),
            ..input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, StoreError::MissingAddress);
    }

    #[test]
    fn test_validate_requires_finite_coordinates() {
        let err = StoreInput {
            latitude: f64::NAN,
            ..input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, StoreError::Location(GeoError::NotFinite));
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-3).is_err());
        assert_eq!(Rating::new(5).unwrap().get(), 5);
        assert_eq!(
            Rating::new(9).unwrap_err().to_string(),
            "rating must be between 1 and 5, got 9"
        );
    }

    #[test]
    fn test_store_with_rating_uses_average_rating_key() {
        let row = StoreWithRating {
            id: StoreId::new(1),
            name: "A".to_owned(),
            slug: "a".to_owned(),
            photo: None,
            reviews: Vec::new(),
            average_rating: 4.5,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["averageRating"], 4.5);
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(2, 6, 13);
        assert_eq!(p.pages, 3);
        assert_eq!(p.offset(), 6);
        assert!(p.has_previous());
        assert!(p.has_next());
        assert!(!p.is_past_end());

        assert!(Pagination::new(4, 6, 13).is_past_end());
        assert!(!Pagination::new(1, 6, 0).is_past_end());
        assert_eq!(Pagination::new(0, 6, 5).page, 1);
    }
}
