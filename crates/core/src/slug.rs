//! Store slugs: URL-safe names with a numeric suffix for duplicates.
//!
//! A slug is derived from the store name and made unique by counting the
//! existing slugs that share its base:
//!
//! ```text
//! "Cafe Luna"  -> no existing matches       -> cafe-luna
//! "Cafe Luna"  -> [cafe-luna]               -> cafe-luna-2
//! "cafe luna!" -> [cafe-luna, cafe-luna-2]  -> cafe-luna-3
//! "Cafe Luna"  -> [cafe-luna-2]             -> cafe-luna-3
//! ```
//!
//! The last row is a store renamed away from `cafe-luna`: the count points at
//! a slug that is still held, so the next number past the highest is used.
//!
//! The count-then-assign sequence is not atomic. Two writers racing on the
//! same base can both compute the same slug; the storage layer is expected to
//! hold a unique index on the slug column and re-run the assignment when an
//! insert conflicts. The re-run sees the winner's slug and moves past it.

use std::future::Future;

use thiserror::Error;

/// Separator placed between words and before the duplicate counter.
pub const SEPARATOR: char = '-';

/// Errors raised while deriving a slug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The name was empty after trimming.
    #[error("please enter a store name")]
    EmptyName,
    /// The name contained no letters or digits to build a slug from.
    #[error("store name must contain at least one letter or digit")]
    NoSluggableCharacters,
}

/// Lowercase `input` and collapse every run of non-alphanumeric characters
/// into a single separator, trimming separators from both ends.
///
/// ```
/// use delicious_core::slugify;
///
/// assert_eq!(slugify("  Wes's  Cafe & Bar!! "), "wes-s-cafe-bar");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push(SEPARATOR);
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// The base slug for a store name, before uniqueness is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugCandidate {
    base: String,
}

impl SlugCandidate {
    /// Derive the base slug from a store name.
    ///
    /// # Errors
    ///
    /// Returns `SlugError::EmptyName` for a blank name and
    /// `SlugError::NoSluggableCharacters` when nothing survives slugification.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SlugError::EmptyName);
        }

        let base = slugify(name);
        if base.is_empty() {
            return Err(SlugError::NoSluggableCharacters);
        }

        Ok(Self { base })
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Case-insensitive regular expression matching the base slug and any
    /// suffixed duplicate of it: `^(base)(-[0-9]*)?$`.
    ///
    /// The base only ever holds alphanumerics and separators, so it needs no
    /// escaping.
    #[must_use]
    pub fn pattern(&self) -> String {
        format!("^({})({SEPARATOR}[0-9]*)?$", self.base)
    }

    /// Whether `slug` matches [`Self::pattern`].
    #[must_use]
    pub fn matches(&self, slug: &str) -> bool {
        let slug = slug.to_lowercase();
        let Some(rest) = slug.strip_prefix(&self.base) else {
            return false;
        };
        match rest.strip_prefix(SEPARATOR) {
            None => rest.is_empty(),
            Some(counter) => counter.chars().all(|c| c.is_ascii_digit()),
        }
    }

    /// Pick the final slug given the slugs already in the collection.
    ///
    /// Only entries matching the pattern are counted; with `n` matches the
    /// result is `base-(n+1)`, with none it is the bare base. When that slug
    /// is itself taken (a renamed store can leave a gap in the sequence), the
    /// result is [`Self::next_free`] instead.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, existing: &[S]) -> String {
        let taken = existing.iter().filter(|s| self.matches(s.as_ref())).count();
        let counted = if taken == 0 {
            self.base.clone()
        } else {
            format!("{}{SEPARATOR}{}", self.base, taken + 1)
        };

        if existing.iter().any(|s| s.as_ref().to_lowercase() == counted) {
            self.next_free(existing)
        } else {
            counted
        }
    }

    /// One past the highest numbered duplicate in `existing`.
    ///
    /// The bare base and a trailing separator both count as number 1, so
    /// `[base]` gives `base-2` and `[base, base-7]` gives `base-8`.
    #[must_use]
    pub fn next_free<S: AsRef<str>>(&self, existing: &[S]) -> String {
        existing
            .iter()
            .filter_map(|s| self.counter(s.as_ref()))
            .max()
            .map_or_else(
                || self.base.clone(),
                |highest| format!("{}{SEPARATOR}{}", self.base, highest.saturating_add(1)),
            )
    }

    /// Duplicate number carried by `slug`, if it matches the pattern.
    fn counter(&self, slug: &str) -> Option<u64> {
        if !self.matches(slug) {
            return None;
        }
        let slug = slug.to_lowercase();
        let digits = slug
            .get(self.base.len()..)
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
            .unwrap_or_default();
        Some(digits.parse::<u64>().unwrap_or(1).max(1))
    }
}

/// Assign a unique slug for `name`.
///
/// `lookup` receives the pattern from [`SlugCandidate::pattern`] and returns
/// the slugs currently stored that match it.
///
/// # Errors
///
/// Returns the lookup's error, or a [`SlugError`] (converted into `E`) when the
/// name cannot produce a slug.
pub async fn assign_slug<F, Fut, E>(name: &str, lookup: F) -> Result<String, E>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<Vec<String>, E>>,
    E: From<SlugError>,
{
    let candidate = SlugCandidate::from_name(name)?;
    let existing = lookup(candidate.pattern()).await?;
    Ok(candidate.resolve(&existing))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::future::ready;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Slug(SlugError),
    }

    impl From<SlugError> for TestError {
        fn from(e: SlugError) -> Self {
            Self::Slug(e)
        }
    }

    async fn assign_against(collection: &[String], name: &str) -> Result<String, TestError> {
        let rows = collection.to_vec();
        assign_slug(name, |_pattern| ready(Ok::<_, TestError>(rows))).await
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("Cafe Luna"), "cafe-luna");
        assert_eq!(slugify("Cafe   --  Luna"), "cafe-luna");
        assert_eq!(slugify("--Cafe Luna--"), "cafe-luna");
        assert_eq!(slugify("Wes's Pizza #1"), "wes-s-pizza-1");
    }

    #[test]
    fn test_slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Crème Brûlée"), "crème-brûlée");
    }

    #[test]
    fn test_candidate_rejects_empty_name() {
        assert_eq!(SlugCandidate::from_name("   "), Err(SlugError::EmptyName));
        assert_eq!(
            SlugCandidate::from_name("!!!"),
            Err(SlugError::NoSluggableCharacters)
        );
    }

    #[test]
    fn test_pattern_shape() {
        let candidate = SlugCandidate::from_name("Cafe Luna").unwrap();
        assert_eq!(candidate.pattern(), "^(cafe-luna)(-[0-9]*)?$");
    }

    #[test]
    fn test_matches_follows_pattern() {
        let candidate = SlugCandidate::from_name("Cafe Luna").unwrap();
        assert!(candidate.matches("cafe-luna"));
        assert!(candidate.matches("CAFE-LUNA-2"));
        assert!(candidate.matches("cafe-luna-"));
        assert!(candidate.matches("cafe-luna-17"));
        assert!(!candidate.matches("cafe-luna-bar"));
        assert!(!candidate.matches("cafe-lunatic"));
        assert!(!candidate.matches("the-cafe-luna"));
    }

    #[tokio::test]
    async fn test_sequential_names_get_increasing_suffixes() {
        let mut collection: Vec<String> = Vec::new();
        for _ in 0..4 {
            let slug = assign_against(&collection, "Cafe Luna").await.unwrap();
            collection.push(slug);
        }
        assert_eq!(
            collection,
            ["cafe-luna", "cafe-luna-2", "cafe-luna-3", "cafe-luna-4"]
        );
    }

    #[tokio::test]
    async fn test_different_spellings_share_a_base() {
        let collection = vec!["cafe-luna".to_owned()];
        assert_eq!(
            assign_against(&collection, "CAFE luna!").await.unwrap(),
            "cafe-luna-2"
        );
    }

    #[tokio::test]
    async fn test_unrelated_slugs_are_not_counted() {
        let collection = vec!["cafe-luna-bar".to_owned(), "cafe".to_owned()];
        assert_eq!(
            assign_against(&collection, "Cafe Luna").await.unwrap(),
            "cafe-luna"
        );
    }

    #[tokio::test]
    async fn test_empty_name_fails_before_lookup() {
        let mut called = false;
        let result = assign_slug("  ", |_pattern| {
            called = true;
            ready(Ok::<_, TestError>(Vec::new()))
        })
        .await;
        assert_eq!(result, Err(TestError::Slug(SlugError::EmptyName)));
        assert!(!called);
    }

    #[tokio::test]
    async fn test_lookup_receives_pattern() {
        let mut seen = String::new();
        let slug = assign_slug("Pho Real", |pattern| {
            seen = pattern;
            ready(Ok::<_, TestError>(Vec::new()))
        })
        .await
        .unwrap();
        assert_eq!(slug, "pho-real");
        assert_eq!(seen, "^(pho-real)(-[0-9]*)?$");
    }

    #[test]
    fn test_resolve_skips_a_counted_slug_that_is_taken() {
        // "cafe-luna" was renamed away, leaving only its duplicate behind.
        let candidate = SlugCandidate::from_name("Cafe Luna").unwrap();
        assert_eq!(candidate.resolve(&["cafe-luna-2"]), "cafe-luna-3");
        assert_eq!(candidate.resolve(&["CAFE-LUNA-2"]), "cafe-luna-3");
        assert_eq!(candidate.resolve(&["cafe-luna-3"]), "cafe-luna-2");
    }

    #[test]
    fn test_next_free_is_past_the_highest_counter() {
        let candidate = SlugCandidate::from_name("Cafe Luna").unwrap();
        let none: [&str; 0] = [];
        assert_eq!(candidate.next_free(&none), "cafe-luna");
        assert_eq!(candidate.next_free(&["cafe-luna"]), "cafe-luna-2");
        assert_eq!(candidate.next_free(&["cafe-luna", "cafe-luna-7"]), "cafe-luna-8");
        assert_eq!(candidate.next_free(&["cafe-luna-", "cafe-luna-bar"]), "cafe-luna-2");
    }

    #[test]
    fn test_resolve_never_returns_an_existing_slug() {
        let candidate = SlugCandidate::from_name("Cafe Luna").unwrap();
        let collections: [&[&str]; 4] = [
            &["cafe-luna-2"],
            &["cafe-luna", "cafe-luna-3"],
            &["cafe-luna-2", "cafe-luna-3", "cafe-luna-4"],
            &["cafe-luna-", "cafe-luna-2"],
        ];
        for existing in collections {
            let picked = candidate.resolve(existing);
            assert!(
                !existing.iter().any(|s| s.eq_ignore_ascii_case(&picked)),
                "{picked} is already in {existing:?}"
            );
        }
    }
}
