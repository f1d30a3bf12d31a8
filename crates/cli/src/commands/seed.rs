//! Load sample stores from a JSON file.
//!
//! The file is an array of objects shaped like:
//!
//! ```json
//! [{
//!   "name": "Cafe Luna",
//!   "description": "Espresso and pastries",
//!   "tags": ["Wifi", "Open Late"],
//!   "address": "12 Main St, Hamilton",
//!   "longitude": -79.8711,
//!   "latitude": 43.2557
//! }]
//! ```
//!
//! Every store is validated before anything is written, so a bad entry aborts
//! the whole seed.

use std::path::Path;

use delicious_core::{Email, StoreDraft, StoreInput};
use delicious_web::db::{StoreRepository, UserRepository};
use tracing::{error, info};

use super::{CommandError, connect};

/// Parse and validate the seed file contents.
fn parse_stores(content: &str) -> Result<Vec<StoreDraft>, CommandError> {
    let inputs: Vec<StoreInput> = serde_json::from_str(content)?;

    let mut drafts = Vec::with_capacity(inputs.len());
    let mut failures = 0_usize;
    for (index, input) in inputs.into_iter().enumerate() {
        let name = input.name.clone();
        match input.validate() {
            Ok(draft) => drafts.push(draft),
            Err(e) => {
                error!(index, name = %name, "Invalid store: {e}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(CommandError::Invalid(format!(
            "{failures} invalid stores in seed file"
        )));
    }
    Ok(drafts)
}

/// Insert every store in `file`, authored by the user with `author_email`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, the author is
/// not registered, or an insert fails.
pub async fn stores(file: &Path, author_email: &str) -> Result<(), CommandError> {
    let email = Email::parse(author_email).map_err(|e| CommandError::Invalid(e.to_string()))?;

    info!(path = %file.display(), "Loading stores from file");
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| CommandError::Io {
            path: file.display().to_string(),
            source,
        })?;
    let drafts = parse_stores(&content)?;
    info!(stores = drafts.len(), "Parsed seed file");

    let pool = connect().await?;
    let author = UserRepository::new(&pool)
        .get_by_email(&email)
        .await?
        .ok_or_else(|| CommandError::Invalid(format!("no user registered as {email}")))?;

    let repo = StoreRepository::new(&pool);
    for draft in &drafts {
        let store = repo.create(draft, author.id).await?;
        info!(slug = %store.slug, "Created store");
    }

    info!("Seeding complete! {} stores inserted", drafts.len());
    Ok(())
}
