//! Delete all catalog data. Users and sessions are kept.

use super::{CommandError, connect};

/// Delete every heart, review, and store in one transaction.
///
/// # Errors
///
/// Returns an error without `confirmed`, or if the database fails.
pub async fn run(confirmed: bool) -> Result<(), CommandError> {
    if !confirmed {
        return Err(CommandError::Invalid(
            "refusing to wipe without --yes".to_string(),
        ));
    }

    let pool = connect().await?;
    let mut tx = pool.begin().await?;

    let hearts = sqlx::query("DELETE FROM hearts").execute(&mut *tx).await?;
    let reviews = sqlx::query("DELETE FROM reviews").execute(&mut *tx).await?;
    let stores = sqlx::query("DELETE FROM stores").execute(&mut *tx).await?;

    tx.commit().await?;

    tracing::info!(
        hearts = hearts.rows_affected(),
        reviews = reviews.rows_affected(),
        stores = stores.rows_affected(),
        "Wiped catalog data"
    );
    Ok(())
}
