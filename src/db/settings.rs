//! Settings store: the single voting-session record (row `id = 1`).

use crate::models::VotingSettings;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Row, SqliteConnection};

/// Creates the default record if it does not exist yet.
///
/// This is a write even when the row is already there, so running it first in
/// a transaction takes the database write lock before anything is read.
pub async fn ensure_row(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO voting_settings (id) VALUES (1)")
        .execute(conn)
        .await?;
    Ok(())
}

/// Reads the record without creating it.
pub async fn fetch(conn: &mut SqliteConnection) -> Result<Option<VotingSettings>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT is_active, start_time, end_time, winners, results_published, max_votes_per_user
        FROM voting_settings
        WHERE id = 1
        "#,
    )
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(settings_from_row).transpose()
}

pub async fn get_or_init(conn: &mut SqliteConnection) -> Result<VotingSettings, sqlx::Error> {
    ensure_row(&mut *conn).await?;
    Ok(fetch(conn).await?.unwrap_or_default())
}

/// Overwrites the record with `settings`.
pub async fn save(conn: &mut SqliteConnection, settings: &VotingSettings) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO voting_settings (id, is_active, start_time, end_time, winners, results_published, max_votes_per_user)
        VALUES (1, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            is_active = excluded.is_active,
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            winners = excluded.winners,
            results_published = excluded.results_published,
            max_votes_per_user = excluded.max_votes_per_user
        "#,
    )
    .bind(settings.is_active)
    .bind(settings.start_time)
    .bind(settings.end_time)
    .bind(Json(&settings.winners))
    .bind(settings.results_published)
    .bind(settings.max_votes_per_user)
    .execute(conn)
    .await?;
    Ok(())
}

fn settings_from_row(row: &SqliteRow) -> Result<VotingSettings, sqlx::Error> {
    Ok(VotingSettings {
        is_active: row.try_get("is_active")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        winners: row.try_get::<Json<Vec<String>>, _>("winners")?.0,
        results_published: row.try_get("results_published")?,
        max_votes_per_user: row.try_get("max_votes_per_user")?,
    })
}
