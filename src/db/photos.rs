//! Photo catalog rows and the tally fields the voting engine owns on them.

use crate::models::Photo;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

const PHOTO_COLUMNS: &str = "id, name, participant_name, participant_email, uploaded_at, vote_count, is_winner, winner_position";

pub async fn insert(conn: &mut SqliteConnection, photo: &Photo) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO photos (id, name, participant_name, participant_email, uploaded_at, vote_count, is_winner, winner_position)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&photo.id)
    .bind(&photo.name)
    .bind(&photo.participant_name)
    .bind(&photo.participant_email)
    .bind(photo.uploaded_at)
    .bind(photo.vote_count)
    .bind(photo.is_winner)
    .bind(photo.winner_position)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn exists(conn: &mut SqliteConnection, photo_id: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM photos WHERE id = ?")
        .bind(photo_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

pub async fn find(conn: &mut SqliteConnection, photo_id: &str) -> Result<Option<Photo>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM photos WHERE id = ?", PHOTO_COLUMNS))
        .bind(photo_id)
        .fetch_optional(conn)
        .await?;
    row.as_ref().map(photo_from_row).transpose()
}

/// All photos, most voted first.
pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Photo>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {} FROM photos ORDER BY vote_count DESC, uploaded_at, id",
        PHOTO_COLUMNS
    ))
    .fetch_all(conn)
    .await?
    .iter()
    .map(photo_from_row)
    .collect()
}

pub async fn list_winners(conn: &mut SqliteConnection) -> Result<Vec<Photo>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {} FROM photos WHERE is_winner = TRUE ORDER BY winner_position",
        PHOTO_COLUMNS
    ))
    .fetch_all(conn)
    .await?
    .iter()
    .map(photo_from_row)
    .collect()
}

/// Adds one vote in place, without reading the count first.
pub async fn increment_vote_count(conn: &mut SqliteConnection, photo_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE photos SET vote_count = vote_count + 1 WHERE id = ?")
        .bind(photo_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn clear_winners(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE photos SET is_winner = FALSE, winner_position = NULL WHERE is_winner = TRUE",
    )
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn mark_winner(conn: &mut SqliteConnection, photo_id: &str, position: u8) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE photos SET is_winner = TRUE, winner_position = ? WHERE id = ?")
        .bind(position)
        .bind(photo_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Zeroes every tally and clears all winner annotations.
pub async fn reset_tallies(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE photos SET vote_count = 0, is_winner = FALSE, winner_position = NULL",
    )
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

fn photo_from_row(row: &SqliteRow) -> Result<Photo, sqlx::Error> {
    Ok(Photo {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        participant_name: row.try_get("participant_name")?,
        participant_email: row.try_get("participant_email")?,
        uploaded_at: row.try_get("uploaded_at")?,
        vote_count: row.try_get("vote_count")?,
        is_winner: row.try_get("is_winner")?,
        winner_position: row.try_get("winner_position")?,
    })
}
