//! Ballot ledger. `user_id` is the primary key, so a user owns at most one ballot.

use crate::models::Ballot;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// Records `ballot` unless the user already holds one. Returns whether it was written.
pub async fn insert_if_absent(conn: &mut SqliteConnection, ballot: &Ballot) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO ballots (user_id, photo_id, voter_email, voter_name, voted_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO NOTHING
        "#,
    )
    .bind(&ballot.user_id)
    .bind(&ballot.photo_id)
    .bind(&ballot.voter_email)
    .bind(&ballot.voter_name)
    .bind(ballot.voted_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_by_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<Ballot>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT user_id, photo_id, voter_email, voter_name, voted_at
        FROM ballots
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(ballot_from_row).transpose()
}

pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Ballot>, sqlx::Error> {
    sqlx::query(
        r#"
        SELECT user_id, photo_id, voter_email, voter_name, voted_at
        FROM ballots
        ORDER BY voted_at, user_id
        "#,
    )
    .fetch_all(conn)
    .await?
    .iter()
    .map(ballot_from_row)
    .collect()
}

/// Removes every ballot, returning how many were deleted.
pub async fn delete_all(conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM ballots").execute(conn).await?;
    Ok(result.rows_affected())
}

fn ballot_from_row(row: &SqliteRow) -> Result<Ballot, sqlx::Error> {
    Ok(Ballot {
        user_id: row.try_get("user_id")?,
        photo_id: row.try_get("photo_id")?,
        voter_email: row.try_get("voter_email")?,
        voter_name: row.try_get("voter_name")?,
        voted_at: row.try_get("voted_at")?,
    })
}
