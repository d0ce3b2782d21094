pub mod ballots;
pub mod photos;
pub mod settings;

use crate::config::Config;
use crate::models::{NewPhoto, Photo};
use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;

/// Handle on the contest database: settings, ballots and the photo tallies.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &Config) -> Result<Self, sqlx::Error> {
        // WAL lets readers keep a snapshot while a writer holds the lock, and the
        // busy timeout makes concurrent writers queue instead of failing.
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Self::init_schema(&pool).await?;
        info!("Connected to {}", config.database_url);

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Opens a transaction. Callers that mutate must issue a write first
    /// (see `settings::ensure_row`) so the write lock is taken up front.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS voting_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                is_active BOOLEAN NOT NULL DEFAULT FALSE,
                start_time TEXT,
                end_time TEXT,
                winners TEXT NOT NULL DEFAULT '[]',
                results_published BOOLEAN NOT NULL DEFAULT FALSE,
                max_votes_per_user INTEGER NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS photos (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                participant_name TEXT,
                participant_email TEXT,
                uploaded_at TEXT NOT NULL,
                vote_count INTEGER NOT NULL DEFAULT 0 CHECK (vote_count >= 0),
                is_winner BOOLEAN NOT NULL DEFAULT FALSE,
                winner_position INTEGER CHECK (winner_position IN (1, 2, 3)),
                CHECK (is_winner = (winner_position IS NOT NULL))
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_photos_winner_position
            ON photos (winner_position) WHERE winner_position IS NOT NULL;
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ballots (
                user_id TEXT PRIMARY KEY,
                photo_id TEXT NOT NULL,
                voter_email TEXT NOT NULL,
                voter_name TEXT,
                voted_at TEXT NOT NULL,
                FOREIGN KEY (photo_id) REFERENCES photos(id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ballots_photo_id ON ballots (photo_id);")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Adds a photo to the catalog with an empty tally.
    pub async fn create_photo(&self, new_photo: NewPhoto) -> Result<Photo, sqlx::Error> {
        let photo = Photo::new(new_photo);
        let mut conn = self.pool.acquire().await?;
        photos::insert(&mut conn, &photo).await?;
        info!("Added photo {} ({})", photo.id, photo.name);
        Ok(photo)
    }

    pub async fn list_photos(&self) -> Result<Vec<Photo>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        photos::list_all(&mut conn).await
    }

    pub async fn get_photo(&self, photo_id: &str) -> Result<Option<Photo>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        photos::find(&mut conn, photo_id).await
    }
}
