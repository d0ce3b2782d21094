#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use photo_vote::models::{Actor, NewPhoto, Photo, Role};
use photo_vote::{Config, Database, VotingEngine};
use tempfile::TempDir;

/// A voting engine over a fresh SQLite file that lives as long as this value.
pub struct TestContest {
    pub engine: Arc<VotingEngine>,
    _dir: TempDir,
}

impl TestContest {
    pub async fn new() -> Self {
        Self::with_admin_emails(Vec::new()).await
    }

    pub async fn with_admin_emails(admin_emails: Vec<String>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("contest.db").display());
        let config = Config {
            busy_timeout: Duration::from_secs(30),
            ..Config::default().with_database_url(url)
        };

        let database = Database::new(&config)
            .await
            .expect("Failed to open test database");
        let engine = VotingEngine::new(Arc::new(database)).with_admin_emails(admin_emails);

        Self {
            engine: Arc::new(engine),
            _dir: dir,
        }
    }

    pub async fn add_photo(&self, name: &str) -> Photo {
        self.engine
            .database()
            .create_photo(NewPhoto {
                name: name.to_string(),
                participant_name: Some(format!("{} author", name)),
                participant_email: None,
            })
            .await
            .expect("Failed to create photo")
    }

    pub async fn add_photos(&self, names: &[&str]) -> Vec<Photo> {
        let mut photos = Vec::with_capacity(names.len());
        for name in names {
            photos.push(self.add_photo(name).await);
        }
        photos
    }

    pub async fn vote_count(&self, photo_id: &str) -> i64 {
        self.engine
            .database()
            .get_photo(photo_id)
            .await
            .expect("Failed to load photo")
            .expect("Photo missing")
            .vote_count
    }
}

pub fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin, "admin@example.com").with_name("Admin")
}

pub fn voter(n: usize) -> Actor {
    Actor::new(format!("user-{}", n), Role::User, format!("user{}@example.com", n))
}

pub fn ids(photos: &[&Photo]) -> Vec<String> {
    photos.iter().map(|photo| photo.id.clone()).collect()
}
