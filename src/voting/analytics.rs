use crate::db::{ballots, photos, settings, Database};
use crate::models::{Ballot, Photo, VotingSettings};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Voter {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoBreakdown {
    pub id: String,
    pub name: String,
    pub participant_name: Option<String>,
    pub participant_email: Option<String>,
    pub vote_count: i64,
    pub is_winner: bool,
    pub winner_position: Option<u8>,
    pub voters: Vec<Voter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingAnalytics {
    pub total_votes: usize,
    pub total_photos: usize,
    pub total_voters: usize,
    pub photos: Vec<PhotoBreakdown>,
    pub voting_settings: VotingSettings,
}

/// Reads settings, photos and ballots inside one transaction so the voter
/// lists and the tallies come from the same snapshot.
pub async fn load(db: &Database) -> Result<VotingAnalytics, sqlx::Error> {
    let mut tx = db.begin().await?;
    let current = settings::fetch(&mut tx).await?.unwrap_or_default();
    let all_photos = photos::list_all(&mut tx).await?;
    let all_ballots = ballots::list_all(&mut tx).await?;
    tx.commit().await?;

    Ok(build(current, all_photos, &all_ballots))
}

/// Groups ballots under the photo they chose. `photos` keeps its order.
pub fn build(voting_settings: VotingSettings, photos: Vec<Photo>, ballots: &[Ballot]) -> VotingAnalytics {
    let mut voters_by_photo: HashMap<&str, Vec<Voter>> = HashMap::new();
    for ballot in ballots {
        voters_by_photo
            .entry(ballot.photo_id.as_str())
            .or_default()
            .push(Voter {
                user_id: ballot.user_id.clone(),
                email: ballot.voter_email.clone(),
                name: ballot.voter_name.clone(),
                voted_at: ballot.voted_at,
            });
    }

    let total_voters = ballots
        .iter()
        .map(|ballot| ballot.user_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    let breakdown: Vec<PhotoBreakdown> = photos
        .into_iter()
        .map(|photo| {
            let voters = voters_by_photo.remove(photo.id.as_str()).unwrap_or_default();
            PhotoBreakdown {
                id: photo.id,
                name: photo.name,
                participant_name: photo.participant_name,
                participant_email: photo.participant_email,
                vote_count: photo.vote_count,
                is_winner: photo.is_winner,
                winner_position: photo.winner_position,
                voters,
            }
        })
        .collect();

    VotingAnalytics {
        total_votes: ballots.len(),
        total_photos: breakdown.len(),
        total_voters,
        photos: breakdown,
        voting_settings,
    }
}
