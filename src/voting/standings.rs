use crate::models::Photo;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// Competition rank: tied photos share a rank and the next rank is skipped.
    pub rank: usize,
    pub photo_id: String,
    pub name: String,
    pub participant_name: Option<String>,
    pub vote_count: i64,
    /// Percentage of all votes cast, 0.0 when nobody voted.
    pub share: f64,
    pub winner_position: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standings {
    pub total_votes: i64,
    pub entries: Vec<Standing>,
}

/// Orders photos by votes, then declared position, then name.
pub fn rank(photos: &[Photo]) -> Standings {
    let total_votes: i64 = photos.iter().map(|photo| photo.vote_count).sum();

    let mut sorted: Vec<&Photo> = photos.iter().collect();
    sorted.sort_by(|a, b| {
        b.vote_count
            .cmp(&a.vote_count)
            .then_with(|| compare_positions(a.winner_position, b.winner_position))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut entries: Vec<Standing> = Vec::with_capacity(sorted.len());
    for (index, photo) in sorted.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(previous) if previous.vote_count == photo.vote_count => previous.rank,
            _ => index + 1,
        };
        entries.push(Standing {
            rank,
            photo_id: photo.id.clone(),
            name: photo.name.clone(),
            participant_name: photo.participant_name.clone(),
            vote_count: photo.vote_count,
            share: share_of(photo.vote_count, total_votes),
            winner_position: photo.winner_position,
        });
    }

    Standings {
        total_votes,
        entries,
    }
}

fn compare_positions(a: Option<u8>, b: Option<u8>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn share_of(votes: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 * 1000.0 / total as f64).round() / 10.0
}

impl Standings {
    /// Plain-text table of the standings, one photo per line.
    pub fn summary(&self) -> String {
        if self.total_votes == 0 {
            return "No votes were cast in this contest.".to_string();
        }

        let mut summary = String::new();
        for entry in &self.entries {
            let medal = match entry.winner_position {
                Some(position) => format!(" [#{}]", position),
                None => String::new(),
            };
            summary.push_str(&format!(
                "{}. {}{}: {} votes ({}%)\n",
                entry.rank, entry.name, medal, entry.vote_count, entry.share
            ));
        }
        summary.push_str(&format!("\n{} votes cast.", self.total_votes));
        summary
    }
}
