//! The voting engine: lifecycle state machine, admin gating and the atomic
//! mutations over the settings store, ballot ledger and photo tallies.
//!
//! Every mutation runs in a single transaction that starts with a write, so
//! the database write lock is held from the precondition checks through to
//! the commit. Concurrent engine mutations are therefore serialized and each
//! one either applies completely or not at all.

use crate::db::{ballots, photos, settings, Database};
use crate::error::{VoteError, VoteResult};
use crate::models::{
    validate_winner_ids, Actor, Ballot, Photo, Role, SettingsUpdate, StartOptions, VotingSettings,
    MAX_VOTES_PER_USER,
};
use crate::voting::analytics::{self, VotingAnalytics};
use crate::voting::standings::{self, Standings};
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// What a reset removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetSummary {
    pub ballots_removed: u64,
    pub photos_reset: u64,
}

/// Settings and photos read from one snapshot, so a publication check and the
/// results it guards cannot disagree.
#[derive(Debug, Clone)]
pub struct ResultsSnapshot {
    pub settings: VotingSettings,
    pub photos: Vec<Photo>,
}

impl ResultsSnapshot {
    /// Winning photos, first place first.
    pub fn winners(&self) -> Vec<Photo> {
        let mut winners: Vec<Photo> = self.photos.iter().filter(|photo| photo.is_winner).cloned().collect();
        winners.sort_by_key(|photo| photo.winner_position);
        winners
    }

    pub fn standings(&self) -> Standings {
        standings::rank(&self.photos)
    }
}

pub struct VotingEngine {
    db: Arc<Database>,
    admin_emails: Vec<String>,
}

impl VotingEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            admin_emails: Vec::new(),
        }
    }

    /// Grants the admin capability to these emails regardless of role.
    pub fn with_admin_emails(mut self, emails: Vec<String>) -> Self {
        self.admin_emails = emails.into_iter().map(|e| e.to_ascii_lowercase()).collect();
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn is_admin(&self, actor: &Actor) -> bool {
        actor.role == Role::Admin
            || self
                .admin_emails
                .iter()
                .any(|email| email.eq_ignore_ascii_case(&actor.email))
    }

    fn require_admin(&self, actor: &Actor, action: &'static str) -> VoteResult<()> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            warn!("User {} ({}) tried to {} without admin rights", actor.user_id, actor.role, action);
            Err(VoteError::Forbidden(action))
        }
    }

    /// Current settings, creating the default record on first access.
    pub async fn get_settings(&self) -> VoteResult<VotingSettings> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(settings::get_or_init(&mut conn).await?)
    }

    /// Opens a new voting session. Allowed from any state; previous winners are cleared.
    pub async fn start(&self, actor: &Actor, options: StartOptions) -> VoteResult<VotingSettings> {
        self.require_admin(actor, "start voting")?;
        let (start_time, end_time) = options.window(Utc::now()).map_err(VoteError::InvalidSettings)?;
        let started = VotingSettings {
            is_active: true,
            start_time: Some(start_time),
            end_time,
            winners: Vec::new(),
            results_published: false,
            max_votes_per_user: MAX_VOTES_PER_USER,
        };

        let mut tx = self.db.begin().await?;
        settings::ensure_row(&mut tx).await?;
        photos::clear_winners(&mut tx).await?;
        settings::save(&mut tx, &started).await?;
        tx.commit().await?;

        info!(
            "Voting started by {}: window {} .. {}",
            actor.email,
            start_time.to_rfc3339(),
            end_time.map(|end| end.to_rfc3339()).unwrap_or_else(|| "open".to_string())
        );
        Ok(started)
    }

    /// Closes the session. A no-op when voting is already inactive.
    pub async fn stop(&self, actor: &Actor) -> VoteResult<VotingSettings> {
        self.require_admin(actor, "stop voting")?;

        let mut tx = self.db.begin().await?;
        let mut current = settings::get_or_init(&mut tx).await?;
        if !current.is_active {
            debug!("Stop requested by {} but voting is not active", actor.email);
            return Ok(current);
        }

        current.is_active = false;
        current.end_time = Some(Utc::now());
        settings::save(&mut tx, &current).await?;
        tx.commit().await?;

        info!("Voting stopped by {}", actor.email);
        Ok(current)
    }

    /// Merges `update` into the settings and rejects results that break an invariant.
    pub async fn update_settings(&self, actor: &Actor, update: SettingsUpdate) -> VoteResult<VotingSettings> {
        self.require_admin(actor, "modify voting settings")?;

        let mut tx = self.db.begin().await?;
        let mut current = settings::get_or_init(&mut tx).await?;
        if update.is_empty() {
            return Ok(current);
        }

        update.apply_to(&mut current);
        current.validate().map_err(VoteError::InvalidSettings)?;
        settings::save(&mut tx, &current).await?;
        tx.commit().await?;

        info!("Voting settings updated by {}: {:?}", actor.email, update);
        Ok(current)
    }

    /// Casts `voter`'s single ballot for `photo_id` and counts it.
    pub async fn vote(&self, voter: &Actor, photo_id: &str) -> VoteResult<Ballot> {
        retry_once("vote", move || self.try_vote(voter, photo_id)).await
    }

    async fn try_vote(&self, voter: &Actor, photo_id: &str) -> VoteResult<Ballot> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let current = settings::get_or_init(&mut tx).await?;
        if !current.accepts_votes_at(now) {
            debug!("Rejected vote from {}: voting is not active", voter.user_id);
            return Err(VoteError::VotingNotActive);
        }
        if !photos::exists(&mut tx, photo_id).await? {
            return Err(VoteError::PhotoNotFound(photo_id.to_string()));
        }

        let ballot = Ballot::new(voter, photo_id, now);
        if !ballots::insert_if_absent(&mut tx, &ballot).await? {
            debug!("Rejected vote from {}: already voted", voter.user_id);
            return Err(VoteError::AlreadyVoted);
        }
        photos::increment_vote_count(&mut tx, photo_id).await?;
        tx.commit().await?;

        info!("Recorded vote: user_id={}, photo_id={}", voter.user_id, photo_id);
        Ok(ballot)
    }

    pub async fn get_user_vote(&self, user_id: &str) -> VoteResult<Option<Ballot>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(ballots::find_by_user(&mut conn, user_id).await?)
    }

    /// Replaces any previous declaration with `winner_ids` (first place first)
    /// and publishes the results.
    ///
    /// Voting must be stopped first: an active session fails with
    /// `VotingStillActive`, since a running session never carries winners.
    pub async fn declare_winners(&self, actor: &Actor, winner_ids: &[String]) -> VoteResult<Vec<Photo>> {
        self.require_admin(actor, "declare winners")?;
        validate_winner_ids(winner_ids).map_err(VoteError::InvalidWinnerCount)?;

        let winners = retry_once("declare winners", move || self.try_declare_winners(winner_ids)).await?;
        info!("Winners declared by {}: {:?}", actor.email, winner_ids);
        Ok(winners)
    }

    async fn try_declare_winners(&self, winner_ids: &[String]) -> VoteResult<Vec<Photo>> {
        let mut tx = self.db.begin().await?;

        let mut current = settings::get_or_init(&mut tx).await?;
        if current.is_active {
            return Err(VoteError::VotingStillActive);
        }

        photos::clear_winners(&mut tx).await?;
        for (index, photo_id) in winner_ids.iter().enumerate() {
            let position = (index + 1) as u8;
            if !photos::mark_winner(&mut tx, photo_id, position).await? {
                return Err(VoteError::PhotoNotFound(photo_id.clone()));
            }
        }

        current.winners = winner_ids.to_vec();
        current.results_published = true;
        settings::save(&mut tx, &current).await?;

        let winners = photos::list_winners(&mut tx).await?;
        tx.commit().await?;
        Ok(winners)
    }

    /// Photos marked as winners, first place first. Empty when none are declared.
    pub async fn get_winners(&self) -> VoteResult<Vec<Photo>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(photos::list_winners(&mut conn).await?)
    }

    /// Starts a fresh contest cycle: default settings, no ballots, zeroed tallies.
    pub async fn reset_voting(&self, actor: &Actor) -> VoteResult<ResetSummary> {
        self.require_admin(actor, "reset voting")?;

        let summary = retry_once("reset voting", move || self.try_reset()).await?;
        info!(
            "Voting reset by {}: {} ballot(s) removed, {} photo(s) reset",
            actor.email, summary.ballots_removed, summary.photos_reset
        );
        Ok(summary)
    }

    async fn try_reset(&self) -> VoteResult<ResetSummary> {
        let mut tx = self.db.begin().await?;
        settings::ensure_row(&mut tx).await?;
        let ballots_removed = ballots::delete_all(&mut tx).await?;
        let photos_reset = photos::reset_tallies(&mut tx).await?;
        settings::save(&mut tx, &VotingSettings::default()).await?;
        tx.commit().await?;

        Ok(ResetSummary {
            ballots_removed,
            photos_reset,
        })
    }

    /// Admin view over ballots, tallies and settings, read from one snapshot.
    pub async fn get_analytics(&self, actor: &Actor) -> VoteResult<VotingAnalytics> {
        self.require_admin(actor, "view analytics")?;
        Ok(analytics::load(&self.db).await?)
    }

    /// Settings and every photo, read inside one transaction.
    pub async fn get_results_snapshot(&self) -> VoteResult<ResultsSnapshot> {
        let mut tx = self.db.begin().await?;
        let settings = settings::fetch(&mut tx).await?.unwrap_or_default();
        let photos = photos::list_all(&mut tx).await?;
        tx.commit().await?;
        Ok(ResultsSnapshot { settings, photos })
    }

    /// All photos ranked by votes.
    pub async fn get_standings(&self) -> VoteResult<Standings> {
        Ok(self.get_results_snapshot().await?.standings())
    }
}

/// Runs `attempt`, and runs it once more if it failed on storage.
async fn retry_once<T, F, Fut>(operation: &str, mut attempt: F) -> VoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = VoteResult<T>>,
{
    match attempt().await {
        Err(e) if e.is_transient() => {
            warn!("{} failed ({}), retrying once", operation, e);
            attempt().await
        }
        result => result,
    }
}
