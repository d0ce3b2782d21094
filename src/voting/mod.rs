//! Read-only projections over ballots and tallies.

pub mod analytics;
pub mod standings;

pub use analytics::VotingAnalytics;
pub use standings::{Standing, Standings};
