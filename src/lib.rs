pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod tasks;
pub mod voting;

pub use config::Config;
pub use db::Database;
pub use engine::VotingEngine;
pub use error::{VoteError, VoteResult};
