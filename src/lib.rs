//! # Player Sync
//!
//! Reconciles player identity and stats between a local record store and a
//! remote ranked stats service.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (players, ratings, character aggregates)
//! - **remote**: Stats service client, token refresh and region probing
//! - **storage**: Record store trait with in-memory and JSONL backends
//! - **sync**: Identity resolution, ghost merge, freshness and history appends
//! - **jobs**: Leaderboard repopulation
//! - **config**: Configuration loading and validation

pub mod config;
pub mod jobs;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;

pub use models::*;
