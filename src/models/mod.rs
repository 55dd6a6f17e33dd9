//! Core data models for player sync.

mod character;
mod history;
mod ids;
mod player;
mod rank;
mod rating;
mod region;
mod roster;

pub use character::*;
pub use history::*;
pub use ids::*;
pub use player::*;
pub use rank::*;
pub use rating::*;
pub use region::*;
pub use roster::*;
