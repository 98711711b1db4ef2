//! Core data structures shared by the repository and service crates.

pub mod index_descriptor;
pub mod page;
pub mod search_hit;
pub mod search_query;
