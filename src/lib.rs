pub mod api;
pub mod config;
pub mod counter;
pub mod enrichment;
pub mod models;
pub mod publisher;
pub mod visit;
