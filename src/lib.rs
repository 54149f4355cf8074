//! Tracks AIS vessels along a canal and describes their progress towards the
//! opening bridges.

pub mod bridges;
pub mod cleanup;
pub mod config;
pub mod errors;
pub mod eta;
pub mod geo;
pub mod ingest;
pub mod models;
pub mod monitor;
pub mod mqtt;
pub mod proximity;
pub mod target;
pub mod text;
pub mod tracker;
pub mod vessel;
