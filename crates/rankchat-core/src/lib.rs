//! Core RankChat library (parsing, export, sessions, config, providers).

pub mod config;
pub mod export;
pub mod message;
pub mod parse;
pub mod providers;
pub mod session;
pub mod stats;
pub mod store;
