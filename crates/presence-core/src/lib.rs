pub mod config;
pub mod cover_art;
pub mod error;
pub mod orchestrator;
pub mod presence;
pub mod sink;
