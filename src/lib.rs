pub mod config;
pub mod error;
pub mod impact;
pub mod market;
pub mod matcher;
pub mod mentions;
pub mod timeline;
pub mod types;
