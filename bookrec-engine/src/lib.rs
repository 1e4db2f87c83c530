pub mod affinity;
pub mod config;
pub mod error;
pub mod library;
pub mod pairs;
pub mod persistence;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod types;
