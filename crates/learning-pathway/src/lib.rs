pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod loading;
pub mod markdown;
pub mod migrate;
pub mod model;
pub mod notify;
pub mod progress;
pub mod search;
pub mod store;
