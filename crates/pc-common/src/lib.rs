pub mod api;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod earnings;
pub mod error;
pub mod progress;
pub mod rate_request;
pub mod settings;
pub mod tiers;
pub mod types;
