pub mod api_connection;
pub mod cli;
pub mod config;
pub mod diff;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod notifier;
pub mod prompt;
pub mod recipe;
pub mod recipe_parser;
pub mod revision;
pub mod service;
pub mod store;
pub mod streaming;
