pub mod api_client;
pub mod app;
pub mod catalog;
pub mod config_cache;
pub mod connection;
pub mod database;
pub mod datetime;
pub mod favorites;
pub mod form;
pub mod queue;
pub mod settings;
pub mod utils;
