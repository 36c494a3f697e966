pub mod claims;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod service;
pub mod speech;
pub mod store;
