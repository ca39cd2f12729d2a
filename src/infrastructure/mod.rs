pub mod auth_client;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod geocoding_client;
pub mod logging;
pub mod memory_backend;
pub mod rest_client;
