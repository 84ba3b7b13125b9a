// Library exports for Scribe
// This allows integration tests and external code to use Scribe modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod markdown;
pub mod posts;
pub mod routes;
pub mod state;
