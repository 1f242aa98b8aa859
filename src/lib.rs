// Library exports for Murmur
// This allows integration tests and external code to use Murmur modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod forms;
pub mod response;
pub mod routes;
pub mod state;
pub mod storage;
