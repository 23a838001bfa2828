pub mod config;
pub mod errors;
pub mod mcp;
pub mod query;
pub mod repository;
