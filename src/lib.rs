pub mod assistant;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod llm;
pub mod server;
pub mod telemetry;
pub mod template;
pub mod tools;
