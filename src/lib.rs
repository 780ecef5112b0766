pub mod api;
pub mod config;
pub mod error;
pub mod notify;
pub mod outline;
pub mod progress;
pub mod service;
pub mod store;
pub mod student;
pub mod utils;
