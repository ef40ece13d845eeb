pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod init;
pub mod llm;
pub mod models;
pub mod ratelimit;
pub mod relay;
pub mod repository;
pub mod services;
pub mod utils;

pub use error::ManuscryptError;
