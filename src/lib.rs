pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod export;
pub mod forecast;
pub mod generate;
pub mod models;
pub mod numeric;
pub mod queries;
pub mod repair;
pub mod rules;
pub mod snapshot;
pub mod window;
