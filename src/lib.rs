pub mod background;
pub mod config;
pub mod error;
pub mod models;
pub mod rewrite;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod xml;
