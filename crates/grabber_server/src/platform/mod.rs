pub mod app;
pub mod config;
pub mod effects;
pub mod http;
pub mod logging;
