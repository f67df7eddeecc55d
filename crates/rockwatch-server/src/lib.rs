pub mod api;
pub mod app;
pub mod config;
pub mod facility;
pub mod logging;
pub mod middleware;
pub mod monitor;
pub mod predictor;
pub mod state;
