mod app;
mod commands;
mod config;
mod effects;
mod logging;
mod timers;
mod view;

pub use app::run_app;
