pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod intro;
pub mod ui;
pub mod utils;
