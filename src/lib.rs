pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod library;
pub mod model;
pub mod navigator;
pub mod player;
pub mod policy;
pub mod ui;
