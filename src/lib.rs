pub mod app;
pub mod chart;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod form;
pub mod state;
pub mod store;
pub mod ui;
