// Library root. Modules are public so integration tests can drive them.

pub mod action;
pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod player;
pub mod playlist;
