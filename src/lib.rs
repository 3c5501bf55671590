pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod stream;
pub mod view;
pub mod watch;
