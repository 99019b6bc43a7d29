pub mod backoff;
pub mod config;
pub mod engine;
pub mod live;
pub mod model;
pub mod projector;
pub mod snapshot;
pub mod store;
pub mod ui;
pub mod views;
