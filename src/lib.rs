pub mod config;
pub mod dashboard;
pub mod diagnostics;
pub mod live;
pub mod repository;
pub mod snapshot;
pub mod telemetry;
pub mod view;
pub mod web;
