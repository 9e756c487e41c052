//! Prediction server: JSON API, HTML form and Prometheus exporter

pub mod api;
pub mod config;
pub mod ui;
