//! HTTP front end for the insurance charge predictor

pub mod api;
pub mod config;
