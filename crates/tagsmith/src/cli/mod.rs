//! Command handlers.

pub mod config;
pub mod predict;
pub mod review;
pub mod tags;
