//! Iterative outlier elimination for wafer thickness maps.
//!
//! A measurement campaign loads a (x, y, thickness) dataset, and the
//! [`optimize::controller::RoundController`] repeatedly trims it: detector
//! flagged outliers first, lowest values once detection runs dry, until the
//! uniformity target is met or a retention floor stops the reduction. Each
//! round emits a deterministically named artifact for the owning simulation
//! to re-run against.

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod optimize;
pub mod report;
pub mod stats;
