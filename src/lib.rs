//! Hostprem: Superhost Price Premium Analysis
//!
//! A library for quantifying how the superhost price premium differs
//! between private rooms and entire places, with bootstrap uncertainty,
//! quantile regression, segment analysis, and hold-out validation.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod utils;
