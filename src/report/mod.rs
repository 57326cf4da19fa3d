//! Report module - result tables, run manifest, and the console summary

pub mod manifest;
pub mod summary;
pub mod tables;

pub use manifest::*;
pub use summary::*;
pub use tables::*;
