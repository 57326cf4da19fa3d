//! Pipeline module - orchestrates the analysis stages

pub mod bootstrap;
pub mod clean;
pub mod design;
pub mod groups;
pub mod hypothesis;
pub mod listing;
pub mod loader;
pub mod quantile;
pub mod segments;
pub mod validate;

pub use bootstrap::*;
pub use clean::*;
pub use design::*;
pub use groups::*;
pub use hypothesis::*;
pub use listing::*;
pub use loader::*;
pub use quantile::*;
pub use segments::*;
pub use validate::*;
