//! Error types for the statistical core.
//!
//! Pipeline stages use `anyhow` at their boundaries; the numeric routines in
//! this module report failures through `StatsError` so callers can tell an
//! insufficient-sample condition (tagged and tolerated) apart from a fatal
//! data-quality problem (aborts the stage).

use thiserror::Error;

/// Errors produced by the statistical routines.
#[derive(Debug, Error)]
pub enum StatsError {
    /// A test was requested on a sample too small to compute it.
    ///
    /// Carried as a tagged "not computed" result by downstream stages rather
    /// than aborting the pipeline.
    #[error("insufficient sample for {test}: need at least {required} observations, got {actual}")]
    InsufficientSample {
        /// Name of the statistic or test that was requested
        test: &'static str,
        /// Minimum observations required
        required: usize,
        /// Observations actually available
        actual: usize,
    },

    /// The regression design matrix is rank-deficient.
    ///
    /// Raised when the normal equations have no Cholesky factorization,
    /// e.g. a dummy column with zero variance. Fatal for the stage; the
    /// solver never returns garbage coefficients.
    #[error("singular design matrix: {0}")]
    SingularDesign(String),

    /// An input sample contained NaN or infinite values.
    #[error("non-finite value in {context}")]
    NonFinite {
        /// Where the non-finite value was encountered
        context: &'static str,
    },

    /// A configuration value outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Convenience alias used throughout the `stats` module.
pub type StatsResult<T> = Result<T, StatsError>;
