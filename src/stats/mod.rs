//! Statistical primitives shared by the pipeline engines.

pub mod describe;
pub mod error;
pub mod linear;
pub mod normality;
pub mod ttest;

pub use describe::*;
pub use error::{StatsError, StatsResult};
pub use linear::{fit_ols, solve_wls, LinearFit};
pub use normality::{
    jarque_bera, levene_test, normality_test, shapiro_wilk, LeveneTest, NormalityMethod,
    NormalityTest,
};
pub use ttest::{welch_t_test, EffectSize, WelchTest};
