//! Stratified bootstrap for premium uncertainty.
//!
//! Resampling is stratified by the four superhost-by-room cells so every
//! replicate preserves the observed group sizes. Replicates run on the rayon
//! pool; each iteration derives its own generator from the run seed, so the
//! replicate stream is identical regardless of how the pool schedules work.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use super::groups::cell_prices;
use super::listing::{GroupKey, Listing, RoomCategory};
use crate::stats::{mean, quantile, std_dev};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BootstrapConfig {
    pub iterations: usize,
    pub seed: u64,
    pub conf_level: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { iterations: 1000, seed: 42, conf_level: 0.95 }
    }
}

/// Percentile-interval summary of one bootstrapped statistic.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapSummary {
    pub statistic: String,
    pub observed: f64,
    pub boot_mean: f64,
    pub se: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Two-sided sign-based p-value for the statistic differing from zero
    pub p_value: f64,
    pub iterations: usize,
    pub seed: u64,
}

/// Prices for the four grid cells, failing when any cell is empty.
fn strata(listings: &[Listing]) -> Result<[Vec<f64>; 4]> {
    let cells: Vec<Vec<f64>> =
        GroupKey::ALL.iter().map(|&key| cell_prices(listings, key)).collect();
    for (key, prices) in GroupKey::ALL.iter().zip(&cells) {
        if prices.is_empty() {
            bail!(
                "Cannot bootstrap: the {} / {} cell has no listings",
                key.host_label(),
                key.room.label()
            );
        }
    }
    let mut iter = cells.into_iter();
    Ok(std::array::from_fn(|_| iter.next().unwrap_or_default()))
}

fn resample(prices: &[f64], rng: &mut StdRng) -> Vec<f64> {
    (0..prices.len()).map(|_| prices[rng.gen_range(0..prices.len())]).collect()
}

fn premium_pct(sup: &[f64], reg: &[f64]) -> f64 {
    match (mean(sup), mean(reg)) {
        (Some(s), Some(r)) if r > 0.0 => 100.0 * (s - r) / r,
        _ => f64::NAN,
    }
}

/// Premium gap in percentage points from one set of cell samples.
///
/// Cell order follows `GroupKey::ALL`: regular/entire, superhost/entire,
/// regular/private, superhost/private.
fn gap_statistic(cells: &[Vec<f64>; 4]) -> f64 {
    let entire = premium_pct(&cells[1], &cells[0]);
    let private = premium_pct(&cells[3], &cells[2]);
    private - entire
}

fn summarize(
    statistic: &str,
    observed: f64,
    replicates: &[f64],
    config: &BootstrapConfig,
) -> BootstrapSummary {
    let alpha = 1.0 - config.conf_level;
    let n = replicates.len() as f64;
    let above = replicates.iter().filter(|v| **v >= 0.0).count() as f64 / n;
    let below = replicates.iter().filter(|v| **v <= 0.0).count() as f64 / n;
    BootstrapSummary {
        statistic: statistic.to_string(),
        observed,
        boot_mean: mean(replicates).unwrap_or(f64::NAN),
        se: std_dev(replicates).unwrap_or(0.0),
        ci_lower: quantile(replicates, alpha / 2.0),
        ci_upper: quantile(replicates, 1.0 - alpha / 2.0),
        p_value: (2.0 * above.min(below)).min(1.0),
        iterations: config.iterations,
        seed: config.seed,
    }
}

fn run<F>(cells: &[Vec<f64>; 4], config: &BootstrapConfig, statistic: F) -> Vec<f64>
where
    F: Fn(&[Vec<f64>; 4]) -> f64 + Sync,
{
    (0..config.iterations)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(i as u64));
            let sampled: [Vec<f64>; 4] =
                std::array::from_fn(|c| resample(&cells[c], &mut rng));
            statistic(&sampled)
        })
        .collect()
}

/// Bootstrap the private-minus-entire premium gap.
pub fn bootstrap_premium_gap(
    listings: &[Listing],
    config: &BootstrapConfig,
) -> Result<BootstrapSummary> {
    if config.iterations == 0 {
        bail!("Bootstrap requires at least one iteration");
    }
    let cells = strata(listings)?;
    let observed = gap_statistic(&cells);
    let replicates = run(&cells, config, gap_statistic);
    Ok(summarize("premium_gap_pp", observed, &replicates, config))
}

/// Bootstrap the percent premium within each room category.
pub fn bootstrap_category_premiums(
    listings: &[Listing],
    config: &BootstrapConfig,
) -> Result<Vec<BootstrapSummary>> {
    if config.iterations == 0 {
        bail!("Bootstrap requires at least one iteration");
    }
    let cells = strata(listings)?;
    let mut out = Vec::with_capacity(RoomCategory::ALL.len());
    for (name, sup_idx, reg_idx) in
        [("premium_pct_entire_place", 1usize, 0usize), ("premium_pct_private_room", 3, 2)]
    {
        let observed = premium_pct(&cells[sup_idx], &cells[reg_idx]);
        let replicates = run(&cells, config, |sampled| {
            premium_pct(&sampled[sup_idx], &sampled[reg_idx])
        });
        out.push(summarize(name, observed, &replicates, config));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::listing::PriceBand;

    fn listing(price: f64, room: RoomCategory, superhost: bool) -> Listing {
        Listing {
            id: 0,
            price,
            room,
            superhost,
            reviews: 10,
            availability_365: 180,
            accommodates: 2,
            neighbourhood: "Mitte".to_string(),
            rating: Some(4.5),
            price_band: PriceBand::Moderate,
        }
    }

    fn scenario() -> Vec<Listing> {
        let mut out = Vec::new();
        for i in 0..40 {
            let jitter = (i % 5) as f64;
            out.push(listing(140.0 + 2.0 * jitter, RoomCategory::EntirePlace, false));
            out.push(listing(164.0 + 2.0 * jitter, RoomCategory::EntirePlace, true));
            out.push(listing(93.0 + jitter, RoomCategory::PrivateRoom, false));
            out.push(listing(72.0 + jitter, RoomCategory::PrivateRoom, true));
        }
        out
    }

    #[test]
    fn same_seed_reproduces_the_replicate_stream() {
        let listings = scenario();
        let config = BootstrapConfig { iterations: 200, seed: 7, conf_level: 0.95 };
        let a = bootstrap_premium_gap(&listings, &config).unwrap();
        let b = bootstrap_premium_gap(&listings, &config).unwrap();
        assert_eq!(a.observed, b.observed);
        assert_eq!(a.boot_mean, b.boot_mean);
        assert_eq!(a.ci_lower, b.ci_lower);
        assert_eq!(a.ci_upper, b.ci_upper);
        assert_eq!(a.p_value, b.p_value);
    }

    #[test]
    fn different_seeds_perturb_the_interval() {
        let listings = scenario();
        let a = bootstrap_premium_gap(
            &listings,
            &BootstrapConfig { iterations: 200, seed: 7, conf_level: 0.95 },
        )
        .unwrap();
        let b = bootstrap_premium_gap(
            &listings,
            &BootstrapConfig { iterations: 200, seed: 8, conf_level: 0.95 },
        )
        .unwrap();
        assert_eq!(a.observed, b.observed);
        assert_ne!(a.boot_mean, b.boot_mean);
    }

    #[test]
    fn clear_gap_yields_interval_away_from_zero() {
        let listings = scenario();
        let summary =
            bootstrap_premium_gap(&listings, &BootstrapConfig::default()).unwrap();
        // entire premium about +17%, private premium about -22%
        assert!(summary.observed < -30.0);
        assert!(summary.ci_upper < 0.0);
        assert!(summary.p_value < 0.05);
        assert!(summary.ci_lower <= summary.boot_mean && summary.boot_mean <= summary.ci_upper);
    }

    #[test]
    fn category_premiums_have_opposite_signs() {
        let listings = scenario();
        let summaries = bootstrap_category_premiums(
            &listings,
            &BootstrapConfig { iterations: 300, seed: 42, conf_level: 0.95 },
        )
        .unwrap();
        assert_eq!(summaries.len(), 2);
        let entire =
            summaries.iter().find(|s| s.statistic == "premium_pct_entire_place").unwrap();
        let private =
            summaries.iter().find(|s| s.statistic == "premium_pct_private_room").unwrap();
        assert!(entire.observed > 0.0 && entire.ci_lower > 0.0);
        assert!(private.observed < 0.0 && private.ci_upper < 0.0);
    }

    #[test]
    fn empty_cell_is_a_fatal_error() {
        let mut listings = scenario();
        listings.retain(|l| !(l.superhost && l.room == RoomCategory::PrivateRoom));
        let err =
            bootstrap_premium_gap(&listings, &BootstrapConfig::default()).unwrap_err();
        assert!(err.to_string().contains("has no listings"));
    }
}
