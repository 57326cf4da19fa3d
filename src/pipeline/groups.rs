//! Group summaries over the superhost-by-room-category grid.

use serde::Serialize;

use super::listing::{GroupKey, Listing, RoomCategory};
use crate::stats::{mean, quantile, std_dev, std_error};

/// Group cells below this count get their premium flagged as inadequate.
pub const ADEQUATE_SAMPLE: usize = 30;

/// Descriptive statistics for one superhost-by-room cell.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub key: GroupKey,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// `None` below two observations, where dispersion is undefined
    pub sd: Option<f64>,
    pub se: Option<f64>,
    pub q1: f64,
    pub q3: f64,
    pub adequate_sample: bool,
}

/// Superhost premium within one room category, in level and percent terms.
#[derive(Debug, Clone, Serialize)]
pub struct PremiumSummary {
    pub room: RoomCategory,
    pub superhost_mean: f64,
    pub regular_mean: f64,
    pub superhost_n: usize,
    pub regular_n: usize,
    /// Mean difference, superhost minus regular
    pub premium_abs: f64,
    /// Premium as a share of the regular mean; `None` when that mean is zero
    pub premium_pct: Option<f64>,
    pub premium_ratio: Option<f64>,
    pub adequate_sample: bool,
}

/// Prices for one cell of the grid, already filtered.
pub fn cell_prices(listings: &[Listing], key: GroupKey) -> Vec<f64> {
    listings.iter().filter(|l| l.group() == key).map(|l| l.price).collect()
}

fn summarize_cell(key: GroupKey, prices: &[f64]) -> GroupSummary {
    GroupSummary {
        key,
        count: prices.len(),
        mean: mean(prices).unwrap_or(f64::NAN),
        median: quantile(prices, 0.5),
        sd: std_dev(prices),
        se: std_error(prices),
        q1: quantile(prices, 0.25),
        q3: quantile(prices, 0.75),
        adequate_sample: prices.len() >= ADEQUATE_SAMPLE,
    }
}

/// Summarize all four cells of the grid, in `GroupKey::ALL` order.
pub fn summarize_groups(listings: &[Listing]) -> Vec<GroupSummary> {
    GroupKey::ALL
        .iter()
        .map(|&key| summarize_cell(key, &cell_prices(listings, key)))
        .collect()
}

/// Superhost premium per room category from the cell means.
pub fn category_premiums(listings: &[Listing]) -> Vec<PremiumSummary> {
    RoomCategory::ALL
        .iter()
        .map(|&room| {
            let sup = cell_prices(listings, GroupKey { superhost: true, room });
            let reg = cell_prices(listings, GroupKey { superhost: false, room });
            let superhost_mean = mean(&sup).unwrap_or(f64::NAN);
            let regular_mean = mean(&reg).unwrap_or(f64::NAN);
            let premium_abs = superhost_mean - regular_mean;
            let defined = !reg.is_empty() && !sup.is_empty() && regular_mean > 0.0;
            PremiumSummary {
                room,
                superhost_mean,
                regular_mean,
                superhost_n: sup.len(),
                regular_n: reg.len(),
                premium_abs,
                premium_pct: defined.then(|| 100.0 * premium_abs / regular_mean),
                premium_ratio: defined.then(|| superhost_mean / regular_mean),
                adequate_sample: sup.len() >= ADEQUATE_SAMPLE && reg.len() >= ADEQUATE_SAMPLE,
            }
        })
        .collect()
}

/// Percentage-point gap between the private-room and entire-place premiums.
///
/// `None` when either category premium is undefined.
pub fn premium_gap_pp(premiums: &[PremiumSummary]) -> Option<f64> {
    let private = premiums
        .iter()
        .find(|p| p.room == RoomCategory::PrivateRoom)
        .and_then(|p| p.premium_pct)?;
    let entire = premiums
        .iter()
        .find(|p| p.room == RoomCategory::EntirePlace)
        .and_then(|p| p.premium_pct)?;
    Some(private - entire)
}
