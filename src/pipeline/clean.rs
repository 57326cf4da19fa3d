//! Listing cleaning and validation.
//!
//! Turns a raw scraped listings table into the typed dataset the engines
//! consume. The two outlier policies from the source analyses are kept as a
//! tagged mode rather than parallel code paths: `Strict` applies the
//! 3-standard-deviation rule used by the headline hypothesis tests, while
//! `Relaxed` keeps the heavy price tail (up to a hard ceiling) the way the
//! quantile-regression stage wants it.

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use serde::Serialize;

use super::listing::{Listing, PriceBand, RoomCategory};
use crate::stats::quantile;

/// Outlier policy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleaningMode {
    /// 3-sigma price bound above a hard floor.
    Strict,
    /// Hard floor and ceiling only; retains the heavy tail.
    Relaxed,
}

impl CleaningMode {
    pub fn label(&self) -> &'static str {
        match self {
            CleaningMode::Strict => "strict",
            CleaningMode::Relaxed => "relaxed",
        }
    }
}

/// Cleaning configuration.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningConfig {
    pub mode: CleaningMode,
    /// Minimum admissible nightly price; excludes degenerate near-zero rows
    pub price_floor: f64,
    /// Sigma multiplier for the strict outlier bound
    pub sigma: f64,
    /// Hard ceiling applied in relaxed mode
    pub relaxed_ceiling: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            mode: CleaningMode::Strict,
            price_floor: 10.0,
            sigma: 3.0,
            relaxed_ceiling: 10_000.0,
        }
    }
}

/// Row counts and bounds from one cleaning run.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub mode: CleaningMode,
    pub rows_in: usize,
    /// Rows with a null superhost flag or room type
    pub dropped_missing: usize,
    /// Rows whose price string failed to parse or was non-positive
    pub dropped_unparsable_price: usize,
    /// Rows with a room type outside the two canonical categories
    pub dropped_room_type: usize,
    /// Rows below the price floor
    pub dropped_below_floor: usize,
    /// Rows removed by the outlier bound
    pub dropped_outlier: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub rows_out: usize,
}

/// Parse a currency-formatted price string to a strictly positive float.
///
/// Strips the currency symbol and thousands separators; `None` when the
/// result is non-finite or non-positive.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

struct RawRow {
    id: i64,
    price: f64,
    room: RoomCategory,
    superhost: bool,
    reviews: u32,
    availability_365: i64,
    accommodates: i64,
    neighbourhood: String,
    rating: Option<f64>,
}

fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let col = df
        .column(name)
        .with_context(|| format!("Required column '{name}' not found in raw listings"))?;
    let cast = col
        .cast(&DataType::String)
        .with_context(|| format!("Column '{name}' cannot be read as text"))?;
    Ok(cast.str()?.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}

fn column_as_i64(df: &DataFrame, name: &str, default: i64) -> Vec<i64> {
    match df.column(name).and_then(|c| c.cast(&DataType::Int64)) {
        Ok(cast) => match cast.i64() {
            Ok(ca) => ca.into_iter().map(|v| v.unwrap_or(default)).collect(),
            Err(_) => vec![default; df.height()],
        },
        Err(_) => vec![default; df.height()],
    }
}

fn column_as_f64_opt(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    match df.column(name).and_then(|c| c.cast(&DataType::Float64)) {
        Ok(cast) => match cast.f64() {
            Ok(ca) => ca.into_iter().collect(),
            Err(_) => vec![None; df.height()],
        },
        Err(_) => vec![None; df.height()],
    }
}

/// Prices may arrive currency-formatted ("$1,250.00") or already numeric.
fn extract_prices(df: &DataFrame) -> Result<Vec<Option<f64>>> {
    let col = df.column("price").context("Required column 'price' not found in raw listings")?;
    if col.dtype() == &DataType::String {
        Ok(col.str()?.into_iter().map(|v| v.and_then(parse_price)).collect())
    } else {
        let cast = col.cast(&DataType::Float64).context("Column 'price' is not numeric")?;
        Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|p| p.is_finite() && *p > 0.0))
            .collect())
    }
}

/// Superhost flags arrive as "t"/"f" strings in scraped exports or as a
/// proper boolean column in re-saved Parquet files.
fn extract_superhost(df: &DataFrame) -> Result<Vec<Option<bool>>> {
    let col = df
        .column("host_is_superhost")
        .context("Required column 'host_is_superhost' not found in raw listings")?;
    match col.dtype() {
        DataType::Boolean => Ok(col.bool()?.into_iter().collect()),
        _ => {
            let strings = column_as_strings(df, "host_is_superhost")?;
            Ok(strings
                .into_iter()
                .map(|v| {
                    v.and_then(|s| match s.trim() {
                        "t" | "T" | "true" | "True" => Some(true),
                        "f" | "F" | "false" | "False" => Some(false),
                        _ => None,
                    })
                })
                .collect())
        }
    }
}

/// Clean a raw listings table into the typed analysis dataset.
///
/// Fatal on structural problems (missing columns, empty result, criticals
/// still missing after cleaning); per-row quality issues are dropped and
/// counted in the report.
pub fn clean_listings(
    df: &DataFrame,
    config: &CleaningConfig,
) -> Result<(Vec<Listing>, CleaningReport)> {
    let rows_in = df.height();
    if rows_in == 0 {
        bail!("Raw listings table is empty");
    }

    let prices_raw = extract_prices(df)?;
    let price_was_null: Vec<bool> = {
        let col = df.column("price")?;
        (0..rows_in).map(|i| col.get(i).map(|v| v.is_null()).unwrap_or(true)).collect()
    };
    let room_types = column_as_strings(df, "room_type")?;
    let superhosts = extract_superhost(df)?;
    let ids = column_as_i64(df, "id", -1);
    let reviews = column_as_i64(df, "number_of_reviews", 0);
    let availability = column_as_i64(df, "availability_365", 0);
    let accommodates = column_as_i64(df, "accommodates", 1);
    let neighbourhoods = column_as_strings(df, "neighbourhood_cleansed")
        .or_else(|_| column_as_strings(df, "neighbourhood"))
        .unwrap_or_else(|_| vec![None; rows_in]);
    let ratings = column_as_f64_opt(df, "review_scores_rating");

    let mut dropped_missing = 0usize;
    let mut dropped_unparsable = 0usize;
    let mut dropped_room_type = 0usize;

    let mut rows: Vec<RawRow> = Vec::with_capacity(rows_in);
    for i in 0..rows_in {
        let (superhost, room_raw) = match (&superhosts[i], &room_types[i]) {
            (Some(s), Some(r)) => (*s, r),
            _ => {
                dropped_missing += 1;
                continue;
            }
        };
        let room = match RoomCategory::from_raw(room_raw) {
            Some(room) => room,
            None => {
                dropped_room_type += 1;
                continue;
            }
        };
        let price = match prices_raw[i] {
            Some(p) => p,
            None => {
                if price_was_null[i] {
                    dropped_missing += 1;
                } else {
                    dropped_unparsable += 1;
                }
                continue;
            }
        };
        rows.push(RawRow {
            id: if ids[i] >= 0 { ids[i] } else { i as i64 },
            price,
            room,
            superhost,
            reviews: reviews[i].max(0) as u32,
            availability_365: availability[i].clamp(0, 365),
            accommodates: accommodates[i].max(1),
            neighbourhood: neighbourhoods[i].clone().unwrap_or_else(|| "Unknown".to_string()),
            rating: ratings[i].filter(|r| r.is_finite()),
        });
    }

    if rows.is_empty() {
        bail!("No rows survived missing-value and room-type filtering");
    }

    // Floor first, then the mode-specific upper bound
    let before_floor = rows.len();
    rows.retain(|r| r.price >= config.price_floor);
    let dropped_below_floor = before_floor - rows.len();

    let (lower_bound, upper_bound) = match config.mode {
        CleaningMode::Strict => {
            let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();
            let mean = prices.iter().sum::<f64>() / prices.len() as f64;
            let sd = crate::stats::std_dev(&prices).unwrap_or(0.0);
            (config.price_floor.max(mean - config.sigma * sd), mean + config.sigma * sd)
        }
        CleaningMode::Relaxed => (config.price_floor, config.relaxed_ceiling),
    };

    let before_outlier = rows.len();
    rows.retain(|r| r.price >= lower_bound && r.price <= upper_bound);
    let dropped_outlier = before_outlier - rows.len();

    if rows.is_empty() {
        bail!(
            "Outlier bounds [{lower_bound:.2}, {upper_bound:.2}] removed every row; \
             check the cleaning configuration"
        );
    }

    // Price bands from the cleaned distribution quartiles
    let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();
    let q1 = quantile(&prices, 0.25);
    let q2 = quantile(&prices, 0.50);
    let q3 = quantile(&prices, 0.75);

    let listings: Vec<Listing> = rows
        .into_iter()
        .map(|r| {
            let price_band = if r.price <= q1 {
                PriceBand::Budget
            } else if r.price <= q2 {
                PriceBand::Moderate
            } else if r.price <= q3 {
                PriceBand::Upscale
            } else {
                PriceBand::Luxury
            };
            Listing {
                id: r.id,
                price: r.price,
                room: r.room,
                superhost: r.superhost,
                reviews: r.reviews,
                availability_365: r.availability_365,
                accommodates: r.accommodates,
                neighbourhood: r.neighbourhood,
                rating: r.rating,
                price_band,
            }
        })
        .collect();

    validate_cleaned(&listings)?;

    let report = CleaningReport {
        mode: config.mode,
        rows_in,
        dropped_missing,
        dropped_unparsable_price: dropped_unparsable,
        dropped_room_type,
        dropped_below_floor,
        dropped_outlier,
        lower_bound,
        upper_bound,
        rows_out: listings.len(),
    };

    Ok((listings, report))
}

/// Final validation: the critical fields must be complete and in-domain.
///
/// A violation here is a configuration or data defect, not a tolerable
/// per-row condition, so it aborts the stage.
pub fn validate_cleaned(listings: &[Listing]) -> Result<()> {
    for l in listings {
        if !l.price.is_finite() || l.price <= 0.0 {
            bail!("Cleaned listing {} has invalid price {}", l.id, l.price);
        }
        if l.neighbourhood.is_empty() {
            bail!("Cleaned listing {} has an empty neighbourhood", l.id);
        }
        if !(0..=365).contains(&l.availability_365) {
            bail!(
                "Cleaned listing {} has availability {} outside 0-365",
                l.id,
                l.availability_365
            );
        }
    }
    Ok(())
}

/// Materialize the cleaned dataset as a DataFrame artifact.
pub fn cleaned_frame(listings: &[Listing]) -> Result<DataFrame> {
    let df = df! {
        "id" => listings.iter().map(|l| l.id).collect::<Vec<_>>(),
        "price" => listings.iter().map(|l| l.price).collect::<Vec<_>>(),
        "room_category" => listings.iter().map(|l| l.room.label()).collect::<Vec<_>>(),
        "host_type" => listings.iter().map(|l| l.group().host_label()).collect::<Vec<_>>(),
        "reviews" => listings.iter().map(|l| l.reviews as i64).collect::<Vec<_>>(),
        "availability_365" => listings.iter().map(|l| l.availability_365).collect::<Vec<_>>(),
        "accommodates" => listings.iter().map(|l| l.accommodates).collect::<Vec<_>>(),
        "neighbourhood" => listings.iter().map(|l| l.neighbourhood.clone()).collect::<Vec<_>>(),
        "rating" => listings.iter().map(|l| l.rating).collect::<Vec<_>>(),
        "price_band" => listings.iter().map(|l| l.price_band.label()).collect::<Vec<_>>(),
    }?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_price_strips_currency_formatting() {
        assert_eq!(parse_price("$1,250.00"), Some(1250.0));
        assert_eq!(parse_price("€89.50"), Some(89.5));
        assert_eq!(parse_price(" $75 "), Some(75.0));
        assert_eq!(parse_price("120"), Some(120.0));
    }

    #[test]
    fn parse_price_rejects_degenerate_values() {
        assert_eq!(parse_price("$0.00"), None);
        assert_eq!(parse_price("-15"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("n/a"), None);
    }

    fn raw_frame() -> DataFrame {
        df! {
            "id" => [1i64, 2, 3, 4, 5, 6, 7, 8],
            "price" => [
                Some("$100.00"), Some("$80.00"), Some("$0.00"), None,
                Some("$120.00"), Some("$5.00"), Some("$90.00"), Some("$110.00"),
            ],
            "room_type" => [
                Some("Entire home/apt"), Some("Private room"), Some("Entire home/apt"),
                Some("Private room"), Some("Shared room"), Some("Entire home/apt"),
                Some("Private room"), None,
            ],
            "host_is_superhost" => [
                Some("t"), Some("f"), Some("t"), Some("f"),
                Some("t"), Some("f"), None, Some("t"),
            ],
            "number_of_reviews" => [10i64, 5, 2, 8, 1, 0, 3, 7],
            "availability_365" => [200i64, 100, 50, 365, 20, 10, 30, 40],
            "accommodates" => [4i64, 2, 3, 1, 2, 5, 2, 3],
            "neighbourhood_cleansed" => ["Mitte", "Kreuzberg", "Mitte", "Pankow",
                                         "Mitte", "Neukölln", "Mitte", "Pankow"],
            "review_scores_rating" => [Some(4.8), Some(4.5), None, Some(4.9),
                                       Some(4.2), Some(3.9), Some(4.0), Some(4.7)],
        }
        .unwrap()
    }

    #[test]
    fn clean_counts_each_drop_reason() {
        let (listings, report) = clean_listings(&raw_frame(), &CleaningConfig::default()).unwrap();
        // id=1 and id=2 survive; 3 unparsable price; 4 null price (missing);
        // 5 shared room; 6 below floor; 7 null superhost; 8 null room type
        assert_eq!(report.rows_in, 8);
        assert_eq!(report.dropped_unparsable_price, 1);
        assert_eq!(report.dropped_missing, 3);
        assert_eq!(report.dropped_room_type, 1);
        assert_eq!(report.dropped_below_floor, 1);
        assert_eq!(report.rows_out, listings.len());
        assert_eq!(listings.len(), 2);
    }

    #[test]
    fn clean_validates_critical_fields_complete() {
        let (listings, _) = clean_listings(&raw_frame(), &CleaningConfig::default()).unwrap();
        assert!(validate_cleaned(&listings).is_ok());
        for l in &listings {
            assert!(l.price.is_finite() && l.price > 0.0);
        }
    }

    #[test]
    fn strict_mode_removes_three_sigma_outliers() {
        let n = 100;
        let mut prices: Vec<String> = (0..n).map(|i| format!("${}.00", 80 + (i % 21))).collect();
        prices.push("$5000.00".to_string());
        let rows = prices.len();
        let df = df! {
            "id" => (0..rows as i64).collect::<Vec<_>>(),
            "price" => prices,
            "room_type" => vec!["Private room"; rows],
            "host_is_superhost" => vec!["f"; rows],
        }
        .unwrap();
        let (listings, report) = clean_listings(&df, &CleaningConfig::default()).unwrap();
        assert_eq!(report.dropped_outlier, 1);
        assert!(listings.iter().all(|l| l.price < 5000.0));
    }

    #[test]
    fn relaxed_mode_keeps_heavy_tail_below_ceiling() {
        let mut prices: Vec<String> = (0..100).map(|i| format!("${}.00", 80 + (i % 21))).collect();
        prices.push("$5000.00".to_string());
        prices.push("$20000.00".to_string());
        let rows = prices.len();
        let df = df! {
            "id" => (0..rows as i64).collect::<Vec<_>>(),
            "price" => prices,
            "room_type" => vec!["Private room"; rows],
            "host_is_superhost" => vec!["f"; rows],
        }
        .unwrap();
        let config = CleaningConfig { mode: CleaningMode::Relaxed, ..Default::default() };
        let (listings, report) = clean_listings(&df, &config).unwrap();
        // 5000 kept, 20000 dropped at the ceiling
        assert_eq!(report.dropped_outlier, 1);
        assert!(listings.iter().any(|l| (l.price - 5000.0).abs() < 1e-9));
    }

    #[test]
    fn price_bands_cover_all_quartiles() {
        let prices: Vec<String> = (1..=100).map(|i| format!("${}.00", 10 + i)).collect();
        let rows = prices.len();
        let df = df! {
            "id" => (0..rows as i64).collect::<Vec<_>>(),
            "price" => prices,
            "room_type" => vec!["Entire home/apt"; rows],
            "host_is_superhost" => vec!["t"; rows],
        }
        .unwrap();
        let (listings, _) = clean_listings(&df, &CleaningConfig::default()).unwrap();
        for band in
            [PriceBand::Budget, PriceBand::Moderate, PriceBand::Upscale, PriceBand::Luxury]
        {
            assert!(listings.iter().any(|l| l.price_band == band), "missing {band:?}");
        }
    }

    #[test]
    fn cleaned_frame_round_trips_row_count() {
        let (listings, _) = clean_listings(&raw_frame(), &CleaningConfig::default()).unwrap();
        let frame = cleaned_frame(&listings).unwrap();
        assert_eq!(frame.height(), listings.len());
        assert!(frame.column("price").is_ok());
        assert!(frame.column("room_category").is_ok());
    }
}
