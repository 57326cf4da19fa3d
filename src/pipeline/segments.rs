//! Price-segment analysis within each room category.
//!
//! Listings are cut into tertiles of their own category's price
//! distribution, the superhost premium is recomputed per cell, and a
//! three-way interaction regression checks whether the premium pattern
//! survives neighbourhood-free controls.

use anyhow::{Context, Result};
use faer::Mat;
use serde::Serialize;

use super::groups::ADEQUATE_SAMPLE;
use super::listing::{Listing, RoomCategory};
use crate::stats::{fit_ols, mean, quantile, std_dev, welch_t_test, WelchTest};

/// Minimum listings per arm before a per-cell Welch test is attempted.
pub const SEGMENT_TEST_MIN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSegment {
    Cheap,
    Medium,
    Expensive,
}

impl PriceSegment {
    pub const ALL: [PriceSegment; 3] =
        [PriceSegment::Cheap, PriceSegment::Medium, PriceSegment::Expensive];

    pub fn label(&self) -> &'static str {
        match self {
            PriceSegment::Cheap => "cheap",
            PriceSegment::Medium => "medium",
            PriceSegment::Expensive => "expensive",
        }
    }
}

/// Tertile cut points for one room category.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentBounds {
    pub room: RoomCategory,
    pub q33: f64,
    pub q67: f64,
}

impl SegmentBounds {
    /// Boundary prices go to the lower segment.
    pub fn segment_of(&self, price: f64) -> PriceSegment {
        if price <= self.q33 {
            PriceSegment::Cheap
        } else if price <= self.q67 {
            PriceSegment::Medium
        } else {
            PriceSegment::Expensive
        }
    }
}

/// Premium in one room-by-segment cell.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentCell {
    pub room: RoomCategory,
    pub segment: PriceSegment,
    pub superhost_n: usize,
    pub regular_n: usize,
    pub superhost_mean: f64,
    pub regular_mean: f64,
    pub premium_abs: f64,
    pub premium_pct: Option<f64>,
    /// Welch test, attempted from `SEGMENT_TEST_MIN` listings per arm
    pub test: Option<WelchTest>,
    pub adequate_sample: bool,
}

/// One reported coefficient from the interaction regression.
#[derive(Debug, Clone, Serialize)]
pub struct InteractionTerm {
    pub name: String,
    pub coef: f64,
    pub std_err: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentAnalysis {
    pub bounds: Vec<SegmentBounds>,
    pub cells: Vec<SegmentCell>,
    /// Interaction coefficients from the three-way model; `None` when the
    /// model could not be fit on this sample
    pub interaction_terms: Option<Vec<InteractionTerm>>,
}

/// Tertile bounds per room category from that category's own prices.
pub fn segment_bounds(listings: &[Listing]) -> Vec<SegmentBounds> {
    RoomCategory::ALL
        .iter()
        .map(|&room| {
            let prices: Vec<f64> =
                listings.iter().filter(|l| l.room == room).map(|l| l.price).collect();
            let (q33, q67) = if prices.is_empty() {
                (f64::NAN, f64::NAN)
            } else {
                (quantile(&prices, 1.0 / 3.0), quantile(&prices, 2.0 / 3.0))
            };
            SegmentBounds { room, q33, q67 }
        })
        .collect()
}

fn cell(
    listings: &[Listing],
    bounds: &SegmentBounds,
    segment: PriceSegment,
    conf_level: f64,
) -> SegmentCell {
    let in_cell = |l: &&Listing| l.room == bounds.room && bounds.segment_of(l.price) == segment;
    let sup: Vec<f64> =
        listings.iter().filter(in_cell).filter(|l| l.superhost).map(|l| l.price).collect();
    let reg: Vec<f64> =
        listings.iter().filter(in_cell).filter(|l| !l.superhost).map(|l| l.price).collect();
    let superhost_mean = mean(&sup).unwrap_or(f64::NAN);
    let regular_mean = mean(&reg).unwrap_or(f64::NAN);
    let defined = !sup.is_empty() && !reg.is_empty() && regular_mean > 0.0;
    let test = (sup.len() >= SEGMENT_TEST_MIN && reg.len() >= SEGMENT_TEST_MIN)
        .then(|| welch_t_test(&sup, &reg, conf_level).ok())
        .flatten();
    SegmentCell {
        room: bounds.room,
        segment,
        superhost_n: sup.len(),
        regular_n: reg.len(),
        superhost_mean,
        regular_mean,
        premium_abs: superhost_mean - regular_mean,
        premium_pct: defined.then(|| 100.0 * (superhost_mean - regular_mean) / regular_mean),
        test,
        adequate_sample: sup.len() >= ADEQUATE_SAMPLE && reg.len() >= ADEQUATE_SAMPLE,
    }
}

/// Three-way interaction regression of price on superhost, room, and
/// segment, review-adjusted. Only the interaction coefficients are
/// reported; the main effects exist to absorb the marginal structure.
fn interaction_model(
    listings: &[Listing],
    bounds: &[SegmentBounds],
) -> Option<Vec<InteractionTerm>> {
    let columns = [
        "intercept",
        "superhost",
        "private_room",
        "seg_medium",
        "seg_expensive",
        "superhost_x_private",
        "superhost_x_medium",
        "superhost_x_expensive",
        "private_x_medium",
        "private_x_expensive",
        "superhost_x_private_x_medium",
        "superhost_x_private_x_expensive",
        "reviews_std",
    ];

    let reviews: Vec<f64> = listings.iter().map(|l| l.reviews as f64).collect();
    let reviews_mean = mean(&reviews).unwrap_or(0.0);
    let reviews_sd = std_dev(&reviews).unwrap_or(0.0);

    let rows: Vec<[f64; 13]> = listings
        .iter()
        .map(|l| {
            let b = bounds.iter().find(|b| b.room == l.room)?;
            let s = l.superhost as u8 as f64;
            let p = matches!(l.room, RoomCategory::PrivateRoom) as u8 as f64;
            let segment = b.segment_of(l.price);
            let m = (segment == PriceSegment::Medium) as u8 as f64;
            let e = (segment == PriceSegment::Expensive) as u8 as f64;
            let r = if reviews_sd > 0.0 {
                (l.reviews as f64 - reviews_mean) / reviews_sd
            } else {
                0.0
            };
            Some([
                1.0, s, p, m, e,
                s * p, s * m, s * e, p * m, p * e,
                s * p * m, s * p * e,
                r,
            ])
        })
        .collect::<Option<Vec<_>>>()?;

    let x = Mat::from_fn(rows.len(), columns.len(), |i, j| rows[i][j]);
    let y: Vec<f64> = listings.iter().map(|l| l.price).collect();
    let fit = fit_ols(&x, &y).ok()?;

    Some(
        columns
            .iter()
            .enumerate()
            .filter(|(_, name)| name.contains("_x_"))
            .map(|(j, name)| InteractionTerm {
                name: name.to_string(),
                coef: fit.coef[j],
                std_err: fit.std_err[j],
            })
            .collect(),
    )
}

/// Full segment analysis over the cleaned listings.
pub fn segment_analysis(listings: &[Listing], conf_level: f64) -> Result<SegmentAnalysis> {
    if listings.is_empty() {
        anyhow::bail!("Cannot segment zero listings");
    }
    let bounds = segment_bounds(listings);
    for b in &bounds {
        if !b.q33.is_finite() {
            return Err(anyhow::anyhow!(
                "No {} listings to derive segment bounds from",
                b.room.label()
            ))
            .context("Segment analysis requires listings in both room categories");
        }
    }

    let mut cells = Vec::with_capacity(6);
    for b in &bounds {
        for segment in PriceSegment::ALL {
            cells.push(cell(listings, b, segment, conf_level));
        }
    }

    let interaction_terms = interaction_model(listings, &bounds);

    Ok(SegmentAnalysis { bounds, cells, interaction_terms })
}
