//! Design-matrix construction for the regression stages.
//!
//! One builder feeds the interaction OLS, the quantile fits, and the
//! validation models, so every stage sees the same encoding: intercept,
//! superhost and private-room indicators with their interaction, dummies for
//! the most common neighbourhoods against the single most common one as the
//! reference level, and a standardized review count.

use anyhow::{bail, Result};
use faer::Mat;
use serde::Serialize;
use std::collections::HashMap;

use super::listing::{Listing, RoomCategory};
use crate::stats::{mean, std_dev};

/// Label for listings outside the retained neighbourhood levels.
pub const OTHER_NEIGHBOURHOOD: &str = "Other";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DesignConfig {
    /// Number of neighbourhoods encoded as dummies, reference excluded
    pub top_neighbourhoods: usize,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self { top_neighbourhoods: 10 }
    }
}

/// A fitted encoding of the listings, reusable for out-of-sample rows.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub x: Mat<f64>,
    pub y: Vec<f64>,
    pub columns: Vec<String>,
    /// Dummy-encoded neighbourhood levels, in column order
    pub neighbourhood_levels: Vec<String>,
    /// The omitted reference level, the most frequent neighbourhood
    pub reference_neighbourhood: String,
    pub reviews_mean: f64,
    pub reviews_sd: f64,
}

impl DesignMatrix {
    pub fn n(&self) -> usize {
        self.x.nrows()
    }

    pub fn p(&self) -> usize {
        self.columns.len()
    }

    /// Column index by name; encoder and consumers stay in sync through this.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn dummy_for(&self, neighbourhood: &str) -> Option<usize> {
        let level = if self.neighbourhood_levels.iter().any(|l| l == neighbourhood) {
            neighbourhood
        } else if neighbourhood == self.reference_neighbourhood {
            return None;
        } else {
            OTHER_NEIGHBOURHOOD
        };
        self.neighbourhood_levels.iter().position(|l| l == level)
    }

    /// Encode one listing-shaped row with this design's fitted levels.
    ///
    /// Unknown neighbourhoods fall into the Other bucket; the reference
    /// level contributes no dummy.
    pub fn encode_row(
        &self,
        superhost: bool,
        room: RoomCategory,
        neighbourhood: &str,
        reviews: u32,
    ) -> Vec<f64> {
        let mut row = vec![0.0; self.p()];
        row[0] = 1.0;
        let private = matches!(room, RoomCategory::PrivateRoom);
        row[1] = superhost as u8 as f64;
        row[2] = private as u8 as f64;
        row[3] = (superhost && private) as u8 as f64;
        if let Some(level_idx) = self.dummy_for(neighbourhood) {
            row[4 + level_idx] = 1.0;
        }
        if self.reviews_sd > 0.0 {
            row[self.p() - 1] = (reviews as f64 - self.reviews_mean) / self.reviews_sd;
        }
        row
    }

    /// Rows for the four grid cells at the reference neighbourhood and the
    /// mean review count, for predicted-price comparisons.
    pub fn representative_rows(&self) -> Vec<(bool, RoomCategory, Vec<f64>)> {
        let mut out = Vec::with_capacity(4);
        for room in RoomCategory::ALL {
            for superhost in [false, true] {
                let mut row = self.encode_row(superhost, room, &self.reference_neighbourhood, 0);
                // exactly the sample mean, so the standardized term vanishes
                let reviews_col = self.p() - 1;
                row[reviews_col] = 0.0;
                out.push((superhost, room, row));
            }
        }
        out
    }
}

/// Neighbourhood levels by descending frequency; reference first.
fn neighbourhood_order(listings: &[Listing]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for l in listings {
        *counts.entry(l.neighbourhood.as_str()).or_default() += 1;
    }
    let mut ordered: Vec<(&str, usize)> = counts.into_iter().collect();
    // descending count, name as the deterministic tiebreak
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ordered.into_iter().map(|(name, _)| name.to_string()).collect()
}

/// Build the design over the given listings.
pub fn build_design(listings: &[Listing], config: &DesignConfig) -> Result<DesignMatrix> {
    if listings.is_empty() {
        bail!("Cannot build a design matrix from zero listings");
    }

    let ordered = neighbourhood_order(listings);
    let reference = ordered[0].clone();
    let mut levels: Vec<String> =
        ordered.into_iter().skip(1).take(config.top_neighbourhoods).collect();
    let has_other = listings
        .iter()
        .any(|l| l.neighbourhood != reference && !levels.contains(&l.neighbourhood));
    if has_other {
        levels.push(OTHER_NEIGHBOURHOOD.to_string());
    }

    let reviews: Vec<f64> = listings.iter().map(|l| l.reviews as f64).collect();
    let reviews_mean = mean(&reviews).unwrap_or(0.0);
    let reviews_sd = std_dev(&reviews).unwrap_or(0.0);

    let mut columns = vec![
        "intercept".to_string(),
        "superhost".to_string(),
        "private_room".to_string(),
        "superhost_x_private".to_string(),
    ];
    columns.extend(levels.iter().map(|l| format!("nbhd_{l}")));
    columns.push("reviews_std".to_string());

    let mut design = DesignMatrix {
        x: Mat::zeros(0, 0),
        y: listings.iter().map(|l| l.price).collect(),
        columns,
        neighbourhood_levels: levels,
        reference_neighbourhood: reference,
        reviews_mean,
        reviews_sd,
    };

    // encode_row keeps training rows and later prediction rows aligned
    let rows: Vec<Vec<f64>> = listings
        .iter()
        .map(|l| design.encode_row(l.superhost, l.room, &l.neighbourhood, l.reviews))
        .collect();
    design.x = Mat::from_fn(listings.len(), design.p(), |i, j| rows[i][j]);
    Ok(design)
}
