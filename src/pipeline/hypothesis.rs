//! Hypothesis tests over the superhost-by-room grid.
//!
//! Two layers: per-category Welch tests of superhost vs regular mean price,
//! and the headline comparison of individual superhost premiums between the
//! two room categories. Tests on arms below the adequacy threshold are
//! skipped with a reason rather than reported with fragile p-values.

use serde::Serialize;

use super::groups::{cell_prices, ADEQUATE_SAMPLE};
use super::listing::{GroupKey, Listing, RoomCategory};
use crate::stats::{
    levene_test, mean, normality_test, welch_t_test, LeveneTest, NormalityTest, WelchTest,
};

/// Normality of each arm plus variance homogeneity across arms.
///
/// Each entry is `None` when its test's own sample requirement is unmet.
#[derive(Debug, Clone, Serialize)]
pub struct ArmDiagnostics {
    pub normality_superhost: Option<NormalityTest>,
    pub normality_regular: Option<NormalityTest>,
    pub levene: Option<LeveneTest>,
}

/// Superhost vs regular price test within one room category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryHypothesis {
    pub room: RoomCategory,
    pub superhost_n: usize,
    pub regular_n: usize,
    pub test: Option<WelchTest>,
    pub skipped_reason: Option<String>,
    pub diagnostics: ArmDiagnostics,
}

/// The headline test: private-room vs entire-place individual premiums.
#[derive(Debug, Clone, Serialize)]
pub struct PremiumGapTest {
    pub private_n: usize,
    pub entire_n: usize,
    /// Mean individual premium for private rooms, percent
    pub private_mean_pct: f64,
    /// Mean individual premium for entire places, percent
    pub entire_mean_pct: f64,
    /// Private minus entire, percentage points
    pub gap_pp: f64,
    pub test: Option<WelchTest>,
    pub skipped_reason: Option<String>,
}

fn diagnostics(sup: &[f64], reg: &[f64]) -> ArmDiagnostics {
    ArmDiagnostics {
        normality_superhost: normality_test(sup).ok(),
        normality_regular: normality_test(reg).ok(),
        levene: levene_test(sup, reg).ok(),
    }
}

fn run_welch(sup: &[f64], reg: &[f64], conf_level: f64) -> (Option<WelchTest>, Option<String>) {
    if sup.len() < ADEQUATE_SAMPLE || reg.len() < ADEQUATE_SAMPLE {
        return (
            None,
            Some(format!(
                "arms of {} and {} listings are below the minimum of {} per arm",
                sup.len(),
                reg.len(),
                ADEQUATE_SAMPLE
            )),
        );
    }
    match welch_t_test(sup, reg, conf_level) {
        Ok(test) => (Some(test), None),
        Err(e) => (None, Some(e.to_string())),
    }
}

/// Welch test of superhost vs regular prices in each room category.
pub fn category_tests(listings: &[Listing], conf_level: f64) -> Vec<CategoryHypothesis> {
    RoomCategory::ALL
        .iter()
        .map(|&room| {
            let sup = cell_prices(listings, GroupKey { superhost: true, room });
            let reg = cell_prices(listings, GroupKey { superhost: false, room });
            let (test, skipped_reason) = run_welch(&sup, &reg, conf_level);
            CategoryHypothesis {
                room,
                superhost_n: sup.len(),
                regular_n: reg.len(),
                test,
                skipped_reason,
                diagnostics: diagnostics(&sup, &reg),
            }
        })
        .collect()
}

/// Individual premiums for the superhost listings of one room category.
///
/// Each superhost listing's price is expressed as a percent deviation from
/// the regular-host mean of its own category, so a listing in a cheap
/// category and one in an expensive category become comparable.
pub fn individual_premiums(listings: &[Listing], room: RoomCategory) -> Vec<f64> {
    let reg = cell_prices(listings, GroupKey { superhost: false, room });
    let baseline = match mean(&reg) {
        Some(m) if m > 0.0 => m,
        _ => return Vec::new(),
    };
    listings
        .iter()
        .filter(|l| l.superhost && l.room == room)
        .map(|l| 100.0 * (l.price - baseline) / baseline)
        .collect()
}

/// The headline premium-gap test.
///
/// Welch test on the two individual-premium distributions; a significant
/// negative gap says superhost status is worth less (or costs) for private
/// rooms relative to entire places.
pub fn premium_gap_test(listings: &[Listing], conf_level: f64) -> PremiumGapTest {
    let private = individual_premiums(listings, RoomCategory::PrivateRoom);
    let entire = individual_premiums(listings, RoomCategory::EntirePlace);
    let private_mean_pct = mean(&private).unwrap_or(f64::NAN);
    let entire_mean_pct = mean(&entire).unwrap_or(f64::NAN);
    let (test, skipped_reason) = run_welch(&private, &entire, conf_level);
    PremiumGapTest {
        private_n: private.len(),
        entire_n: entire.len(),
        private_mean_pct,
        entire_mean_pct,
        gap_pp: private_mean_pct - entire_mean_pct,
        test,
        skipped_reason,
    }
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

    /// Entire places: regular alternating 140/148 (mean 144), superhost
    /// 160/176 (mean 168). Private rooms: regular 90/101 (mean 95.5),
    /// superhost 70/78.6 (mean 74.3). 30 listings per arm.
    fn scenario() -> Vec<Listing> {
        let mut out = Vec::new();
        for i in 0..30 {
            let even = i % 2 == 0;
            out.push(listing(if even { 140.0 } else { 148.0 }, RoomCategory::EntirePlace, false));
            out.push(listing(if even { 160.0 } else { 176.0 }, RoomCategory::EntirePlace, true));
            out.push(listing(if even { 90.0 } else { 101.0 }, RoomCategory::PrivateRoom, false));
            out.push(listing(if even { 70.0 } else { 78.6 }, RoomCategory::PrivateRoom, true));
        }
        out
    }

    #[test]
    fn category_tests_recover_the_mean_differences() {
        let tests = category_tests(&scenario(), 0.95);
        assert_eq!(tests.len(), 2);
        let entire = tests.iter().find(|t| t.room == RoomCategory::EntirePlace).unwrap();
        let private = tests.iter().find(|t| t.room == RoomCategory::PrivateRoom).unwrap();

        let et = entire.test.as_ref().unwrap();
        assert!((et.mean_diff - 24.0).abs() < 1e-9);
        assert!((et.t_statistic - 14.44991).abs() < 1e-4);
        assert!(et.p_value < 1e-10);

        let pt = private.test.as_ref().unwrap();
        assert!((pt.mean_diff - -21.2).abs() < 1e-9);
        assert!((pt.t_statistic - -16.35280).abs() < 1e-4);
        assert!(pt.p_value < 1e-10);
    }

    #[test]
    fn individual_premiums_are_percent_deviations_from_regular_mean() {
        let premiums = individual_premiums(&scenario(), RoomCategory::EntirePlace);
        assert_eq!(premiums.len(), 30);
        // (160 - 144) / 144 and (176 - 144) / 144
        assert!(premiums.iter().any(|p| (p - 11.1111).abs() < 1e-3));
        assert!(premiums.iter().any(|p| (p - 22.2222).abs() < 1e-3));
    }

    #[test]
    fn headline_gap_test_matches_reference() {
        let gap = premium_gap_test(&scenario(), 0.95);
        assert_eq!(gap.private_n, 30);
        assert_eq!(gap.entire_n, 30);
        assert!((gap.private_mean_pct - -22.19895).abs() < 1e-4);
        assert!((gap.entire_mean_pct - 16.66667).abs() < 1e-4);
        assert!((gap.gap_pp - -38.86562).abs() < 1e-4);
        let test = gap.test.unwrap();
        assert!((test.t_statistic - -29.26805).abs() < 1e-4);
        assert!((test.df - 55.61466).abs() < 1e-4);
        assert!(test.p_value < 1e-20);
        assert!(test.ci_lower < -41.0 && test.ci_upper > -37.0);
    }

    #[test]
    fn small_arms_are_skipped_with_a_reason() {
        let mut listings = scenario();
        listings.retain(|l| !(l.superhost && l.room == RoomCategory::PrivateRoom));
        for _ in 0..5 {
            listings.push(listing(74.0, RoomCategory::PrivateRoom, true));
        }
        let tests = category_tests(&listings, 0.95);
        let private = tests.iter().find(|t| t.room == RoomCategory::PrivateRoom).unwrap();
        assert!(private.test.is_none());
        assert!(private.skipped_reason.as_ref().unwrap().contains("below the minimum"));
        // the other category is unaffected
        let entire = tests.iter().find(|t| t.room == RoomCategory::EntirePlace).unwrap();
        assert!(entire.test.is_some());
    }

    #[test]
    fn diagnostics_attach_when_samples_allow() {
        let tests = category_tests(&scenario(), 0.95);
        for t in &tests {
            assert!(t.diagnostics.normality_superhost.is_some());
            assert!(t.diagnostics.normality_regular.is_some());
            assert!(t.diagnostics.levene.is_some());
        }
    }
}
