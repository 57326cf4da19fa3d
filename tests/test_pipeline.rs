//! Integration tests for the full premium analysis pipeline

use hostprem::pipeline::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_full_pipeline_from_raw_csv() {
    let mut raw = raw_listings_frame(50);
    let (_temp_dir, csv_path) = create_temp_csv(&mut raw);

    let df = load_listings(&csv_path, 1000).unwrap();
    let (listings, report) = clean_listings(&df, &CleaningConfig::default()).unwrap();

    // four dirty rows dropped before the floor, one at the floor
    assert_eq!(report.rows_in, 205);
    assert_eq!(report.dropped_missing, 2);
    assert_eq!(report.dropped_unparsable_price, 1);
    assert_eq!(report.dropped_room_type, 1);
    assert_eq!(report.dropped_below_floor, 1);
    assert_eq!(listings.len(), 200);

    let summaries = summarize_groups(&listings);
    assert_eq!(summaries.len(), 4);
    assert!(summaries.iter().all(|s| s.count == 50 && s.adequate_sample));

    // superhosts earn more on entire places, less on private rooms
    let premiums = category_premiums(&listings);
    let entire = premiums.iter().find(|p| p.room == RoomCategory::EntirePlace).unwrap();
    let private = premiums.iter().find(|p| p.room == RoomCategory::PrivateRoom).unwrap();
    assert!(entire.premium_pct.unwrap() > 10.0);
    assert!(private.premium_pct.unwrap() < -15.0);

    let gap = premium_gap_test(&listings, 0.95);
    let welch = gap.test.as_ref().unwrap();
    assert!(gap.gap_pp < -30.0);
    assert!(welch.p_value < 0.001);
}

#[test]
fn test_known_premiums_recovered_end_to_end() {
    let listings = premium_gap_listings(40);
    let premiums = category_premiums(&listings);

    let entire = premiums.iter().find(|p| p.room == RoomCategory::EntirePlace).unwrap();
    let private = premiums.iter().find(|p| p.room == RoomCategory::PrivateRoom).unwrap();
    // 168/144 and 74.3/95.5
    assert!((entire.premium_pct.unwrap() - 16.67).abs() < 0.1);
    assert!((private.premium_pct.unwrap() - -22.20).abs() < 0.1);
    assert!((premium_gap_pp(&premiums).unwrap() - -38.87).abs() < 0.1);

    let bootstrap =
        bootstrap_premium_gap(&listings, &BootstrapConfig::default()).unwrap();
    assert!(bootstrap.ci_upper < 0.0, "gap interval should exclude zero");
    assert!(bootstrap.p_value < 0.05);
}

#[test]
fn test_small_arm_is_flagged_not_tested() {
    let mut listings = premium_gap_listings(40);
    listings.retain(|l| !(l.superhost && l.room == RoomCategory::PrivateRoom));
    for i in 0..5 {
        listings.push(make_listing(9000 + i, 74.0, RoomCategory::PrivateRoom, true));
    }

    let summaries = summarize_groups(&listings);
    let tiny = summaries
        .iter()
        .find(|s| s.key.superhost && s.key.room == RoomCategory::PrivateRoom)
        .unwrap();
    assert_eq!(tiny.count, 5);
    assert!(!tiny.adequate_sample);

    let tests = category_tests(&listings, 0.95);
    let private = tests.iter().find(|t| t.room == RoomCategory::PrivateRoom).unwrap();
    assert!(private.test.is_none());
    assert!(private.skipped_reason.is_some());

    // descriptive premiums still computed, flagged inadequate
    let premiums = category_premiums(&listings);
    let private = premiums.iter().find(|p| p.room == RoomCategory::PrivateRoom).unwrap();
    assert!(private.premium_pct.is_some());
    assert!(!private.adequate_sample);
}

#[test]
fn test_same_seed_reproduces_every_randomized_stage() {
    let listings = premium_gap_listings(40);

    let bootstrap_config = BootstrapConfig { iterations: 300, seed: 11, conf_level: 0.95 };
    let boot_a = bootstrap_premium_gap(&listings, &bootstrap_config).unwrap();
    let boot_b = bootstrap_premium_gap(&listings, &bootstrap_config).unwrap();
    assert_eq!(boot_a.boot_mean, boot_b.boot_mean);
    assert_eq!(boot_a.ci_lower, boot_b.ci_lower);
    assert_eq!(boot_a.ci_upper, boot_b.ci_upper);

    let split_config = SplitConfig { test_fraction: 0.3, seed: 11 };
    let (train_a, test_a) = stratified_split(&listings, &split_config).unwrap();
    let (train_b, test_b) = stratified_split(&listings, &split_config).unwrap();
    let ids = |set: &[Listing]| set.iter().map(|l| l.id).collect::<Vec<_>>();
    assert_eq!(ids(&train_a), ids(&train_b));
    assert_eq!(ids(&test_a), ids(&test_b));

    let validation_a =
        validate_models(&listings, &split_config, &DesignConfig::default()).unwrap();
    let validation_b =
        validate_models(&listings, &split_config, &DesignConfig::default()).unwrap();
    assert_eq!(validation_a.models[0].test.rmse, validation_b.models[0].test.rmse);
}

#[test]
fn test_quantile_and_segment_stages_run_on_pipeline_output() {
    let mut raw = raw_listings_frame(50);
    let (_temp_dir, csv_path) = create_temp_csv(&mut raw);
    let df = load_listings(&csv_path, 1000).unwrap();
    let relaxed = CleaningConfig { mode: CleaningMode::Relaxed, ..Default::default() };
    let (listings, _) = clean_listings(&df, &relaxed).unwrap();

    let design = build_design(&listings, &DesignConfig::default()).unwrap();
    let config = QuantileConfig { bootstrap_iterations: 30, ..Default::default() };
    let analysis = quantile_analysis(&design, &config).unwrap();
    assert_eq!(analysis.fits.len(), 4);
    for premium in &analysis.premiums {
        assert!(premium.entire_premium > 0.0);
        assert!(premium.private_premium < 0.0);
    }

    let segments = segment_analysis(&listings, 0.95).unwrap();
    assert_eq!(segments.cells.len(), 6);
    assert!(segments.interaction_terms.is_some());
}
