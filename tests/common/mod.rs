//! Shared test utilities and fixture generators

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use hostprem::pipeline::{Listing, PriceBand, RoomCategory};

/// Build one listing with sensible defaults for the fields a test does not
/// care about.
pub fn make_listing(id: i64, price: f64, room: RoomCategory, superhost: bool) -> Listing {
    Listing {
        id,
        price,
        room,
        superhost,
        reviews: (id % 50) as u32,
        availability_365: 180,
        accommodates: 2,
        neighbourhood: match id % 4 {
            0 => "Mitte",
            1 => "Kreuzberg",
            2 => "Pankow",
            _ => "Neukölln",
        }
        .to_string(),
        rating: Some(4.0 + (id % 10) as f64 / 10.0),
        price_band: PriceBand::Moderate,
    }
}

/// Balanced four-cell sample where superhosts charge more for entire places
/// and less for private rooms.
///
/// Cell means: regular entire 144, superhost entire 168, regular private
/// 95.5, superhost private 74.3. Each cell holds `per_cell` listings with a
/// deterministic spread.
pub fn premium_gap_listings(per_cell: usize) -> Vec<Listing> {
    let mut out = Vec::new();
    let mut id = 0;
    for i in 0..per_cell {
        let even = i % 2 == 0;
        for (base_even, base_odd, room, superhost) in [
            (140.0, 148.0, RoomCategory::EntirePlace, false),
            (160.0, 176.0, RoomCategory::EntirePlace, true),
            (90.0, 101.0, RoomCategory::PrivateRoom, false),
            (70.0, 78.6, RoomCategory::PrivateRoom, true),
        ] {
            let price = if even { base_even } else { base_odd };
            out.push(make_listing(id, price, room, superhost));
            id += 1;
        }
    }
    out
}

/// A raw scraped-style listings table with currency-formatted prices,
/// "t"/"f" superhost flags, and a sprinkle of rows that should be dropped.
///
/// `per_cell` clean rows land in each of the four cells; five dirty rows
/// (null price, unparsable price, shared room, null superhost, sub-floor
/// price) are appended after them.
pub fn raw_listings_frame(per_cell: usize) -> DataFrame {
    let mut id = Vec::new();
    let mut price = Vec::new();
    let mut room_type = Vec::new();
    let mut superhost = Vec::new();
    let mut reviews = Vec::new();
    let mut availability = Vec::new();
    let mut accommodates = Vec::new();
    let mut neighbourhood = Vec::new();
    let mut rating = Vec::new();

    let mut push = |i: i64, p: Option<&str>, rt: Option<&str>, sh: Option<&str>| {
        id.push(i);
        price.push(p.map(|s| s.to_string()));
        room_type.push(rt.map(|s| s.to_string()));
        superhost.push(sh.map(|s| s.to_string()));
        reviews.push(i % 50);
        availability.push(120 + (i % 200));
        accommodates.push(1 + (i % 4));
        neighbourhood.push(match i % 3 {
            0 => "Mitte",
            1 => "Kreuzberg",
            _ => "Pankow",
        });
        rating.push(if i % 7 == 0 { None } else { Some(4.0 + (i % 10) as f64 / 10.0) });
    };

    let mut next_id = 0i64;
    for i in 0..per_cell as i64 {
        // wide spread so host types overlap within every price segment
        let jitter = (i % 60) as f64;
        for (base, rt, sh) in [
            (140.0, "Entire home/apt", "f"),
            (164.0, "Entire home/apt", "t"),
            (91.0, "Private room", "f"),
            (70.0, "Private room", "t"),
        ] {
            let formatted = format!("${:.2}", base + jitter);
            push(next_id, Some(formatted.as_str()), Some(rt), Some(sh));
            next_id += 1;
        }
    }
    push(next_id, None, Some("Private room"), Some("f"));
    push(next_id + 1, Some("n/a"), Some("Private room"), Some("t"));
    push(next_id + 2, Some("$95.00"), Some("Shared room"), Some("f"));
    push(next_id + 3, Some("$95.00"), Some("Private room"), None);
    push(next_id + 4, Some("$3.00"), Some("Private room"), Some("f"));

    df! {
        "id" => id,
        "price" => price,
        "room_type" => room_type,
        "host_is_superhost" => superhost,
        "number_of_reviews" => reviews,
        "availability_365" => availability,
        "accommodates" => accommodates,
        "neighbourhood_cleansed" => neighbourhood,
        "review_scores_rating" => rating,
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("listings.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}
