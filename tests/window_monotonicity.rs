// tests/window_monotonicity.rs
//
// Widening the window never drops an item that a narrower window kept.

use chrono::{TimeDelta, TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};

use ticker_mentions::window::is_recent;
use ticker_mentions::{ContentItem, RecencyWindow, TimeUnit};

#[test]
fn recent_set_grows_with_the_window() {
    let mut rng = StdRng::seed_from_u64(0x7153);
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let items: Vec<ContentItem> = (0..500)
        .map(|_| {
            // Mostly past, some future, a few broken.
            match rng.random_range(0..10) {
                0 => ContentItem::new("x", Some("not-a-date")),
                1 => ContentItem::new("x", None),
                _ => {
                    let age = rng.random_range(-3_600i64..=30 * 86_400);
                    let ts = now - TimeDelta::seconds(age);
                    ContentItem::new("x", Some(&ts.to_rfc3339()))
                }
            }
        })
        .collect();

    for _ in 0..200 {
        let a = rng.random_range(0u64..=40);
        let b = rng.random_range(a..=40);
        let w1 = RecencyWindow::new(a, TimeUnit::Days).unwrap();
        let w2 = RecencyWindow::new(b, TimeUnit::Days).unwrap();
        for item in &items {
            if is_recent(item, w1, now) {
                assert!(
                    is_recent(item, w2, now),
                    "{:?} recent in {w1} but not in {w2}",
                    item.published_at
                );
            }
        }
    }
}

#[test]
fn exact_boundary_and_one_second_inside() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let w = RecencyWindow::new(2, TimeUnit::Hours).unwrap();

    let at_edge = (now - TimeDelta::hours(2)).to_rfc3339();
    let inside = (now - TimeDelta::hours(2) + TimeDelta::seconds(1)).to_rfc3339();

    assert!(!is_recent(&ContentItem::new("x", Some(&at_edge)), w, now));
    assert!(is_recent(&ContentItem::new("x", Some(&inside)), w, now));
}
