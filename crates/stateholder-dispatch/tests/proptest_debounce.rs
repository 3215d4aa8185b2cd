//! Property-based tests for the debounce dispatcher.
//!
//! 1. Forwarding decisions match a reference model (last-forwarded stamp per
//!    action, forward iff absent or strictly older than the window).
//! 2. The lookup never tracks more actions than were forwarded within the
//!    last window.
//! 3. Excluded actions are always forwarded.

use proptest::prelude::*;
use stateholder_dispatch::debounced;
use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;
use web_time::Instant;

fn schedule_strategy() -> impl Strategy<Value = Vec<(u8, u64)>> {
    proptest::collection::vec((0u8..4, 0u64..80), 1..64)
}

proptest! {
    #[test]
    fn matches_reference_model(window_ms in 1u64..120, schedule in schedule_strategy()) {
        let window = Duration::from_millis(window_ms);
        let forwarded = Cell::new(0usize);
        let dispatcher = debounced(window, |_: u8| forwarded.set(forwarded.get() + 1));

        let t0 = Instant::now();
        let mut elapsed = 0u64;
        let mut model: HashMap<u8, u64> = HashMap::new();
        let mut expected = 0usize;

        for (action, step) in schedule {
            elapsed += step;
            let now = t0 + Duration::from_millis(elapsed);
            let should = match model.get(&action) {
                Some(at) => elapsed - at > window_ms,
                None => true,
            };
            if should {
                model.insert(action, elapsed);
                expected += 1;
            }
            prop_assert_eq!(dispatcher.dispatch_at(action, now), should);

            let live = model.values().filter(|at| elapsed - **at <= window_ms).count();
            prop_assert!(dispatcher.tracked() <= live);
        }
        prop_assert_eq!(forwarded.get(), expected);
    }

    #[test]
    fn excluded_always_forwarded(repeats in 1usize..32) {
        let forwarded = Cell::new(0usize);
        let dispatcher = debounced(Duration::from_secs(60), |_: u8| {
            forwarded.set(forwarded.get() + 1);
        })
        .with_exclude(|a| *a == 0);
        let now = Instant::now();
        for _ in 0..repeats {
            prop_assert!(dispatcher.dispatch_at(0, now));
        }
        prop_assert_eq!(forwarded.get(), repeats);
    }
}
