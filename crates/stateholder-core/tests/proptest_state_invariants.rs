//! Property-based invariant tests for the cell, container and event queue.
//!
//! **Cell / container:**
//! 1. The first value a subscriber sees is the value current at subscribe time.
//! 2. Every subscriber sees the same sequence of values.
//! 3. Consecutive observed values are never equal (no-op suppression).
//! 4. The version equals the number of observed transitions.
//! 5. The final observed value is the current value.
//!
//! **Event queue:**
//! 6. The pending sequence matches a reference `Vec` model after any mix of
//!    `emit` and `handle` calls (earliest occurrence removed).

use parking_lot::Mutex;
use proptest::prelude::*;
use stateholder_core::{EventHolder, EventQueue, StateOwner, state_container};
use std::sync::Arc;

// ── Strategies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Set(u8),
    Add(u8),
    Identity,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..8).prop_map(Op::Set),
        (0u8..3).prop_map(Op::Add),
        Just(Op::Identity),
    ]
}

#[derive(Debug, Clone)]
enum QueueOp {
    Emit(u8),
    Handle(u8),
}

fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        (0u8..4).prop_map(QueueOp::Emit),
        (0u8..4).prop_map(QueueOp::Handle),
    ]
}

// ── Cell / container ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn observers_agree_and_never_repeat(
        initial in 0u8..8,
        ops in proptest::collection::vec(op_strategy(), 0..64),
    ) {
        let container = state_container(u32::from(initial));
        let a = Arc::new(Mutex::new(Vec::new()));
        let b = Arc::new(Mutex::new(Vec::new()));
        let sink_a = Arc::clone(&a);
        let sink_b = Arc::clone(&b);
        let _sa = container.state().subscribe(move |v: &u32| sink_a.lock().push(*v));
        let _sb = container.state().subscribe(move |v: &u32| sink_b.lock().push(*v));

        for op in &ops {
            match op {
                Op::Set(n) => container.update(|_| u32::from(*n)),
                Op::Add(n) => container.update(|v| v + u32::from(*n)),
                Op::Identity => container.update(|v| *v),
            };
        }

        let a = a.lock().clone();
        let b = b.lock().clone();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a[0], u32::from(initial));
        for pair in a.windows(2) {
            prop_assert_ne!(pair[0], pair[1]);
        }
        prop_assert_eq!(a.len() as u64, container.state().version() + 1);
        prop_assert_eq!(*a.last().unwrap(), container.value());
    }

    #[test]
    fn late_subscriber_starts_from_current(
        before in proptest::collection::vec(0u32..5, 0..16),
        after in proptest::collection::vec(0u32..5, 0..16),
    ) {
        let container = state_container(0u32);
        for v in &before {
            container.update(|_| *v);
        }
        let expected_first = container.value();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let holder = container.as_state_holder();
        let _sub = holder.state().subscribe(move |v: &u32| sink.lock().push(*v));
        for v in &after {
            container.update(|_| *v);
        }

        let seen = seen.lock().clone();
        prop_assert_eq!(seen[0], expected_first);
        prop_assert_eq!(*seen.last().unwrap(), container.value());
    }
}

// ── Event queue ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn queue_matches_reference_model(
        ops in proptest::collection::vec(queue_op_strategy(), 0..64),
    ) {
        let queue = EventQueue::new();
        let mut model: Vec<u8> = Vec::new();

        for op in &ops {
            match op {
                QueueOp::Emit(e) => {
                    queue.emit(*e);
                    model.push(*e);
                }
                QueueOp::Handle(e) => {
                    queue.handle(e);
                    if let Some(i) = model.iter().position(|m| m == e) {
                        model.remove(i);
                    }
                }
            }
        }

        let pending: Vec<u8> = queue.events().value().to_vec();
        prop_assert_eq!(pending, model);
    }
}
