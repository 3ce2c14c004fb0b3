//! Tests for the weighted selectors through the public API.

use std::collections::HashMap;
use std::sync::Arc;

use mimir::{MimirError, SeededRandom, SequenceRandom, WeightedCoin, WeightedOptionSet};

fn assert_conserved(set: &WeightedOptionSet) {
    assert_eq!(set.allocated() + set.remaining(), set.max());
    let sum: u32 = set.options().iter().map(|o| o.weight()).sum();
    assert_eq!(sum, set.allocated());
}

// ============================================================================
// Weight conservation
// ============================================================================

#[test]
fn weight_is_conserved_through_every_mutation() {
    let mut set = WeightedOptionSet::with_max(50);
    assert_conserved(&set);

    set.add_option("a", 10).unwrap();
    assert_conserved(&set);
    set.add_option("b", 25).unwrap();
    assert_conserved(&set);

    // Failed insertions leave the books untouched
    assert!(set.add_option("c", 16).is_err());
    assert!(set.add_option("a", 1).is_err());
    assert_conserved(&set);

    set.set_max(80).unwrap();
    assert_conserved(&set);
    assert!(set.set_max(20).is_err());
    assert_conserved(&set);

    set.scale(3, false).unwrap();
    assert_conserved(&set);
    assert_eq!(set.max(), 240);

    set.add_option("c", set.remaining()).unwrap();
    assert_conserved(&set);
    assert!(matches!(
        set.add_option("d", 1),
        Err(MimirError::InvalidState(_))
    ));
}

#[test]
fn error_order_for_add_option() {
    let mut full = WeightedOptionSet::with_max(10).with_option("a", 10).unwrap();
    // A bad name wins over a full budget
    assert!(matches!(
        full.add_option("", 5),
        Err(MimirError::InvalidArgument(_))
    ));
    // A full budget wins over a bad weight
    assert!(matches!(
        full.add_option("b", 0),
        Err(MimirError::InvalidState(_))
    ));

    let mut open = WeightedOptionSet::with_max(10);
    assert!(matches!(
        open.add_option("b", 0),
        Err(MimirError::OutOfRange(_))
    ));
    assert!(matches!(
        open.add_option("b", 11),
        Err(MimirError::OutOfRange(_))
    ));
    assert!(matches!(
        open.add_option("default", 1),
        Err(MimirError::InvalidArgument(_))
    ));
}

// ============================================================================
// Distribution
// ============================================================================

#[test]
fn draws_match_weights_within_two_percent() {
    let set = WeightedOptionSet::new()
        .with_random(Arc::new(SeededRandom::new(7)))
        .with_option("A", 70)
        .unwrap()
        .with_option("B", 20)
        .unwrap()
        .with_option("C", 10)
        .unwrap();

    let draws = 100_000;
    let mut counts: HashMap<String, u32> = HashMap::new();
    for _ in 0..draws {
        let pick = set.determine().unwrap();
        assert!(!pick.is_default);
        *counts.entry(pick.name.to_string()).or_default() += 1;
    }

    for (name, expected) in [("A", 0.70), ("B", 0.20), ("C", 0.10)] {
        let share = f64::from(counts[name]) / f64::from(draws);
        assert!(
            (share - expected).abs() < 0.02,
            "{name}: expected {expected}, got {share}"
        );
    }
}

#[test]
fn equal_options_split_at_the_midpoint() {
    let set = WeightedOptionSet::equal_options(["x", "y"])
        .unwrap()
        .with_random(Arc::new(SequenceRandom::new([0, 49, 50, 99])));

    let names: Vec<String> = (0..4)
        .map(|_| set.determine().unwrap().name.to_string())
        .collect();
    assert_eq!(names, vec!["x", "x", "y", "y"]);
}

#[test]
fn unallocated_tail_goes_to_the_default_option() {
    let set = WeightedOptionSet::with_max(100)
        .with_random(Arc::new(SequenceRandom::new([59, 60])))
        .with_option("only", 60)
        .unwrap();

    let first = set.determine().unwrap();
    assert_eq!(first.name, "only");

    let second = set.determine().unwrap();
    assert!(second.is_default);
    assert_eq!(second.name, "default");
    assert_eq!(second.weight, 40);
    assert_eq!(second.position, 1);
}

// ============================================================================
// Coin
// ============================================================================

#[test]
fn coin_extremes() {
    let never = WeightedCoin::with_random(Arc::new(SeededRandom::new(3)))
        .bounded(100, 100)
        .unwrap();
    assert!((0..1_000).all(|_| !never.determine()));

    // Draws of 1 are the only way a step-1 coin comes up false
    let scripted = WeightedCoin::with_random(Arc::new(SequenceRandom::new([1, 2, 100])))
        .bounded(100, 1)
        .unwrap();
    assert!(!scripted.determine());
    assert!(scripted.determine());
    assert!(scripted.determine());
}

#[test]
fn coin_rejects_bad_bounds_and_keeps_configuration() {
    let mut coin = WeightedCoin::new();
    assert!(matches!(
        coin.bound_with_step(10, 11),
        Err(MimirError::InvalidArgument(_))
    ));
    assert!(matches!(
        coin.bound_with_step(10, 0),
        Err(MimirError::InvalidArgument(_))
    ));
    assert!(matches!(coin.bound(0), Err(MimirError::InvalidArgument(_))));
    assert_eq!(coin.upper_limit(), 100);
    assert_eq!(coin.step(), 50);

    coin.bound(30).unwrap();
    assert_eq!(coin.step(), 15);
}

#[test]
fn fair_coin_is_roughly_fair() {
    let coin = WeightedCoin::with_random(Arc::new(SeededRandom::new(99)));
    let heads = (0..20_000).filter(|_| coin.determine()).count();
    let share = heads as f64 / 20_000.0;
    assert!((share - 0.5).abs() < 0.02, "share was {share}");
}
