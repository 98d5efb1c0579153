use std::collections::HashMap;
use std::time::Duration;

use dispatcher_core::registry::{Algorithm, Registry, WorkerSpec};
use dispatcher_core::selector;

/// Spec §8 S5 — weights `{1, 3, 6}` converge to roughly `{10%, 30%, 60%}`
/// over 10,000 direct selections. Exercised against the Selector directly
/// (no HTTP round-trip needed for a pure policy check).
#[test]
fn weighted_distribution_matches_weights() {
    let registry = Registry::new(
        vec![
            WorkerSpec {
                name: "w1".into(),
                url: "http://w1".into(),
                color: "#000".into(),
                weight: 1,
                max_load: 10,
            },
            WorkerSpec {
                name: "w2".into(),
                url: "http://w2".into(),
                color: "#000".into(),
                weight: 3,
                max_load: 10,
            },
            WorkerSpec {
                name: "w3".into(),
                url: "http://w3".into(),
                color: "#000".into(),
                weight: 6,
                max_load: 10,
            },
        ],
        Algorithm::Weighted,
        3,
        Duration::from_secs(30),
    );

    let mut counts: HashMap<String, u32> = HashMap::new();
    let trials = 10_000;
    for _ in 0..trials {
        let w = selector::select(&registry).expect("worker");
        *counts.entry(w.name.clone()).or_default() += 1;
    }

    let f2 = *counts.get("w2").unwrap_or(&0) as f64 / trials as f64;
    let f3 = *counts.get("w3").unwrap_or(&0) as f64 / trials as f64;
    assert!((0.25..=0.35).contains(&f2), "w2 frequency {f2}");
    assert!((0.55..=0.65).contains(&f3), "w3 frequency {f3}");
}
