//! Flap detection (spec §4.9), grounded on
//! `examples/original_source/lib/icinga/checkable-flapping.cpp`.
//!
//! `UpdateFlappingStatus` is called on every processed check result, not
//! only on changes: `positive` accumulates elapsed time when this result
//! changed state, `negative` when it didn't. This resolves the open
//! question in spec §9 about when `negative` accumulates.

use clustermon_types::checkable::FlapWindow;

const FLAPPING_INTERVAL: f64 = 30.0 * 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlapTransition {
    None,
    Started,
    Stopped,
}

/// Update the flap window for a single processed check result and report
/// whether the threshold was crossed.
pub fn update(
    window: &mut FlapWindow,
    state_changed: bool,
    threshold: f64,
    enabled: bool,
    now: f64,
) -> FlapTransition {
    let diff = now - window.last_change;

    let mut positive = window.positive;
    let mut negative = window.negative;

    if positive + negative > FLAPPING_INTERVAL {
        let scale = FLAPPING_INTERVAL / (positive + negative);
        positive *= scale;
        negative *= scale;
    }

    if state_changed {
        positive += diff;
    } else {
        negative += diff;
    }

    window.positive = positive.max(0.0);
    window.negative = negative.max(0.0);
    window.last_change = now;

    let was_flapping = window.is_flapping;
    let now_flapping = enabled && current_percent(window) > threshold;
    window.is_flapping = now_flapping;

    match (was_flapping, now_flapping) {
        (false, true) => FlapTransition::Started,
        (true, false) => FlapTransition::Stopped,
        _ => FlapTransition::None,
    }
}

pub fn current_percent(window: &FlapWindow) -> f64 {
    if window.positive + window.negative <= 0.0 {
        return 0.0;
    }
    100.0 * window.positive / (window.positive + window.negative)
}
