//! Threshold classifier: raw channel-1 value plus both envelopes → one gesture.

use crate::types::Outcome;

/// Channel-1 raw level above which a quick flex counts as Action1.
pub const RAW1_FLEX: f64 = 20.0;
/// Channel-2 envelope must stay below this for Action1.
pub const ENV2_QUIET: f64 = 50.0;
/// Channel-2 envelope above this enables Action2/Action3.
pub const ENV2_ACTIVE: f64 = 100.0;
/// Channel-1 envelope split between Action2 (below) and Action3 (above).
pub const ENV1_SPLIT: f64 = 10.0;

/// Classify one tick. Pure and deterministic.
///
/// Precedence, first match wins:
/// 1. `raw1 > 20 && env2 < 50` → Action1
/// 2. `env2 > 100`: `env1 > 10` → Action3, `env1 < 10` → Action2,
///    `env1 == 10` → None
/// 3. otherwise None
pub fn classify(raw1: i32, envelope1: f64, envelope2: f64) -> Outcome {
    if raw1 as f64 > RAW1_FLEX && envelope2 < ENV2_QUIET {
        Outcome::Action1
    } else if envelope2 > ENV2_ACTIVE {
        if envelope1 > ENV1_SPLIT {
            Outcome::Action3
        } else if envelope1 < ENV1_SPLIT {
            Outcome::Action2
        } else {
            // env1 exactly at the split matches neither branch.
            Outcome::None
        }
    } else {
        Outcome::None
    }
}
