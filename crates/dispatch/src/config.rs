use std::time::Duration;

/// Interval between successive broadcast rounds.
pub const ROUND_INTERVAL: Duration = Duration::from_secs(20);

/// Search radius in metres for each round, widest-last. Round 9 repeats the
/// 30km radius twice more rather than growing further.
pub const RADII_METERS: [f64; 9] = [
    5_000.0, 8_000.0, 12_000.0, 15_000.0, 20_000.0, 25_000.0, 30_000.0, 30_000.0, 30_000.0,
];

pub fn round_count() -> usize {
    RADII_METERS.len()
}

/// Radius for a 1-indexed round number, or `None` once rounds are exhausted.
pub fn radius_for_round(round: usize) -> Option<f64> {
    RADII_METERS.get(round.checked_sub(1)?).copied()
}

/// Candidate cap applied to each round's matching query. Generous enough
/// that it rarely binds in a single metro area, small enough to keep a
/// crowded round's publish fan-out bounded.
pub const DEFAULT_ROUND_LIMIT: usize = 25;
