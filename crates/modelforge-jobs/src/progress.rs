//! The two progress-estimation curves used while a job is `running` and
//! no exact fraction-complete is known.

/// Asymptotic heartbeat curve: approaches `ceiling` but never reaches it
/// before the job actually completes, so the poll endpoint never shows
/// 100% for a job that is still running.
///
/// `min(C, S + (C - S) * (1 - e^{-t/tau}))`
#[must_use]
pub fn heartbeat_progress(elapsed_secs: f64, start: f64, ceiling: f64, tau: f64) -> u8 {
    let value = start + (ceiling - start) * (1.0 - (-elapsed_secs / tau).exp());
    value.min(ceiling).round().clamp(0.0, 100.0) as u8
}

/// Streaming-token progress: linear in the fraction of an expected total
/// length received so far, capped below completion until the job is
/// actually marked done.
///
/// `min(95, 20 + 75 * min(received / expected, 1))`
#[must_use]
pub fn streaming_progress(received_chars: usize, expected_chars: usize) -> u8 {
    if expected_chars == 0 {
        return 20;
    }
    let ratio = (received_chars as f64 / expected_chars as f64).min(1.0);
    (20.0 + 75.0 * ratio).min(95.0).round() as u8
}

pub const HEARTBEAT_START: f64 = 25.0;
pub const HEARTBEAT_CEILING: f64 = 95.0;
pub const HEARTBEAT_TAU_SECS: f64 = 120.0;
pub const HEARTBEAT_TICK_SECS: u64 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_starts_near_floor() {
        let p = heartbeat_progress(0.0, HEARTBEAT_START, HEARTBEAT_CEILING, HEARTBEAT_TAU_SECS);
        assert_eq!(p, 25);
    }

    #[test]
    fn heartbeat_never_exceeds_ceiling() {
        let p = heartbeat_progress(100_000.0, HEARTBEAT_START, HEARTBEAT_CEILING, HEARTBEAT_TAU_SECS);
        assert_eq!(p, 95);
    }

    #[test]
    fn heartbeat_is_monotone_non_decreasing() {
        let mut last = 0u8;
        let mut t = 0.0;
        while t < 600.0 {
            let p = heartbeat_progress(t, HEARTBEAT_START, HEARTBEAT_CEILING, HEARTBEAT_TAU_SECS);
            assert!(p >= last);
            last = p;
            t += HEARTBEAT_TICK_SECS as f64;
        }
    }

    #[test]
    fn streaming_progress_caps_at_95() {
        assert_eq!(streaming_progress(1000, 1000), 95);
        assert_eq!(streaming_progress(2000, 1000), 95);
    }

    #[test]
    fn streaming_progress_floor_is_20() {
        assert_eq!(streaming_progress(0, 1000), 20);
    }
}
