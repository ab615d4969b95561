//! Points awarded for a correct answer.

/// Consecutive correct answers needed to raise the per-answer gain by one.
pub const STREAK_STEP: u32 = 3;

/// Points for a correct answer given the streak held *before* it.
///
/// `1 + streak / STREAK_STEP`: streaks 0..=2 earn 1, 3..=5 earn 2, and so on.
/// Non-decreasing in `streak`.
#[must_use]
pub fn compute_gain(streak: u32) -> u32 {
    1 + streak / STREAK_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_steps_every_three() {
        let gains: Vec<u32> = (0..7).map(compute_gain).collect();
        assert_eq!(gains, vec![1, 1, 1, 2, 2, 2, 3]);
    }

    #[test]
    fn gain_is_non_decreasing() {
        let mut prev = compute_gain(0);
        for streak in 1..1_000 {
            let gain = compute_gain(streak);
            assert!(gain >= prev);
            prev = gain;
        }
        assert!(compute_gain(u32::MAX) > 0);
    }
}
