use super::HoldConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldTick {
    Advanced(u8),
    /// Threshold reached on this tick. Returned exactly once.
    Completed,
    /// Ticked again after completion; nothing changes.
    Finished,
}

/// The ramp itself, free of timers.
#[derive(Debug, Clone)]
pub struct HoldProgress {
    value: u8,
    step: u8,
    threshold: u8,
    completed: bool,
}

impl HoldProgress {
    pub fn new(config: &HoldConfig) -> Self {
        Self {
            value: 0,
            step: config.step,
            threshold: config.threshold,
            completed: false,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Advance one tick. Never overshoots the threshold.
    pub fn advance(&mut self) -> HoldTick {
        if self.completed {
            return HoldTick::Finished;
        }

        self.value = self.value.saturating_add(self.step).min(self.threshold);
        if self.value >= self.threshold {
            self.completed = true;
            HoldTick::Completed
        } else {
            HoldTick::Advanced(self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_default_ramp() {
        let mut progress = HoldProgress::new(&HoldConfig::default());
        for expected in (2..100).step_by(2) {
            assert_eq!(progress.advance(), HoldTick::Advanced(expected as u8));
        }
        assert_eq!(progress.advance(), HoldTick::Completed);
        assert_eq!(progress.value(), 100);
        assert_eq!(progress.advance(), HoldTick::Finished);
        assert_eq!(progress.value(), 100);
    }

    #[test]
    fn test_overshoot_clamped() {
        let config = HoldConfig::new(Duration::from_millis(30), 7, 100);
        let mut progress = HoldProgress::new(&config);
        for _ in 0..14 {
            assert!(matches!(progress.advance(), HoldTick::Advanced(_)));
        }
        assert_eq!(progress.value(), 98);
        assert_eq!(progress.advance(), HoldTick::Completed);
        assert_eq!(progress.value(), 100);
    }

    proptest! {
        #[test]
        fn prop_ramp_bounded_and_completes_once(step in 1u8..=100, threshold in 1u8..=100) {
            let config = HoldConfig::new(Duration::from_millis(30), step, threshold);
            let mut progress = HoldProgress::new(&config);
            let mut completions = 0;
            let mut last = 0u8;

            for _ in 0..250 {
                match progress.advance() {
                    HoldTick::Advanced(v) => {
                        prop_assert!(v > last);
                        prop_assert!(v < threshold);
                        last = v;
                    }
                    HoldTick::Completed => completions += 1,
                    HoldTick::Finished => {}
                }
                prop_assert!(progress.value() <= threshold);
                prop_assert!(progress.value() <= 100);
            }

            prop_assert_eq!(completions, 1);
            prop_assert_eq!(progress.value(), threshold);
        }
    }
}
