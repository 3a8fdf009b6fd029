/// What one tick observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownSignal {
    /// Normal second elapsed.
    Tick,
    /// Inside the final-minute warning window.
    Warning,
    /// Time ran out. Emitted exactly once per start.
    Expired,
}

/// One-second-resolution countdown bound to the active attempt. Inert
/// unless started; `Expired` fires once even if ticks keep arriving after
/// time reaches zero.
#[derive(Clone, Debug)]
pub struct Countdown {
    remaining_secs: u32,
    limit_secs: u32,
    warning_threshold_secs: u32,
    active: bool,
    fired: bool,
}

impl Countdown {
    pub fn new(limit_secs: u32, warning_threshold_secs: u32) -> Self {
        Self {
            remaining_secs: limit_secs,
            limit_secs,
            warning_threshold_secs,
            active: false,
            fired: false,
        }
    }

    /// Begin a fresh attempt at the full time budget.
    pub fn start(&mut self) {
        self.remaining_secs = self.limit_secs;
        self.active = true;
        self.fired = false;
    }

    /// Resume a restored attempt at its saved countdown value. No
    /// wall-clock fast-forward: the student gets exactly what was saved.
    pub fn resume(&mut self, remaining_secs: u32) {
        self.remaining_secs = remaining_secs.min(self.limit_secs);
        self.active = true;
        self.fired = false;
    }

    /// Stop ticking. Called on submit so a pending expiry tick cannot
    /// race a manual submission.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Non-blocking UI hint; does not affect transitions.
    pub fn warning_active(&self) -> bool {
        self.active && self.remaining_secs <= self.warning_threshold_secs
    }

    /// Advance one second. Returns `None` while inert or after expiry has
    /// already fired.
    pub fn tick(&mut self) -> Option<CountdownSignal> {
        if !self.active || self.fired {
            return None;
        }
        if self.remaining_secs > 0 {
            self.remaining_secs -= 1;
        }
        if self.remaining_secs == 0 {
            self.fired = true;
            self.active = false;
            return Some(CountdownSignal::Expired);
        }
        if self.remaining_secs <= self.warning_threshold_secs {
            Some(CountdownSignal::Warning)
        } else {
            Some(CountdownSignal::Tick)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inert_until_started() {
        let mut countdown = Countdown::new(900, 60);
        assert!(!countdown.is_active());
        assert_eq!(countdown.tick(), None);
    }

    #[test]
    fn counts_down_and_warns_in_final_minute() {
        let mut countdown = Countdown::new(62, 60);
        countdown.start();
        assert_eq!(countdown.tick(), Some(CountdownSignal::Tick));
        assert_eq!(countdown.remaining_secs(), 61);
        assert!(!countdown.warning_active());

        assert_eq!(countdown.tick(), Some(CountdownSignal::Warning));
        assert_eq!(countdown.remaining_secs(), 60);
        assert!(countdown.warning_active());
    }

    #[test]
    fn expiry_fires_exactly_once() {
        let mut countdown = Countdown::new(2, 1);
        countdown.start();
        assert_eq!(countdown.tick(), Some(CountdownSignal::Warning));
        assert_eq!(countdown.tick(), Some(CountdownSignal::Expired));
        // Further ticks after expiry must not re-fire.
        assert_eq!(countdown.tick(), None);
        assert_eq!(countdown.tick(), None);
        assert!(!countdown.is_active());
    }

    #[test]
    fn stop_prevents_expiry() {
        let mut countdown = Countdown::new(1, 0);
        countdown.start();
        countdown.stop();
        assert_eq!(countdown.tick(), None);
    }

    #[test]
    fn resume_clamps_to_limit_and_can_expire() {
        let mut countdown = Countdown::new(900, 60);
        countdown.resume(5000);
        assert_eq!(countdown.remaining_secs(), 900);

        countdown.resume(1);
        assert_eq!(countdown.tick(), Some(CountdownSignal::Expired));
        assert_eq!(countdown.tick(), None);
    }

    #[test]
    fn restart_after_expiry_rearms() {
        let mut countdown = Countdown::new(1, 0);
        countdown.start();
        assert_eq!(countdown.tick(), Some(CountdownSignal::Expired));
        countdown.start();
        assert_eq!(countdown.tick(), Some(CountdownSignal::Expired));
    }
}
