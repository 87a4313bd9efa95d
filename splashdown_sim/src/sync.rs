// Network sync scheduling: publish cadence and reconnect backoff.
//
// Neither type touches a socket. `PublishSchedule` answers "is it time to
// publish the local transform?" on the client clock; the timestamp advances
// on every due publish whether or not the channel is open, so nothing piles
// up while disconnected. `ReconnectBackoff` produces the delay before the
// next connection attempt; retries never stop.

use std::time::Duration;

use crate::config::SyncParams;

#[derive(Clone, Debug, Default)]
pub struct PublishSchedule {
    last_publish_ms: Option<f64>,
}

impl PublishSchedule {
    /// True if nothing has been published yet or the interval has elapsed.
    pub fn due(&self, now_ms: f64, params: &SyncParams) -> bool {
        self.last_publish_ms
            .is_none_or(|last| now_ms - last > params.publish_interval_ms)
    }

    pub fn mark(&mut self, now_ms: f64) {
        self.last_publish_ms = Some(now_ms);
    }

    /// `due` and `mark` in one step.
    pub fn poll(&mut self, now_ms: f64, params: &SyncParams) -> bool {
        if self.due(now_ms, params) {
            self.mark(now_ms);
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReconnectBackoff {
    attempts: u32,
}

impl ReconnectBackoff {
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next attempt: `min(max, base * max(attempts, 1))`.
    /// Counts the attempt.
    pub fn next_delay(&mut self, params: &SyncParams) -> Duration {
        let factor = u64::from(self.attempts.max(1));
        let ms = params
            .reconnect_base_ms
            .saturating_mul(factor)
            .min(params.reconnect_max_ms);
        self.attempts = self.attempts.saturating_add(1);
        Duration::from_millis(ms)
    }

    /// A connection opened.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_publish_is_immediate() {
        let params = SyncParams::default();
        let mut schedule = PublishSchedule::default();
        assert!(schedule.poll(0.0, &params));
    }

    #[test]
    fn publishes_strictly_after_interval() {
        let params = SyncParams::default();
        let mut schedule = PublishSchedule::default();
        schedule.mark(100.0);
        assert!(!schedule.due(120.0, &params));
        assert!(!schedule.due(150.0, &params));
        assert!(schedule.due(150.5, &params));
    }

    #[test]
    fn sixty_hz_publishes_about_every_third_frame() {
        let params = SyncParams::default();
        let mut schedule = PublishSchedule::default();
        let frame = 1000.0 / 60.0;
        let published = (0..600)
            .filter(|i| schedule.poll(*i as f64 * frame, &params))
            .count();
        // 10 s of frames; one publish per 4 frames (66.7 ms) at most 20 Hz.
        assert!(published <= 201);
        assert!(published >= 140);
    }

    #[test]
    fn backoff_sequence_caps_at_max() {
        let params = SyncParams::default();
        let mut backoff = ReconnectBackoff::default();
        let delays: Vec<u64> = (0..7)
            .map(|_| backoff.next_delay(&params).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 1000, 2000, 3000, 4000, 5000, 5000]);
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let params = SyncParams::default();
        let mut backoff = ReconnectBackoff::default();
        backoff.next_delay(&params);
        backoff.next_delay(&params);
        backoff.next_delay(&params);
        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(&params), Duration::from_millis(1000));
    }
}
