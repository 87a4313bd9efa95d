// Display-timestamp to frame-delta conversion.
//
// The render loop hands us absolute timestamps in milliseconds (the display
// callback's clock). The first timestamp only primes the clock. Timestamps
// that go backwards yield a zero delta rather than a negative one.

#[derive(Clone, Debug, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    /// Seconds since the previous timestamp (0 on the first call).
    pub fn advance(&mut self, timestamp_ms: f64) -> f64 {
        let dt = match self.last_ms {
            Some(last) => ((timestamp_ms - last) / 1000.0).max(0.0),
            None => 0.0,
        };
        self.last_ms = Some(timestamp_ms);
        dt
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
