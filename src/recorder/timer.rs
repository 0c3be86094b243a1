//! [`Timer`] observing elapsed time into a histogram.

use std::{
    fmt,
    time::{Duration, Instant},
};

/// Timer observing the wall-clock seconds elapsed since its start into a
/// histogram.
///
/// The elapsed time is observed either explicitly via [`Timer::stop()`], or
/// implicitly on drop, unless [`Timer::discard()`]ed.
#[must_use = "`Timer` observes the elapsed time when dropped"]
pub struct Timer {
    /// Histogram to observe the elapsed time into.
    ///
    /// [`None`] for a no-op [`Timer`].
    histogram: Option<prometheus::Histogram>,

    /// [`Instant`] this [`Timer`] has been started at.
    start: Instant,

    /// Indicator whether this [`Timer`] has been stopped already.
    stopped: bool,
}

impl Timer {
    /// Starts a new [`Timer`] observing into the provided `histogram`.
    pub(crate) fn start(histogram: prometheus::Histogram) -> Self {
        Self { histogram: Some(histogram), start: Instant::now(), stopped: false }
    }

    /// Starts a new [`Timer`] observing nothing.
    pub fn noop() -> Self {
        Self { histogram: None, start: Instant::now(), stopped: false }
    }

    /// Returns the time elapsed since this [`Timer`] has been started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stops this [`Timer`], observing the elapsed seconds into its histogram,
    /// and returns them.
    #[allow(clippy::must_use_candidate)]
    pub fn stop(mut self) -> f64 {
        self.finish(true)
    }

    /// Stops this [`Timer`] without observing anything, and returns the
    /// elapsed seconds.
    #[allow(clippy::must_use_candidate)]
    pub fn discard(mut self) -> f64 {
        self.finish(false)
    }

    fn finish(&mut self, observe: bool) -> f64 {
        self.stopped = true;
        let secs = self.start.elapsed().as_secs_f64();
        if observe {
            if let Some(h) = &self.histogram {
                h.observe(secs);
            }
        }
        secs
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.stopped {
            self.finish(true);
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("noop", &self.histogram.is_none())
            .field("start", &self.start)
            .field("stopped", &self.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::Timer;

    fn histogram() -> prometheus::Histogram {
        prometheus::Histogram::with_opts(prometheus::HistogramOpts::new(
            "timer",
            "help",
        ))
        .unwrap()
    }

    #[test]
    fn observes_on_stop() {
        let h = histogram();

        let timer = Timer::start(h.clone());
        thread::sleep(Duration::from_millis(10));
        let secs = timer.stop();

        assert!(secs >= 0.01, "{secs}");
        assert_eq!(h.get_sample_count(), 1);
        assert!((h.get_sample_sum() - secs).abs() < f64::EPSILON);
    }

    #[test]
    fn observes_on_drop() {
        let h = histogram();

        drop(Timer::start(h.clone()));

        assert_eq!(h.get_sample_count(), 1);
    }

    #[test]
    fn discards() {
        let h = histogram();

        let secs = Timer::start(h.clone()).discard();

        assert!(secs >= 0.0);
        assert_eq!(h.get_sample_count(), 0);
    }

    #[test]
    fn noop_observes_nothing() {
        assert!(Timer::noop().stop() >= 0.0);
    }
}
