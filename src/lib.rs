//! Declarative [`prometheus`] metrics.
//!
//! A metric is declared as a plain struct: one field per label, plus a
//! [`metric::Type`] marker naming its kind. Recording a metric is just passing
//! an instance of such struct, while its collector is created and registered
//! on first use, exactly once per metric name.
//!
//! ```rust
//! use std::{thread, time::Duration};
//!
//! declarative_prometheus::metric! {
//!     #[metric(Counter, help = "Counter that tracks how many calls were made")]
//!     struct NumberOfHits {
//!         method: &'static str,
//!         some_other_label: String,
//!     }
//! }
//!
//! declarative_prometheus::metric! {
//!     #[metric(Histogram, help = "Histogram that tracks duration of the calls")]
//!     struct HitDuration {
//!         method: &'static str,
//!         some_other_label: f64,
//!     }
//! }
//!
//! // Bind a custom registry before recording any metric.
//! let registry = prometheus::Registry::new();
//! declarative_prometheus::set_registerer(std::sync::Arc::new(registry.clone()));
//! declarative_prometheus::set_gatherer(std::sync::Arc::new(registry.clone()));
//!
//! fn hello() {
//!     let _timer = declarative_prometheus::start_histogram_timer(&HitDuration {
//!         method: "hello()",
//!         some_other_label: 123.123,
//!     });
//!
//!     thread::sleep(Duration::from_millis(10));
//!
//!     declarative_prometheus::increment_counter(&NumberOfHits {
//!         method: "hello()",
//!         some_other_label: "someOtherLabelHello".into(),
//!     });
//! }
//!
//! hello();
//! hello();
//!
//! let families = declarative_prometheus::recorder().gather();
//! let names = families.iter().map(|mf| mf.get_name()).collect::<Vec<_>>();
//! assert_eq!(names, ["HitDuration", "NumberOfHits"]);
//! assert_eq!(families[1].get_metric()[0].get_counter().get_value(), 2.0);
//! assert_eq!(families[0].get_metric()[0].get_histogram().get_sample_count(), 2);
//! ```

pub mod backend;
pub mod error;
pub mod failure;
pub mod metric;
pub mod record;
pub mod recorder;
pub mod storage;

use std::sync::Arc;

use once_cell::sync::Lazy;

#[doc(inline)]
pub use self::{
    backend::{Gatherer, Registerer},
    error::Error,
    record::{Declaration, Record},
    recorder::{Recorder, Timer},
};

/// Process-wide [`Recorder`] backing the free functions of this crate.
static RECORDER: Lazy<Recorder> = Lazy::new(Recorder::default);

/// Returns the process-wide [`Recorder`].
///
/// It's bound to the [`prometheus::default_registry()`], unless
/// [`set_registerer()`] and [`set_gatherer()`] are called before its first
/// use.
#[must_use]
pub fn recorder() -> &'static Recorder {
    &RECORDER
}

/// Binds the provided [`Registerer`] to the process-wide [`Recorder`].
///
/// # Warning
///
/// Must be called before any metric is recorded, otherwise the already
/// recorded metrics stay registered in the previous [`Registerer`].
pub fn set_registerer(registerer: Arc<dyn Registerer>) {
    RECORDER.set_registerer(registerer);
}

/// Binds the provided [`Gatherer`] to the process-wide [`Recorder`].
pub fn set_gatherer(gatherer: Arc<dyn Gatherer>) {
    RECORDER.set_gatherer(gatherer);
}

/// Returns the [`Registerer`] bound to the process-wide [`Recorder`].
#[must_use]
pub fn registerer() -> Arc<dyn Registerer> {
    RECORDER.registerer()
}

/// Returns the [`Gatherer`] bound to the process-wide [`Recorder`].
#[must_use]
pub fn gatherer() -> Arc<dyn Gatherer> {
    RECORDER.gatherer()
}

/// Increments the counter declared by the provided [`Record`] by one, via the
/// process-wide [`Recorder`].
///
/// # Panics
///
/// If the [`Record`] is misdeclared. See [`Error`] for details.
pub fn increment_counter<R>(record: &R)
where
    R: Record<Kind = metric::Counter>,
{
    RECORDER.increment_counter(record);
}

/// Increments the counter declared by the provided [`Record`] by the provided
/// `value`, via the process-wide [`Recorder`].
///
/// # Panics
///
/// If the [`Record`] is misdeclared. See [`Error`] for details.
pub fn increment_counter_by<R>(record: &R, value: u64)
where
    R: Record<Kind = metric::Counter>,
{
    RECORDER.increment_counter_by(record, value);
}

/// Sets the gauge declared by the provided [`Record`] to the provided `value`,
/// via the process-wide [`Recorder`].
///
/// # Panics
///
/// If the [`Record`] is misdeclared. See [`Error`] for details.
pub fn set_gauge<R>(record: &R, value: f64)
where
    R: Record<Kind = metric::Gauge>,
{
    RECORDER.set_gauge(record, value);
}

/// Observes the provided `value` in the histogram declared by the provided
/// [`Record`], via the process-wide [`Recorder`].
///
/// # Panics
///
/// If the [`Record`] is misdeclared. See [`Error`] for details.
pub fn observe_histogram<R>(record: &R, value: f64)
where
    R: Record<Kind = metric::Histogram>,
{
    RECORDER.observe_histogram(record, value);
}

/// Starts a [`Timer`] observing the elapsed seconds in the histogram declared
/// by the provided [`Record`], via the process-wide [`Recorder`].
///
/// # Panics
///
/// If the [`Record`] is misdeclared. See [`Error`] for details.
pub fn start_histogram_timer<R>(record: &R) -> Timer
where
    R: Record<Kind = metric::Histogram>,
{
    RECORDER.start_histogram_timer(record)
}
