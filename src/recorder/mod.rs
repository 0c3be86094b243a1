//! [`Recorder`] of declared metrics.

mod timer;

use std::{fmt, sync::Arc};

use crate::{
    backend::{Binding, Gatherer, Registerer},
    failure::{self, strategy::Panic},
    metric::{self, Bundle as _},
    record::{Declaration, Record},
    storage::Storage,
    Error,
};

pub use self::timer::Timer;

/// Single [`prometheus`] metric backing the [`Record`] of type `R`.
type SingleOf<R> =
    <<<R as Record>::Kind as metric::Type>::Bundle as metric::Bundle>::Single;

/// Recorder of metrics declared as [`Record`]s, creating and registering
/// their [`prometheus`] collectors on the fly.
///
/// This is an explicit context object: build it once with the desired
/// [`Registerer`] and [`Gatherer`] and share it (it's cheaply [`Clone`]able,
/// with all the clones sharing the same [`Storage`] and [`Binding`]). By
/// default, the [`prometheus::default_registry()`] is used.
///
/// # Example
///
/// ```rust
/// use declarative_prometheus::Recorder;
///
/// declarative_prometheus::metric! {
///     #[metric(Counter, help = "Handled requests")]
///     struct Hits {
///         method: &'static str,
///     }
/// }
///
/// let registry = prometheus::Registry::new();
/// let recorder = Recorder::builder().with_registry(registry.clone()).build();
///
/// recorder.increment_counter(&Hits { method: "a" });
/// recorder.increment_counter(&Hits { method: "a" });
/// recorder.increment_counter(&Hits { method: "b" });
///
/// let families = registry.gather();
/// assert_eq!(families[0].get_name(), "Hits");
/// let values = families[0]
///     .get_metric()
///     .iter()
///     .map(|m| (m.get_label()[0].get_value(), m.get_counter().get_value()))
///     .collect::<Vec<_>>();
/// assert_eq!(values, [("a", 2.0), ("b", 1.0)]);
/// ```
///
/// # Performance
///
/// Recording an already registered metric costs a [`Record`] serialization
/// into [`Declaration`] plus a [`read`-lock] on a [`HashMap`] plus a
/// [`prometheus`] label values lookup.
///
/// # Error handling
///
/// Any [`Error`] means the metric is declared incorrectly (or clashes with an
/// already registered one). `try_*` methods return it, while the other ones
/// apply the [`failure::Strategy`] of this [`Recorder`]. By default, the
/// [`Panic`] [`failure::Strategy`] is used. See [`failure::strategy`] module
/// for other available [`failure::Strategy`]s, or provide your own one by
/// implementing a [`failure::Strategy`] trait.
///
/// [`HashMap`]: std::collections::HashMap
/// [`read`-lock]: std::sync::RwLock::read()
#[derive(Clone)]
pub struct Recorder<FailureStrategy = Panic> {
    /// [`Storage`] of the collectors created by this [`Recorder`].
    storage: Storage,

    /// [`Binding`] of the [`Registerer`] and [`Gatherer`] this [`Recorder`]
    /// works with.
    binding: Arc<Binding>,

    /// [`failure::Strategy`] to apply when an [`Error`] is encountered inside
    /// non-`try_` methods.
    failure_strategy: FailureStrategy,
}

impl<S: fmt::Debug> fmt::Debug for Recorder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("storage", &self.storage)
            .field("binding", &self.binding)
            .field("failure_strategy", &self.failure_strategy)
            .finish()
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Recorder {
    /// Starts building a new [`Recorder`] on top of the
    /// [`prometheus::default_registry()`].
    pub fn builder() -> Builder {
        Builder { binding: Binding::default(), failure_strategy: Panic }
    }
}

impl<S> Recorder<S> {
    /// Returns the [`Binding`] of this [`Recorder`].
    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Returns the [`Storage`] of the collectors created by this [`Recorder`].
    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Returns the currently bound [`Registerer`].
    #[must_use]
    pub fn registerer(&self) -> Arc<dyn Registerer> {
        self.binding.registerer()
    }

    /// Returns the currently bound [`Gatherer`].
    #[must_use]
    pub fn gatherer(&self) -> Arc<dyn Gatherer> {
        self.binding.gatherer()
    }

    /// Binds the provided [`Registerer`] to this [`Recorder`] (and all its
    /// clones).
    ///
    /// # Warning
    ///
    /// Metrics recorded before are not moved to the new [`Registerer`]. Prefer
    /// [`Builder::with_registerer()`] to bind it before any use.
    pub fn set_registerer(&self, registerer: Arc<dyn Registerer>) {
        self.binding.set_registerer(registerer);
    }

    /// Binds the provided [`Gatherer`] to this [`Recorder`] (and all its
    /// clones).
    pub fn set_gatherer(&self, gatherer: Arc<dyn Gatherer>) {
        self.binding.set_gatherer(gatherer);
    }

    /// Gathers all the metrics via the currently bound [`Gatherer`].
    #[must_use]
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.binding.gatherer().gather()
    }

    /// Introspects the provided [`Record`] into its [`Declaration`], without
    /// recording anything.
    ///
    /// # Errors
    ///
    /// If the [`Record`] has a non-scalar field.
    pub fn declaration_of<R: Record>(
        &self,
        record: &R,
    ) -> Result<Declaration, Error> {
        Ok(Declaration::of(record)?)
    }

    /// Increments the counter declared by the provided [`Record`] by one.
    ///
    /// # Errors
    ///
    /// See [`Error`] for details.
    pub fn try_increment_counter<R>(&self, record: &R) -> Result<(), Error>
    where
        R: Record<Kind = metric::Counter>,
    {
        self.try_increment_counter_by(record, 1)
    }

    /// Increments the counter declared by the provided [`Record`] by the
    /// provided `value`.
    ///
    /// # Errors
    ///
    /// See [`Error`] for details.
    pub fn try_increment_counter_by<R>(
        &self,
        record: &R,
        value: u64,
    ) -> Result<(), Error>
    where
        R: Record<Kind = metric::Counter>,
    {
        self.resolve(record)?.inc_by(value);
        Ok(())
    }

    /// Sets the gauge declared by the provided [`Record`] to the provided
    /// `value`.
    ///
    /// # Errors
    ///
    /// See [`Error`] for details.
    pub fn try_set_gauge<R>(&self, record: &R, value: f64) -> Result<(), Error>
    where
        R: Record<Kind = metric::Gauge>,
    {
        self.resolve(record)?.set(value);
        Ok(())
    }

    /// Observes the provided `value` in the histogram declared by the provided
    /// [`Record`].
    ///
    /// # Errors
    ///
    /// See [`Error`] for details.
    pub fn try_observe_histogram<R>(
        &self,
        record: &R,
        value: f64,
    ) -> Result<(), Error>
    where
        R: Record<Kind = metric::Histogram>,
    {
        self.resolve(record)?.observe(value);
        Ok(())
    }

    /// Starts a [`Timer`] observing the elapsed seconds in the histogram
    /// declared by the provided [`Record`].
    ///
    /// # Errors
    ///
    /// See [`Error`] for details.
    pub fn try_start_histogram_timer<R>(&self, record: &R) -> Result<Timer, Error>
    where
        R: Record<Kind = metric::Histogram>,
    {
        Ok(Timer::start(self.resolve(record)?))
    }

    /// Resolves the single [`prometheus`] metric for the provided [`Record`],
    /// creating and registering its collector if there is none yet.
    fn resolve<R: Record>(&self, record: &R) -> Result<SingleOf<R>, Error> {
        let decl = Declaration::of(record)?;
        let collector = self.storage.resolve(&decl, &self.binding)?;
        let bundle = <R::Kind as metric::Type>::bundle(&collector)
            .ok_or_else(|| Error::KindMismatch {
                name: decl.name.into(),
                registered: collector.kind(),
                declared: decl.kind,
            })?;
        bundle
            .get_single_metric(&decl.labels)
            .map_err(|source| Error::Collector { name: decl.name.into(), source })
    }
}

impl<S: failure::Strategy> Recorder<S> {
    /// Increments the counter declared by the provided [`Record`] by one.
    ///
    /// # Panics
    ///
    /// If an [`Error`] is encountered and the [`failure::Strategy`] of this
    /// [`Recorder`] decides to panic.
    pub fn increment_counter<R>(&self, record: &R)
    where
        R: Record<Kind = metric::Counter>,
    {
        if let Err(e) = self.try_increment_counter(record) {
            self.fail(&e);
        }
    }

    /// Increments the counter declared by the provided [`Record`] by the
    /// provided `value`.
    ///
    /// # Panics
    ///
    /// If an [`Error`] is encountered and the [`failure::Strategy`] of this
    /// [`Recorder`] decides to panic.
    pub fn increment_counter_by<R>(&self, record: &R, value: u64)
    where
        R: Record<Kind = metric::Counter>,
    {
        if let Err(e) = self.try_increment_counter_by(record, value) {
            self.fail(&e);
        }
    }

    /// Sets the gauge declared by the provided [`Record`] to the provided
    /// `value`.
    ///
    /// # Panics
    ///
    /// If an [`Error`] is encountered and the [`failure::Strategy`] of this
    /// [`Recorder`] decides to panic.
    pub fn set_gauge<R>(&self, record: &R, value: f64)
    where
        R: Record<Kind = metric::Gauge>,
    {
        if let Err(e) = self.try_set_gauge(record, value) {
            self.fail(&e);
        }
    }

    /// Observes the provided `value` in the histogram declared by the provided
    /// [`Record`].
    ///
    /// # Panics
    ///
    /// If an [`Error`] is encountered and the [`failure::Strategy`] of this
    /// [`Recorder`] decides to panic.
    pub fn observe_histogram<R>(&self, record: &R, value: f64)
    where
        R: Record<Kind = metric::Histogram>,
    {
        if let Err(e) = self.try_observe_histogram(record, value) {
            self.fail(&e);
        }
    }

    /// Starts a [`Timer`] observing the elapsed seconds in the histogram
    /// declared by the provided [`Record`].
    ///
    /// Returns a [`Timer::noop()`] if an [`Error`] is encountered and the
    /// [`failure::Strategy`] of this [`Recorder`] decides to ignore it.
    ///
    /// # Panics
    ///
    /// If an [`Error`] is encountered and the [`failure::Strategy`] of this
    /// [`Recorder`] decides to panic.
    pub fn start_histogram_timer<R>(&self, record: &R) -> Timer
    where
        R: Record<Kind = metric::Histogram>,
    {
        self.try_start_histogram_timer(record).unwrap_or_else(|e| {
            self.fail(&e);
            Timer::noop()
        })
    }

    /// Applies the [`failure::Strategy`] of this [`Recorder`] to the provided
    /// [`Error`].
    fn fail(&self, err: &Error) {
        match self.failure_strategy.decide(err) {
            failure::Action::NoOp => {
                tracing::warn!(error = %err, "skipped recording a metric");
            }
            failure::Action::Panic => panic!("failed to record metric: {err}"),
        }
    }
}

/// Builder for building a [`Recorder`].
#[derive(Debug)]
#[must_use]
pub struct Builder<FailureStrategy = Panic> {
    /// [`Binding`] of the built [`Recorder`].
    binding: Binding,

    /// [`failure::Strategy`] of the built [`Recorder`] to apply when an
    /// [`Error`] is encountered inside its non-`try_` methods.
    failure_strategy: FailureStrategy,
}

impl<S> Builder<S> {
    /// Sets the provided [`prometheus::Registry`] to be used by the built
    /// [`Recorder`] as both its [`Registerer`] and [`Gatherer`].
    ///
    /// When not specified, the [`prometheus::default_registry()`] is used by
    /// default.
    ///
    /// # Warning
    ///
    /// Any [`prometheus`] metrics, already registered in the provided
    /// [`prometheus::Registry`], cannot be declared via the built
    /// [`Recorder`], and trying to do so will inevitably cause an
    /// [`Error::Registration`].
    pub fn with_registry(mut self, registry: prometheus::Registry) -> Self {
        self.binding = registry.into();
        self
    }

    /// Sets the provided [`Registerer`] to be used by the built [`Recorder`]
    /// for registering newly created collectors.
    pub fn with_registerer(self, registerer: Arc<dyn Registerer>) -> Self {
        self.binding.set_registerer(registerer);
        self
    }

    /// Sets the provided [`Gatherer`] to be used by the built [`Recorder`] for
    /// gathering metrics.
    pub fn with_gatherer(self, gatherer: Arc<dyn Gatherer>) -> Self {
        self.binding.set_gatherer(gatherer);
        self
    }

    /// Sets the provided [`failure::Strategy`] to be used by the built
    /// [`Recorder`].
    ///
    /// The default [`failure::Strategy`] is [`Panic`]. See
    /// [`failure::strategy`] module for other available [`failure::Strategy`]s,
    /// or provide your own one by implementing a [`failure::Strategy`] trait.
    #[allow(clippy::missing_const_for_fn)] // false positive: drop
    pub fn with_failure_strategy<F>(self, strategy: F) -> Builder<F>
    where
        F: failure::Strategy,
    {
        Builder { binding: self.binding, failure_strategy: strategy }
    }

    /// Builds a [`Recorder`] out of this [`Builder`].
    pub fn build(self) -> Recorder<S> {
        let Self { binding, failure_strategy } = self;
        Recorder {
            storage: Storage::default(),
            binding: Arc::new(binding),
            failure_strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Recorder;
    use crate::{failure::strategy::NoOp, Error};

    crate::metric! {
        #[metric(Gauge, help = "Queue length")]
        struct QueueLength {
            queue: &'static str,
        }
    }

    crate::metric! {
        #[metric(Counter)]
        #[serde(rename = "QueueLength")]
        struct QueueLengthCounter {
            queue: &'static str,
        }
    }

    crate::metric! {
        #[metric(Histogram)]
        struct Payload {
            bytes: Vec<u8>,
        }
    }

    fn recorder() -> (prometheus::Registry, Recorder) {
        let registry = prometheus::Registry::new();
        let recorder = Recorder::builder().with_registry(registry.clone()).build();
        (registry, recorder)
    }

    #[test]
    fn sets_gauge() {
        let (registry, recorder) = recorder();

        recorder.set_gauge(&QueueLength { queue: "jobs" }, 42.0);

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_help(), "Queue length");
        let metric = &families[0].get_metric()[0];
        assert_eq!(metric.get_label()[0].get_name(), "queue");
        assert_eq!(metric.get_label()[0].get_value(), "jobs");
        assert!((metric.get_gauge().get_value() - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reports_kind_mismatch() {
        let (_, recorder) = recorder();
        recorder.set_gauge(&QueueLength { queue: "jobs" }, 1.0);

        let err = recorder
            .try_increment_counter(&QueueLengthCounter { queue: "jobs" })
            .unwrap_err();

        assert!(matches!(err, Error::KindMismatch { .. }), "{err}");
    }

    #[test]
    #[should_panic(expected = "failed to record metric")]
    fn panics_by_default() {
        let (_, recorder) = recorder();

        recorder.observe_histogram(&Payload { bytes: vec![1] }, 1.0);
    }

    #[test]
    fn ignores_errors_with_noop_strategy() {
        let registry = prometheus::Registry::new();
        let recorder = Recorder::builder()
            .with_registry(registry.clone())
            .with_failure_strategy(NoOp)
            .build();

        recorder.observe_histogram(&Payload { bytes: vec![1] }, 1.0);
        let timer = recorder.start_histogram_timer(&Payload { bytes: vec![] });
        drop(timer);

        assert!(registry.gather().is_empty());
        assert!(recorder.storage().names().is_empty());
    }

    #[test]
    fn gathers_through_swapped_gatherer() {
        let (registry, recorder) = recorder();
        let other = prometheus::Registry::new();
        recorder.set_gauge(&QueueLength { queue: "jobs" }, 1.0);

        recorder.set_gatherer(Arc::new(other));

        assert!(recorder.gather().is_empty());
        assert_eq!(registry.gather().len(), 1);
    }
}
