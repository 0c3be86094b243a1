//! Swappable [`Registerer`] and [`Gatherer`] of declared metrics.

use std::{fmt, sync::Arc};

use arc_swap::ArcSwap;

/// Accepter of newly created collectors.
pub trait Registerer: Send + Sync {
    /// Registers the provided `collector`.
    ///
    /// # Errors
    ///
    /// If the `collector` cannot be registered (duplicates an already
    /// registered one, for example).
    fn register(
        &self,
        collector: Box<dyn prometheus::core::Collector>,
    ) -> prometheus::Result<()>;
}

/// Enumerator of the current values of all the registered collectors.
pub trait Gatherer: Send + Sync {
    /// Gathers [`prometheus::proto::MetricFamily`]s of all the registered
    /// collectors.
    fn gather(&self) -> Vec<prometheus::proto::MetricFamily>;
}

impl Registerer for prometheus::Registry {
    fn register(
        &self,
        collector: Box<dyn prometheus::core::Collector>,
    ) -> prometheus::Result<()> {
        Self::register(self, collector)
    }
}

impl Gatherer for prometheus::Registry {
    fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        Self::gather(self)
    }
}

impl<R: Registerer + ?Sized> Registerer for Arc<R> {
    fn register(
        &self,
        collector: Box<dyn prometheus::core::Collector>,
    ) -> prometheus::Result<()> {
        (**self).register(collector)
    }
}

impl<G: Gatherer + ?Sized> Gatherer for Arc<G> {
    fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        (**self).gather()
    }
}

/// Currently bound pair of a [`Registerer`] and a [`Gatherer`].
#[derive(Clone)]
struct Bound {
    registerer: Arc<dyn Registerer>,
    gatherer: Arc<dyn Gatherer>,
}

/// Process-wide binding of a [`Registerer`] new collectors are registered in,
/// and a [`Gatherer`] exporters read them from.
///
/// By default, both are the [`prometheus::default_registry()`].
///
/// # Warning
///
/// Swapping the [`Registerer`] after some metrics have been already
/// registered splits them: the already registered ones stay in the previous
/// [`Registerer`], while only the new ones go to the current one. Bind
/// everything before the first metric is recorded.
pub struct Binding(ArcSwap<Bound>);

impl Binding {
    /// Creates a new [`Binding`] of the provided [`Registerer`] and
    /// [`Gatherer`].
    #[must_use]
    pub fn new(
        registerer: Arc<dyn Registerer>,
        gatherer: Arc<dyn Gatherer>,
    ) -> Self {
        Self(ArcSwap::from_pointee(Bound { registerer, gatherer }))
    }

    /// Returns the currently bound [`Registerer`].
    #[must_use]
    pub fn registerer(&self) -> Arc<dyn Registerer> {
        Arc::clone(&self.0.load().registerer)
    }

    /// Returns the currently bound [`Gatherer`].
    #[must_use]
    pub fn gatherer(&self) -> Arc<dyn Gatherer> {
        Arc::clone(&self.0.load().gatherer)
    }

    /// Binds the provided [`Registerer`], replacing the current one.
    ///
    /// See the [`Binding`] warning about swapping it after use.
    pub fn set_registerer(&self, registerer: Arc<dyn Registerer>) {
        drop(self.0.rcu(|cur| Bound {
            registerer: Arc::clone(&registerer),
            gatherer: Arc::clone(&cur.gatherer),
        }));
    }

    /// Binds the provided [`Gatherer`], replacing the current one.
    pub fn set_gatherer(&self, gatherer: Arc<dyn Gatherer>) {
        drop(self.0.rcu(|cur| Bound {
            registerer: Arc::clone(&cur.registerer),
            gatherer: Arc::clone(&gatherer),
        }));
    }
}

impl Default for Binding {
    fn default() -> Self {
        prometheus::default_registry().clone().into()
    }
}

impl From<prometheus::Registry> for Binding {
    /// Binds the provided [`prometheus::Registry`] as both [`Registerer`] and
    /// [`Gatherer`].
    fn from(registry: prometheus::Registry) -> Self {
        let registry = Arc::new(registry);
        Self::new(registry.clone(), registry)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding").finish_non_exhaustive()
    }
}
