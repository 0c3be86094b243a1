//! Storage of collectors created for declared metrics.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{backend::Binding, metric::Collector, record::Declaration, Error};

/// Thread-safe [`HashMap`] a [`Storage`] is built upon.
pub type Map<K, V> = Arc<RwLock<HashMap<K, V>>>;

/// Name identifying a [`Collector`] in a [`Storage`].
pub type KeyName = String;

/// [`Collector`] stored along with the label names it was created with.
#[derive(Clone, Debug)]
struct Entry {
    collector: Collector,
    label_names: Arc<[&'static str]>,
}

impl Entry {
    /// Checks whether the provided [`Declaration`] matches the schema this
    /// [`Entry`] was created with.
    fn verify(&self, decl: &Declaration) -> Result<(), Error> {
        let registered = self.collector.kind();
        if registered != decl.kind {
            return Err(Error::KindMismatch {
                name: decl.name.into(),
                registered,
                declared: decl.kind,
            });
        }
        if !self.label_names.iter().copied().eq(decl.labels.names()) {
            return Err(Error::LabelsMismatch {
                name: decl.name.into(),
                registered: self.label_names.to_vec(),
                declared: decl.labels.names().collect(),
            });
        }
        Ok(())
    }
}

/// Storage of [`Collector`]s, creating and registering each of them exactly
/// once per metric name.
///
/// Resolving an already stored [`Collector`] takes just a [`read`-lock] on a
/// [`HashMap`] plus a [`Collector`] cloning. Only the very first resolving of
/// a metric name takes a [`write`-lock].
///
/// [`read`-lock]: RwLock::read()
/// [`write`-lock]: RwLock::write()
#[derive(Clone, Default)]
pub struct Storage {
    collectors: Map<KeyName, Entry>,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("names", &self.names())
            .finish()
    }
}

impl Storage {
    /// Returns the [`Collector`] stored for the provided [`Declaration`],
    /// creating and registering it in the [`Registerer`] of the provided
    /// [`Binding`], if there is none yet.
    ///
    /// A new [`Collector`] is registered before being stored, so it's never
    /// observed unregistered. Concurrent callers resolving the same metric
    /// name for the first time all receive the same [`Collector`].
    ///
    /// # Errors
    ///
    /// - If the [`Declaration`] doesn't match the [`Kind`] or label names of
    ///   the already stored [`Collector`].
    /// - If [`prometheus`] fails to create the [`Collector`].
    /// - If the [`Registerer`] refuses to register the newly created
    ///   [`Collector`]. Nothing is stored in such case, so the next call
    ///   retries.
    ///
    /// [`Kind`]: crate::metric::Kind
    /// [`Registerer`]: crate::backend::Registerer
    pub fn resolve(
        &self,
        decl: &Declaration,
        binding: &Binding,
    ) -> Result<Collector, Error> {
        // A poisoned lock still guards a consistent `Map`, as an `Entry` is
        // inserted only after its collector has been registered.
        if let Some(entry) = self
            .collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(decl.name)
        {
            entry.verify(decl)?;
            return Ok(entry.collector.clone());
        }

        let mut storage =
            self.collectors.write().unwrap_or_else(PoisonError::into_inner);

        // Somebody may have registered it while we were waiting for the lock.
        if let Some(entry) = storage.get(decl.name) {
            entry.verify(decl)?;
            return Ok(entry.collector.clone());
        }

        let init = decl.kind.initializer(decl);
        let collector = init().map_err(|source| Error::Collector {
            name: decl.name.into(),
            source,
        })?;

        // We should register in the `Registerer` before storing in our
        // `Map`. This way the failed registration is retried on next use.
        binding
            .registerer()
            .register(Box::new(collector.clone()))
            .map_err(|source| Error::Registration {
                name: decl.name.into(),
                source,
            })?;

        tracing::debug!(
            metric = decl.name,
            kind = %decl.kind,
            labels = ?decl.labels.names().collect::<Vec<_>>(),
            "registered new collector"
        );

        drop(storage.insert(
            decl.name.into(),
            Entry {
                collector: collector.clone(),
                label_names: decl.labels.names().collect(),
            },
        ));

        Ok(collector)
    }

    /// Returns names of all the metrics stored in this [`Storage`], sorted.
    #[must_use]
    pub fn names(&self) -> Vec<KeyName> {
        let mut names = self
            .collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}
