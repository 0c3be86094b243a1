//! Metric kinds and [`prometheus`] collectors backing them.

use std::fmt;

use sealed::sealed;
use smallvec::SmallVec;

use crate::record::Declaration;

#[doc(inline)]
pub use self::bundle::{Bundle, Either};

/// Kind of a declared metric.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    /// Monotonically increasing integer counter.
    Counter,

    /// Arbitrary floating point value, which can go up and down.
    Gauge,

    /// Distribution of observed floating point values.
    Histogram,
}

impl Kind {
    /// Returns an initializer of a fresh [`Collector`] of this [`Kind`] bound
    /// to the name, help and label names of the provided [`Declaration`].
    ///
    /// A [`Declaration`] without labels is backed by a single [`prometheus`]
    /// metric, otherwise by a [`prometheus`] metric vector.
    ///
    /// Nothing is allocated until the returned initializer is invoked.
    pub fn initializer(
        self,
        decl: &Declaration,
    ) -> impl FnOnce() -> prometheus::Result<Collector> + '_ {
        move || {
            Ok(match self {
                Self::Counter => Collector::Counter(decl.try_into()?),
                Self::Gauge => Collector::Gauge(decl.try_into()?),
                Self::Histogram => Collector::Histogram(decl.try_into()?),
            })
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        })
    }
}

/// Marker of a metric [`Kind`], used as [`Record::Kind`].
///
/// [`Record::Kind`]: crate::Record::Kind
#[sealed]
pub trait Type {
    /// [`Kind`] this marker stands for.
    const KIND: Kind;

    /// [`Bundle`] of [`prometheus`] metrics backing this [`Kind`].
    type Bundle: Bundle;

    /// Extracts the [`Bundle`] of this [`Kind`] out of the provided
    /// [`Collector`], if it has the matching [`Kind`].
    fn bundle(collector: &Collector) -> Option<&Self::Bundle>;
}

/// [`Kind::Counter`] marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct Counter;

#[sealed]
impl Type for Counter {
    const KIND: Kind = Kind::Counter;

    type Bundle = PrometheusIntCounter;

    fn bundle(collector: &Collector) -> Option<&Self::Bundle> {
        match collector {
            Collector::Counter(b) => Some(b),
            Collector::Gauge(_) | Collector::Histogram(_) => None,
        }
    }
}

/// [`Kind::Gauge`] marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gauge;

#[sealed]
impl Type for Gauge {
    const KIND: Kind = Kind::Gauge;

    type Bundle = PrometheusGauge;

    fn bundle(collector: &Collector) -> Option<&Self::Bundle> {
        match collector {
            Collector::Gauge(b) => Some(b),
            Collector::Counter(_) | Collector::Histogram(_) => None,
        }
    }
}

/// [`Kind::Histogram`] marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct Histogram;

#[sealed]
impl Type for Histogram {
    const KIND: Kind = Kind::Histogram;

    type Bundle = PrometheusHistogram;

    fn bundle(collector: &Collector) -> Option<&Self::Bundle> {
        match collector {
            Collector::Histogram(b) => Some(b),
            Collector::Counter(_) | Collector::Gauge(_) => None,
        }
    }
}

/// [`prometheus`] collector created for a declared metric.
///
/// Cloning is cheap, and all the clones share the same underlying values.
#[derive(Clone)]
pub enum Collector {
    /// [`Kind::Counter`] collector.
    Counter(PrometheusIntCounter),

    /// [`Kind::Gauge`] collector.
    Gauge(PrometheusGauge),

    /// [`Kind::Histogram`] collector.
    Histogram(PrometheusHistogram),
}

impl Collector {
    /// Returns the [`Kind`] of this [`Collector`].
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Counter(_) => Kind::Counter,
            Self::Gauge(_) => Kind::Gauge,
            Self::Histogram(_) => Kind::Histogram,
        }
    }
}

// Not derived, as `prometheus` metric vectors don't implement `Debug`
// uniformly across versions.
impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use prometheus::core::Collector as _;

        let names = self
            .desc()
            .into_iter()
            .map(|d| d.fq_name.as_str())
            .collect::<SmallVec<[_; 1]>>();
        f.debug_struct("Collector")
            .field("kind", &self.kind())
            .field("names", &names)
            .finish()
    }
}

impl prometheus::core::Collector for Collector {
    fn desc(&self) -> Vec<&prometheus::core::Desc> {
        match self {
            Self::Counter(m) => m.desc(),
            Self::Gauge(m) => m.desc(),
            Self::Histogram(m) => m.desc(),
        }
    }

    fn collect(&self) -> Vec<prometheus::proto::MetricFamily> {
        match self {
            Self::Counter(m) => m.collect(),
            Self::Gauge(m) => m.collect(),
            Self::Histogram(m) => m.collect(),
        }
    }
}

trait To<T> {
    fn to(&self) -> T;
}

impl To<prometheus::Opts> for Declaration {
    fn to(&self) -> prometheus::Opts {
        prometheus::Opts::new(self.name, self.help_or_name())
    }
}

impl To<prometheus::HistogramOpts> for Declaration {
    fn to(&self) -> prometheus::HistogramOpts {
        let opts =
            prometheus::HistogramOpts::new(self.name, self.help_or_name());
        if self.buckets.is_empty() {
            opts
        } else {
            opts.buckets(self.buckets.to_vec())
        }
    }
}

/// [`Bundle`] backing a [`Kind::Counter`].
pub type PrometheusIntCounter =
    Either<prometheus::IntCounter, prometheus::IntCounterVec>;

impl TryFrom<&Declaration> for PrometheusIntCounter {
    type Error = prometheus::Error;

    fn try_from(decl: &Declaration) -> Result<Self, Self::Error> {
        Ok(if decl.labels.is_empty() {
            Self::Single(prometheus::IntCounter::with_opts(decl.to())?)
        } else {
            let label_names = decl.labels.names().collect::<SmallVec<[_; 10]>>();
            Self::Vec(prometheus::IntCounterVec::new(decl.to(), &label_names)?)
        })
    }
}

/// [`Bundle`] backing a [`Kind::Gauge`].
pub type PrometheusGauge = Either<prometheus::Gauge, prometheus::GaugeVec>;

impl TryFrom<&Declaration> for PrometheusGauge {
    type Error = prometheus::Error;

    fn try_from(decl: &Declaration) -> Result<Self, Self::Error> {
        Ok(if decl.labels.is_empty() {
            Self::Single(prometheus::Gauge::with_opts(decl.to())?)
        } else {
            let label_names = decl.labels.names().collect::<SmallVec<[_; 10]>>();
            Self::Vec(prometheus::GaugeVec::new(decl.to(), &label_names)?)
        })
    }
}

/// [`Bundle`] backing a [`Kind::Histogram`].
pub type PrometheusHistogram =
    Either<prometheus::Histogram, prometheus::HistogramVec>;

impl TryFrom<&Declaration> for PrometheusHistogram {
    type Error = prometheus::Error;

    fn try_from(decl: &Declaration) -> Result<Self, Self::Error> {
        Ok(if decl.labels.is_empty() {
            Self::Single(prometheus::Histogram::with_opts(decl.to())?)
        } else {
            let label_names = decl.labels.names().collect::<SmallVec<[_; 10]>>();
            Self::Vec(prometheus::HistogramVec::new(decl.to(), &label_names)?)
        })
    }
}

pub mod bundle {
    //! Single-or-vector bundles of [`prometheus`] metrics.

    use sealed::sealed;
    use smallvec::SmallVec;

    use crate::record::Labels;

    /// Either a single unlabeled [`prometheus`] metric, or a vector of them
    /// partitioned by label values.
    #[derive(Clone, Copy, Debug)]
    pub enum Either<Single, Vec> {
        /// Single unlabeled metric.
        Single(Single),

        /// Vector of metrics partitioned by label values.
        Vec(Vec),
    }

    impl<S, V> prometheus::core::Collector for Either<S, V>
    where
        S: prometheus::core::Collector,
        V: prometheus::core::Collector,
    {
        fn desc(&self) -> Vec<&prometheus::core::Desc> {
            match self {
                Self::Single(m) => m.desc(),
                Self::Vec(v) => v.desc(),
            }
        }

        fn collect(&self) -> Vec<prometheus::proto::MetricFamily> {
            match self {
                Self::Single(m) => m.collect(),
                Self::Vec(v) => v.collect(),
            }
        }
    }

    /// Bundle of [`prometheus`] metrics of the same kind.
    #[sealed]
    pub trait Bundle {
        /// Single [`prometheus`] metric of this [`Bundle`].
        type Single: prometheus::core::Metric;

        /// Returns the single [`prometheus`] metric of this [`Bundle`] bound to
        /// the values of the provided [`Labels`].
        ///
        /// # Errors
        ///
        /// If the number of the provided [`Labels`] doesn't match the label
        /// names this [`Bundle`] was created with.
        fn get_single_metric(
            &self,
            labels: &Labels,
        ) -> prometheus::Result<Self::Single>;
    }

    #[sealed]
    impl<M, B> Bundle for Either<M, prometheus::core::MetricVec<B>>
    where
        M: prometheus::core::Metric + Clone,
        B: prometheus::core::MetricVecBuilder<M = M>,
    {
        type Single = M;

        fn get_single_metric(&self, labels: &Labels) -> prometheus::Result<M> {
            match self {
                Self::Single(c) => {
                    if labels.is_empty() {
                        Ok(c.clone())
                    } else {
                        Err(prometheus::Error::InconsistentCardinality {
                            expect: 0,
                            got: labels.len(),
                        })
                    }
                }
                Self::Vec(v) => {
                    let values = labels.values().collect::<SmallVec<[_; 10]>>();
                    v.get_metric_with_label_values(&values)
                }
            }
        }
    }
}
