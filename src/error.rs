//! Errors of declaring and recording metrics.

use crate::metric::Kind;

/// Error of recording a metric via its declarative [`Record`].
///
/// All the variants indicate a programming or configuration defect rather
/// than a transient condition, so none of them is worth retrying.
///
/// [`Record`]: crate::Record
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// [`Record`] cannot be turned into a [`Declaration`].
    ///
    /// [`Declaration`]: crate::Declaration
    /// [`Record`]: crate::Record
    #[error("cannot introspect metric record: {source}")]
    Introspection {
        /// Reason of the introspection failure.
        #[from]
        source: IntrospectionError,
    },

    /// Metric with the same name is already registered as another [`Kind`].
    #[error(
        "`{name}` metric is registered as a {registered}, but declared as \
         a {declared}"
    )]
    KindMismatch {
        /// Name of the metric.
        name: String,

        /// [`Kind`] the metric was registered with.
        registered: Kind,

        /// [`Kind`] the metric is declared with now.
        declared: Kind,
    },

    /// Metric with the same name is already registered with other labels.
    #[error(
        "`{name}` metric is registered with labels {registered:?}, but \
         declared with labels {declared:?}"
    )]
    LabelsMismatch {
        /// Name of the metric.
        name: String,

        /// Label names the metric was registered with.
        registered: Vec<&'static str>,

        /// Label names the metric is declared with now.
        declared: Vec<&'static str>,
    },

    /// [`Registerer`] refused to accept a newly created collector.
    ///
    /// [`Registerer`]: crate::backend::Registerer
    #[error("failed to register `{name}` metric: {source}")]
    Registration {
        /// Name of the metric.
        name: String,

        /// Error returned by the [`Registerer`].
        ///
        /// [`Registerer`]: crate::backend::Registerer
        #[source]
        source: prometheus::Error,
    },

    /// [`prometheus`] failed to build a collector or to bind label values to
    /// it.
    #[error("invalid `{name}` metric: {source}")]
    Collector {
        /// Name of the metric.
        name: String,

        /// Error returned by [`prometheus`].
        #[source]
        source: prometheus::Error,
    },
}

/// Error of turning a [`Record`] into a [`Declaration`].
///
/// [`Declaration`]: crate::Declaration
/// [`Record`]: crate::Record
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum IntrospectionError {
    /// [`Record`] is not serialized as a struct.
    ///
    /// [`Record`]: crate::Record
    #[error("record must be a struct with named fields, not {0}")]
    NotAStruct(&'static str),

    /// Field of a [`Record`] cannot be represented as a label value.
    ///
    /// [`Record`]: crate::Record
    #[error("`{field}` label must be a scalar value, not {found}")]
    NonScalarLabel {
        /// Name of the offending field.
        field: &'static str,

        /// Shape of the value found in the field.
        found: &'static str,
    },

    /// Custom error raised by a [`serde::Serialize`] implementation.
    #[error("{0}")]
    Custom(String),
}

impl serde::ser::Error for IntrospectionError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}
