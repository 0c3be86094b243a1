//! Declarative metric [`Record`]s and their introspection into
//! [`Declaration`]s.

mod ser;

use smallvec::SmallVec;

use crate::{
    error::IntrospectionError,
    metric::{self, Kind},
};

/// Plain data record declaring a metric.
///
/// The metric name is the name of the serialized struct (the type name,
/// unless renamed via `#[serde(rename = "...")]`), and every serialized field
/// becomes a label, in declaration order: the field name is the label name,
/// and the field value rendered as a string is the label value.
///
/// Label values must be scalars: booleans, numbers, chars, strings, unit enum
/// variants, or newtypes and [`Option`]s of them ([`None`] renders as an
/// empty string). Anything else fails with an [`IntrospectionError`].
///
/// All the [`Record`]s sharing the same metric name must declare the same
/// [`Kind`] and the same label names.
///
/// Usually, implemented via the [`metric!`] macro, but may be implemented
/// manually as well:
/// ```rust
/// use declarative_prometheus::{metric::Counter, Record};
///
/// #[derive(serde::Serialize)]
/// struct NumberOfHits {
///     method: &'static str,
///     code: u16,
/// }
///
/// impl Record for NumberOfHits {
///     type Kind = Counter;
///
///     const HELP: &'static str = "Number of handled requests.";
/// }
/// ```
///
/// [`metric!`]: crate::metric!
pub trait Record: serde::Serialize {
    /// [`metric::Type`] marker of this [`Record`]'s [`Kind`].
    type Kind: metric::Type;

    /// Help description of the metric.
    ///
    /// The metric name is used when empty.
    const HELP: &'static str = "";

    /// Buckets of a [`Kind::Histogram`] metric.
    ///
    /// [`prometheus::DEFAULT_BUCKETS`] are used when empty. Ignored for other
    /// [`Kind`]s.
    const BUCKETS: &'static [f64] = &[];
}

/// Metric identity and labels derived from a single [`Record`] instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    /// Name of the metric.
    pub name: &'static str,

    /// Help description of the metric.
    pub help: &'static str,

    /// [`Kind`] of the metric.
    pub kind: Kind,

    /// [`Labels`] of the metric, in field declaration order.
    pub labels: Labels,

    /// Buckets of a [`Kind::Histogram`] metric.
    pub buckets: &'static [f64],
}

impl Declaration {
    /// Introspects the provided [`Record`] into a [`Declaration`].
    ///
    /// Introspecting the same [`Record`] value always gives the same
    /// [`Declaration`].
    ///
    /// # Errors
    ///
    /// If the [`Record`] is not serialized as a struct, or any of its fields
    /// is not a scalar value.
    pub fn of<R: Record>(record: &R) -> Result<Self, IntrospectionError> {
        let ser::Shape { name, labels } =
            record.serialize(ser::RecordSerializer)?;
        Ok(Self {
            name,
            help: R::HELP,
            kind: <R::Kind as metric::Type>::KIND,
            labels,
            buckets: R::BUCKETS,
        })
    }

    /// Returns the help description of this [`Declaration`], falling back to
    /// its name, as `prometheus` crate doesn't allow an empty one.
    pub(crate) fn help_or_name(&self) -> &'static str {
        if self.help.is_empty() {
            self.name
        } else {
            self.help
        }
    }
}

/// Ordered label name to label value pairs of a [`Declaration`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Labels(SmallVec<[(&'static str, String); 8]>);

impl Labels {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self(SmallVec::with_capacity(cap))
    }

    pub(crate) fn push(&mut self, name: &'static str, value: String) {
        self.0.push((name, value));
    }

    /// Returns the number of these [`Labels`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether there are no [`Labels`] at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over label names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(n, _)| *n)
    }

    /// Iterates over label values, in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }

    /// Iterates over label name and value pairs, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(n, v)| (*n, v.as_str()))
    }
}

/// Declares a metric [`Record`] struct.
///
/// Doc comments may precede the `#[metric(...)]` attribute, which must come
/// before any other one. It names the [`metric::Type`] (`Counter`, `Gauge` or
/// `Histogram`) and, optionally, the `help` description and histogram
/// `buckets`, in this order. Any other attributes (including `serde` ones)
/// follow it.
///
/// The generated struct derives [`serde::Serialize`], so the `serde` crate
/// must be a dependency of the calling crate.
///
/// # Example
///
/// ```rust
/// declarative_prometheus::metric! {
///     #[metric(Counter, help = "Counter that tracks how many calls were made")]
///     #[derive(Clone, Debug)]
///     pub struct NumberOfHits {
///         pub method: &'static str,
///         pub some_other_label: String,
///     }
/// }
///
/// declarative_prometheus::metric! {
///     /// Duration of the `hello()` calls.
///     #[metric(Histogram, buckets = &[0.25, 0.5, 1.0])]
///     pub struct HitDuration {
///         pub method: &'static str,
///         pub some_other_label: f64,
///     }
/// }
///
/// declarative_prometheus::metric! {
///     #[metric(Gauge, help = "Seconds since the start")]
///     pub struct Uptime;
/// }
///
/// let decl = declarative_prometheus::Declaration::of(&HitDuration {
///     method: "hello()",
///     some_other_label: 123.123,
/// })?;
/// assert_eq!(decl.name, "HitDuration");
/// assert_eq!(
///     decl.labels.iter().collect::<Vec<_>>(),
///     [("method", "hello()"), ("some_other_label", "123.123")],
/// );
/// # Ok::<_, declarative_prometheus::error::IntrospectionError>(())
/// ```
#[macro_export]
macro_rules! metric {
    (
        $(#[doc = $doc:expr])*
        #[metric(
            $kind:ident
            $(, help = $help:literal)?
            $(, buckets = $buckets:expr)?
            $(,)?
        )]
        $(#[$attr:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_attr:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(::serde::Serialize)]
        $(#[$attr])*
        $vis struct $name {
            $(
                $(#[$field_attr])*
                $field_vis $field: $ty,
            )*
        }

        $crate::metric!(@record $name, $kind $(, $help)?; $($buckets)?);
    };

    (
        $(#[doc = $doc:expr])*
        #[metric(
            $kind:ident
            $(, help = $help:literal)?
            $(, buckets = $buckets:expr)?
            $(,)?
        )]
        $(#[$attr:meta])*
        $vis:vis struct $name:ident;
    ) => {
        $(#[doc = $doc])*
        #[derive(::serde::Serialize)]
        $(#[$attr])*
        $vis struct $name;

        $crate::metric!(@record $name, $kind $(, $help)?; $($buckets)?);
    };

    (@record $name:ident, $kind:ident $(, $help:tt)?; $($buckets:tt)?) => {
        impl $crate::Record for $name {
            type Kind = $crate::metric::$kind;

            $(const HELP: &'static str = $help;)?

            $(const BUCKETS: &'static [f64] = $buckets;)?
        }
    };
}
