//! Definitions for dealing with an [`Error`] of recording a metric.

use crate::Error;

#[doc(inline)]
pub use self::strategy::Strategy;

/// Possible actions on an [`Error`] encountered by a non-`try_` [`Recorder`]
/// method.
///
/// [`Recorder`]: crate::Recorder
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Log the [`Error`] and skip the operation.
    NoOp,

    /// Panic with the encountered [`Error`].
    Panic,
}

/// Strategies for dealing with an [`Error`].
pub mod strategy {
    use super::{Action, Error};

    /// Strategy deciding which [`Action`] should be performed on an [`Error`]
    /// encountered by a non-`try_` [`Recorder`] method.
    ///
    /// [`Recorder`]: crate::Recorder
    pub trait Strategy {
        /// Inspects the encountered [`Error`] and returns the [`Action`] to be
        /// performed.
        fn decide(&self, err: &Error) -> Action;
    }

    /// [`Strategy`] returning always [`Action::NoOp`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct NoOp;

    impl Strategy for NoOp {
        fn decide(&self, _: &Error) -> Action {
            Action::NoOp
        }
    }

    /// [`Strategy`] returning always [`Action::Panic`].
    ///
    /// This is the default one, as any [`Error`] signals a misdeclared metric.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Panic;

    impl Strategy for Panic {
        fn decide(&self, _: &Error) -> Action {
            Action::Panic
        }
    }

    /// [`Strategy`] returning an [`Action::Panic`] in debug mode, and
    /// [`Action::NoOp`] in release mode.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct PanicInDebugNoOpInRelease;

    impl Strategy for PanicInDebugNoOpInRelease {
        fn decide(&self, _: &Error) -> Action {
            #[cfg(debug_assertions)]
            {
                Action::Panic
            }
            #[cfg(not(debug_assertions))]
            {
                Action::NoOp
            }
        }
    }
}
