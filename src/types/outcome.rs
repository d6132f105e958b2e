//! Three-valued outcome type with severity lattice.
//!
//! The outcome type represents the result of a deferred computation stage:
//!
//! - `Ok(T)`: Success with value
//! - `Err(E)`: Application failure
//! - `Cancelled`: The chain was stopped cooperatively
//!
//! These form a severity lattice: `Ok < Err < Cancelled`
//!
//! Every value that crosses a stage boundary travels inside an `Outcome`,
//! and each receiver observes exactly one of them.

use core::fmt;

/// The three-valued outcome of a deferred computation stage.
///
/// Forms a severity lattice where worse outcomes dominate:
/// `Ok < Err < Cancelled`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// Success with a value.
    Ok(T),
    /// Application-level failure.
    Err(E),
    /// The chain was stopped; downstream stages do not run.
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    /// Returns the severity level of this outcome (0 = Ok, 2 = Cancelled).
    #[must_use]
    pub const fn severity(&self) -> u8 {
        match self {
            Self::Ok(_) => 0,
            Self::Err(_) => 1,
            Self::Cancelled => 2,
        }
    }

    /// Returns true if this outcome is `Ok`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true if this outcome is `Err`.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Returns true if this outcome is `Cancelled`.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Converts this outcome to a standard Result, with cancellation as an error.
    ///
    /// This is useful when interfacing with code that expects `Result`.
    pub fn into_result(self) -> Result<T, OutcomeError<E>> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(OutcomeError::Err(e)),
            Self::Cancelled => Err(OutcomeError::Cancelled),
        }
    }

    /// Returns the success value, discarding failure and cancellation.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the failure value, discarding success and cancellation.
    pub fn err(self) -> Option<E> {
        match self {
            Self::Err(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the success value using the provided function.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U, E> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Err(e) => Outcome::Err(e),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    /// Maps the failure value using the provided function.
    pub fn map_err<F2, G: FnOnce(E) -> F2>(self, g: G) -> Outcome<T, F2> {
        match self {
            Self::Ok(v) => Outcome::Ok(v),
            Self::Err(e) => Outcome::Err(g(e)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    /// Returns the success value or panics.
    ///
    /// # Panics
    ///
    /// Panics if the outcome is not `Ok`.
    #[track_caller]
    pub fn unwrap(self) -> T
    where
        E: fmt::Debug,
    {
        match self {
            Self::Ok(v) => v,
            Self::Err(e) => panic!("called `Outcome::unwrap()` on an `Err` value: {e:?}"),
            Self::Cancelled => panic!("called `Outcome::unwrap()` on a `Cancelled` value"),
        }
    }

    /// Returns the success value or a default.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Self::Ok(v) => v,
            _ => default,
        }
    }

    /// Returns the success value or computes it from a closure.
    pub fn unwrap_or_else<F: FnOnce() -> T>(self, f: F) -> T {
        match self {
            Self::Ok(v) => v,
            _ => f(),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(e),
        }
    }
}

/// Error type for converting an Outcome to a Result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeError<E> {
    /// Application failure.
    Err(E),
    /// Cancellation.
    Cancelled,
}

impl<E: fmt::Display> fmt::Display for OutcomeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Err(e) => write!(f, "{e}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for OutcomeError<E> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        let ok: Outcome<i32, &str> = Outcome::Ok(42);
        let err: Outcome<i32, &str> = Outcome::Err("error");
        let cancelled: Outcome<i32, &str> = Outcome::Cancelled;

        assert!(ok.severity() < err.severity());
        assert!(err.severity() < cancelled.severity());
    }

    #[test]
    fn predicates() {
        let ok: Outcome<i32, &str> = Outcome::Ok(42);
        let err: Outcome<i32, &str> = Outcome::Err("error");
        let cancelled: Outcome<i32, &str> = Outcome::Cancelled;

        assert!(ok.is_ok() && !ok.is_err() && !ok.is_cancelled());
        assert!(err.is_err() && !err.is_ok());
        assert!(cancelled.is_cancelled() && !cancelled.is_ok());
    }

    #[test]
    fn map_transforms_ok_value() {
        let ok: Outcome<i32, &str> = Outcome::Ok(21);
        assert_eq!(ok.map(|x| x * 2), Outcome::Ok(42));
    }

    #[test]
    fn map_preserves_err_and_cancelled() {
        let err: Outcome<i32, &str> = Outcome::Err("error");
        assert_eq!(err.map(|x| x * 2), Outcome::Err("error"));

        let cancelled: Outcome<i32, &str> = Outcome::Cancelled;
        assert!(cancelled.map(|x| x * 2).is_cancelled());
    }

    #[test]
    fn map_err_transforms_err_value() {
        let err: Outcome<i32, &str> = Outcome::Err("short");
        assert_eq!(err.map_err(str::len), Outcome::Err(5));

        let ok: Outcome<i32, &str> = Outcome::Ok(42);
        assert_eq!(ok.map_err(str::len), Outcome::Ok(42));
    }

    #[test]
    fn into_result_round_trips() {
        let ok: Outcome<i32, &str> = Outcome::Ok(42);
        assert_eq!(ok.into_result(), Ok(42));

        let err: Outcome<i32, &str> = Outcome::Err("error");
        assert_eq!(err.into_result(), Err(OutcomeError::Err("error")));

        let cancelled: Outcome<i32, &str> = Outcome::Cancelled;
        assert_eq!(cancelled.into_result(), Err(OutcomeError::Cancelled));
    }

    #[test]
    fn from_result() {
        let ok: Outcome<i32, &str> = Result::Ok(42).into();
        assert_eq!(ok, Outcome::Ok(42));

        let err: Outcome<i32, &str> = Result::Err("error").into();
        assert_eq!(err, Outcome::Err("error"));
    }

    #[test]
    #[should_panic(expected = "called `Outcome::unwrap()` on an `Err` value")]
    fn unwrap_panics_on_err() {
        let err: Outcome<i32, &str> = Outcome::Err("error");
        let _ = err.unwrap();
    }

    #[test]
    fn unwrap_or_returns_default_on_cancelled() {
        let cancelled: Outcome<i32, &str> = Outcome::Cancelled;
        assert_eq!(cancelled.unwrap_or(99), 99);
    }

    #[test]
    fn outcome_error_display() {
        let error: OutcomeError<&str> = OutcomeError::Err("application error");
        assert_eq!(format!("{error}"), "application error");

        let cancelled: OutcomeError<&str> = OutcomeError::Cancelled;
        assert_eq!(format!("{cancelled}"), "cancelled");
    }
}
