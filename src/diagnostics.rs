//! Contract-violation reporting.
//!
//! The library distinguishes user failures (carried through
//! [`Outcome::Err`](crate::Outcome::Err)) from contract violations:
//! programming errors such as dropping an acquired continuation without
//! arming it. Violations are not recoverable; they are reported here.
//!
//! By default a violation is logged through `tracing` at error level and
//! trips a debug assertion. Tests install a thread-local hook with
//! [`with_violation_hook`] to observe violations without aborting.

use std::cell::RefCell;

use thiserror::Error;

/// A programming error detected by the continuation machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ContractViolation {
    /// An acquired, un-frozen continuation was dropped without being armed.
    #[error("acquired continuation dropped without being armed")]
    LeakedContinuation,
    /// A continuation held inside a composition was armed directly.
    #[error("frozen continuation armed directly")]
    ArmedFrozen,
    /// A released continuation was handed to a composition operator.
    #[error("released continuation passed to a composition")]
    ComposedReleased,
    /// A composition slot held a value of an unexpected type.
    #[error("composition slot type mismatch during reassembly")]
    SlotTypeMismatch,
    /// A composition delivered fewer slots than its signature requires.
    #[error("composition slot count mismatch during reassembly")]
    SlotArityMismatch,
}

type Hook = Box<dyn FnMut(ContractViolation)>;

thread_local! {
    static HOOK: RefCell<Option<Hook>> = const { RefCell::new(None) };
}

/// Installs `hook` as this thread's violation observer for the duration of
/// `f`, restoring the previous observer afterwards.
///
/// Intended for tests that deliberately provoke violations.
pub fn with_violation_hook<R>(
    hook: impl FnMut(ContractViolation) + 'static,
    f: impl FnOnce() -> R,
) -> R {
    struct Restore(Option<Hook>);

    impl Drop for Restore {
        fn drop(&mut self) {
            HOOK.with(|slot| *slot.borrow_mut() = self.0.take());
        }
    }

    let previous = HOOK.with(|slot| slot.borrow_mut().replace(Box::new(hook)));
    let _restore = Restore(previous);
    f()
}

/// Reports a contract violation.
///
/// Dispatches to the thread-local hook when one is installed; otherwise
/// logs at error level and trips a debug assertion.
pub(crate) fn report(violation: ContractViolation) {
    let hooked = HOOK.with(|slot| {
        if let Some(hook) = slot.borrow_mut().as_mut() {
            hook(violation);
            true
        } else {
            false
        }
    });
    if !hooked {
        tracing::error!(target: "deferral", %violation, "contract violation");
        debug_assert!(false, "contract violation: {violation}");
    }
}
