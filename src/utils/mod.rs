//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `ttlsub` application.
//!
//! It centralizes the broker's error type, logging initialisation and the
//! lock helper shared by every map in the broker core.

pub mod error;
pub mod logging;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the guard if a previous holder panicked.
/// Critical sections here are single map operations.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        logging::init("info");
        logging::init("debug");
        logging::init("warn");
        logging::init("nonsense");
    }

    #[test]
    fn lock_recovers_from_poison() {
        use std::sync::{Arc, Mutex};

        let shared = Arc::new(Mutex::new(1));
        let poisoner = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(shared.is_poisoned());
        assert_eq!(*super::lock(&shared), 1);
    }
}
