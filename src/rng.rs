//! Scoped access to the ambient random number generator.
//!
//! Samplers (rollback correction, sampled origin times) draw from a
//! thread-local ambient [StdRng]. A [SeededRngScope] temporarily installs a
//! seeded generator and restores the caller's generator when dropped, which
//! also happens while unwinding from a panic.
//!
//! ```
//! use hstrat::rng::{SeededRngScope, with_ambient_rng};
//! use rand::Rng;
//!
//! let first = {
//!     let _scope = SeededRngScope::enter(Some(7));
//!     with_ambient_rng(|rng| rng.gen_range(0..1_000_000u64))
//! };
//! let second = {
//!     let _scope = SeededRngScope::enter(Some(7));
//!     with_ambient_rng(|rng| rng.gen_range(0..1_000_000u64))
//! };
//! assert_eq!(first, second);
//! ```

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::cell::RefCell;

thread_local! {
    static AMBIENT_RNG: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());
}

/// Runs `f` with exclusive access to this thread's ambient generator.
///
/// # Panics
/// Panics if called re-entrantly from within `f`.
pub fn with_ambient_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    AMBIENT_RNG.with(|rng| f(&mut rng.borrow_mut()))
}

// =#========================================================================#=
// SEEDED RNG SCOPE
// =#========================================================================#=
/// Guard that installs a seeded ambient generator for its lifetime.
///
/// With `seed = None` the guard is inert and the caller's generator state is
/// used directly.
#[must_use = "the previous generator is restored as soon as the scope is dropped"]
pub struct SeededRngScope {
    saved: Option<StdRng>,
}

impl SeededRngScope {
    /// Enters a new scope, seeding the ambient generator if `seed` is given.
    pub fn enter(seed: Option<u64>) -> Self {
        let saved = seed.map(|seed| {
            AMBIENT_RNG.with(|rng| {
                std::mem::replace(&mut *rng.borrow_mut(), StdRng::seed_from_u64(seed))
            })
        });
        SeededRngScope { saved }
    }

    /// Returns whether this scope replaced the caller's generator.
    pub fn is_seeded(&self) -> bool {
        self.saved.is_some()
    }
}

impl Drop for SeededRngScope {
    fn drop(&mut self) {
        if let Some(previous) = self.saved.take() {
            // Thread-local may already be torn down at thread exit
            let _ = AMBIENT_RNG.try_with(|rng| {
                if let Ok(mut current) = rng.try_borrow_mut() {
                    *current = previous;
                }
            });
        }
    }
}
