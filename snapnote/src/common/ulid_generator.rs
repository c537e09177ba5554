//! Monotonic ULID generator
//!
//! Note ids are ULIDs: a millisecond timestamp followed by random bits. A single
//! process-wide generator guarantees that ids handed out by this process are
//! strictly increasing, even within the same millisecond.

use std::sync::{Mutex, OnceLock};
use ulid::{Generator, Ulid};

static ULID_GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();

fn get_generator() -> &'static Mutex<Generator> {
    ULID_GENERATOR.get_or_init(|| Mutex::new(Generator::new()))
}

/// Generate a ULID strictly greater than every previous one from this process
///
/// If the random component overflows within a single millisecond the
/// generator cannot stay monotonic; a fresh random ULID is returned instead,
/// which is still unique with overwhelming probability.
pub fn generate_monotonic_ulid() -> Ulid {
    let mut gen = get_generator()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    gen.generate().unwrap_or_else(|_| Ulid::new())
}

/// Generate a monotonic ULID in its 26 character string form
pub fn generate_monotonic_ulid_string() -> String {
    generate_monotonic_ulid().to_string()
}
