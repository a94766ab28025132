//! Unique key generation for root documents.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Length of generated keys. Twelve mixed-case alphanumerics give roughly
/// 71 bits of entropy, which is ample for a process-scoped store.
const KEY_LENGTH: usize = 12;

/// Produces printable, collision-free keys for root documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyGenerator;

impl KeyGenerator {
    /// Builds a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns a fresh key not currently in use.
    ///
    /// `in_use` reports whether a candidate already exists as a key; the
    /// generator retries until it draws an unused token. With 62^12
    /// candidates the retry loop is effectively never taken.
    pub fn next<F>(&self, in_use: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        loop {
            let candidate = sample();
            if !in_use(&candidate) {
                return candidate;
            }
        }
    }
}

fn sample() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_printable_and_fixed_length() {
        let generator = KeyGenerator::new();
        let key = generator.next(|_| false);
        assert_eq!(key.len(), KEY_LENGTH);
        assert!(key.chars().all(|character| character.is_ascii_alphanumeric()));
    }

    #[test]
    fn sequential_keys_are_distinct() {
        let generator = KeyGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generator.next(|_| false)));
        }
    }

    #[test]
    fn generator_skips_keys_in_use() {
        let generator = KeyGenerator::new();
        let taken = generator.next(|_| false);
        let fresh = generator.next(|candidate| candidate == taken);
        assert_ne!(taken, fresh);
    }
}
