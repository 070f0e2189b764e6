//! Collision-resistant row id generation (§4.1).
//!
//! Mirrors the teacher's approach in `Instance::new_database_default` of sampling a
//! random alphanumeric string with `rand`'s `Alphanumeric` distribution, but restricted
//! to a URL-safe alphabet and widened to 21 characters so that, at realistic per-table
//! insert rates, collision probability stays negligible (a 21-character id drawn from a
//! 62-symbol alphabet has ~125 bits of entropy: even at one billion ids in one table the
//! collision probability is far below 1e-15, by the standard birthday-bound estimate).

use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
const DEFAULT_LEN: usize = 21;

/// Generate a new URL-safe, collision-resistant row id.
pub fn generate() -> String {
    generate_with_len(DEFAULT_LEN)
}

fn generate_with_len(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

/// `true` iff `id` is non-empty after trimming whitespace (the §4.4 `bad-id` check).
pub fn is_valid(id: &str) -> bool {
    !id.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_unique_ids() {
        let ids: HashSet<_> = (0..10_000).map(|_| generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn generated_ids_are_valid() {
        assert!(is_valid(&generate()));
        assert!(!is_valid(""));
        assert!(!is_valid("   "));
    }
}
