//! Upload session identifiers
//!
//! A session id correlates every chunk of one file's upload into a single
//! server-side reassembly. It combines the current Unix time in
//! milliseconds with a short random base-36 suffix, e.g.
//! `1717171717171-k3j9x0q2a`.
//!
//! Uniqueness only needs to hold for the lifetime of an upload session, so
//! the id is not cryptographically strong.

use rand::Rng;

const SUFFIX_LEN: usize = 9;
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a new upload session id
pub fn generate() -> String {
    generate_at(chrono::Utc::now().timestamp_millis(), &mut rand::thread_rng())
}

/// Generate a session id for an explicit timestamp and random source
pub fn generate_at<R: Rng + ?Sized>(timestamp_millis: i64, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", timestamp_millis, suffix)
}
