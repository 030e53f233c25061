//! Cryptography module - SHA-256 hashing and proof-of-work checks

mod hash;

pub use hash::*;
