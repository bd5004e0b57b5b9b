#![deny(clippy::all, warnings)]

//! Content hashing for cache keys and include fingerprints.
//!
//! Everything the cache identifies — manifests, results, include files — is
//! named by a 160-bit BLAKE2b digest. Inputs are fed as labeled, delimited
//! segments so that concatenating two fields can never collide with a single
//! longer field.

mod digest;
mod hasher;
mod source;

pub use digest::{Digest, ParseDigestError, DIGEST_HEX_LEN, DIGEST_LEN};
pub use hasher::Hasher;
pub use source::{hash_source, hash_source_into, scan_for_temporal_macros, SourceHash};
