//! Map type used for per-kind tables and the in-memory test tree.
//!
//! Defaults to `rustc-hash`; the `std-hash` feature switches to the standard
//! library hasher.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::FxHashMap as HashMap;
}
