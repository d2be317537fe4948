//! Testing utilities and harness for Lumen.
//!
//! [`TestPage`] implements the host seam over an in-memory tree so engine
//! behaviour can be exercised without a browser; [`PageTestRule`] wraps it
//! with the settle/scroll/assert steps most tests repeat.

mod page;
mod selector;
pub mod test_rule;

pub use page::*;
pub use test_rule::*;
