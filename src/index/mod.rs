//! Index Module
//!
//! Optional lookup structures layered over the record store.
//!
//! - `ElementIndex`: identity-sorted element lists per expanded type, used by
//!   typed child and descendant axes

pub mod elements;

pub use elements::ElementIndex;
