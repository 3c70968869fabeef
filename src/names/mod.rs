//! Names Module
//!
//! - `SymbolTable`: string interning for namespace URIs and prefixes
//! - `ExpandedNameIndex`: `(namespace, local, kind)` -> expanded type id

pub mod expanded;
pub mod symbols;

pub use expanded::ExpandedNameIndex;
pub use symbols::SymbolTable;
