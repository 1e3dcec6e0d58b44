//! Child environment overlay: `KEY=VALUE` entries layered over the inherited
//! host environment.
//!
//! Entries are applied in order. The spawn layer keeps one value per key, so a
//! repeated key resolves to its last entry; duplicates are not removed from the
//! caller's list.

pub mod builder;

pub use builder::{apply_overlay, parse_entry, validate_overlay};
