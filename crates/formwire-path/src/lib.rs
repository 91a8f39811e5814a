//! Flat field-name syntax for nested form values
//!
//! Browser forms submit a *flat* list of `(name, value)` entries. The name
//! encodes a path into a nested value tree: `.` separates object keys and
//! `[n]` indexes arrays, so `items[0].name` addresses the `name` key of the
//! first `items` element.
//!
//! This crate owns that syntax: the typed [`PathKey`] representation, a
//! [`decode`]/[`encode`] pair that is a two-way inverse, and nothing else.
//! Reconstructing whole value trees from decoded paths lives one layer up,
//! next to the tree type itself.

pub mod codec;

pub use codec::{decode, encode, FieldPath, PathError, PathKey};
