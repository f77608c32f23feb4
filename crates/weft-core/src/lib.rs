// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! weft-core: in-memory content-addressed hypergraph atom store.
//!
//! The store holds two kinds of atoms — typed terminal **nodes** identified
//! by `(type, name)` and typed ordered **links** over other atoms — addressed
//! by the deterministic handles of [`weft_hash`]. Alongside the atom tables
//! it maintains four derived indices (outgoing, incoming, template, pattern)
//! that serve wildcard pattern queries, structural template matching, and
//! neighborhood traversal without scanning.
//!
//! # Shape of the API
//!
//! Callers describe atoms with [`NodeDescriptor`] / [`LinkDescriptor`] trees
//! and submit them to [`AtomStore::add_node`] / [`AtomStore::add_link`]; the
//! store realizes child atoms recursively, derives handles, validates, and
//! keeps every index consistent. Queries read only the indices and the
//! tables. Atoms are immutable once stored and disappear only via
//! [`AtomStore::delete_atom`] (which cascades to referencing links) or
//! [`AtomStore::clear`].
//!
//! # Concurrency
//!
//! The store is a single-threaded cooperative component: no interior
//! locking, no suspension. `&self`/`&mut self` on the methods is the whole
//! contract — wrap the store in an external mutual-exclusion primitive for
//! shared access.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod atom;
mod descriptor;
mod error;
mod pattern;
mod query;
mod store;

/// Atom document types and custom attributes.
pub use atom::{Atom, AttributeValue, Attributes, CompositeType, Link, Node, TypeDef};
/// Caller-facing inputs for the store's builders.
pub use descriptor::{LinkDescriptor, NodeDescriptor, TargetDescriptor};
/// Store error kinds.
pub use error::StoreError;
/// Pattern-index key enumeration.
pub use pattern::pattern_keys;
/// Read-side options and template inputs.
pub use query::{AtomFormat, TypeTemplate};
/// The store and its result types.
pub use store::{AtomCount, AtomStore, HandleSet};
/// Handle type and the wildcard token, re-exported for call-site convenience.
pub use weft_hash::{Handle, WILDCARD};
