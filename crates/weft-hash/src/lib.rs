// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Content-addressed expression hashing for weft.
//!
//! `weft-hash` derives stable identifiers — *handles* — for atoms from their
//! structure. A handle is the MD5 digest of a canonical hashable string,
//! rendered as 32 lowercase hex characters.
//!
//! # Hash Algebra
//!
//! The hashable string for each shape is fixed:
//!
//! - a **type name** hashes verbatim ([`named_type_hash`]);
//! - a **terminal** `(type, name)` hashes as `type` + `' '` + `name`
//!   ([`terminal_hash`]);
//! - a **composite** list of handles hashes as the handles joined by a single
//!   ASCII space ([`composite_hash`]) — a one-element list is returned
//!   unchanged, an empty list hashes the empty string;
//! - an **expression** `(type_hash, targets)` is the composite of the type
//!   hash followed by the target handles ([`expression_hash`]).
//!
//! Handles produced here are opaque: no structure is recoverable from the hex
//! string, and handles of distinct logical entities are unrelated strings.
//! Unicode input is hashed as its UTF-8 byte sequence.
//!
//! # Determinism Invariant
//!
//! Every function in this crate is pure and stateless: same input, same
//! handle, on every platform. Thread safety follows from statelessness.
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

use md5::{Digest, Md5};
use once_cell::sync::Lazy;

/// A content-addressed atom identifier: 32 lowercase hex characters of an MD5
/// digest.
///
/// The hash algebra operates on the hex renderings themselves (composite
/// hashes join handle *strings*), so the string form is the canonical one.
pub type Handle = String;

/// The wildcard token accepted in query target positions.
pub const WILDCARD: &str = "*";

/// Upper bound, in bytes, on any hashable string.
///
/// [`terminal_hash`] enforces the bound explicitly; other entry points hash
/// whatever they are given.
pub const MAX_HASHABLE_LEN: usize = 100_000;

/// Joining character between elements of a hashable string.
const JOINING_CHAR: &str = " ";

/// Handle of the wildcard token, used as the substituted slot value in
/// pattern-index keys.
pub static WILDCARD_HASH: Lazy<Handle> = Lazy::new(|| named_type_hash(WILDCARD));

/// Handle of the base type name `"Type"`, used by typedef registry keys.
pub static TYPE_HASH: Lazy<Handle> = Lazy::new(|| named_type_hash("Type"));

/// Handle of the typedef marker `":"`, the head of typedef expressions.
pub static TYPEDEF_MARK_HASH: Lazy<Handle> = Lazy::new(|| named_type_hash(":"));

/// Errors produced while deriving a handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    /// The combined pre-hash string would exceed [`MAX_HASHABLE_LEN`] bytes.
    #[error("hashable string of {len} bytes exceeds {MAX_HASHABLE_LEN}")]
    InputTooLarge {
        /// Length in bytes of the rejected hashable string.
        len: usize,
    },
}

/// Computes the MD5 digest of `input`'s UTF-8 bytes, rendered as lowercase
/// hex.
pub fn compute_hash(input: &str) -> Handle {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Returns the handle of a type name: the hash of the name verbatim.
pub fn named_type_hash(name: &str) -> Handle {
    compute_hash(name)
}

/// Returns the handle of a terminal `(type, name)` pair.
///
/// The hashable string is `type` + `' '` + `name`.
///
/// # Errors
///
/// Returns [`HashError::InputTooLarge`] when the hashable string would exceed
/// [`MAX_HASHABLE_LEN`] bytes.
pub fn terminal_hash(node_type: &str, name: &str) -> Result<Handle, HashError> {
    let len = node_type.len() + JOINING_CHAR.len() + name.len();
    if len > MAX_HASHABLE_LEN {
        return Err(HashError::InputTooLarge { len });
    }
    let mut hashable = String::with_capacity(len);
    hashable.push_str(node_type);
    hashable.push_str(JOINING_CHAR);
    hashable.push_str(name);
    Ok(compute_hash(&hashable))
}

/// Returns the composite handle of a list of handles.
///
/// A one-element list is returned unchanged; everything else hashes the
/// elements joined by a single ASCII space (an empty list therefore hashes
/// the empty string).
pub fn composite_hash<S: AsRef<str>>(elements: &[S]) -> Handle {
    if let [single] = elements {
        return single.as_ref().to_owned();
    }
    let joined = elements
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(JOINING_CHAR);
    compute_hash(&joined)
}

/// Returns the handle of an expression: the composite of `type_hash`
/// followed by the target handles.
///
/// With no targets this degenerates to the one-element composite and returns
/// `type_hash` unchanged.
pub fn expression_hash<S: AsRef<str>>(type_hash: &str, targets: &[S]) -> Handle {
    let mut parts: Vec<&str> = Vec::with_capacity(targets.len() + 1);
    parts.push(type_hash);
    parts.extend(targets.iter().map(AsRef::as_ref));
    composite_hash(&parts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ── 1. known digests ────────────────────────────────────────────────

    #[test]
    fn known_digests() {
        assert_eq!(compute_hash(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(compute_hash("abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(*WILDCARD_HASH, "3389dae361af79b04c9c8e7057f60cc6");
        assert_eq!(*TYPE_HASH, "a1fa27779242b4902f7ae3bdd5c6d508");
        assert_eq!(*TYPEDEF_MARK_HASH, "853ae90f0351324bd73ea615e6487517");
    }

    // ── 2. terminal hash joins with one space ───────────────────────────

    #[test]
    fn terminal_hash_published_vector() {
        let handle = terminal_hash("Concept", "human").unwrap();
        assert_eq!(handle, "af12f10f9ae2002a1607ba0b47ba8407");
        assert_eq!(handle, compute_hash("Concept human"));
    }

    // ── 3. terminal hash enforces the size bound ────────────────────────

    #[test]
    fn terminal_hash_rejects_oversized_input() {
        let name = "n".repeat(MAX_HASHABLE_LEN);
        let err = terminal_hash("Concept", &name).unwrap_err();
        assert!(matches!(err, HashError::InputTooLarge { len } if len > MAX_HASHABLE_LEN));
        // At the bound exactly, hashing succeeds.
        let name = "n".repeat(MAX_HASHABLE_LEN - "Concept ".len());
        assert!(terminal_hash("Concept", &name).is_ok());
    }

    // ── 4. composite: single element passes through ─────────────────────

    #[test]
    fn composite_hash_single_element_is_identity() {
        let element = named_type_hash("Similarity");
        assert_eq!(composite_hash(&[element.clone()]), element);
    }

    // ── 5. composite: empty list hashes the empty string ────────────────

    #[test]
    fn composite_hash_empty_list() {
        let empty: [&str; 0] = [];
        assert_eq!(composite_hash(&empty), compute_hash(""));
    }

    // ── 6. composite joins elements with one space ──────────────────────

    #[test]
    fn composite_hash_joins_with_space() {
        let a = compute_hash("a");
        let b = compute_hash("b");
        let joined = format!("{a} {b}");
        assert_eq!(composite_hash(&[a, b]), compute_hash(&joined));
    }

    // ── 7. expression prepends the type hash ────────────────────────────

    #[test]
    fn expression_hash_prepends_type() {
        let ty = named_type_hash("Similarity");
        let human = terminal_hash("Concept", "human").unwrap();
        let monkey = terminal_hash("Concept", "monkey").unwrap();
        let expected = composite_hash(&[ty.clone(), human.clone(), monkey.clone()]);
        assert_eq!(expression_hash(&ty, &[human, monkey]), expected);
        assert_eq!(expected, "bad7472f41a0e7d601ca294eb4607c3a");
    }

    // ── 8. expression with no targets returns the type hash ─────────────

    #[test]
    fn expression_hash_no_targets_is_type_hash() {
        let ty = named_type_hash("Similarity");
        let none: [&str; 0] = [];
        assert_eq!(expression_hash(&ty, &none), ty);
    }

    // ── 9. unicode hashes as UTF-8 bytes ────────────────────────────────

    #[test]
    fn unicode_input_hashes_utf8_bytes() {
        let direct = compute_hash("Conceito ser-humano");
        assert_eq!(terminal_hash("Conceito", "ser-humano").unwrap(), direct);
        // Distinct code points produce distinct handles.
        assert_ne!(compute_hash("café"), compute_hash("cafe"));
    }
}
