// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Atom document types: nodes, links, composite types, custom attributes.
use std::collections::BTreeMap;

use weft_hash::{composite_hash, expression_hash, named_type_hash, terminal_hash, Handle};

use crate::error::StoreError;

/// A custom-attribute value.
///
/// The attribute plane is a closed union: anything outside these four shapes
/// is unrepresentable at the API boundary.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    /// UTF-8 string value.
    Str(String),
    /// Signed 64-bit integer value.
    Int(i64),
    /// Double-precision float value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Custom attributes attached to an atom.
///
/// Keyed by attribute name; ordering is not observable through any query, so
/// the deterministic iteration of a `BTreeMap` is purely a debugging nicety.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Structural-type descriptor mirroring the shape of a link and its
/// transitive targets.
///
/// Element zero of every list is the owning link's own type-name handle;
/// subsequent elements describe targets — a leaf for a node target, a nested
/// list for a link target. Depth is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompositeType {
    /// A type-name handle.
    Leaf(Handle),
    /// A nested composite describing a link target.
    Branch(Vec<CompositeType>),
}

impl CompositeType {
    /// Collapses this element to the single handle that represents it in the
    /// parent's composite-type hash.
    ///
    /// A leaf is its own handle; a branch collapses to the composite hash of
    /// its collapsed elements, which reconstructs the child link's
    /// `composite_type_hash`.
    pub fn element_hash(&self) -> Handle {
        match self {
            Self::Leaf(handle) => handle.clone(),
            Self::Branch(elements) => {
                let hashes: Vec<Handle> =
                    elements.iter().map(CompositeType::element_hash).collect();
                composite_hash(&hashes)
            }
        }
    }
}

/// Collapses a composite-type list to the hash stored as a link's
/// `composite_type_hash`.
pub(crate) fn composite_type_hash_of(elements: &[CompositeType]) -> Handle {
    let hashes: Vec<Handle> = elements.iter().map(CompositeType::element_hash).collect();
    composite_hash(&hashes)
}

/// A terminal atom identified by `(type, name)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    /// The atom's handle (equal to `handle`).
    pub id: Handle,
    /// Content-addressed identifier: `terminal_hash(named_type, name)`.
    pub handle: Handle,
    /// Structural-type summary: `named_type_hash(named_type)`.
    pub composite_type_hash: Handle,
    /// Declared type name.
    pub named_type: String,
    /// Terminal name.
    pub name: String,
    /// Caller-supplied attributes.
    pub custom_attributes: Attributes,
}

impl Node {
    /// Re-checks the build invariants on a prebuilt document.
    ///
    /// Used by bulk insertion, where documents arrive already constructed and
    /// the handle must still be a pure function of the content.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAtom`] when a field is empty or a hash
    /// does not match the content it summarizes.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.named_type.is_empty() || self.name.is_empty() {
            return Err(StoreError::InvalidAtom(
                "'type' and 'name' are required".to_owned(),
            ));
        }
        let handle = terminal_hash(&self.named_type, &self.name)?;
        if self.handle != handle || self.id != handle {
            return Err(StoreError::InvalidAtom(format!(
                "node handle {} does not match its content",
                self.handle
            )));
        }
        if self.composite_type_hash != named_type_hash(&self.named_type) {
            return Err(StoreError::InvalidAtom(format!(
                "node composite type hash {} does not match its type",
                self.composite_type_hash
            )));
        }
        Ok(())
    }
}

/// A non-terminal atom: a typed ordered tuple of atom references.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Link {
    /// The atom's handle (equal to `handle`).
    pub id: Handle,
    /// Content-addressed identifier: `expression_hash(named_type_hash,
    /// targets)`.
    pub handle: Handle,
    /// Collapsed hash of `composite_type`.
    pub composite_type_hash: Handle,
    /// Declared type name.
    pub named_type: String,
    /// Structural-type tree; element zero is `named_type_hash`.
    pub composite_type: Vec<CompositeType>,
    /// Hash of `named_type`.
    pub named_type_hash: Handle,
    /// Ordered target handles (length ≥ 1).
    pub targets: Vec<Handle>,
    /// Whether the link was created by the external caller rather than as a
    /// nested target of another link.
    pub is_toplevel: bool,
    /// Caller-supplied attributes.
    pub custom_attributes: Attributes,
    /// Materialized target atoms; populated only by read-time reformatting,
    /// never stored in the indices.
    pub targets_documents: Option<Vec<Atom>>,
}

impl Link {
    /// Re-checks the build invariants on a prebuilt document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAtom`] when a field is empty, the
    /// composite-type tree is malformed, or a hash does not match the content
    /// it summarizes.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.named_type.is_empty() {
            return Err(StoreError::InvalidAtom("'type' is required".to_owned()));
        }
        if self.targets.is_empty() {
            return Err(StoreError::InvalidAtom(
                "link targets cannot be empty".to_owned(),
            ));
        }
        if self.named_type_hash != named_type_hash(&self.named_type) {
            return Err(StoreError::InvalidAtom(format!(
                "link named type hash {} does not match its type",
                self.named_type_hash
            )));
        }
        match self.composite_type.first() {
            Some(CompositeType::Leaf(head)) if *head == self.named_type_hash => {}
            _ => {
                return Err(StoreError::InvalidAtom(
                    "composite type must start with the link's own type hash".to_owned(),
                ));
            }
        }
        let handle = expression_hash(&self.named_type_hash, &self.targets);
        if self.handle != handle || self.id != handle {
            return Err(StoreError::InvalidAtom(format!(
                "link handle {} does not match its content",
                self.handle
            )));
        }
        if self.composite_type_hash != composite_type_hash_of(&self.composite_type) {
            return Err(StoreError::InvalidAtom(format!(
                "link composite type hash {} does not match its tree",
                self.composite_type_hash
            )));
        }
        Ok(())
    }
}

/// Either stored atom variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Atom {
    /// A terminal atom.
    Node(Node),
    /// A typed ordered tuple of atom references.
    Link(Link),
}

impl Atom {
    /// The atom's handle.
    pub fn handle(&self) -> &str {
        match self {
            Self::Node(node) => &node.handle,
            Self::Link(link) => &link.handle,
        }
    }

    /// The atom's declared type name.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Node(node) => &node.named_type,
            Self::Link(link) => &link.named_type,
        }
    }

    /// The atom's structural-type summary hash.
    pub fn composite_type_hash(&self) -> &str {
        match self {
            Self::Node(node) => &node.composite_type_hash,
            Self::Link(link) => &link.composite_type_hash,
        }
    }

    /// The atom's custom attributes.
    pub fn custom_attributes(&self) -> &Attributes {
        match self {
            Self::Node(node) => &node.custom_attributes,
            Self::Link(link) => &link.custom_attributes,
        }
    }

    /// Returns the node variant, if this atom is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Link(_) => None,
        }
    }

    /// Returns the link variant, if this atom is one.
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Self::Node(_) => None,
            Self::Link(link) => Some(link),
        }
    }
}

impl From<Node> for Atom {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Link> for Atom {
    fn from(link: Link) -> Self {
        Self::Link(link)
    }
}

/// A registered named type, recorded once per distinct type name seen by the
/// store.
///
/// Keyed by the typedef expression `(: name Type)` — see the named-type
/// registry on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDef {
    /// The typedef's handle (equal to `handle`).
    pub id: Handle,
    /// Typedef expression hash.
    pub handle: Handle,
    /// Collapsed hash of the typedef's composite type.
    pub composite_type_hash: Handle,
    /// The registered type name.
    pub named_type: String,
    /// Hash of the registered type name.
    pub named_type_hash: Handle,
}
