// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory atom store: tables, derived indices, and mutation paths.
use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};
use weft_hash::{
    composite_hash, expression_hash, named_type_hash, Handle, TYPEDEF_MARK_HASH, TYPE_HASH,
};

use crate::atom::{Atom, CompositeType, Link, Node, TypeDef};
use crate::descriptor::{LinkDescriptor, NodeDescriptor, TargetDescriptor};
use crate::error::StoreError;
use crate::pattern::pattern_keys;

/// Set of atom handles. Iteration order carries no meaning.
pub type HandleSet = FxHashSet<Handle>;

/// Atom population counters returned by
/// [`count_atoms`](AtomStore::count_atoms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomCount {
    /// Stored nodes.
    pub node_count: usize,
    /// Stored links.
    pub link_count: usize,
    /// `node_count + link_count`.
    pub atom_count: usize,
}

/// In-memory content-addressed hypergraph atom store.
///
/// Owns the node and link tables plus four derived indices (outgoing,
/// incoming, template, pattern) and the named-type registry, kept mutually
/// consistent under insertion and deletion.
///
/// The store is a single-threaded cooperative component: operations run to
/// completion and the joint invariants are re-established before any call
/// returns. Shared access requires an external mutual-exclusion primitive —
/// Rust's `&`/`&mut` split on these methods states the contract exactly.
#[derive(Debug, Default)]
pub struct AtomStore {
    /// Node table: handle → node document.
    pub(crate) nodes: FxHashMap<Handle, Node>,
    /// Link table: handle → link document.
    pub(crate) links: FxHashMap<Handle, Link>,
    /// Outgoing index: link handle → its ordered target handles.
    pub(crate) outgoing: FxHashMap<Handle, Vec<Handle>>,
    /// Incoming index: atom handle → links referencing it in any position.
    pub(crate) incoming: FxHashMap<Handle, HandleSet>,
    /// Template index: composite-type hash and named-type hash → links.
    pub(crate) templates: FxHashMap<Handle, HandleSet>,
    /// Pattern index: wildcard-substituted expression hash → links.
    pub(crate) patterns: FxHashMap<Handle, HandleSet>,
    /// Typedef documents keyed by their typedef expression hash.
    pub(crate) typedefs: FxHashMap<Handle, TypeDef>,
    /// Every distinct named type seen by this store.
    pub(crate) named_types: BTreeSet<String>,
    /// Reverse table: named-type hash → name.
    pub(crate) named_type_table: FxHashMap<Handle, String>,
}

impl AtomStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and stores a node from its descriptor, indexing it.
    ///
    /// Re-adding an identical node overwrites the stored document under the
    /// same handle; the population is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAtom`] for an empty type or name, and
    /// [`StoreError::InvalidInput`] when the terminal's hashable string
    /// exceeds the hashing bound.
    pub fn add_node(&mut self, descriptor: NodeDescriptor) -> Result<Node, StoreError> {
        let node = build_node(descriptor)?;
        self.nodes.insert(node.handle.clone(), node.clone());
        self.record_named_type(&node.named_type);
        debug!(handle = %node.handle, named_type = %node.named_type, "node added");
        Ok(node)
    }

    /// Builds and stores a link from its descriptor, realizing descriptor
    /// targets recursively and updating every index.
    ///
    /// `toplevel` marks links created by the external caller; nested targets
    /// are always stored with `toplevel = false`. A nested failure propagates
    /// without inserting the outer link; child atoms already created are
    /// retained.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidAtom`] for an empty type or target list
    /// (at any nesting level), and [`StoreError::InvalidInput`] for hashing
    /// bound violations while realizing node targets.
    pub fn add_link(
        &mut self,
        descriptor: LinkDescriptor,
        toplevel: bool,
    ) -> Result<Link, StoreError> {
        let link = self.build_link(descriptor, toplevel)?;
        self.links.insert(link.handle.clone(), link.clone());
        self.record_named_type(&link.named_type);
        self.index_link(&link);
        debug!(handle = %link.handle, named_type = %link.named_type, toplevel, "link added");
        Ok(link)
    }

    /// Deletes an atom and every link that references it, transitively.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when `handle` names neither a stored
    /// node nor a stored link.
    pub fn delete_atom(&mut self, handle: &str) -> Result<(), StoreError> {
        if self.nodes.remove(handle).is_some() {
            if let Some(referrers) = self.incoming.remove(handle) {
                for link_handle in referrers {
                    self.delete_link_and_update_index(&link_handle);
                }
            }
            debug!(%handle, "node deleted");
            return Ok(());
        }
        if self.delete_link_and_update_index(handle) {
            debug!(%handle, "link deleted");
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("handle: {handle}")))
        }
    }

    /// Inserts prebuilt atom documents, indexing each, and reports a result
    /// per document.
    ///
    /// Documents are validated against the content-addressing invariants, and
    /// a link's targets must already resolve (insert children before
    /// parents). A failed document is skipped; the rest still insert.
    pub fn bulk_insert(&mut self, documents: Vec<Atom>) -> Vec<Result<Handle, StoreError>> {
        documents
            .into_iter()
            .map(|document| self.insert_document(document))
            .collect()
    }

    /// Returns every stored atom as an owned document, order unspecified.
    pub fn all_atoms(&self) -> Vec<Atom> {
        let mut atoms = Vec::with_capacity(self.nodes.len() + self.links.len());
        atoms.extend(self.nodes.values().cloned().map(Atom::Node));
        atoms.extend(self.links.values().cloned().map(Atom::Link));
        atoms
    }

    /// Drops every table, index, and the named-type registry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.templates.clear();
        self.patterns.clear();
        self.typedefs.clear();
        self.named_types.clear();
        self.named_type_table.clear();
        debug!("store cleared");
    }

    // ────────────────────────────────────────────────────────────────────
    // Builders
    // ────────────────────────────────────────────────────────────────────

    /// Realizes a link descriptor bottom-up: descriptor targets are added to
    /// the store first (nested links as non-toplevel), then the link document
    /// is assembled from their handles and composite types.
    fn build_link(
        &mut self,
        descriptor: LinkDescriptor,
        toplevel: bool,
    ) -> Result<Link, StoreError> {
        let LinkDescriptor {
            link_type,
            targets,
            attributes,
        } = descriptor;
        if link_type.is_empty() || targets.is_empty() {
            return Err(StoreError::InvalidAtom(
                "'type' and 'targets' are required".to_owned(),
            ));
        }
        let link_type_hash = named_type_hash(&link_type);
        let mut composite_type = vec![CompositeType::Leaf(link_type_hash.clone())];
        let mut composite_elements = vec![link_type_hash.clone()];
        let mut target_handles: Vec<Handle> = Vec::with_capacity(targets.len());
        for target in targets {
            match target {
                TargetDescriptor::Node(node_descriptor) => {
                    let node = self.add_node(node_descriptor)?;
                    composite_type.push(CompositeType::Leaf(node.composite_type_hash.clone()));
                    composite_elements.push(node.composite_type_hash);
                    target_handles.push(node.handle);
                }
                TargetDescriptor::Link(link_descriptor) => {
                    let child = self.add_link(link_descriptor, false)?;
                    let Link {
                        handle,
                        composite_type: child_composite_type,
                        composite_type_hash,
                        ..
                    } = child;
                    composite_type.push(CompositeType::Branch(child_composite_type));
                    composite_elements.push(composite_type_hash);
                    target_handles.push(handle);
                }
            }
        }
        let handle = expression_hash(&link_type_hash, &target_handles);
        let composite_type_hash = composite_hash(&composite_elements);
        Ok(Link {
            id: handle.clone(),
            handle,
            composite_type_hash,
            named_type: link_type,
            composite_type,
            named_type_hash: link_type_hash,
            targets: target_handles,
            is_toplevel: toplevel,
            custom_attributes: attributes,
            targets_documents: None,
        })
    }

    fn insert_document(&mut self, document: Atom) -> Result<Handle, StoreError> {
        match document {
            Atom::Node(node) => {
                node.validate()?;
                let handle = node.handle.clone();
                self.record_named_type(&node.named_type);
                self.nodes.insert(handle.clone(), node);
                Ok(handle)
            }
            Atom::Link(link) => {
                link.validate()?;
                for target in &link.targets {
                    if !self.nodes.contains_key(target) && !self.links.contains_key(target) {
                        return Err(StoreError::InvalidAtom(format!(
                            "link target {target} is not stored"
                        )));
                    }
                }
                let handle = link.handle.clone();
                self.record_named_type(&link.named_type);
                self.index_link(&link);
                self.links.insert(handle.clone(), link);
                Ok(handle)
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Index maintenance
    // ────────────────────────────────────────────────────────────────────

    /// Adds a link to the outgoing, incoming, template, and pattern indices.
    ///
    /// Invoked exactly once per link insertion. Nodes need no index work on
    /// insertion: they appear in the incoming index only as link targets.
    fn index_link(&mut self, link: &Link) {
        let handle = &link.handle;
        self.outgoing.insert(handle.clone(), link.targets.clone());
        for target in &link.targets {
            // Duplicate target positions collapse: the incoming set holds
            // the link once.
            self.incoming
                .entry(target.clone())
                .or_default()
                .insert(handle.clone());
        }
        self.templates
            .entry(link.composite_type_hash.clone())
            .or_default()
            .insert(handle.clone());
        self.templates
            .entry(link.named_type_hash.clone())
            .or_default()
            .insert(handle.clone());
        for key in pattern_keys(&pattern_hash_list(link)) {
            self.patterns.entry(key).or_default().insert(handle.clone());
        }
        trace!(%handle, arity = link.targets.len(), "link indexed");
    }

    /// Removes a link from the link table and tears down its index entries;
    /// returns whether anything was found.
    pub(crate) fn delete_link_and_update_index(&mut self, link_handle: &str) -> bool {
        match self.links.remove(link_handle) {
            Some(link) => {
                self.unindex_link(&link);
                true
            }
            None => false,
        }
    }

    /// Inverts [`index_link`](Self::index_link) for a link already removed
    /// from the link table, cascading to links that referenced it.
    ///
    /// The referrer set is captured and removed before its members are
    /// deleted, so each parent runs its own teardown while this link's
    /// remaining entries are still intact.
    fn unindex_link(&mut self, link: &Link) {
        if let Some(referrers) = self.incoming.remove(&link.handle) {
            for parent in referrers {
                self.delete_link_and_update_index(&parent);
            }
        }
        if let Some(targets) = self.outgoing.remove(&link.handle) {
            for target in &targets {
                remove_index_entry(&mut self.incoming, target, &link.handle);
            }
        }
        remove_index_entry(&mut self.templates, &link.composite_type_hash, &link.handle);
        remove_index_entry(&mut self.templates, &link.named_type_hash, &link.handle);
        for key in pattern_keys(&pattern_hash_list(link)) {
            remove_index_entry(&mut self.patterns, &key, &link.handle);
        }
        trace!(handle = %link.handle, "link unindexed");
    }

    // ────────────────────────────────────────────────────────────────────
    // Named-type registry
    // ────────────────────────────────────────────────────────────────────

    /// Records a named type the first time it is seen: a typedef document
    /// keyed by the `(: name Type)` expression hash, plus the reverse
    /// hash → name entry.
    fn record_named_type(&mut self, name: &str) {
        if !self.named_types.insert(name.to_owned()) {
            return;
        }
        let name_hash = named_type_hash(name);
        let key = expression_hash(
            TYPEDEF_MARK_HASH.as_str(),
            &[name_hash.as_str(), TYPE_HASH.as_str()],
        );
        if self.typedefs.contains_key(&key) {
            return;
        }
        let composite_type_hash = composite_hash(&[
            TYPEDEF_MARK_HASH.as_str(),
            TYPE_HASH.as_str(),
            TYPE_HASH.as_str(),
        ]);
        self.typedefs.insert(
            key.clone(),
            TypeDef {
                id: key.clone(),
                handle: key,
                composite_type_hash,
                named_type: name.to_owned(),
                named_type_hash: name_hash.clone(),
            },
        );
        self.named_type_table.insert(name_hash, name.to_owned());
    }
}

/// Builds a node document from its descriptor.
fn build_node(descriptor: NodeDescriptor) -> Result<Node, StoreError> {
    let NodeDescriptor {
        node_type,
        name,
        attributes,
    } = descriptor;
    if node_type.is_empty() || name.is_empty() {
        return Err(StoreError::InvalidAtom(
            "'type' and 'name' are required".to_owned(),
        ));
    }
    let handle = weft_hash::terminal_hash(&node_type, &name)?;
    let composite_type_hash = named_type_hash(&node_type);
    Ok(Node {
        id: handle.clone(),
        handle,
        composite_type_hash,
        named_type: node_type,
        name,
        custom_attributes: attributes,
    })
}

/// The hash list pattern keys are generated from: type hash first, then the
/// target handles.
fn pattern_hash_list(link: &Link) -> Vec<Handle> {
    let mut hashes = Vec::with_capacity(link.targets.len() + 1);
    hashes.push(link.named_type_hash.clone());
    hashes.extend(link.targets.iter().cloned());
    hashes
}

/// Removes `handle` from the set under `key`, dropping the entry once empty.
fn remove_index_entry(index: &mut FxHashMap<Handle, HandleSet>, key: &str, handle: &str) {
    let emptied = match index.get_mut(key) {
        Some(set) => {
            set.remove(handle);
            set.is_empty()
        }
        None => false,
    };
    if emptied {
        index.remove(key);
    }
}
