// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read surface: lookups, traversal, pattern and template matching, result
//! reformatting.
use weft_hash::{composite_hash, expression_hash, named_type_hash, Handle, WILDCARD, WILDCARD_HASH};

use crate::atom::{Atom, Link, TypeDef};
use crate::error::StoreError;
use crate::store::{AtomCount, AtomStore, HandleSet};

/// Link reformatting options consumed by [`AtomStore::get_atom`].
///
/// All flags default to off, returning the raw stored document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtomFormat {
    /// Return the raw atom with no transformation, overriding the other
    /// flags.
    pub no_target_format: bool,
    /// Materialize each target of a link into `targets_documents`.
    pub targets_documents: bool,
    /// Materialize targets recursively, propagating these options, until
    /// terminals.
    pub deep_representation: bool,
}

/// A structural type template for
/// [`get_matched_type_template`](AtomStore::get_matched_type_template).
///
/// A name matches a node target by its type; a nested sub-template matches a
/// link target by its structural type, to unbounded depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTemplate {
    /// A type name.
    Name(String),
    /// A nested template describing a link target.
    Sub(Vec<TypeTemplate>),
}

impl TypeTemplate {
    /// Collapses this template entry to its handle: names hash verbatim,
    /// sub-templates collapse to the composite hash of their entries.
    fn hash(&self) -> Handle {
        match self {
            Self::Name(name) => named_type_hash(name),
            Self::Sub(entries) => {
                let hashes: Vec<Handle> = entries.iter().map(TypeTemplate::hash).collect();
                composite_hash(&hashes)
            }
        }
    }
}

impl From<&str> for TypeTemplate {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl AtomStore {
    // ────────────────────────────────────────────────────────────────────
    // Lookup
    // ────────────────────────────────────────────────────────────────────

    /// Returns the handle of the stored node `(node_type, name)`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no such node is stored;
    /// [`StoreError::InvalidInput`] when the pair violates the hashing bound.
    pub fn get_node_handle(&self, node_type: &str, name: &str) -> Result<Handle, StoreError> {
        let handle = weft_hash::terminal_hash(node_type, name)?;
        if self.nodes.contains_key(&handle) {
            Ok(handle)
        } else {
            Err(StoreError::NotFound(format!("node: {node_type}:{name}")))
        }
    }

    /// Returns the name of the stored node under `handle`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the handle is absent or refers to a
    /// link.
    pub fn get_node_name(&self, handle: &str) -> Result<&str, StoreError> {
        self.nodes
            .get(handle)
            .map(|node| node.name.as_str())
            .ok_or_else(|| StoreError::NotFound(format!("node handle: {handle}")))
    }

    /// Returns the type name of the stored node under `handle`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the handle is absent or refers to a
    /// link.
    pub fn get_node_type(&self, handle: &str) -> Result<&str, StoreError> {
        self.nodes
            .get(handle)
            .map(|node| node.named_type.as_str())
            .ok_or_else(|| StoreError::NotFound(format!("node handle: {handle}")))
    }

    /// Returns the handle of the stored link `(link_type, targets)`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no such link is stored.
    pub fn get_link_handle(
        &self,
        link_type: &str,
        target_handles: &[Handle],
    ) -> Result<Handle, StoreError> {
        let handle = expression_hash(&named_type_hash(link_type), target_handles);
        if self.links.contains_key(&handle) {
            Ok(handle)
        } else {
            Err(StoreError::NotFound(format!(
                "link: {link_type}:[{}]",
                target_handles.join(", ")
            )))
        }
    }

    /// Returns the type name of the stored link under `handle`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the handle is absent or refers to a
    /// node.
    pub fn get_link_type(&self, handle: &str) -> Result<&str, StoreError> {
        self.links
            .get(handle)
            .map(|link| link.named_type.as_str())
            .ok_or_else(|| StoreError::NotFound(format!("link handle: {handle}")))
    }

    /// Returns the ordered target handles of the stored link under `handle`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the handle has no outgoing entry.
    pub fn get_link_targets(&self, handle: &str) -> Result<Vec<Handle>, StoreError> {
        self.outgoing
            .get(handle)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("link handle: {handle}")))
    }

    /// Reports whether the stored link's targets form an ordered tuple.
    ///
    /// Every link here is ordered; the operation exists so callers can probe
    /// without assuming.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the handle does not name a stored link.
    pub fn is_ordered(&self, link_handle: &str) -> Result<bool, StoreError> {
        if self.links.contains_key(link_handle) {
            Ok(true)
        } else {
            Err(StoreError::NotFound(format!("link handle: {link_handle}")))
        }
    }

    /// Returns the type name of whichever atom is stored under `handle`, or
    /// `None`.
    pub fn get_atom_type(&self, handle: &str) -> Option<&str> {
        self.nodes
            .get(handle)
            .map(|node| node.named_type.as_str())
            .or_else(|| self.links.get(handle).map(|link| link.named_type.as_str()))
    }

    /// Returns the full atom under `handle`, reformatted per `format`.
    ///
    /// Reformatting produces a new document; the stored atom is never
    /// mutated. Targets that cannot be resolved while materializing are
    /// silently skipped.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the handle names no stored atom.
    pub fn get_atom(&self, handle: &str, format: AtomFormat) -> Result<Atom, StoreError> {
        let document = self
            .nodes
            .get(handle)
            .cloned()
            .map(Atom::Node)
            .or_else(|| self.links.get(handle).cloned().map(Atom::Link))
            .ok_or_else(|| StoreError::NotFound(format!("handle: {handle}")))?;
        if format.no_target_format {
            return Ok(document);
        }
        match document {
            Atom::Link(link) if format.targets_documents || format.deep_representation => {
                Ok(Atom::Link(self.materialize_targets(link, format)))
            }
            other => Ok(other),
        }
    }

    /// Returns the atom population counters.
    pub fn count_atoms(&self) -> AtomCount {
        let node_count = self.nodes.len();
        let link_count = self.links.len();
        AtomCount {
            node_count,
            link_count,
            atom_count: node_count + link_count,
        }
    }

    /// Returns the handles of every node whose type is `node_type`.
    pub fn get_all_nodes_handles(&self, node_type: &str) -> Vec<Handle> {
        let type_hash = named_type_hash(node_type);
        self.nodes
            .iter()
            .filter(|(_, node)| node.composite_type_hash == type_hash)
            .map(|(handle, _)| handle.clone())
            .collect()
    }

    /// Returns the names of every node whose type is `node_type`.
    pub fn get_all_nodes_names(&self, node_type: &str) -> Vec<String> {
        let type_hash = named_type_hash(node_type);
        self.nodes
            .values()
            .filter(|node| node.composite_type_hash == type_hash)
            .map(|node| node.name.clone())
            .collect()
    }

    /// Returns the handles of every link whose declared type name equals
    /// `link_type` (string match, not hash).
    pub fn get_all_links(&self, link_type: &str) -> Vec<Handle> {
        self.links
            .values()
            .filter(|link| link.named_type == link_type)
            .map(|link| link.id.clone())
            .collect()
    }

    /// Returns the handles of nodes of `node_type` whose name contains
    /// `substring` (plain substring, not a regex, no normalization).
    pub fn get_node_by_name(&self, node_type: &str, substring: &str) -> Vec<Handle> {
        let type_hash = named_type_hash(node_type);
        self.nodes
            .iter()
            .filter(|(_, node)| {
                node.name.contains(substring) && node.composite_type_hash == type_hash
            })
            .map(|(handle, _)| handle.clone())
            .collect()
    }

    // ────────────────────────────────────────────────────────────────────
    // Incoming traversal
    // ────────────────────────────────────────────────────────────────────

    /// Returns the set of links referencing `handle` in any target position
    /// (empty when none do).
    pub fn get_incoming_links_handles(&self, handle: &str) -> HandleSet {
        self.incoming.get(handle).cloned().unwrap_or_default()
    }

    /// Returns the atoms of every link referencing `handle`, each fetched
    /// with `format`.
    ///
    /// # Errors
    ///
    /// Propagates [`AtomStore::get_atom`] failures.
    pub fn get_incoming_links_atoms(
        &self,
        handle: &str,
        format: AtomFormat,
    ) -> Result<Vec<Atom>, StoreError> {
        let links = self.get_incoming_links_handles(handle);
        let mut atoms = Vec::with_capacity(links.len());
        for link_handle in &links {
            atoms.push(self.get_atom(link_handle, format)?);
        }
        Ok(atoms)
    }

    // ────────────────────────────────────────────────────────────────────
    // Pattern match
    // ────────────────────────────────────────────────────────────────────

    /// Returns the links matching `(link_type, target_handles)` where the
    /// type and any target slot may hold the wildcard token `"*"`.
    ///
    /// Wildcard slots are translated to the wildcard hash before the
    /// probe key is composed, so the probe equals the key generated when
    /// matching links were indexed. A fully concrete query reduces to a point
    /// lookup. With every slot wildcarded the probe finds nothing: that row
    /// is never indexed.
    pub fn get_matched_links(
        &self,
        link_type: &str,
        target_handles: &[Handle],
        toplevel_only: bool,
    ) -> HandleSet {
        if link_type != WILDCARD && !target_handles.iter().any(|t| t == WILDCARD) {
            let mut matched = HandleSet::default();
            if let Ok(handle) = self.get_link_handle(link_type, target_handles) {
                matched.insert(handle);
            }
            return if toplevel_only {
                self.filter_non_toplevel(matched)
            } else {
                matched
            };
        }

        let type_hash = if link_type == WILDCARD {
            WILDCARD_HASH.clone()
        } else {
            named_type_hash(link_type)
        };
        let slots: Vec<&str> = target_handles
            .iter()
            .map(|t| {
                if t == WILDCARD {
                    WILDCARD_HASH.as_str()
                } else {
                    t.as_str()
                }
            })
            .collect();
        let key = expression_hash(&type_hash, &slots);

        let matched = self.patterns.get(&key).cloned().unwrap_or_default();
        if toplevel_only {
            self.filter_non_toplevel(matched)
        } else {
            matched
        }
    }

    /// Returns the links whose structural type matches `template`.
    pub fn get_matched_type_template(
        &self,
        template: &[TypeTemplate],
        toplevel_only: bool,
    ) -> HandleSet {
        let hashes: Vec<Handle> = template.iter().map(TypeTemplate::hash).collect();
        let key = composite_hash(&hashes);
        let matched = self.templates.get(&key).cloned().unwrap_or_default();
        if toplevel_only {
            self.filter_non_toplevel(matched)
        } else {
            matched
        }
    }

    /// Returns the links whose declared type is `link_type`, via the
    /// template index (which holds every link under its named-type hash as
    /// well as its composite-type hash).
    pub fn get_matched_type(&self, link_type: &str, toplevel_only: bool) -> HandleSet {
        let key = named_type_hash(link_type);
        let matched = self.templates.get(&key).cloned().unwrap_or_default();
        if toplevel_only {
            self.filter_non_toplevel(matched)
        } else {
            matched
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Existence probes
    // ────────────────────────────────────────────────────────────────────

    /// Reports whether the node `(node_type, name)` is stored.
    ///
    /// # Errors
    ///
    /// Error conditions other than absence propagate.
    pub fn node_exists(&self, node_type: &str, name: &str) -> Result<bool, StoreError> {
        match self.get_node_handle(node_type, name) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Reports whether the link `(link_type, targets)` is stored.
    ///
    /// # Errors
    ///
    /// Error conditions other than absence propagate.
    pub fn link_exists(
        &self,
        link_type: &str,
        target_handles: &[Handle],
    ) -> Result<bool, StoreError> {
        match self.get_link_handle(link_type, target_handles) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Named-type registry
    // ────────────────────────────────────────────────────────────────────

    /// Reports whether `name` has been seen as a named type.
    pub fn has_named_type(&self, name: &str) -> bool {
        self.named_types.contains(name)
    }

    /// Resolves a named-type hash back to its name, when registered.
    pub fn named_type_for_hash(&self, name_hash: &str) -> Option<&str> {
        self.named_type_table.get(name_hash).map(String::as_str)
    }

    /// Returns the typedef document registered for `name`, if any.
    pub fn typedef(&self, name: &str) -> Option<&TypeDef> {
        let name_hash = named_type_hash(name);
        let key = expression_hash(
            weft_hash::TYPEDEF_MARK_HASH.as_str(),
            &[name_hash.as_str(), weft_hash::TYPE_HASH.as_str()],
        );
        self.typedefs.get(&key)
    }

    // ────────────────────────────────────────────────────────────────────
    // Unimplemented surface
    // ────────────────────────────────────────────────────────────────────

    /// Field-scan query over atom documents.
    ///
    /// # Errors
    ///
    /// Always [`StoreError::NotSupported`]: this store indexes structure, not
    /// fields.
    pub fn get_atoms_by_field(
        &self,
        _query: &[(String, String)],
    ) -> Result<Vec<Handle>, StoreError> {
        Err(StoreError::NotSupported("get_atoms_by_field"))
    }

    /// Paged query against a secondary field index.
    ///
    /// # Errors
    ///
    /// Always [`StoreError::NotSupported`].
    pub fn get_atoms_by_index(
        &self,
        _index_id: &str,
        _query: &[(String, String)],
        _cursor: usize,
        _chunk_size: usize,
    ) -> Result<Vec<Atom>, StoreError> {
        Err(StoreError::NotSupported("get_atoms_by_index"))
    }

    /// Text search over an indexed text field.
    ///
    /// # Errors
    ///
    /// Always [`StoreError::NotSupported`].
    pub fn get_atoms_by_text_field(
        &self,
        _text_value: &str,
        _field: Option<&str>,
    ) -> Result<Vec<Handle>, StoreError> {
        Err(StoreError::NotSupported("get_atoms_by_text_field"))
    }

    /// Prefix scan over node names.
    ///
    /// # Errors
    ///
    /// Always [`StoreError::NotSupported`].
    pub fn get_node_by_name_starting_with(
        &self,
        _node_type: &str,
        _prefix: &str,
    ) -> Result<Vec<Handle>, StoreError> {
        Err(StoreError::NotSupported("get_node_by_name_starting_with"))
    }

    /// Rebuilds the pattern and template indices from custom templates.
    ///
    /// # Errors
    ///
    /// Always [`StoreError::NotSupported`].
    pub fn reindex(&mut self) -> Result<(), StoreError> {
        Err(StoreError::NotSupported("reindex"))
    }

    /// Creates a secondary index over a document field.
    ///
    /// # Errors
    ///
    /// Always [`StoreError::NotSupported`].
    pub fn create_field_index(
        &mut self,
        _atom_type: &str,
        _fields: &[String],
    ) -> Result<Handle, StoreError> {
        Err(StoreError::NotSupported("create_field_index"))
    }

    /// Flushes a staged insertion buffer.
    ///
    /// # Errors
    ///
    /// Always [`StoreError::NotSupported`]: there is no staging buffer here;
    /// use [`AtomStore::bulk_insert`] for prebuilt documents.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        Err(StoreError::NotSupported("commit"))
    }

    // ────────────────────────────────────────────────────────────────────
    // Internals
    // ────────────────────────────────────────────────────────────────────

    /// Retains only toplevel links. With an empty link table the input
    /// passes through unchanged.
    fn filter_non_toplevel(&self, matched: HandleSet) -> HandleSet {
        if self.links.is_empty() {
            return matched;
        }
        matched
            .into_iter()
            .filter(|handle| {
                self.links
                    .get(handle)
                    .is_some_and(|link| link.is_toplevel)
            })
            .collect()
    }

    /// Produces a copy of `link` with `targets_documents` materialized.
    fn materialize_targets(&self, mut link: Link, format: AtomFormat) -> Link {
        let mut documents = Vec::with_capacity(link.targets.len());
        for target in &link.targets {
            let child = if format.deep_representation {
                self.get_atom(target, format)
            } else {
                self.get_atom(target, AtomFormat::default())
            };
            // A target absent at materialization time is skipped.
            if let Ok(atom) = child {
                documents.push(atom);
            }
        }
        link.targets_documents = Some(documents);
        link
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::descriptor::{LinkDescriptor, NodeDescriptor};

    use super::*;

    fn store_with_similarity() -> (AtomStore, Handle, Handle, Handle) {
        let mut store = AtomStore::new();
        let link = store
            .add_link(
                LinkDescriptor::new(
                    "Similarity",
                    vec![
                        NodeDescriptor::new("Concept", "human").into(),
                        NodeDescriptor::new("Concept", "monkey").into(),
                    ],
                ),
                true,
            )
            .unwrap();
        let human = store.get_node_handle("Concept", "human").unwrap();
        let monkey = store.get_node_handle("Concept", "monkey").unwrap();
        (store, link.handle, human, monkey)
    }

    // ── 1. field accessors reject the wrong variant ─────────────────────

    #[test]
    fn node_accessors_reject_link_handles() {
        let (store, link, _, _) = store_with_similarity();
        assert!(matches!(
            store.get_node_name(&link),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get_node_type(&link),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.get_link_type(&link).unwrap(), "Similarity");
    }

    // ── 2. get_atom_type spans both tables ──────────────────────────────

    #[test]
    fn atom_type_spans_tables() {
        let (store, link, human, _) = store_with_similarity();
        assert_eq!(store.get_atom_type(&human), Some("Concept"));
        assert_eq!(store.get_atom_type(&link), Some("Similarity"));
        assert_eq!(store.get_atom_type("0000000000000000000000000000beef"), None);
    }

    // ── 3. raw get_atom leaves targets unmaterialized ───────────────────

    #[test]
    fn get_atom_raw_has_no_documents() {
        let (store, link, _, _) = store_with_similarity();
        let atom = store.get_atom(&link, AtomFormat::default()).unwrap();
        assert!(atom.as_link().unwrap().targets_documents.is_none());
    }

    // ── 4. targets_documents materializes one level ─────────────────────

    #[test]
    fn get_atom_materializes_targets() {
        let (store, link, human, monkey) = store_with_similarity();
        let format = AtomFormat {
            targets_documents: true,
            ..AtomFormat::default()
        };
        let atom = store.get_atom(&link, format).unwrap();
        let documents = atom.as_link().unwrap().targets_documents.clone().unwrap();
        let handles: Vec<&str> = documents.iter().map(Atom::handle).collect();
        assert_eq!(handles, vec![human.as_str(), monkey.as_str()]);
        // The stored document is untouched.
        assert!(store.links.get(&link).unwrap().targets_documents.is_none());
    }

    // ── 5. no_target_format overrides materialization ───────────────────

    #[test]
    fn no_target_format_wins() {
        let (store, link, _, _) = store_with_similarity();
        let format = AtomFormat {
            no_target_format: true,
            targets_documents: true,
            deep_representation: true,
        };
        let atom = store.get_atom(&link, format).unwrap();
        assert!(atom.as_link().unwrap().targets_documents.is_none());
    }

    // ── 6. existence probes ─────────────────────────────────────────────

    #[test]
    fn existence_probes() {
        let (store, _, human, monkey) = store_with_similarity();
        assert!(store.node_exists("Concept", "human").unwrap());
        assert!(!store.node_exists("Concept", "dolphin").unwrap());
        assert!(store
            .link_exists("Similarity", &[human.clone(), monkey.clone()])
            .unwrap());
        assert!(!store.link_exists("Similarity", &[monkey, human]).unwrap());
    }

    // ── 7. substring scan matches by type hash and name ─────────────────

    #[test]
    fn node_by_name_substring() {
        let (mut store, _, human, _) = store_with_similarity();
        store
            .add_node(NodeDescriptor::new("Predicate", "humanlike"))
            .unwrap();
        let matched = store.get_node_by_name("Concept", "uman");
        assert_eq!(matched, vec![human]);
    }

    // ── 8. unsupported surface reports its operation ────────────────────

    #[test]
    fn unsupported_operations_say_so() {
        let mut store = AtomStore::new();
        assert_eq!(
            store.get_atoms_by_field(&[]),
            Err(StoreError::NotSupported("get_atoms_by_field"))
        );
        assert_eq!(store.reindex(), Err(StoreError::NotSupported("reindex")));
        assert_eq!(store.commit(), Err(StoreError::NotSupported("commit")));
        assert_eq!(
            store.get_node_by_name_starting_with("Concept", "hu"),
            Err(StoreError::NotSupported("get_node_by_name_starting_with"))
        );
    }

    // ── 9. typedef registry is queryable ────────────────────────────────

    #[test]
    fn typedef_registry() {
        let (store, _, _, _) = store_with_similarity();
        let typedef = store.typedef("Concept").unwrap();
        assert_eq!(typedef.named_type, "Concept");
        assert_eq!(typedef.named_type_hash, named_type_hash("Concept"));
        assert_eq!(typedef.id, typedef.handle);
        assert!(store.typedef("Dolphin").is_none());
    }
}
