//! Unique-id and document registry
//!
//! Every addressable element gets a [`UniqueId`]. Elements with an `id` are
//! keyed by their absolute URI (document URI plus fragment), so a reference
//! seen before its definition and the definition itself converge on the
//! same id regardless of document order. Elements without an id get
//! anonymous ids from the same per-class counter, which keeps the two
//! namespaces disjoint.
//!
//! Documents are tracked the same way: each distinct document URI maps to
//! one [`FileId`] for the lifetime of the session.

use crate::error::{Error, Result};
use crate::model::{ClassId, FileId, UniqueId};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use url::Url;

/// Registry of unique ids and documents for one load session
#[derive(Debug, Default)]
pub struct Registry {
    uri_ids: HashMap<String, UniqueId>,
    counters: HashMap<ClassId, u64>,
    files: Vec<Url>,
    file_ids: HashMap<String, FileId>,
    defined: HashSet<UniqueId>,
}

/// Document part of a URI, used as the file key
fn document_key(uri: &Url) -> String {
    let mut doc = uri.clone();
    doc.set_fragment(None);
    doc.to_string()
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn next_object_id(&mut self, class_id: ClassId) -> u64 {
        let counter = self.counters.entry(class_id).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Id for `uri`, allocating one of kind `class_id` on first use
    ///
    /// The URI is expected to be absolute and to carry the element id as
    /// fragment. Asking for a known URI with a different kind fails with
    /// [`Error::IdClassMismatch`] and leaves the registry unchanged.
    pub fn get_or_create_id(&mut self, uri: &Url, class_id: ClassId) -> Result<UniqueId> {
        if let Some(&existing) = self.uri_ids.get(uri.as_str()) {
            if existing.class_id != class_id {
                return Err(Error::IdClassMismatch {
                    uri: uri.to_string(),
                    existing: existing.class_id.to_string(),
                    requested: class_id.to_string(),
                });
            }
            return Ok(existing);
        }

        let file_id = self.get_or_create_file_id(uri);
        let id = UniqueId::new(class_id, self.next_object_id(class_id), file_id);
        tracing::trace!(%uri, %id, "registered id");
        self.uri_ids.insert(uri.to_string(), id);
        Ok(id)
    }

    /// Id previously assigned to `uri`, or [`UniqueId::INVALID`]
    pub fn lookup_id(&self, uri: &Url) -> UniqueId {
        self.uri_ids
            .get(uri.as_str())
            .copied()
            .unwrap_or(UniqueId::INVALID)
    }

    /// Fresh id for an element without `id`
    pub fn create_anonymous_id(&mut self, class_id: ClassId, file_id: FileId) -> UniqueId {
        let id = UniqueId::new(class_id, self.next_object_id(class_id), file_id);
        tracing::trace!(%id, "registered anonymous id");
        id
    }

    /// File id of the document part of `uri`, allocating on first use
    pub fn get_or_create_file_id(&mut self, uri: &Url) -> FileId {
        let key = document_key(uri);
        if let Some(&id) = self.file_ids.get(&key) {
            return id;
        }
        let id = FileId(self.files.len() as u32);
        let mut doc = uri.clone();
        doc.set_fragment(None);
        tracing::debug!(uri = %doc, file_id = %id, "registered document");
        self.files.push(doc);
        self.file_ids.insert(key, id);
        id
    }

    /// File id of the document part of `uri`, or [`FileId::INVALID`]
    pub fn lookup_file_id(&self, uri: &Url) -> FileId {
        self.file_ids
            .get(&document_key(uri))
            .copied()
            .unwrap_or(FileId::INVALID)
    }

    /// URI of a registered document
    pub fn file_uri(&self, file_id: FileId) -> Option<&Url> {
        self.files.get(file_id.0 as usize)
    }

    /// Number of registered documents
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Resolve a reference found in document `base` to an absolute URI
    ///
    /// A bare fragment (`#id`) stays within `base`; relative paths are
    /// resolved against its location.
    pub fn resolve(&self, base: FileId, reference: &str) -> Result<Url> {
        let base_uri = self
            .file_uri(base)
            .ok_or_else(|| Error::InvalidUri(format!("unknown document {}", base)))?;
        Ok(base_uri.join(reference.trim())?)
    }

    /// Record that the element behind `id` was actually found
    pub fn define(&mut self, id: UniqueId) -> bool {
        self.defined.insert(id)
    }

    /// Forget a definition, for objects dropped after validation errors
    pub fn undefine(&mut self, id: UniqueId) {
        self.defined.remove(&id);
    }

    /// Whether the element behind `id` was found
    pub fn is_defined(&self, id: UniqueId) -> bool {
        self.defined.contains(&id)
    }
}

/// Turn a filesystem path into an absolute `file:` URI
pub fn path_to_uri(path: &Path) -> Result<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map_err(|_| Error::InvalidUri(format!("cannot express '{}' as URI", path.display())))
}

/// The raw element id named by a URI fragment, percent-decoded
pub fn fragment_id(uri: &Url) -> Option<String> {
    let fragment = uri.fragment()?;
    match urlencoding::decode(fragment) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(fragment.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> (Registry, FileId) {
        let mut registry = Registry::new();
        let file = registry.get_or_create_file_id(&Url::parse("file:///scenes/main.dae").unwrap());
        (registry, file)
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let (mut registry, file) = base();
        let uri = registry.resolve(file, "#geom").unwrap();
        let a = registry.get_or_create_id(&uri, ClassId::Geometry).unwrap();
        let b = registry.get_or_create_id(&uri, ClassId::Geometry).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.lookup_id(&uri), a);
        assert_eq!(a.file_id, file);
    }

    #[test]
    fn test_lookup_unknown_is_invalid() {
        let (registry, file) = base();
        let uri = registry.resolve(file, "#nothing").unwrap();
        assert_eq!(registry.lookup_id(&uri), UniqueId::INVALID);
    }

    #[test]
    fn test_class_mismatch_is_rejected() {
        let (mut registry, file) = base();
        let uri = registry.resolve(file, "#thing").unwrap();
        let first = registry.get_or_create_id(&uri, ClassId::Material).unwrap();
        let err = registry.get_or_create_id(&uri, ClassId::Geometry).unwrap_err();
        assert!(matches!(err, Error::IdClassMismatch { .. }));
        assert_eq!(registry.lookup_id(&uri), first);
    }

    #[test]
    fn test_ids_monotonic_per_class() {
        let (mut registry, file) = base();
        let a = registry
            .get_or_create_id(&registry.resolve(file, "#a").unwrap(), ClassId::Node)
            .unwrap();
        let anon = registry.create_anonymous_id(ClassId::Node, file);
        let b = registry
            .get_or_create_id(&registry.resolve(file, "#b").unwrap(), ClassId::Node)
            .unwrap();
        assert!(a.object_id < anon.object_id);
        assert!(anon.object_id < b.object_id);

        let geom = registry
            .get_or_create_id(&registry.resolve(file, "#g").unwrap(), ClassId::Geometry)
            .unwrap();
        assert_eq!(geom.object_id, 1);
    }

    #[test]
    fn test_fragment_reference_stays_in_current_file() {
        let (mut registry, file) = base();
        let uri = registry.resolve(file, "#x").unwrap();
        assert_eq!(registry.get_or_create_file_id(&uri), file);
        assert_eq!(registry.file_count(), 1);
    }

    #[test]
    fn test_relative_reference_allocates_new_file() {
        let (mut registry, file) = base();
        let uri = registry.resolve(file, "parts/wheel.dae#wheel").unwrap();
        assert_eq!(uri.as_str(), "file:///scenes/parts/wheel.dae#wheel");
        let other = registry.get_or_create_file_id(&uri);
        assert_ne!(other, file);
        assert_eq!(
            registry.file_uri(other).map(Url::as_str),
            Some("file:///scenes/parts/wheel.dae")
        );
        // Same document through a different spelling
        let again = registry.resolve(file, "./parts/wheel.dae").unwrap();
        assert_eq!(registry.get_or_create_file_id(&again), other);
    }

    #[test]
    fn test_file_uri_unknown() {
        let (registry, _) = base();
        assert!(registry.file_uri(FileId(7)).is_none());
        assert!(registry.file_uri(FileId::INVALID).is_none());
    }

    #[test]
    fn test_define_and_undefine() {
        let (mut registry, file) = base();
        let id = registry.create_anonymous_id(ClassId::Geometry, file);
        assert!(!registry.is_defined(id));
        assert!(registry.define(id));
        assert!(!registry.define(id));
        registry.undefine(id);
        assert!(!registry.is_defined(id));
    }

    #[test]
    fn test_fragment_id_decodes() {
        let uri = Url::parse("file:///a.dae#my%20node").unwrap();
        assert_eq!(fragment_id(&uri).as_deref(), Some("my node"));
        let plain = Url::parse("file:///a.dae").unwrap();
        assert_eq!(fragment_id(&plain), None);
    }
}
