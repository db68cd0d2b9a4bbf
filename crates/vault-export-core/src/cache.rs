/*
 * cache.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Read-through document cache.
 */

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, PoisonError, RwLock};

use crate::graph::{ContentGraph, DocumentId};

/// Read-through memo of document text, keyed by identifier.
///
/// One cache belongs to one conversion and is passed explicitly to the
/// stages that read documents. Concurrent readers may race to fill the same
/// entry; both read the same text, so whichever insert lands is correct.
///
/// Document listings used by name matching are memoized per search root
/// the same way.
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: RwLock<HashMap<DocumentId, Arc<str>>>,
    listings: RwLock<HashMap<Option<String>, Arc<[DocumentId]>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-filled with known document text.
    pub fn seeded<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (DocumentId, S)>,
        S: Into<Arc<str>>,
    {
        let entries = entries.into_iter().map(|(id, s)| (id, s.into())).collect();
        Self {
            entries: RwLock::new(entries),
            listings: RwLock::default(),
        }
    }

    pub fn get(&self, id: &DocumentId) -> Option<Arc<str>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn insert(&self, id: DocumentId, text: impl Into<Arc<str>>) -> Arc<str> {
        let text = text.into();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&text));
        text
    }

    /// Cached text of `id`, reading it from `graph` on a miss.
    ///
    /// Failed reads are not cached.
    pub fn read_through(&self, graph: &dyn ContentGraph, id: &DocumentId) -> io::Result<Arc<str>> {
        if let Some(text) = self.get(id) {
            return Ok(text);
        }
        let text = graph.read_document(id)?;
        Ok(self.insert(id.clone(), text))
    }

    /// Documents under `root`, listing the graph only on the first call.
    pub fn list_through(&self, graph: &dyn ContentGraph, root: Option<&str>) -> Arc<[DocumentId]> {
        let key = root.map(str::to_string);
        if let Some(listing) = self
            .listings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(listing);
        }
        let listing: Arc<[DocumentId]> = graph.list_documents(root).into();
        self.listings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&listing));
        listing
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
