// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Identity documents with type-aware supersession.
//!
//! An identifier keeps at most one non-expired document per logical type.
//! The primary user document has two comparable labels for historical
//! reasons: an incoming visa with no stored visa supersedes the last
//! legacy profile document instead.

use crate::storage::cache::CachePool;
use crate::storage::task::DbTask;
use crate::storage::{CacheService, StorageService};
use crate::types::{last_document, Document, DocumentType, UserId};
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Pool key for the all-documents scan cache
const ALL_DOCUMENTS_KEY: &str = "all_documents";

/// Scan-cache lifespan
const SCAN_CACHE_EXPIRES: Duration = Duration::from_secs(3600);
/// Scan-cache refresh margin
const SCAN_CACHE_REFRESH: Duration = Duration::from_secs(600);

struct DocPools {
    documents: CachePool<UserId, Vec<Document>>,
    scan: CachePool<String, Vec<Document>>,
}

struct DocTask<'a, C, S> {
    identifier: &'a UserId,
    redis: &'a C,
    dos: &'a S,
    expires: Duration,
    margin: Duration,
}

#[async_trait]
impl<C: CacheService, S: StorageService> DbTask for DocTask<'_, C, S> {
    type Key = UserId;
    type Value = Vec<Document>;

    fn cache_key(&self) -> UserId {
        self.identifier.clone()
    }

    fn cache_expires(&self) -> Duration {
        self.expires
    }

    fn refresh_margin(&self) -> Duration {
        self.margin
    }

    async fn read_data(&self) -> Option<Vec<Document>> {
        // 1. check the cache server
        if let Some(docs) = self.redis.load_documents(self.identifier).await {
            if !docs.is_empty() {
                return Some(docs);
            }
        }
        // 2. check local storage, back-filling the cache server on a hit
        let docs = self.dos.load_documents(self.identifier).await?;
        if docs.is_empty() {
            return None;
        }
        self.redis.save_documents(&docs, self.identifier).await;
        Some(docs)
    }

    async fn write_data(&self, value: &Vec<Document>) -> bool {
        let ok1 = self.redis.save_documents(value, self.identifier).await;
        let ok2 = self.dos.save_documents(value, self.identifier).await;
        ok1 || ok2
    }
}

/// Read-only task feeding the search engine with every stored document
struct ScanTask<'a, S> {
    dos: &'a S,
}

#[async_trait]
impl<S: StorageService> DbTask for ScanTask<'_, S> {
    type Key = String;
    type Value = Vec<Document>;

    fn cache_key(&self) -> String {
        ALL_DOCUMENTS_KEY.to_string()
    }

    fn cache_expires(&self) -> Duration {
        SCAN_CACHE_EXPIRES
    }

    fn refresh_margin(&self) -> Duration {
        SCAN_CACHE_REFRESH
    }

    async fn read_data(&self) -> Option<Vec<Document>> {
        self.dos.scan_documents().await
    }

    async fn write_data(&self, _value: &Vec<Document>) -> bool {
        // the scan cache is never written through
        false
    }
}

/// Table for typed identity documents
pub struct DocumentTable<C, S> {
    redis: Arc<C>,
    dos: Arc<S>,
    expires: Duration,
    margin: Duration,
    pools: Mutex<DocPools>,
}

impl<C: CacheService, S: StorageService> DocumentTable<C, S> {
    pub(crate) fn new(redis: Arc<C>, dos: Arc<S>, expires: Duration, margin: Duration) -> Self {
        Self {
            redis,
            dos,
            expires,
            margin,
            pools: Mutex::new(DocPools {
                documents: CachePool::new(),
                scan: CachePool::new(),
            }),
        }
    }

    fn doc_task<'a>(&'a self, identifier: &'a UserId) -> DocTask<'a, C, S> {
        DocTask {
            identifier,
            redis: &self.redis,
            dos: &self.dos,
            expires: self.expires,
            margin: self.margin,
        }
    }

    /// Get all documents of `identifier` (empty when unknown)
    pub async fn get_documents(&self, identifier: &UserId) -> Vec<Document> {
        let mut pools = self.pools.lock().await;
        let task = self.doc_task(identifier);
        task.load(&mut pools.documents).await.unwrap_or_default()
    }

    /// Store a document unless a comparable stored document supersedes it.
    ///
    /// The superseded document is removed from the identifier's list, the
    /// new one appended, a standing all-documents scan entry is patched in
    /// place, and the full list is persisted through both sinks.
    pub async fn save_document(&self, document: Document) -> bool {
        let identifier = document.identifier.clone();
        let doc_type = document.doc_type;
        let mut guard = self.pools.lock().await;
        let pools = &mut *guard;
        let task = self.doc_task(&identifier);
        let mut my_documents = task.load(&mut pools.documents).await.unwrap_or_default();
        let mut old = last_document(&my_documents, doc_type);
        if old.is_none() && doc_type == DocumentType::Visa {
            // a visa-less profile counts as the authoritative user document
            old = last_document(&my_documents, DocumentType::Profile);
        }
        if let Some(old) = old {
            if document.is_expired(old) {
                warn!("expired document dropped: {}", identifier);
                return false;
            }
            let superseded = old.clone();
            // remove exactly one occurrence, duplicates stay untouched
            if let Some(index) = my_documents.iter().position(|doc| *doc == superseded) {
                my_documents.remove(index);
            }
        }
        my_documents.push(document.clone());
        // keep a standing scan-cache entry in sync for the search engine
        pools.scan.modify(
            &ALL_DOCUMENTS_KEY.to_string(),
            Instant::now(),
            |all_documents| {
                all_documents.push(document);
            },
        );
        task.save(my_documents, &mut pools.documents).await
    }

    /// Scan every stored document (search-engine feed, durable tier only)
    pub async fn scan_documents(&self) -> Vec<Document> {
        let mut pools = self.pools.lock().await;
        let task = ScanTask { dos: &*self.dos };
        task.load(&mut pools.scan).await.unwrap_or_default()
    }
}
