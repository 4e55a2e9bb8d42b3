//! Stub capabilities shared by the unit tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::engine::{EngineBox, EngineError, EngineItem, LocalPackingEngine, PackedBox};
use crate::error::StoreError;
use crate::fingerprint::Fingerprint;
use crate::model::{MinimalPackaging, Packaging, PackagingId, Product, ProductId};
use crate::remote::{RemoteApiError, RemotePackingApi, RemotePackingOutcome};
use crate::store::{MemoryStore, PersistentStore};

/// A cube-shaped packaging.
pub fn packaging(id: u64, edge: f64) -> Packaging {
    Packaging::new(PackagingId::new(id), edge, edge, edge, 100.0).unwrap()
}

pub fn product(id: u64, dims: [f64; 3], weight: f64) -> Product {
    Product::new(ProductId::new(id), dims, weight).unwrap()
}

/// [`MemoryStore`] that counts reads and can simulate failures.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    catalog_loads: AtomicUsize,
    point_lookups: AtomicUsize,
    result_lookups: AtomicUsize,
    saves: AtomicUsize,
    unavailable: AtomicBool,
    lose_save_race: AtomicBool,
}

impl CountingStore {
    pub fn with_packagings(packagings: Vec<Packaging>) -> Self {
        Self {
            inner: MemoryStore::with_packagings(packagings),
            ..Self::default()
        }
    }

    pub fn catalog_loads(&self) -> usize {
        self.catalog_loads.load(Ordering::SeqCst)
    }

    pub fn point_lookups(&self) -> usize {
        self.point_lookups.load(Ordering::SeqCst)
    }

    pub fn result_lookups(&self) -> usize {
        self.result_lookups.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The next save behaves as if a concurrent writer stored the same
    /// fingerprint first.
    pub fn lose_next_save_race(&self) {
        self.lose_save_race.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistentStore for CountingStore {
    async fn find_all_packagings(&self) -> Result<Vec<Packaging>, StoreError> {
        self.check()?;
        self.catalog_loads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all_packagings().await
    }

    async fn find_packaging_by_id(
        &self,
        id: PackagingId,
    ) -> Result<Option<Packaging>, StoreError> {
        self.check()?;
        self.point_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_packaging_by_id(id).await
    }

    async fn find_result_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<MinimalPackaging>, StoreError> {
        self.check()?;
        self.result_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_result_by_fingerprint(fingerprint).await
    }

    async fn save_result(&self, result: &MinimalPackaging) -> Result<(), StoreError> {
        self.check()?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.lose_save_race.swap(false, Ordering::SeqCst) {
            let winner = MinimalPackaging::new(
                result.packaging().clone(),
                result.fingerprint().clone(),
                0.99,
            );
            self.inner.save_result(&winner).await?;
        }
        self.inner.save_result(result).await
    }

    async fn find_or_create_product(
        &self,
        sorted_dims: [f64; 3],
        weight: f64,
    ) -> Result<(Product, bool), StoreError> {
        self.check()?;
        self.inner.find_or_create_product(sorted_dims, weight).await
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.check()
    }
}

/// Canned answers of [`StubRemote`].
#[derive(Clone, Debug)]
pub enum RemoteReply {
    Packed(u64, f64),
    Infeasible,
    Broken,
}

pub struct StubRemote {
    reply: RemoteReply,
    calls: AtomicUsize,
}

impl StubRemote {
    pub fn new(reply: RemoteReply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemotePackingApi for StubRemote {
    async fn find_minimal_packaging(
        &self,
        _packagings: &[Packaging],
        _products: &[Product],
    ) -> Result<RemotePackingOutcome, RemoteApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            RemoteReply::Packed(id, utilization) => Ok(RemotePackingOutcome::Packed {
                packaging_id: PackagingId::new(*id),
                volume_utilization: *utilization,
            }),
            RemoteReply::Infeasible => Ok(RemotePackingOutcome::Infeasible(
                "items need 2 bins instead of one".to_string(),
            )),
            RemoteReply::Broken => Err(RemoteApiError::Protocol(
                "error parsing bin packing response".to_string(),
            )),
        }
    }
}

/// Engine returning a fixed list of used boxes.
pub struct StubEngine {
    reply: Result<Vec<u64>, EngineError>,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl StubEngine {
    pub fn using(boxes: Vec<u64>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(boxes),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: EngineError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Number of boxes and items seen by each call.
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

impl LocalPackingEngine for StubEngine {
    fn pack(
        &self,
        boxes: &[EngineBox],
        items: &[EngineItem],
    ) -> Result<Vec<PackedBox>, EngineError> {
        self.calls.lock().unwrap().push((boxes.len(), items.len()));
        let used = self.reply.clone()?;
        Ok(used
            .into_iter()
            .map(|id| PackedBox {
                reference: PackagingId::new(id),
                items: Vec::new(),
                volume_utilization: 0.5,
            })
            .collect())
    }
}
