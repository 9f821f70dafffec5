//! # Store Module
//!
//! The top-level handle applications open: owns the engine binding, the
//! reconciled schema registry, the writer-exclusion gate, and the
//! process-wide `maxCollectionId` counter. There is no global singleton —
//! every transaction borrows from an explicit `Store` value, per the
//! re-architecture note in SPEC_FULL.md section 9.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use log::info;

use crate::config::StoreConfig;
use crate::engine::{ExclusiveReadGuard, SledEngine, WriteGate};
use crate::error::{StoreError, StoreResult};
use crate::key::{ObjectKey, COLLECTION_CLSID};
use crate::schema::{ClassSpec, SchemaRegistry};
use crate::txn::{ReadTxn, WriteTxn};

pub struct Store {
    pub(crate) engine: SledEngine,
    pub(crate) registry: RwLock<Option<SchemaRegistry>>,
    pub(crate) gate: WriteGate,
    pub(crate) config: StoreConfig,
    pub(crate) max_collection_id: Mutex<u32>,
    /// In-memory reference counts for `refcounted` classes. Never
    /// serialized: a fresh process recomputing these from scratch would
    /// need a full scan, which this store does not perform — refcounting
    /// is advisory bookkeeping for shared `embedded_key` children within
    /// one process's lifetime, matching the source's documented behavior.
    pub(crate) refcounts: Mutex<HashMap<ObjectKey, u32>>,
}

impl Store {
    /// Opens the engine binding at `config.path`. No classes are
    /// registered yet; call [`Store::open_schema`] before issuing any
    /// object-level transaction.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.path)?;
        let engine = SledEngine::open(&config.path)?;
        let max_collection_id = scan_max_collection_id(&engine)?;
        info!(
            "opened store '{}' at {:?} (max_collection_id={})",
            config.name, config.path, max_collection_id
        );
        Ok(Self {
            engine,
            registry: RwLock::new(None),
            gate: WriteGate::new(),
            config,
            max_collection_id: Mutex::new(max_collection_id),
            refcounts: Mutex::new(HashMap::new()),
        })
    }

    /// Reconciles `specs` against persisted class metadata and persists the
    /// result back, per SPEC_FULL.md section 4.3. `best_effort` controls
    /// whether a `none`-compatibility class aborts the call.
    pub fn open_schema(&self, specs: Vec<ClassSpec>, best_effort: bool) -> StoreResult<()> {
        let registry = SchemaRegistry::open(
            self.engine.classmeta(),
            self.engine.classdata(),
            specs,
            best_effort,
        )?;
        registry.persist(self.engine.classmeta())?;
        *self.registry.write().expect("schema registry lock poisoned") = Some(registry);
        Ok(())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The reconciled compatibility verdict for `class_name`, as recorded
    /// at the last `open_schema` call.
    pub fn class_compatibility(&self, class_name: &str) -> StoreResult<crate::schema::SchemaCompatibility> {
        let guard = self.registry()?;
        let registry = guard.as_ref().unwrap();
        registry
            .class(class_name)
            .map(|d| d.compatibility)
            .ok_or_else(|| StoreError::InvalidArgument(format!("unregistered class '{}'", class_name)))
    }

    pub(crate) fn registry(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Option<SchemaRegistry>>> {
        let guard = self.registry.read().expect("schema registry lock poisoned");
        if guard.is_none() {
            return Err(StoreError::InvalidArgument(
                "Store::open_schema must be called before any transaction".into(),
            ));
        }
        Ok(guard)
    }

    pub(crate) fn registry_mut(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Option<SchemaRegistry>>> {
        let guard = self.registry.write().expect("schema registry lock poisoned");
        if guard.is_none() {
            return Err(StoreError::InvalidArgument(
                "Store::open_schema must be called before any transaction".into(),
            ));
        }
        Ok(guard)
    }

    /// Opens a concurrent, non-exclusive read transaction.
    pub fn begin_read(&self) -> ReadTxn<'_> {
        ReadTxn::new(self)
    }

    /// Opens a read transaction that blocks any future writer until it is
    /// dropped, for zero-copy sub-range reads that must outlive a
    /// concurrent map growth.
    pub fn begin_exclusive_read(&self) -> StoreResult<(ReadTxn<'_>, ExclusiveReadGuard<'_>)> {
        let guard = self.gate.begin_exclusive_read()?;
        Ok((ReadTxn::new(self), guard))
    }

    /// Opens the single write transaction slot. `append` enables append
    /// mode, in which collection writes require strictly-increasing keys
    /// and reject arbitrary random writes. `blocking` controls whether
    /// this call waits for an active writer or exclusive read to finish,
    /// or fails immediately.
    pub fn begin_write(&self, append: bool, blocking: bool) -> StoreResult<WriteTxn<'_>> {
        let guard = self.gate.begin_write(blocking)?;
        Ok(WriteTxn::new(self, guard, append))
    }

    /// Forces both sub-databases to disk. `sled` also flushes lazily in the
    /// background, so this is a durability convenience for callers that
    /// want a synchronous checkpoint (e.g. before process exit), not a
    /// correctness requirement of `commit` itself.
    pub fn flush(&self) -> StoreResult<()> {
        self.engine.flush()
    }
}

fn scan_max_collection_id(engine: &SledEngine) -> StoreResult<u32> {
    let lower = crate::key::StorageKey::class_lower(COLLECTION_CLSID);
    let upper = crate::key::StorageKey::class_upper(COLLECTION_CLSID);
    match engine.classdata().last_in_range(&lower, &upper)? {
        Some((key, _)) => {
            let key = crate::key::StorageKey::from_bytes(&key)?;
            Ok(key.object_id)
        }
        None => Ok(0),
    }
}
