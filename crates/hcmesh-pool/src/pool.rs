//! The two-tier slab allocator.
//!
//! The index space `[0, max_cells)` is shared by two heaps:
//!
//! ```text
//! [0, n)                 basegrid cells        (alloc_base)
//! [n, heap1)             heap1 child blocks    (grow upward)
//! [heap1, heap2)         free
//! [heap2, max_cells)     heap2 A-blocks        (grow downward)
//! ```
//!
//! Freed blocks are threaded onto per-heap freelists through integer
//! field 0 of their first record. Handles are never relocated.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hcmesh_core::{GridIndex, PeId, Real, RealFormat, NOINDEX};
use log::{debug, error, trace};

use crate::cache::{CacheIndex, RecordCache};
use crate::coherency::CoherencySet;
use crate::config::{ExhaustionPolicy, PoolConfig};
use crate::error::PoolError;
use crate::stats::PoolStats;
use crate::storage::SharedStore;
use crate::transport::Transport;

/// Value of integer field 0 of a live heap2 block.
///
/// A block on freelist2 holds the next-free link there instead, which is
/// either another handle or `NOINDEX`, never this marker.
pub const ABLOCK_LIVE: GridIndex = u32::MAX - 1;

pub(crate) struct PoolShared {
    pub(crate) store: SharedStore,
    root: Mutex<CoherencySet>,
}

impl PoolShared {
    fn new(config: &PoolConfig, npes: u32) -> Self {
        Self {
            store: SharedStore::new(
                config.max_cells,
                config.record_len_reals,
                config.record_len_ints,
                npes,
            ),
            root: Mutex::new(CoherencySet::empty(config.max_cells)),
        }
    }

    pub(crate) fn lock_root(&self) -> MutexGuard<'_, CoherencySet> {
        self.root.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One PE's view of the memory pool.
///
/// The record arrays and the authoritative coherency set are shared by
/// every view of a group. Each view owns its local coherency copy and its
/// record cache, so a view is `Send` but not `Sync`: move one to each PE
/// thread.
pub struct MemPool {
    pub(crate) config: PoolConfig,
    pub(crate) shared: Arc<PoolShared>,
    transport: Transport,
    pub(crate) local: CoherencySet,
    pub(crate) cache: RefCell<RecordCache>,
    pub(crate) merge_load: bool,
    pub(crate) loaded_format: Option<RealFormat>,
    stats: PoolStats,
    remote_fetches: Cell<u64>,
    cache_loads: Cell<u64>,
}

impl MemPool {
    /// Create a serial (single-PE) pool.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let shared = Arc::new(PoolShared::new(&config, 1));
        Ok(Self::with_transport(config, shared, Transport::serial()))
    }

    /// Create `npes` views of one shared pool, indexed by PE id.
    pub fn new_group(config: PoolConfig, npes: u32) -> Result<Vec<Self>, PoolError> {
        config.validate()?;
        if npes == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "a PE group needs at least one PE".into(),
            });
        }
        let shared = Arc::new(PoolShared::new(&config, npes));
        Ok(Transport::group(npes)
            .into_iter()
            .map(|t| Self::with_transport(config.clone(), Arc::clone(&shared), t))
            .collect())
    }

    fn with_transport(config: PoolConfig, shared: Arc<PoolShared>, transport: Transport) -> Self {
        let cache = RecordCache::new(
            config.cache_slots,
            config.record_len_reals as usize,
            config.record_len_ints as usize,
        );
        Self {
            local: CoherencySet::empty(config.max_cells),
            config,
            shared,
            transport,
            cache: RefCell::new(cache),
            merge_load: false,
            loaded_format: None,
            stats: PoolStats::default(),
            remote_fetches: Cell::new(0),
            cache_loads: Cell::new(0),
        }
    }

    // ── Geometry of the pool ────────────────────────────────────

    /// The configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Total number of records.
    pub fn max_cells(&self) -> u32 {
        self.config.max_cells
    }

    /// Real fields per record.
    pub fn record_len_reals(&self) -> usize {
        self.config.record_len_reals as usize
    }

    /// Integer fields per record.
    pub fn record_len_ints(&self) -> usize {
        self.config.record_len_ints as usize
    }

    /// Records per heap1 block.
    pub fn chunk_size1(&self) -> u32 {
        self.config.chunk_size1
    }

    /// Records per heap2 block.
    pub fn chunk_size2(&self) -> u32 {
        self.config.chunk_size2
    }

    /// This view's PE.
    pub fn me(&self) -> PeId {
        self.transport.me()
    }

    /// Number of PEs sharing the pool.
    pub fn npes(&self) -> u32 {
        self.transport.npes()
    }

    /// The PE group handle.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Whether record `h` lives in this PE's partition.
    #[inline]
    pub fn is_local(&self, h: GridIndex) -> bool {
        self.transport.is_local(h)
    }

    /// Counters for this view.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            remote_fetches: self.remote_fetches.get(),
            cache_loads: self.cache_loads.get(),
            ..self.stats
        }
    }

    // ── Allocation ──────────────────────────────────────────────

    /// Reserve records `[0, n)` for the basegrid.
    ///
    /// Only valid on an empty pool.
    pub fn alloc_base(&mut self, n: u32) -> Result<(), PoolError> {
        let mut root = self.shared.lock_root();
        if root.freepool != 0 || root.heap2 != self.config.max_cells {
            return Err(PoolError::AlreadyInitialised);
        }
        if n > root.heap2 {
            return Err(PoolError::CapacityExceeded {
                requested: n as u64,
                capacity: root.heap2 as u64,
            });
        }
        root.heap1 = n;
        root.freepool = n;
        self.local = *root;
        debug!("pe {}: basegrid of {n} cells reserved", self.transport.me());
        Ok(())
    }

    /// Take one heap1 block of `chunk_size1` contiguous records.
    ///
    /// Reuses the most recently freed block if there is one. Exhaustion
    /// is fatal and handled by the configured [`ExhaustionPolicy`].
    pub fn alloc_heap1(&mut self) -> GridIndex {
        let c1 = self.config.chunk_size1;
        let shared = &self.shared;
        let mut root = shared.lock_root();
        let h = if root.freelist1 != NOINDEX {
            let h = root.freelist1;
            root.freelist1 = shared.store.int(h, 0, Ordering::Acquire);
            root.n_freelist1 -= 1;
            self.stats.heap1_reuses += 1;
            trace!("pop freelist1 -> {h}");
            h
        } else {
            if root.heap1 as u64 + c1 as u64 > root.heap2 as u64 {
                let snapshot = *root;
                drop(root);
                self.exhausted("heap1", snapshot);
            }
            let h = root.heap1;
            root.heap1 += c1;
            root.freepool = root.heap1;
            self.stats.heap1_bumps += 1;
            trace!("bump heap1 -> {h}");
            h
        };
        self.local = *root;
        h
    }

    /// Take one heap2 block of `chunk_size2` contiguous records and mark
    /// it live. Returns `NOINDEX` when heap2 is disabled (`chunk_size2 == 0`).
    pub fn alloc_heap2(&mut self) -> GridIndex {
        let c2 = self.config.chunk_size2;
        if c2 == 0 {
            return NOINDEX;
        }
        let shared = &self.shared;
        let mut root = shared.lock_root();
        let h = if root.freelist2 != NOINDEX {
            let h = root.freelist2;
            root.freelist2 = shared.store.int(h, 0, Ordering::Acquire);
            root.n_freelist2 -= 1;
            self.stats.heap2_reuses += 1;
            trace!("pop freelist2 -> {h}");
            h
        } else {
            if (root.heap2 as u64) < root.heap1 as u64 + c2 as u64 {
                let snapshot = *root;
                drop(root);
                self.exhausted("heap2", snapshot);
            }
            root.heap2 -= c2;
            self.stats.heap2_bumps += 1;
            trace!("bump heap2 -> {}", root.heap2);
            root.heap2
        };
        shared.store.set_int(h, 0, ABLOCK_LIVE, Ordering::Release);
        self.local = *root;
        h
    }

    /// Return a heap1 block to freelist1.
    pub fn dealloc_heap1(&mut self, h: GridIndex) {
        let shared = &self.shared;
        let mut root = shared.lock_root();
        debug_assert!(h < root.freepool, "dealloc_heap1({h}) above freepool");
        shared.store.set_int(h, 0, root.freelist1, Ordering::Release);
        root.freelist1 = h;
        root.n_freelist1 += 1;
        self.stats.heap1_frees += 1;
        trace!("push freelist1 <- {h}");
        self.local = *root;
    }

    /// Return a live heap2 block to freelist2.
    pub fn dealloc_heap2(&mut self, h: GridIndex) {
        if h == NOINDEX {
            return;
        }
        let shared = &self.shared;
        let mut root = shared.lock_root();
        debug_assert!(
            h >= root.heap2 && h < self.config.max_cells,
            "dealloc_heap2({h}) outside heap2"
        );
        debug_assert_eq!(
            shared.store.int(h, 0, Ordering::Acquire),
            ABLOCK_LIVE,
            "dealloc_heap2({h}) of a block that is not live"
        );
        shared.store.set_int(h, 0, root.freelist2, Ordering::Release);
        root.freelist2 = h;
        root.n_freelist2 += 1;
        self.stats.heap2_frees += 1;
        trace!("push freelist2 <- {h}");
        self.local = *root;
    }

    fn exhausted(&self, heap: &str, state: CoherencySet) -> ! {
        error!(
            "pe {}: memory pool exhausted allocating from {heap} ({} records): {state}",
            self.transport.me(),
            self.config.max_cells
        );
        match self.config.on_exhaustion {
            ExhaustionPolicy::Abort => std::process::abort(),
            ExhaustionPolicy::Panic => {
                panic!("memory pool exhausted allocating from {heap}: {state}")
            }
        }
    }

    // ── Counts and coherency ────────────────────────────────────

    /// Records between the heaps, read from the authoritative copy.
    pub fn freecells(&self) -> u32 {
        let root = self.shared.lock_root();
        root.heap2 - root.freepool
    }

    /// Cell high-water mark, read from the authoritative copy.
    pub fn ncells(&self) -> u32 {
        self.shared.lock_root().freepool
    }

    /// Cell high-water mark from this PE's local copy.
    ///
    /// Only trustworthy immediately after [`pe_coherency`](Self::pe_coherency)
    /// or on the PE that performed the last allocation.
    pub fn ncells_fast(&self) -> u32 {
        self.local.freepool
    }

    /// Records in use, in units of one cell record.
    pub fn allocated_mem_as_units_of_cell(&self) -> u32 {
        let root = self.shared.lock_root();
        (self.config.max_cells - root.heap2) + root.freepool
            - self.config.chunk_size1 * root.n_freelist1
            - self.config.chunk_size2 * root.n_freelist2
    }

    /// This PE's local copy of the coherency set.
    pub fn coherency(&self) -> CoherencySet {
        self.local
    }

    /// Collective: every PE adopts the authoritative coherency set as sent
    /// by PE `root`. Must be called by every PE of the group. No-op in
    /// serial execution.
    pub fn pe_coherency(&mut self, root: PeId) {
        if self.transport.is_serial() {
            return;
        }
        let value = if self.transport.me() == root {
            *self.shared.lock_root()
        } else {
            self.local
        };
        self.local = self.transport.broadcast(root, value);
    }

    /// Adopt the authoritative coherency set without a barrier.
    ///
    /// Only sound while no other PE of the group is running, e.g. right
    /// after building a group and initialising it from one thread.
    pub fn resync_from_root(&mut self) {
        self.local = *self.shared.lock_root();
    }

    /// Block until every PE of the group has arrived.
    pub fn barrier(&self) {
        self.transport.barrier();
    }

    // ── Coherent access ─────────────────────────────────────────

    #[inline]
    fn note_remote(&self, cell: GridIndex) {
        if !self.transport.is_local(cell) {
            self.remote_fetches.set(self.remote_fetches.get() + 1);
        }
    }

    /// Read a real field, fetching from the owning PE if necessary.
    #[inline]
    pub fn real(&self, cell: GridIndex, comp: usize) -> Real {
        self.note_remote(cell);
        self.shared.store.real(cell, comp, Ordering::Acquire)
    }

    /// Read an integer field, fetching from the owning PE if necessary.
    #[inline]
    pub fn int(&self, cell: GridIndex, comp: usize) -> GridIndex {
        self.note_remote(cell);
        self.shared.store.int(cell, comp, Ordering::Acquire)
    }

    /// Write a real field into the owning PE's partition.
    #[inline]
    pub fn set_real(&self, cell: GridIndex, comp: usize, v: Real) {
        self.note_remote(cell);
        self.shared.store.set_real(cell, comp, v, Ordering::Release);
    }

    /// Write an integer field into the owning PE's partition.
    ///
    /// The store has release ordering: every write this PE made before it
    /// is visible to a PE that reads the new value coherently.
    #[inline]
    pub fn set_int(&self, cell: GridIndex, comp: usize, v: GridIndex) {
        self.note_remote(cell);
        self.shared.store.set_int(cell, comp, v, Ordering::Release);
    }

    /// Atomically replace an integer field and return the previous value.
    ///
    /// With a single PE this is a plain load and store.
    pub fn int_swap(&self, cell: GridIndex, comp: usize, v: GridIndex) -> GridIndex {
        if self.transport.is_serial() {
            let old = self.shared.store.int(cell, comp, Ordering::Relaxed);
            self.shared.store.set_int(cell, comp, v, Ordering::Relaxed);
            old
        } else {
            self.note_remote(cell);
            self.shared.store.swap_int(cell, comp, v)
        }
    }

    /// Reset every field of `cell`: reals to 0, integers to `NOINDEX`.
    pub fn clear_record(&self, cell: GridIndex) {
        self.shared.store.clear_record(cell);
    }

    // ── Local access ────────────────────────────────────────────

    /// Read a real field of a record in this PE's partition.
    #[inline]
    pub fn real_local(&self, cell: GridIndex, comp: usize) -> Real {
        debug_assert!(self.is_local(cell), "real_local({cell}) is not resident");
        self.shared.store.real(cell, comp, Ordering::Relaxed)
    }

    /// Read an integer field of a record in this PE's partition.
    #[inline]
    pub fn int_local(&self, cell: GridIndex, comp: usize) -> GridIndex {
        debug_assert!(self.is_local(cell), "int_local({cell}) is not resident");
        self.shared.store.int(cell, comp, Ordering::Relaxed)
    }

    /// Write a real field of a record in this PE's partition.
    #[inline]
    pub fn set_real_local(&self, cell: GridIndex, comp: usize, v: Real) {
        debug_assert!(self.is_local(cell), "set_real_local({cell}) is not resident");
        self.shared.store.set_real(cell, comp, v, Ordering::Relaxed);
    }

    /// Write an integer field of a record in this PE's partition.
    #[inline]
    pub fn set_int_local(&self, cell: GridIndex, comp: usize, v: GridIndex) {
        debug_assert!(self.is_local(cell), "set_int_local({cell}) is not resident");
        self.shared.store.set_int(cell, comp, v, Ordering::Relaxed);
    }

    // ── Record cache ────────────────────────────────────────────

    /// Copy the whole record `cell` into the next cache slot.
    pub fn load(&self, cell: GridIndex) -> CacheIndex {
        self.note_remote(cell);
        self.cache_loads.set(self.cache_loads.get() + 1);
        let store = &self.shared.store;
        self.cache.borrow_mut().push(cell, |reals, ints| {
            for (c, r) in reals.iter_mut().enumerate() {
                *r = store.real(cell, c, Ordering::Acquire);
            }
            for (c, i) in ints.iter_mut().enumerate() {
                *i = store.int(cell, c, Ordering::Acquire);
            }
        })
    }

    /// Load several records, one cache slot each, in order.
    pub fn prefetch(&self, cells: &[GridIndex]) -> Vec<CacheIndex> {
        cells.iter().map(|&c| self.load(c)).collect()
    }

    /// Read a real field from a cached record.
    #[inline]
    pub fn real_cached(&self, ci: CacheIndex, comp: usize) -> Real {
        self.cache.borrow().real(ci, comp)
    }

    /// Read an integer field from a cached record.
    #[inline]
    pub fn int_cached(&self, ci: CacheIndex, comp: usize) -> GridIndex {
        self.cache.borrow().int(ci, comp)
    }

    /// The handle a cache slot was loaded from.
    pub fn cached_cell(&self, ci: CacheIndex) -> GridIndex {
        self.cache.borrow().cell(ci)
    }

    /// Release the most recently loaded cache slot.
    pub fn popcache(&self) {
        self.cache.borrow_mut().pop();
    }

    /// Release every cache slot.
    pub fn clearcache(&self) {
        self.cache.borrow_mut().clear();
    }

    // ── Persistence switches ────────────────────────────────────

    /// Make subsequent [`stream_load`](Self::stream_load) calls overlay
    /// records onto the resident pool instead of replacing it.
    pub fn set_merge_load(&mut self, flag: bool) {
        self.merge_load = flag;
    }

    /// Whether loads currently merge.
    pub fn merge_load(&self) -> bool {
        self.merge_load
    }

    /// Real width of the last successfully loaded stream.
    pub fn loaded_real_format(&self) -> Option<RealFormat> {
        self.loaded_format
    }
}

impl fmt::Display for MemPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = *self.shared.lock_root();
        let used = (self.config.max_cells - root.heap2) + root.freepool
            - self.config.chunk_size1 * root.n_freelist1
            - self.config.chunk_size2 * root.n_freelist2;
        writeln!(
            f,
            "MemPool pe {}/{}: {} records of {} reals + {} ints, chunks {}/{}",
            self.transport.me(),
            self.transport.npes(),
            self.config.max_cells,
            self.config.record_len_reals,
            self.config.record_len_ints,
            self.config.chunk_size1,
            self.config.chunk_size2,
        )?;
        writeln!(f, "  {root}")?;
        write!(
            f,
            "  {used} of {} records allocated ({:.1}%), {} free",
            self.config.max_cells,
            100.0 * used as f64 / self.config.max_cells as f64,
            root.heap2 - root.freepool,
        )
    }
}

impl fmt::Debug for MemPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemPool")
            .field("me", &self.transport.me())
            .field("npes", &self.transport.npes())
            .field("max_cells", &self.config.max_cells)
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

// Compile-time assertion: a PE view can be moved to its own thread.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<MemPool>();
};
