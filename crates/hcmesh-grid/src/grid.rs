//! The hierarchical grid: construction, per-cell accessors and iteration.

use std::fmt;
use std::sync::Arc;

use hcmesh_core::{
    BcType, BoundaryGeometry, CellInfo, CellType, CoordinateMap, EvaluatorFn, GridIndex, PeId,
    Real, NOINDEX,
};
use hcmesh_pool::{MemPool, PoolConfig};
use log::debug;

use crate::boundary::BoundaryTable;
use crate::config::GridConfig;
use crate::error::GridError;
use crate::hook::CellPrepareHook;
use crate::layout::{
    Layout, INT_CELLINFO, INT_CHILDORDER, INT_FIRSTCHILD, INT_LEVEL, INT_MARK, INT_PARENT,
};
use crate::stats::GridStats;
use crate::tables::ChildTables;

/// A dynamically refinable Cartesian grid in `D` dimensions.
///
/// Every cell is a pool record addressed by a [`GridIndex`]. The basegrid
/// occupies handles `[0, n)` in axis-0-fastest order; children created by
/// [`subdivide`](Self::subdivide) occupy `2^D` contiguous handles.
///
/// Accessors take `&self` and go through the pool's coherent path.
/// Operations that allocate (`subdivide`, `recoarsen`) take `&mut self`.
/// In a PE group each PE owns one `HcGrid` view of the shared pool.
pub struct HcGrid<const D: usize> {
    pub(crate) pool: MemPool,
    pub(crate) config: GridConfig<D>,
    pub(crate) layout: Layout,
    pub(crate) tables: ChildTables,
    strides: [u32; D],
    pub(crate) map: Option<Arc<dyn CoordinateMap<D>>>,
    boundaries: Arc<BoundaryTable>,
    pub(crate) hook: Option<Arc<dyn CellPrepareHook<D>>>,
    pub(crate) stats: GridStats,
}

impl<const D: usize> HcGrid<D> {
    /// Children per cell.
    pub const NCHILDREN: usize = 1 << D;

    /// Create a serial grid holding the basegrid described by `config`.
    pub fn new(config: GridConfig<D>) -> Result<Self, GridError> {
        Self::with_map(config, None)
    }

    /// Create a serial grid whose cell volumes and sizes are measured
    /// through `map`.
    pub fn with_map(
        config: GridConfig<D>,
        map: Option<Arc<dyn CoordinateMap<D>>>,
    ) -> Result<Self, GridError> {
        config.validate()?;
        let layout = Layout::new(&config);
        let pool = MemPool::new(pool_config(&config, &layout))?;
        let mut grid = Self::assemble(config, layout, pool, map);
        grid.init_basegrid()?;
        Ok(grid)
    }

    /// Create `npes` views of one grid, indexed by PE id.
    ///
    /// The basegrid is initialised before the views are returned; move
    /// each view to its own thread.
    pub fn new_group(
        config: GridConfig<D>,
        map: Option<Arc<dyn CoordinateMap<D>>>,
        npes: u32,
    ) -> Result<Vec<Self>, GridError> {
        config.validate()?;
        let layout = Layout::new(&config);
        let pools = MemPool::new_group(pool_config(&config, &layout), npes)?;
        let mut grids: Vec<Self> = pools
            .into_iter()
            .map(|p| Self::assemble(config.clone(), layout, p, map.clone()))
            .collect();
        if let Some(first) = grids.first_mut() {
            first.init_basegrid()?;
        }
        for g in grids.iter_mut() {
            g.pool.resync_from_root();
        }
        Ok(grids)
    }

    fn assemble(
        config: GridConfig<D>,
        layout: Layout,
        pool: MemPool,
        map: Option<Arc<dyn CoordinateMap<D>>>,
    ) -> Self {
        let mut strides = [1u32; D];
        for d in 1..D {
            strides[d] = strides[d - 1] * config.shape[d - 1];
        }
        Self {
            pool,
            layout,
            tables: ChildTables::new(D),
            strides,
            map,
            boundaries: Arc::new(BoundaryTable::new()),
            hook: None,
            stats: GridStats::default(),
            config,
        }
    }

    fn init_basegrid(&mut self) -> Result<(), GridError> {
        let n = self.config.base_cells();
        let needed = n * (1 + D as u64 * self.layout.c2 as u64);
        if needed > self.config.max_cells as u64 {
            return Err(GridError::InvalidConfig {
                reason: format!(
                    "basegrid needs {needed} records with its A-blocks, max_cells is {}",
                    self.config.max_cells
                ),
            });
        }
        let n = n as GridIndex;
        self.pool.alloc_base(n)?;
        for h in 0..n {
            self.init_cell(h, NOINDEX, 0, 0, CellInfo::INTERIOR);
        }
        for h in 0..n {
            self.refresh_cell(h);
        }
        debug!(
            "pe {}: basegrid {:?} ({n} cells) initialised",
            self.pool.me(),
            self.config.shape
        );
        Ok(())
    }

    /// Write every structural field of a fresh record and attach A-blocks.
    ///
    /// The payload is zeroed; geometry is derived from the position.
    pub(crate) fn init_cell(
        &mut self,
        c: GridIndex,
        parent: GridIndex,
        order: u32,
        level: u32,
        info: CellInfo,
    ) {
        self.pool.clear_record(c);
        self.pool.set_int(c, INT_PARENT, parent);
        self.pool.set_int(c, INT_FIRSTCHILD, NOINDEX);
        self.pool.set_int(c, INT_CHILDORDER, order);
        self.pool.set_int(c, INT_LEVEL, level);
        self.pool.set_int(c, INT_CELLINFO, info.bits());
        self.pool.set_int(c, INT_MARK, 0);
        self.attach_ablocks(c);
        self.update_geometry(c);
    }

    /// Allocate and initialise the `D` A-blocks of `c`.
    pub(crate) fn attach_ablocks(&mut self, c: GridIndex) {
        for d in 0..D {
            let ab = self.pool.alloc_heap2();
            self.pool.set_int(c, self.layout.int_ablock(d), ab);
        }
        self.init_ablocks(c);
    }

    /// Re-attach A-blocks, clear marks, recompute geometry and rebuild
    /// dense flags and neighbour caches after the pool was loaded from a
    /// stream.
    ///
    /// In a PE group call this on one view, then `pe_coherency` on all.
    pub fn rebuild_after_load(&mut self) {
        let cells: Vec<GridIndex> = self.cells_1pe().collect();
        for &c in &cells {
            self.pool.set_int(c, INT_MARK, 0);
            self.update_geometry(c);
            self.attach_ablocks(c);
        }
        self.refresh_all();
        debug!(
            "pe {}: rebuilt {} cells after load",
            self.pool.me(),
            cells.len()
        );
    }

    // ── Configuration and collaborators ─────────────────────────

    /// The configuration this grid was built with.
    pub fn config(&self) -> &GridConfig<D> {
        &self.config
    }

    /// Record field layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Child-order lookup tables.
    pub fn tables(&self) -> &ChildTables {
        &self.tables
    }

    /// The underlying pool view.
    pub fn pool(&self) -> &MemPool {
        &self.pool
    }

    /// Mutable access to the pool view, for persistence.
    pub fn pool_mut(&mut self) -> &mut MemPool {
        &mut self.pool
    }

    /// The coordinate map, if one is in use.
    pub fn map(&self) -> Option<&Arc<dyn CoordinateMap<D>>> {
        self.map.as_ref()
    }

    /// Attach a boundary table. BC indices in cell info refer to it.
    pub fn set_boundaries(&mut self, table: BoundaryTable) {
        self.boundaries = Arc::new(table);
    }

    /// The boundary table.
    pub fn boundaries(&self) -> &BoundaryTable {
        &self.boundaries
    }

    /// Install the callback run on every new child.
    pub fn set_prepare_hook(&mut self, hook: Arc<dyn CellPrepareHook<D>>) {
        self.hook = Some(hook);
    }

    /// Remove the prepare callback.
    pub fn clear_prepare_hook(&mut self) {
        self.hook = None;
    }

    /// Adaptation counters for this view.
    pub fn stats(&self) -> GridStats {
        self.stats
    }

    // ── Counts and coherency ────────────────────────────────────

    /// Cell high-water mark, authoritative.
    pub fn ncells(&self) -> u32 {
        self.pool.ncells()
    }

    /// Cell high-water mark from this PE's local copy.
    pub fn ncells_fast(&self) -> u32 {
        self.pool.ncells_fast()
    }

    /// Number of basegrid cells.
    pub fn nbase(&self) -> u32 {
        self.config.base_cells() as u32
    }

    /// Records still free between the heaps.
    pub fn freecells(&self) -> u32 {
        self.pool.freecells()
    }

    /// Records in use, in units of one cell.
    pub fn allocated_mem_as_units_of_cell(&self) -> u32 {
        self.pool.allocated_mem_as_units_of_cell()
    }

    /// Collective: adopt the pool's coherency set as sent by `root`.
    pub fn pe_coherency(&mut self, root: PeId) {
        self.pool.pe_coherency(root);
    }

    /// This view's PE.
    pub fn me(&self) -> PeId {
        self.pool.me()
    }

    /// Number of PEs.
    pub fn npes(&self) -> u32 {
        self.pool.npes()
    }

    // ── Iteration ───────────────────────────────────────────────

    /// Live cells owned by this PE: `me, me + npes, …` below `ncells_fast`.
    pub fn cells(&self) -> impl Iterator<Item = GridIndex> + '_ {
        (self.pool.me().0..self.ncells_fast())
            .step_by(self.pool.npes() as usize)
            .filter(move |&c| self.is_allocated(c))
    }

    /// Every live cell, regardless of owner.
    pub fn cells_1pe(&self) -> impl Iterator<Item = GridIndex> + '_ {
        (0..self.ncells_fast()).filter(move |&c| self.is_allocated(c))
    }

    /// Every live leaf, regardless of owner.
    pub fn leaves(&self) -> impl Iterator<Item = GridIndex> + '_ {
        self.cells_1pe().filter(move |&c| self.isleaf(c))
    }

    // ── Structure ───────────────────────────────────────────────

    #[inline]
    fn is_allocated(&self, i: GridIndex) -> bool {
        self.pool.int(i, INT_LEVEL) != NOINDEX
    }

    /// Whether `i` is a live cell.
    pub fn is_live(&self, i: GridIndex) -> bool {
        i < self.ncells_fast() && self.is_allocated(i)
    }

    pub(crate) fn require_live(&self, i: GridIndex) -> Result<(), GridError> {
        if self.is_live(i) {
            Ok(())
        } else {
            Err(GridError::NoSuchCell { cell: i })
        }
    }

    /// Parent handle, `NOINDEX` for basegrid cells.
    #[inline]
    pub fn parent(&self, i: GridIndex) -> GridIndex {
        self.pool.int(i, INT_PARENT)
    }

    /// First-child handle, `NOINDEX` for leaves.
    #[inline]
    pub fn firstchild(&self, i: GridIndex) -> GridIndex {
        self.pool.int(i, INT_FIRSTCHILD)
    }

    /// Child `k` of an internal cell.
    #[inline]
    pub fn child(&self, i: GridIndex, k: usize) -> GridIndex {
        let fc = self.firstchild(i);
        debug_assert!(fc != NOINDEX, "child({i}, {k}) of a leaf");
        debug_assert!(k < Self::NCHILDREN);
        fc + k as GridIndex
    }

    /// Position of `i` within its parent's child block.
    #[inline]
    pub fn order(&self, i: GridIndex) -> usize {
        self.pool.int(i, INT_CHILDORDER) as usize
    }

    /// Refinement level, 0 for the basegrid.
    #[inline]
    pub fn level(&self, i: GridIndex) -> u32 {
        self.pool.int(i, INT_LEVEL)
    }

    /// Whether `i` has no children.
    #[inline]
    pub fn isleaf(&self, i: GridIndex) -> bool {
        self.firstchild(i) == NOINDEX
    }

    /// A-block handle of `i` along axis `d`.
    #[inline]
    pub fn ablock(&self, i: GridIndex, d: usize) -> GridIndex {
        self.pool.int(i, self.layout.int_ablock(d))
    }

    // ── Cell info ───────────────────────────────────────────────

    /// Packed metadata of `i`.
    #[inline]
    pub fn cellinfo(&self, i: GridIndex) -> CellInfo {
        CellInfo(self.pool.int(i, INT_CELLINFO))
    }

    /// Replace the packed metadata of `i`.
    #[inline]
    pub fn set_cellinfo(&self, i: GridIndex, info: CellInfo) {
        self.pool.set_int(i, INT_CELLINFO, info.bits());
    }

    /// Domain classification of `i`.
    pub fn celltype(&self, i: GridIndex) -> CellType {
        self.cellinfo(i).celltype()
    }

    /// Reclassify `i`.
    pub fn set_celltype(&self, i: GridIndex, ct: CellType) {
        self.set_cellinfo(i, self.cellinfo(i).set_celltype(ct));
    }

    /// BC index of `i`.
    pub fn bc_index(&self, i: GridIndex) -> u8 {
        self.cellinfo(i).bc_index()
    }

    /// Set the BC index of `i`.
    pub fn set_bc_index(&self, i: GridIndex, bc: u8) {
        self.set_cellinfo(i, self.cellinfo(i).set_bc_index(bc));
    }

    /// Time class of `i`.
    pub fn timeclass(&self, i: GridIndex) -> u8 {
        self.cellinfo(i).timeclass()
    }

    /// Set the time class of `i`.
    pub fn set_timeclass(&self, i: GridIndex, tc: u8) {
        self.set_cellinfo(i, self.cellinfo(i).set_timeclass(tc));
    }

    /// Whether face `(d, dir)` of `i` borders `2^(D-1)` finer cells.
    #[inline]
    pub fn isdense(&self, i: GridIndex, d: usize, dir: usize) -> bool {
        self.cellinfo(i).isdense(d, dir)
    }

    /// Whether any face of `i` is dense.
    pub fn any_neighbour_dense(&self, i: GridIndex) -> bool {
        self.cellinfo(i).any_neighbour_dense()
    }

    /// Whether `i` may be subdivided.
    pub fn may_subdivide(&self, i: GridIndex) -> bool {
        self.cellinfo(i).may_subdivide()
    }

    /// Whether `i` may be removed by coarsening its parent.
    pub fn may_recoarsen(&self, i: GridIndex) -> bool {
        self.cellinfo(i).may_recoarsen()
    }

    /// Forbid coarsening `i` away.
    pub fn set_norecoars(&self, i: GridIndex) {
        self.set_cellinfo(i, self.cellinfo(i).set_norecoars());
    }

    /// Allow coarsening `i` away again.
    pub fn clear_norecoars(&self, i: GridIndex) {
        self.set_cellinfo(i, self.cellinfo(i).clear_norecoars());
    }

    /// Whether `i` is an interior cell.
    pub fn isindomain(&self, i: GridIndex) -> bool {
        self.celltype(i) == CellType::Interior
    }

    /// Whether `i` is an interior leaf, i.e. updated by the solver.
    pub fn isactive(&self, i: GridIndex) -> bool {
        self.isleaf(i) && self.isindomain(i)
    }

    // ── Boundary lookups ────────────────────────────────────────

    /// Boundary kind of `i`'s BC index; `BcType::None` if unregistered.
    pub fn boundary_type(&self, i: GridIndex) -> BcType {
        self.boundaries
            .get(self.bc_index(i))
            .map(|bc| bc.kind)
            .unwrap_or_default()
    }

    /// Boundary evaluator of `i`'s BC index.
    pub fn boundary_func(&self, i: GridIndex) -> Option<&EvaluatorFn> {
        self.boundaries
            .get(self.bc_index(i))
            .and_then(|bc| bc.func.as_ref())
    }

    /// Boundary geometry of `i`'s BC index.
    pub fn boundary_geometry(&self, i: GridIndex) -> Option<&dyn BoundaryGeometry> {
        self.boundaries
            .get(self.bc_index(i))
            .and_then(|bc| bc.geometry.as_deref())
    }

    // ── Payload ─────────────────────────────────────────────────

    /// Payload component `comp` of `i`.
    #[inline]
    pub fn real(&self, i: GridIndex, comp: usize) -> Real {
        debug_assert!(comp < self.layout.ncd);
        self.pool.real(i, comp)
    }

    /// Set payload component `comp` of `i`.
    #[inline]
    pub fn set_real(&self, i: GridIndex, comp: usize, v: Real) {
        debug_assert!(comp < self.layout.ncd);
        self.pool.set_real(i, comp, v);
    }

    /// Copy the payload of `i` into `out` (length `ncd`).
    pub fn getcell(&self, i: GridIndex, out: &mut [Real]) {
        debug_assert_eq!(out.len(), self.layout.ncd);
        for (c, v) in out.iter_mut().enumerate() {
            *v = self.pool.real(i, c);
        }
    }

    /// Overwrite the payload of `i` from `vals` (length `ncd`).
    pub fn putcell(&self, i: GridIndex, vals: &[Real]) {
        debug_assert_eq!(vals.len(), self.layout.ncd);
        for (c, &v) in vals.iter().enumerate() {
            self.pool.set_real(i, c, v);
        }
    }

    // ── Basegrid indexing ───────────────────────────────────────

    /// Integer coordinates of basegrid cell `h`.
    pub fn base_coords(&self, h: GridIndex) -> [u32; D] {
        let mut out = [0u32; D];
        for d in 0..D {
            out[d] = (h / self.strides[d]) % self.config.shape[d];
        }
        out
    }

    /// Handle of the basegrid cell at integer coordinates `idx`.
    pub fn base_handle(&self, idx: [u32; D]) -> GridIndex {
        idx.iter().zip(&self.strides).map(|(i, s)| i * s).sum()
    }

    pub(crate) fn base_neighbour(&self, h: GridIndex, d: usize, dir: usize) -> GridIndex {
        let i = (h / self.strides[d]) % self.config.shape[d];
        if dir == 0 {
            if i == 0 {
                NOINDEX
            } else {
                h - self.strides[d]
            }
        } else if i + 1 == self.config.shape[d] {
            NOINDEX
        } else {
            h + self.strides[d]
        }
    }

    // ── Classification ──────────────────────────────────────────

    /// Whether `i` is internal and every child is a leaf.
    pub fn all_children_are_leaf(&self, i: GridIndex) -> bool {
        if self.isleaf(i) {
            return false;
        }
        (0..Self::NCHILDREN).all(|k| self.isleaf(self.child(i, k)))
    }

    /// Whether any face neighbour of `i` is internal.
    pub fn has_nonleaf_neighbours(&self, i: GridIndex) -> bool {
        (0..D).any(|d| {
            (0..2).any(|dir| {
                let n = self.getneighbour(i, d, dir);
                n != NOINDEX && !self.isleaf(n)
            })
        })
    }

    /// Whether any child of `i` has an internal face neighbour.
    pub fn children_have_nonleaf_neighbours(&self, i: GridIndex) -> bool {
        !self.isleaf(i)
            && (0..Self::NCHILDREN).any(|k| self.has_nonleaf_neighbours(self.child(i, k)))
    }

    /// Checkerboard parity: whether the integer coordinates of `i` at its
    /// own level sum to an even number.
    pub fn iseven(&self, i: GridIndex) -> bool {
        let origin = self.cell_origin(i);
        let size = self.cellsize(i);
        let mut sum: i64 = 0;
        for d in 0..D {
            sum += ((origin[d] - self.config.origin[d]) / size[d]).round() as i64;
        }
        sum % 2 == 0
    }

    /// Deepest level present.
    pub fn maximum_level(&self) -> u32 {
        self.cells_1pe().map(|c| self.level(c)).max().unwrap_or(0)
    }

    /// Smallest physical size over all leaves.
    pub fn minimum_grid_spacing(&self) -> Real {
        self.leaves()
            .map(|c| self.cellsize_phys(c))
            .fold(Real::INFINITY, Real::min)
    }

    /// Volume-weighted average payload of the interior children of `i`.
    ///
    /// Writes `ncd` values into `out` and returns the number of interior
    /// children averaged; `out` is untouched when that number is 0.
    pub fn child_interior_average(&self, i: GridIndex, out: &mut [Real]) -> usize {
        if self.isleaf(i) {
            return 0;
        }
        let ncd = self.layout.ncd;
        let mut sum = vec![0.0; ncd];
        let mut vol = 0.0;
        let mut n = 0;
        for k in 0..Self::NCHILDREN {
            let c = self.child(i, k);
            if !self.isindomain(c) {
                continue;
            }
            let v = self.cellvolume(c);
            for (comp, s) in sum.iter_mut().enumerate() {
                *s += v * self.real(c, comp);
            }
            vol += v;
            n += 1;
        }
        if n > 0 && vol > 0.0 {
            for (o, s) in out.iter_mut().zip(&sum) {
                *o = s / vol;
            }
        }
        n
    }
}

fn pool_config<const D: usize>(config: &GridConfig<D>, layout: &Layout) -> PoolConfig {
    let mut pc = PoolConfig::new(
        config.max_cells,
        layout.clen_r as u16,
        layout.clen_i as u16,
        1 << D,
        layout.c2,
    );
    pc.cache_slots = config.cache_slots;
    pc.on_exhaustion = config.on_exhaustion;
    pc
}

impl<const D: usize> fmt::Debug for HcGrid<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HcGrid")
            .field("dim", &D)
            .field("shape", &self.config.shape)
            .field("ncells", &self.ncells_fast())
            .field("mapped", &self.map.is_some())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl<const D: usize> fmt::Display for HcGrid<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "HcGrid<{D}> basegrid {:?}, {} cells, max level {}",
            self.config.shape,
            self.ncells_fast(),
            self.maximum_level()
        )?;
        writeln!(f, "  {}", self.stats)?;
        write!(f, "{}", self.pool)
    }
}

// Compile-time assertion: a grid view can be moved to its own PE thread.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<HcGrid<2>>();
};
