//! Grid header: the geometry and payload layout needed to rebuild a grid.
//!
//! ```text
//! [MAGIC "HCGD"] [VERSION u8] [dim u8]
//! [shape u32 × dim] [origin f64 × dim] [spacing f64 × dim]
//! [ncd u16] [nsd u16] [max_level u8] [cache_neighbours u8]
//! ```

use std::io::{Read, Write};

use hcmesh_core::Real;
use hcmesh_grid::GridConfig;
use hcmesh_pool::codec::{
    read_f64_le, read_u16_le, read_u32_le, read_u8, write_f64_le, write_u16_le, write_u32_le,
    write_u8,
};

use crate::error::SnapshotError;
use crate::{FORMAT_VERSION, MAGIC};

/// Dimension-erased copy of the structural part of a [`GridConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct GridHeader {
    /// Spatial dimension.
    pub dim: u8,
    /// Basegrid cells per axis.
    pub shape: Vec<u32>,
    /// Lower corner of the basegrid.
    pub origin: Vec<Real>,
    /// Basegrid cell size per axis.
    pub spacing: Vec<Real>,
    /// Payload components per cell.
    pub ncd: u16,
    /// Surface data components per sub-face.
    pub nsd: u16,
    /// Deepest refinement level.
    pub max_level: u8,
    /// Whether the grid kept neighbour caches.
    pub cache_neighbours: bool,
}

impl GridHeader {
    /// Capture the structural fields of `config`.
    pub fn from_config<const D: usize>(config: &GridConfig<D>) -> Self {
        Self {
            dim: D as u8,
            shape: config.shape.to_vec(),
            origin: config.origin.to_vec(),
            spacing: config.spacing.to_vec(),
            ncd: config.ncd,
            nsd: config.nsd,
            max_level: config.max_level,
            cache_neighbours: config.cache_neighbours,
        }
    }

    /// Rebuild a config with `max_cells` records. Fails if the header
    /// describes another dimension.
    pub fn to_config<const D: usize>(
        &self,
        max_cells: u32,
    ) -> Result<GridConfig<D>, SnapshotError> {
        if self.dim as usize != D {
            return Err(SnapshotError::Mismatch {
                detail: format!("snapshot is {}-D, grid is {D}-D", self.dim),
            });
        }
        let mut shape = [0u32; D];
        let mut origin = [0.0; D];
        let mut spacing = [0.0; D];
        shape.copy_from_slice(&self.shape);
        origin.copy_from_slice(&self.origin);
        spacing.copy_from_slice(&self.spacing);
        let mut config = GridConfig::new(shape, origin, spacing);
        config.ncd = self.ncd;
        config.nsd = self.nsd;
        config.max_cells = max_cells;
        config.max_level = self.max_level;
        config.cache_neighbours = self.cache_neighbours;
        Ok(config)
    }

    /// Check that a resident grid has the layout this header describes.
    pub fn check_matches<const D: usize>(
        &self,
        config: &GridConfig<D>,
    ) -> Result<(), SnapshotError> {
        let resident = Self::from_config(config);
        let same = self.dim == resident.dim
            && self.shape == resident.shape
            && self.origin == resident.origin
            && self.spacing == resident.spacing
            && self.ncd == resident.ncd
            && self.nsd == resident.nsd;
        if same {
            Ok(())
        } else {
            Err(SnapshotError::Mismatch {
                detail: format!(
                    "snapshot grid {:?}/{:?} (ncd {}, nsd {}) does not match \
                     resident {:?}/{:?} (ncd {}, nsd {})",
                    self.shape,
                    self.spacing,
                    self.ncd,
                    self.nsd,
                    resident.shape,
                    resident.spacing,
                    resident.ncd,
                    resident.nsd
                ),
            })
        }
    }

    /// Encode magic, version and header.
    pub fn write_to(&self, w: &mut dyn Write) -> Result<(), SnapshotError> {
        w.write_all(&MAGIC)?;
        write_u8(w, FORMAT_VERSION)?;
        write_u8(w, self.dim)?;
        for &n in &self.shape {
            write_u32_le(w, n)?;
        }
        for &x in self.origin.iter().chain(&self.spacing) {
            write_f64_le(w, x)?;
        }
        write_u16_le(w, self.ncd)?;
        write_u16_le(w, self.nsd)?;
        write_u8(w, self.max_level)?;
        write_u8(w, self.cache_neighbours as u8)?;
        Ok(())
    }

    /// Decode and validate magic, version and header.
    pub fn read_from(r: &mut dyn Read) -> Result<Self, SnapshotError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(SnapshotError::InvalidMagic);
        }
        let version = read_u8(r)?;
        if version != FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion { found: version });
        }
        let dim = read_u8(r)?;
        if !(1..=hcmesh_core::MAXDIM as u8).contains(&dim) {
            return Err(SnapshotError::Mismatch {
                detail: format!("dimension {dim} outside 1..={}", hcmesh_core::MAXDIM),
            });
        }
        let n = dim as usize;
        let shape = (0..n).map(|_| read_u32_le(r)).collect::<Result<Vec<_>, _>>()?;
        let origin = (0..n).map(|_| read_f64_le(r)).collect::<Result<Vec<_>, _>>()?;
        let spacing = (0..n).map(|_| read_f64_le(r)).collect::<Result<Vec<_>, _>>()?;
        let ncd = read_u16_le(r)?;
        let nsd = read_u16_le(r)?;
        let max_level = read_u8(r)?;
        let cache_neighbours = match read_u8(r)? {
            0 => false,
            1 => true,
            other => {
                return Err(SnapshotError::Mismatch {
                    detail: format!("invalid cache flag {other}"),
                })
            }
        };
        Ok(Self {
            dim,
            shape,
            origin,
            spacing,
            ncd,
            nsd,
            max_level,
            cache_neighbours,
        })
    }
}
