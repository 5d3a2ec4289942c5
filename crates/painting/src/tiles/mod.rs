//! Tile management, dirty tracking and undo capture for the persistent texture

mod data_access;
mod dirty_tracking;

use std::collections::{HashMap, HashSet};

use crate::constants::DEFAULT_TILE_SIZE;
use crate::surface::CpuSurface;

/// Tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

/// Tile contents captured before their first modification in a stroke
#[derive(Debug, Clone, Default)]
pub struct TileSnapshot {
    pub tiles: HashMap<TileCoord, Vec<[f32; 4]>>,
}

impl TileSnapshot {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }
}

/// Dirty region for GPU upload
#[derive(Debug, Clone)]
pub struct DirtyRegion {
    /// Pixel offset in texture (x, y)
    pub offset: (u32, u32),
    /// Region dimensions (width, height)
    pub size: (u32, u32),
    /// RGBA8 sRGB pixel data (row-major)
    pub data: Vec<u8>,
}

/// Persistent texture with tiled dirty tracking.
///
/// All texel writes go through [`TiledSurface::blend_texel`], which marks the
/// containing tile dirty and, while a snapshot is open, records the tile's
/// previous contents for undo.
#[derive(Debug, Clone)]
pub struct TiledSurface {
    pub(crate) surface: CpuSurface,
    pub(crate) tile_size: u32,
    tiles_x: u32,
    tiles_y: u32,
    pub(crate) dirty_tiles: HashSet<TileCoord>,
    pending: Option<TileSnapshot>,
}

impl TiledSurface {
    /// Wrap an existing surface with the given tile size
    pub fn from_surface(surface: CpuSurface, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        let tiles_x = surface.width.div_ceil(tile_size);
        let tiles_y = surface.height.div_ceil(tile_size);

        Self {
            surface,
            tile_size,
            tiles_x,
            tiles_y,
            dirty_tiles: HashSet::new(),
            pending: None,
        }
    }

    /// Create a new transparent tiled surface with the given dimensions and tile size
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        Self::from_surface(CpuSurface::new(width, height), tile_size)
    }

    /// Create a new tiled surface with the default tile size
    pub fn with_default_tile_size(width: u32, height: u32) -> Self {
        Self::new(width, height, DEFAULT_TILE_SIZE)
    }

    /// Get the tile size
    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Get the number of tiles in x direction
    #[inline]
    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    /// Get the number of tiles in y direction
    #[inline]
    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    /// Texture dimensions (width, height)
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.surface.width, self.surface.height)
    }

    /// Get a reference to the underlying surface
    #[inline]
    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    /// Unwrap into the underlying surface
    pub fn into_surface(self) -> CpuSurface {
        self.surface
    }

    #[inline]
    fn tile_of(&self, x: u32, y: u32) -> TileCoord {
        TileCoord {
            x: x / self.tile_size,
            y: y / self.tile_size,
        }
    }

    /// Blend `color` into texel (x, y) by `strength`.
    ///
    /// Returns false (and touches nothing) when the texel is out of range.
    pub fn blend_texel(&mut self, x: u32, y: u32, color: [f32; 4], strength: f32) -> bool {
        if x >= self.surface.width || y >= self.surface.height {
            return false;
        }
        let coord = self.tile_of(x, y);
        if self.pending.as_ref().is_some_and(|p| !p.tiles.contains_key(&coord)) {
            let data = self.get_tile_data(coord);
            if let Some(pending) = self.pending.as_mut() {
                pending.tiles.insert(coord, data);
            }
        }
        self.dirty_tiles.insert(coord);
        self.surface.lerp_pixel(x, y, color, strength)
    }

    /// Start recording tile contents before modification
    pub fn begin_snapshot(&mut self) {
        self.pending = Some(TileSnapshot::default());
    }

    /// Stop recording and return everything captured since `begin_snapshot`
    pub fn finish_snapshot(&mut self) -> Option<TileSnapshot> {
        self.pending.take()
    }

    /// Whether a snapshot is open
    pub fn is_snapshotting(&self) -> bool {
        self.pending.is_some()
    }

    /// Write a snapshot back and mark the restored tiles dirty
    pub fn restore(&mut self, snapshot: &TileSnapshot) {
        for (coord, data) in &snapshot.tiles {
            self.restore_tile(*coord, data);
        }
    }

    /// Clear the surface to a solid color and mark every tile dirty
    pub fn clear(&mut self, color: [f32; 4]) {
        self.surface.clear(color);
        self.mark_all_dirty();
    }
}
