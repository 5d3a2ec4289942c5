//! Dirty tile tracking for incremental texture uploads

use tracing::debug;

use super::{DirtyRegion, TileCoord, TiledSurface};
use crate::surface::pixel_to_rgba8;

impl TiledSurface {
    /// Mark a pixel as modified (marks containing tile dirty)
    #[inline]
    pub fn mark_dirty(&mut self, x: u32, y: u32) {
        if x >= self.surface.width || y >= self.surface.height {
            return;
        }
        let tile_x = x / self.tile_size;
        let tile_y = y / self.tile_size;
        self.dirty_tiles.insert(TileCoord { x: tile_x, y: tile_y });
    }

    /// Mark every tile dirty (after a clear or a full texture replacement)
    pub fn mark_all_dirty(&mut self) {
        for ty in 0..self.tiles_y() {
            for tx in 0..self.tiles_x() {
                self.dirty_tiles.insert(TileCoord { x: tx, y: ty });
            }
        }
    }

    /// Get all dirty tiles and clear the dirty set, sorted row by row
    pub fn take_dirty_tiles(&mut self) -> Vec<TileCoord> {
        let mut tiles: Vec<TileCoord> = self.dirty_tiles.drain().collect();
        tiles.sort_by_key(|t| (t.y, t.x));
        tiles
    }

    /// Check if any tiles are dirty
    #[inline]
    pub fn has_dirty_tiles(&self) -> bool {
        !self.dirty_tiles.is_empty()
    }

    /// Get the number of dirty tiles
    #[inline]
    pub fn dirty_tile_count(&self) -> usize {
        self.dirty_tiles.len()
    }

    /// Take dirty tiles as RGBA8 regions for GPU upload, clearing the dirty state
    pub fn take_dirty_regions(&mut self) -> Vec<DirtyRegion> {
        let tiles = self.take_dirty_tiles();
        let mut regions = Vec::with_capacity(tiles.len());

        for coord in tiles {
            let (x, y, w, h) = self.get_tile_bounds(coord);
            let data = self
                .get_tile_data(coord)
                .into_iter()
                .flat_map(pixel_to_rgba8)
                .collect();

            regions.push(DirtyRegion {
                offset: (x, y),
                size: (w, h),
                data,
            });
        }

        debug!("take_dirty_regions: {} regions", regions.len());
        regions
    }
}
