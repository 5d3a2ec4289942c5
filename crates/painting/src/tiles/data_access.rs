//! Tile data access and restore

use super::{TileCoord, TiledSurface};

impl TiledSurface {
    /// Get tile data (row-major pixels of one tile)
    /// The returned Vec has tile_size * tile_size elements (or less for edge tiles)
    pub fn get_tile_data(&self, coord: TileCoord) -> Vec<[f32; 4]> {
        let (tile_start_x, tile_start_y, tile_width, tile_height) = self.get_tile_bounds(coord);

        let mut data = Vec::with_capacity((tile_width * tile_height) as usize);

        for dy in 0..tile_height {
            for dx in 0..tile_width {
                if let Some(pixel) = self.surface.get_pixel(tile_start_x + dx, tile_start_y + dy) {
                    data.push(pixel);
                }
            }
        }

        data
    }

    /// Get tile bounds (x, y, width, height) in pixel coordinates
    pub fn get_tile_bounds(&self, coord: TileCoord) -> (u32, u32, u32, u32) {
        let tile_start_x = coord.x * self.tile_size;
        let tile_start_y = coord.y * self.tile_size;

        // Edge tiles may be smaller than tile_size
        let tile_width = self.tile_size.min(self.surface.width.saturating_sub(tile_start_x));
        let tile_height = self.tile_size.min(self.surface.height.saturating_sub(tile_start_y));

        (tile_start_x, tile_start_y, tile_width, tile_height)
    }

    /// Restore a tile's pixel data captured by `get_tile_data`
    pub(crate) fn restore_tile(&mut self, coord: TileCoord, tile_data: &[[f32; 4]]) {
        let (tile_start_x, tile_start_y, tile_width, tile_height) = self.get_tile_bounds(coord);

        let mut pixels = tile_data.iter();
        for dy in 0..tile_height {
            for dx in 0..tile_width {
                let Some(pixel) = pixels.next() else {
                    break;
                };
                self.surface.set_pixel(tile_start_x + dx, tile_start_y + dy, *pixel);
            }
        }

        self.dirty_tiles.insert(coord);
    }
}
