//! Stroke-level undo for the painter

use tracing::debug;

use super::Painter;
use crate::tiles::TileSnapshot;

/// Tile contents from before a stroke touched them
#[derive(Debug, Clone)]
pub struct UndoEntry {
    /// Stroke this entry reverts
    pub stroke_id: u64,
    pub tiles: TileSnapshot,
}

impl Painter {
    pub(crate) fn push_undo(&mut self, entry: UndoEntry) {
        self.undo_stack.push(entry);
        let max = self.config.max_undo_levels;
        if self.undo_stack.len() > max {
            let excess = self.undo_stack.len() - max;
            self.undo_stack.drain(..excess);
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Undo the last finished stroke
    ///
    /// Returns true if an undo was performed. Not available mid-stroke.
    pub fn undo(&mut self) -> bool {
        if self.stroke_active {
            debug!("Undo: stroke in progress");
            return false;
        }
        let Some(texture) = self.texture.as_mut() else {
            return false;
        };
        let Some(entry) = self.undo_stack.pop() else {
            debug!("Undo: no entries available");
            return false;
        };

        debug!("Undoing stroke {} ({} tiles)", entry.stroke_id, entry.tiles.len());
        texture.restore(&entry.tiles);
        true
    }
}
