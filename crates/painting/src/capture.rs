//! Capture buffer - per-pixel texture coordinates of the projected surface

use glam::Vec2;

use crate::constants::NO_COVERAGE;

/// Square intermediate image holding the surface's texture coordinate at
/// every covered pixel (channels 0 and 1), or [`NO_COVERAGE`] elsewhere.
///
/// The buffer is only meaningful between a completed render and the end of
/// that event's compositing; the painter tracks this with [`Self::is_valid`].
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    size: u32,
    texels: Vec<[f32; 2]>,
    valid: bool,
}

impl CaptureBuffer {
    /// Create a cleared buffer of `size` x `size` pixels
    pub fn new(size: u32) -> Self {
        Self {
            size,
            texels: vec![NO_COVERAGE; (size as usize) * (size as usize)],
            valid: false,
        }
    }

    /// Edge length in pixels
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Reset every pixel to "no coverage" and mark the contents invalid
    pub fn clear(&mut self) {
        self.texels.fill(NO_COVERAGE);
        self.valid = false;
    }

    /// Mark the contents as a complete render
    pub fn mark_valid(&mut self) {
        self.valid = true;
    }

    /// Mark the contents stale
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Whether the contents come from a completed render that has not been consumed yet
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.size || y >= self.size {
            return None;
        }
        Some((y as usize) * (self.size as usize) + (x as usize))
    }

    /// Texture coordinate stored at (x, y), or None when uncovered or out of range
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<Vec2> {
        let texel = self.texels[self.index(x, y)?];
        is_covered(texel).then(|| Vec2::from_array(texel))
    }

    /// Store a texture coordinate at (x, y)
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, uv: Vec2) {
        if let Some(i) = self.index(x, y) {
            self.texels[i] = uv.to_array();
        }
    }

    /// Number of covered pixels
    pub fn covered_count(&self) -> usize {
        self.texels.iter().filter(|t| is_covered(**t)).count()
    }

    /// Raw two-channel float data, e.g. for debugging dumps
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

#[inline]
fn is_covered(texel: [f32; 2]) -> bool {
    texel[0] >= 0.0 && texel[1] >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_uncovered() {
        let buffer = CaptureBuffer::new(8);
        assert_eq!(buffer.covered_count(), 0);
        assert!(!buffer.is_valid());
        assert_eq!(buffer.get(3, 3), None);
    }

    #[test]
    fn test_zero_uv_is_covered() {
        let mut buffer = CaptureBuffer::new(4);
        buffer.set(1, 2, Vec2::ZERO);
        assert_eq!(buffer.get(1, 2), Some(Vec2::ZERO));
        assert_eq!(buffer.covered_count(), 1);
    }

    #[test]
    fn test_clear_drops_stale_coverage() {
        let mut buffer = CaptureBuffer::new(4);
        buffer.set(0, 0, Vec2::new(0.5, 0.5));
        buffer.mark_valid();
        buffer.clear();
        assert_eq!(buffer.get(0, 0), None);
        assert!(!buffer.is_valid());
    }

    #[test]
    fn test_out_of_range_access() {
        let mut buffer = CaptureBuffer::new(4);
        buffer.set(4, 0, Vec2::ONE);
        assert_eq!(buffer.get(4, 0), None);
        assert_eq!(buffer.covered_count(), 0);
    }
}
