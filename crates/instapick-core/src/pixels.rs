//! CPU copy of the pick target.
//!
//! Rows are stored bottom-up: row 0 of the buffer is the bottom row of the
//! viewport. Screen coordinates have their origin at the top-left corner, so
//! lookups flip Y.

use crate::codec::color_to_id;
use crate::error::{InstapickError, Result};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// The last pixel data read back from the pick target.
#[derive(Debug, Default, Clone)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
    ready: bool,
}

impl PixelBuffer {
    /// Creates an empty buffer. Nothing can be read from it until the first
    /// readback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the buffer dimensions in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns whether a readback has filled the buffer since the last resize.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns the raw RGBA bytes, bottom row first.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Reallocates the buffer for new dimensions. Returns `false` if the size
    /// is unchanged, in which case the contents are kept.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height && !self.data.is_empty() {
            return false;
        }
        self.width = width;
        self.height = height;
        self.data = vec![0; Self::byte_len(width, height)];
        self.ready = false;
        true
    }

    /// Copies a top-down texture readback into the buffer.
    ///
    /// `padded_row_bytes` is the stride of `rows`, which is at least
    /// `4 * width` because GPU copies align rows to 256 bytes.
    ///
    /// The buffer is unready until the copy succeeds, so a rejected readback
    /// never leaves older pixels in service.
    pub fn store_padded_rows(&mut self, rows: &[u8], padded_row_bytes: usize) -> Result<()> {
        self.ready = false;
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        let height = self.height as usize;
        let needed = if height == 0 {
            0
        } else {
            padded_row_bytes * (height - 1) + row_bytes
        };
        if padded_row_bytes < row_bytes || rows.len() < needed {
            return Err(InstapickError::SizeMismatch {
                attribute: "pixel rows",
                expected: needed,
                actual: rows.len(),
            });
        }

        for texture_row in 0..height {
            let src = texture_row * padded_row_bytes;
            let dst = (height - 1 - texture_row) * row_bytes;
            self.data[dst..dst + row_bytes].copy_from_slice(&rows[src..src + row_bytes]);
        }
        self.ready = true;
        Ok(())
    }

    /// Marks the contents stale. Lookups fail with
    /// [`InstapickError::UnreadyBuffer`] until the next successful store.
    pub fn invalidate(&mut self) {
        self.ready = false;
    }

    /// Returns the byte offset of the pixel under a screen coordinate, or
    /// `None` if the coordinate lies outside the buffer.
    #[must_use]
    pub fn pixel_offset(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let row = (self.height - 1 - y) as usize;
        Some((x as usize + row * self.width as usize) * BYTES_PER_PIXEL)
    }

    /// Decodes the identifier under a screen coordinate.
    ///
    /// Returns `Ok(None)` outside the buffer and `Ok(Some(0))` over the
    /// background.
    pub fn id_at(&self, x: i32, y: i32) -> Result<Option<u32>> {
        if !self.ready {
            return Err(InstapickError::UnreadyBuffer);
        }
        Ok(self.pixel_offset(x, y).map(|offset| {
            let px = &self.data[offset..offset + BYTES_PER_PIXEL];
            color_to_id(px[0], px[1], px[2])
        }))
    }

    /// Returns a copy of the pixels in top-down row order, as image files
    /// expect.
    #[must_use]
    pub fn to_top_down(&self) -> Vec<u8> {
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        if row_bytes == 0 {
            return Vec::new();
        }
        self.data
            .chunks_exact(row_bytes)
            .rev()
            .flatten()
            .copied()
            .collect()
    }

    fn byte_len(width: u32, height: u32) -> usize {
        BYTES_PER_PIXEL * width as usize * height as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::id_to_color;

    /// Builds a top-down texture image with one id per pixel.
    fn texture_rows(width: u32, height: u32, padded: usize, id: impl Fn(u32, u32) -> u32) -> Vec<u8> {
        let mut rows = vec![0u8; padded * height as usize];
        for y in 0..height {
            for x in 0..width {
                let [r, g, b] = id_to_color(id(x, y));
                let o = y as usize * padded + x as usize * 4;
                rows[o..o + 4].copy_from_slice(&[r, g, b, 255]);
            }
        }
        rows
    }

    #[test]
    fn test_unready_before_first_readback() {
        let mut buffer = PixelBuffer::new();
        assert!(matches!(buffer.id_at(0, 0), Err(InstapickError::UnreadyBuffer)));
        buffer.resize(4, 4);
        assert!(matches!(buffer.id_at(0, 0), Err(InstapickError::UnreadyBuffer)));
    }

    #[test]
    fn test_resize_reallocates_exact_size() {
        let mut buffer = PixelBuffer::new();
        assert!(buffer.resize(640, 480));
        assert_eq!(buffer.as_bytes().len(), 4 * 640 * 480);
        assert!(!buffer.resize(640, 480));
        assert!(buffer.resize(13, 7));
        assert_eq!(buffer.as_bytes().len(), 4 * 13 * 7);
        assert_eq!(buffer.size(), (13, 7));
    }

    #[test]
    fn test_resize_discards_contents() {
        let mut buffer = PixelBuffer::new();
        buffer.resize(2, 2);
        let rows = texture_rows(2, 2, 256, |_, _| 77);
        buffer.store_padded_rows(&rows, 256).unwrap();
        assert_eq!(buffer.id_at(1, 1).unwrap(), Some(77));

        buffer.resize(3, 3);
        assert!(!buffer.is_ready());
        assert!(buffer.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_screen_y_is_flipped() {
        // Top-down texture: id encodes the screen coordinate.
        let (w, h) = (5, 3);
        let mut buffer = PixelBuffer::new();
        buffer.resize(w, h);
        let rows = texture_rows(w, h, 256, |x, y| 1 + x + y * 10);
        buffer.store_padded_rows(&rows, 256).unwrap();

        for y in 0..h {
            for x in 0..w {
                let got = buffer.id_at(x as i32, y as i32).unwrap();
                assert_eq!(got, Some(1 + x + y * 10), "pixel ({x}, {y})");
            }
        }
        // First stored row is the bottom of the viewport.
        let bottom_left = color_to_id(buffer.as_bytes()[0], buffer.as_bytes()[1], buffer.as_bytes()[2]);
        assert_eq!(bottom_left, 1 + 2 * 10);
    }

    #[test]
    fn test_out_of_bounds_coordinates() {
        let mut buffer = PixelBuffer::new();
        buffer.resize(4, 4);
        buffer.store_padded_rows(&vec![0; 256 * 4], 256).unwrap();
        assert_eq!(buffer.id_at(-1, 0).unwrap(), None);
        assert_eq!(buffer.id_at(0, -1).unwrap(), None);
        assert_eq!(buffer.id_at(4, 0).unwrap(), None);
        assert_eq!(buffer.id_at(0, 4).unwrap(), None);
        assert_eq!(buffer.id_at(3, 3).unwrap(), Some(0));
    }

    #[test]
    fn test_short_readback_is_rejected() {
        let mut buffer = PixelBuffer::new();
        buffer.resize(4, 4);
        let err = buffer.store_padded_rows(&[0; 64], 256).unwrap_err();
        assert!(matches!(err, InstapickError::SizeMismatch { .. }));
        assert!(!buffer.is_ready());
    }

    #[test]
    fn test_failed_readback_drops_previous_pixels() {
        let mut buffer = PixelBuffer::new();
        buffer.resize(2, 2);
        let rows = texture_rows(2, 2, 256, |_, _| 77);
        buffer.store_padded_rows(&rows, 256).unwrap();
        assert_eq!(buffer.id_at(0, 0).unwrap(), Some(77));

        assert!(buffer.store_padded_rows(&[0; 8], 256).is_err());
        assert!(!buffer.is_ready());
        assert!(matches!(buffer.id_at(0, 0), Err(InstapickError::UnreadyBuffer)));
    }

    #[test]
    fn test_invalidate_until_next_store() {
        let mut buffer = PixelBuffer::new();
        buffer.resize(2, 2);
        let rows = texture_rows(2, 2, 256, |_, _| 5);
        buffer.store_padded_rows(&rows, 256).unwrap();

        buffer.invalidate();
        assert!(matches!(buffer.id_at(1, 1), Err(InstapickError::UnreadyBuffer)));
        buffer.store_padded_rows(&rows, 256).unwrap();
        assert_eq!(buffer.id_at(1, 1).unwrap(), Some(5));
    }

    #[test]
    fn test_top_down_copy_restores_texture_order() {
        let mut buffer = PixelBuffer::new();
        buffer.resize(2, 2);
        let rows = texture_rows(2, 2, 8, |x, y| 1 + x + 2 * y);
        buffer.store_padded_rows(&rows, 8).unwrap();
        assert_eq!(buffer.to_top_down(), rows);
    }
}
