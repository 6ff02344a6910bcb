//! RGBA pixel buffer shared between region fetches, promises and the
//! renderer.
//!
//! Storage is row-major and bottom-up: the first row of `data` is the bottom
//! row of the image, which is the rendering backend's native texture layout.
//! Every coordinate-taking method accepts top-down image coordinates and
//! converts internally, so callers never deal with the flip.

/// Packs an RGBA color into the in-memory pixel format (R in the lowest
/// byte, matching the R,G,B,A byte order of the texture upload path).
pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

/// Extracts the alpha channel of a packed pixel.
pub const fn alpha(pixel: u32) -> u8 {
    (pixel >> 24) as u8
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuf {
    width: usize,
    height: usize,
    data: Vec<u32>,
}

impl PixelBuf {
    /// A zero-filled (fully transparent) buffer.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Wraps existing pixel data, which must be bottom-up row-major.
    pub fn from_data(width: usize, height: usize, data: Vec<u32>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "pixel data length does not match dimensions"
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// The shared zero-size placeholder returned by unresolved promises.
    pub fn empty() -> Self {
        Self::new(0, 0)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw bottom-up pixel rows for texture upload.
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    fn index(&self, x: usize, y: usize) -> usize {
        (self.height - 1 - y) * self.width + x
    }

    /// Pixel at top-down image coordinates. Panics on out-of-range access.
    pub fn get(&self, x: usize, y: usize) -> u32 {
        assert!(x < self.width && y < self.height, "pixel out of range");
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, pixel: u32) {
        assert!(x < self.width && y < self.height, "pixel out of range");
        let idx = self.index(x, y);
        self.data[idx] = pixel;
    }

    /// Like `set` but silently ignores positions outside the buffer, so
    /// drawing primitives clip instead of panicking.
    pub fn plot(&mut self, x: i64, y: i64, pixel: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            let idx = self.index(x as usize, y as usize);
            self.data[idx] = pixel;
        }
    }

    pub fn fill(&mut self, pixel: u32) {
        self.data.fill(pixel);
    }

    /// Copies `src` into this buffer with its top-left corner at
    /// (`dst_x`, `dst_y`) in top-down coordinates. Out-of-range parts of
    /// `src` are clipped. Rows are copied in the buffer's native bottom-up
    /// order.
    pub fn paste(&mut self, src: &PixelBuf, dst_x: i64, dst_y: i64) {
        for sy in 0..src.height {
            let dy = dst_y + sy as i64;
            if dy < 0 || dy as usize >= self.height {
                continue;
            }
            let sx_start = (-dst_x).max(0) as usize;
            if sx_start >= src.width {
                continue;
            }
            let dx_start = dst_x.max(0) as usize;
            if dx_start >= self.width {
                continue;
            }
            let count = (src.width - sx_start).min(self.width - dx_start);

            let src_row = (src.height - 1 - sy) * src.width;
            let dst_row = (self.height - 1 - dy as usize) * self.width;
            self.data[dst_row + dx_start..dst_row + dx_start + count]
                .copy_from_slice(&src.data[src_row + sx_start..src_row + sx_start + count]);
        }
    }

    /// Bresenham line between two top-down positions, clipped to the buffer.
    pub fn draw_line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, pixel: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);
        loop {
            self.plot(x, y, pixel);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Filled square of edge `2 * half + 1` centered on a position.
    pub fn draw_square(&mut self, cx: i64, cy: i64, half: i64, pixel: u32) {
        for y in cy - half..=cy + half {
            for x in cx - half..=cx + half {
                self.plot(x, y, pixel);
            }
        }
    }
}
