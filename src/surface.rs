/// Linear-space RGB colour, channels nominally in [0, 1]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);

    #[inline]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn scaled(self, k: f64) -> Color {
        Color::new(self.r * k, self.g * k, self.b * k)
    }

    /// Gamma-2 encode and pack as 0x00RRGGBB
    pub fn to_u32(self) -> u32 {
        #[inline]
        fn encode(c: f64) -> u8 {
            if c.is_nan() {
                return 0;
            }
            (c.clamp(0.0, 1.0).sqrt() * 255.0).round() as u8
        }
        pack_rgb(encode(self.r), encode(self.g), encode(self.b))
    }
}

#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    // BGRA8 in little-endian memory, alpha at 0
    (b as u32) | ((g as u32) << 8) | ((r as u32) << 16)
}

/// Pixel-writing collaborator the camera draws into.
///
/// Coordinates are top-left based: row 0 is the top of the image.
pub trait PixelSurface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color);
    fn put_pixel(&mut self, x: i64, y: i64, color: Color);

    /// Fill rows `y0..=y1` (either order) of column `x`
    fn draw_column(&mut self, x: usize, y0: i32, y1: i32, color: Color);

    /// Bresenham line; with `dash = Some(n)` alternates n drawn and n skipped pixels
    fn draw_line(&mut self, from: (i64, i64), to: (i64, i64), color: Color, dash: Option<usize>) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut step = 0usize;

        loop {
            let on = match dash {
                Some(n) if n > 0 => (step / n) % 2 == 0,
                _ => true,
            };
            if on {
                self.put_pixel(x, y, color);
            }
            if x == to.0 && y == to.1 {
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
            step += 1;
        }
    }

    /// Hand the finished frame to whatever displays it
    fn present(&mut self);
}

/// In-memory row-major frame of linear colours
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
    presented: u64,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::BLACK; width * height],
            presented: 0,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.pixels = vec![Color::BLACK; width * height];
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    #[inline]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Number of frames handed to `present` so far
    #[inline]
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl PixelSurface for FrameBuffer {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    fn fill_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: Color) {
        let x0 = x.clamp(0, self.width as i64) as usize;
        let x1 = (x + w).clamp(0, self.width as i64) as usize;
        let y0 = y.clamp(0, self.height as i64) as usize;
        let y1 = (y + h).clamp(0, self.height as i64) as usize;
        for row in y0..y1 {
            let base = row * self.width;
            self.pixels[base + x0..base + x1].fill(color);
        }
    }

    #[inline]
    fn put_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = color;
        }
    }

    fn draw_column(&mut self, x: usize, y0: i32, y1: i32, color: Color) {
        if x >= self.width || self.height == 0 {
            return;
        }
        let (lo, hi) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        if hi < 0 || lo >= self.height as i32 {
            return;
        }
        let lo = lo.max(0) as usize;
        let hi = hi.min(self.height as i32 - 1) as usize;

        let mut idx = lo * self.width + x;
        for _ in lo..=hi {
            self.pixels[idx] = color;
            idx += self.width;
        }
    }

    fn present(&mut self) {
        self.presented += 1;
    }
}
