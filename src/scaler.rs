use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use crate::surface::Color;

/// Precomputed mapping from destination pixels to source pixels
pub struct ScaleLut {
    src_x: Vec<usize>,
    src_y: Vec<usize>,
}

impl ScaleLut {
    pub fn empty() -> Self {
        Self {
            src_x: Vec::new(),
            src_y: Vec::new(),
        }
    }

    #[inline]
    pub fn dst_size(&self) -> (usize, usize) {
        (self.src_x.len(), self.src_y.len())
    }
}

/// Nearest-neighbour mapping; an exact integer ratio gives clean pixel doubling
pub fn build_scale_lut(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> ScaleLut {
    if src_w == 0 || src_h == 0 {
        return ScaleLut::empty();
    }

    let map = |dst: usize, src: usize| -> Vec<usize> {
        (0..dst)
            .map(|d| ((d * src) / dst).min(src - 1))
            .collect()
    };

    ScaleLut {
        src_x: map(dst_w, src_w),
        src_y: map(dst_h, src_h),
    }
}

/// Parallel gamma-correcting blit.
/// Rows are processed in parallel for cache friendly writes
pub fn blit_scaled(dst: &mut [u32], dw: usize, src: &[Color], sw: usize, lut: &ScaleLut) {
    if dw == 0 || sw == 0 {
        return;
    }
    dst.par_chunks_mut(dw).enumerate().for_each(|(y, dst_row)| {
        let Some(&sy) = lut.src_y.get(y) else {
            return;
        };
        let row = &src[sy * sw..(sy + 1) * sw];
        for (d, &sx) in dst_row.iter_mut().zip(&lut.src_x) {
            *d = row[sx].to_u32();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_scale_doubles_pixels() {
        let lut = build_scale_lut(4, 2, 2, 1);
        assert_eq!(lut.src_x, vec![0, 0, 1, 1]);
        assert_eq!(lut.src_y, vec![0, 0]);
        assert_eq!(lut.dst_size(), (4, 2));
    }

    #[test]
    fn blit_gamma_encodes() {
        let src = [Color::WHITE, Color::new(0.25, 0.0, 0.0)];
        let lut = build_scale_lut(4, 2, 2, 1);
        let mut dst = vec![0u32; 8];
        blit_scaled(&mut dst, 4, &src, 2, &lut);
        assert_eq!(
            dst,
            vec![
                0x00FF_FFFF, 0x00FF_FFFF, 0x0080_0000, 0x0080_0000,
                0x00FF_FFFF, 0x00FF_FFFF, 0x0080_0000, 0x0080_0000,
            ]
        );
    }

    #[test]
    fn empty_source_gives_empty_lut() {
        assert_eq!(build_scale_lut(4, 4, 0, 0).dst_size(), (0, 0));
    }
}
