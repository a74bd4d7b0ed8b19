// ============================================================
// Layer 5 — 2D Positional Encoding + Grid Flattening
// ============================================================
// Convolutional features carry no notion of *where* on the page
// they came from once they are flattened into a sequence, so a
// fixed sinusoidal signal is added before flattening.
//
// Channel layout of the [1, C, H, W] table (C divisible by 4):
//
//   channels 0 .. C/2      horizontal band, depends on x only
//       2k   = sin(x / 10000^(2k/C))
//       2k+1 = cos(x / 10000^(2k/C))
//   channels C/2 .. C      vertical band, depends on y only
//       C/2 + 2k   = sin(y / 10000^(2k/C))
//       C/2 + 2k+1 = cos(y / 10000^(2k/C))
//
// The table is computed once for the largest grid the model will
// ever see and sliced to the actual grid size on every call.
//
// Reference: Vaswani et al. (2017) §3.5
//            Parmar et al. (2018) Image Transformer

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::TensorData,
};

#[derive(Config, Debug)]
pub struct PositionalEncodingConfig {
    /// Feature channels of the encoder grid
    pub num_channels: usize,
    /// Largest grid height that will ever be encoded
    pub max_height: usize,
    /// Largest grid width that will ever be encoded
    pub max_width: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl PositionalEncodingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PositionalEncoding2d<B> {
        let (c, h, w) = (self.num_channels, self.max_height, self.max_width);
        let values = sinusoidal_table_2d(c, h, w);
        let pe = Tensor::<B, 4>::from_data(TensorData::new(values, [1, c, h, w]), device);
        PositionalEncoding2d {
            pe,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Row-major `[C, H, W]` values of the 2D sinusoidal table.
pub fn sinusoidal_table_2d(num_channels: usize, max_height: usize, max_width: usize) -> Vec<f32> {
    assert!(
        num_channels % 4 == 0,
        "2D positional encoding needs a channel count divisible by 4, got {num_channels}"
    );
    let half  = num_channels / 2;
    let plane = max_height * max_width;
    let mut table = vec![0.0f32; num_channels * plane];

    for k in 0..num_channels / 4 {
        let den = 10000f64.powf((2 * k) as f64 / num_channels as f64);
        for y in 0..max_height {
            let angle_y = y as f64 / den;
            for x in 0..max_width {
                let angle_x = x as f64 / den;
                let at = y * max_width + x;
                table[(2 * k) * plane + at]            = angle_x.sin() as f32;
                table[(2 * k + 1) * plane + at]        = angle_x.cos() as f32;
                table[(half + 2 * k) * plane + at]     = angle_y.sin() as f32;
                table[(half + 2 * k + 1) * plane + at] = angle_y.cos() as f32;
            }
        }
    }
    table
}

#[derive(Module, Debug)]
pub struct PositionalEncoding2d<B: Backend> {
    /// Precomputed [1, C, H_max, W_max] table, never trained or mutated
    pe:      Tensor<B, 4>,
    dropout: Dropout,
}

impl<B: Backend> PositionalEncoding2d<B> {
    /// grid: [batch, C, h, w] → grid + table[.., .., ..h, ..w], then dropout.
    ///
    /// Panics if the grid is larger than the precomputed table.
    pub fn forward(&self, grid: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = grid.dims();
        let table = self.table(height, width);
        // Dropout only fires on autodiff backends, i.e. while training
        self.dropout.forward(grid + table)
    }

    /// The [1, C, height, width] slice of the table added to a grid of that size.
    pub fn table(&self, height: usize, width: usize) -> Tensor<B, 4> {
        let (channels, max_height, max_width) = self.capacity();
        assert!(
            height <= max_height && width <= max_width,
            "Feature grid {height}x{width} exceeds the positional table {max_height}x{max_width}; \
             raise the declared maximum input size"
        );
        self.pe
            .clone()
            .slice([0..1, 0..channels, 0..height, 0..width])
    }

    /// (channels, max_height, max_width) of the table
    pub fn capacity(&self) -> (usize, usize, usize) {
        let [_, c, h, w] = self.pe.dims();
        (c, h, w)
    }
}

/// [batch, C, H, W] → [batch, H*W, C].
///
/// Spatial positions are enumerated row by row (y outer, x inner),
/// which is the order the memory sequence is attended in.
pub fn flatten_grid<B: Backend>(grid: Tensor<B, 4>) -> Tensor<B, 3> {
    grid.flatten::<3>(2, 3).swap_dims(1, 2)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().iter::<f32>().collect()
    }

    fn encoder(c: usize, h: usize, w: usize) -> PositionalEncoding2d<TestBackend> {
        let device = Default::default();
        PositionalEncodingConfig::new(c, h, w).init::<TestBackend>(&device)
    }

    #[test]
    fn test_table_slice_has_requested_shape() {
        let pe = encoder(16, 6, 10);
        assert_eq!(pe.capacity(), (16, 6, 10));
        assert_eq!(pe.table(3, 4).dims(), [1, 16, 3, 4]);
        assert_eq!(pe.table(6, 10).dims(), [1, 16, 6, 10]);
    }

    #[test]
    fn test_known_values() {
        let (c, h, w) = (8, 3, 5);
        let table = sinusoidal_table_2d(c, h, w);
        let at = |ch: usize, y: usize, x: usize| table[ch * h * w + y * w + x];

        // k = 0 → den = 1
        assert!((at(0, 2, 3) - 3f32.sin()).abs() < 1e-6);
        assert!((at(1, 2, 3) - 3f32.cos()).abs() < 1e-6);
        assert!((at(4, 2, 3) - 2f32.sin()).abs() < 1e-6);
        assert!((at(5, 2, 3) - 2f32.cos()).abs() < 1e-6);

        // k = 1 → den = 10000^(2/8) = 10
        assert!((at(2, 0, 4) - 0.4f32.sin()).abs() < 1e-6);
        assert!((at(7, 1, 0) - 0.1f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_bands_depend_on_one_axis_only() {
        let (c, h, w) = (8, 4, 4);
        let table = sinusoidal_table_2d(c, h, w);
        let at = |ch: usize, y: usize, x: usize| table[ch * h * w + y * w + x];
        for y in 0..h {
            // horizontal band is constant down a column
            assert_eq!(at(0, y, 2), at(0, 0, 2));
            // vertical band is constant along a row
            assert_eq!(at(4, y, 3), at(4, y, 0));
        }
    }

    #[test]
    fn test_repeated_calls_add_the_same_table() {
        let pe = encoder(8, 4, 6);
        let device = Default::default();
        let grid = Tensor::<TestBackend, 4>::zeros([2, 8, 3, 5], &device);
        let first  = values(pe.forward(grid.clone()));
        let second = values(pe.forward(grid));
        assert_eq!(first, second);

        // On a non-autodiff backend dropout is the identity,
        // so zeros + table == table for each batch element
        let table = values(pe.table(3, 5));
        assert_eq!(&first[..table.len()], table.as_slice());
        assert_eq!(&first[table.len()..], table.as_slice());
    }

    #[test]
    #[should_panic(expected = "exceeds the positional table")]
    fn test_grid_larger_than_table_panics() {
        let pe = encoder(8, 2, 2);
        let device = Default::default();
        let grid = Tensor::<TestBackend, 4>::zeros([1, 8, 3, 2], &device);
        let _ = pe.forward(grid);
    }

    #[test]
    #[should_panic(expected = "divisible by 4")]
    fn test_channel_count_must_split_in_four() {
        let _ = sinusoidal_table_2d(6, 2, 2);
    }

    #[test]
    fn test_flatten_is_row_major_and_reversible() {
        let device = Default::default();
        let (c, h, w) = (256, 2, 3);
        let raw: Vec<f32> = (0..c * h * w).map(|v| v as f32).collect();
        let grid = Tensor::<TestBackend, 4>::from_data(TensorData::new(raw.clone(), [1, c, h, w]), &device);

        let memory = flatten_grid(grid);
        assert_eq!(memory.dims(), [1, h * w, c]);

        let flat = values(memory.clone());
        for ch in [0, 1, 100, 255] {
            for y in 0..h {
                for x in 0..w {
                    let pos = y * w + x;
                    assert_eq!(flat[pos * c + ch], raw[ch * h * w + y * w + x]);
                }
            }
        }

        // Un-flatten: [1, H*W, C] → [1, C, H*W] → [1, C, H, W]
        let restored = memory.swap_dims(1, 2).reshape([1, c, h, w]);
        assert_eq!(values(restored), raw);
    }
}
