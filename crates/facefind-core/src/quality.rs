//! Whole-image brightness and contrast statistics.

use image::DynamicImage;

/// Per-image luminance statistics on the 0–255 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub width: u32,
    pub height: u32,
    /// Mean of per-pixel RGB averages.
    pub brightness: f32,
    /// Standard deviation of per-pixel RGB averages.
    pub contrast: f32,
}

impl ImageStats {
    /// Compute statistics over every pixel. Alpha is ignored.
    pub fn compute(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let (brightness, contrast) = mean_and_stddev(rgb.pixels().map(|p| {
            let [r, g, b] = p.0;
            (r as f32 + g as f32 + b as f32) / 3.0
        }));

        Self {
            width,
            height,
            brightness,
            contrast,
        }
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }
}

/// Scale a 0–255 statistic to a rounded 0–100 percentage.
pub fn to_percent(value: f32) -> u8 {
    ((value / 255.0) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Population mean and standard deviation in one pass over `f64` sums.
fn mean_and_stddev(samples: impl Iterator<Item = f32>) -> (f32, f32) {
    let mut n = 0u64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for s in samples {
        let s = s as f64;
        n += 1;
        sum += s;
        sum_sq += s * s;
    }
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let variance = (sum_sq / n as f64 - mean * mean).max(0.0);
    (mean as f32, variance.sqrt() as f32)
}
