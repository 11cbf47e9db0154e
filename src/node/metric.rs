use std::fmt;
use std::str::FromStr;

use super::error::ConfigError;
use super::{Pixel, PixelGrid, Region};

/// SSIM stabilizing constants for an 8-bit dynamic range,
/// `(0.01 * 255)^2` and `(0.03 * 255)^2`.
const SSIM_C1: f64 = 6.5025;
const SSIM_C2: f64 = 58.5225;

/// Which way an error score has to move for a region to count as homogeneous.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	/// The score is a dissimilarity; homogeneous when `error <= threshold`.
	LowerIsBetter,
	/// The threshold is a similarity; homogeneous when `1 - error >= threshold`.
	HigherIsBetter,
}

/// Result of evaluating one region: its representative color and its error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
	pub mean: Pixel,
	pub error: f64,
}

/// A statistical measure of how far a region is from being one flat color.
///
/// `mean` is the color the region would be painted with if it became a leaf;
/// implementors measure their error against it. A zero-pixel region must
/// score 0.
pub trait ErrorMetric {
	/// Human-readable name, used in diagnostics.
	fn name(&self) -> &'static str;
	/// Inclusive range of thresholds that make sense for this metric.
	fn threshold_range(&self) -> (f64, f64);
	fn direction(&self) -> Direction {
		Direction::LowerIsBetter
	}
	fn error(&self, grid: &PixelGrid, region: Region, mean: Pixel) -> f64;

	/// Applies the metric's direction to decide whether a region with the
	/// given `error` may become a leaf.
	fn is_homogeneous(&self, error: f64, threshold: f64) -> bool {
		match self.direction() {
			Direction::LowerIsBetter => error <= threshold,
			Direction::HigherIsBetter => 1. - error >= threshold,
		}
	}
}

/// Mean squared deviation from the region mean, over all channels.
#[derive(Clone, Copy, Debug, Default)]
pub struct Variance;

/// Mean absolute deviation from the region mean, over all channels.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanAbsoluteDeviation;

/// Per-channel `max - min`, averaged over the three channels.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxRange;

/// Shannon entropy of each channel's histogram, averaged over the channels.
#[derive(Clone, Copy, Debug, Default)]
pub struct Entropy;

/// `1 - SSIM` between the region and its flat-colored reconstruction.
///
/// The comparison is against the leaf the region would actually be rendered
/// as: a constant signal at `mean`. With the reconstruction's variance and
/// covariance both zero, per channel this is
///
/// ```text
/// SSIM = (2 mu_x mu_y + C1) * C2 / ((mu_x^2 + mu_y^2 + C1) * (sigma_x^2 + C2))
/// ```
///
/// averaged over the channels and clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Similarity;

/// Every pixel of `region`, in row-major order. The region is clipped
/// to the grid first.
pub fn region_pixels<'a>(grid: &'a PixelGrid, region: Region) -> impl Iterator<Item = &'a Pixel> + 'a {
	let region = region.clip(grid.width(), grid.height());
	(region.y..region.y + region.height).flat_map(move |row| {
		(region.x..region.x + region.width).map(move |col| grid.get_pixel(col, row))
	})
}

fn channel_sums(grid: &PixelGrid, region: Region) -> ([u64; 3], u64) {
	region_pixels(grid, region).fold(([0; 3], 0), |(mut sums, count), pix| {
		for (sum, chan) in sums.iter_mut().zip(pix.0.iter()) {
			*sum += *chan as u64;
		}
		(sums, count + 1)
	})
}

/// Per-channel integer mean of a region, truncated toward zero.
/// An empty region averages to black.
pub fn region_mean(grid: &PixelGrid, region: Region) -> Pixel {
	let (sums, count) = channel_sums(grid, region);
	if count == 0 {
		return image::Rgb([0; 3]);
	}
	image::Rgb([
		(sums[0] / count) as u8,
		(sums[1] / count) as u8,
		(sums[2] / count) as u8,
	])
}

/// Sums `f(channel, mean_channel)` over every channel of every pixel and
/// divides by the number of samples. Integer accumulation keeps the result
/// independent of traversal order.
fn mean_deviation(grid: &PixelGrid, region: Region, mean: Pixel, f: impl Fn(u8, u8) -> u64) -> f64 {
	let (total, count) = region_pixels(grid, region).fold((0u64, 0u64), |(total, count), pix| {
		let dev: u64 = pix.0.iter().zip(mean.0.iter()).map(|(&c, &m)| f(c, m)).sum();
		(total + dev, count + 1)
	});
	if count == 0 {
		0.
	} else {
		total as f64 / (count * 3) as f64
	}
}

impl ErrorMetric for Variance {
	fn name(&self) -> &'static str {
		"variance"
	}
	fn threshold_range(&self) -> (f64, f64) {
		(0., 65025.)
	}
	fn error(&self, grid: &PixelGrid, region: Region, mean: Pixel) -> f64 {
		mean_deviation(grid, region, mean, |c, m| {
			let d = (c as i64 - m as i64).unsigned_abs();
			d * d
		})
	}
}

impl ErrorMetric for MeanAbsoluteDeviation {
	fn name(&self) -> &'static str {
		"mean absolute deviation"
	}
	fn threshold_range(&self) -> (f64, f64) {
		(0., 255.)
	}
	fn error(&self, grid: &PixelGrid, region: Region, mean: Pixel) -> f64 {
		mean_deviation(grid, region, mean, |c, m| (c as i64 - m as i64).unsigned_abs())
	}
}

impl ErrorMetric for MaxRange {
	fn name(&self) -> &'static str {
		"max range"
	}
	fn threshold_range(&self) -> (f64, f64) {
		(0., 255.)
	}
	fn error(&self, grid: &PixelGrid, region: Region, _mean: Pixel) -> f64 {
		let mut min = [u8::MAX; 3];
		let mut max = [u8::MIN; 3];
		let mut seen = false;
		for pix in region_pixels(grid, region) {
			seen = true;
			for chan in 0..3 {
				min[chan] = min[chan].min(pix.0[chan]);
				max[chan] = max[chan].max(pix.0[chan]);
			}
		}
		if !seen {
			return 0.;
		}
		let spread: u32 = (0..3).map(|chan| (max[chan] - min[chan]) as u32).sum();
		spread as f64 / 3.
	}
}

impl ErrorMetric for Entropy {
	fn name(&self) -> &'static str {
		"entropy"
	}
	fn threshold_range(&self) -> (f64, f64) {
		(0., 8.)
	}
	fn error(&self, grid: &PixelGrid, region: Region, _mean: Pixel) -> f64 {
		let mut hist = [[0u32; 256]; 3];
		let mut count = 0u64;
		for pix in region_pixels(grid, region) {
			for chan in 0..3 {
				hist[chan][pix.0[chan] as usize] += 1;
			}
			count += 1;
		}
		if count == 0 {
			return 0.;
		}
		// Bins are always visited in intensity order.
		let total = count as f64;
		let channel_entropy = |bins: &[u32; 256]| -> f64 {
			bins.iter()
				.filter(|&&n| n > 0)
				.map(|&n| {
					let p = n as f64 / total;
					-p * p.log2()
				})
				.sum()
		};
		hist.iter().map(channel_entropy).sum::<f64>() / 3.
	}
}

impl ErrorMetric for Similarity {
	fn name(&self) -> &'static str {
		"similarity"
	}
	fn threshold_range(&self) -> (f64, f64) {
		(0., 1.)
	}
	fn direction(&self) -> Direction {
		Direction::HigherIsBetter
	}
	fn error(&self, grid: &PixelGrid, region: Region, mean: Pixel) -> f64 {
		let (sums, count) = channel_sums(grid, region);
		if count == 0 {
			return 0.;
		}
		let n = count as f64;
		let mu_x = [sums[0] as f64 / n, sums[1] as f64 / n, sums[2] as f64 / n];
		let sq_dev = region_pixels(grid, region).fold([0f64; 3], |mut acc, pix| {
			for chan in 0..3 {
				let d = pix.0[chan] as f64 - mu_x[chan];
				acc[chan] += d * d;
			}
			acc
		});
		let ssim: f64 = (0..3)
			.map(|chan| {
				let (mx, my) = (mu_x[chan], mean.0[chan] as f64);
				let var_x = sq_dev[chan] / n;
				((2. * mx * my + SSIM_C1) * SSIM_C2)
					/ ((mx * mx + my * my + SSIM_C1) * (var_x + SSIM_C2))
			})
			.sum::<f64>() / 3.;
		1. - ssim.clamp(0., 1.)
	}
}

/// Selects one of the five error metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricKind {
	Variance,
	MeanAbsoluteDeviation,
	MaxRange,
	Entropy,
	Similarity,
}

impl MetricKind {
	pub const ALL: [MetricKind; 5] = [
		MetricKind::Variance,
		MetricKind::MeanAbsoluteDeviation,
		MetricKind::MaxRange,
		MetricKind::Entropy,
		MetricKind::Similarity,
	];

	/// The evaluator backing this kind.
	pub fn metric(self) -> &'static dyn ErrorMetric {
		match self {
			MetricKind::Variance => &Variance,
			MetricKind::MeanAbsoluteDeviation => &MeanAbsoluteDeviation,
			MetricKind::MaxRange => &MaxRange,
			MetricKind::Entropy => &Entropy,
			MetricKind::Similarity => &Similarity,
		}
	}

	pub fn direction(self) -> Direction {
		self.metric().direction()
	}

	pub fn threshold_range(self) -> (f64, f64) {
		self.metric().threshold_range()
	}

	pub fn is_homogeneous(self, error: f64, threshold: f64) -> bool {
		self.metric().is_homogeneous(error, threshold)
	}

	/// Computes the region's mean color and its error under this metric.
	pub fn evaluate(self, grid: &PixelGrid, region: Region) -> Evaluation {
		let mean = region_mean(grid, region);
		let error = self.metric().error(grid, region, mean);
		Evaluation { mean, error }
	}
}

impl Default for MetricKind {
	fn default() -> Self {
		MetricKind::Variance
	}
}

impl fmt::Display for MetricKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.metric().name())
	}
}

impl FromStr for MetricKind {
	type Err = ConfigError;

	/// Accepts a metric name or its menu number (1 to 5).
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"1" | "variance" | "var" => Ok(MetricKind::Variance),
			"2" | "mad" | "mean-absolute-deviation" => Ok(MetricKind::MeanAbsoluteDeviation),
			"3" | "max-range" | "range" | "max-diff" => Ok(MetricKind::MaxRange),
			"4" | "entropy" => Ok(MetricKind::Entropy),
			"5" | "ssim" | "similarity" => Ok(MetricKind::Similarity),
			_ => Err(ConfigError::UnknownMetric(s.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn grid_from(width: u32, height: u32, values: &[[u8; 3]]) -> PixelGrid {
		image::RgbImage::from_fn(width, height, |x, y| image::Rgb(values[(y * width + x) as usize]))
	}

	fn full(grid: &PixelGrid) -> Region {
		Region::new(0, 0, grid.width(), grid.height())
	}

	#[test]
	fn uniform_region_scores_perfectly_everywhere() {
		let grid = image::RgbImage::from_pixel(4, 4, image::Rgb([37, 200, 91]));
		for kind in MetricKind::ALL.iter() {
			let eval = kind.evaluate(&grid, full(&grid));
			assert_eq!(eval.mean, image::Rgb([37, 200, 91]));
			assert_eq!(eval.error, 0., "{} on a flat region", kind);
		}
	}

	#[test]
	fn empty_region_scores_zero() {
		let grid = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]));
		for kind in MetricKind::ALL.iter() {
			let eval = kind.evaluate(&grid, Region::new(2, 2, 0, 3));
			assert_eq!(eval.error, 0.);
			assert!(eval.error.is_finite());
		}
		let empty = image::RgbImage::new(0, 0);
		assert_eq!(MetricKind::Entropy.evaluate(&empty, Region::new(0, 0, 4, 4)).error, 0.);
	}

	#[test]
	fn black_and_white_halves() {
		let grid = grid_from(2, 1, &[[0, 0, 0], [255, 255, 255]]);
		let region = full(&grid);
		let mean = region_mean(&grid, region);
		assert_eq!(mean, image::Rgb([127, 127, 127]));
		// Deviations are 127 and 128 on every channel.
		assert_eq!(Variance.error(&grid, region, mean), (127. * 127. + 128. * 128.) / 2.);
		assert_eq!(MeanAbsoluteDeviation.error(&grid, region, mean), 127.5);
		assert_eq!(MaxRange.error(&grid, region, mean), 255.);
		assert_eq!(Entropy.error(&grid, region, mean), 1.);
		let ssim_err = Similarity.error(&grid, region, mean);
		assert!(ssim_err > 0.9 && ssim_err <= 1., "got {}", ssim_err);
	}

	#[test]
	fn max_range_averages_channels() {
		let grid = grid_from(2, 1, &[[10, 0, 0], [40, 0, 30]]);
		assert_eq!(MaxRange.error(&grid, full(&grid), image::Rgb([0; 3])), 20.);
	}

	#[test]
	fn entropy_of_four_distinct_values() {
		let grid = grid_from(2, 2, &[[0, 0, 0], [1, 0, 0], [2, 0, 0], [3, 0, 0]]);
		let eval = MetricKind::Entropy.evaluate(&grid, full(&grid));
		// Red carries 2 bits, green and blue carry none.
		assert!((eval.error - 2. / 3.).abs() < 1e-12);
	}

	#[test]
	fn direction_is_applied_per_metric() {
		assert_eq!(MetricKind::Variance.direction(), Direction::LowerIsBetter);
		assert_eq!(MetricKind::Similarity.direction(), Direction::HigherIsBetter);
		assert!(MetricKind::Variance.is_homogeneous(5., 5.));
		assert!(!MetricKind::Variance.is_homogeneous(5.1, 5.));
		// Similarity 0.9 against a required 0.8.
		assert!(MetricKind::Similarity.is_homogeneous(0.1, 0.8));
		assert!(!MetricKind::Similarity.is_homogeneous(0.3, 0.8));
	}

	#[test]
	fn region_is_clipped_to_grid() {
		let grid = image::RgbImage::from_pixel(2, 2, image::Rgb([9, 9, 9]));
		assert_eq!(region_pixels(&grid, Region::new(1, 1, 10, 10)).count(), 1);
		assert_eq!(region_pixels(&grid, Region::new(5, 0, 1, 1)).count(), 0);
	}

	#[test]
	fn parses_names_and_codes() {
		assert_eq!("1".parse::<MetricKind>().unwrap(), MetricKind::Variance);
		assert_eq!("MAD".parse::<MetricKind>().unwrap(), MetricKind::MeanAbsoluteDeviation);
		assert_eq!("max-range".parse::<MetricKind>().unwrap(), MetricKind::MaxRange);
		assert_eq!("4".parse::<MetricKind>().unwrap(), MetricKind::Entropy);
		assert_eq!("ssim".parse::<MetricKind>().unwrap(), MetricKind::Similarity);
		assert!("psnr".parse::<MetricKind>().is_err());
	}
}
