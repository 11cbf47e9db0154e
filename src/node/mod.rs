pub mod draw;
pub mod error;
pub mod gif;
pub mod levels;
pub mod metric;

use metric::MetricKind;

/// One 8-bit RGB pixel.
pub type Pixel = image::Rgb<u8>;
/// Row-major grid of pixels; the input and output of compression.
pub type PixelGrid = image::RgbImage;

/// Axis-aligned rectangle of pixels inside a grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

impl Region {
	pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
		Region { x, y, width, height }
	}

	pub fn area(&self) -> u64 {
		self.width as u64 * self.height as u64
	}

	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}

	/// Splits the region into NW, NE, SW and SE quarters.
	///
	/// Odd sizes give the extra column to the east quarters and the extra row
	/// to the south quarters, so the four always tile the region exactly.
	pub fn quarters(&self) -> [Region; 4] {
		let (half_w, half_h) = (self.width / 2, self.height / 2);
		let (rem_w, rem_h) = (self.width - half_w, self.height - half_h);
		[
			Region::new(self.x, self.y, half_w, half_h),
			Region::new(self.x + half_w, self.y, rem_w, half_h),
			Region::new(self.x, self.y + half_h, half_w, rem_h),
			Region::new(self.x + half_w, self.y + half_h, rem_w, rem_h),
		]
	}

	/// The part of this region that lies inside a `width` by `height` grid.
	pub fn clip(&self, width: u32, height: u32) -> Region {
		let x = self.x.min(width);
		let y = self.y.min(height);
		Region {
			x,
			y,
			width: self.width.min(width - x),
			height: self.height.min(height - y),
		}
	}
}

/// Parameters controlling how eagerly regions are split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
	/// Homogeneity threshold, interpreted in the selected metric's direction.
	pub threshold: f64,
	/// Regions of this area or smaller are never split, and no split may
	/// produce a quarter smaller than this.
	pub min_block_area: u64,
	pub metric: MetricKind,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			threshold: 10.,
			min_block_area: 4,
			metric: MetricKind::Variance,
		}
	}
}

impl Config {
	pub fn new(threshold: f64, min_block_area: u64, metric: MetricKind) -> Self {
		Config { threshold, min_block_area, metric }
	}

	/// Checks the threshold against the legal range of the selected metric.
	///
	/// Compression itself never calls this; out-of-range values merely give
	/// a tree that is either a single leaf or split as far as the minimum
	/// block area allows.
	pub fn validate(&self) -> Result<(), error::ConfigError> {
		if !self.threshold.is_finite() {
			return Err(error::ConfigError::NonFiniteThreshold);
		}
		let (min, max) = self.metric.threshold_range();
		if self.threshold < min || self.threshold > max {
			return Err(error::ConfigError::ThresholdOutOfRange {
				metric: self.metric.metric().name(),
				threshold: self.threshold,
				min,
				max,
			});
		}
		Ok(())
	}
}

/// Node in a quadtree approximating an image.
///
/// May contain subnodes (branch node) or no subnodes (leaf node).
///
/// It always carries the mean color of its region, such that tree descent
/// can stop at any level and give a meaningful preview. Only leaf colors
/// end up in the final reconstruction.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadNode {
	pub region: Region,
	pub color: Pixel,
	/// NW, NE, SW and SE children, tiling `region` exactly.
	pub sections: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
	pub fn leaf(region: Region, color: Pixel) -> Self {
		QuadNode { region, color, sections: None }
	}

	pub fn is_leaf(&self) -> bool {
		self.sections.is_none()
	}

	/// Builds the subtree for `region` of `grid`.
	///
	/// Returns `None` only for an empty region. A region becomes a leaf when
	/// its area is at most `min_block_area`, when any of its quarters would
	/// be empty or smaller than `min_block_area`, or when the metric judges it
	/// homogeneous. Otherwise its four quarters are built recursively in
	/// NW, NE, SW, SE order.
	pub fn build(grid: &PixelGrid, region: Region, config: &Config) -> Option<QuadNode> {
		if region.is_empty() {
			return None;
		}
		let mean = metric::region_mean(grid, region);
		let quarters = region.quarters();

		let vetoed = quarters.iter().any(|q| q.is_empty() || q.area() < config.min_block_area);
		if region.area() <= config.min_block_area || vetoed {
			return Some(QuadNode::leaf(region, mean));
		}
		let metric = config.metric.metric();
		let error = metric.error(grid, region, mean);
		if metric.is_homogeneous(error, config.threshold) {
			return Some(QuadNode::leaf(region, mean));
		}

		// Quarters are non-empty past the veto, so every build yields a node.
		let [nw, ne, sw, se] = quarters.map(|q| QuadNode::build(grid, q, config));
		match (nw, ne, sw, se) {
			(Some(nw), Some(ne), Some(sw), Some(se)) => Some(QuadNode {
				region,
				color: mean,
				sections: Some(Box::new([nw, ne, sw, se])),
			}),
			_ => Some(QuadNode::leaf(region, mean)),
		}
	}

	/// Total number of nodes in this subtree, this one included.
	pub fn count_nodes(&self) -> usize {
		1 + self.sections.as_ref()
			.map_or(0, |sects| sects.iter().map(QuadNode::count_nodes).sum())
	}

	pub fn count_leaves(&self) -> usize {
		match self.sections {
			Some(ref sects) => sects.iter().map(QuadNode::count_leaves).sum(),
			None => 1,
		}
	}

	/// Number of levels in this subtree; a lone leaf has depth 1.
	pub fn depth(&self) -> usize {
		match self.sections {
			Some(ref sects) => 1 + sects.iter().map(QuadNode::depth).max().unwrap_or(0),
			None => 1,
		}
	}

	/// Visits every leaf in NW, NE, SW, SE order.
	pub fn for_each_leaf<F: FnMut(&QuadNode)>(&self, f: &mut F) {
		match self.sections {
			Some(ref sects) => {
				for section in sects.iter() {
					section.for_each_leaf(&mut *f);
				}
			},
			None => f(self),
		}
	}
}
