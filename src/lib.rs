pub mod node;

pub use node::*;
pub use node::draw::draw_region;
pub use node::error::{ConfigError, ExportError};
pub use node::gif::GifOptions;
pub use node::levels::{Frames, Levels};
pub use node::metric::{Direction, ErrorMetric, Evaluation, MetricKind};

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

/// A compressed image: the configuration it was built with and the tree
/// of regions covering it.
///
/// The tree is rebuilt from scratch by every call to `compress` and is
/// otherwise never modified.
#[derive(Clone, Debug, Default)]
pub struct Quadtree {
	config: Config,
	root: Option<QuadNode>,
	width: u32,
	height: u32,
}

impl Quadtree {
	pub fn new(config: Config) -> Self {
		Quadtree { config, root: None, width: 0, height: 0 }
	}

	/// Builds a fresh tree from `grid`, replacing whatever tree was held.
	///
	/// A grid with zero width or height gives an empty tree.
	pub fn compress(&mut self, grid: &PixelGrid) -> &mut Self {
		let (width, height) = grid.dimensions();
		self.width = width;
		self.height = height;
		self.root = QuadNode::build(grid, Region::new(0, 0, width, height), &self.config);
		debug!(
			width,
			height,
			metric = %self.config.metric,
			threshold = self.config.threshold,
			min_block_area = self.config.min_block_area,
			nodes = self.count_nodes(),
			leaves = self.count_leaves(),
			depth = self.depth(),
			"compressed image"
		);
		self
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn root(&self) -> Option<&QuadNode> {
		self.root.as_ref()
	}

	/// Dimensions of the grid the tree was built from.
	pub fn dimensions(&self) -> (u32, u32) {
		(self.width, self.height)
	}

	pub fn is_empty(&self) -> bool {
		self.root.is_none()
	}

	/// Paints every leaf's color over its region on a grid of the original
	/// size. An empty tree gives a 0x0 grid.
	pub fn reconstruct(&self) -> PixelGrid {
		let mut canvas = PixelGrid::new(self.width, self.height);
		if let Some(ref root) = self.root {
			root.to_image(&mut canvas);
		}
		canvas
	}

	pub fn count_nodes(&self) -> usize {
		self.root.as_ref().map_or(0, QuadNode::count_nodes)
	}

	pub fn count_leaves(&self) -> usize {
		self.root.as_ref().map_or(0, QuadNode::count_leaves)
	}

	/// 1 for a lone leaf, 0 for an empty tree.
	pub fn depth(&self) -> usize {
		self.root.as_ref().map_or(0, QuadNode::depth)
	}

	/// Groups all nodes by their distance from the root.
	pub fn nodes_by_level(&self) -> Levels<'_> {
		Levels::collect(self.root.as_ref())
	}

	/// Progressive frames, coarsest first; the last one equals `reconstruct()`.
	pub fn frames(&self) -> Frames<'_> {
		Frames::new(self.nodes_by_level(), self.width, self.height)
	}

	/// Writes the progressive frames to `path` as an animated GIF.
	///
	/// Returns the number of frames written.
	pub fn save_gif<P: AsRef<Path>>(&self, path: P, options: &GifOptions) -> Result<usize, ExportError> {
		if self.is_empty() {
			return Err(ExportError::EmptyImage);
		}
		// Fail before touching the filesystem.
		node::gif::check_dimensions(self.width, self.height)?;
		let out = BufWriter::new(File::create(path.as_ref())?);
		debug!(path = %path.as_ref().display(), levels = self.depth(), "writing progressive GIF");
		node::gif::encode_gif(self.frames(), out, options)
	}
}
