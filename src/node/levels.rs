use super::{PixelGrid, QuadNode};

/// Background of frames rendered for an empty tree.
pub const BACKGROUND: super::Pixel = image::Rgb([0, 0, 0]);

/// Every node of a tree grouped by depth, the root being level 0.
///
/// Within a level, nodes keep NW, NE, SW, SE visitation order.
#[derive(Clone, Debug, Default)]
pub struct Levels<'a> {
	pub levels: Vec<Vec<&'a QuadNode>>,
	/// Deepest level holding any node; 0 for an empty tree.
	pub max_level: usize,
}

impl<'a> Levels<'a> {
	/// Groups the subtree under `root` (if any) by depth.
	pub fn collect(root: Option<&'a QuadNode>) -> Self {
		let mut levels = Vec::new();
		if let Some(root) = root {
			gather(root, 0, &mut levels);
		}
		let max_level = levels.len().saturating_sub(1);
		Levels { levels, max_level }
	}

	/// Number of levels; equals the tree depth.
	pub fn len(&self) -> usize {
		self.levels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}

	pub fn get(&self, level: usize) -> &[&'a QuadNode] {
		self.levels.get(level).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Number of leaves found at `level`.
	pub fn leaves_at(&self, level: usize) -> usize {
		self.get(level).iter().filter(|n| n.is_leaf()).count()
	}
}

fn gather<'a>(node: &'a QuadNode, level: usize, levels: &mut Vec<Vec<&'a QuadNode>>) {
	if levels.len() <= level {
		levels.push(Vec::new());
	}
	levels[level].push(node);
	if let Some(ref sects) = node.sections {
		for section in sects.iter() {
			gather(section, level + 1, levels);
		}
	}
}

/// Coarse-to-fine frames showing a tree being refined level by level.
///
/// Frame `k` is frame `k - 1` with every node of level `k` painted over it,
/// so frame 0 is the root's mean color and the last frame is the final
/// reconstruction. A region finalized as a leaf is never painted again.
#[derive(Debug)]
pub struct Frames<'a> {
	levels: Levels<'a>,
	canvas: PixelGrid,
	next: usize,
	done: bool,
}

impl<'a> Frames<'a> {
	/// Prepares frames of a `width` by `height` canvas.
	pub fn new(levels: Levels<'a>, width: u32, height: u32) -> Self {
		Frames {
			levels,
			canvas: image::RgbImage::from_pixel(width, height, BACKGROUND),
			next: 0,
			done: false,
		}
	}

	/// The canvas as painted so far.
	pub fn canvas(&self) -> &PixelGrid {
		&self.canvas
	}
}

impl<'a> Iterator for Frames<'a> {
	type Item = PixelGrid;

	fn next(&mut self) -> Option<PixelGrid> {
		if self.done {
			return None;
		}
		// An empty tree still produces one background frame.
		if self.next >= self.levels.len().max(1) {
			self.done = true;
			return None;
		}
		for node in self.levels.get(self.next) {
			node.draw_region(&mut self.canvas);
		}
		self.next += 1;
		Some(self.canvas.clone())
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let left = if self.done {
			0
		} else {
			self.levels.len().max(1).saturating_sub(self.next)
		};
		(left, Some(left))
	}
}

impl<'a> ExactSizeIterator for Frames<'a> {}

#[cfg(test)]
mod tests {
	use super::super::metric::MetricKind;
	use super::super::{Config, Region};
	use super::*;

	fn quadrants() -> PixelGrid {
		// Black NW/SE, white NE/SW, with one red pixel in the NE quadrant.
		let mut grid = image::RgbImage::from_fn(4, 4, |x, y| {
			if (x < 2) == (y < 2) { image::Rgb([0, 0, 0]) } else { image::Rgb([255, 255, 255]) }
		});
		grid.put_pixel(3, 0, image::Rgb([255, 0, 0]));
		grid
	}

	#[test]
	fn levels_follow_quadrant_order() {
		let grid = quadrants();
		let root = QuadNode::build(&grid, Region::new(0, 0, 4, 4), &Config::new(0., 1, MetricKind::Variance)).unwrap();
		let levels = Levels::collect(Some(&root));
		assert_eq!(levels.len(), 3);
		assert_eq!(levels.max_level, 2);
		assert_eq!(levels.get(0).len(), 1);
		let origins: Vec<_> = levels.get(1).iter().map(|n| (n.region.x, n.region.y)).collect();
		assert_eq!(origins, vec![(0, 0), (2, 0), (0, 2), (2, 2)]);
		assert_eq!(levels.leaves_at(1), 3);
		assert_eq!(levels.leaves_at(2), 4);
		let deep: Vec<_> = levels.get(2).iter().map(|n| (n.region.x, n.region.y)).collect();
		assert_eq!(deep, vec![(2, 0), (3, 0), (2, 1), (3, 1)]);
		assert!(levels.get(3).is_empty());
	}

	#[test]
	fn empty_tree_has_no_levels() {
		let levels = Levels::collect(None);
		assert!(levels.is_empty());
		assert_eq!(levels.max_level, 0);
		let frames: Vec<_> = Frames::new(levels, 0, 0).collect();
		assert_eq!(frames.len(), 1);
		assert_eq!(frames[0].dimensions(), (0, 0));
	}

	#[test]
	fn frames_refine_without_regressing() {
		let grid = quadrants();
		let root = QuadNode::build(&grid, Region::new(0, 0, 4, 4), &Config::new(0., 1, MetricKind::Variance)).unwrap();
		let frames: Vec<_> = Frames::new(Levels::collect(Some(&root)), 4, 4).collect();
		assert_eq!(frames.len(), root.depth());
		// Frame 0 is the root mean everywhere.
		assert!(frames[0].pixels().all(|p| *p == root.color));
		// Quadrants that became leaves at level 1 stay put afterwards.
		assert_eq!(*frames[1].get_pixel(0, 0), image::Rgb([0, 0, 0]));
		assert_eq!(*frames[2].get_pixel(0, 0), image::Rgb([0, 0, 0]));
		assert_eq!(*frames[2].get_pixel(0, 3), image::Rgb([255, 255, 255]));
		// The final frame is the exact input here.
		assert_eq!(frames[2], grid);
	}

	#[test]
	fn frames_report_exact_length() {
		let grid = quadrants();
		let root = QuadNode::build(&grid, Region::new(0, 0, 4, 4), &Config::new(0., 1, MetricKind::Variance)).unwrap();
		let mut frames = Frames::new(Levels::collect(Some(&root)), 4, 4);
		assert_eq!(frames.len(), 3);
		assert!(frames.canvas().pixels().all(|p| *p == BACKGROUND));
		let first = frames.next().unwrap();
		assert_eq!(frames.len(), 2);
		assert_eq!(frames.canvas(), &first);
	}
}
