use super::{PixelGrid, QuadNode};

impl QuadNode {
	/// Paints this node's color over its whole region of `canvas`.
	///
	/// Whatever part of the region falls outside the canvas is skipped.
	pub fn draw_region(&self, canvas: &mut PixelGrid) {
		let region = self.region.clip(canvas.width(), canvas.height());
		for row in region.y..region.y + region.height {
			for col in region.x..region.x + region.width {
				canvas.put_pixel(col, row, self.color);
			}
		}
	}

	/// Draws the leaves of this subtree onto `canvas`.
	///
	/// Leaves tile the root region, so every pixel it covers is written
	/// exactly once and branch colors never show.
	pub fn to_image(&self, canvas: &mut PixelGrid) {
		self.for_each_leaf(&mut |leaf| leaf.draw_region(canvas));
	}
}

/// Paints `node`'s mean color over its region of a shared canvas.
pub fn draw_region(canvas: &mut PixelGrid, node: &QuadNode) {
	node.draw_region(canvas);
}
