/// Axis-aligned block of cells, `[i0, i1) x [j0, j1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRegion {
	pub i0: usize,
	pub j0: usize,
	pub i1: usize,
	pub j1: usize,
}

impl CellRegion {
	pub fn new(i: usize, j: usize, width: usize, height: usize) -> Self {
		Self {
			i0: i,
			j0: j,
			i1: i + width,
			j1: j + height,
		}
	}

	pub fn cell(i: usize, j: usize) -> Self {
		Self::new(i, j, 1, 1)
	}

	/// Square of side `2 * radius + 1` centred on `(i, j)`.
	pub fn around(i: usize, j: usize, radius: usize) -> Self {
		Self {
			i0: i.saturating_sub(radius),
			j0: j.saturating_sub(radius),
			i1: i + radius + 1,
			j1: j + radius + 1,
		}
	}

	/// Cells of the region inside a grid's non-border area.
	pub fn cells(
		&self,
		width: usize,
		height: usize,
	) -> impl Iterator<Item = (usize, usize)> {
		let (i0, i1) = (self.i0.max(1), self.i1.min(width - 1));
		let (j0, j1) = (self.j0.max(1), self.j1.min(height - 1));
		(j0..j1).flat_map(move |j| (i0..i1).map(move |i| (i, j)))
	}
}
