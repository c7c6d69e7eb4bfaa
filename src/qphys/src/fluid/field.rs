/// A field with a scratch copy for updates that must read the old values.
///
/// Writers fill `back` from `front`, then `swap`. Only `front` is ever
/// handed out of the grid.
#[derive(Clone, Debug)]
pub struct DoubleBuffer {
	front: Vec<f32>,
	back: Vec<f32>,
}

impl DoubleBuffer {
	pub fn new(len: usize) -> Self {
		Self {
			front: vec![0.0; len],
			back: vec![0.0; len],
		}
	}

	pub fn front(&self) -> &[f32] {
		&self.front
	}

	pub fn front_mut(&mut self) -> &mut [f32] {
		&mut self.front
	}

	/// Makes `back` a copy of `front`, so entries a pass skips keep their value.
	pub fn sync(&mut self) {
		self.back.copy_from_slice(&self.front);
	}

	pub fn split(&mut self) -> (&[f32], &mut [f32]) {
		(&self.front, &mut self.back)
	}

	pub fn swap(&mut self) {
		std::mem::swap(&mut self.front, &mut self.back);
	}
}

/// Where a field's samples sit inside their cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Staggering {
	/// Left face, `(i, j + 0.5)`.
	U,
	/// Bottom face, `(i + 0.5, j)`.
	V,
	/// Centre, `(i + 0.5, j + 0.5)`.
	Centre,
}

impl Staggering {
	fn offset(self) -> (f32, f32) {
		match self {
			Staggering::U => (0.0, 0.5),
			Staggering::V => (0.5, 0.0),
			Staggering::Centre => (0.5, 0.5),
		}
	}
}

/// Bilinear sample of `field` at `(x, y)` in cell units.
///
/// The point is clamped to the interior `[1, width - 1] x [1, height - 1]`
/// first, so traces that leave the grid read the nearest interior value.
pub fn sample(
	field: &[f32],
	width: usize,
	height: usize,
	x: f32,
	y: f32,
	stagger: Staggering,
) -> f32 {
	let (dx, dy) = stagger.offset();
	let x = x.clamp(1.0, (width - 1) as f32) - dx;
	let y = y.clamp(1.0, (height - 1) as f32) - dy;
	let x0 = (x.floor() as usize).min(width - 2);
	let y0 = (y.floor() as usize).min(height - 2);
	let tx = (x - x0 as f32).clamp(0.0, 1.0);
	let ty = (y - y0 as f32).clamp(0.0, 1.0);
	let at = |i: usize, j: usize| field[j * width + i];
	(1.0 - tx) * (1.0 - ty) * at(x0, y0)
		+ tx * (1.0 - ty) * at(x0 + 1, y0)
		+ (1.0 - tx) * ty * at(x0, y0 + 1)
		+ tx * ty * at(x0 + 1, y0 + 1)
}
