// pr_model: simulation state prepared for rendering

#[derive(Clone, Debug, PartialEq)]
pub struct PrParticle {
	pub pos: [f32; 2],
	pub pinned: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrConstraint {
	pub id: usize,
	pub particles: Vec<usize>,
}

/// Points and the links between them (pendulum, cloth, rope, n-body).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrModel {
	pub particles: Vec<PrParticle>,
	pub constraints: Vec<PrConstraint>,
}

/// Cell-centred snapshot of a fluid grid, row-major with `x` fastest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrGrid {
	pub width: usize,
	pub height: usize,
	pub cell_size: f32,
	/// World position of the lower-left corner.
	pub origin: [f32; 2],
	pub smoke: Vec<f32>,
	pub velocity: Vec<[f32; 2]>,
	pub obstacle: Vec<bool>,
}

impl PrGrid {
	pub fn index(&self, x: usize, y: usize) -> usize {
		y * self.width + x
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrFrame {
	Model(PrModel),
	Grid(PrGrid),
}

impl PrFrame {
	pub fn particle_len(&self) -> usize {
		match self {
			PrFrame::Model(m) => m.particles.len(),
			PrFrame::Grid(g) => g.width * g.height,
		}
	}
}
