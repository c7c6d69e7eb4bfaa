use crate::constraint::Constraint;
use crate::particle::Particle;
use crate::V2;

/// Drags one particle toward a target point, used for cursor grabbing.
#[derive(Clone, Debug)]
pub struct LeashConstraint {
	p: usize,
	pos: V2,
	stiffness: f32,
}

impl LeashConstraint {
	pub fn new_with_pos(p: usize, pos: V2) -> Self {
		Self {
			p,
			pos,
			stiffness: 1.0,
		}
	}

	pub fn with_stiffness(mut self, stiffness: f32) -> Self {
		self.stiffness = stiffness;
		self
	}

	pub fn set_target(&mut self, pos: V2) {
		self.pos = pos;
	}

	pub fn target(&self) -> V2 {
		self.pos
	}

	pub fn particle(&self) -> usize {
		self.p
	}
}

impl Constraint for LeashConstraint {
	fn particles(&self) -> Vec<usize> {
		vec![self.p]
	}

	fn pre_iteration(&mut self, _ps: &mut [Particle]) {}

	fn step(&mut self, ps: &mut [Particle]) {
		let p = &mut ps[self.p];
		if p.get_imass() == 0.0 {
			return;
		}
		let dp = self.pos - p.get_pos();
		p.add_pos(dp * self.stiffness);
	}

	fn error(&self, ps: &[Particle]) -> f32 {
		(ps[self.p].get_pos() - self.pos).magnitude()
	}
}
