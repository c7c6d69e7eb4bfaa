use crate::constraint::distance::{DCTy, DistanceConstraintTemplate};
use crate::params::{ClothParams, PinMode, RopeParams};
use crate::particle::ParticleTemplate;
use crate::V2;

/// Topology of a particle network before it is simulated.
#[derive(Clone, Debug, Default)]
pub struct PhysicalModel {
	pub particles: Vec<ParticleTemplate>,
	pub constraints: Vec<DistanceConstraintTemplate>,
}

impl PhysicalModel {
	pub fn add_particle(&mut self, p: ParticleTemplate) -> usize {
		self.particles.push(p);
		self.particles.len() - 1
	}

	/// Links `p1` and `p2` at their current separation.
	pub fn link(&mut self, p1: usize, p2: usize) -> &mut DistanceConstraintTemplate {
		let l0 = (self.particles[p1].pos - self.particles[p2].pos).magnitude();
		let id = self.constraints.len();
		self.constraints.push(DistanceConstraintTemplate::new(p1, p2, l0));
		&mut self.constraints[id]
	}

	/// Regular lattice, row-major with row 0 on top. `ps[row][col]`.
	#[allow(clippy::needless_range_loop)]
	pub fn new_cloth(params: &ClothParams) -> Self {
		let mut model = Self::default();
		let spacing = params.spacing();
		let (sin, cos) = params.angle.sin_cos();
		let imass = 1.0 / params.mass;
		let x = params.columns;
		let y = params.rows;
		let mut ps = vec![];
		for idy in 0..y {
			let mut pline = vec![];
			for idx in 0..x {
				let local =
					V2::new(spacing[0] * idx as f32, -spacing[1] * idy as f32);
				let rotated = V2::new(
					local[0] * cos - local[1] * sin,
					local[0] * sin + local[1] * cos,
				);
				let pinned = idy == 0
					&& match params.pin {
						PinMode::None => false,
						PinMode::TopRow => true,
						PinMode::TopCorners => idx == 0 || idx == x - 1,
					};
				let mut p = ParticleTemplate::new(imass, params.origin + rotated);
				p.pinned = pinned;
				pline.push(model.add_particle(p));
			}
			ps.push(pline);
		}
		let mut links = vec![];
		for idy in 0..y {
			for idx in 1..x {
				links.push((ps[idy][idx - 1], ps[idy][idx]));
			}
		}
		for idy in 1..y {
			for idx in 0..x {
				links.push((ps[idy - 1][idx], ps[idy][idx]));
			}
		}
		if params.shear {
			for idy in 1..y {
				for idx in 1..x {
					links.push((ps[idy - 1][idx - 1], ps[idy][idx]));
					links.push((ps[idy - 1][idx], ps[idy][idx - 1]));
				}
			}
		}
		if params.bend {
			for idy in 0..y {
				for idx in 2..x {
					links.push((ps[idy][idx - 2], ps[idy][idx]));
				}
			}
			for idy in 2..y {
				for idx in 0..x {
					links.push((ps[idy - 2][idx], ps[idy][idx]));
				}
			}
		}
		for (a, b) in links.into_iter() {
			let c = model.link(a, b);
			c.stiffness = params.stiffness;
			c.damping = params.damping;
		}
		model
	}

	/// Chain of `count` particles, the first one pinned at the anchor.
	pub fn new_rope(params: &RopeParams) -> Self {
		let mut model = Self::default();
		let segment = params.length / (params.count - 1) as f32;
		let dir = V2::new(params.angle.cos(), params.angle.sin());
		let imass = 1.0 / params.mass;
		for i in 0..params.count {
			let mut p =
				ParticleTemplate::new(imass, params.anchor + dir * segment * i as f32);
			p.pinned = i == 0;
			model.add_particle(p);
		}
		let ty = if params.slack { DCTy::Attractive } else { DCTy::Normal };
		for i in 1..params.count {
			let c = model.link(i - 1, i);
			c.stiffness = params.stiffness;
			c.damping = params.damping;
			c.ty = ty;
		}
		model
	}
}
