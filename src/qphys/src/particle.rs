use crate::V2;
use protocol::pr_model::PrParticle;

#[derive(Clone, Debug)]
pub struct ParticleTemplate {
	pub imass: f32,
	pub pos: V2,
	pub pinned: bool,
}

impl ParticleTemplate {
	pub fn new(imass: f32, pos: V2) -> Self {
		Self {
			imass,
			pos,
			pinned: false,
		}
	}

	pub fn pinned(mut self) -> Self {
		self.pinned = true;
		self
	}
}

/// Verlet particle: velocity is implied by `pos - ppos`.
#[derive(Clone, Debug)]
pub struct Particle {
	imass: f32,
	pinned: bool,
	pos: V2,
	ppos: V2,
	force: V2,
}

impl Particle {
	pub fn new(imass: f32, pos: V2) -> Self {
		Self {
			imass, // 0 is immovable
			pinned: false,
			pos,
			ppos: pos,
			force: V2::zeros(),
		}
	}

	pub fn from_template(t: &ParticleTemplate) -> Self {
		let mut p = Self::new(t.imass, t.pos);
		p.pinned = t.pinned;
		p
	}

	pub fn get_pos(&self) -> V2 {
		self.pos
	}

	pub fn get_ppos(&self) -> V2 {
		self.ppos
	}

	pub fn get_force(&self) -> V2 {
		self.force
	}

	pub fn is_pinned(&self) -> bool {
		self.pinned
	}

	pub fn set_pinned(&mut self, pinned: bool) {
		self.pinned = pinned;
		if pinned {
			self.ppos = self.pos;
		}
	}

	/// Inverse mass seen by the solver, 0 when pinned.
	pub fn get_imass(&self) -> f32 {
		if self.pinned {
			0.0
		} else {
			self.imass
		}
	}

	/// Displacement since the previous step.
	pub fn velocity(&self) -> V2 {
		self.pos - self.ppos
	}

	pub(crate) fn add_pos(&mut self, dp: V2) {
		self.pos += dp
	}

	pub(crate) fn add_ppos(&mut self, dp: V2) {
		self.ppos += dp
	}

	pub(crate) fn set_pos(&mut self, p: V2) {
		self.pos = p
	}

	pub(crate) fn add_force(&mut self, f: V2) {
		self.force += f
	}

	pub(crate) fn reset_pos(&mut self, p: V2) {
		self.pos = p;
		self.ppos = p;
	}

	/// Position Verlet step. `scale` is `dt / last_dt`, which keeps the
	/// implied velocity right when the step size changes.
	pub(crate) fn update(
		&mut self,
		dt: f32,
		scale: f32,
		gravity: V2,
		drag: f32,
		max_dp: f32,
	) {
		let imass = self.get_imass();
		if imass == 0f32 {
			self.force = V2::zeros();
			return;
		}
		let ppos = self.pos;
		let accel = gravity + self.force * imass;
		let keep = (1.0 - drag * dt).max(0.0);
		let mut dp = (self.pos - self.ppos) * scale * keep + accel * dt * dt;
		let l = dp.magnitude();
		if l > max_dp {
			dp *= max_dp / l;
		}
		self.pos += dp;
		self.ppos = ppos;
		self.force = V2::zeros();
	}

	pub fn render(&self) -> PrParticle {
		PrParticle {
			pos: [self.pos[0], self.pos[1]],
			pinned: self.get_imass() == 0.0,
		}
	}
}
