use tracing::warn;

use crate::constraint::Constraint;
use crate::particle::Particle;

#[derive(Clone, Debug)]
pub struct DistanceConstraintTemplate {
	pub ps: [usize; 2],
	pub l0: f32,
	pub stiffness: f32,
	pub damping: f32,
	pub ty: DCTy,
}

impl DistanceConstraintTemplate {
	pub fn new(p1: usize, p2: usize, l0: f32) -> Self {
		Self {
			ps: [p1, p2],
			l0,
			stiffness: 1.0,
			damping: 0.0,
			ty: DCTy::Normal,
		}
	}

	pub fn with_stiffness(mut self, stiffness: f32) -> Self {
		self.stiffness = stiffness;
		self
	}

	pub fn with_damping(mut self, damping: f32) -> Self {
		self.damping = damping;
		self
	}

	pub fn with_ty(mut self, ty: DCTy) -> Self {
		self.ty = ty;
		self
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceConstraintType {
	Normal,
	Repulsive,
	// slack link, only resists stretching
	Attractive,
}
pub type DCTy = DistanceConstraintType;

#[derive(Clone, Debug)]
pub struct DistanceConstraint {
	ps: [usize; 2],
	l0: f32,
	stiffness: f32,
	damping: f32,
	ty: DCTy,
}

impl DistanceConstraint {
	pub fn from_template(t: &DistanceConstraintTemplate) -> Self {
		Self {
			ps: t.ps,
			l0: t.l0,
			stiffness: t.stiffness,
			damping: t.damping,
			ty: t.ty,
		}
	}

	pub fn rest_length(&self) -> f32 {
		self.l0
	}

	pub fn stiffness(&self) -> f32 {
		self.stiffness
	}

	pub fn damping(&self) -> f32 {
		self.damping
	}

	pub fn build(self) -> Box<dyn Constraint> {
		Box::new(self)
	}
}

impl Constraint for DistanceConstraint {
	fn particles(&self) -> Vec<usize> {
		self.ps.to_vec()
	}

	// Removes a fraction of the relative velocity along the link. Only the
	// previous positions change, so pinned particles stay where they are.
	fn pre_iteration(&mut self, ps: &mut [Particle]) {
		if self.damping == 0.0 {
			return;
		}
		let [a, b] = self.ps;
		let imass1 = ps[a].get_imass();
		let imass2 = ps[b].get_imass();
		let imass = imass1 + imass2;
		if imass == 0.0 {
			return;
		}
		let dp = ps[a].get_pos() - ps[b].get_pos();
		let l = dp.magnitude();
		if !l.is_normal() {
			return;
		}
		let n = dp / l;
		let vn = (ps[a].velocity() - ps[b].velocity()).dot(&n);
		let dv = n * (-self.damping * vn / imass);
		ps[a].add_ppos(-dv * imass1);
		ps[b].add_ppos(dv * imass2);
	}

	fn step(&mut self, ps: &mut [Particle]) {
		let [a, b] = self.ps;
		let imass1 = ps[a].get_imass();
		let imass2 = ps[b].get_imass();
		let imass = imass1 + imass2;
		if imass == 0.0 {
			return;
		}
		let dp = ps[a].get_pos() - ps[b].get_pos();
		let l = dp.magnitude();
		if !l.is_normal() {
			warn!(a, b, "bad distance {}", l);
			return;
		}
		let dl = l - self.l0;
		if self.ty == DCTy::Repulsive && dl >= 0.
			|| self.ty == DCTy::Attractive && dl <= 0.
		{
			return;
		}
		let correct = dp / l * (-dl * self.stiffness / imass);
		ps[a].add_pos(correct * imass1);
		ps[b].add_pos(-correct * imass2);
	}

	fn error(&self, ps: &[Particle]) -> f32 {
		let [a, b] = self.ps;
		let l = (ps[a].get_pos() - ps[b].get_pos()).magnitude();
		let dl = l - self.l0;
		match self.ty {
			DCTy::Normal => dl.abs(),
			DCTy::Repulsive => (-dl).max(0.0),
			DCTy::Attractive => dl.max(0.0),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::V2;

	fn pair(imass1: f32, imass2: f32, d: f32) -> Vec<Particle> {
		vec![
			Particle::new(imass1, V2::zeros()),
			Particle::new(imass2, V2::new(d, 0.)),
		]
	}

	#[test]
	fn test_equal_mass_split() {
		let mut ps = pair(1.0, 1.0, 2.0);
		let mut c = DistanceConstraint::from_template(
			&DistanceConstraintTemplate::new(0, 1, 1.0),
		);
		c.step(&mut ps);
		assert!((ps[0].get_pos()[0] - 0.5).abs() < 1e-6);
		assert!((ps[1].get_pos()[0] - 1.5).abs() < 1e-6);
		assert!(c.error(&ps) < 1e-6);
	}

	#[test]
	fn test_immovable_end() {
		let mut ps = pair(0.0, 1.0, 2.0);
		let mut c = DistanceConstraint::from_template(
			&DistanceConstraintTemplate::new(0, 1, 1.0),
		);
		c.step(&mut ps);
		assert_eq!(ps[0].get_pos(), V2::zeros());
		assert!((ps[1].get_pos()[0] - 1.0).abs() < 1e-6);
	}

	#[test]
	fn test_stiffness_partial() {
		let mut ps = pair(0.0, 1.0, 2.0);
		let mut c = DistanceConstraint::from_template(
			&DistanceConstraintTemplate::new(0, 1, 1.0).with_stiffness(0.5),
		);
		c.step(&mut ps);
		assert!((ps[1].get_pos()[0] - 1.5).abs() < 1e-6);
	}

	#[test]
	fn test_attractive_ignores_compression() {
		let mut ps = pair(1.0, 1.0, 0.5);
		let mut c = DistanceConstraint::from_template(
			&DistanceConstraintTemplate::new(0, 1, 1.0).with_ty(DCTy::Attractive),
		);
		c.step(&mut ps);
		assert!((ps[1].get_pos()[0] - 0.5).abs() < 1e-6);
		assert_eq!(c.error(&ps), 0.0);
	}

	#[test]
	fn test_damping_removes_relative_velocity() {
		let mut ps = pair(1.0, 1.0, 1.0);
		// b moving away from a at 1 unit per step
		ps[1].add_ppos(V2::new(-1.0, 0.));
		let mut c = DistanceConstraint::from_template(
			&DistanceConstraintTemplate::new(0, 1, 1.0).with_damping(1.0),
		);
		c.pre_iteration(&mut ps);
		let rel = ps[1].velocity() - ps[0].velocity();
		assert!(rel.magnitude() < 1e-6);
		// momentum preserved for equal masses
		let total = ps[0].velocity() + ps[1].velocity();
		assert!((total[0] - 1.0).abs() < 1e-6);
	}

	#[test]
	fn test_coincident_is_skipped() {
		let mut ps = pair(1.0, 1.0, 0.0);
		let mut c = DistanceConstraint::from_template(
			&DistanceConstraintTemplate::new(0, 1, 1.0),
		);
		c.step(&mut ps);
		assert_eq!(ps[0].get_pos(), ps[1].get_pos());
	}
}
