//! Constrained particle network backing both the cloth and the rope.

use fnv::FnvHashMap;
use tracing::info;

use crate::constraint::distance::DistanceConstraint;
use crate::constraint::leash::LeashConstraint;
use crate::constraint::Constraint;
use crate::error::{positive, SimError, SimResult};
use crate::params::{ClothParams, NetworkParams, RopeParams};
use crate::particle::Particle;
use crate::physical_model::PhysicalModel;
use crate::simulation::{FiniteGuard, Interaction, Simulation, SimulationKind};
use crate::V2;
use protocol::pr_model::{PrFrame, PrModel};

#[derive(Clone)]
pub struct ParticleNetwork {
	kind: SimulationKind,
	params: NetworkParams,
	last_dt: f32,

	particles: Vec<Particle>,
	constraints: Vec<Box<dyn Constraint>>,
	// grabbed particles, keyed by particle id
	leashes: FnvHashMap<usize, LeashConstraint>,
	guard: FiniteGuard,
}

impl ParticleNetwork {
	pub fn new(model: PhysicalModel, params: NetworkParams) -> SimResult<Self> {
		params.validate()?;
		let len = model.particles.len();
		if len == 0 {
			return Err(SimError::EmptyPopulation { name: "particles" });
		}
		for p in model.particles.iter() {
			if !p.imass.is_finite() || p.imass < 0.0 {
				return Err(SimError::Negative {
					name: "inverse mass",
					value: p.imass as f64,
				});
			}
		}
		let mut constraints = Vec::with_capacity(model.constraints.len());
		for ct in model.constraints.iter() {
			for &index in ct.ps.iter() {
				if index >= len {
					return Err(SimError::ConstraintIndex { index, len });
				}
			}
			positive("rest length", ct.l0 as f64)?;
			constraints.push(DistanceConstraint::from_template(ct).build());
		}
		let particles = model.particles.iter().map(Particle::from_template).collect();
		info!(
			particles = len,
			constraints = model.constraints.len(),
			"add model"
		);
		Ok(Self {
			kind: SimulationKind::Cloth,
			params,
			last_dt: 0.0,
			particles,
			constraints,
			leashes: FnvHashMap::default(),
			guard: FiniteGuard::default(),
		})
	}

	pub fn cloth(params: &ClothParams) -> SimResult<Self> {
		params.validate()?;
		let model = PhysicalModel::new_cloth(params);
		Ok(Self::new(model, params.network)?.with_kind(SimulationKind::Cloth))
	}

	pub fn rope(params: &RopeParams) -> SimResult<Self> {
		params.validate()?;
		let model = PhysicalModel::new_rope(params);
		Ok(Self::new(model, params.network)?.with_kind(SimulationKind::Rope))
	}

	pub fn with_kind(mut self, kind: SimulationKind) -> Self {
		self.kind = kind;
		self
	}

	pub fn params(&self) -> &NetworkParams {
		&self.params
	}

	pub fn particles(&self) -> &[Particle] {
		&self.particles
	}

	pub fn constraints(&self) -> &[Box<dyn Constraint>] {
		&self.constraints
	}

	pub fn last_dt(&self) -> f32 {
		self.last_dt
	}

	/// Largest violation over the network's fixed constraints.
	pub fn constraint_error(&self) -> f32 {
		self.constraints
			.iter()
			.map(|c| c.error(&self.particles))
			.fold(0.0, f32::max)
	}

	pub fn nearest_particle(&self, point: V2, radius: f32) -> Option<usize> {
		let mut min_dist = f32::INFINITY;
		let mut min_id = None;
		for (id, p) in self.particles.iter().enumerate() {
			let dist = (p.get_pos() - point).magnitude();
			if dist < min_dist {
				min_dist = dist;
				min_id = Some(id);
			}
		}
		min_id.filter(|_| min_dist <= radius)
	}

	/// Adds `force` to every particle for the next `advance`.
	pub fn apply_force(&mut self, force: V2) {
		for p in self.particles.iter_mut() {
			p.add_force(force);
		}
	}

	/// Adds `force` to the particle nearest `point` for the next `advance`.
	/// Returns the particle hit, nothing within the pick radius is a no-op.
	pub fn apply_point_force(&mut self, point: V2, force: V2) -> Option<usize> {
		let id = self.nearest_particle(point, self.params.pick_radius)?;
		self.particles[id].add_force(force);
		Some(id)
	}

	pub fn control_particle(&mut self, id: usize, target: V2) {
		if id >= self.particles.len() {
			return;
		}
		self.leashes
			.entry(id)
			.and_modify(|l| l.set_target(target))
			.or_insert_with(|| LeashConstraint::new_with_pos(id, target));
	}

	pub fn uncontrol_particle(&mut self, id: usize) {
		self.leashes.remove(&id);
	}

	pub fn controlled(&self) -> impl Iterator<Item = usize> + '_ {
		self.leashes.keys().copied()
	}

	fn grab(&mut self, target: V2) {
		if let Some(l) = self.leashes.values_mut().next() {
			l.set_target(target);
			return;
		}
		if let Some(id) = self.nearest_particle(target, self.params.pick_radius) {
			self.control_particle(id, target);
		}
	}

	fn solve_constraints(&mut self) {
		for constraint in self.constraints.iter_mut() {
			constraint.step(&mut self.particles);
		}
		for leash in self.leashes.values_mut() {
			leash.step(&mut self.particles);
		}
		if let Some(bounds) = self.params.bounds {
			for p in self.particles.iter_mut() {
				if p.get_imass() == 0.0 {
					continue;
				}
				let mut pos = p.get_pos();
				if bounds.apply(&mut pos) {
					p.set_pos(pos);
				}
			}
		}
	}

	pub fn advance(&mut self, dt: f32) {
		if dt == 0f32 {
			return;
		}
		let scale = if self.last_dt > 0.0 {
			dt / self.last_dt
		} else {
			1.0
		};
		let NetworkParams {
			gravity,
			drag,
			max_dp,
			iterations,
			..
		} = self.params;
		for p in self.particles.iter_mut() {
			p.update(dt, scale, gravity, drag, max_dp);
		}
		for constraint in self.constraints.iter_mut() {
			constraint.pre_iteration(&mut self.particles);
		}
		for _ in 0..iterations {
			self.solve_constraints();
		}
		self.last_dt = dt;
		let finite = self.particles.iter().all(|p| {
			let pos = p.get_pos();
			pos[0].is_finite() && pos[1].is_finite()
		});
		self.guard.check(self.kind.name(), finite);
	}

	pub fn pr_model(&self) -> PrModel {
		PrModel {
			particles: self.particles.iter().map(|p| p.render()).collect(),
			constraints: self
				.constraints
				.iter()
				.enumerate()
				.map(|(id, c)| c.render(id))
				.collect(),
		}
	}
}

impl Simulation for ParticleNetwork {
	fn kind(&self) -> SimulationKind {
		self.kind
	}

	fn advance(&mut self, dt: f32) {
		ParticleNetwork::advance(self, dt)
	}

	fn interact(&mut self, interaction: &Interaction) {
		match *interaction {
			Interaction::Force(f) => self.apply_force(f),
			Interaction::PointForce { point, force } => {
				self.apply_point_force(point, force);
			}
			Interaction::Pointer { point, strength } => {
				if let Some(id) =
					self.nearest_particle(point, self.params.pick_radius)
				{
					let pull = (point - self.particles[id].get_pos()) * strength;
					self.particles[id].add_force(pull);
				}
			}
			Interaction::Grab(target) => self.grab(target),
			Interaction::Release => self.leashes.clear(),
			Interaction::Source { .. } => {}
		}
	}

	fn render(&self) -> PrFrame {
		PrFrame::Model(self.pr_model())
	}

	fn constraint_len(&self) -> usize {
		self.constraints.len()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::constraint::distance::DistanceConstraintTemplate;
	use crate::params::PinMode;
	use crate::particle::ParticleTemplate;
	use crate::posbox::Posbox;
	use rand::{Rng, SeedableRng};

	fn still() -> NetworkParams {
		NetworkParams::default().with_gravity(V2::zeros())
	}

	fn small_cloth() -> ClothParams {
		ClothParams::default()
			.with_size(4.0, 4.0)
			.with_grid(5, 5)
			.with_origin(V2::zeros())
	}

	#[test]
	fn test_rejects_bad_index() {
		let mut model = PhysicalModel::default();
		model.add_particle(ParticleTemplate::new(1.0, V2::zeros()));
		model
			.constraints
			.push(DistanceConstraintTemplate::new(0, 3, 1.0));
		let err = ParticleNetwork::new(model, still()).err();
		assert_eq!(err, Some(SimError::ConstraintIndex { index: 3, len: 1 }));
	}

	#[test]
	fn test_rejects_zero_rest_length() {
		let mut model = PhysicalModel::default();
		model.add_particle(ParticleTemplate::new(1.0, V2::zeros()));
		model.add_particle(ParticleTemplate::new(1.0, V2::zeros()));
		model.link(0, 1);
		assert!(ParticleNetwork::new(model, still()).is_err());
	}

	#[test]
	fn test_pinned_never_move() {
		let mut net = ParticleNetwork::cloth(&small_cloth()).unwrap();
		let before: Vec<V2> = net
			.particles()
			.iter()
			.filter(|p| p.is_pinned())
			.map(|p| p.get_pos())
			.collect();
		assert_eq!(before.len(), 5);
		for step in 0..200 {
			net.apply_force(V2::new(3.0, -1.0));
			net.advance(if step % 2 == 0 { 1. / 60. } else { 1. / 30. });
			let after: Vec<V2> = net
				.particles()
				.iter()
				.filter(|p| p.is_pinned())
				.map(|p| p.get_pos())
				.collect();
			assert_eq!(before, after);
		}
	}

	#[test]
	fn test_cloth_hangs_under_gravity() {
		let params = small_cloth().with_pin(PinMode::TopCorners);
		let mut net = ParticleNetwork::cloth(&params).unwrap();
		let y0 = net.particles()[12].get_pos()[1];
		for _ in 0..60 {
			net.advance(1. / 60.);
		}
		assert!(net.particles()[12].get_pos()[1] < y0);
		assert!(net.particles().iter().all(|p| p.get_pos()[1].is_finite()));
	}

	#[test]
	fn test_rest_length_convergence() {
		let params = small_cloth().with_network(still().with_drag(2.0));
		let mut model = PhysicalModel::new_cloth(&params);
		let mut rng = rand::rngs::StdRng::seed_from_u64(3);
		for p in model.particles.iter_mut().filter(|p| !p.pinned) {
			p.pos += V2::new(rng.gen_range(-0.1..0.1), rng.gen_range(-0.1..0.1));
		}
		let mut net = ParticleNetwork::new(model, params.network).unwrap();
		let initial = net.constraint_error();
		assert!(initial > 0.01);
		let mut errors = vec![];
		for _ in 0..400 {
			net.advance(1. / 60.);
			errors.push(net.constraint_error());
		}
		let last = *errors.last().unwrap();
		assert!(last < 5e-3, "final error {}", last);
		assert!(last <= errors[20] + 1e-4);
	}

	#[test]
	fn test_point_force_hits_nearest_only() {
		let params = small_cloth().with_network(still());
		let mut net = ParticleNetwork::cloth(&params).unwrap();
		let target = net.particles()[22].get_pos();
		assert_eq!(
			net.apply_point_force(target + V2::new(0.1, 0.), V2::new(5., 0.)),
			Some(22)
		);
		assert_eq!(net.particles()[22].get_force(), V2::new(5., 0.));
		assert_eq!(net.particles()[21].get_force(), V2::zeros());
		net.advance(1. / 60.);
		assert_eq!(net.particles()[22].get_force(), V2::zeros());
	}

	#[test]
	fn test_point_force_out_of_range_is_noop() {
		let mut net = ParticleNetwork::cloth(&small_cloth()).unwrap();
		assert_eq!(net.apply_point_force(V2::new(100., 100.), V2::new(1., 0.)), None);
		assert!(net.particles().iter().all(|p| p.get_force() == V2::zeros()));
	}

	#[test]
	fn test_grab_and_release() {
		let params = RopeParams::default()
			.with_count(4)
			.with_length(3.0)
			.with_anchor(V2::zeros())
			.with_network(still());
		let mut net = ParticleNetwork::rope(&params).unwrap();
		assert_eq!(net.kind(), SimulationKind::Rope);
		net.interact(&Interaction::Grab(V2::new(3.0, 0.1)));
		assert_eq!(net.controlled().collect::<Vec<_>>(), vec![3]);
		net.interact(&Interaction::Grab(V2::new(2.0, 1.0)));
		for _ in 0..120 {
			net.advance(1. / 60.);
		}
		let end = net.particles()[3].get_pos();
		assert!((end - V2::new(2.0, 1.0)).magnitude() < 0.05);
		net.interact(&Interaction::Release);
		assert_eq!(net.controlled().count(), 0);
	}

	#[test]
	fn test_bounds_clamp() {
		let bounds = Posbox::new(V2::new(-10., -1.), V2::new(10., 10.));
		let params = RopeParams::default()
			.with_anchor(V2::zeros())
			.with_angle(-std::f32::consts::FRAC_PI_2)
			.with_slack(true)
			.with_network(NetworkParams::default().with_bounds(bounds));
		let mut net = ParticleNetwork::rope(&params).unwrap();
		for _ in 0..120 {
			net.advance(1. / 60.);
		}
		assert!(net.particles().iter().all(|p| p.get_pos()[1] >= -1.0 - 1e-5));
	}

	#[test]
	fn test_zero_dt_noop() {
		let mut net = ParticleNetwork::cloth(&small_cloth()).unwrap();
		let before: Vec<V2> = net.particles().iter().map(|p| p.get_pos()).collect();
		net.advance(0.0);
		let after: Vec<V2> = net.particles().iter().map(|p| p.get_pos()).collect();
		assert_eq!(before, after);
		assert_eq!(net.last_dt(), 0.0);
	}

	#[test]
	fn test_render() {
		let net = ParticleNetwork::cloth(&small_cloth()).unwrap();
		let m = net.pr_model();
		assert_eq!(m.particles.len(), 25);
		assert_eq!(m.constraints.len(), net.constraint_len());
		assert_eq!(m.particles.iter().filter(|p| p.pinned).count(), 5);
	}
}
