//! Softened Newtonian n-body in the plane.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::{non_negative, positive, SimError, SimResult};
use crate::params::GravityParams;
use crate::simulation::{FiniteGuard, Interaction, Simulation, SimulationKind};
use crate::{V2, V3};
use protocol::pr_model::{PrFrame, PrModel, PrParticle};

#[derive(Clone, Debug, PartialEq)]
pub struct GravityParticle {
	pub pos: V3,
	pub vel: V3,
	pub mass: f32,
}

impl GravityParticle {
	pub fn new(pos: V2, vel: V2, mass: f32) -> Self {
		Self {
			pos: V3::new(pos[0], pos[1], 0.0),
			vel: V3::new(vel[0], vel[1], 0.0),
			mass,
		}
	}
}

#[derive(Clone, Debug)]
pub struct GravitySystem {
	g: f32,
	softening: f32,
	bodies: Vec<GravityParticle>,
	// injected accelerations, consumed by the next advance
	extra: Vec<V3>,
	guard: FiniteGuard,
}

impl GravitySystem {
	/// Spawns `count` bodies uniformly over a disk of radius `extent`.
	pub fn new(params: &GravityParams) -> SimResult<Self> {
		params.validate()?;
		let mut rng = match params.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		let (min, max) = params.mass_range;
		let bodies = (0..params.count)
			.map(|_| {
				let r = params.extent * rng.gen::<f32>().sqrt();
				let theta = rng.gen_range(0.0..std::f32::consts::TAU);
				let (sin, cos) = theta.sin_cos();
				let pos = V2::new(cos, sin) * r;
				let vel = V2::new(-sin, cos) * r * params.spin;
				GravityParticle::new(pos, vel, rng.gen_range(min..=max))
			})
			.collect();
		Self::from_bodies(bodies, params)
	}

	/// Uses `g` and `softening` from `params`, ignores the spawn settings.
	pub fn from_bodies(
		bodies: Vec<GravityParticle>,
		params: &GravityParams,
	) -> SimResult<Self> {
		if bodies.is_empty() {
			return Err(SimError::EmptyPopulation { name: "bodies" });
		}
		non_negative("g", params.g as f64)?;
		non_negative("softening", params.softening as f64)?;
		for body in bodies.iter() {
			positive("mass", body.mass as f64)?;
			if !(body.pos.iter().all(|x| x.is_finite())
				&& body.vel.iter().all(|x| x.is_finite()))
			{
				return Err(SimError::NotFinite { name: "body" });
			}
		}
		info!(bodies = bodies.len(), g = params.g, "add gravity system");
		let extra = vec![V3::zeros(); bodies.len()];
		Ok(Self {
			g: params.g,
			softening: params.softening,
			bodies,
			extra,
			guard: FiniteGuard::default(),
		})
	}

	pub fn bodies(&self) -> &[GravityParticle] {
		&self.bodies
	}

	/// Force on `i` from `j`. `pair_force(i, j) == -pair_force(j, i)` holds
	/// bit for bit.
	pub fn pair_force(&self, i: usize, j: usize) -> V3 {
		let (a, b) = (&self.bodies[i], &self.bodies[j]);
		let d = b.pos - a.pos;
		let r2 = d.norm_squared();
		if r2 == 0.0 {
			return V3::zeros();
		}
		let mm = a.mass * b.mass;
		let f = self.g * mm / (r2 + self.softening * self.softening);
		d / r2.sqrt() * f
	}

	fn acceleration(&self, i: usize) -> V3 {
		let mut force = V3::zeros();
		for j in 0..self.bodies.len() {
			if j != i {
				force += self.pair_force(i, j);
			}
		}
		force / self.bodies[i].mass + self.extra[i]
	}

	#[cfg(not(debug_assertions))]
	fn accelerations(&self) -> Vec<V3> {
		use rayon::prelude::*;
		(0..self.bodies.len())
			.into_par_iter()
			.map(|i| self.acceleration(i))
			.collect()
	}

	#[cfg(debug_assertions)]
	fn accelerations(&self) -> Vec<V3> {
		(0..self.bodies.len()).map(|i| self.acceleration(i)).collect()
	}

	/// Semi-implicit Euler: velocities first, then positions with the new
	/// velocities.
	pub fn advance(&mut self, dt: f32) {
		if dt == 0.0 {
			return;
		}
		let accel = self.accelerations();
		for (body, a) in self.bodies.iter_mut().zip(accel.into_iter()) {
			body.vel += a * dt;
			body.vel[2] = 0.0;
			body.pos += body.vel * dt;
			body.pos[2] = 0.0;
		}
		self.extra.iter_mut().for_each(|e| *e = V3::zeros());
		let finite = self
			.bodies
			.iter()
			.all(|b| b.pos.iter().chain(b.vel.iter()).all(|x| x.is_finite()));
		self.guard.check("gravity", finite);
	}

	/// Pulls every body toward `point` with acceleration `strength` during
	/// the next step.
	pub fn apply_point_force(&mut self, point: V2, strength: f32) {
		let target = V3::new(point[0], point[1], 0.0);
		for (body, extra) in self.bodies.iter().zip(self.extra.iter_mut()) {
			if let Some(dir) = (target - body.pos).try_normalize(0.0) {
				*extra += dir * strength;
			}
		}
	}

	/// Uniform acceleration for the next step.
	pub fn apply_force(&mut self, accel: V2) {
		let accel = V3::new(accel[0], accel[1], 0.0);
		self.extra.iter_mut().for_each(|e| *e += accel);
	}

	pub fn kinetic_energy(&self) -> f32 {
		self.bodies
			.iter()
			.map(|b| 0.5 * b.mass * b.vel.norm_squared())
			.sum()
	}

	/// Softened pair potential `-G m_i m_j / sqrt(r^2 + eps^2)`.
	pub fn potential_energy(&self) -> f32 {
		let eps2 = self.softening * self.softening;
		let mut e = 0.0;
		for (i, a) in self.bodies.iter().enumerate() {
			for b in self.bodies[i + 1..].iter() {
				let r2 = (b.pos - a.pos).norm_squared();
				if r2 + eps2 > 0.0 {
					e -= self.g * a.mass * b.mass / (r2 + eps2).sqrt();
				}
			}
		}
		e
	}

	pub fn momentum(&self) -> V3 {
		self.bodies.iter().map(|b| b.vel * b.mass).sum()
	}

	pub fn centre_of_mass(&self) -> V3 {
		let total: f32 = self.bodies.iter().map(|b| b.mass).sum();
		self.bodies.iter().map(|b| b.pos * b.mass).sum::<V3>() / total
	}

	pub fn pr_model(&self) -> PrModel {
		PrModel {
			particles: self
				.bodies
				.iter()
				.map(|b| PrParticle {
					pos: [b.pos[0], b.pos[1]],
					pinned: false,
				})
				.collect(),
			constraints: Vec::new(),
		}
	}
}

impl Simulation for GravitySystem {
	fn kind(&self) -> SimulationKind {
		SimulationKind::Gravity
	}

	fn advance(&mut self, dt: f32) {
		GravitySystem::advance(self, dt)
	}

	fn interact(&mut self, interaction: &Interaction) {
		match *interaction {
			Interaction::Pointer { point, strength } => {
				self.apply_point_force(point, strength)
			}
			Interaction::Force(f) => self.apply_force(f),
			_ => {}
		}
	}

	fn render(&self) -> PrFrame {
		PrFrame::Model(self.pr_model())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use approx::assert_relative_eq;

	fn pair(d: f32) -> GravitySystem {
		let bodies = vec![
			GravityParticle::new(V2::zeros(), V2::zeros(), 1.0),
			GravityParticle::new(V2::new(d, 0.0), V2::zeros(), 2.0),
		];
		let params = GravityParams::default().with_g(1.0).with_softening(0.0);
		GravitySystem::from_bodies(bodies, &params).unwrap()
	}

	#[test]
	fn test_pair_force_newton() {
		let sys = pair(2.0);
		let f = sys.pair_force(0, 1);
		// 1 * 1 * 2 / 4
		assert_relative_eq!(f[0], 0.5);
		assert_eq!(f[1], 0.0);
	}

	#[test]
	fn test_pair_force_antisymmetric_every_step() {
		let params = GravityParams::default().with_count(25).with_g(0.5);
		let mut sys = GravitySystem::new(&params).unwrap();
		for _ in 0..40 {
			let n = sys.bodies().len();
			for i in 0..n {
				for j in 0..n {
					assert_eq!(sys.pair_force(i, j), -sys.pair_force(j, i));
				}
			}
			sys.advance(0.01);
		}
	}

	#[test]
	fn test_coincident_bodies_feel_nothing() {
		let bodies = vec![
			GravityParticle::new(V2::new(1.0, 1.0), V2::zeros(), 1.0),
			GravityParticle::new(V2::new(1.0, 1.0), V2::zeros(), 1.0),
		];
		let mut sys = GravitySystem::from_bodies(bodies, &GravityParams::default())
			.unwrap();
		assert_eq!(sys.pair_force(0, 1), V3::zeros());
		sys.advance(0.1);
		assert_eq!(sys.bodies()[0].pos, V3::new(1.0, 1.0, 0.0));
	}

	#[test]
	fn test_pair_falls_together() {
		let mut sys = pair(2.0);
		sys.advance(0.1);
		let b = sys.bodies();
		// semi-implicit: x += (a dt) dt
		assert_relative_eq!(b[0].pos[0], 0.5 * 0.01, epsilon = 1e-6);
		assert_relative_eq!(b[1].pos[0], 2.0 - 0.25 * 0.01, epsilon = 1e-6);
		assert_relative_eq!(sys.momentum().norm(), 0.0, epsilon = 1e-6);
	}

	#[test]
	fn test_momentum_and_plane() {
		let params = GravityParams::default().with_count(40).with_g(0.1);
		let mut sys = GravitySystem::new(&params).unwrap();
		let p0 = sys.momentum();
		for _ in 0..100 {
			sys.advance(0.01);
		}
		let p1 = sys.momentum();
		assert_relative_eq!(p0, p1, epsilon = 1e-2);
		assert!(sys.bodies().iter().all(|b| b.pos[2] == 0.0 && b.vel[2] == 0.0));
	}

	#[test]
	fn test_spawn_layout() {
		let params = GravityParams::default()
			.with_count(200)
			.with_extent(3.0)
			.with_mass_range(2.0, 4.0)
			.with_spin(0.0);
		let sys = GravitySystem::new(&params).unwrap();
		assert_eq!(sys.bodies().len(), 200);
		for b in sys.bodies() {
			assert!(b.pos.norm() <= 3.0 + 1e-5);
			assert!(b.mass >= 2.0 && b.mass <= 4.0);
			assert_eq!(b.vel, V3::zeros());
		}
		let again = GravitySystem::new(&params).unwrap();
		assert_eq!(sys.bodies(), again.bodies());
	}

	#[test]
	fn test_spin_is_tangential() {
		let params = GravityParams::default().with_count(10).with_spin(2.0);
		let sys = GravitySystem::new(&params).unwrap();
		for b in sys.bodies() {
			assert!(b.pos.dot(&b.vel).abs() < 1e-4);
			assert_relative_eq!(b.vel.norm(), 2.0 * b.pos.norm(), epsilon = 1e-4);
		}
	}

	#[test]
	fn test_point_force_is_one_shot() {
		let params = GravityParams::default().with_g(0.0);
		let bodies = vec![GravityParticle::new(V2::zeros(), V2::zeros(), 1.0)];
		let mut sys = GravitySystem::from_bodies(bodies, &params).unwrap();
		sys.interact(&Interaction::Pointer {
			point: V2::new(0.0, 5.0),
			strength: 2.0,
		});
		sys.advance(0.5);
		assert_relative_eq!(sys.bodies()[0].vel[1], 1.0);
		sys.advance(0.5);
		assert_relative_eq!(sys.bodies()[0].vel[1], 1.0);
		assert_relative_eq!(sys.bodies()[0].pos[1], 1.0);
	}

	#[test]
	fn test_energy_roughly_conserved() {
		let bodies = vec![
			GravityParticle::new(V2::new(-1.0, 0.0), V2::new(0.0, -0.5), 1.0),
			GravityParticle::new(V2::new(1.0, 0.0), V2::new(0.0, 0.5), 1.0),
		];
		let params = GravityParams::default().with_g(1.0).with_softening(0.05);
		let mut sys = GravitySystem::from_bodies(bodies, &params).unwrap();
		let e0 = sys.kinetic_energy() + sys.potential_energy();
		for _ in 0..1000 {
			sys.advance(0.001);
		}
		let e1 = sys.kinetic_energy() + sys.potential_energy();
		assert!((e1 - e0).abs() < 1e-2 * e0.abs());
		assert_relative_eq!(sys.centre_of_mass().norm(), 0.0, epsilon = 1e-4);
	}

	#[test]
	fn test_rejects_bad_bodies() {
		let params = GravityParams::default();
		assert!(GravitySystem::from_bodies(vec![], &params).is_err());
		let bodies = vec![GravityParticle::new(V2::zeros(), V2::zeros(), 0.0)];
		assert!(GravitySystem::from_bodies(bodies, &params).is_err());
		assert!(GravitySystem::new(&params.with_count(0)).is_err());
	}
}
