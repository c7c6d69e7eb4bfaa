//! Double pendulum integrated with classical fourth-order Runge-Kutta.
//!
//! The state is `{theta1, theta2, omega1, omega2}`, angles measured from the
//! downward vertical. Everything runs in f64: the trajectories are chaotic and
//! single precision visibly changes them within seconds.

use std::ops::{Add, Mul};

use tracing::info;

use crate::error::SimResult;
use crate::params::PendulumParams;
use crate::simulation::{FiniteGuard, Interaction, Simulation, SimulationKind};
use crate::V2d;
use protocol::pr_model::{PrConstraint, PrFrame, PrModel, PrParticle};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PendulumState {
	pub theta1: f64,
	pub theta2: f64,
	pub omega1: f64,
	pub omega2: f64,
}

impl PendulumState {
	pub fn new(theta1: f64, theta2: f64, omega1: f64, omega2: f64) -> Self {
		Self {
			theta1,
			theta2,
			omega1,
			omega2,
		}
	}

	pub fn is_finite(&self) -> bool {
		self.theta1.is_finite()
			&& self.theta2.is_finite()
			&& self.omega1.is_finite()
			&& self.omega2.is_finite()
	}
}

impl Add for PendulumState {
	type Output = Self;

	fn add(self, o: Self) -> Self {
		Self::new(
			self.theta1 + o.theta1,
			self.theta2 + o.theta2,
			self.omega1 + o.omega1,
			self.omega2 + o.omega2,
		)
	}
}

impl Mul<f64> for PendulumState {
	type Output = Self;

	fn mul(self, k: f64) -> Self {
		Self::new(
			self.theta1 * k,
			self.theta2 * k,
			self.omega1 * k,
			self.omega2 * k,
		)
	}
}

/// Time derivative of `s`: `{omega1, omega2, alpha1, alpha2}`.
pub fn derivative(p: &PendulumParams, s: &PendulumState) -> PendulumState {
	let (l1, m1) = (p.rod1.length, p.rod1.mass);
	let (l2, m2) = (p.rod2.length, p.rod2.mass);
	let g = p.gravity;
	let delta = s.theta1 - s.theta2;
	let (sin_d, cos_d) = delta.sin_cos();
	// strictly positive while both masses are
	let den = 2.0 * m1 + m2 - m2 * (2.0 * delta).cos();
	let w1 = s.omega1 * s.omega1;
	let w2 = s.omega2 * s.omega2;

	let alpha1 = (-g * (2.0 * m1 + m2) * s.theta1.sin()
		- m2 * g * (s.theta1 - 2.0 * s.theta2).sin()
		- 2.0 * sin_d * m2 * (w2 * l2 + w1 * l1 * cos_d))
		/ (l1 * den);
	let alpha2 = (2.0
		* sin_d
		* (w1 * l1 * (m1 + m2) + g * (m1 + m2) * s.theta1.cos() + w2 * l2 * m2 * cos_d))
		/ (l2 * den);
	PendulumState::new(s.omega1, s.omega2, alpha1, alpha2)
}

/// One RK4 step: four derivative evaluations weighted 1:2:2:1.
pub fn rk4_step(p: &PendulumParams, s: PendulumState, dt: f64) -> PendulumState {
	let k1 = derivative(p, &s);
	let k2 = derivative(p, &(s + k1 * (dt / 2.0)));
	let k3 = derivative(p, &(s + k2 * (dt / 2.0)));
	let k4 = derivative(p, &(s + k3 * dt));
	s + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

#[derive(Clone, Debug)]
pub struct PendulumSystem {
	params: PendulumParams,
	state: PendulumState,
	guard: FiniteGuard,
}

impl PendulumSystem {
	pub fn new(params: PendulumParams, state: PendulumState) -> SimResult<Self> {
		params.validate()?;
		info!(
			l1 = params.rod1.length,
			l2 = params.rod2.length,
			g = params.gravity,
			"add pendulum"
		);
		Ok(Self {
			params,
			state,
			guard: FiniteGuard::default(),
		})
	}

	pub fn params(&self) -> &PendulumParams {
		&self.params
	}

	pub fn state(&self) -> PendulumState {
		self.state
	}

	pub fn advance_f64(&mut self, dt: f64) {
		self.state = rk4_step(&self.params, self.state, dt);
		self.guard.check("pendulum", self.state.is_finite());
	}

	pub fn advance(&mut self, dt: f32) {
		self.advance_f64(dt as f64)
	}

	/// Pivot-relative positions of both masses.
	pub fn bob_positions(&self) -> [V2d; 2] {
		self.params.bob_positions(self.state.theta1, self.state.theta2)
	}

	/// Nudges the mass nearest `point` toward it.
	///
	/// This is a heuristic, not an exact torque: the angular velocity changes
	/// by `gain * strength` times the offset to the point projected on the
	/// mass's direction of motion, divided by the rod length.
	pub fn apply_point_force(&mut self, point: V2d, strength: f64) {
		let [b1, b2] = self.bob_positions();
		let near_first = (point - b1).norm_squared() <= (point - b2).norm_squared();
		let (bob, theta, length) = if near_first {
			(b1, self.state.theta1, self.params.rod1.length)
		} else {
			(b2, self.state.theta2, self.params.rod2.length)
		};
		let tangent = V2d::new(theta.cos(), theta.sin());
		let nudge = self.params.gain * strength * (point - bob).dot(&tangent) / length;
		if near_first {
			self.state.omega1 += nudge;
		} else {
			self.state.omega2 += nudge;
		}
	}

	pub fn kinetic_energy(&self) -> f64 {
		let PendulumState {
			theta1,
			theta2,
			omega1,
			omega2,
		} = self.state;
		let (l1, m1) = (self.params.rod1.length, self.params.rod1.mass);
		let (l2, m2) = (self.params.rod2.length, self.params.rod2.mass);
		let v1 = l1 * omega1;
		let v2 = l2 * omega2;
		let v2_sq = v1 * v1 + v2 * v2 + 2.0 * v1 * v2 * (theta1 - theta2).cos();
		0.5 * m1 * v1 * v1 + 0.5 * m2 * v2_sq
	}

	/// Zero at the pivot height.
	pub fn potential_energy(&self) -> f64 {
		let (l1, m1) = (self.params.rod1.length, self.params.rod1.mass);
		let (l2, m2) = (self.params.rod2.length, self.params.rod2.mass);
		let g = self.params.gravity;
		-(m1 + m2) * g * l1 * self.state.theta1.cos()
			- m2 * g * l2 * self.state.theta2.cos()
	}

	pub fn energy(&self) -> f64 {
		self.kinetic_energy() + self.potential_energy()
	}

	pub fn pr_model(&self) -> PrModel {
		let [b1, b2] = self.bob_positions();
		let particle = |p: V2d, pinned| PrParticle {
			pos: [p[0] as f32, p[1] as f32],
			pinned,
		};
		PrModel {
			particles: vec![
				particle(V2d::zeros(), true),
				particle(b1, false),
				particle(b2, false),
			],
			constraints: vec![
				PrConstraint {
					id: 0,
					particles: vec![0, 1],
				},
				PrConstraint {
					id: 1,
					particles: vec![1, 2],
				},
			],
		}
	}
}

impl Simulation for PendulumSystem {
	fn kind(&self) -> SimulationKind {
		SimulationKind::Pendulum
	}

	fn advance(&mut self, dt: f32) {
		PendulumSystem::advance(self, dt)
	}

	fn interact(&mut self, interaction: &Interaction) {
		if let Interaction::Pointer { point, strength } = *interaction {
			self.apply_point_force(point.cast::<f64>(), strength as f64);
		}
	}

	fn render(&self) -> PrFrame {
		PrFrame::Model(self.pr_model())
	}

	fn constraint_len(&self) -> usize {
		2
	}
}
