//! The interface every model exposes to the frame driver.

use tracing::warn;

use crate::V2;
use protocol::pr_model::PrFrame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimulationKind {
	Pendulum,
	Cloth,
	Rope,
	Fluid,
	Gravity,
}

impl SimulationKind {
	pub const ALL: [SimulationKind; 5] = [
		SimulationKind::Pendulum,
		SimulationKind::Cloth,
		SimulationKind::Rope,
		SimulationKind::Fluid,
		SimulationKind::Gravity,
	];

	pub fn name(self) -> &'static str {
		match self {
			SimulationKind::Pendulum => "pendulum",
			SimulationKind::Cloth => "cloth",
			SimulationKind::Rope => "rope",
			SimulationKind::Fluid => "fluid",
			SimulationKind::Gravity => "gravity",
		}
	}
}

/// Input translated into world space by the driver.
///
/// A model ignores the variants it has no use for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
	/// Cursor held at `point`, pulling with `strength`.
	Pointer { point: V2, strength: f32 },
	/// Uniform force for the next step.
	Force(V2),
	/// Force on whatever sits nearest `point`.
	PointForce { point: V2, force: V2 },
	/// Grab the nearest particle, or move the one already grabbed.
	Grab(V2),
	Release,
	/// Emit smoke and momentum at `point`.
	Source { point: V2, velocity: V2, smoke: f32 },
}

pub trait Simulation: Send {
	fn kind(&self) -> SimulationKind;

	/// Integrates one step of `dt` seconds.
	fn advance(&mut self, dt: f32);

	fn interact(&mut self, interaction: &Interaction);

	fn render(&self) -> PrFrame;

	fn constraint_len(&self) -> usize {
		0
	}
}

/// Reports the first non-finite state of a model.
#[derive(Clone, Debug, Default)]
pub(crate) struct FiniteGuard {
	warned: bool,
}

impl FiniteGuard {
	pub fn check(&mut self, name: &'static str, finite: bool) {
		debug_assert!(finite, "{} state is no longer finite", name);
		if !finite && !self.warned {
			warn!(model = name, "state is no longer finite");
			self.warned = true;
		}
	}
}
