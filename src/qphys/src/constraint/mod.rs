use dyn_clone::DynClone;

use crate::particle::Particle;
use protocol::pr_model::PrConstraint;

pub mod distance;
pub mod leash;

/// A positional constraint over particles of one network, addressed by index.
pub trait Constraint: DynClone + Send + Sync {
	/// Indices of the particles this constraint touches.
	fn particles(&self) -> Vec<usize>;

	/// Runs once per `advance`, after integration and before the passes.
	fn pre_iteration(&mut self, ps: &mut [Particle]);

	/// One relaxation pass.
	fn step(&mut self, ps: &mut [Particle]);

	/// Absolute violation for the current positions.
	fn error(&self, ps: &[Particle]) -> f32;

	fn render(&self, id: usize) -> PrConstraint {
		PrConstraint {
			id,
			particles: self.particles(),
		}
	}
}

dyn_clone::clone_trait_object!(Constraint);
