use std::time::Instant;

use tracing::debug;

use crate::controller_message::ControllerMessage;
use crate::error::SimResult;
use crate::fluid::FluidGrid;
use crate::gravity::GravitySystem;
use crate::network::ParticleNetwork;
use crate::params::{
	ClothParams, FluidParams, GravityParams, PendulumParams, RopeParams,
};
use crate::pendulum::{PendulumState, PendulumSystem};
use crate::simulation::{Simulation, SimulationKind};
use crate::time_manager::TimeManager;
use protocol::pr_model::PrFrame;
use protocol::user_event::UpdateInfo;

/// Parameters for every model the selector can build.
#[derive(Clone, Debug)]
pub struct SceneConfig {
	pub pendulum: PendulumParams,
	pub pendulum_state: PendulumState,
	pub cloth: ClothParams,
	pub rope: RopeParams,
	pub fluid: FluidParams,
	pub gravity: GravityParams,
	pub time: TimeManager,
}

impl Default for SceneConfig {
	fn default() -> Self {
		use std::f64::consts::FRAC_PI_2;
		Self {
			pendulum: PendulumParams::default(),
			pendulum_state: PendulumState::new(FRAC_PI_2, FRAC_PI_2, 0.0, 0.0),
			cloth: ClothParams::default(),
			rope: RopeParams::default(),
			fluid: FluidParams::default(),
			gravity: GravityParams::default(),
			time: TimeManager::default(),
		}
	}
}

impl SceneConfig {
	pub fn build(&self, kind: SimulationKind) -> SimResult<Box<dyn Simulation>> {
		Ok(match kind {
			SimulationKind::Pendulum => Box::new(PendulumSystem::new(
				self.pendulum,
				self.pendulum_state,
			)?),
			SimulationKind::Cloth => Box::new(ParticleNetwork::cloth(&self.cloth)?),
			SimulationKind::Rope => Box::new(ParticleNetwork::rope(&self.rope)?),
			SimulationKind::Fluid => Box::new(FluidGrid::new(self.fluid)?),
			SimulationKind::Gravity => Box::new(GravitySystem::new(&self.gravity)?),
		})
	}
}

/// Owns the running model and decides when it steps.
pub struct SimulationSelector {
	config: SceneConfig,
	active: Box<dyn Simulation>,
	time: TimeManager,

	// -1: always play
	// 0: pause
	// n: play n frames
	forward_frames: i32,

	last_dt: f32,
	load: f32,
	particle_len: usize,
}

impl SimulationSelector {
	pub fn new(config: SceneConfig, kind: SimulationKind) -> SimResult<Self> {
		let active = config.build(kind)?;
		let particle_len = active.render().particle_len();
		let time = config.time.clone();
		Ok(Self {
			config,
			active,
			time,
			forward_frames: -1,
			last_dt: 0.0,
			load: 0.0,
			particle_len,
		})
	}

	pub fn with_paused(mut self) -> Self {
		self.forward_frames = 0;
		self
	}

	pub fn config(&self) -> &SceneConfig {
		&self.config
	}

	pub fn active(&self) -> &dyn Simulation {
		self.active.as_ref()
	}

	pub fn kind(&self) -> SimulationKind {
		self.active.kind()
	}

	pub fn paused(&self) -> bool {
		self.forward_frames == 0
	}

	/// Step size of the most recent advance, 0 before the first one.
	pub fn last_dt(&self) -> f32 {
		self.last_dt
	}

	/// Replaces the running model with a fresh `kind`. On error the running
	/// model is kept.
	pub fn select(&mut self, kind: SimulationKind) -> SimResult<()> {
		let active = self.config.build(kind)?;
		debug!(kind = kind.name(), "select simulation");
		self.particle_len = active.render().particle_len();
		self.active = active;
		self.time.clear();
		self.last_dt = 0.0;
		Ok(())
	}

	/// Rebuilds the running model from its parameters.
	pub fn reset(&mut self) -> SimResult<()> {
		self.select(self.kind())
	}

	pub fn handle(&mut self, msg: ControllerMessage) -> SimResult<()> {
		match msg {
			ControllerMessage::TogglePause => {
				if self.forward_frames == 0 {
					self.forward_frames = -1;
					self.time.clear();
				} else {
					self.forward_frames = 0;
				}
			}
			ControllerMessage::FrameForward => {
				if self.forward_frames == 0 {
					self.forward_frames += 1;
				}
			}
			ControllerMessage::Select(kind) => self.select(kind)?,
			ControllerMessage::Reset => self.reset()?,
			ControllerMessage::Interact(interaction) => {
				self.active.interact(&interaction)
			}
		}
		Ok(())
	}

	/// Advances the running model for a frame that took `frame_time`
	/// seconds. `None` while paused.
	pub fn frame(&mut self, frame_time: f32) -> Option<PrFrame> {
		if self.forward_frames == 0 {
			return None;
		}
		if self.forward_frames > 0 {
			self.forward_frames -= 1;
		}
		let steps = self.time.take_steps(frame_time);
		let dt = self.time.step();
		let start = Instant::now();
		for _ in 0..steps {
			self.active.advance(dt);
		}
		if steps > 0 {
			self.last_dt = dt;
			self.load = start.elapsed().as_secs_f32() / (steps as f32 * dt);
		}
		debug!(kind = self.kind().name(), steps, dt, "frame");
		let frame = self.active.render();
		self.particle_len = frame.particle_len();
		Some(frame)
	}

	pub fn update_info(&self) -> UpdateInfo {
		UpdateInfo {
			name: self.kind().name(),
			load: self.load,
			last_dt: self.last_dt,
			paused: self.paused(),
			particle_len: self.particle_len,
			constraint_len: self.active.constraint_len(),
		}
	}
}
