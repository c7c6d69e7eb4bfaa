//! Construction parameters for every model.
//!
//! Each parameter set has a `Default` matching the demo scene and
//! builder-style setters. Validation happens in `validate`, which the model
//! constructors call before touching any state.

use std::f32::consts::FRAC_PI_6;

use crate::error::{in_range, non_negative, positive, SimError, SimResult};
use crate::posbox::Posbox;
use crate::{V2, V2d};

/// One rigid, massless rod with a point mass at its end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rod {
	pub length: f64,
	pub mass: f64,
}

impl Rod {
	pub fn new(length: f64, mass: f64) -> Self {
		Self { length, mass }
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendulumParams {
	pub rod1: Rod,
	pub rod2: Rod,
	pub gravity: f64,
	/// Scale of the cursor nudge, in rad/s per metre of offset.
	pub gain: f64,
}

impl Default for PendulumParams {
	fn default() -> Self {
		Self {
			rod1: Rod::new(1.0, 1.0),
			rod2: Rod::new(1.0, 1.0),
			gravity: 9.81,
			gain: 1.0,
		}
	}
}

impl PendulumParams {
	pub fn with_rods(mut self, rod1: Rod, rod2: Rod) -> Self {
		self.rod1 = rod1;
		self.rod2 = rod2;
		self
	}

	pub fn with_gravity(mut self, gravity: f64) -> Self {
		self.gravity = gravity;
		self
	}

	pub fn with_gain(mut self, gain: f64) -> Self {
		self.gain = gain;
		self
	}

	pub fn validate(&self) -> SimResult<()> {
		positive("rod1.length", self.rod1.length)?;
		positive("rod1.mass", self.rod1.mass)?;
		positive("rod2.length", self.rod2.length)?;
		positive("rod2.mass", self.rod2.mass)?;
		non_negative("gravity", self.gravity)?;
		non_negative("gain", self.gain)
	}

	/// Pivot-relative positions of the two masses for the given angles.
	pub fn bob_positions(&self, theta1: f64, theta2: f64) -> [V2d; 2] {
		let p1 = V2d::new(theta1.sin(), -theta1.cos()) * self.rod1.length;
		let p2 = p1 + V2d::new(theta2.sin(), -theta2.cos()) * self.rod2.length;
		[p1, p2]
	}
}

/// Global forces and solver settings shared by cloth and rope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NetworkParams {
	pub gravity: V2,
	/// Velocity drag, per second.
	pub drag: f32,
	/// Relaxation passes per `advance`.
	pub iterations: usize,
	/// Upper bound on a particle's displacement per step.
	pub max_dp: f32,
	/// How far from a particle a point force still reaches it.
	pub pick_radius: f32,
	pub bounds: Option<Posbox>,
}

impl Default for NetworkParams {
	fn default() -> Self {
		Self {
			gravity: V2::new(0., -9.81),
			drag: 0.5,
			iterations: 8,
			max_dp: 1.0,
			pick_radius: 0.5,
			bounds: None,
		}
	}
}

impl NetworkParams {
	pub fn with_gravity(mut self, gravity: V2) -> Self {
		self.gravity = gravity;
		self
	}

	pub fn with_drag(mut self, drag: f32) -> Self {
		self.drag = drag;
		self
	}

	pub fn with_iterations(mut self, iterations: usize) -> Self {
		self.iterations = iterations;
		self
	}

	pub fn with_max_dp(mut self, max_dp: f32) -> Self {
		self.max_dp = max_dp;
		self
	}

	pub fn with_pick_radius(mut self, r: f32) -> Self {
		self.pick_radius = r;
		self
	}

	pub fn with_bounds(mut self, bounds: Posbox) -> Self {
		self.bounds = Some(bounds);
		self
	}

	pub fn validate(&self) -> SimResult<()> {
		if !(self.gravity[0].is_finite() && self.gravity[1].is_finite()) {
			return Err(SimError::NotFinite { name: "gravity" });
		}
		non_negative("drag", self.drag as f64)?;
		positive("iterations", self.iterations as f64)?;
		positive("max_dp", self.max_dp as f64)?;
		non_negative("pick_radius", self.pick_radius as f64)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinMode {
	None,
	TopRow,
	TopCorners,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClothParams {
	/// Position of the top-left particle.
	pub origin: V2,
	pub width: f32,
	pub height: f32,
	pub columns: usize,
	pub rows: usize,
	/// Rotation of the sheet about `origin`, radians.
	pub angle: f32,
	/// Mass of each particle.
	pub mass: f32,
	pub stiffness: f32,
	pub damping: f32,
	pub shear: bool,
	pub bend: bool,
	pub pin: PinMode,
	pub network: NetworkParams,
}

impl Default for ClothParams {
	fn default() -> Self {
		Self {
			origin: V2::new(-5.0, 5.0),
			width: 10.0,
			height: 10.0,
			columns: 20,
			rows: 20,
			angle: FRAC_PI_6,
			mass: 0.1,
			stiffness: 1.0,
			damping: 0.05,
			shear: true,
			bend: false,
			pin: PinMode::TopRow,
			network: NetworkParams::default(),
		}
	}
}

impl ClothParams {
	pub fn with_size(mut self, width: f32, height: f32) -> Self {
		self.width = width;
		self.height = height;
		self
	}

	pub fn with_grid(mut self, columns: usize, rows: usize) -> Self {
		self.columns = columns;
		self.rows = rows;
		self
	}

	pub fn with_angle(mut self, angle: f32) -> Self {
		self.angle = angle;
		self
	}

	pub fn with_origin(mut self, origin: V2) -> Self {
		self.origin = origin;
		self
	}

	pub fn with_pin(mut self, pin: PinMode) -> Self {
		self.pin = pin;
		self
	}

	pub fn with_links(mut self, shear: bool, bend: bool) -> Self {
		self.shear = shear;
		self.bend = bend;
		self
	}

	pub fn with_network(mut self, network: NetworkParams) -> Self {
		self.network = network;
		self
	}

	pub fn validate(&self) -> SimResult<()> {
		if self.columns < 2 || self.rows < 2 {
			return Err(SimError::OutOfRange {
				name: "cloth columns/rows",
				value: self.columns.min(self.rows) as f64,
				min: 2.0,
				max: f64::INFINITY,
			});
		}
		positive("width", self.width as f64)?;
		positive("height", self.height as f64)?;
		positive("mass", self.mass as f64)?;
		in_range("stiffness", self.stiffness as f64, f64::EPSILON, 1.0)?;
		in_range("damping", self.damping as f64, 0.0, 1.0)?;
		if !self.angle.is_finite() {
			return Err(SimError::NotFinite { name: "angle" });
		}
		self.network.validate()
	}

	/// Distance between horizontal neighbours.
	pub fn spacing(&self) -> V2 {
		V2::new(
			self.width / (self.columns - 1) as f32,
			self.height / (self.rows - 1) as f32,
		)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RopeParams {
	/// Position of the pinned first particle.
	pub anchor: V2,
	pub count: usize,
	pub length: f32,
	/// Direction the rope initially hangs in, radians from +x.
	pub angle: f32,
	pub mass: f32,
	pub stiffness: f32,
	pub damping: f32,
	/// Links resist stretching only.
	pub slack: bool,
	pub network: NetworkParams,
}

impl Default for RopeParams {
	fn default() -> Self {
		Self {
			anchor: V2::new(0.0, 4.0),
			count: 30,
			length: 6.0,
			angle: 0.0,
			mass: 0.1,
			stiffness: 1.0,
			damping: 0.05,
			slack: false,
			network: NetworkParams::default().with_iterations(16),
		}
	}
}

impl RopeParams {
	pub fn with_count(mut self, count: usize) -> Self {
		self.count = count;
		self
	}

	pub fn with_length(mut self, length: f32) -> Self {
		self.length = length;
		self
	}

	pub fn with_anchor(mut self, anchor: V2) -> Self {
		self.anchor = anchor;
		self
	}

	pub fn with_angle(mut self, angle: f32) -> Self {
		self.angle = angle;
		self
	}

	pub fn with_slack(mut self, slack: bool) -> Self {
		self.slack = slack;
		self
	}

	pub fn with_network(mut self, network: NetworkParams) -> Self {
		self.network = network;
		self
	}

	pub fn validate(&self) -> SimResult<()> {
		if self.count < 2 {
			return Err(SimError::OutOfRange {
				name: "rope count",
				value: self.count as f64,
				min: 2.0,
				max: f64::INFINITY,
			});
		}
		positive("length", self.length as f64)?;
		positive("mass", self.mass as f64)?;
		in_range("stiffness", self.stiffness as f64, f64::EPSILON, 1.0)?;
		in_range("damping", self.damping as f64, 0.0, 1.0)?;
		self.network.validate()
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidParams {
	/// Cells along x, border included.
	pub width: usize,
	/// Cells along y, border included.
	pub height: usize,
	pub cell_size: f32,
	/// World position of the grid's lower-left corner.
	pub origin: V2,
	/// Pressure solver sweeps per projection.
	pub iterations: usize,
	pub over_relaxation: f32,
	pub viscosity: f32,
	pub diffuse_iterations: usize,
	/// Fraction of smoke lost per second.
	pub dissipation: f32,
	/// Constant acceleration on the whole velocity field (wind, gravity).
	pub ambient: V2,
	/// Upward acceleration per unit of smoke.
	pub buoyancy: f32,
}

impl Default for FluidParams {
	fn default() -> Self {
		Self {
			width: 100,
			height: 60,
			cell_size: 0.1,
			origin: V2::new(-5.0, -3.0),
			iterations: 40,
			over_relaxation: 1.9,
			viscosity: 0.0,
			diffuse_iterations: 20,
			dissipation: 0.0,
			ambient: V2::zeros(),
			buoyancy: 1.0,
		}
	}
}

impl FluidParams {
	pub fn with_size(mut self, width: usize, height: usize) -> Self {
		self.width = width;
		self.height = height;
		self
	}

	pub fn with_cell_size(mut self, h: f32) -> Self {
		self.cell_size = h;
		self
	}

	pub fn with_origin(mut self, origin: V2) -> Self {
		self.origin = origin;
		self
	}

	pub fn with_iterations(mut self, iterations: usize) -> Self {
		self.iterations = iterations;
		self
	}

	pub fn with_over_relaxation(mut self, o: f32) -> Self {
		self.over_relaxation = o;
		self
	}

	pub fn with_viscosity(mut self, viscosity: f32) -> Self {
		self.viscosity = viscosity;
		self
	}

	pub fn with_dissipation(mut self, dissipation: f32) -> Self {
		self.dissipation = dissipation;
		self
	}

	pub fn with_ambient(mut self, ambient: V2) -> Self {
		self.ambient = ambient;
		self
	}

	pub fn with_buoyancy(mut self, buoyancy: f32) -> Self {
		self.buoyancy = buoyancy;
		self
	}

	pub fn validate(&self) -> SimResult<()> {
		if self.width < 3 || self.height < 3 {
			return Err(SimError::GridTooSmall {
				width: self.width,
				height: self.height,
			});
		}
		positive("cell_size", self.cell_size as f64)?;
		positive("iterations", self.iterations as f64)?;
		in_range("over_relaxation", self.over_relaxation as f64, 0.01, 1.99)?;
		non_negative("viscosity", self.viscosity as f64)?;
		non_negative("dissipation", self.dissipation as f64)?;
		if !self.buoyancy.is_finite() {
			return Err(SimError::NotFinite { name: "buoyancy" });
		}
		if !(self.ambient[0].is_finite() && self.ambient[1].is_finite()) {
			return Err(SimError::NotFinite { name: "ambient" });
		}
		Ok(())
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GravityParams {
	pub count: usize,
	pub mass_range: (f32, f32),
	/// Radius of the disk bodies are spawned in.
	pub extent: f32,
	pub g: f32,
	pub softening: f32,
	/// Initial angular velocity of the disk about its centre.
	pub spin: f32,
	/// Fixed seed for reproducible layouts, `None` draws from the OS.
	pub seed: Option<u64>,
}

impl Default for GravityParams {
	fn default() -> Self {
		Self {
			count: 300,
			mass_range: (1.0, 5.0),
			extent: 5.0,
			g: 0.01,
			softening: 0.1,
			spin: 0.3,
			seed: Some(7),
		}
	}
}

impl GravityParams {
	pub fn with_count(mut self, count: usize) -> Self {
		self.count = count;
		self
	}

	pub fn with_mass_range(mut self, min: f32, max: f32) -> Self {
		self.mass_range = (min, max);
		self
	}

	pub fn with_extent(mut self, extent: f32) -> Self {
		self.extent = extent;
		self
	}

	pub fn with_g(mut self, g: f32) -> Self {
		self.g = g;
		self
	}

	pub fn with_softening(mut self, softening: f32) -> Self {
		self.softening = softening;
		self
	}

	pub fn with_spin(mut self, spin: f32) -> Self {
		self.spin = spin;
		self
	}

	pub fn with_seed(mut self, seed: Option<u64>) -> Self {
		self.seed = seed;
		self
	}

	pub fn validate(&self) -> SimResult<()> {
		if self.count == 0 {
			return Err(SimError::EmptyPopulation { name: "bodies" });
		}
		let (min, max) = self.mass_range;
		positive("mass_range.min", min as f64)?;
		positive("mass_range.max", max as f64)?;
		if min > max {
			return Err(SimError::InvalidRange {
				name: "mass_range",
				min: min as f64,
				max: max as f64,
			});
		}
		positive("extent", self.extent as f64)?;
		non_negative("g", self.g as f64)?;
		non_negative("softening", self.softening as f64)?;
		if !self.spin.is_finite() {
			return Err(SimError::NotFinite { name: "spin" });
		}
		Ok(())
	}
}
