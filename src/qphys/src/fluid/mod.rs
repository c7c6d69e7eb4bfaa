//! Stable-fluids smoke on a staggered grid.
//!
//! `u` is stored on the left face of each cell and `v` on the bottom face,
//! smoke and pressure at the centre. The outermost ring of cells is solid.
//! Velocities are in world units per second, traces run in cell units.

pub mod field;
pub mod source;

use tracing::info;

use crate::error::SimResult;
use crate::params::FluidParams;
use crate::simulation::{FiniteGuard, Interaction, Simulation, SimulationKind};
use crate::V2;
use field::{sample, DoubleBuffer, Staggering};
use protocol::pr_model::{PrFrame, PrGrid};
pub use source::CellRegion;

/// Snapshot of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluidCell {
	pub velocity: V2,
	pub smoke: f32,
	pub obstacle: bool,
}

#[derive(Clone, Debug)]
pub struct FluidGrid {
	params: FluidParams,
	width: usize,
	height: usize,
	u: DoubleBuffer,
	v: DoubleBuffer,
	smoke: DoubleBuffer,
	pressure: Vec<f32>,
	// 1 for fluid, 0 for solid
	s: Vec<f32>,
	// uniform acceleration for the next step only
	impulse: V2,
	guard: FiniteGuard,
}

impl FluidGrid {
	pub fn new(params: FluidParams) -> SimResult<Self> {
		params.validate()?;
		let (width, height) = (params.width, params.height);
		let len = width * height;
		let mut s = vec![1.0; len];
		for j in 0..height {
			for i in 0..width {
				if i == 0 || j == 0 || i == width - 1 || j == height - 1 {
					s[j * width + i] = 0.0;
				}
			}
		}
		info!(width, height, cell_size = params.cell_size, "add fluid grid");
		Ok(Self {
			params,
			width,
			height,
			u: DoubleBuffer::new(len),
			v: DoubleBuffer::new(len),
			smoke: DoubleBuffer::new(len),
			pressure: vec![0.0; len],
			s,
			impulse: V2::zeros(),
			guard: FiniteGuard::default(),
		})
	}

	#[inline]
	fn idx(&self, i: usize, j: usize) -> usize {
		j * self.width + i
	}

	fn is_border(&self, i: usize, j: usize) -> bool {
		i == 0 || j == 0 || i == self.width - 1 || j == self.height - 1
	}

	pub fn params(&self) -> &FluidParams {
		&self.params
	}

	pub fn width(&self) -> usize {
		self.width
	}

	pub fn height(&self) -> usize {
		self.height
	}

	pub fn cell_size(&self) -> f32 {
		self.params.cell_size
	}

	/// Cell containing the world-space `point`, if any.
	pub fn cell_at(&self, point: V2) -> Option<(usize, usize)> {
		let local = (point - self.params.origin) / self.params.cell_size;
		if local[0] < 0.0 || local[1] < 0.0 {
			return None;
		}
		let (i, j) = (local[0] as usize, local[1] as usize);
		if i < self.width && j < self.height {
			Some((i, j))
		} else {
			None
		}
	}

	pub fn is_obstacle(&self, i: usize, j: usize) -> bool {
		self.s[self.idx(i, j)] == 0.0
	}

	/// Face velocities of `(i, j)` averaged to the centre.
	pub fn velocity(&self, i: usize, j: usize) -> V2 {
		let (u, v) = (self.u.front(), self.v.front());
		let i1 = (i + 1).min(self.width - 1);
		let j1 = (j + 1).min(self.height - 1);
		V2::new(
			0.5 * (u[self.idx(i, j)] + u[self.idx(i1, j)]),
			0.5 * (v[self.idx(i, j)] + v[self.idx(i, j1)]),
		)
	}

	pub fn smoke(&self, i: usize, j: usize) -> f32 {
		self.smoke.front()[self.idx(i, j)]
	}

	/// Pressure found by the last projection.
	pub fn pressure(&self, i: usize, j: usize) -> f32 {
		self.pressure[self.idx(i, j)]
	}

	pub fn cell(&self, i: usize, j: usize) -> FluidCell {
		FluidCell {
			velocity: self.velocity(i, j),
			smoke: self.smoke(i, j),
			obstacle: self.is_obstacle(i, j),
		}
	}

	/// Net outflow rate of a non-border cell.
	pub fn divergence(&self, i: usize, j: usize) -> f32 {
		let (u, v) = (self.u.front(), self.v.front());
		let id = self.idx(i, j);
		(u[id + 1] - u[id] + v[id + self.width] - v[id]) / self.params.cell_size
	}

	/// Largest absolute divergence over the fluid cells.
	pub fn max_divergence(&self) -> f32 {
		let mut max = 0f32;
		for j in 1..self.height - 1 {
			for i in 1..self.width - 1 {
				if !self.is_obstacle(i, j) {
					max = max.max(self.divergence(i, j).abs());
				}
			}
		}
		max
	}

	pub fn total_smoke(&self) -> f32 {
		self.smoke.front().iter().sum()
	}

	/// Row-major smoke densities, `x` fastest.
	pub fn smoke_field(&self) -> &[f32] {
		self.smoke.front()
	}

	/// Border cells are always solid and ignore this.
	pub fn set_obstacle(&mut self, i: usize, j: usize, solid: bool) {
		if self.is_border(i, j) {
			return;
		}
		let id = self.idx(i, j);
		if !solid {
			self.s[id] = 1.0;
			return;
		}
		let w = self.width;
		self.s[id] = 0.0;
		let u = self.u.front_mut();
		u[id] = 0.0;
		u[id + 1] = 0.0;
		let v = self.v.front_mut();
		v[id] = 0.0;
		v[id + w] = 0.0;
		self.smoke.front_mut()[id] = 0.0;
		self.pressure[id] = 0.0;
	}

	/// Makes every cell whose centre lies within `radius` of `centre` solid.
	pub fn add_circle_obstacle(&mut self, centre: V2, radius: f32) {
		let h = self.params.cell_size;
		for j in 1..self.height - 1 {
			for i in 1..self.width - 1 {
				let c = self.params.origin
					+ V2::new((i as f32 + 0.5) * h, (j as f32 + 0.5) * h);
				if (c - centre).magnitude() <= radius {
					self.set_obstacle(i, j, true);
				}
			}
		}
	}

	pub fn clear_obstacles(&mut self) {
		for j in 1..self.height - 1 {
			for i in 1..self.width - 1 {
				self.set_obstacle(i, j, false);
			}
		}
	}

	/// Adds `rate` to the smoke of every fluid cell in `region`.
	///
	/// Meant to be called once per frame for a continuous emitter.
	pub fn add_smoke_source(&mut self, region: CellRegion, rate: f32) {
		for (i, j) in region.cells(self.width, self.height) {
			let id = self.idx(i, j);
			if self.s[id] != 0.0 {
				self.smoke.front_mut()[id] += rate;
			}
		}
	}

	/// Sets the faces of the region's fluid cells to `direction` scaled to
	/// `magnitude`. Faces shared with a solid cell stay at rest.
	pub fn add_velocity_source(
		&mut self,
		region: CellRegion,
		direction: V2,
		magnitude: f32,
	) {
		let vel = match direction.try_normalize(f32::EPSILON) {
			Some(d) => d * magnitude,
			None => return,
		};
		let w = self.width;
		let s = &self.s;
		let u = self.u.front_mut();
		let v = self.v.front_mut();
		for (i, j) in region.cells(self.width, self.height) {
			let id = j * w + i;
			if s[id] == 0.0 {
				continue;
			}
			if s[id - 1] != 0.0 {
				u[id] = vel[0];
			}
			if s[id + 1] != 0.0 {
				u[id + 1] = vel[0];
			}
			if s[id - w] != 0.0 {
				v[id] = vel[1];
			}
			if s[id + w] != 0.0 {
				v[id + w] = vel[1];
			}
		}
	}

	/// Uniform acceleration applied during the next step only.
	pub fn apply_force(&mut self, accel: V2) {
		self.impulse += accel;
	}

	/// Integrates one step of `dt` seconds. `dt == 0` leaves the grid alone.
	pub fn advance(&mut self, dt: f32) {
		if dt <= 0.0 {
			return;
		}
		self.apply_forces(dt);
		self.diffuse_velocity(dt);
		self.project(dt);
		self.advect_velocity(dt);
		self.project(dt);
		self.advect_smoke(dt);
		let finite = self.u.front().iter().all(|x| x.is_finite())
			&& self.v.front().iter().all(|x| x.is_finite())
			&& self.total_smoke().is_finite();
		self.guard.check("fluid", finite);
	}

	fn apply_forces(&mut self, dt: f32) {
		let accel = self.params.ambient + self.impulse;
		self.impulse = V2::zeros();
		let buoyancy = self.params.buoyancy;
		let w = self.width;
		let s = &self.s;
		let smoke = self.smoke.front();
		let u = self.u.front_mut();
		let v = self.v.front_mut();
		for j in 1..self.height - 1 {
			for i in 1..w - 1 {
				let id = j * w + i;
				if s[id] == 0.0 {
					continue;
				}
				if s[id - 1] != 0.0 {
					u[id] += accel[0] * dt;
				}
				if s[id - w] != 0.0 {
					let rise = buoyancy * 0.5 * (smoke[id] + smoke[id - w]);
					v[id] += (accel[1] + rise) * dt;
				}
			}
		}
	}

	fn diffuse_velocity(&mut self, dt: f32) {
		if self.params.viscosity == 0.0 {
			return;
		}
		let h = self.params.cell_size;
		let a = self.params.viscosity * dt / (h * h);
		let n = self.params.diffuse_iterations;
		let (w, ht) = (self.width, self.height);
		diffuse(&mut self.u, &self.s, w, ht, 1, a, n);
		diffuse(&mut self.v, &self.s, w, ht, w, a, n);
	}

	/// Gauss-Seidel with over-relaxation on the face velocities. Faces next to
	/// a solid cell never change, which makes obstacles no-slip walls.
	fn project(&mut self, dt: f32) {
		let w = self.width;
		let o = self.params.over_relaxation;
		let cp = self.params.cell_size / dt;
		let s = &self.s;
		let u = self.u.front_mut();
		let v = self.v.front_mut();
		let p = &mut self.pressure;
		p.fill(0.0);
		for _ in 0..self.params.iterations {
			for j in 1..self.height - 1 {
				for i in 1..w - 1 {
					let id = j * w + i;
					if s[id] == 0.0 {
						continue;
					}
					let (sx0, sx1) = (s[id - 1], s[id + 1]);
					let (sy0, sy1) = (s[id - w], s[id + w]);
					let sum = sx0 + sx1 + sy0 + sy1;
					if sum == 0.0 {
						continue;
					}
					let div = u[id + 1] - u[id] + v[id + w] - v[id];
					let dp = -div / sum * o;
					u[id] -= sx0 * dp;
					u[id + 1] += sx1 * dp;
					v[id] -= sy0 * dp;
					v[id + w] += sy1 * dp;
					p[id] += cp * dp;
				}
			}
		}
	}

	fn advect_velocity(&mut self, dt: f32) {
		let (w, h) = (self.width, self.height);
		let scale = dt / self.params.cell_size;
		let s = &self.s;
		self.u.sync();
		self.v.sync();
		let (u, u_next) = self.u.split();
		let (v, v_next) = self.v.split();
		for j in 1..h - 1 {
			for i in 1..w - 1 {
				let id = j * w + i;
				if s[id] == 0.0 {
					continue;
				}
				if s[id - 1] != 0.0 {
					let vu = u[id];
					let vv = 0.25 * (v[id - 1] + v[id] + v[id - 1 + w] + v[id + w]);
					let (x, y) = (i as f32, j as f32 + 0.5);
					u_next[id] =
						sample(u, w, h, x - vu * scale, y - vv * scale, Staggering::U);
				}
				if s[id - w] != 0.0 {
					let vu = 0.25 * (u[id - w] + u[id] + u[id + 1 - w] + u[id + 1]);
					let vv = v[id];
					let (x, y) = (i as f32 + 0.5, j as f32);
					v_next[id] =
						sample(v, w, h, x - vu * scale, y - vv * scale, Staggering::V);
				}
			}
		}
		self.u.swap();
		self.v.swap();
	}

	/// Moves smoke along the projected velocity. Backtraced sampling does not
	/// conserve the total, so a grown field is scaled back to the old total.
	fn advect_smoke(&mut self, dt: f32) {
		let (w, h) = (self.width, self.height);
		let scale = dt / self.params.cell_size;
		let keep = (1.0 - self.params.dissipation * dt).max(0.0);
		let before = self.total_smoke();
		let s = &self.s;
		let (u, v) = (self.u.front(), self.v.front());
		self.smoke.sync();
		let (smoke, next) = self.smoke.split();
		for j in 1..h - 1 {
			for i in 1..w - 1 {
				let id = j * w + i;
				if s[id] == 0.0 {
					continue;
				}
				let vu = 0.5 * (u[id] + u[id + 1]);
				let vv = 0.5 * (v[id] + v[id + w]);
				let x = i as f32 + 0.5 - vu * scale;
				let y = j as f32 + 0.5 - vv * scale;
				next[id] = keep * sample(smoke, w, h, x, y, Staggering::Centre);
			}
		}
		self.smoke.swap();
		let after = self.total_smoke();
		if after > before && after > 0.0 {
			let k = before / after;
			self.smoke.front_mut().iter_mut().for_each(|x| *x *= k);
		}
	}

	pub fn pr_grid(&self) -> PrGrid {
		let mut velocity = Vec::with_capacity(self.width * self.height);
		for j in 0..self.height {
			for i in 0..self.width {
				let vel = self.velocity(i, j);
				velocity.push([vel[0], vel[1]]);
			}
		}
		PrGrid {
			width: self.width,
			height: self.height,
			cell_size: self.params.cell_size,
			origin: [self.params.origin[0], self.params.origin[1]],
			smoke: self.smoke.front().to_vec(),
			velocity,
			obstacle: self.s.iter().map(|&s| s == 0.0).collect(),
		}
	}
}

/// Jacobi sweeps of implicit diffusion over the faces between two fluid
/// cells. `across` is the index step to the cell on the face's other side.
fn diffuse(
	buf: &mut DoubleBuffer,
	s: &[f32],
	w: usize,
	h: usize,
	across: usize,
	a: f32,
	iterations: usize,
) {
	let x0 = buf.front().to_vec();
	for _ in 0..iterations {
		buf.sync();
		let (x, next) = buf.split();
		for j in 1..h - 1 {
			for i in 1..w - 1 {
				let id = j * w + i;
				if s[id] == 0.0 || s[id - across] == 0.0 {
					continue;
				}
				let around = x[id - 1] + x[id + 1] + x[id - w] + x[id + w];
				next[id] = (x0[id] + a * around) / (1.0 + 4.0 * a);
			}
		}
		buf.swap();
	}
}

impl Simulation for FluidGrid {
	fn kind(&self) -> SimulationKind {
		SimulationKind::Fluid
	}

	fn advance(&mut self, dt: f32) {
		FluidGrid::advance(self, dt)
	}

	fn interact(&mut self, interaction: &Interaction) {
		match *interaction {
			Interaction::Source {
				point,
				velocity,
				smoke,
			} => {
				if let Some((i, j)) = self.cell_at(point) {
					let region = CellRegion::around(i, j, 1);
					self.add_smoke_source(region, smoke);
					self.add_velocity_source(region, velocity, velocity.magnitude());
				}
			}
			Interaction::Force(f) => self.apply_force(f),
			_ => {}
		}
	}

	fn render(&self) -> PrFrame {
		PrFrame::Grid(self.pr_grid())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::error::SimError;

	fn unit_grid(width: usize, height: usize) -> FluidParams {
		FluidParams::default()
			.with_size(width, height)
			.with_cell_size(1.0)
			.with_origin(V2::zeros())
			.with_buoyancy(0.0)
	}

	#[test]
	fn test_rejects_small_grid() {
		let err = FluidGrid::new(FluidParams::default().with_size(2, 8)).unwrap_err();
		assert_eq!(err, SimError::GridTooSmall { width: 2, height: 8 });
		assert!(FluidGrid::new(FluidParams::default().with_cell_size(0.0)).is_err());
	}

	#[test]
	fn test_border_is_solid() {
		let mut grid = FluidGrid::new(unit_grid(5, 4)).unwrap();
		for i in 0..5 {
			assert!(grid.is_obstacle(i, 0));
			assert!(grid.is_obstacle(i, 3));
		}
		assert!(grid.is_obstacle(0, 2) && grid.is_obstacle(4, 2));
		assert!(!grid.is_obstacle(2, 2));
		grid.clear_obstacles();
		assert!(grid.is_obstacle(0, 0));
	}

	#[test]
	fn test_projection_divergence_free() {
		let mut grid = FluidGrid::new(unit_grid(20, 20).with_iterations(200)).unwrap();
		grid.add_circle_obstacle(V2::new(12.0, 10.0), 2.5);
		grid.add_velocity_source(CellRegion::new(4, 4, 4, 4), V2::new(1.0, 0.5), 2.0);
		assert!(grid.max_divergence() > 0.1);
		grid.advance(0.05);
		assert!(grid.max_divergence() < 1e-3, "{}", grid.max_divergence());
		assert!(grid.velocity(5, 5).magnitude() > 0.1);
	}

	#[test]
	fn test_smoke_never_increases() {
		let mut grid =
			FluidGrid::new(unit_grid(24, 24).with_buoyancy(1.0)).unwrap();
		grid.add_circle_obstacle(V2::new(12.0, 16.0), 3.0);
		let region = CellRegion::new(8, 3, 4, 4);
		grid.add_smoke_source(region, 1.0);
		grid.add_velocity_source(region, V2::new(0.3, 1.0), 3.0);
		for _ in 0..50 {
			let before = grid.total_smoke();
			grid.advance(0.1);
			let after = grid.total_smoke();
			assert!(after <= before * (1.0 + 1e-5), "{} > {}", after, before);
		}
		assert!(grid.total_smoke() > 0.0);
	}

	#[test]
	fn test_dissipation_loses_smoke() {
		let mut grid =
			FluidGrid::new(unit_grid(8, 8).with_dissipation(0.5)).unwrap();
		grid.add_smoke_source(CellRegion::cell(3, 3), 1.0);
		grid.advance(0.1);
		assert!((grid.total_smoke() - 0.95).abs() < 1e-6);
	}

	#[test]
	fn test_obstacle_stays_still_and_clean() {
		let mut grid = FluidGrid::new(unit_grid(16, 16).with_buoyancy(2.0)).unwrap();
		grid.set_obstacle(8, 8, true);
		grid.add_smoke_source(CellRegion::cell(8, 8), 5.0);
		assert_eq!(grid.total_smoke(), 0.0);
		for _ in 0..20 {
			let region = CellRegion::new(6, 4, 5, 2);
			grid.add_smoke_source(region, 1.0);
			grid.add_velocity_source(region, V2::new(0.0, 1.0), 4.0);
			grid.advance(0.05);
		}
		assert_eq!(grid.cell(8, 8).velocity, V2::zeros());
		assert_eq!(grid.smoke(8, 8), 0.0);
		assert!(grid.smoke(8, 7) > 0.0 || grid.smoke(7, 8) > 0.0);
	}

	#[test]
	fn test_viscosity_smooths() {
		let mut grid =
			FluidGrid::new(unit_grid(12, 12).with_viscosity(1.0)).unwrap();
		grid.add_velocity_source(CellRegion::cell(5, 5), V2::new(1.0, 0.0), 1.0);
		let peak = grid.u.front()[grid.idx(5, 5)];
		grid.diffuse_velocity(0.1);
		let id = grid.idx(5, 5);
		assert!(grid.u.front()[id] < peak);
		assert!(grid.u.front()[id + grid.width] > 0.0);
	}

	#[test]
	fn test_cell_at() {
		let grid = FluidGrid::new(FluidParams::default()).unwrap();
		assert_eq!(grid.cell_at(V2::new(0.05, 0.05)), Some((50, 30)));
		assert_eq!(grid.cell_at(V2::new(-5.5, 0.0)), None);
		assert_eq!(grid.cell_at(V2::new(5.5, 0.0)), None);
	}

	#[test]
	fn test_zero_dt_noop() {
		let mut grid = FluidGrid::new(unit_grid(10, 10).with_buoyancy(1.0)).unwrap();
		grid.add_smoke_source(CellRegion::cell(4, 4), 1.0);
		let before = grid.pr_grid();
		grid.advance(0.0);
		assert_eq!(grid.pr_grid(), before);
	}

	#[test]
	fn test_source_interaction() {
		let mut grid = FluidGrid::new(unit_grid(10, 10)).unwrap();
		grid.interact(&Interaction::Source {
			point: V2::new(4.5, 4.5),
			velocity: V2::new(0.0, 2.0),
			smoke: 1.0,
		});
		assert_eq!(grid.total_smoke(), 9.0);
		assert_eq!(grid.velocity(4, 4), V2::new(0.0, 2.0));
		// outside the grid
		grid.interact(&Interaction::Source {
			point: V2::new(-1.0, 4.5),
			velocity: V2::zeros(),
			smoke: 1.0,
		});
		assert_eq!(grid.total_smoke(), 9.0);
		grid.interact(&Interaction::Release);
	}

	#[test]
	fn test_render_shape() {
		let grid = FluidGrid::new(unit_grid(6, 5)).unwrap();
		match grid.render() {
			PrFrame::Grid(g) => {
				assert_eq!((g.width, g.height), (6, 5));
				assert_eq!(g.smoke.len(), 30);
				assert_eq!(g.velocity.len(), 30);
				assert_eq!(g.obstacle.iter().filter(|&&o| o).count(), 18);
			}
			PrFrame::Model(_) => panic!("fluid renders a grid"),
		}
	}
}
