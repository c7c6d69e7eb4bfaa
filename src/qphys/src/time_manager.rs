//! Turns wall-clock frame times into simulation steps.

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeModel {
	/// One step per frame whatever the frame took.
	Fixed,
	/// Real time is banked and paid out in whole steps, at most `max_steps`
	/// per frame. Time beyond the cap is dropped.
	Accumulate { max_steps: usize },
}

#[derive(Clone, Debug)]
pub struct TimeManager {
	step: f32,
	model: TimeModel,
	accumulator: f32,
}

impl Default for TimeManager {
	fn default() -> Self {
		Self {
			step: 0.0016,
			model: TimeModel::Fixed,
			accumulator: 0.0,
		}
	}
}

impl TimeManager {
	pub fn with_step(mut self, step: f32) -> Self {
		self.step = step;
		self
	}

	pub fn with_model(mut self, model: TimeModel) -> Self {
		self.model = model;
		self.accumulator = 0.0;
		self
	}

	pub fn step(&self) -> f32 {
		self.step
	}

	pub fn model(&self) -> TimeModel {
		self.model
	}

	/// Number of `step()`s to simulate for a frame that took `frame_time`
	/// seconds.
	pub fn take_steps(&mut self, frame_time: f32) -> usize {
		match self.model {
			TimeModel::Fixed => 1,
			TimeModel::Accumulate { max_steps } => {
				if self.step <= 0.0 {
					return 0;
				}
				self.accumulator += frame_time.max(0.0);
				let due = (self.accumulator / self.step).floor() as usize;
				if due > max_steps {
					self.accumulator = 0.0;
					max_steps
				} else {
					self.accumulator -= due as f32 * self.step;
					due
				}
			}
		}
	}

	/// Forgets banked time, e.g. after a pause.
	pub fn clear(&mut self) {
		self.accumulator = 0.0;
	}
}
