use crate::V2;

/// Axis-aligned box that free particles are clamped into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Posbox {
	pub xmin: f32,
	pub xmax: f32,
	pub ymin: f32,
	pub ymax: f32,
}

impl Posbox {
	pub fn new(min: V2, max: V2) -> Self {
		Self {
			xmin: min[0],
			xmax: max[0],
			ymin: min[1],
			ymax: max[1],
		}
	}

	pub fn contains(&self, pos: V2) -> bool {
		(self.xmin..=self.xmax).contains(&pos[0])
			&& (self.ymin..=self.ymax).contains(&pos[1])
	}

	/// Clamps `pos` into the box, returns whether it was outside.
	pub fn apply(&self, pos: &mut V2) -> bool {
		if self.contains(*pos) {
			return false;
		}
		pos[0] = pos[0].clamp(self.xmin, self.xmax);
		pos[1] = pos[1].clamp(self.ymin, self.ymax);
		true
	}
}
