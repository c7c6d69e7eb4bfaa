/// Status line for the frame that was just produced.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateInfo {
	pub name: &'static str,
	pub load: f32,
	pub last_dt: f32,
	pub paused: bool,
	pub particle_len: usize,
	pub constraint_len: usize,
}
