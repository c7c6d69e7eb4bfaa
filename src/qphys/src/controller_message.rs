use crate::simulation::{Interaction, SimulationKind};

/// Input from the driver, handled between frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControllerMessage {
	TogglePause,
	FrameForward,
	Select(SimulationKind),
	Reset,
	Interact(Interaction),
}
