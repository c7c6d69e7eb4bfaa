use std::time::Instant;

use qphys::selector::{SceneConfig, SimulationSelector};
use qphys::simulation::SimulationKind;

fn main() {
	let config = SceneConfig::default();
	let rframes = 100;
	for kind in SimulationKind::ALL {
		let mut selector = match SimulationSelector::new(config.clone(), kind) {
			Ok(selector) => selector,
			Err(e) => {
				eprintln!("{}: {}", kind.name(), e);
				continue;
			}
		};
		let start = Instant::now();
		for _ in 0..rframes {
			selector.frame(0.0);
		}
		let time = rframes as f32 * selector.last_dt();
		let duration = start.elapsed().as_secs_f32();
		eprintln!("{:>8}: {:.3}%", kind.name(), duration / time * 100.0);
	}
}
