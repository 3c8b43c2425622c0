mod engine;
mod phase;
mod settings;

pub use engine::{Tick, TimerEngine};
pub use phase::Phase;
pub use settings::Settings;
