pub mod constants;
pub mod coordinates;
pub mod progress;
pub mod settings;

pub use constants::*;
pub use coordinates::{haversine_distance, pseudo_haversine, pseudo_to_km};
pub use progress::ProgressReporter;
pub use settings::Settings;
