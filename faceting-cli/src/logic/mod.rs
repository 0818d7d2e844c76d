pub mod engravings;
pub mod history;
pub mod reports;
pub mod seeds;
pub mod simulation;

pub use engravings::parse_detections;
pub use history::parse_history;
pub use seeds::resolve_seed_inputs;
pub use simulation::{run_batch, summarize};
