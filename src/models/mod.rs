pub mod batch;
pub mod loaders;
pub mod progress;
pub mod target;

pub use batch::{Batch, BatchPlan};
pub use loaders::{load_targets, parse_targets};
pub use progress::ProgressState;
pub use target::{dedup_targets, Outcome, Target};
