pub mod download_scan;
pub mod ledger;
pub mod locator;
pub mod planner;

pub use ledger::ProgressLedger;
pub use locator::{Located, LocatorResolver, LocatorTable, Role, Strategy, StrategyKind};
