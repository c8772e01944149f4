pub mod chrome_agent;
pub mod ui_agent;

pub use chrome_agent::ChromeAgent;
pub use ui_agent::{Selector, UiAgent};
