pub mod download_flow;
pub mod target_ctx;

pub use download_flow::{DownloadFlow, Step};
pub use target_ctx::TargetCtx;
