//! CLI command implementations

pub mod batch;
pub mod cache;
pub mod config;
pub mod resolve;

pub use batch::execute as batch;
pub use cache::execute as cache;
pub use config::execute as config;
pub use resolve::execute as resolve;
