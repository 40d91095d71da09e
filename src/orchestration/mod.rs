//! Build orchestration
//!
//! Drives the action phases over the configured manifests:
//! - Repository restore before any build (`pre`)
//! - Sequential per-manifest builds with build-state caching (`main`)
//! - Repository update, signing and publishing (`main`)
//! - Repository save (`post`)

mod driver;
mod factory;
mod report;

pub use driver::Flatter;
pub use factory::{create_services, Services};
pub use report::{RunReport, TargetReport};
