//! CLI command implementations

pub mod build;
pub mod config;
pub mod key;
pub mod post;
pub mod pre;
pub mod run;

pub use build::execute as build;
pub use config::execute as config;
pub use key::execute as key;
pub use post::execute as post;
pub use pre::execute as pre;
pub use run::execute as run;
