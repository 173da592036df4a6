//! Public package registry auditing.
//!
//! Reads the private dependency manifest, looks each name up on the public
//! registry and classifies who, if anyone, published it.

pub mod auditor;
pub mod manifest;
pub mod rubygems;

pub use auditor::Auditor;
pub use manifest::Manifest;
pub use rubygems::{PackageRegistry, RubyGemsClient};
