pub mod config;
pub mod resolver;
pub mod locator;
pub mod file_discovery;
pub mod counter;
pub mod analyzer;
pub mod reporter;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use resolver::{GoList, PackageResolver, Resolution};
pub use locator::{GoPathLocator, SourceLocator};
pub use file_discovery::FileDiscovery;
pub use counter::{Counts, DeclarationCounter};
pub use analyzer::Analyzer;
pub use reporter::Reporter;

pub type Result<T> = anyhow::Result<T>;
