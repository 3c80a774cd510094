use crate::{
    config::Config,
    counter::{Counts, DeclarationCounter},
    file_discovery::FileDiscovery,
    locator::{GoPathLocator, SourceLocator},
    resolver::{GoList, PackageResolver, Resolution},
};
use anyhow::Result;
use tracing::{debug, info, warn};

/// Drives resolve → locate → enumerate → count and folds the results.
pub struct Analyzer<R, L> {
    resolver: R,
    locator: L,
    file_discovery: FileDiscovery,
    counter: DeclarationCounter,
}

impl Analyzer<GoList, GoPathLocator> {
    /// Analyzer backed by the go tool named in `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let resolver = GoList::new(config.go_tool.clone()).with_timeout(config.timeout());
        let locator = GoPathLocator::discover(config).await;
        Self::new(config, resolver, locator)
    }
}

impl<R: PackageResolver, L: SourceLocator> Analyzer<R, L> {
    pub fn new(config: &Config, resolver: R, locator: L) -> Result<Self> {
        Ok(Self {
            resolver,
            locator,
            file_discovery: FileDiscovery::new(config),
            counter: DeclarationCounter::new()?,
        })
    }

    /// Counts every package `specifiers` resolve to. Fails only when
    /// resolution reported an error and produced no packages at all.
    pub async fn run(&mut self, specifiers: &[String]) -> Result<Counts> {
        let Resolution { packages, error } = self.resolver.resolve(specifiers).await;
        if let Some(err) = error {
            if packages.is_empty() {
                return Err(err.into());
            }
            warn!("{err}");
        }
        info!(packages = packages.len(), "resolved packages");

        let mut counts = Counts::default();
        for package in &packages {
            counts += self.analyze_package(package);
        }
        Ok(counts)
    }

    /// Counts one resolved package. Location and listing failures are
    /// logged and the package contributes nothing.
    pub fn analyze_package(&mut self, package: &str) -> Counts {
        let dir = match self.locator.locate(package) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("{e}");
                return Counts::default();
            }
        };

        let files = match self.file_discovery.discover_files(&dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("{}: {e}", dir.display());
                return Counts::default();
            }
        };

        let mut counts = Counts::default();
        for file in files.iter().flatten() {
            counts += self.counter.count_file(file);
        }
        debug!(package, total = counts.total, tagged = counts.tagged, "package counted");
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::LocateError;
    use crate::resolver::ResolveError;
    use crate::test_support::write_file;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::process::ExitStatus;

    struct FixedResolver {
        packages: Vec<&'static str>,
        failed: bool,
    }

    #[async_trait]
    impl PackageResolver for FixedResolver {
        async fn resolve(&self, _specifiers: &[String]) -> Resolution {
            Resolution {
                packages: self.packages.iter().map(|p| p.to_string()).collect(),
                error: self.failed.then(|| ResolveError::Exit {
                    tool: "go".to_string(),
                    status: failed_status(),
                }),
            }
        }
    }

    #[cfg(unix)]
    fn failed_status() -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(1 << 8)
    }

    #[cfg(windows)]
    fn failed_status() -> ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(1)
    }

    struct MapLocator(HashMap<&'static str, PathBuf>);

    impl SourceLocator for MapLocator {
        fn locate(&self, package: &str) -> Result<PathBuf, LocateError> {
            self.0.get(package).cloned().ok_or_else(|| LocateError::NotFound {
                package: package.to_string(),
                searched: Vec::new(),
            })
        }
    }

    fn models_package(root: &Path) -> PathBuf {
        let dir = root.join("models");
        std::fs::create_dir_all(&dir).unwrap();
        write_file(
            &dir,
            "user.go",
            "package models\n\ntype User struct {\n\tName string `json:\"name\"`\n}\n\ntype Marker struct{}\n",
        );
        write_file(
            &dir,
            "geo.go",
            "package models\n\ntype Point struct {\n\tX, Y int\n}\n",
        );
        write_file(
            &dir,
            "_ignored.go",
            "package models\n\ntype Hidden struct {\n\tA int `a:\"\"`\n}\n",
        );
        write_file(&dir, "broken.go", "package models\n\ntype Oops struct {\n");
        dir
    }

    fn analyzer(
        resolver: FixedResolver,
        locations: HashMap<&'static str, PathBuf>,
    ) -> Analyzer<FixedResolver, MapLocator> {
        Analyzer::new(&Config::default(), resolver, MapLocator(locations)).unwrap()
    }

    #[tokio::test]
    async fn folds_counts_across_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = models_package(tmp.path());

        let mut analyzer = analyzer(
            FixedResolver {
                packages: vec!["example.com/models"],
                failed: false,
            },
            HashMap::from([("example.com/models", dir)]),
        );
        let counts = analyzer.run(&["./...".to_string()]).await.unwrap();
        assert_eq!(counts, Counts::new(2, 1));
    }

    #[tokio::test]
    async fn partial_resolution_still_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = models_package(tmp.path());

        let mut analyzer = analyzer(
            FixedResolver {
                packages: vec!["example.com/models"],
                failed: true,
            },
            HashMap::from([("example.com/models", dir)]),
        );
        let counts = analyzer.run(&[]).await.unwrap();
        assert_eq!(counts, Counts::new(2, 1));
    }

    #[tokio::test]
    async fn total_resolution_failure_is_an_error() {
        let mut analyzer = analyzer(
            FixedResolver {
                packages: Vec::new(),
                failed: true,
            },
            HashMap::new(),
        );
        assert!(analyzer.run(&[]).await.is_err());
    }

    #[tokio::test]
    async fn nothing_resolved_without_error_is_zero() {
        let mut analyzer = analyzer(
            FixedResolver {
                packages: Vec::new(),
                failed: false,
            },
            HashMap::new(),
        );
        assert_eq!(analyzer.run(&[]).await.unwrap(), Counts::default());
    }

    #[tokio::test]
    async fn unlocatable_package_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = models_package(tmp.path());

        let mut analyzer = analyzer(
            FixedResolver {
                packages: vec!["example.com/missing", "example.com/models"],
                failed: false,
            },
            HashMap::from([
                ("example.com/models", dir),
                ("example.com/gone", tmp.path().join("gone")),
            ]),
        );
        let counts = analyzer.run(&[]).await.unwrap();
        assert_eq!(counts, Counts::new(2, 1));
        assert_eq!(analyzer.analyze_package("example.com/gone"), Counts::default());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn synthetic_packages_never_reach_the_counter() {
        use crate::test_support::fake_tool;

        let tmp = tempfile::tempdir().unwrap();
        let dir = models_package(tmp.path());
        let tool = fake_tool(tmp.path(), "echo _models\necho models");

        let resolver = GoList::new(tool.to_string_lossy());
        let locator = MapLocator(HashMap::from([("_models", dir.clone()), ("models", dir)]));
        let mut analyzer = Analyzer::new(&Config::default(), resolver, locator).unwrap();
        let counts = analyzer.run(&["./...".to_string()]).await.unwrap();
        assert_eq!(counts, Counts::new(2, 1));
    }
}
