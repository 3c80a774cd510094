use crate::config::{home_dir, Config};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("cannot find package {package:?} in any of:{}", list_paths(.searched))]
    NotFound {
        package: String,
        searched: Vec<PathBuf>,
    },
    #[error("invalid package identifier {0:?}")]
    Invalid(String),
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("\n\t{}", p.display()))
        .collect()
}

pub trait SourceLocator {
    /// Directory holding the files of `package`.
    fn locate(&self, package: &str) -> Result<PathBuf, LocateError>;
}

/// The module enclosing the working directory, from its `go.mod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRoot {
    pub path: String,
    pub dir: PathBuf,
}

impl ModuleRoot {
    /// Walks up from `start` to the nearest `go.mod` declaring a module.
    pub fn find(start: &Path) -> Option<Self> {
        let module_re = Regex::new(r#"(?m)^\s*module\s+"?([^"\s]+)"?"#).ok()?;
        for dir in start.ancestors() {
            let go_mod = dir.join("go.mod");
            let Ok(content) = std::fs::read_to_string(&go_mod) else {
                continue;
            };
            let Some(path) = module_re.captures(&content).and_then(|c| c.get(1)) else {
                debug!(file = %go_mod.display(), "go.mod without module line");
                continue;
            };
            return Some(Self {
                path: path.as_str().to_string(),
                dir: dir.to_path_buf(),
            });
        }
        None
    }
}

/// Searches GOROOT, then each GOPATH entry, then the current module, the
/// same order the go toolchain uses for import paths.
#[derive(Debug, Clone, Default)]
pub struct GoPathLocator {
    goroot: Option<PathBuf>,
    gopath: Vec<PathBuf>,
    module: Option<ModuleRoot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct GoEnv {
    goroot: Option<String>,
    gopath: Option<String>,
}

impl GoPathLocator {
    pub fn new(goroot: Option<PathBuf>, gopath: Vec<PathBuf>, module: Option<ModuleRoot>) -> Self {
        Self {
            goroot,
            gopath,
            module,
        }
    }

    /// Builds the search roots from config, then the environment, then
    /// `<tool> env -json`.
    pub async fn discover(config: &Config) -> Self {
        let mut goroot = config
            .goroot
            .clone()
            .or_else(|| non_empty_var("GOROOT").map(PathBuf::from));
        let mut gopath = if config.gopath.is_empty() {
            non_empty_var("GOPATH")
                .map(|value| env::split_paths(&value).collect())
                .unwrap_or_default()
        } else {
            config.gopath.clone()
        };

        if goroot.is_none() || gopath.is_empty() {
            let go_env = query_go_env(&config.go_tool).await;
            if goroot.is_none() {
                goroot = go_env.goroot.filter(|v| !v.is_empty()).map(PathBuf::from);
            }
            if gopath.is_empty() {
                if let Some(value) = go_env.gopath.filter(|v| !v.is_empty()) {
                    gopath = env::split_paths(&value).collect();
                }
            }
        }
        if gopath.is_empty() {
            gopath.extend(home_dir().map(|home| home.join("go")));
        }

        let module = env::current_dir()
            .ok()
            .and_then(|cwd| ModuleRoot::find(&cwd));

        debug!(?goroot, ?gopath, ?module, "source roots");
        Self::new(goroot, gopath, module)
    }

    fn candidates(&self, package: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(goroot) = &self.goroot {
            candidates.push(goroot.join("src").join(package));
        }
        for root in &self.gopath {
            candidates.push(root.join("src").join(package));
        }
        if let Some(module) = &self.module {
            if package == module.path {
                candidates.push(module.dir.clone());
            } else if let Some(rest) = package
                .strip_prefix(module.path.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                candidates.push(module.dir.join(rest));
            }
            candidates.push(module.dir.join("vendor").join(package));
        }
        candidates
    }
}

impl SourceLocator for GoPathLocator {
    fn locate(&self, package: &str) -> Result<PathBuf, LocateError> {
        if package.trim().is_empty() {
            return Err(LocateError::Invalid(package.to_string()));
        }

        if is_local(package) {
            let dir = PathBuf::from(package);
            return if dir.is_dir() {
                Ok(dir)
            } else {
                Err(LocateError::NotFound {
                    package: package.to_string(),
                    searched: vec![dir],
                })
            };
        }

        let mut searched = Vec::new();
        for candidate in self.candidates(package) {
            if candidate.is_dir() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }
        Err(LocateError::NotFound {
            package: package.to_string(),
            searched,
        })
    }
}

fn is_local(package: &str) -> bool {
    Path::new(package).is_absolute()
        || package == "."
        || package == ".."
        || package.starts_with("./")
        || package.starts_with("../")
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

async fn query_go_env(tool: &str) -> GoEnv {
    let output = Command::new(tool)
        .args(["env", "-json", "GOROOT", "GOPATH"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await;
    match output {
        Ok(output) if output.status.success() => serde_json::from_slice(&output.stdout)
            .unwrap_or_else(|e| {
                debug!(error = %e, "unreadable go env output");
                GoEnv::default()
            }),
        Ok(output) => {
            debug!(status = %output.status, "go env failed");
            GoEnv::default()
        }
        Err(e) => {
            debug!(error = %e, "could not exec go env");
            GoEnv::default()
        }
    }
}
