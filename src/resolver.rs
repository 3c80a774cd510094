use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("could not exec {tool} list: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read stdout from {tool} list: {source}")]
    Read {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} list failed: {status}")]
    Exit { tool: String, status: ExitStatus },
    #[error("{tool} list did not finish within {limit:?}")]
    Timeout { tool: String, limit: Duration },
}

/// Outcome of one resolution run. `packages` may be non-empty even when
/// `error` is set; the error only becomes fatal when nothing resolved.
#[derive(Debug, Default)]
pub struct Resolution {
    pub packages: Vec<String>,
    pub error: Option<ResolveError>,
}

impl Resolution {
    pub fn is_total_failure(&self) -> bool {
        self.packages.is_empty() && self.error.is_some()
    }
}

#[async_trait]
pub trait PackageResolver {
    async fn resolve(&self, specifiers: &[String]) -> Resolution;
}

/// Resolves specifiers with `<tool> list -e -- <specifiers...>`.
#[derive(Debug, Clone)]
pub struct GoList {
    tool: String,
    timeout: Option<Duration>,
}

impl GoList {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn collect(
        &self,
        child: &mut Child,
        stdout: ChildStdout,
        packages: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        let mut lines = BufReader::new(stdout).split(b'\n');
        loop {
            match lines.next_segment().await {
                Ok(Some(bytes)) => {
                    let line = String::from_utf8_lossy(&bytes);
                    if let Some(package) = accept_line(&line) {
                        packages.push(package.to_string());
                    }
                }
                Ok(None) => break,
                Err(source) => {
                    let _ = child.wait().await;
                    return Err(ResolveError::Read {
                        tool: self.tool.clone(),
                        source,
                    });
                }
            }
        }

        let status = child.wait().await.map_err(|source| ResolveError::Spawn {
            tool: self.tool.clone(),
            source,
        })?;
        if !status.success() {
            return Err(ResolveError::Exit {
                tool: self.tool.clone(),
                status,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PackageResolver for GoList {
    async fn resolve(&self, specifiers: &[String]) -> Resolution {
        debug!(tool = %self.tool, ?specifiers, "listing packages");

        let mut child = match Command::new(&self.tool)
            .args(["list", "-e", "--"])
            .args(specifiers)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                return Resolution {
                    packages: Vec::new(),
                    error: Some(ResolveError::Spawn {
                        tool: self.tool.clone(),
                        source,
                    }),
                }
            }
        };

        let mut packages = Vec::new();
        let Some(stdout) = child.stdout.take() else {
            return Resolution {
                packages,
                error: Some(ResolveError::Read {
                    tool: self.tool.clone(),
                    source: std::io::Error::other("stdout was not captured"),
                }),
            };
        };

        let outcome = match self.timeout {
            Some(limit) => {
                let collected =
                    tokio::time::timeout(limit, self.collect(&mut child, stdout, &mut packages))
                        .await;
                match collected {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        Err(ResolveError::Timeout {
                            tool: self.tool.clone(),
                            limit,
                        })
                    }
                }
            }
            None => self.collect(&mut child, stdout, &mut packages).await,
        };

        debug!(resolved = packages.len(), "package listing finished");
        Resolution {
            packages,
            error: outcome.err(),
        }
    }
}

/// Drops blank lines and `_`-prefixed identifiers, which mark synthetic
/// packages outside any GOPATH or module.
fn accept_line(line: &str) -> Option<&str> {
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return None;
    }
    if line.starts_with('_') {
        debug!(package = line, "skipping synthetic package");
        return None;
    }
    Some(line)
}
