//! External route query through `artisan route:list --json`
//!
//! Route names can be registered programmatically, so the authoritative list
//! comes from asking the application itself. The query runs as a child
//! process in the project root, optionally wrapped by a command prefix for
//! containerised setups (`docker compose exec app`, `./vendor/bin/sail`).
//!
//! This is the only operation in the crate that can hang, so every run has a
//! deadline; a child still running at the deadline is killed.
//!
//! ```text
//! CommandRequest ──► CommandRunner::run ──► CommandOutput (stdout JSON)
//!                         │                        │
//!                         └─ timeout ─► Err        └─ parse ─► Vec<RouteRecord>
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Project;
use crate::error::{NavigatorError, Result};
use crate::symbols::{Category, SymbolEntry};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A command to run with a deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl CommandRequest {
    /// Build a request, splitting the first prefix element off as the program
    pub fn with_prefix(prefix: &[String], command: &[&str], cwd: PathBuf, timeout: Duration) -> Option<Self> {
        let mut parts = prefix.iter().cloned().chain(command.iter().map(|s| s.to_string()));
        let program = parts.next()?;
        Some(Self { program, args: parts.collect(), cwd, timeout })
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external commands on behalf of extractors
pub trait CommandRunner: Send + Sync {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput>;
}

/// Runs commands as child processes, killing them at the deadline
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

/// Read a pipe to the end on a helper thread so the child never blocks on a
/// full pipe buffer while we poll for its exit
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

impl CommandRunner for ProcessRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
        debug!("Running {} {:?} in {:?}", request.program, request.args, request.cwd);

        let mut child = Command::new(&request.program)
            .args(&request.args)
            .current_dir(&request.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| NavigatorError::ExternalQueryFailed {
                reason: format!("failed to spawn {}: {}", request.program, e),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let deadline = Instant::now() + request.timeout;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    // The drain threads are left to finish once the pipes close
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(NavigatorError::ExternalQueryTimeout { timeout: request.timeout });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(NavigatorError::ExternalQueryFailed {
                        reason: format!("failed to wait for {}: {}", request.program, e),
                    });
                }
            }
        };

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout.join().unwrap_or_default()).into_owned(),
            stderr: String::from_utf8_lossy(&stderr.join().unwrap_or_default()).into_owned(),
        })
    }
}

/// One row of `route:list --json`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouteRecord {
    pub domain: Option<String>,
    pub method: String,
    pub uri: String,
    pub name: Option<String>,
    pub action: String,
    pub middleware: serde_json::Value,
}

impl RouteRecord {
    /// Handler class and method, see [`split_action`]
    pub fn handler(&self) -> Option<(&str, &str)> {
        split_action(&self.action)
    }
}

/// Split a route action into handler class and method
///
/// `Class@method` gives both halves, a bare class is an invokable controller
/// (`__invoke`), and closures have no handler.
pub fn split_action(action: &str) -> Option<(&str, &str)> {
    let action = action.trim();
    if action.is_empty() || action == "Closure" {
        return None;
    }
    match action.split_once('@') {
        Some((class, method)) if !class.is_empty() && !method.is_empty() => Some((class, method)),
        Some(_) => None,
        None => Some((action, "__invoke")),
    }
}

/// Parse `route:list --json` output
///
/// Anything printed before the JSON array (deprecation notices and the like)
/// is skipped.
pub fn parse_route_list(stdout: &str) -> Result<Vec<RouteRecord>> {
    let start = stdout.find('[').ok_or_else(|| NavigatorError::ExternalQueryFailed {
        reason: "route:list printed no JSON array".to_string(),
    })?;
    serde_json::from_str(stdout[start..].trim_end()).map_err(|e| NavigatorError::ExternalQueryFailed {
        reason: format!("unparsable route:list output: {}", e),
    })
}

/// Fetches named routes from the application through a [`CommandRunner`]
#[derive(Clone)]
pub struct ArtisanRouteQuery {
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for ArtisanRouteQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtisanRouteQuery").finish_non_exhaustive()
    }
}

impl ArtisanRouteQuery {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn request(project: &Project) -> Option<CommandRequest> {
        let artisan = &project.config().artisan;
        let mut prefix = artisan.command_prefix.clone();
        prefix.push(artisan.php.clone());
        CommandRequest::with_prefix(
            &prefix,
            &["artisan", "route:list", "--json"],
            project.root().to_path_buf(),
            artisan.timeout(),
        )
    }

    pub fn fetch(&self, project: &Project) -> Result<Vec<RouteRecord>> {
        let request = Self::request(project).ok_or_else(|| NavigatorError::ExternalQueryFailed {
            reason: "no artisan command configured".to_string(),
        })?;

        let started = Instant::now();
        let output = self.runner.run(&request)?;
        if !output.success {
            return Err(NavigatorError::ExternalQueryFailed {
                reason: format!(
                    "route:list exited with {}: {}",
                    output.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                    output.stderr.trim()
                ),
            });
        }

        let records = parse_route_list(&output.stdout)?;
        info!("route:list returned {} routes in {:?}", records.len(), started.elapsed());
        Ok(records)
    }

    /// Named routes as symbol entries; unnamed routes are skipped
    pub fn entries(&self, project: &Project) -> Result<Vec<SymbolEntry>> {
        let artisan_path = project.path("artisan");
        Ok(self
            .fetch(project)?
            .into_iter()
            .filter_map(|record| {
                let name = record.name.clone().filter(|n| !n.is_empty())?;
                let source = record
                    .handler()
                    .and_then(|(class, _)| project.class_path(class))
                    .unwrap_or_else(|| artisan_path.clone());
                Some(
                    SymbolEntry::new(name, Category::Route, source)
                        .with_extra("method", record.method)
                        .with_extra("uri", record.uri)
                        .with_extra("action", record.action)
                        .with_extra("source", "artisan"),
                )
            })
            .collect())
    }
}
