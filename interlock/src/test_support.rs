//! Test-only helpers: a scripted command runner and a temporary project root.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use crate::context::RequestContext;
use crate::core::fatigue::category_for_uptime;
use crate::core::types::{ExecutionMode, FatigueReading};
use crate::gate::Gate;
use crate::io::config::{InterlockConfig, write_config};
use crate::io::metrics::SessionMetrics;
use crate::io::paths::InterlockPaths;
use crate::io::process::{CommandOutput, CommandRequest, CommandRunner};

/// One scripted reply of [`ScriptedRunner`].
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    Output(CommandOutput),
    /// The command could not be spawned.
    SpawnError(String),
}

impl ScriptedRun {
    pub fn success(stdout: &str) -> Self {
        Self::Output(CommandOutput {
            exit_code: Some(0),
            stdout: stdout.as_bytes().to_vec(),
            ..CommandOutput::default()
        })
    }

    pub fn exit(code: i32, stderr: &str) -> Self {
        Self::Output(CommandOutput {
            exit_code: Some(code),
            stderr: stderr.as_bytes().to_vec(),
            ..CommandOutput::default()
        })
    }

    pub fn timed_out() -> Self {
        Self::Output(CommandOutput {
            timed_out: true,
            ..CommandOutput::default()
        })
    }
}

/// Runner that replays scripted results and records every request.
///
/// Once the script is exhausted, each further run succeeds with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: RefCell<VecDeque<ScriptedRun>>,
    requests: RefCell<Vec<CommandRequest>>,
}

impl ScriptedRunner {
    pub fn new(script: Vec<ScriptedRun>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CommandRequest> {
        self.requests.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|request| request.command.clone())
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
        self.requests.borrow_mut().push(request.clone());
        match self.script.borrow_mut().pop_front() {
            Some(ScriptedRun::Output(output)) => Ok(output),
            Some(ScriptedRun::SpawnError(message)) => Err(anyhow!(message)),
            None => Ok(CommandOutput {
                exit_code: Some(0),
                ..CommandOutput::default()
            }),
        }
    }
}

/// Fixed instant used by deterministic tests.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Reading with an exact fatigue level.
pub fn reading(level: u8) -> FatigueReading {
    let uptime_hours = f64::from(level.min(60)) / 5.0;
    FatigueReading {
        level,
        category: category_for_uptime(uptime_hours),
        uptime_hours,
    }
}

/// Context with default config, the given mode and an exact fatigue level.
pub fn context(mode: ExecutionMode, fatigue_level: u8) -> RequestContext {
    context_with(
        InterlockConfig {
            execution_mode: mode,
            ..InterlockConfig::default()
        },
        fatigue_level,
    )
}

/// Context with a custom config and an exact fatigue level.
pub fn context_with(config: InterlockConfig, fatigue_level: u8) -> RequestContext {
    RequestContext::from_parts(
        config,
        SessionMetrics::default(),
        reading(fatigue_level),
        fixed_now(),
    )
    .unwrap_or_else(|err| panic!("test context: {err:#}"))
}

/// Temporary project root with `.interlock/` initialized.
pub struct TestWorkspace {
    temp: TempDir,
    paths: InterlockPaths,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let paths = InterlockPaths::new(temp.path());
        fs::create_dir_all(&paths.interlock_dir)
            .with_context(|| format!("create {}", paths.interlock_dir.display()))?;
        Ok(Self { temp, paths })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn gate(&self, runner: ScriptedRunner) -> Gate<ScriptedRunner> {
        Gate::new(self.path(), runner)
    }

    pub fn write_config(&self, config: &InterlockConfig) -> Result<()> {
        write_config(&self.paths.config_path, config)
    }

    /// Write a file relative to the project root.
    pub fn write_file(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn read_file(&self, relative: &str) -> Result<String> {
        let path = self.path().join(relative);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Heartbeats every 30 minutes over the given span, ending at `now`.
    pub fn write_heartbeats(&self, now: DateTime<Utc>, hours: u32) -> Result<()> {
        let lines: String = (0..=hours * 2)
            .rev()
            .map(|steps| {
                let ts = now - chrono::Duration::minutes(30 * i64::from(steps));
                format!("{{\"timestamp\":\"{}\"}}\n", ts.to_rfc3339())
            })
            .collect();
        self.write_file(".interlock/heartbeat.jsonl", &lines)?;
        Ok(())
    }

    /// Single metrics sample one minute before `now`.
    pub fn write_stress(&self, now: DateTime<Utc>, stress: f64) -> Result<()> {
        let ts = now - chrono::Duration::minutes(1);
        let line = format!(
            "{{\"timestamp\":\"{}\",\"stress_level\":{stress}}}\n",
            ts.to_rfc3339()
        );
        self.write_file(".interlock/metrics.jsonl", &line)?;
        Ok(())
    }
}
