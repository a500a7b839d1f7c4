//! The interlock gate: the four operations exposed to callers.
//!
//! Each operation takes a [`RequestContext`] built for that request, runs the
//! pure guard chain from [`crate::core::decision`], and then maps the verdict
//! and execution mode onto side effects:
//!
//! | verdict  | simulate           | live                          |
//! |----------|--------------------|-------------------------------|
//! | override | `SIMULATED_OVERRIDE` | `EXECUTED_OVERRIDE` / `WRITTEN_OVERRIDE` / `FAILED` |
//! | block    | `BLOCKED` / `BLOCKED_AND_SAVED_FOR_REVIEW` | same |
//! | warn     | `SIMULATED` + warning | `EXECUTED` / `ALLOWED_WITH_WARNING` / `FAILED` |
//! | allow    | `SIMULATED`        | `EXECUTED` / `ALLOWED` / `FAILED` |
//!
//! Blocks and overrides are written to the audit trail. Audit, snapshot and
//! webhook failures are logged and never change the outcome's verdict.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::context::{RequestContext, StateReport};
use crate::core::decision::{
    CommandVerdict, WriteSignals, WriteVerdict, decide_command, decide_write, has_override,
    override_instruction,
};
use crate::core::impact::analyze_impact;
use crate::core::types::{ImpactReport, Status};
use crate::io::audit::AuditSink;
use crate::io::files::{read_existing, write_with_parents};
use crate::io::notify::{OverrideEvent, notify_override};
use crate::io::paths::InterlockPaths;
use crate::io::process::{CommandRequest, CommandRunner};
use crate::outcome::{ExecutionReport, Outcome};

pub struct Gate<R: CommandRunner> {
    paths: InterlockPaths,
    runner: R,
}

impl<R: CommandRunner> Gate<R> {
    pub fn new(root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            paths: InterlockPaths::new(root),
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Fresh context for one request, read at the current time.
    pub fn load_context(&self) -> Result<RequestContext> {
        RequestContext::load(&self.paths, Utc::now())
    }

    /// Audit sink configured for this request.
    pub fn audit_sink(&self, ctx: &RequestContext) -> AuditSink {
        AuditSink::new(
            self.paths.resolve(&ctx.config.audit.log_path),
            self.paths.resolve(&ctx.config.audit.review_dir),
        )
    }

    /// Current behavioral and fatigue state.
    pub fn state(&self, ctx: &RequestContext) -> StateReport {
        StateReport::from_context(ctx)
    }

    /// Predict how `command` would be treated. No side effects.
    #[instrument(skip_all, fields(fatigue = ctx.fatigue.level))]
    pub fn check_command(&self, ctx: &RequestContext, command: &str) -> Outcome {
        let matched = ctx.classifier.matched_pattern(command);
        let verdict = decide_command(
            matched.is_some(),
            ctx.fatigue.level,
            ctx.config.fatigue_threshold,
            false,
        );
        let base = |status: Status, message: String| {
            Outcome::new(status, message, ctx.fatigue, ctx.config.execution_mode)
                .with_command(command, matched)
        };
        match verdict {
            CommandVerdict::Block | CommandVerdict::Override => base(
                Status::Blocked,
                blocked_command_message(ctx, command, matched),
            )
            .with_override_instruction(override_instruction()),
            CommandVerdict::Warn => base(
                Status::AllowedWithWarning,
                format!("`{command}` would be allowed with a warning."),
            )
            .with_warning(Some(command_warning(ctx, matched))),
            CommandVerdict::Allow => base(
                Status::Allowed,
                format!("`{command}` does not match any dangerous pattern."),
            ),
        }
    }

    /// Run `command` under the interlock.
    #[instrument(skip_all, fields(fatigue = ctx.fatigue.level, mode = ?ctx.config.execution_mode))]
    pub fn execute_command(
        &self,
        ctx: &RequestContext,
        command: &str,
        override_reason: Option<&str>,
    ) -> Outcome {
        let matched = ctx.classifier.matched_pattern(command);
        let verdict = decide_command(
            matched.is_some(),
            ctx.fatigue.level,
            ctx.config.fatigue_threshold,
            has_override(override_reason),
        );
        info!(?verdict, pattern = ?matched, "command decision");
        let action = format!("execute: {command}");
        let live = ctx.config.execution_mode.is_live();

        match verdict {
            CommandVerdict::Block => {
                self.audit_sink(ctx)
                    .record_block(&action, Status::Blocked, ctx.now);
                Outcome::new(
                    Status::Blocked,
                    blocked_command_message(ctx, command, matched),
                    ctx.fatigue,
                    ctx.config.execution_mode,
                )
                .with_command(command, matched)
                .with_override_instruction(override_instruction())
            }
            CommandVerdict::Override => {
                let reason = trimmed_reason(override_reason);
                let outcome = if live {
                    self.run_live(ctx, command, Status::ExecutedOverride)
                } else {
                    Outcome::new(
                        Status::SimulatedOverride,
                        format!("Simulate mode: override accepted; `{command}` would be executed."),
                        ctx.fatigue,
                        ctx.config.execution_mode,
                    )
                };
                let outcome = outcome
                    .with_command(command, matched)
                    .with_override_reason(reason);
                self.record_override(ctx, &action, reason, outcome.status);
                outcome
            }
            CommandVerdict::Warn | CommandVerdict::Allow => {
                let warning =
                    (verdict == CommandVerdict::Warn).then(|| command_warning(ctx, matched));
                let outcome = if live {
                    self.run_live(ctx, command, Status::Executed)
                } else {
                    Outcome::new(
                        Status::Simulated,
                        format!("Simulate mode: `{command}` would be executed."),
                        ctx.fatigue,
                        ctx.config.execution_mode,
                    )
                };
                outcome.with_command(command, matched).with_warning(warning)
            }
        }
    }

    /// Write `content` to `path` under the interlock.
    ///
    /// Relative paths resolve against the project root.
    #[instrument(skip_all, fields(path = %path.display(), fatigue = ctx.fatigue.level, mode = ?ctx.config.execution_mode))]
    pub fn write_file(
        &self,
        ctx: &RequestContext,
        path: &Path,
        content: &str,
        override_reason: Option<&str>,
    ) -> Outcome {
        let target = self.paths.resolve(path);
        let action = format!("write: {}", target.display());
        let mode = ctx.config.execution_mode;

        let previous = match read_existing(&target) {
            Ok(previous) => previous,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "could not read existing file");
                return Outcome::new(
                    Status::Failed,
                    format!("Could not read {}: {err:#}", target.display()),
                    ctx.fatigue,
                    mode,
                )
                .with_write(target, None);
            }
        };
        let impact = analyze_impact(previous.as_deref(), content);
        let signals =
            WriteSignals::evaluate(&impact, ctx.fatigue.level, ctx.config.write_thresholds());
        let verdict = decide_write(&signals, has_override(override_reason));
        info!(
            ?verdict,
            lines_removed = impact.lines_removed,
            lines_added = impact.lines_added,
            "write decision"
        );

        match verdict {
            WriteVerdict::Override => {
                let reason = trimmed_reason(override_reason);
                let outcome = if mode.is_live() {
                    self.write_live(
                        ctx,
                        &target,
                        content,
                        Status::WrittenOverride,
                        format!("Override accepted; wrote {}.", target.display()),
                    )
                } else {
                    Outcome::new(
                        Status::SimulatedOverride,
                        format!(
                            "Simulate mode: override accepted; {} would be written.",
                            target.display()
                        ),
                        ctx.fatigue,
                        mode,
                    )
                };
                let outcome = outcome
                    .with_write(target, Some(impact))
                    .with_override_reason(reason);
                self.record_override(ctx, &action, reason, outcome.status);
                outcome
            }
            WriteVerdict::HardBlock | WriteVerdict::Block => {
                let sink = self.audit_sink(ctx);
                let relative = target.strip_prefix(&self.paths.root).unwrap_or(&target);
                let review_path = match sink.snapshot_for_review(relative, content, ctx.now) {
                    Ok(path) => Some(path),
                    Err(err) => {
                        warn!(err = %format!("{err:#}"), "failed to save review snapshot");
                        None
                    }
                };
                let status = if review_path.is_some() {
                    Status::BlockedAndSavedForReview
                } else {
                    Status::Blocked
                };
                sink.record_block(&action, status, ctx.now);
                Outcome::new(
                    status,
                    blocked_write_message(ctx, verdict, &target, &impact, review_path.as_deref()),
                    ctx.fatigue,
                    mode,
                )
                .with_write(target, Some(impact))
                .with_review_path(review_path)
                .with_override_instruction(override_instruction())
            }
            WriteVerdict::Warn => {
                let warning = write_warning(ctx, &impact);
                let outcome = if mode.is_live() {
                    self.write_live(
                        ctx,
                        &target,
                        content,
                        Status::AllowedWithWarning,
                        format!("Wrote {} with a warning.", target.display()),
                    )
                } else {
                    Outcome::new(
                        Status::Simulated,
                        format!("Simulate mode: {} would be written.", target.display()),
                        ctx.fatigue,
                        mode,
                    )
                };
                outcome
                    .with_write(target, Some(impact))
                    .with_warning(Some(warning))
            }
            WriteVerdict::Allow => {
                let outcome = if mode.is_live() {
                    self.write_live(
                        ctx,
                        &target,
                        content,
                        Status::Allowed,
                        format!("Wrote {}.", target.display()),
                    )
                } else {
                    Outcome::new(
                        Status::Simulated,
                        format!("Simulate mode: {} would be written.", target.display()),
                        ctx.fatigue,
                        mode,
                    )
                };
                outcome.with_write(target, Some(impact))
            }
        }
    }

    fn run_live(&self, ctx: &RequestContext, command: &str, success: Status) -> Outcome {
        let request = CommandRequest {
            command: command.to_string(),
            workdir: self.paths.root.clone(),
            timeout: Duration::from_secs(ctx.config.command_timeout_secs),
            output_limit_bytes: ctx.config.output_limit_bytes,
        };
        let mode = ctx.config.execution_mode;
        let output = match self.runner.run(&request) {
            Ok(output) => output,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "command could not be run");
                return Outcome::new(
                    Status::Failed,
                    format!("`{command}` could not be started: {err:#}"),
                    ctx.fatigue,
                    mode,
                );
            }
        };

        let report = ExecutionReport::from(&output);
        if output.timed_out {
            return Outcome::new(
                Status::Failed,
                format!(
                    "`{command}` timed out after {}s and was killed.",
                    ctx.config.command_timeout_secs
                ),
                ctx.fatigue,
                mode,
            )
            .with_execution(report);
        }
        if !output.success() {
            let code = output
                .exit_code
                .map_or_else(|| "none".to_string(), |code| code.to_string());
            return Outcome::new(
                Status::Failed,
                format!("`{command}` failed with exit code {code}."),
                ctx.fatigue,
                mode,
            )
            .with_execution(report);
        }
        let message = match success {
            Status::ExecutedOverride => format!("Override accepted; executed `{command}`."),
            _ => format!("Executed `{command}`."),
        };
        Outcome::new(success, message, ctx.fatigue, mode).with_execution(report)
    }

    fn write_live(
        &self,
        ctx: &RequestContext,
        target: &Path,
        content: &str,
        success: Status,
        message: String,
    ) -> Outcome {
        let mode = ctx.config.execution_mode;
        match write_with_parents(target, content) {
            Ok(()) => Outcome::new(success, message, ctx.fatigue, mode),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "write failed");
                Outcome::new(
                    Status::Failed,
                    format!("Could not write {}: {err:#}", target.display()),
                    ctx.fatigue,
                    mode,
                )
            }
        }
    }

    fn record_override(&self, ctx: &RequestContext, action: &str, reason: &str, status: Status) {
        warn!(action, reason, ?status, "interlock overridden");
        self.audit_sink(ctx)
            .record_override(action, reason, status, ctx.now);
        notify_override(
            ctx.config.webhook_url.as_deref(),
            &OverrideEvent::new(action, reason, ctx.fatigue, ctx.now),
        );
    }
}

fn trimmed_reason(reason: Option<&str>) -> &str {
    reason.map(str::trim).unwrap_or_default()
}

fn blocked_command_message(ctx: &RequestContext, command: &str, matched: Option<&str>) -> String {
    format!(
        "Blocked: `{command}` matches dangerous pattern \"{}\" and fatigue {} exceeds the threshold of {} ({:?}, {:.1}h since last break).",
        matched.unwrap_or_default(),
        ctx.fatigue.level,
        ctx.config.fatigue_threshold,
        ctx.fatigue.category,
        ctx.fatigue.uptime_hours,
    )
}

fn command_warning(ctx: &RequestContext, matched: Option<&str>) -> String {
    format!(
        "Command matches dangerous pattern \"{}\". Fatigue {} is within the threshold of {}; double-check before relying on the result.",
        matched.unwrap_or_default(),
        ctx.fatigue.level,
        ctx.config.fatigue_threshold,
    )
}

fn write_warning(ctx: &RequestContext, impact: &ImpactReport) -> String {
    format!(
        "This rewrite removes {} of {} lines ({}%) at fatigue {}. Review the change carefully.",
        impact.lines_removed, impact.total_old_lines, impact.percentage_removed, ctx.fatigue.level,
    )
}

fn blocked_write_message(
    ctx: &RequestContext,
    verdict: WriteVerdict,
    target: &Path,
    impact: &ImpactReport,
    review_path: Option<&Path>,
) -> String {
    let (label, threshold_name, threshold) = match verdict {
        WriteVerdict::HardBlock => ("Hard block", "block", ctx.config.write_block_threshold),
        _ => ("Blocked", "warn", ctx.config.write_warn_threshold),
    };
    let saved = match review_path {
        Some(path) => format!(" Proposed content saved for review at {}.", path.display()),
        None => " The proposed content could not be saved for review.".to_string(),
    };
    format!(
        "{label}: rewriting {} removes {} lines ({}%), above the {threshold_name} threshold of {threshold}, at fatigue {}.{saved}",
        target.display(),
        impact.lines_removed,
        impact.percentage_removed,
        ctx.fatigue.level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ExecutionMode;
    use crate::io::audit::AuditEntry;
    use crate::io::config::InterlockConfig;
    use crate::test_support::{ScriptedRun, ScriptedRunner, TestWorkspace, context, context_with};

    fn numbered(lines: usize) -> String {
        (0..lines).map(|i| format!("line {i}\n")).collect()
    }

    fn entries(gate: &Gate<ScriptedRunner>, ctx: &RequestContext) -> Vec<AuditEntry> {
        gate.audit_sink(ctx).entries().expect("audit entries")
    }

    #[test]
    fn check_never_runs_or_audits() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 90);

        let outcome = gate.check_command(&ctx, "rm -rf /var/data");
        assert_eq!(outcome.status, Status::Blocked);
        assert_eq!(outcome.matched_pattern.as_deref(), Some("rm -rf"));
        assert!(outcome.override_instruction.is_some());

        let outcome = gate.check_command(&ctx, "cargo test");
        assert_eq!(outcome.status, Status::Allowed);
        assert!(gate.runner().requests().is_empty());
        assert!(entries(&gate, &ctx).is_empty());
    }

    #[test]
    fn check_warns_within_threshold() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let outcome = gate.check_command(&context(ExecutionMode::Simulate, 70), "git push --force");
        assert_eq!(outcome.status, Status::AllowedWithWarning);
        assert!(outcome.warning.is_some());
        assert!(outcome.override_instruction.is_none());
    }

    #[test]
    fn blocked_command_is_audited_and_not_run() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 75);

        let outcome = gate.execute_command(&ctx, "DROP TABLE users;", None);
        assert_eq!(outcome.status, Status::Blocked);
        assert!(outcome.message.contains("drop table"));
        assert!(gate.runner().requests().is_empty());

        let audit = entries(&gate, &ctx);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].outcome, Status::Blocked);
        assert_eq!(audit[0].override_reason, None);
        assert_eq!(audit[0].action_description, "execute: DROP TABLE users;");
    }

    #[test]
    fn blank_override_reason_does_not_unblock() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 75);
        let outcome = gate.execute_command(&ctx, "rm -rf dist", Some("   "));
        assert_eq!(outcome.status, Status::Blocked);
        assert!(gate.runner().requests().is_empty());
    }

    #[test]
    fn live_override_runs_and_audits_reason() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::new(vec![ScriptedRun::success("removed\n")]));
        let ctx = context(ExecutionMode::Live, 75);

        let outcome = gate.execute_command(&ctx, "rm -rf dist", Some("  clean release build  "));
        assert_eq!(outcome.status, Status::ExecutedOverride);
        assert_eq!(outcome.override_reason.as_deref(), Some("clean release build"));
        assert_eq!(outcome.execution.as_ref().map(|e| e.stdout.as_str()), Some("removed\n"));
        assert_eq!(gate.runner().commands(), vec!["rm -rf dist"]);

        let request = &gate.runner().requests()[0];
        assert_eq!(request.workdir, ws.path());
        assert_eq!(request.timeout, Duration::from_secs(30));
        assert_eq!(request.output_limit_bytes, 100_000);

        let audit = entries(&gate, &ctx);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].outcome, Status::ExecutedOverride);
        assert_eq!(audit[0].override_reason.as_deref(), Some("clean release build"));
    }

    #[test]
    fn failed_override_is_audited_as_failed() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::new(vec![ScriptedRun::exit(1, "permission denied")]));
        let ctx = context(ExecutionMode::Live, 75);

        let outcome = gate.execute_command(&ctx, "rm -rf /etc", Some("testing"));
        assert_eq!(outcome.status, Status::Failed);
        assert!(outcome.message.contains("exit code 1"));
        assert_eq!(entries(&gate, &ctx)[0].outcome, Status::Failed);
    }

    #[test]
    fn simulated_override_does_not_run() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Simulate, 95);

        let outcome = gate.execute_command(&ctx, "rm -rf dist", Some("deadline"));
        assert_eq!(outcome.status, Status::SimulatedOverride);
        assert!(gate.runner().requests().is_empty());
        assert_eq!(entries(&gate, &ctx)[0].outcome, Status::SimulatedOverride);
    }

    #[test]
    fn override_on_allowed_command_is_ignored() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 10);

        let outcome = gate.execute_command(&ctx, "ls", Some("because"));
        assert_eq!(outcome.status, Status::Executed);
        assert_eq!(outcome.override_reason, None);
        assert!(entries(&gate, &ctx).is_empty());
    }

    #[test]
    fn live_dangerous_command_within_threshold_runs_with_warning() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 40);
        let outcome = gate.execute_command(&ctx, "kubectl delete pod web-1", None);
        assert_eq!(outcome.status, Status::Executed);
        assert!(outcome.warning.is_some());
        assert_eq!(gate.runner().commands().len(), 1);
    }

    #[test]
    fn simulate_mode_never_runs() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Simulate, 0);
        let outcome = gate.execute_command(&ctx, "echo hello", None);
        assert_eq!(outcome.status, Status::Simulated);
        assert!(outcome.execution.is_none());
        assert!(gate.runner().requests().is_empty());
    }

    #[test]
    fn timeouts_and_spawn_errors_fail() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::new(vec![
            ScriptedRun::timed_out(),
            ScriptedRun::SpawnError("no shell".to_string()),
        ]));
        let ctx = context(ExecutionMode::Live, 0);

        let outcome = gate.execute_command(&ctx, "sleep 100", None);
        assert_eq!(outcome.status, Status::Failed);
        assert!(outcome.message.contains("timed out after 30s"));
        assert!(outcome.execution.is_some_and(|e| e.timed_out));

        let outcome = gate.execute_command(&ctx, "echo hi", None);
        assert_eq!(outcome.status, Status::Failed);
        assert!(outcome.message.contains("no shell"));
    }

    #[test]
    fn new_file_is_always_allowed() {
        let ws = TestWorkspace::new().expect("workspace");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 100);

        let outcome = gate.write_file(&ctx, Path::new("src/new.rs"), "fn main() {}\n", None);
        assert_eq!(outcome.status, Status::Allowed);
        assert!(outcome.impact.is_some_and(|impact| impact.is_new_file));
        assert_eq!(ws.read_file("src/new.rs").expect("read"), "fn main() {}\n");
    }

    #[test]
    fn high_impact_write_at_high_fatigue_is_saved_for_review() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write_file("lib.rs", &numbered(100)).expect("seed");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 75);
        let proposed = numbered(60);

        let outcome = gate.write_file(&ctx, Path::new("lib.rs"), &proposed, None);
        assert_eq!(outcome.status, Status::BlockedAndSavedForReview);
        assert!(outcome.message.starts_with("Blocked:"));
        assert_eq!(ws.read_file("lib.rs").expect("read"), numbered(100));

        let review = outcome.review_path.expect("review path");
        assert!(review.starts_with(ws.path().join(".interlock/review")));
        assert_eq!(std::fs::read_to_string(&review).expect("snapshot"), proposed);

        let audit = entries(&gate, &ctx);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].outcome, Status::BlockedAndSavedForReview);
    }

    #[test]
    fn critical_impact_at_extreme_fatigue_is_a_hard_block() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write_file("lib.rs", &numbered(100)).expect("seed");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Simulate, 85);

        let outcome = gate.write_file(&ctx, Path::new("lib.rs"), &numbered(40), None);
        assert_eq!(outcome.status, Status::BlockedAndSavedForReview);
        assert!(outcome.message.starts_with("Hard block:"));
        assert!(outcome.override_instruction.is_some());
    }

    #[test]
    fn write_override_applies_content() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write_file("lib.rs", &numbered(100)).expect("seed");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 85);

        let reason = Some("planned rewrite");
        let outcome = gate.write_file(&ctx, Path::new("lib.rs"), &numbered(10), reason);
        assert_eq!(outcome.status, Status::WrittenOverride);
        assert_eq!(ws.read_file("lib.rs").expect("read"), numbered(10));
        assert!(outcome.review_path.is_none());

        let audit = entries(&gate, &ctx);
        assert_eq!(audit[0].outcome, Status::WrittenOverride);
        assert!(audit[0].action_description.starts_with("write: "));
    }

    #[test]
    fn moderate_fatigue_write_warns_but_applies() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write_file("lib.rs", &numbered(100)).expect("seed");
        let gate = ws.gate(ScriptedRunner::default());

        let ctx = context(ExecutionMode::Live, 60);
        let outcome = gate.write_file(&ctx, Path::new("lib.rs"), &numbered(60), None);
        assert_eq!(outcome.status, Status::AllowedWithWarning);
        assert!(outcome.warning.as_deref().is_some_and(|w| w.contains("40%")));
        assert_eq!(ws.read_file("lib.rs").expect("read"), numbered(60));
    }

    #[test]
    fn simulated_warn_reports_warning_without_writing() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write_file("lib.rs", &numbered(100)).expect("seed");
        let gate = ws.gate(ScriptedRunner::default());

        let ctx = context(ExecutionMode::Simulate, 60);
        let outcome = gate.write_file(&ctx, Path::new("lib.rs"), &numbered(60), None);
        assert_eq!(outcome.status, Status::Simulated);
        assert!(outcome.warning.is_some());
        assert_eq!(ws.read_file("lib.rs").expect("read"), numbered(100));
    }

    #[test]
    fn simulated_write_override_leaves_file_untouched() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write_file("lib.rs", &numbered(100)).expect("seed");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Simulate, 85);

        let reason = Some("rewrite agreed in review");
        let outcome = gate.write_file(&ctx, Path::new("lib.rs"), &numbered(45), reason);
        assert_eq!(outcome.status, Status::SimulatedOverride);
        assert_eq!(outcome.impact.map(|impact| impact.lines_removed), Some(55));
        assert!(outcome.review_path.is_none());
        assert_eq!(ws.read_file("lib.rs").expect("read"), numbered(100));
        assert!(!ws.path().join(".interlock/review").exists());

        let audit = entries(&gate, &ctx);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].outcome, Status::SimulatedOverride);
        assert_eq!(audit[0].override_reason.as_deref(), Some("rewrite agreed in review"));
    }

    #[test]
    fn deeply_nested_block_is_still_saved_for_review() {
        let ws = TestWorkspace::new().expect("workspace");
        let relative: String = (0..30)
            .map(|i| format!("segment{i:02}/"))
            .chain(std::iter::once("file.rs".to_string()))
            .collect();
        ws.write_file(&relative, &numbered(100)).expect("seed");
        let gate = ws.gate(ScriptedRunner::default());
        let ctx = context(ExecutionMode::Live, 75);

        let proposed = numbered(50);
        let outcome = gate.write_file(&ctx, Path::new(&relative), &proposed, None);
        assert_eq!(outcome.status, Status::BlockedAndSavedForReview);

        let review = outcome.review_path.expect("review path");
        let name = review
            .file_name()
            .and_then(|name| name.to_str())
            .expect("file name");
        assert!(name.len() < 255, "{} bytes", name.len());
        assert!(name.ends_with("segment29_file.rs"), "{name}");
        assert!(!name.contains("tmp"), "{name}");
        assert_eq!(std::fs::read_to_string(&review).expect("snapshot"), proposed);
    }

    #[test]
    fn unsaveable_snapshot_downgrades_to_blocked() {
        let ws = TestWorkspace::new().expect("workspace");
        ws.write_file("lib.rs", &numbered(100)).expect("seed");
        // A file where the review directory should be.
        ws.write_file("review-blocker", "not a dir").expect("blocker");
        let mut config = InterlockConfig {
            execution_mode: ExecutionMode::Live,
            ..InterlockConfig::default()
        };
        config.audit.review_dir = PathBuf::from("review-blocker");
        let ctx = context_with(config, 75);
        let gate = ws.gate(ScriptedRunner::default());

        let outcome = gate.write_file(&ctx, Path::new("lib.rs"), &numbered(50), None);
        assert_eq!(outcome.status, Status::Blocked);
        assert!(outcome.review_path.is_none());
        assert_eq!(ws.read_file("lib.rs").expect("read"), numbered(100));
    }
}
