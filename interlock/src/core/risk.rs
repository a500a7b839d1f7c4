//! Heuristic classification of dangerous shell commands.
//!
//! This is a tripwire, not a security boundary: obfuscated commands are not
//! detected.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

/// Prefix marking a configured pattern as a regular expression.
pub const REGEX_PREFIX: &str = "re:";

/// Built-in dangerous-operation patterns, matched case-insensitively as substrings.
pub const DEFAULT_DANGEROUS_PATTERNS: &[&str] = &[
    // destructive filesystem operations
    "rm -rf",
    "rm -fr",
    "rm -r ",
    "shred ",
    "truncate -s 0",
    "find / -delete",
    // forced version-control history rewrites
    "git push --force",
    "git push -f",
    "git reset --hard",
    "git clean -fd",
    // destructive database statements
    "drop table",
    "drop database",
    "drop schema",
    "truncate table",
    "delete from",
    // orchestration teardown
    "kubectl delete",
    "helm uninstall",
    "docker rm -f",
    "docker system prune",
    "docker-compose down -v",
    "terraform destroy",
    // disk formatting
    "mkfs",
    "dd if=",
    "fdisk",
    "wipefs",
    "format c:",
];

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    matcher: Matcher,
}

impl Pattern {
    fn compile(source: &str) -> Result<Self> {
        let matcher = match source.strip_prefix(REGEX_PREFIX) {
            Some(expr) => Matcher::Regex(
                RegexBuilder::new(expr)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("compile dangerous pattern {source:?}"))?,
            ),
            None => Matcher::Literal(source.to_lowercase()),
        };
        Ok(Self {
            source: source.to_string(),
            matcher,
        })
    }

    fn matches(&self, command: &str, lowered: &str) -> bool {
        match &self.matcher {
            Matcher::Literal(needle) => !needle.is_empty() && lowered.contains(needle.as_str()),
            Matcher::Regex(regex) => regex.is_match(command),
        }
    }
}

/// Merged set of built-in and configured dangerous patterns.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    patterns: Vec<Pattern>,
}

impl RiskClassifier {
    /// Built-in patterns followed by `deny` additions, in order.
    pub fn new<S: AsRef<str>>(deny: &[S]) -> Result<Self> {
        let patterns = DEFAULT_DANGEROUS_PATTERNS
            .iter()
            .copied()
            .chain(deny.iter().map(AsRef::as_ref))
            .map(Pattern::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// First pattern contained in `command`, if any.
    pub fn matched_pattern(&self, command: &str) -> Option<&str> {
        let lowered = command.to_lowercase();
        self.patterns
            .iter()
            .find(|pattern| pattern.matches(command, &lowered))
            .map(|pattern| pattern.source.as_str())
    }

    pub fn is_dangerous(&self, command: &str) -> bool {
        self.matched_pattern(command).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        let patterns = DEFAULT_DANGEROUS_PATTERNS
            .iter()
            .map(|source| Pattern {
                source: (*source).to_string(),
                matcher: Matcher::Literal(source.to_lowercase()),
            })
            .collect();
        Self { patterns }
    }
}
