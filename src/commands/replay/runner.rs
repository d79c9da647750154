//! Executes replay scripts against a lock manager.

use super::script::{Operation, Outcome, Script, Step};
use chrono::{DateTime, Duration, Utc};
use davlock::config::ManagerConfig;
use davlock::error::{DavLockError, Result};
use davlock::locks::{Claim, Condition, LockDetails, LockInfo, LockManager};
use davlock::timeout::{LockTimeout, parse_timeout};
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// What one step did.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub at: DateTime<Utc>,
    pub op: &'static str,
    pub outcome: Outcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Outcome>,

    /// Token created by a create step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Tokens claimed by a confirm step.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub claimed: Vec<String>,

    /// Details returned by a refresh step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<LockDetails>,

    /// Lock found by a lookup step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepReport {
    fn new(step: usize, at: DateTime<Utc>, op: &'static str, expected: Option<Outcome>) -> Self {
        Self {
            step,
            at,
            op,
            outcome: Outcome::Ok,
            expected,
            token: None,
            claimed: Vec::new(),
            details: None,
            lock: None,
            error: None,
        }
    }

    fn failed(mut self, err: &DavLockError) -> Self {
        self.outcome = Outcome::from_error(err);
        self.error = Some(err.to_string());
        self
    }

    /// Whether the step produced its declared outcome (or declared none).
    pub fn matches_expectation(&self) -> bool {
        self.expected.is_none_or(|expected| expected == self.outcome)
    }
}

impl std::fmt::Display for StepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:>3}] {} {:<8} {}",
            self.step,
            self.at.to_rfc3339(),
            self.op,
            self.outcome
        )?;
        if let Some(token) = &self.token {
            write!(f, " token={}", token)?;
        }
        if !self.claimed.is_empty() {
            write!(f, " claimed={}", self.claimed.join(","))?;
        }
        if let Some(details) = &self.details {
            write!(f, " timeout={}", details.duration)?;
        }
        if let Some(lock) = &self.lock {
            write!(f, " lock={}", lock)?;
        }
        if !self.matches_expectation()
            && let Some(expected) = self.expected
        {
            write!(f, " (expected {})", expected)?;
        }
        Ok(())
    }
}

/// A running replay: one manager plus the script's token and claim aliases.
pub struct Replay {
    manager: LockManager,
    start: DateTime<Utc>,
    default_timeout: LockTimeout,
    default_owner: String,
    tokens: HashMap<String, String>,
    claims: HashMap<String, Claim>,
}

impl Replay {
    pub fn new(config: &ManagerConfig) -> Result<Self> {
        Ok(Self {
            manager: LockManager::with_config(config),
            start: DateTime::<Utc>::default(),
            default_timeout: config.default_lock_timeout()?,
            default_owner: format!("<D:href>{}</D:href>", get_owner_string()),
            tokens: HashMap::new(),
            claims: HashMap::new(),
        })
    }

    /// Run every step in order. Lock errors are recorded in the reports;
    /// script errors (such as releasing an unknown claim) abort the run.
    pub fn run(mut self, script: &Script) -> Result<Vec<StepReport>> {
        if let Some(start) = script.start {
            self.start = start;
        }

        let mut reports = Vec::with_capacity(script.steps.len());
        for (i, step) in script.steps.iter().enumerate() {
            reports.push(self.run_step(i + 1, step)?);
        }

        if !self.claims.is_empty() {
            let mut outstanding: Vec<&str> = self.claims.keys().map(String::as_str).collect();
            outstanding.sort();
            warn!(claims = %outstanding.join(","), "replay finished with unreleased claims");
        }
        Ok(reports)
    }

    fn run_step(&mut self, index: usize, step: &Step) -> Result<StepReport> {
        let now = Duration::try_milliseconds((step.at * 1000.0).round() as i64)
            .and_then(|offset| self.start.checked_add_signed(offset))
            .ok_or_else(|| {
                DavLockError::UserError(format!(
                    "step {}: 'at' offset {} is out of range",
                    index, step.at
                ))
            })?;
        let report = StepReport::new(index, now, step.op.name(), step.expect);

        let report = match &step.op {
            Operation::Create {
                root,
                timeout,
                zero_depth,
                owner,
                bind,
            } => {
                let duration = match self.timeout_or_default(timeout.as_deref()) {
                    Ok(duration) => duration,
                    Err(e) => return Ok(report.failed(&e)),
                };
                let details = LockDetails::new(root.as_str(), duration, *zero_depth)
                    .with_owner(owner.clone().unwrap_or_else(|| self.default_owner.clone()));
                match self.manager.create(now, details) {
                    Ok(token) => {
                        if let Some(alias) = bind {
                            self.tokens.insert(alias.clone(), token.clone());
                        }
                        StepReport {
                            token: Some(token),
                            ..report
                        }
                    }
                    Err(e) => report.failed(&e),
                }
            }
            Operation::Refresh { token, timeout } => {
                let duration = match self.timeout_or_default(timeout.as_deref()) {
                    Ok(duration) => duration,
                    Err(e) => return Ok(report.failed(&e)),
                };
                match self.manager.refresh(now, &self.resolve_token(token), duration) {
                    Ok(details) => StepReport {
                        details: Some(details),
                        ..report
                    },
                    Err(e) => report.failed(&e),
                }
            }
            Operation::Unlock { token } => {
                match self.manager.unlock(now, &self.resolve_token(token)) {
                    Ok(()) => report,
                    Err(e) => report.failed(&e),
                }
            }
            Operation::Confirm {
                names,
                tokens,
                bind,
            } => {
                if names.len() > 2 {
                    return Err(DavLockError::UserError(format!(
                        "step {}: confirm takes at most two names (found {})",
                        index,
                        names.len()
                    )));
                }
                let name0 = names.first().map(String::as_str).unwrap_or_default();
                let name1 = names.get(1).map(String::as_str).unwrap_or_default();
                let conditions: Vec<Condition> = tokens
                    .iter()
                    .map(|t| Condition::token(self.resolve_token(t)))
                    .collect();

                match self.manager.confirm(now, name0, name1, &conditions) {
                    Ok(claim) => {
                        let claimed = claim.tokens().map(str::to_string).collect();
                        match bind {
                            Some(alias) => {
                                if let Some(previous) = self.claims.insert(alias.clone(), claim) {
                                    self.manager.release(previous)?;
                                }
                            }
                            None => self.manager.release(claim)?,
                        }
                        StepReport { claimed, ..report }
                    }
                    Err(e) => report.failed(&e),
                }
            }
            Operation::Release { claim } => {
                let claim = self.claims.remove(claim).ok_or_else(|| {
                    DavLockError::UserError(format!(
                        "step {}: claim '{}' is not outstanding",
                        index, claim
                    ))
                })?;
                match self.manager.release(claim) {
                    Ok(()) => report,
                    Err(e) => report.failed(&e),
                }
            }
            Operation::Lookup { name } => match self.manager.get_by_name_at(now, name) {
                Ok(lock) => StepReport {
                    lock: Some(lock),
                    ..report
                },
                Err(e) => report.failed(&e),
            },
            Operation::Delete { name } => match self.manager.delete(now, name) {
                Ok(()) => report,
                Err(e) => report.failed(&e),
            },
        };
        Ok(report)
    }

    fn timeout_or_default(&self, header: Option<&str>) -> Result<LockTimeout> {
        match header {
            Some(header) => parse_timeout(header),
            None => Ok(self.default_timeout),
        }
    }

    fn resolve_token(&self, name: &str) -> String {
        self.tokens
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// Owner string for locks created without one (e.g., `user@HOST`).
fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
