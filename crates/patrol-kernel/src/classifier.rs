//! [`ActionClassifier`] – maps a raw [`ActionSnapshot`] to a [`Verdict`].
//!
//! Firmware revisions disagree on which fields they populate: some report a
//! `stage` string, some only a numeric `state.status`, some both and not
//! always consistently.  The classifier is an ordered table of
//! [`StatusRule`]s; the first rule that recognises the snapshot decides, so an
//! earlier, more authoritative signal is never overridden by a later one.
//!
//! The standard table is:
//!
//! | # | Rule | Matches | Verdict |
//! |---|------|---------|---------|
//! | 1 | `result_error` | `state.result` present and non-zero | `Failed` |
//! | 2 | `completion_code` | `state.status == 4` | `Succeeded` if result absent/0 and reason empty, else `Failed` |
//! | 3 | `terminal_stage` | `stage` in FINISHED/SUCCEEDED/COMPLETED/STOPPED (any case) | `Succeeded` if result is 0 and reason empty, else `Failed` |
//! | – | *(none)* | anything else | `Pending` |
//!
//! # Example
//!
//! ```
//! use patrol_kernel::classifier::{ActionClassifier, Verdict};
//! use patrol_types::{ActionSnapshot, ActionState};
//!
//! let classifier = ActionClassifier::standard();
//! let snap = ActionSnapshot {
//!     stage: Some("RUNNING".into()),
//!     state: Some(ActionState { status: Some(4), result: None, reason: None }),
//! };
//! assert_eq!(classifier.classify(&snap).verdict, Verdict::Succeeded);
//! ```

use patrol_types::ActionSnapshot;

/// Status code some firmware reports once an action has ended.
pub const COMPLETION_STATUS: i64 = 4;

/// Stages that mark an action as ended, compared case-insensitively.
pub const TERMINAL_STAGES: [&str; 4] = ["FINISHED", "SUCCEEDED", "COMPLETED", "STOPPED"];

/// Classification of one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pending,
    Succeeded,
    Failed,
}

/// A verdict together with the name of the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    /// `None` when no rule matched and the action is still pending.
    pub rule: Option<&'static str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// One row of the classification table.
pub trait StatusRule: Send + Sync {
    /// Short name reported in [`Classification::rule`] and in logs.
    fn name(&self) -> &'static str;

    /// Return a terminal verdict when the rule recognises `snapshot`, or
    /// `None` to defer to the next rule.
    fn evaluate(&self, snapshot: &ActionSnapshot) -> Option<Verdict>;
}

fn success_if(ok: bool) -> Verdict {
    if ok { Verdict::Succeeded } else { Verdict::Failed }
}

/// A non-zero `state.result` is an action-level error, whatever the stage or
/// status say.
pub struct ResultErrorRule;

impl StatusRule for ResultErrorRule {
    fn name(&self) -> &'static str {
        "result_error"
    }

    fn evaluate(&self, snapshot: &ActionSnapshot) -> Option<Verdict> {
        match snapshot.result() {
            Some(code) if code != 0 => Some(Verdict::Failed),
            _ => None,
        }
    }
}

/// `state.status` equal to the completion code ends the action even when the
/// firmware leaves `stage` empty.
pub struct CompletionCodeRule {
    pub code: i64,
}

impl Default for CompletionCodeRule {
    fn default() -> Self {
        Self {
            code: COMPLETION_STATUS,
        }
    }
}

impl StatusRule for CompletionCodeRule {
    fn name(&self) -> &'static str {
        "completion_code"
    }

    fn evaluate(&self, snapshot: &ActionSnapshot) -> Option<Verdict> {
        if snapshot.status() != Some(self.code) {
            return None;
        }
        let clean_result = matches!(snapshot.result(), None | Some(0));
        Some(success_if(clean_result && snapshot.reason().is_empty()))
    }
}

/// A terminal `stage` string ends the action.  Success requires an explicit
/// zero result.
pub struct TerminalStageRule {
    pub stages: &'static [&'static str],
}

impl Default for TerminalStageRule {
    fn default() -> Self {
        Self {
            stages: &TERMINAL_STAGES,
        }
    }
}

impl StatusRule for TerminalStageRule {
    fn name(&self) -> &'static str {
        "terminal_stage"
    }

    fn evaluate(&self, snapshot: &ActionSnapshot) -> Option<Verdict> {
        let stage = snapshot.stage();
        if !self.stages.iter().any(|s| s.eq_ignore_ascii_case(stage)) {
            return None;
        }
        Some(success_if(
            snapshot.result() == Some(0) && snapshot.reason().is_empty(),
        ))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ActionClassifier
// ────────────────────────────────────────────────────────────────────────────

/// Ordered rule table.  Rules are evaluated in insertion order and the first
/// match wins.
#[derive(Default)]
pub struct ActionClassifier {
    rules: Vec<Box<dyn StatusRule>>,
}

impl ActionClassifier {
    /// An empty table: every snapshot classifies as [`Verdict::Pending`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard table described in the module docs.
    pub fn standard() -> Self {
        let mut classifier = Self::new();
        classifier.add_rule(Box::new(ResultErrorRule));
        classifier.add_rule(Box::new(CompletionCodeRule::default()));
        classifier.add_rule(Box::new(TerminalStageRule::default()));
        classifier
    }

    /// Append a rule at the lowest precedence.
    pub fn add_rule(&mut self, rule: Box<dyn StatusRule>) {
        self.rules.push(rule);
    }

    /// Rule names in precedence order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn classify(&self, snapshot: &ActionSnapshot) -> Classification {
        self.rules
            .iter()
            .find_map(|rule| {
                rule.evaluate(snapshot).map(|verdict| Classification {
                    verdict,
                    rule: Some(rule.name()),
                })
            })
            .unwrap_or(Classification {
                verdict: Verdict::Pending,
                rule: None,
            })
    }
}

/// Human-readable reason for a failed action: the robot's own reason when it
/// gave one, otherwise a rendering of the snapshot.
pub fn failure_reason(snapshot: &ActionSnapshot) -> String {
    let reason = snapshot.reason();
    if !reason.is_empty() {
        return reason.to_string();
    }
    match snapshot.result() {
        Some(code) if code != 0 => format!("robot reported result code {code} ({snapshot})"),
        _ => format!("action ended without a success result ({snapshot})"),
    }
}
