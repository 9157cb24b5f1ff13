// Threshold policy: maps a toxicity score to an action.
//
// Thresholds resolve per language: a per-language override wins, then the
// global threshold, then the built-in default. Classification checks the
// most severe action first, so a score clearing several thresholds always
// gets the harshest one. Threshold ordering is not enforced here; see
// FilterConfig::validate for the load-time check.

use serde::{Deserialize, Serialize};

use crate::config::FilterConfig;
use crate::language::LanguageTag;

/// Built-in thresholds used when nothing is configured.
pub const DEFAULT_BLOCK_THRESHOLD: f64 = 0.8;
pub const DEFAULT_FLAG_THRESHOLD: f64 = 0.6;
pub const DEFAULT_WARN_THRESHOLD: f64 = 0.4;

/// The three actions that carry a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdAction {
    Block,
    Flag,
    Warn,
}

impl ThresholdAction {
    pub fn default_threshold(&self) -> f64 {
        match self {
            ThresholdAction::Block => DEFAULT_BLOCK_THRESHOLD,
            ThresholdAction::Flag => DEFAULT_FLAG_THRESHOLD,
            ThresholdAction::Warn => DEFAULT_WARN_THRESHOLD,
        }
    }
}

/// What to do with a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[serde(rename = "none")]
    Allow,
    Warn,
    Flag,
    Block,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "none",
            Action::Warn => "warn",
            Action::Flag => "flag",
            Action::Block => "block",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Thresholds after fallback resolution for one language.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedThresholds {
    pub block: f64,
    pub flag: f64,
    pub warn: f64,
}

impl Default for ResolvedThresholds {
    fn default() -> Self {
        Self {
            block: DEFAULT_BLOCK_THRESHOLD,
            flag: DEFAULT_FLAG_THRESHOLD,
            warn: DEFAULT_WARN_THRESHOLD,
        }
    }
}

impl ResolvedThresholds {
    pub fn get(&self, action: ThresholdAction) -> f64 {
        match action {
            ThresholdAction::Block => self.block,
            ThresholdAction::Flag => self.flag,
            ThresholdAction::Warn => self.warn,
        }
    }
}

/// Classify a score. Block is checked first, then flag, then warn.
///
/// NaN fails every comparison and comes out as `Allow`.
pub fn classify(score: f64, thresholds: &ResolvedThresholds) -> Action {
    if score >= thresholds.block {
        Action::Block
    } else if score >= thresholds.flag {
        Action::Flag
    } else if score >= thresholds.warn {
        Action::Warn
    } else {
        Action::Allow
    }
}

/// Resolve one threshold: language override, then global, then default.
pub fn resolve_threshold(
    config: &FilterConfig,
    language: Option<LanguageTag>,
    action: ThresholdAction,
) -> f64 {
    let lang_code = language.map(|l| l.as_str());
    resolve_for(config, lang_code, action)
}

/// Resolve all three thresholds for a language (or globally with `None`).
pub fn resolve_thresholds(config: &FilterConfig, language: Option<LanguageTag>) -> ResolvedThresholds {
    ResolvedThresholds {
        block: resolve_threshold(config, language, ThresholdAction::Block),
        flag: resolve_threshold(config, language, ThresholdAction::Flag),
        warn: resolve_threshold(config, language, ThresholdAction::Warn),
    }
}

/// Same as [`resolve_thresholds`] for a raw language code from the config.
pub fn resolve_thresholds_for_code(config: &FilterConfig, lang_code: &str) -> ResolvedThresholds {
    ResolvedThresholds {
        block: resolve_for(config, Some(lang_code), ThresholdAction::Block),
        flag: resolve_for(config, Some(lang_code), ThresholdAction::Flag),
        warn: resolve_for(config, Some(lang_code), ThresholdAction::Warn),
    }
}

fn resolve_for(config: &FilterConfig, lang_code: Option<&str>, action: ThresholdAction) -> f64 {
    lang_code
        .and_then(|code| config.languages.thresholds.get(code))
        .and_then(|t| t.get(action))
        .or_else(|| config.thresholds.get(action))
        .unwrap_or_else(|| action.default_threshold())
}
