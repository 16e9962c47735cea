//! Wax Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It is the shared configuration vocabulary of all wax crates.

use serde::Deserialize;

/// Engine-level settings, read once at construction and immutable afterwards
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Scripts executed before the main module on every render, in order
    pub global_scripts: Vec<String>,
    /// File extensions tried when a view or import names no extension
    pub extensions: Vec<String>,
    /// Execution limits
    pub limits: LimitConfig,
}

/// Configuration for execution limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitConfig {
    /// Maximum nesting of `do_import` calls within one render
    pub max_import_depth: usize,
}

/// Render phase, used for error attribution and log targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Load,
    Compile,
    Execute,
    Other,
}

impl Phase {
    /// All phases, in pipeline order
    pub const ALL: [Phase; 4] = [Phase::Load, Phase::Compile, Phase::Execute, Phase::Other];

    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Compile => "compile",
            Phase::Execute => "execute",
            Phase::Other => "other",
        }
    }

    /// Log target used by records of this phase
    pub const fn target(&self) -> &'static str {
        match self {
            Phase::Load => "wax::load",
            Phase::Compile => "wax::compile",
            Phase::Execute => "wax::execute",
            Phase::Other => "wax",
        }
    }

    /// Phase owning a log target, `wax::compile::rewriter` belongs to `Compile`
    pub fn from_target(target: &str) -> Option<Phase> {
        Phase::ALL.into_iter().find(|phase| {
            target
                .strip_prefix(phase.target())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            global_scripts: Vec::new(),
            extensions: vec![".tsx".to_string(), ".jsx".to_string()],
            limits: LimitConfig::default(),
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_import_depth: 64,
        }
    }
}
