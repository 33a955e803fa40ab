//! Model capability detection.
//!
//! Reasoning models (o1, o3, o4-mini, gpt-5*) reject the sampling knobs that
//! traditional chat models (gpt-3.5, gpt-4, gpt-4o, gpt-4.1) accept, and name
//! their output limit `max_completion_tokens` instead of `max_tokens`.

use serde::{Deserialize, Serialize};

/// Substrings that mark a reasoning model family.
///
/// Matching is plain substring containment, so `"o1"` also matches inside
/// longer identifiers.
const REASONING_MARKERS: &[&str] = &["o1", "o3", "o4-mini", "gpt-5"];

/// Substrings that mark a family preferring the `developer` role.
const DEVELOPER_ROLE_MARKERS: &[&str] = &["gpt-4.1", "gpt-5"];

/// The role label used for system-level instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemRole {
    System,
    Developer,
}

impl SystemRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemRole::System => "system",
            SystemRole::Developer => "developer",
        }
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which request parameters a model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub supports_temperature: bool,
    /// `top_p`, `n`, `presence_penalty`, `frequency_penalty`, `logit_bias`,
    /// `logprobs`.
    pub supports_sampling_params: bool,
    pub uses_max_completion_tokens: bool,
    pub is_reasoning_model: bool,
    pub default_system_role: SystemRole,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            supports_temperature: true,
            supports_sampling_params: true,
            uses_max_completion_tokens: false,
            is_reasoning_model: false,
            default_system_role: SystemRole::System,
        }
    }
}

impl ModelCapabilities {
    /// Name of the output-length limit field for this model.
    pub fn max_tokens_field(&self) -> &'static str {
        if self.uses_max_completion_tokens {
            "max_completion_tokens"
        } else {
            "max_tokens"
        }
    }
}

/// Returns the capability flags for a model identifier.
///
/// Total: unknown models get the permissive defaults.
pub fn resolve(model: &str) -> ModelCapabilities {
    let mut caps = ModelCapabilities::default();

    if contains_any(model, REASONING_MARKERS) {
        caps.is_reasoning_model = true;
        caps.supports_temperature = false;
        caps.supports_sampling_params = false;
        caps.uses_max_completion_tokens = true;
    }

    // Kept apart from the reasoning check: the two axes only overlap on gpt-5
    // today.
    if contains_any(model, DEVELOPER_ROLE_MARKERS) {
        caps.default_system_role = SystemRole::Developer;
    }

    caps
}

pub fn is_reasoning_model(model: &str) -> bool {
    resolve(model).is_reasoning_model
}

fn contains_any(model: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| model.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_chat_model_is_permissive() {
        let caps = resolve("gpt-4");
        assert!(!caps.is_reasoning_model);
        assert!(caps.supports_temperature);
        assert!(caps.supports_sampling_params);
        assert!(!caps.uses_max_completion_tokens);
        assert_eq!(caps.default_system_role, SystemRole::System);
        assert_eq!(caps.max_tokens_field(), "max_tokens");
    }

    #[test]
    fn o_series_is_reasoning_with_system_role() {
        let caps = resolve("o3-mini");
        assert!(caps.is_reasoning_model);
        assert!(!caps.supports_temperature);
        assert!(!caps.supports_sampling_params);
        assert!(caps.uses_max_completion_tokens);
        assert_eq!(caps.default_system_role, SystemRole::System);
        assert_eq!(caps.max_tokens_field(), "max_completion_tokens");
    }

    #[test]
    fn gpt5_is_reasoning_and_prefers_developer() {
        let caps = resolve("gpt-5.2-pro");
        assert!(caps.is_reasoning_model);
        assert_eq!(caps.default_system_role, SystemRole::Developer);
    }

    #[test]
    fn gpt41_prefers_developer_but_keeps_sampling() {
        let caps = resolve("gpt-4.1-nano");
        assert!(!caps.is_reasoning_model);
        assert!(caps.supports_temperature);
        assert_eq!(caps.default_system_role, SystemRole::Developer);
    }

    #[test]
    fn o4_mini_matches_but_bare_o4_does_not() {
        assert!(is_reasoning_model("o4-mini"));
        assert!(!is_reasoning_model("gpt-4o"));
    }

    #[test]
    fn substring_match_over_matches_unrelated_ids() {
        // "o1" appears inside the identifier, so it is classified as reasoning.
        assert!(is_reasoning_model("custom-fo1d-model"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!is_reasoning_model("GPT-5"));
        assert!(!is_reasoning_model("O3-MINI"));
    }

    #[test]
    fn unknown_and_empty_models_get_defaults() {
        assert_eq!(resolve(""), ModelCapabilities::default());
        assert_eq!(resolve("llama-3-70b"), ModelCapabilities::default());
    }

    #[test]
    fn resolve_is_deterministic() {
        assert_eq!(resolve("gpt-5-mini"), resolve("gpt-5-mini"));
    }
}
