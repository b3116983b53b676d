//! The model allow-list.
//!
//! Only a small, fixed set of free OpenRouter models may be selected. Each entry
//! pairs a human-readable label with the identifier sent to the API. The user can
//! refer to a model either way:
//! ```text
//! <model spec> := <model identifier> | <label>
//! ```
//! Labels are matched case-insensitively, identifiers exactly. When no model is
//! requested, the first entry of the catalog is used.

use lazy_static::lazy_static;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum Error {
    /// The requested model is not part of the allow-list
    #[error("model \"{0}\" is not one of the available models")]
    ModelNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub(crate) struct Model {
    /// The label shown to the user
    pub label: &'static str,
    /// The identifier sent to the completion endpoint
    pub id: &'static str,
}

lazy_static! {
    // OpenRouter rotates its free tier, so this list has to be kept up to date by hand.
    pub(crate) static ref MODELS: [Model; 3] = [
        Model {
            label: "Mistral 7B (Free)",
            id: "mistralai/mistral-7b-instruct:free",
        },
        Model {
            label: "DeepSeek V3 (Free)",
            id: "deepseek/deepseek-chat-v3-0324:free",
        },
        Model {
            label: "Llama 3.1 8B (Free)",
            id: "meta-llama/llama-3.1-8b-instruct:free",
        },
    ];
}

/// The model used when none is requested
pub(crate) fn default_model() -> &'static Model {
    &MODELS[0]
}

/// Resolves a model spec against the allow-list.
pub(crate) fn resolve(spec: Option<&str>) -> Result<&'static Model, Error> {
    let spec = match spec.map(str::trim) {
        Some(spec) if !spec.is_empty() => spec,
        _ => return Ok(default_model()),
    };

    MODELS
        .iter()
        .find(|m| m.id == spec || m.label.eq_ignore_ascii_case(spec))
        .ok_or_else(|| Error::ModelNotFound(spec.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_first_entry() {
        assert_eq!(resolve(None).unwrap().id, "mistralai/mistral-7b-instruct:free");
        assert_eq!(resolve(Some("  ")).unwrap(), default_model());
    }

    #[test]
    fn test_resolve_by_id() {
        let model = resolve(Some("deepseek/deepseek-chat-v3-0324:free")).unwrap();

        assert_eq!(model.label, "DeepSeek V3 (Free)");
    }

    #[test]
    fn test_resolve_by_label_ignores_case() {
        let model = resolve(Some("llama 3.1 8b (free)")).unwrap();

        assert_eq!(model.id, "meta-llama/llama-3.1-8b-instruct:free");
    }

    #[test]
    fn test_unknown_model() {
        let err = resolve(Some("openai/gpt-4o")).unwrap_err();

        assert!(matches!(err, Error::ModelNotFound(ref spec) if spec == "openai/gpt-4o"));
        assert_eq!(
            err.to_string(),
            "model \"openai/gpt-4o\" is not one of the available models"
        );
    }
}
