//! Internal helpers for name normalization.

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

const MAX_TEMPLATE_NAME_CHARS: usize = 120;

/// Canonical display form of a template name: NFC, trimmed, inner whitespace
/// collapsed to single spaces.
pub(crate) fn normalize_template_name(raw: &str) -> ResultEngine<String> {
    let composed: String = raw.nfc().collect();
    let name = composed.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(EngineError::InvalidName(
            "template name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_TEMPLATE_NAME_CHARS {
        return Err(EngineError::InvalidName(format!(
            "template name must be at most {MAX_TEMPLATE_NAME_CHARS} characters"
        )));
    }
    Ok(name)
}
