//! Copy the current alert to the system clipboard via `arboard`.
//!
//! A short-lived [`arboard::Clipboard`] handle is opened per call;
//! `arboard::Clipboard` is not `Send` on all platforms.

use arboard::Clipboard;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Could not open the system clipboard.
    #[error("cannot access clipboard: {0}")]
    Access(String),

    /// The clipboard was opened but writing failed.
    #[error("cannot write to clipboard: {0}")]
    Set(String),
}

/// Replace the clipboard text with `text`.
///
/// Blank text is not copied and the clipboard is left untouched; returns
/// `Ok(false)` in that case and `Ok(true)` after a successful copy.
pub fn copy_to_clipboard(text: &str) -> Result<bool, ClipboardError> {
    if text.trim().is_empty() {
        log::debug!("clipboard: nothing to copy");
        return Ok(false);
    }

    let mut clipboard = Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;
    clipboard
        .set_text(text)
        .map_err(|e| ClipboardError::Set(e.to_string()))?;

    log::debug!("clipboard: copied {} chars", text.chars().count());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_a_noop() {
        assert!(!copy_to_clipboard("").unwrap());
        assert!(!copy_to_clipboard("  \n ").unwrap());
    }

    #[test]
    fn errors_display_cause() {
        let err = ClipboardError::Access("no display".into());
        assert_eq!(err.to_string(), "cannot access clipboard: no display");
    }
}
