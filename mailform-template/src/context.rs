//! Ambient render state.

use parking_lot::RwLock;
use tracing::debug;

/// Language used when no other is configured.
pub const DEFAULT_LANGUAGE: &str = "en";

/// State shared by every render issued through one caller.
///
/// Holds the active language. A render may override it for its own duration
/// with [`RenderContext::override_language`]; the previous language comes
/// back when the returned guard drops, whichever way the render exits.
#[derive(Debug)]
pub struct RenderContext {
    language: RwLock<String>,
}

impl RenderContext {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: RwLock::new(language.into()),
        }
    }

    /// Currently active language.
    pub fn language(&self) -> String {
        self.language.read().clone()
    }

    /// Replace the active language until the guard drops.
    #[must_use = "the previous language is restored as soon as the guard drops"]
    pub fn override_language(&self, language: impl Into<String>) -> LanguageGuard<'_> {
        let language = language.into();
        let previous = std::mem::replace(&mut *self.language.write(), language.clone());
        debug!(from = %previous, to = %language, "Language override");
        LanguageGuard {
            context: self,
            previous: Some(previous),
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

/// Restores the overridden language on drop.
#[derive(Debug)]
pub struct LanguageGuard<'a> {
    context: &'a RenderContext,
    previous: Option<String>,
}

impl Drop for LanguageGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.context.language.write() = previous;
        }
    }
}
