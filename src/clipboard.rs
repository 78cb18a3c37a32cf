//! Clipboard access for the panel actions.
//!
//! The panel talks to a [`Clipboard`] trait so the same controller can run
//! against the system clipboard (`arboard`), a browser's permission-gated
//! async clipboard, or an in-memory double in tests.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard backend error: {0}")]
    Backend(#[from] arboard::Error),
    #[error("clipboard permission denied")]
    PermissionDenied,
    #[error("clipboard is not available")]
    Unavailable,
}

pub trait Clipboard {
    /// Cheap check that a read would be allowed. Used before offering the
    /// paste panel.
    fn probe(&mut self) -> bool;

    fn read_text(&mut self) -> Result<String, ClipboardError>;

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The operating system clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn probe(&mut self) -> bool {
        available()
    }

    fn read_text(&mut self) -> Result<String, ClipboardError> {
        get()
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        set(text)
    }
}

/// Read the clipboard as a `String`.
pub fn get() -> Result<String, ClipboardError> {
    let mut cb = arboard::Clipboard::new()?;
    cb.get_text().map_err(ClipboardError::from)
}

/// Set the system clipboard to `text`.
pub fn set(text: &str) -> Result<(), ClipboardError> {
    let mut cb = arboard::Clipboard::new()?;
    cb.set_text(text.to_owned()).map_err(ClipboardError::from)
}

/// Try to create a clipboard instance to detect availability.
pub fn available() -> bool {
    arboard::Clipboard::new().is_ok()
}

/// In-process clipboard with switchable read/write permissions.
#[derive(Debug, Clone)]
pub struct MemoryClipboard {
    contents: Option<String>,
    can_read: bool,
    can_write: bool,
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self {
            contents: None,
            can_read: true,
            can_write: true,
        }
    }

    pub fn with_contents(text: &str) -> Self {
        Self {
            contents: Some(text.to_string()),
            ..Self::new()
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    pub fn deny_read(&mut self) {
        self.can_read = false;
    }

    pub fn deny_write(&mut self) {
        self.can_write = false;
    }
}

impl Clipboard for MemoryClipboard {
    fn probe(&mut self) -> bool {
        self.can_read
    }

    fn read_text(&mut self) -> Result<String, ClipboardError> {
        if !self.can_read {
            return Err(ClipboardError::PermissionDenied);
        }
        Ok(self.contents.clone().unwrap_or_default())
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if !self.can_write {
            return Err(ClipboardError::PermissionDenied);
        }
        self.contents = Some(text.to_string());
        Ok(())
    }
}

impl<T: Clipboard + ?Sized> Clipboard for &mut T {
    fn probe(&mut self) -> bool {
        (**self).probe()
    }

    fn read_text(&mut self) -> Result<String, ClipboardError> {
        (**self).read_text()
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        (**self).write_text(text)
    }
}
