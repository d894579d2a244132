use std::error::Error as StdError;
use std::fmt::{self, Display};

/// Returned when the user edits an [`InputBuffer`] that voice capture
/// currently writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReadOnlyInput;

impl Display for ReadOnlyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "the input is being written by voice capture")
    }
}

impl StdError for ReadOnlyInput {}

/// The text the user is composing.
///
/// The buffer has a single writer at any time. While voice capture runs
/// it is read-only for the user and only the capture controller writes it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    read_only: bool,
}

impl InputBuffer {
    /// Creates a buffer holding `text`.
    #[inline]
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            read_only: false,
        }
    }

    /// Returns the current text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` while the user cannot edit the buffer.
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Replaces the text on behalf of the user.
    pub fn set_text<S: Into<String>>(
        &mut self,
        text: S,
    ) -> Result<(), ReadOnlyInput> {
        self.check_writable()?;
        self.text = text.into();
        Ok(())
    }

    /// Takes the text out for submission, leaving the buffer empty.
    pub fn take(&mut self) -> Result<String, ReadOnlyInput> {
        self.check_writable()?;
        Ok(std::mem::take(&mut self.text))
    }

    pub(crate) fn replace(&mut self, text: String) {
        self.text = text;
    }

    pub(crate) fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    #[inline]
    fn check_writable(&self) -> Result<(), ReadOnlyInput> {
        if self.read_only {
            return Err(ReadOnlyInput);
        }
        Ok(())
    }
}
