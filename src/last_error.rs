//! Last Error



use crate::Error;



/// The most recent failure recorded by a [`MemoryMap`](crate::MemoryMap).
///
/// Successful operations never clear it, so a message left over from an earlier failure stays
/// readable after later calls succeed. Check the `bool` an operation returns before trusting it.
#[derive(Debug, Default)]
pub struct LastError {
    error: Option<Error>,
    message: String,
}

impl LastError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the recorded failure with `error`.
    pub fn set(&mut self, error: Error) {
        self.message = error.to_string();
        self.error = Some(error);
    }

    pub fn clear(&mut self) {
        self.error = None;
        self.message.clear();
    }

    /// The recorded message, or `""` if nothing has failed yet.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.error.is_some()
    }
}
