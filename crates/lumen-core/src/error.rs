use thiserror::Error;

/// Failures at the boundary between the engine and its host page.
///
/// Nothing here is fatal to the page: callers fall back (observation to
/// polling) or log and leave media in its current state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LazyLoadError {
    #[error("no global `window` is available")]
    NoWindow,

    #[error("window has no document")]
    NoDocument,

    #[error("{0} is not supported by this host")]
    Unsupported(&'static str),

    #[error("host call `{call}` failed: {message}")]
    Host { call: &'static str, message: String },
}

impl LazyLoadError {
    pub fn host(call: &'static str, message: impl Into<String>) -> Self {
        Self::Host {
            call,
            message: message.into(),
        }
    }
}
