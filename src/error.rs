// One error type for the whole tool.
// Every variant states *where* things went wrong.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The capture target is gone (window closed, minimised, zero-sized).
    /// The session reacts by re-resolving the target; it is never retried silently.
    #[error("capture target unavailable: {0}")]
    CaptureUnavailable(String),

    /// Grabbing or converting pixels failed for a target that still exists.
    #[error("capture error: {0}")]
    Capture(String),

    /// Creating the debug window failed
    #[error("window init error: {0}")]
    WindowInit(String),

    /// Updating the debug window buffer failed
    #[error("window update error: {0}")]
    WindowUpdate(String),

    /// Sending pointer/key events (or reading the pointer back) failed
    #[error("input error: {0}")]
    Input(String),

    /// Config file could not be read, parsed or validated
    #[error("config error: {0}")]
    Config(String),

    /// Installing the Ctrl-C handler failed
    #[error("interrupt handler error: {0}")]
    Interrupt(String),
}

impl Error {
    /// True when the loop driver should fall back to a different target.
    pub fn is_target_lost(&self) -> bool {
        matches!(self, Error::CaptureUnavailable(_))
    }
}
