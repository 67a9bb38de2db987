/// Convenient result alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors that can occur while checking for or applying an update.
///
/// None of these is fatal to the process: the update client converts each
/// into an `Error` event, reschedules the periodic check, and carries on.
#[derive(thiserror::Error, Debug)]
pub enum UpdateError {
    /// Network request to the feed or artifact host failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The feed rejected the check parameters.
    #[error("feed rejected the request (missing or invalid parameters)")]
    BadRequest,
    /// The feed answered 200 with a body the client could not use.
    #[error("malformed feed response: {0}")]
    MalformedResponse(String),
    /// The artifact host served an unexpected content type.
    #[error("unexpected content type: {0}")]
    ContentTypeMismatch(String),
    /// Writing the downloaded artifact to the temporary path failed.
    #[error("failed to write update artifact: {0}")]
    Write(#[source] std::io::Error),
    /// The privileged install command exited with a failure.
    #[error("failed to apply update: {0}")]
    Install(String),
    /// The embedded differential-update tool failed or printed output the
    /// client could not interpret.
    #[error("differential update failed: {0}")]
    Subprocess(String),
    /// No feed URL is configured for this platform.
    #[error("no feed URL configured")]
    MissingFeedUrl,
    /// Attempted an operation the current platform has no mechanism for.
    #[error("unsupported operation on this platform: {0}")]
    Unsupported(&'static str),
    /// The updater runtime has shut down.
    #[error("updater runtime is offline")]
    Offline,
}
