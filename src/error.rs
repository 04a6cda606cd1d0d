//! Error taxonomy for the data-access layer.
//!
//! "Entity not found" is deliberately NOT here: a profile that was never
//! registered decodes to `Profile { exists: false }` and an unknown post to
//! `None`. Only genuine failures travel through `ClientError`.

use thiserror::Error;

/// Top-level error type surfaced to callers of the library.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A write was attempted without an active wallet session. Raised
    /// before any network call is made.
    #[error("wallet not connected")]
    WalletNotConnected,

    /// The contract rejected the call with one of its named errors.
    #[error("contract reverted: {0}")]
    ChainCallReverted(ContractError),

    /// Transport-level failure: HTTP error, timeout, malformed response.
    #[error("chain call failed: {0}")]
    ChainCallFailed(String),

    /// Off-chain metadata could not be fetched or parsed.
    #[error("metadata unavailable for {uri}: {reason}")]
    MetadataUnavailable { uri: String, reason: String },

    /// The pinning service refused or failed an upload.
    #[error("upload failed ({status}): {message}")]
    UploadFailed { status: u16, message: String },

    /// A required configuration value is absent. Checked at startup so the
    /// failure is descriptive instead of an opaque network error later.
    #[error("missing configuration: {0}")]
    ConfigurationMissing(&'static str),

    /// Client-side validation rejected the input before submission.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// True when the underlying cause is the given named contract error.
    pub fn is_revert(&self, err: &ContractError) -> bool {
        matches!(self, ClientError::ChainCallReverted(e) if e == err)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::ChainCallFailed(e.to_string())
    }
}

/// Named error conditions declared by the social-graph contract ABI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("user already registered")]
    UserAlreadyRegistered,
    #[error("username already taken")]
    UsernameExists,
    #[error("user not registered")]
    UserNotRegistered,
    #[error("post not found")]
    PostNotFound,
    #[error("sender is not the author of the post")]
    NotAuthor,
    #[error("post already liked")]
    AlreadyLiked,
    #[error("post already disliked")]
    AlreadyDisliked,
    #[error("post already reported")]
    AlreadyReported,
    #[error("cannot follow yourself")]
    CannotFollowSelf,
    #[error("cannot unfollow yourself")]
    CannotUnfollowSelf,
    #[error("already following this user")]
    AlreadyFollowing,
    #[error("not following this user")]
    NotFollowing,
    #[error("post has interactions and can no longer be updated")]
    PostHasInteraction,
    /// Revert the gateway could not decode into a known name.
    #[error("unrecognized contract error: {0}")]
    Unknown(String),
}

impl ContractError {
    /// Decode the contract's camelCase error name (as carried in revert
    /// data) into a variant. Unrecognized names are preserved verbatim.
    pub fn from_name(name: &str) -> Self {
        match name {
            "userAlreadyRegistered" => ContractError::UserAlreadyRegistered,
            "usernameExists" => ContractError::UsernameExists,
            "userNotRegistered" => ContractError::UserNotRegistered,
            "postNotFound" => ContractError::PostNotFound,
            "senderIsNotAuthorOfPost" => ContractError::NotAuthor,
            "alreadyLikedPost" => ContractError::AlreadyLiked,
            "alreadyDislikedPost" => ContractError::AlreadyDisliked,
            "alreadyReportedPost" => ContractError::AlreadyReported,
            "canNotFollowYourself" => ContractError::CannotFollowSelf,
            "canNotUnFollowYourself" => ContractError::CannotUnfollowSelf,
            "alreadyFollowing" => ContractError::AlreadyFollowing,
            "notFollowing" => ContractError::NotFollowing,
            "canNotUpdatePostThatHasUserInteraction" => ContractError::PostHasInteraction,
            other => ContractError::Unknown(other.to_string()),
        }
    }
}
