//! Decoded record types for the contract boundary.
//!
//! The contract returns positional tuples; every read gets an explicit
//! decoder here so field names are fixed in one place and positional-index
//! mistakes cannot leak upward.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A 20-byte account identifier. Stored in canonical lower-case hex form;
/// equality and hashing are therefore case-insensitive.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

#[derive(Debug, thiserror::Error)]
#[error("invalid address '{0}': expected 0x-prefixed 40 hex chars")]
pub struct InvalidAddress(String);

impl Address {
    pub const ZERO: &'static str = "0x0000000000000000000000000000000000000000";

    pub fn parse(s: &str) -> Result<Self, InvalidAddress> {
        let lower = s.trim().to_ascii_lowercase();
        let hex = lower
            .strip_prefix("0x")
            .ok_or_else(|| InvalidAddress(s.to_string()))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidAddress(s.to_string()));
        }
        Ok(Address(lower))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The all-zero address, used by wallets and routes as "no account".
    pub fn is_zero(&self) -> bool {
        self.0 == Self::ZERO
    }
}

impl std::str::FromStr for Address {
    type Err = InvalidAddress;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddress;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Address::parse(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> String {
        a.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

/// Canonical post identifier: a small sequential integer.
///
/// One feed path on the contract returns opaque bytes32 identifiers
/// instead; those are treated as a legacy encoding and folded onto the
/// canonical id by taking the low 64 bits (see DESIGN.md).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl PostId {
    /// Decode an id from a contract return value: a JSON number, a decimal
    /// string, or a 0x-prefixed hex word (legacy encoding).
    pub fn decode(v: &Value) -> Result<Self, ClientError> {
        if let Some(n) = v.as_u64() {
            return Ok(PostId(n));
        }
        if let Some(s) = v.as_str() {
            if let Some(hex) = s.strip_prefix("0x") {
                // Legacy bytes32 id: low 64 bits carry the sequential id.
                // Validate before slicing; this is untrusted chain data.
                if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(ClientError::ChainCallFailed(format!("bad post id '{s}'")));
                }
                let tail = &hex[hex.len().saturating_sub(16)..];
                let n = u64::from_str_radix(tail, 16)
                    .map_err(|_| ClientError::ChainCallFailed(format!("bad post id '{s}'")))?;
                return Ok(PostId(n));
            }
            if let Ok(n) = s.parse::<u64>() {
                return Ok(PostId(n));
            }
        }
        Err(ClientError::ChainCallFailed(format!("bad post id {v}")))
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user. A non-existent profile is `exists: false`, never an
/// error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub bio: String,
    pub reputation: i64,
    pub exists: bool,
    pub post_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
}

impl Profile {
    pub fn absent() -> Self {
        Profile::default()
    }

    /// Decode the `getUserProfile` return tuple:
    /// `(username, bio, reputation, postCount, followersCount, followingCount)`.
    /// An empty tuple or empty username means the address was never
    /// registered.
    pub fn from_tuple(v: &Value) -> Result<Self, ClientError> {
        let Some(tuple) = v.as_array() else {
            return Ok(Profile::absent());
        };
        let username = tuple_str(tuple, 0);
        if username.is_empty() {
            return Ok(Profile::absent());
        }
        Ok(Profile {
            username,
            bio: tuple_str(tuple, 1),
            reputation: tuple_i64(tuple, 2)?,
            exists: true,
            post_count: tuple_u64(tuple, 3)?,
            followers_count: tuple_u64(tuple, 4)?,
            following_count: tuple_u64(tuple, 5)?,
        })
    }
}

/// An on-chain content reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: Address,
    pub content_uri: String,
    pub timestamp: u64,
    /// Human-readable local time derived from `timestamp`.
    pub when: String,
    pub like_count: u64,
    pub dislike_count: u64,
    pub report_count: u64,
}

impl Post {
    /// Decode the `getPostDetails` return tuple:
    /// `(author, contentURI, timestamp, likeCount, dislikeCount, reportCount)`.
    /// A zero author means the post does not exist.
    pub fn from_tuple(id: PostId, v: &Value) -> Result<Option<Self>, ClientError> {
        let Some(tuple) = v.as_array() else {
            return Ok(None);
        };
        if tuple.is_empty() {
            return Ok(None);
        }
        let author = Address::parse(&tuple_str(tuple, 0))
            .map_err(|e| ClientError::ChainCallFailed(e.to_string()))?;
        if author.is_zero() {
            return Ok(None);
        }
        let timestamp = tuple_u64(tuple, 2)?;
        Ok(Some(Post {
            id,
            author,
            content_uri: tuple_str(tuple, 1),
            timestamp,
            when: format_timestamp(timestamp),
            like_count: tuple_u64(tuple, 3)?,
            dislike_count: tuple_u64(tuple, 4)?,
            report_count: tuple_u64(tuple, 5)?,
        }))
    }
}

/// A user's relation to one post. At most one non-`None` kind per
/// (user, post) pair; the contract keeps like/dislike mutually exclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionKind {
    #[default]
    None,
    Liked,
    Disliked,
    Reported,
}

impl InteractionKind {
    pub fn decode(v: &Value) -> Result<Self, ClientError> {
        let n = match v.as_u64() {
            Some(n) => n,
            None => v
                .as_str()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(|| ClientError::ChainCallFailed(format!("bad interaction {v}")))?,
        };
        Ok(match n {
            0 => InteractionKind::None,
            1 => InteractionKind::Liked,
            2 => InteractionKind::Disliked,
            3 => InteractionKind::Reported,
            other => {
                return Err(ClientError::ChainCallFailed(format!(
                    "unknown interaction kind {other}"
                )))
            }
        })
    }
}

/// Off-chain JSON fetched from a post's content URI.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostMetadata {
    pub title: String,
    pub description: String,
    pub content_url: String,
    pub content_hash: String,
    pub tags: Vec<String>,
    pub timestamp: u64,
    pub version: u32,
}

/// Result of pinning content: the content-derived hash plus a retrieval URL
/// on the configured gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub ipfs_hash: String,
    pub size: u64,
    pub timestamp: String,
    pub url: String,
}

/// A confirmed transaction. `write` only returns once this is observed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub success: bool,
}

/// Format a unix timestamp (seconds) as local wall-clock time.
pub fn format_timestamp(secs: u64) -> String {
    use chrono::{Local, TimeZone, Utc};
    let dt = Utc
        .timestamp_opt(secs as i64, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
    dt.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn tuple_str(tuple: &[Value], idx: usize) -> String {
    tuple
        .get(idx)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn tuple_u64(tuple: &[Value], idx: usize) -> Result<u64, ClientError> {
    let Some(v) = tuple.get(idx) else {
        return Ok(0);
    };
    if v.is_null() {
        return Ok(0);
    }
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| {
            ClientError::ChainCallFailed(format!("expected number at index {idx}, got {v}"))
        })
}

fn tuple_i64(tuple: &[Value], idx: usize) -> Result<i64, ClientError> {
    let Some(v) = tuple.get(idx) else {
        return Ok(0);
    };
    if v.is_null() {
        return Ok(0);
    }
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| {
            ClientError::ChainCallFailed(format!("expected integer at index {idx}, got {v}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_equality_is_case_insensitive() {
        let a = Address::parse("0x59AB2D6BA01CD5684AED34893B2AE5566ACF3EF7").unwrap();
        let b = Address::parse("0x59ab2d6ba01cd5684aed34893b2ae5566acf3ef7").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "0x59ab2d6ba01cd5684aed34893b2ae5566acf3ef7");
    }

    #[test]
    fn address_rejects_malformed_input() {
        assert!(Address::parse("59ab2d6b").is_err());
        assert!(Address::parse("0x59ab").is_err());
        assert!(Address::parse("0xzz_b2d6ba01cd5684aed34893b2ae5566acf3ef7").is_err());
    }

    #[test]
    fn zero_address_is_detected() {
        let z = Address::parse(Address::ZERO).unwrap();
        assert!(z.is_zero());
    }

    #[test]
    fn post_id_decodes_all_encodings() {
        assert_eq!(PostId::decode(&json!(7)).unwrap(), PostId(7));
        assert_eq!(PostId::decode(&json!("42")).unwrap(), PostId(42));
        // Legacy bytes32 encoding carries the id in the low 64 bits.
        let legacy =
            json!("0x000000000000000000000000000000000000000000000000000000000000002a");
        assert_eq!(PostId::decode(&legacy).unwrap(), PostId(42));
    }

    #[test]
    fn post_id_rejects_malformed_hex_without_panicking() {
        assert!(PostId::decode(&json!("0x€€€€€€")).is_err());
        assert!(PostId::decode(&json!("0x")).is_err());
        assert!(PostId::decode(&json!("0xzz12")).is_err());
        assert!(PostId::decode(&json!(null)).is_err());
    }

    #[test]
    fn profile_empty_tuple_decodes_as_absent() {
        let p = Profile::from_tuple(&json!([])).unwrap();
        assert!(!p.exists);
        let p = Profile::from_tuple(&json!(["", "", 0, 0, 0, 0])).unwrap();
        assert!(!p.exists);
    }

    #[test]
    fn profile_tuple_decodes_named_fields() {
        let v = json!(["alice", "hi", -3, 5, "12", 8]);
        let p = Profile::from_tuple(&v).unwrap();
        assert!(p.exists);
        assert_eq!(p.username, "alice");
        assert_eq!(p.bio, "hi");
        assert_eq!(p.reputation, -3);
        assert_eq!(p.post_count, 5);
        assert_eq!(p.followers_count, 12);
        assert_eq!(p.following_count, 8);
    }

    #[test]
    fn post_zero_author_decodes_as_absent() {
        let v = json!([Address::ZERO, "ipfs://x", 0, 0, 0, 0]);
        assert!(Post::from_tuple(PostId(1), &v).unwrap().is_none());
    }

    #[test]
    fn interaction_kind_decodes() {
        assert_eq!(
            InteractionKind::decode(&json!(2)).unwrap(),
            InteractionKind::Disliked
        );
        assert!(InteractionKind::decode(&json!(9)).is_err());
    }

    #[test]
    fn metadata_parses_camel_case_with_defaults() {
        let m: PostMetadata = serde_json::from_value(json!({
            "title": "t",
            "contentUrl": "https://gateway.pinata.cloud/ipfs/Qm123"
        }))
        .unwrap();
        assert_eq!(m.title, "t");
        assert_eq!(m.content_url, "https://gateway.pinata.cloud/ipfs/Qm123");
        assert!(m.tags.is_empty());
    }
}
