//! High-level client for the social-graph contract: typed reads served
//! through the cache coordinator, typed writes followed by their declared
//! invalidation set, and composition with the pinning service for post
//! creation.

use crate::abi::{self, keys, WriteKind};
use crate::cache::{CacheKey, QueryCache};
use crate::config::Config;
use crate::error::{ClientError, ContractError};
use crate::feed::{paginate, FeedSource};
use crate::gateway::ContractGateway;
use crate::media::{self, MediaKind, Probe};
use crate::pinning::PinningClient;
use crate::transport::{ChainTransport, HttpTransport};
use crate::types::{
    Address, InteractionKind, Post, PostId, PostMetadata, Profile, TxReceipt, UploadReceipt,
};
use crate::wallet::WalletSession;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// How many ids one feed read pulls from the contract before client-side
/// pagination takes over.
const FEED_SCAN_LIMIT: u64 = 1000;

/// A post's off-chain payload, resolved for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct PostMedia {
    pub metadata: PostMetadata,
    pub kind: MediaKind,
}

pub struct SocialClient {
    gateway: ContractGateway,
    cache: QueryCache,
    session: Arc<WalletSession>,
    pinning: Option<PinningClient>,
    chain_id: u64,
    posts_per_page: usize,
    fetch_concurrency: usize,
    media_timeout_ms: u64,
}

impl SocialClient {
    /// Build a client over the HTTP transport described by `cfg`.
    pub fn new(cfg: &Config) -> Result<Self, ClientError> {
        let transport: Arc<dyn ChainTransport> = Arc::new(HttpTransport::new(
            cfg.rpc_url.clone(),
            cfg.chain_id,
            cfg.rpc_timeout_ms,
        ));
        Self::with_transport(cfg, transport)
    }

    /// Build a client over a caller-supplied transport (tests use this to
    /// substitute a mock chain).
    pub fn with_transport(
        cfg: &Config,
        transport: Arc<dyn ChainTransport>,
    ) -> Result<Self, ClientError> {
        let session = Arc::new(WalletSession::new());
        if let Some(addr) = &cfg.wallet_address {
            session.connect(addr.clone());
        }
        let pinning = match cfg.pinata_jwt.as_deref().filter(|j| !j.is_empty()) {
            Some(jwt) => Some(PinningClient::new(
                Some(jwt),
                &cfg.pinata_gateway,
                cfg.rpc_timeout_ms,
            )?),
            None => None,
        };
        let chain_id = transport.chain_id();
        Ok(SocialClient {
            gateway: ContractGateway::new(
                transport,
                cfg.contract_address.clone(),
                session.clone(),
            )
            .with_receipt_poll_ms(cfg.receipt_poll_ms),
            cache: QueryCache::new(Duration::from_millis(cfg.cache_ttl_ms)),
            session,
            pinning,
            chain_id,
            posts_per_page: cfg.posts_per_page,
            fetch_concurrency: cfg.fetch_concurrency,
            media_timeout_ms: cfg.media_timeout_ms,
        })
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn pinning(&self) -> Option<&PinningClient> {
        self.pinning.as_ref()
    }

    pub fn posts_per_page(&self) -> usize {
        self.posts_per_page
    }

    fn key(&self, name: &'static str, args: impl IntoIterator<Item = String>) -> CacheKey {
        CacheKey::new(name, args, self.chain_id)
    }

    // ---- reads ----------------------------------------------------------

    /// A user's profile. A never-registered address is `exists: false`,
    /// not an error.
    pub async fn profile(&self, address: &Address) -> Result<Profile, ClientError> {
        let gateway = &self.gateway;
        let args = json!([address]);
        let v = self
            .cache
            .query(self.key(keys::PROFILE, [address.to_string()]), || async move {
                match gateway.read(abi::GET_USER_PROFILE, args).await {
                    Err(ClientError::ChainCallReverted(ContractError::UserNotRegistered)) => {
                        Ok(json!([]))
                    }
                    other => other,
                }
            })
            .await?;
        Profile::from_tuple(&v)
    }

    pub async fn reputation(&self, address: &Address) -> Result<i64, ClientError> {
        let gateway = &self.gateway;
        let args = json!([address]);
        let v = self
            .cache
            .query(self.key(keys::REPUTATION, [address.to_string()]), || async move {
                match gateway.read(abi::GET_REPUTATION_SCORE, args).await {
                    Err(ClientError::ChainCallReverted(ContractError::UserNotRegistered)) => {
                        Ok(json!(0))
                    }
                    other => other,
                }
            })
            .await?;
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| ClientError::ChainCallFailed(format!("bad reputation {v}")))
    }

    /// Whether the connected account follows `target`. Without a session
    /// there is no edge to ask about.
    pub async fn is_following(&self, target: &Address) -> Result<bool, ClientError> {
        let Some(caller) = self.session.current() else {
            return Ok(false);
        };
        let gateway = &self.gateway;
        let args = json!([target]);
        let v = self
            .cache
            .query(
                self.key(
                    keys::IS_FOLLOWING,
                    [caller.to_string(), target.to_string()],
                ),
                || async move { gateway.read(abi::IS_FOLLOWING, args).await },
            )
            .await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    pub async fn followers(&self, address: &Address) -> Result<Vec<Address>, ClientError> {
        let gateway = &self.gateway;
        let args = json!([address]);
        let v = self
            .cache
            .query(self.key(keys::FOLLOWERS, [address.to_string()]), || async move {
                gateway.read(abi::GET_FOLLOWERS, args).await
            })
            .await?;
        addresses_from(&v)
    }

    pub async fn following(&self, address: &Address) -> Result<Vec<Address>, ClientError> {
        let gateway = &self.gateway;
        let args = json!([address]);
        let v = self
            .cache
            .query(self.key(keys::FOLLOWING, [address.to_string()]), || async move {
                gateway.read(abi::GET_FOLLOWING, args).await
            })
            .await?;
        addresses_from(&v)
    }

    /// The connected account's interaction with a post. Caller-specific:
    /// the account rides along as call context and is part of the cache key.
    pub async fn interaction(&self, id: PostId) -> Result<InteractionKind, ClientError> {
        let Some(caller) = self.session.current() else {
            return Ok(InteractionKind::None);
        };
        let gateway = &self.gateway;
        let args = json!([id]);
        let v = self
            .cache
            .query(
                self.key(keys::INTERACTION, [id.to_string(), caller.to_string()]),
                || async move { gateway.read(abi::GET_INTERACTION_TYPE, args).await },
            )
            .await?;
        InteractionKind::decode(&v)
    }

    /// Full details of one post, or `None` for a post that does not exist.
    pub async fn post_details(&self, id: PostId) -> Result<Option<Post>, ClientError> {
        let gateway = &self.gateway;
        let args = json!([id]);
        let v = self
            .cache
            .query(self.key(keys::POST, [id.to_string()]), || async move {
                match gateway.read(abi::GET_POST_DETAILS, args).await {
                    Err(ClientError::ChainCallReverted(ContractError::PostNotFound)) => {
                        Ok(Value::Null)
                    }
                    other => other,
                }
            })
            .await?;
        if v.is_null() {
            return Ok(None);
        }
        Post::from_tuple(id, &v)
    }

    /// Ids of one account's posts, newest first.
    pub async fn user_posts(&self, address: &Address) -> Result<Vec<PostId>, ClientError> {
        let gateway = &self.gateway;
        let args = json!([address]);
        let v = self
            .cache
            .query(self.key(keys::USER_POSTS, [address.to_string()]), || async move {
                gateway.read(abi::GET_USER_POSTS, args).await
            })
            .await?;
        ids_from(&v)
    }

    /// All post ids, descending by recency.
    pub async fn global_feed_ids(&self) -> Result<Vec<PostId>, ClientError> {
        let gateway = &self.gateway;
        let args = json!([1, FEED_SCAN_LIMIT]);
        let v = self
            .cache
            .query(self.key(keys::GLOBAL_FEED, Vec::new()), || async move {
                gateway.read(abi::FETCH_GLOBAL_POSTS, args).await
            })
            .await?;
        ids_from(&v)
    }

    /// Post ids from accounts the connected account follows. Empty without
    /// a session.
    pub async fn following_feed_ids(&self) -> Result<Vec<PostId>, ClientError> {
        let Some(caller) = self.session.current() else {
            return Ok(Vec::new());
        };
        let gateway = &self.gateway;
        let args = json!([1, FEED_SCAN_LIMIT]);
        let v = self
            .cache
            .query(
                self.key(keys::FOLLOWING_FEED, [caller.to_string()]),
                || async move { gateway.read(abi::FETCH_FOLLOWING_POSTS, args).await },
            )
            .await?;
        ids_from(&v)
    }

    async fn source_ids(&self, source: &FeedSource) -> Result<Vec<PostId>, ClientError> {
        match source {
            FeedSource::Global => self.global_feed_ids().await,
            FeedSource::Following(_) => self.following_feed_ids().await,
            FeedSource::Profile(address) => self.user_posts(address).await,
        }
    }

    /// One page of fully resolved posts for a feed source, plus the total
    /// page count. Per-post fetches run concurrently; a post that fails to
    /// load is dropped from the page rather than failing the view.
    pub async fn posts_page(
        &self,
        source: &FeedSource,
        page: usize,
    ) -> Result<(Vec<Post>, usize), ClientError> {
        let ids = self.source_ids(source).await?;
        let sliced = paginate(&ids, page, self.posts_per_page);

        let results: Vec<Result<Option<Post>, ClientError>> =
            stream::iter(sliced.ids.iter().map(|id| self.post_details(*id)))
                .buffered(self.fetch_concurrency.max(1))
                .collect()
                .await;

        let mut posts = Vec::new();
        for (id, result) in sliced.ids.iter().zip(results) {
            match result {
                Ok(Some(post)) => posts.push(post),
                Ok(None) => log::debug!("[client] post {id} absent, skipping"),
                Err(e) => log::warn!("[client] failed to fetch post {id}: {e}"),
            }
        }
        Ok((posts, sliced.total_pages))
    }

    /// Resolve a post's off-chain metadata and classify its payload.
    /// Returns `None` when the metadata is missing or unreachable; that is
    /// a renderable state, not an error.
    pub async fn resolve_media(&self, post: &Post) -> Option<PostMedia> {
        let metadata = media::resolve_or_absent(&post.content_uri, self.media_timeout_ms).await?;
        let kind = if metadata.content_url.is_empty() {
            MediaKind::Unknown
        } else {
            let probe = media::probe(&metadata.content_url, self.media_timeout_ms).await;
            media::render_kind(probe, &metadata.content_url)
        };
        Some(PostMedia { metadata, kind })
    }

    /// Probe one URL directly (used by views that already hold metadata).
    pub async fn probe_content(&self, url: &str) -> Probe {
        media::probe(url, self.media_timeout_ms).await
    }

    // ---- writes ---------------------------------------------------------

    /// Run a write, then stale exactly the read keys the write's kind
    /// declares. Invalidation happens only after confirmed success, so a
    /// failed write never partially invalidates the cache.
    async fn write_op(
        &self,
        function: &'static str,
        args: Value,
        kind: WriteKind<'_>,
    ) -> Result<TxReceipt, ClientError> {
        let receipt = self.gateway.write(function, args).await?;
        for prefix in abi::invalidation_prefixes(&kind) {
            self.cache.invalidate(&prefix).await;
        }
        self.cache.sweep().await;
        Ok(receipt)
    }

    pub async fn register(&self, username: &str, bio: &str) -> Result<TxReceipt, ClientError> {
        validate_username(username)?;
        validate_bio(bio)?;
        let author = self.session.require()?;
        self.write_op(
            abi::REGISTER,
            json!([username, bio]),
            WriteKind::Register { author: &author },
        )
        .await
    }

    pub async fn update_username(&self, username: &str) -> Result<TxReceipt, ClientError> {
        validate_username(username)?;
        let author = self.session.require()?;
        self.write_op(
            abi::UPDATE_USERNAME,
            json!([username]),
            WriteKind::UpdateUsername { author: &author },
        )
        .await
    }

    pub async fn update_bio(&self, bio: &str) -> Result<TxReceipt, ClientError> {
        validate_bio(bio)?;
        let author = self.session.require()?;
        self.write_op(
            abi::UPDATE_BIO,
            json!([bio]),
            WriteKind::UpdateBio { author: &author },
        )
        .await
    }

    pub async fn create_post(&self, content_uri: &str) -> Result<TxReceipt, ClientError> {
        if content_uri.is_empty() {
            return Err(ClientError::InvalidInput("content URI is empty".into()));
        }
        let author = self.session.require()?;
        self.write_op(
            abi::CREATE_POST,
            json!([content_uri]),
            WriteKind::CreatePost { author: &author },
        )
        .await
    }

    /// Pin a file, pin the metadata JSON describing it, then create the
    /// post pointing at the pinned metadata.
    pub async fn create_post_with_upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        title: &str,
        description: &str,
        tags: Vec<String>,
    ) -> Result<(TxReceipt, UploadReceipt), ClientError> {
        self.session.require()?;
        let pinning = self
            .pinning
            .as_ref()
            .ok_or(ClientError::ConfigurationMissing("PINATA_JWT"))?;

        let file = pinning.upload_file(file_name, bytes).await?;
        let metadata = json!({
            "title": title,
            "description": description,
            "contentUrl": file.url,
            "contentHash": file.ipfs_hash,
            "tags": tags,
            "timestamp": chrono::Utc::now().timestamp(),
            "version": 1,
        });
        let pinned = pinning.upload_json(&metadata).await?;
        let receipt = self.create_post(&pinned.url).await?;
        Ok((receipt, pinned))
    }

    /// Replace a post's content URI. The contract rejects this once the
    /// post has any interaction; that revert surfaces as
    /// `PostHasInteraction`.
    pub async fn update_post(
        &self,
        id: PostId,
        content_uri: &str,
    ) -> Result<TxReceipt, ClientError> {
        if content_uri.is_empty() {
            return Err(ClientError::InvalidInput("content URI is empty".into()));
        }
        self.session.require()?;
        self.write_op(
            abi::UPDATE_POST,
            json!([id, content_uri]),
            WriteKind::UpdatePost { id },
        )
        .await
    }

    pub async fn delete_post(&self, id: PostId) -> Result<TxReceipt, ClientError> {
        let author = self.session.require()?;
        self.write_op(
            abi::DELETE_POST,
            json!([id]),
            WriteKind::DeletePost { id, author: &author },
        )
        .await
    }

    pub async fn like(&self, id: PostId) -> Result<TxReceipt, ClientError> {
        self.session.require()?;
        self.write_op(abi::LIKE_POST, json!([id]), WriteKind::Like { id })
            .await
    }

    pub async fn dislike(&self, id: PostId) -> Result<TxReceipt, ClientError> {
        self.session.require()?;
        self.write_op(abi::DISLIKE_POST, json!([id]), WriteKind::Dislike { id })
            .await
    }

    pub async fn report(&self, id: PostId) -> Result<TxReceipt, ClientError> {
        self.session.require()?;
        self.write_op(abi::REPORT_POST, json!([id]), WriteKind::Report { id })
            .await
    }

    /// Follow `target`. Self-follow and duplicate-follow are rejected by
    /// the contract; the revert is surfaced, never retried.
    pub async fn follow(&self, target: &Address) -> Result<TxReceipt, ClientError> {
        let follower = self.session.require()?;
        self.write_op(
            abi::FOLLOW,
            json!([target]),
            WriteKind::Follow {
                follower: &follower,
                followee: target,
            },
        )
        .await
    }

    pub async fn unfollow(&self, target: &Address) -> Result<TxReceipt, ClientError> {
        let follower = self.session.require()?;
        self.write_op(
            abi::UNFOLLOW,
            json!([target]),
            WriteKind::Unfollow {
                follower: &follower,
                followee: target,
            },
        )
        .await
    }
}

fn validate_username(username: &str) -> Result<(), ClientError> {
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err(ClientError::InvalidInput(
            "username must be 3-20 characters".into(),
        ));
    }
    Ok(())
}

fn validate_bio(bio: &str) -> Result<(), ClientError> {
    if bio.chars().count() > 200 {
        return Err(ClientError::InvalidInput(
            "bio must be at most 200 characters".into(),
        ));
    }
    Ok(())
}

fn ids_from(v: &Value) -> Result<Vec<PostId>, ClientError> {
    let Some(arr) = v.as_array() else {
        return Ok(Vec::new());
    };
    arr.iter().map(PostId::decode).collect()
}

fn addresses_from(v: &Value) -> Result<Vec<Address>, ClientError> {
    let Some(arr) = v.as_array() else {
        return Ok(Vec::new());
    };
    arr.iter()
        .map(|a| {
            a.as_str()
                .ok_or_else(|| ClientError::ChainCallFailed(format!("bad address {a}")))
                .and_then(|s| {
                    Address::parse(s).map_err(|e| ClientError::ChainCallFailed(e.to_string()))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{CallRequest, TxRequest};
    use async_trait::async_trait;

    /// Transport that fails the test if any network call is attempted.
    struct NoNetwork;

    #[async_trait]
    impl ChainTransport for NoNetwork {
        async fn call(&self, req: CallRequest) -> Result<Value, ClientError> {
            panic!("unexpected read {}", req.function);
        }
        async fn submit(&self, req: TxRequest) -> Result<String, ClientError> {
            panic!("unexpected write {}", req.function);
        }
        async fn receipt(&self, _tx_hash: &str) -> Result<Option<TxReceipt>, ClientError> {
            panic!("unexpected receipt poll");
        }
        fn chain_id(&self) -> u64 {
            31337
        }
    }

    fn offline_client() -> SocialClient {
        SocialClient::with_transport(&Config::default(), Arc::new(NoNetwork)).unwrap()
    }

    #[tokio::test]
    async fn writes_require_a_wallet_before_any_network_call() {
        let client = offline_client();
        let target: Address = "0x00000000000000000000000000000000000000bb".parse().unwrap();
        assert!(matches!(
            client.register("alice", "hi").await,
            Err(ClientError::WalletNotConnected)
        ));
        assert!(matches!(
            client.follow(&target).await,
            Err(ClientError::WalletNotConnected)
        ));
        assert!(matches!(
            client.like(PostId(1)).await,
            Err(ClientError::WalletNotConnected)
        ));
    }

    #[tokio::test]
    async fn username_and_bio_are_validated_before_submission() {
        let client = offline_client();
        client
            .session()
            .connect("0x00000000000000000000000000000000000000aa".parse().unwrap());
        assert!(matches!(
            client.register("ab", "hi").await,
            Err(ClientError::InvalidInput(_))
        ));
        assert!(matches!(
            client.register("a".repeat(21).as_str(), "hi").await,
            Err(ClientError::InvalidInput(_))
        ));
        assert!(matches!(
            client.update_bio(&"x".repeat(201)).await,
            Err(ClientError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn caller_specific_reads_short_circuit_without_session() {
        let client = offline_client();
        let target: Address = "0x00000000000000000000000000000000000000bb".parse().unwrap();
        assert!(!client.is_following(&target).await.unwrap());
        assert_eq!(
            client.interaction(PostId(1)).await.unwrap(),
            InteractionKind::None
        );
        assert!(client.following_feed_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_without_credential_is_a_configuration_error() {
        let client = offline_client();
        client
            .session()
            .connect("0x00000000000000000000000000000000000000aa".parse().unwrap());
        let err = client
            .create_post_with_upload("cat.png", vec![1, 2, 3], "t", "d", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ConfigurationMissing("PINATA_JWT")));
    }
}
