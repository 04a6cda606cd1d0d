//! The social-graph contract surface: function names, logical cache-key
//! names, and the invalidation table that maps every write to the read
//! keys it stales.

use crate::cache::KeyPrefix;
use crate::types::{Address, PostId};

/// Fixed deployment address of the social-graph contract.
pub const CONTRACT_ADDRESS: &str = "0x59ab2d6ba01cd5684aed34893b2ae5566acf3ef7";

// State-changing functions
pub const REGISTER: &str = "register";
pub const UPDATE_USERNAME: &str = "updateUserName";
pub const UPDATE_BIO: &str = "updateBio";
pub const CREATE_POST: &str = "createPost";
pub const UPDATE_POST: &str = "updatePost";
pub const DELETE_POST: &str = "deletePost";
pub const LIKE_POST: &str = "likePost";
pub const DISLIKE_POST: &str = "dislikePost";
pub const REPORT_POST: &str = "reportPost";
pub const FOLLOW: &str = "follow";
pub const UNFOLLOW: &str = "unfollow";

// View functions
pub const GET_USER_PROFILE: &str = "getUserProfile";
pub const GET_REPUTATION_SCORE: &str = "getReputationScore";
pub const GET_POST_DETAILS: &str = "getPostDetails";
pub const GET_USER_POSTS: &str = "getUserPosts";
pub const FETCH_GLOBAL_POSTS: &str = "fetchGlobalPosts";
pub const FETCH_FOLLOWING_POSTS: &str = "fetchFollowingPosts";
pub const IS_FOLLOWING: &str = "isFollowing";
pub const GET_FOLLOWERS: &str = "getFollowers";
pub const GET_FOLLOWING: &str = "getFollowing";
pub const GET_INTERACTION_TYPE: &str = "getInteractionType";

/// Logical cache-key names. Every cached read uses one of these, so the
/// invalidation table below can name them exhaustively.
pub mod keys {
    pub const PROFILE: &str = "profile";
    pub const REPUTATION: &str = "reputation";
    pub const POST: &str = "post";
    pub const USER_POSTS: &str = "user_posts";
    pub const GLOBAL_FEED: &str = "global_feed";
    pub const FOLLOWING_FEED: &str = "following_feed";
    pub const IS_FOLLOWING: &str = "is_following";
    pub const FOLLOWERS: &str = "followers";
    pub const FOLLOWING: &str = "following";
    pub const INTERACTION: &str = "interaction";
}

/// Every state-changing operation the client can issue. Borrowed fields
/// name the accounts whose cached reads the write touches.
#[derive(Debug)]
pub enum WriteKind<'a> {
    Register { author: &'a Address },
    UpdateUsername { author: &'a Address },
    UpdateBio { author: &'a Address },
    CreatePost { author: &'a Address },
    UpdatePost { id: PostId },
    DeletePost { id: PostId, author: &'a Address },
    Like { id: PostId },
    Dislike { id: PostId },
    Report { id: PostId },
    Follow { follower: &'a Address, followee: &'a Address },
    Unfollow { follower: &'a Address, followee: &'a Address },
}

/// The key prefixes a successful write stales. This mapping is part of the
/// layer's contract: a write that forgets a dependent key is a correctness
/// bug. The match has no wildcard arm so adding a `WriteKind` forces an
/// entry here.
pub fn invalidation_prefixes(write: &WriteKind<'_>) -> Vec<KeyPrefix> {
    match write {
        // Profile mutations touch only the author's profile read.
        WriteKind::Register { author }
        | WriteKind::UpdateUsername { author }
        | WriteKind::UpdateBio { author } => {
            vec![KeyPrefix::with_arg(keys::PROFILE, author.as_str())]
        }

        // postCount is embedded in the profile read, so creating a post
        // stales the author's profile as well as every feed listing.
        WriteKind::CreatePost { author } => vec![
            KeyPrefix::with_arg(keys::PROFILE, author.as_str()),
            KeyPrefix::with_arg(keys::USER_POSTS, author.as_str()),
            KeyPrefix::name(keys::GLOBAL_FEED),
            KeyPrefix::name(keys::FOLLOWING_FEED),
        ],

        WriteKind::UpdatePost { id } => {
            vec![KeyPrefix::with_arg(keys::POST, id.to_string())]
        }

        WriteKind::DeletePost { id, author } => vec![
            KeyPrefix::with_arg(keys::POST, id.to_string()),
            KeyPrefix::with_arg(keys::USER_POSTS, author.as_str()),
            KeyPrefix::with_arg(keys::PROFILE, author.as_str()),
            KeyPrefix::name(keys::GLOBAL_FEED),
            KeyPrefix::name(keys::FOLLOWING_FEED),
        ],

        // Interaction state is caller-specific; the prefix covers every
        // caller's entry for the post. Counts live on the post read.
        WriteKind::Like { id } | WriteKind::Dislike { id } | WriteKind::Report { id } => vec![
            KeyPrefix::with_arg(keys::INTERACTION, id.to_string()),
            KeyPrefix::with_arg(keys::POST, id.to_string()),
        ],

        // Follower/following counts are embedded in both parties' profile
        // reads, so a follow stales both sides plus the edge itself.
        WriteKind::Follow { follower, followee }
        | WriteKind::Unfollow { follower, followee } => vec![
            KeyPrefix::with_arg(keys::IS_FOLLOWING, follower.as_str()),
            KeyPrefix::with_arg(keys::PROFILE, follower.as_str()),
            KeyPrefix::with_arg(keys::PROFILE, followee.as_str()),
            KeyPrefix::with_arg(keys::FOLLOWING, follower.as_str()),
            KeyPrefix::with_arg(keys::FOLLOWERS, followee.as_str()),
            KeyPrefix::with_arg(keys::FOLLOWING_FEED, follower.as_str()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tail: &str) -> Address {
        format!("0x{:0>40}", tail).parse().unwrap()
    }

    #[test]
    fn follow_invalidates_edge_and_both_profiles() {
        let a = addr("aa");
        let b = addr("bb");
        let prefixes = invalidation_prefixes(&WriteKind::Follow {
            follower: &a,
            followee: &b,
        });
        assert!(prefixes.contains(&KeyPrefix::with_arg(keys::IS_FOLLOWING, a.as_str())));
        assert!(prefixes.contains(&KeyPrefix::with_arg(keys::PROFILE, a.as_str())));
        assert!(prefixes.contains(&KeyPrefix::with_arg(keys::PROFILE, b.as_str())));
    }

    #[test]
    fn create_post_invalidates_profile_and_feeds() {
        let a = addr("aa");
        let prefixes = invalidation_prefixes(&WriteKind::CreatePost { author: &a });
        assert!(prefixes.contains(&KeyPrefix::with_arg(keys::PROFILE, a.as_str())));
        assert!(prefixes.contains(&KeyPrefix::with_arg(keys::USER_POSTS, a.as_str())));
        assert!(prefixes.contains(&KeyPrefix::name(keys::GLOBAL_FEED)));
    }

    #[test]
    fn like_invalidates_interaction_and_post() {
        let prefixes = invalidation_prefixes(&WriteKind::Like { id: PostId(9) });
        assert_eq!(
            prefixes,
            vec![
                KeyPrefix::with_arg(keys::INTERACTION, "9"),
                KeyPrefix::with_arg(keys::POST, "9"),
            ]
        );
    }
}
