//! Entitlement Resolver
//!
//! Decides whether a viewer may see a post's media. Checks run in a fixed
//! order and the first match wins:
//!
//! 1. free posts are visible to everyone, signed in or not
//! 2. anonymous viewers are locked out of everything else
//! 3. the owning creator always sees their own posts
//! 4. subscribers of the owning creator see every tier
//! 5. everyone else is locked out
//!
//! Locked results show a blurred preview when the post has a thumbnail and a
//! generic paywall card otherwise. Nothing here performs I/O.

use serde::{Deserialize, Serialize};

use crate::models::{Post, Viewer};

/// What the client may render for a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementState {
    /// Full media
    Unlocked,
    /// Blurred thumbnail plus call-to-action
    LockedPreview,
    /// Generic paywall card
    LockedNoPreview,
}

/// Which rule decided the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessReason {
    Free,
    Owner,
    Subscribed,
    SignInRequired,
    NotSubscribed,
}

/// Call-to-action shown on a locked post
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallToAction {
    SignIn,
    Subscribe { creator_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementResult {
    pub state: EntitlementState,
    pub reason: AccessReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<CallToAction>,
}

impl EntitlementResult {
    fn unlocked(reason: AccessReason) -> Self {
        Self {
            state: EntitlementState::Unlocked,
            reason,
            call_to_action: None,
        }
    }

    fn locked(post: &Post, reason: AccessReason, call_to_action: CallToAction) -> Self {
        let state = if post.has_preview() {
            EntitlementState::LockedPreview
        } else {
            EntitlementState::LockedNoPreview
        };
        Self {
            state,
            reason,
            call_to_action: Some(call_to_action),
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == EntitlementState::Unlocked
    }

    pub fn is_locked(&self) -> bool {
        !self.is_unlocked()
    }
}

/// Resolve what `viewer` may see of `post`
pub fn resolve(viewer: &Viewer, post: &Post) -> EntitlementResult {
    if post.visibility.is_free() {
        return EntitlementResult::unlocked(AccessReason::Free);
    }

    let profile = match viewer {
        Viewer::Anonymous => {
            return EntitlementResult::locked(post, AccessReason::SignInRequired, CallToAction::SignIn)
        }
        Viewer::Authenticated(profile) => profile,
    };

    if profile.id == post.creator_id {
        return EntitlementResult::unlocked(AccessReason::Owner);
    }

    // vip and premium are gated by the same plain subscription for now
    if profile.is_subscribed_to(&post.creator_id) {
        return EntitlementResult::unlocked(AccessReason::Subscribed);
    }

    EntitlementResult::locked(
        post,
        AccessReason::NotSubscribed,
        CallToAction::Subscribe {
            creator_id: post.creator_id.clone(),
        },
    )
}
