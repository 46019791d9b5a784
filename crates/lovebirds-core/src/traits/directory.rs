//! Read-only user relationship state.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::UserId;

/// Block and incognito state, owned by the profile side of the product.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Whether either user has blocked the other.
    async fn is_blocked_between(&self, a: UserId, b: UserId) -> AppResult<bool>;

    /// Whether the user hides presence and typing activity.
    async fn is_incognito(&self, user_id: UserId) -> AppResult<bool>;
}
