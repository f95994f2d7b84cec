use super::*;
use crate::error::{ApiError, ApiResult};
use crate::store::get_typed;
use crate::types::{SubscriptionTier, UserProfile};

pub const USERS_COLLECTION: &str = "users";

impl AppState {
    /// Only premium subscribers may generate trivia. A profile that cannot be
    /// read counts as not entitled.
    pub(crate) async fn require_premium(&self, user_id: &str) -> ApiResult<()> {
        let profile =
            match get_typed::<UserProfile>(self.store.as_ref(), USERS_COLLECTION, user_id).await {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    tracing::warn!(user_id, "Generation denied: no user profile");
                    return Err(ApiError::permission_denied("User profile not found"));
                }
                Err(e) => {
                    tracing::error!(user_id, error = %e, "Failed to read user profile");
                    return Err(ApiError::permission_denied(
                        "Unable to verify subscription status",
                    ));
                }
            };

        if profile.subscription_tier != SubscriptionTier::Premium {
            tracing::warn!(
                user_id,
                tier = ?profile.subscription_tier,
                "Generation denied: not premium"
            );
            return Err(ApiError::permission_denied(
                "Premium subscription required for AI Edition",
            ));
        }

        Ok(())
    }
}
