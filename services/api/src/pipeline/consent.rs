//! services/api/src/pipeline/consent.rs
//!
//! Decides, once per connection, whether any conversation data may be
//! persisted for this user. The decision is a pure function of the profile's
//! subscription tier and explicit preference flag; a tier change mid-session
//! does not retroactively toggle persistence.

use solace_core::ports::ConversationStore;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

pub struct ConsentGate {
    store: Arc<dyn ConversationStore>,
    user_id: Uuid,
    decision: OnceCell<bool>,
}

impl ConsentGate {
    pub fn new(store: Arc<dyn ConversationStore>, user_id: Uuid) -> Self {
        Self {
            store,
            user_id,
            decision: OnceCell::new(),
        }
    }

    /// Whether conversation content may be durably stored for this user.
    ///
    /// The profile is fetched on first use and the decision cached for the
    /// connection's lifetime. A failed fetch allows persistence; this
    /// fail-open stance is a confirmed product decision (see DESIGN.md), not
    /// an accident of error handling.
    pub async fn allows_persistence(&self) -> bool {
        *self
            .decision
            .get_or_init(|| async {
                match self.store.fetch_profile(self.user_id).await {
                    Ok(profile) => {
                        let allowed = profile.persistence_allowed();
                        info!(
                            user_id = %self.user_id,
                            allowed,
                            "consent decision resolved for this connection"
                        );
                        allowed
                    }
                    Err(e) => {
                        warn!(
                            user_id = %self.user_id,
                            error = %e,
                            "profile fetch failed; allowing persistence"
                        );
                        true
                    }
                }
            })
            .await
    }
}
