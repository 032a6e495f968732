//! services/api/src/pipeline/reconciler.rs
//!
//! Attaches the streaming service's session identifiers to the persisted
//! conversation record. The metadata event and the record creation race: when
//! the identifiers arrive first they are buffered, and a bounded watchdog
//! retries the attachment until the record shows up or the window lapses.

use solace_core::ports::ConversationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::pipeline::context::SessionContext;
use crate::pipeline::pending::PendingIdentifierStore;
use crate::pipeline::PipelineSettings;

/// The result of one attempt to drain the pending buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing buffered.
    Idle,
    /// Identifiers are buffered but no conversation record exists yet.
    AwaitingSession,
    /// The buffered identifiers were applied (or found already applied).
    Applied,
    /// The attachment attempt failed; the identifiers stay buffered.
    Failed,
}

pub struct IdentityReconciler {
    store: Arc<dyn ConversationStore>,
    ctx: Arc<SessionContext>,
    pending: PendingIdentifierStore,
    interval: Duration,
    window: Duration,
}

impl IdentityReconciler {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        ctx: Arc<SessionContext>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            store,
            ctx,
            pending: PendingIdentifierStore::new(settings.watchdog_window),
            interval: settings.watchdog_interval,
            window: settings.watchdog_window,
        }
    }

    /// Handles a `session_metadata` event.
    ///
    /// With a known conversation record the identifiers are attached directly;
    /// otherwise, or when the attachment fails, they are buffered for the
    /// watchdog to retry.
    pub async fn bind_external_ids(&self, chat_id: &str, chat_group_id: &str) {
        match self.ctx.session_id() {
            Some(session_id) => match self.apply(session_id, chat_id, chat_group_id).await {
                Ok(true) => {
                    info!(%session_id, chat_id, "attached external identifiers");
                }
                Ok(false) => {
                    debug!(%session_id, chat_id, "identifiers already attached; ignoring duplicate");
                }
                Err(e) => {
                    warn!(%session_id, error = %e, "identifier attachment failed; buffering");
                    self.pending.put(chat_id, chat_group_id).await;
                }
            },
            None => {
                debug!(chat_id, "no conversation record yet; buffering external identifiers");
                self.pending.put(chat_id, chat_group_id).await;
            }
        }
    }

    /// Retries the buffered identifier pair, if any. Called by the watchdog
    /// tick and immediately after a conversation record is created.
    pub async fn flush_pending(&self) -> FlushOutcome {
        let Some(pending) = self.pending.peek().await else {
            return FlushOutcome::Idle;
        };
        let Some(session_id) = self.ctx.session_id() else {
            return FlushOutcome::AwaitingSession;
        };

        match self
            .apply(session_id, &pending.chat_id, &pending.chat_group_id)
            .await
        {
            Ok(applied) => {
                if applied {
                    info!(%session_id, chat_id = %pending.chat_id, "attached buffered external identifiers");
                } else {
                    debug!(%session_id, "buffered identifiers were already attached");
                }
                self.pending.clear().await;
                FlushOutcome::Applied
            }
            Err(e) => {
                warn!(%session_id, error = %e, "buffered identifier attachment failed");
                FlushOutcome::Failed
            }
        }
    }

    /// Verifies the record still exists, then attaches the identifiers at
    /// most once. A record that already carries identifiers makes this a
    /// no-op rather than an overwrite.
    async fn apply(
        &self,
        session_id: Uuid,
        chat_id: &str,
        chat_group_id: &str,
    ) -> solace_core::ports::StoreResult<bool> {
        let session = self.store.get_conversation(session_id).await?;
        if session.has_external_ids() {
            return Ok(false);
        }
        self.store
            .attach_external_ids(session_id, chat_id, chat_group_id)
            .await
    }

    /// Spawns the bounded retry loop for this connection.
    ///
    /// Ticks at a fixed interval for at most the configured window from
    /// connection start, and stops early once a buffered pair has been
    /// applied or the connection shuts down. Whatever is still buffered at
    /// the window's end is dropped.
    pub fn spawn_watchdog(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + self.window;
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep_until(deadline) => {
                        if !self.pending.is_empty().await {
                            warn!("external identifiers were never reconciled; dropping buffered pair");
                            self.pending.clear().await;
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        if self.flush_pending().await == FlushOutcome::Applied {
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
impl IdentityReconciler {
    pub(crate) async fn has_pending(&self) -> bool {
        !self.pending.is_empty().await
    }
}
