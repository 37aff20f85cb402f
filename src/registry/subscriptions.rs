use crate::core::{Result, StoreResultExt};
use crate::record::{Actor, Record, Subscription, SubscriptionDraft};
use crate::storage::{KvStore, StoreSet};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{Level, event};

/// Event subscriptions, held in the `subscriptions` field of the actor record.
///
/// Every write replaces the whole mapping; callers that merge must read,
/// merge and replace, and two such callers racing can lose an update.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    actors: Arc<dyn KvStore>,
}

impl SubscriptionRegistry {
    pub fn new(stores: &StoreSet) -> Self {
        Self {
            actors: stores.actors(),
        }
    }

    async fn actor(&self, db_key: &str) -> Result<Actor> {
        let value = self.actors.get(db_key).await.or_not_found("Actor", db_key)?;
        Ok(Actor::from_stored(value)?)
    }

    pub async fn get_subscriptions(&self, db_key: &str) -> Result<BTreeMap<String, Subscription>> {
        Ok(self.actor(db_key).await?.subscriptions)
    }

    pub async fn replace(
        &self,
        db_key: &str,
        subscriptions: &BTreeMap<String, Subscription>,
    ) -> Result<()> {
        self.actor(db_key).await?;
        self.actors
            .update(db_key, "subscriptions", serde_json::to_value(subscriptions)?)
            .await?;
        event!(
            Level::DEBUG,
            db_key = %db_key,
            count = subscriptions.len(),
            "subscriptions replaced"
        );
        Ok(())
    }

    /// Build a fresh mapping from event ids then patterns and replace the
    /// actor's subscriptions with it. Nothing is written if any entry is invalid.
    pub async fn subscribe(
        &self,
        db_key: &str,
        event_ids: &[&str],
        event_patterns: &[&str],
    ) -> Result<BTreeMap<String, Subscription>> {
        let actor = self.actor(db_key).await?;

        let drafts = event_ids
            .iter()
            .map(|id| SubscriptionDraft::event_id(&actor.id, *id))
            .chain(
                event_patterns
                    .iter()
                    .map(|pattern| SubscriptionDraft::event_pattern(&actor.id, *pattern)),
            );

        let mut subscriptions = BTreeMap::new();
        for draft in drafts {
            let subscription = Subscription::from_draft(draft, &subscriptions)?;
            subscriptions.insert(subscription.id.clone(), subscription);
        }

        self.replace(db_key, &subscriptions).await?;
        Ok(subscriptions)
    }
}
