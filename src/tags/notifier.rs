//! # Tag supervision notifier.
//!
//! Pooled listener on `SUPERVISION_UPDATE` of supervised entities, raised by every
//! accepted status write. For a settled status (`RUNNING`, `RUNNING_LOCAL`,
//! `STOPPED`, `DOWN`) it stamps the entity's event on every dependent tag and lets
//! tag listeners know. `STARTUP` to `RUNNING` stays within the active class and
//! raises no `SUPERVISION_CHANGE`, yet must still reach the tags.
//!
//! ```text
//! process#1 ─► every tag of the process
//! equipment#2 ─► tags of the equipment
//! subequipment#3 ─► tags of the sub-equipment
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::{SupervisedEntity, SupervisionStatus};
use crate::error::{ListenerError, SupervisionError};
use crate::events::CacheEventKind;
use crate::listeners::CacheListener;

use super::TagStore;

pub struct TagSupervisionNotifier {
    tags: Arc<TagStore>,
}

impl TagSupervisionNotifier {
    pub fn new(tags: Arc<TagStore>) -> Self {
        Self { tags }
    }
}

#[async_trait]
impl CacheListener<SupervisedEntity> for TagSupervisionNotifier {
    async fn on_event(
        &self,
        kind: CacheEventKind,
        entity: SupervisedEntity,
    ) -> Result<(), ListenerError> {
        if kind != CacheEventKind::SupervisionUpdate {
            return Ok(());
        }
        match entity.supervision_status() {
            SupervisionStatus::Running
            | SupervisionStatus::RunningLocal
            | SupervisionStatus::Stopped
            | SupervisionStatus::Down => {}
            SupervisionStatus::Startup | SupervisionStatus::Uncertain => return Ok(()),
        }

        let key = entity.key();
        let event = entity.supervision_event();
        let mut stamped = 0usize;
        for id in self.tags.tags_of(key) {
            match self.tags.apply_supervision(id, &event).await {
                Ok(true) => stamped += 1,
                Ok(false) => {}
                // removed between index read and lock
                Err(SupervisionError::UnknownTag { .. }) => {}
                Err(e) => return Err(ListenerError::failed(e.as_message())),
            }
        }
        tracing::debug!(entity = %key, status = %event.status, tags = stamped, "tag supervision propagated");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tag-supervision-notifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKey;
    use crate::tags::DataTag;

    fn entity(status: SupervisionStatus) -> SupervisedEntity {
        let mut e = SupervisedEntity::equipment(2, "E", 20);
        e.supervision_status = status;
        e.status_time = Some(100);
        e
    }

    #[tokio::test]
    async fn settled_status_is_stamped_on_dependent_tags() {
        let tags = Arc::new(TagStore::new());
        tags.insert(DataTag::new(1, "A", 1, 2)).await.unwrap();
        tags.insert(DataTag::new(2, "B", 1, 3)).await.unwrap();
        let n = TagSupervisionNotifier::new(Arc::clone(&tags));

        n.on_event(CacheEventKind::SupervisionUpdate, entity(SupervisionStatus::Down))
            .await
            .unwrap();

        let a = tags.get(1).await.unwrap();
        assert_eq!(
            a.supervision_event(EntityKey::equipment(2)).map(|e| e.status),
            Some(SupervisionStatus::Down)
        );
        assert!(tags.get(2).await.unwrap().supervision_event(EntityKey::equipment(2)).is_none());
    }

    #[tokio::test]
    async fn startup_and_other_kinds_are_ignored() {
        let tags = Arc::new(TagStore::new());
        tags.insert(DataTag::new(1, "A", 1, 2)).await.unwrap();
        let n = TagSupervisionNotifier::new(Arc::clone(&tags));

        n.on_event(CacheEventKind::SupervisionUpdate, entity(SupervisionStatus::Startup))
            .await
            .unwrap();
        n.on_event(CacheEventKind::SupervisionChange, entity(SupervisionStatus::Running))
            .await
            .unwrap();
        n.on_event(CacheEventKind::ConfirmStatus, entity(SupervisionStatus::Running))
            .await
            .unwrap();

        assert!(tags.get(1).await.unwrap().supervision_event(EntityKey::equipment(2)).is_none());
    }
}
