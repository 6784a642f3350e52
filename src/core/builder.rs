use std::sync::Arc;

use crate::entity::SupervisedEntity;
use crate::error::SupervisionError;
use crate::events::{Bus, CacheEventKind, EventSet};
use crate::listeners::Delivery;
use crate::supervision::SupervisionService;
use crate::tags::{DataTag, TagStore, TagSupervisionNotifier};

use super::{config::SupervisionConfig, manager::SupervisionManager};

/// Builder for constructing a [`SupervisionManager`] with its initial listeners.
pub struct ManagerBuilder {
    cfg: SupervisionConfig,
    entity_listeners: Vec<(EventSet, Delivery<SupervisedEntity>)>,
    tag_listeners: Vec<(EventSet, Delivery<DataTag>)>,
}

impl ManagerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisionConfig) -> Self {
        Self {
            cfg,
            entity_listeners: Vec::new(),
            tag_listeners: Vec::new(),
        }
    }

    /// Registers a supervised-entity listener at build time.
    ///
    /// Listeners can also be registered later through
    /// `manager.entities().dispatcher()`.
    pub fn with_entity_listener(
        mut self,
        kinds: impl Into<EventSet>,
        delivery: Delivery<SupervisedEntity>,
    ) -> Self {
        self.entity_listeners.push((kinds.into(), delivery));
        self
    }

    /// Registers a data tag listener at build time.
    pub fn with_tag_listener(mut self, kinds: impl Into<EventSet>, delivery: Delivery<DataTag>) -> Self {
        self.tag_listeners.push((kinds.into(), delivery));
        self
    }

    /// Builds the manager.
    ///
    /// Must be called inside a tokio runtime: the tag supervision notifier and
    /// every pooled or buffered listener spawn their workers here.
    ///
    /// Wiring, in order:
    /// - event bus and entity store
    /// - tag store and the pooled [`TagSupervisionNotifier`] on `SUPERVISION_UPDATE`
    /// - listeners passed to the builder
    pub fn build(self) -> Result<Arc<SupervisionManager>, SupervisionError> {
        if self.cfg.alive_tolerance_factor == 0 {
            return Err(SupervisionError::InvalidConfiguration {
                reason: "alive_tolerance_factor must be at least 1".into(),
            });
        }

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let entities = SupervisionService::new(bus, self.cfg.stop_status);
        let tags = Arc::new(TagStore::new());

        let notifier = Arc::new(TagSupervisionNotifier::new(Arc::clone(&tags)));
        entities
            .dispatcher()
            .register(CacheEventKind::SupervisionUpdate, self.cfg.pooled(notifier));

        for (kinds, delivery) in self.entity_listeners {
            entities.dispatcher().register(kinds, delivery);
        }
        for (kinds, delivery) in self.tag_listeners {
            tags.dispatcher().register(kinds, delivery);
        }

        Ok(Arc::new(SupervisionManager::new_internal(self.cfg, entities, tags)))
    }
}
