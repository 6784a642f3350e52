//! # Demo: plant
//!
//! Supervises one DAQ process with an alive tag and one PLC behind a comm-fault tag.
//!
//! Shows how to:
//! - Configure entities, comm-fault tags and data tags through [`SupervisionManager`].
//! - Attach a pooled entity listener and a buffered tag listener.
//! - Feed control tag updates and watch the supervision bus.
//!
//! ## Flow
//! ```text
//! start(P_PLANT), start(E_PLC) ─► STARTUP
//! alive #11      ─► P_PLANT RUNNING
//! commfault #21 = false ─► E_PLC DOWN ─► tag 100 stamped DOWN
//! commfault #21 = true  ─► E_PLC RUNNING ─► tag 100 stamped RUNNING
//! shutdown       ─► drain listeners
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example plant
//! ```

use std::sync::Arc;
use std::time::Duration;

use tagvisor::{
    Batch, BatchListener, BufferContent, CacheEventKind, CacheListener, CommFaultTag,
    ControlTagUpdate, DataTag, EntityKey, ListenerError, ManagerBuilder, SupervisedEntity,
    SupervisionConfig, now_millis,
};

/// Prints every supervision change it receives.
struct Console;

#[async_trait::async_trait]
impl CacheListener<SupervisedEntity> for Console {
    async fn on_event(&self, kind: CacheEventKind, e: SupervisedEntity) -> Result<(), ListenerError> {
        println!(
            "[entity] {kind}: {} {} \"{}\"",
            e.key(),
            e.supervision_status(),
            e.status_description()
        );
        Ok(())
    }
}

/// Prints the keys of tags touched during each flush period.
struct TagDigest;

#[async_trait::async_trait]
impl BatchListener<DataTag> for TagDigest {
    async fn on_batch(&self, batch: Batch<DataTag>) -> Result<(), ListenerError> {
        if let Batch::Keys(ids) = batch {
            println!("[tags] touched: {ids:?}");
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = SupervisionConfig {
        buffer_flush_period: Duration::from_millis(200),
        ..SupervisionConfig::default()
    };
    let entity_listener = cfg.pooled(Arc::new(Console));
    let tag_listener = cfg.buffered(Arc::new(TagDigest), BufferContent::Keys);

    let manager = ManagerBuilder::new(cfg)
        .with_entity_listener(CacheEventKind::SupervisionChange, entity_listener)
        .with_tag_listener(CacheEventKind::SupervisionChange, tag_listener)
        .build()?;

    let process = EntityKey::process(1);
    let plc = EntityKey::equipment(2);
    manager
        .configure_entity(SupervisedEntity::process(1, "P_PLANT", 10).with_alive(11, 5_000))
        .await?;
    manager
        .configure_entity(
            SupervisedEntity::equipment(2, "E_PLC", 20)
                .with_parent(process)
                .with_comm_fault(21),
        )
        .await?;
    manager.configure_comm_fault(CommFaultTag::new(21, plc, false))?;
    manager.configure_tag(DataTag::new(100, "PLC.TEMP", 1, 2)).await?;

    let mut bus = manager.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(ev) = bus.recv().await {
            println!("[bus] {}#{} {} @ {:?}", ev.entity_kind, ev.entity_id, ev.status, ev.event_time);
        }
    });

    let t0 = now_millis();
    manager.start(process, t0).await?;
    manager.start(plc, t0).await?;
    manager.process_control_tag(ControlTagUpdate::new(11, 1_i64), t0 + 1).await?;
    manager
        .process_control_tag(
            ControlTagUpdate::new(21, false)
                .with_source_ts(t0 + 2)
                .with_description("serial link timeout"),
            t0 + 2,
        )
        .await?;
    manager
        .process_control_tag(ControlTagUpdate::new(21, true).with_source_ts(t0 + 3), t0 + 3)
        .await?;

    tokio::time::sleep(Duration::from_millis(300)).await;
    manager.shutdown().await?;
    printer.abort();
    Ok(())
}
