use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tagvisor::{
    AliveSignal, CacheEventKind, CacheListener, CommFaultTag, ControlTagUpdate, DataTag, Delivery,
    EntityKey, EventSet, ListenerError, ManagerBuilder, Rejection, SignalOutcome, SupervisedEntity,
    SupervisionConfig, SupervisionError, SupervisionManager, SupervisionStatus,
};

#[derive(Default)]
struct Recorder(Mutex<Vec<(CacheEventKind, EntityKey, SupervisionStatus)>>);

#[async_trait]
impl CacheListener<SupervisedEntity> for Recorder {
    async fn on_event(&self, kind: CacheEventKind, e: SupervisedEntity) -> Result<(), ListenerError> {
        self.0.lock().await.push((kind, e.key(), e.supervision_status()));
        Ok(())
    }
}

fn manual_scan() -> SupervisionConfig {
    SupervisionConfig {
        expiry_scan_period: std::time::Duration::ZERO,
        ..SupervisionConfig::default()
    }
}

fn manager() -> Arc<SupervisionManager> {
    ManagerBuilder::new(manual_scan()).build().unwrap()
}

async fn status(m: &SupervisionManager, key: EntityKey) -> (SupervisionStatus, Option<u64>) {
    let ev = m.entities().event(key).await.unwrap();
    (ev.status, ev.event_time)
}

#[tokio::test]
async fn resume_on_a_running_process_is_a_no_op() {
    let m = manager();
    let p = EntityKey::process(1);
    m.configure_entity(SupervisedEntity::process(1, "P_TEST", 10).with_alive(100, 10_000))
        .await
        .unwrap();

    let out = m.start(p, 1000).await.unwrap();
    assert_eq!(
        out.events(),
        EventSet::of(&[CacheEventKind::SupervisionUpdate, CacheEventKind::SupervisionChange])
    );
    assert_eq!(status(&m, p).await, (SupervisionStatus::Startup, Some(1000)));

    let out = m.resume(p, 1001, "alive").await.unwrap();
    assert!(out.is_accepted());
    assert_eq!(status(&m, p).await, (SupervisionStatus::Running, Some(1001)));

    let out = m.resume(p, 1002, "alive").await.unwrap();
    assert!(matches!(
        out.rejection(),
        Some(Rejection::InvalidTransition { .. })
    ));
    assert_eq!(status(&m, p).await, (SupervisionStatus::Running, Some(1001)));
}

#[tokio::test]
async fn comm_fault_takes_equipment_down_and_up() {
    let m = manager();
    let e = EntityKey::equipment(2);
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    m.configure_entity(
        SupervisedEntity::equipment(2, "E_PLC", 20)
            .with_parent(EntityKey::process(1))
            .with_comm_fault(21),
    )
    .await
    .unwrap();
    m.configure_comm_fault(CommFaultTag::new(21, e, false)).unwrap();
    m.start(e, 1000).await.unwrap();

    let down = m
        .process_control_tag(ControlTagUpdate::new(21, false).with_source_ts(5000), 5001)
        .await
        .unwrap();
    assert!(down.is_accepted());
    let ev = m.entities().event(e).await.unwrap();
    assert_eq!(ev.status, SupervisionStatus::Down);
    assert_eq!(ev.event_time, Some(5000));
    assert!(ev.message.contains("is down"));

    let up = m
        .process_control_tag(ControlTagUpdate::new(21, true).with_source_ts(6000), 6000)
        .await
        .unwrap();
    assert!(up.is_accepted());
    assert_eq!(status(&m, e).await, (SupervisionStatus::Running, Some(6000)));
}

#[tokio::test]
async fn silent_alive_timer_suspends_once() {
    let m = manager();
    let p = EntityKey::process(1);
    m.configure_entity(SupervisedEntity::process(1, "P", 10).with_alive(100, 10_000))
        .await
        .unwrap();

    let out = m
        .on_alive(AliveSignal {
            alive_tag_id: 100,
            signal_ts: 0,
            arrival_ts: 0,
        })
        .await
        .unwrap();
    assert!(out.is_accepted());
    assert_eq!(status(&m, p).await.0, SupervisionStatus::Running);

    assert!(m.scan_expired(10_000).await.is_empty());
    let suspended = m.scan_expired(10_001).await;
    assert_eq!(suspended.len(), 1);
    assert_eq!(suspended[0].0, p);
    assert!(!status(&m, p).await.0.is_active());
    assert!(m.scan_expired(20_000).await.is_empty());
}

#[tokio::test]
async fn delayed_alive_is_dropped() {
    let m = manager();
    let p = EntityKey::process(1);
    m.configure_entity(SupervisedEntity::process(1, "P", 10).with_alive(100, 1_000))
        .await
        .unwrap();

    let out = m
        .process_control_tag(ControlTagUpdate::new(100, 1_i64).with_daq_ts(0), 2_001)
        .await
        .unwrap();
    assert_eq!(out, SignalOutcome::Stale { delay_millis: 2_001 });
    assert_eq!(status(&m, p).await, (SupervisionStatus::Down, None));
}

#[tokio::test]
async fn unknown_ids_are_errors() {
    let m = manager();
    let err = m
        .process_control_tag(ControlTagUpdate::new(999, true), 0)
        .await
        .unwrap_err();
    assert_eq!(err, SupervisionError::UnknownControlTag { id: 999 });

    let err = m.start(EntityKey::equipment(4), 0).await.unwrap_err();
    assert_eq!(err.as_label(), "unknown_entity");
}

#[tokio::test]
async fn stale_admin_command_changes_nothing() {
    let m = manager();
    let p = EntityKey::process(1);
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    m.start(p, 500).await.unwrap();
    let mut bus = m.subscribe();

    let out = m.stop(p, 499).await.unwrap();
    assert_eq!(
        out.rejection(),
        Some(Rejection::Stale {
            recorded: 500,
            supplied: 499
        })
    );
    assert_eq!(status(&m, p).await, (SupervisionStatus::Startup, Some(500)));
    assert!(bus.try_recv().is_err());
}

#[tokio::test]
async fn supervision_change_is_stamped_on_dependent_tags() {
    let m = manager();
    let p = EntityKey::process(1);
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    m.configure_entity(SupervisedEntity::equipment(2, "E", 20).with_parent(p))
        .await
        .unwrap();
    m.configure_tag(DataTag::new(7, "T7", 1, 2)).await.unwrap();

    m.start(p, 100).await.unwrap();
    m.resume(p, 200, "up").await.unwrap();
    m.stop(p, 300).await.unwrap();
    m.shutdown().await.unwrap();

    let tag = m.tags().get(7).await.unwrap();
    let ev = tag.supervision_event(p).cloned().unwrap();
    assert_eq!(ev.status, SupervisionStatus::Stopped);
    assert_eq!(ev.event_time, Some(300));
    assert!(!tag.is_supervision_valid());
}

#[tokio::test]
async fn recovery_through_startup_is_stamped_on_dependent_tags() {
    let m = manager();
    let p = EntityKey::process(1);
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    m.configure_entity(SupervisedEntity::equipment(2, "E", 20).with_parent(p))
        .await
        .unwrap();
    m.configure_tag(DataTag::new(7, "T7", 1, 2)).await.unwrap();

    m.start(p, 100).await.unwrap();
    m.resume(p, 200, "up").await.unwrap();
    m.suspend(p, 300, "lost").await.unwrap();
    m.start(p, 400).await.unwrap();
    let out = m.resume(p, 500, "back").await.unwrap();
    assert_eq!(out.events(), EventSet::from(CacheEventKind::SupervisionUpdate));
    m.shutdown().await.unwrap();

    let tag = m.tags().get(7).await.unwrap();
    let ev = tag.supervision_event(p).cloned().unwrap();
    assert_eq!((ev.status, ev.event_time), (SupervisionStatus::Running, Some(500)));
    assert!(tag.is_supervision_valid());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tags_converge_on_the_last_write_at_equal_timestamps() {
    for _ in 0..20 {
        let m = manager();
        let p = EntityKey::process(1);
        let e = EntityKey::equipment(2);
        m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
        m.configure_entity(SupervisedEntity::equipment(2, "E", 20).with_parent(p))
            .await
            .unwrap();
        for id in 0..50 {
            m.configure_tag(DataTag::new(id, format!("T{id}"), 1, 2)).await.unwrap();
        }
        m.start(e, 1000).await.unwrap();

        let writers: Vec<_> = (0..3)
            .map(|_| {
                let m = Arc::clone(&m);
                tokio::spawn(async move {
                    for _ in 0..5 {
                        m.resume(e, 1000, "up").await.unwrap();
                        m.suspend(e, 1000, "down").await.unwrap();
                    }
                    m.resume(e, 1000, "up").await.unwrap();
                })
            })
            .collect();
        for w in writers {
            w.await.unwrap();
        }
        m.shutdown().await.unwrap();

        let last = m.entities().event(e).await.unwrap();
        for id in 0..50 {
            let tag = m.tags().get(id).await.unwrap();
            assert_eq!(tag.supervision_event(e), Some(&last), "tag {id}");
        }
    }
}

#[tokio::test]
async fn comm_fault_recovery_rearms_the_alive_timer() {
    let m = manager();
    let e = EntityKey::equipment(2);
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    m.configure_entity(
        SupervisedEntity::equipment(2, "E_PLC", 20)
            .with_parent(EntityKey::process(1))
            .with_alive(30, 1_000)
            .with_comm_fault(21),
    )
    .await
    .unwrap();
    m.configure_comm_fault(CommFaultTag::new(21, e, false)).unwrap();

    m.process_control_tag(ControlTagUpdate::new(30, 1_i64), 0).await.unwrap();
    assert_eq!(m.scan_expired(1_001).await.len(), 1);
    assert!(!m.liveness().record(30).unwrap().active);

    let up = m
        .process_control_tag(ControlTagUpdate::new(21, true).with_source_ts(2_000), 2_000)
        .await
        .unwrap();
    assert!(up.is_accepted());
    assert_eq!(status(&m, e).await.0, SupervisionStatus::Running);
    assert!(m.liveness().record(30).unwrap().active);

    let suspended = m.scan_expired(3_001).await;
    assert_eq!(suspended.len(), 1);
    assert_eq!(status(&m, e).await.0, SupervisionStatus::Down);
}

#[tokio::test]
async fn comm_fault_recovery_refreshes_the_linked_alive_tag() {
    let m = manager();
    let e = EntityKey::equipment(2);
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    m.configure_entity(
        SupervisedEntity::equipment(2, "E_PLC", 20)
            .with_parent(EntityKey::process(1))
            .with_alive(30, 1_000)
            .with_comm_fault(21),
    )
    .await
    .unwrap();
    m.configure_comm_fault(CommFaultTag::new(21, e, false).with_alive_tag(30)).unwrap();

    m.process_control_tag(ControlTagUpdate::new(30, 1_i64), 0).await.unwrap();
    m.process_control_tag(ControlTagUpdate::new(21, false).with_source_ts(500), 500)
        .await
        .unwrap();
    assert_eq!(status(&m, e).await.0, SupervisionStatus::Down);

    m.process_control_tag(ControlTagUpdate::new(21, true).with_source_ts(900), 900)
        .await
        .unwrap();
    assert_eq!(m.liveness().record(30).unwrap().last_seen_millis, 900);

    assert!(m.scan_expired(1_500).await.is_empty());
    assert_eq!(status(&m, e).await.0, SupervisionStatus::Running);
}

#[tokio::test]
async fn tag_requires_configured_supervisors() {
    let m = manager();
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    let err = m.configure_tag(DataTag::new(7, "T7", 1, 2)).await.unwrap_err();
    assert_eq!(err, SupervisionError::UnknownEntity { key: EntityKey::equipment(2) });
}

#[tokio::test]
async fn process_disconnection_stops_the_whole_subtree() {
    let m = manager();
    let p = EntityKey::process(1);
    let e = EntityKey::equipment(2);
    let s = EntityKey::sub_equipment(3);
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    m.configure_entity(SupervisedEntity::equipment(2, "E", 20).with_parent(p).with_alive(200, 1_000))
        .await
        .unwrap();
    m.configure_entity(SupervisedEntity::sub_equipment(3, "S", 30).with_parent(e))
        .await
        .unwrap();
    for key in [p, e, s] {
        m.start(key, 10).await.unwrap();
    }

    let outcomes = m.disconnect_process(1, 20).await.unwrap();
    let keys: Vec<_> = outcomes.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![p, e, s]);
    assert!(outcomes.iter().all(|(_, o)| o.is_accepted()));
    for key in [p, e, s] {
        assert_eq!(status(&m, key).await.0, SupervisionStatus::Stopped);
    }
    assert!(!m.liveness().record(200).unwrap().active);
}

#[tokio::test]
async fn confirm_status_restates_every_entity() {
    let rec = Arc::new(Recorder::default());
    let m = ManagerBuilder::new(manual_scan())
        .with_entity_listener(CacheEventKind::ConfirmStatus, Delivery::synchronous(rec.clone()))
        .build()
        .unwrap();
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    m.configure_entity(SupervisedEntity::process(2, "Q", 20)).await.unwrap();
    m.start(EntityKey::process(2), 5).await.unwrap();

    assert_eq!(m.confirm_status().await, 2);
    let seen = rec.0.lock().await.clone();
    assert_eq!(
        seen,
        vec![
            (CacheEventKind::ConfirmStatus, EntityKey::process(1), SupervisionStatus::Down),
            (CacheEventKind::ConfirmStatus, EntityKey::process(2), SupervisionStatus::Startup),
        ]
    );
}

#[tokio::test]
async fn bus_carries_accepted_writes_in_order() {
    let m = manager();
    let p = EntityKey::process(1);
    m.configure_entity(SupervisedEntity::process(1, "P", 10)).await.unwrap();
    let mut bus = m.subscribe();

    m.start(p, 1).await.unwrap();
    m.resume(p, 2, "up").await.unwrap();
    m.suspend(p, 3, "gone").await.unwrap();

    let statuses: Vec<_> = [
        bus.recv().await.unwrap(),
        bus.recv().await.unwrap(),
        bus.recv().await.unwrap(),
    ]
    .into_iter()
    .map(|e| e.status)
    .collect();
    assert_eq!(
        statuses,
        vec![
            SupervisionStatus::Startup,
            SupervisionStatus::Running,
            SupervisionStatus::Down
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn background_scanner_suspends_silent_entities() {
    let cfg = SupervisionConfig {
        expiry_scan_period: std::time::Duration::from_millis(100),
        ..SupervisionConfig::default()
    };
    let m = ManagerBuilder::new(cfg).build().unwrap();
    let p = EntityKey::process(1);
    m.configure_entity(SupervisedEntity::process(1, "P", 10).with_alive(100, 1_000))
        .await
        .unwrap();

    m.on_alive(AliveSignal {
        alive_tag_id: 100,
        signal_ts: 0,
        arrival_ts: 0,
    })
    .await
    .unwrap();
    assert!(m.spawn_scanner().await);
    assert!(!m.spawn_scanner().await);

    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    assert_eq!(status(&m, p).await.0, SupervisionStatus::Down);
    m.shutdown().await.unwrap();
}
