//! End-to-end persistence flows through the in-memory backend.
//!
//! Each test drives a real [`PersistenceGateway`] with a [`ManualClock`]
//! for game time and tokio's paused clock for retry and deadline waits.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use std::sync::Arc;
use std::time::Duration;

use delve_core::{
    Capabilities, EventHooks, JoinOrigin, ManualClock, PersistenceGateway, ServerConfig,
    ShutdownSignal,
};
use delve_db::MemoryBackend;
use delve_types::{
    CURRENT_SCHEMA_VERSION, DeclineReason, PlayerId, Rarity, StructureId, StructureKind, Variant,
};
use serde_json::json;
use tokio::time::Instant;

const START: i64 = 1_700_000_000;

struct Harness {
    gateway: Arc<PersistenceGateway<Arc<MemoryBackend>>>,
    backend: Arc<MemoryBackend>,
    clock: Arc<ManualClock>,
}

fn harness_with(config: &ServerConfig, caps: Capabilities) -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    let clock = Arc::new(ManualClock::new(START));
    let caps = caps.with_clock(clock.clone()).with_rng_seed(42);
    let gateway = Arc::new(PersistenceGateway::from_config(
        Arc::clone(&backend),
        config,
        caps,
    ));
    Harness {
        gateway,
        backend,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(&ServerConfig::default(), Capabilities::default())
}

#[tokio::test(start_paused = true)]
async fn join_play_leave_rejoin() {
    let h = harness();
    let id = PlayerId::new();
    let incubator = StructureId::new();
    let pen = StructureId::new();

    let joined = h.gateway.join(id).await.unwrap();
    assert_eq!(joined.origin, JoinOrigin::Fresh);

    let unit_id = {
        let mut s = joined.handle.lock().await;
        for _ in 0..5 {
            s.record_mining_hit("copper", 4, 3, 1).unwrap();
        }
        assert_eq!(s.sell().unwrap(), 20);
        s.claim_structure(incubator, StructureKind::Incubator).unwrap();
        s.claim_structure(pen, StructureKind::Pen).unwrap();
        let egg = s.grant_egg(Rarity::Uncommon, Variant::Normal).unwrap();
        s.place_egg(incubator, egg.id).unwrap();
        drop(s);

        h.clock.advance(60);
        let mut s = joined.handle.lock().await;
        let unit = s.hatch(incubator).unwrap().unit;
        s.place_unit(pen, unit.id).unwrap();
        // Leave another egg mid-incubation.
        let egg = s.grant_egg(Rarity::Epic, Variant::Rainbow).unwrap();
        s.place_egg(incubator, egg.id).unwrap();
        unit.id
    };

    h.clock.advance(120);
    assert!(h.gateway.leave(id).await);
    assert!(h.gateway.session(id).await.is_none());

    // Offline time does not accrue pen income.
    h.clock.advance(10_000);
    let rejoined = h.gateway.join(id).await.unwrap();
    assert!(matches!(
        rejoined.origin,
        JoinOrigin::Stored {
            from_version: CURRENT_SCHEMA_VERSION,
            ..
        }
    ));

    let s = rejoined.handle.lock().await;
    assert_eq!(s.ledger().currency(), 20);
    assert_eq!(s.progression().stats.blocks_mined, 5);
    assert_eq!(s.progression().stats.cash_earned, 20);
    assert_eq!(s.progression().stats.play_time_seconds, 180);
    assert_eq!(s.structures().pen(pen).unwrap().unit_id, unit_id);
    assert_eq!(s.pending_income(pen).unwrap(), 0);
    // Incubation timers keep running across the restart.
    assert_eq!(s.time_remaining(incubator).unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn legacy_record_is_migrated_on_join() {
    let h = harness();
    let id = PlayerId::new();
    let key = h.gateway.store().key(id);
    h.backend
        .seed(
            &key,
            json!({
                "currency": 75,
                "backpackLevel": 2,
                "blocksMined": 400,
                "storageUsed": 2,
                "inventoryValue": 20,
                "oreBreakdown": { "tin": { "qty": 2, "totalValue": 20, "unitValue": 10 } }
            }),
        )
        .await;

    let joined = h.gateway.join(id).await.unwrap();
    assert!(matches!(
        joined.origin,
        JoinOrigin::Stored { from_version: 1, .. }
    ));
    {
        let s = joined.handle.lock().await;
        assert_eq!(s.ledger().currency(), 75);
        assert_eq!(s.ledger().capacity(), 100);
        assert_eq!(s.progression().equipped_backpack, 2);
        assert_eq!(s.progression().stats.blocks_mined, 400);
    }

    assert!(h.gateway.leave(id).await);
    let stored = h.backend.peek(&key).await.unwrap();
    assert_eq!(stored["version"], json!(CURRENT_SCHEMA_VERSION));
    assert_eq!(stored["stats"]["blocksMined"], json!(400));
    assert!(stored.get("blocksMined").is_none());
}

#[tokio::test(start_paused = true)]
async fn autosave_failure_is_isolated_per_player() {
    let h = harness();
    let healthy = PlayerId::new();
    let broken = PlayerId::new();
    h.gateway.join(healthy).await.unwrap();
    h.gateway.join(broken).await.unwrap();

    h.backend
        .set_key_unavailable(&h.gateway.store().key(broken), true)
        .await;

    let summary = h.gateway.autosave_once().await;
    assert_eq!(summary.saved, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        h.backend.write_count(&h.gateway.store().key(healthy)).await,
        1
    );
    // The failing player's session is untouched and still live.
    assert!(h.gateway.session(broken).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn autosave_loop_runs_on_interval_and_stops_on_shutdown() {
    let h = harness();
    let id = PlayerId::new();
    h.gateway.join(id).await.unwrap();

    let shutdown = ShutdownSignal::new();
    let task = {
        let gateway = Arc::clone(&h.gateway);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { gateway.run_autosave(&shutdown).await })
    };

    let key = h.gateway.store().key(id);
    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(h.backend.write_count(&key).await, 0);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.backend.write_count(&key).await, 1);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.backend.write_count(&key).await, 2);

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_flush_skips_players_saved_on_leave() {
    let h = harness();
    let left = PlayerId::new();
    let online = PlayerId::new();
    h.gateway.join(left).await.unwrap();
    h.gateway.join(online).await.unwrap();

    // Hold the leaving player's handle as a late autosave would.
    let late_handle = h.gateway.session(left).await.unwrap();
    assert!(h.gateway.leave(left).await);
    assert!(late_handle.lock().await.is_saved());

    let summary = h.gateway.shutdown_flush().await.unwrap();
    assert_eq!(summary.saved, 1);
    assert_eq!(h.backend.write_count(&h.gateway.store().key(left)).await, 1);
    assert_eq!(
        h.backend.write_count(&h.gateway.store().key(online)).await,
        1
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_flush_respects_deadline() {
    let config = ServerConfig::parse(
        r"
persistence:
  shutdown_deadline_ms: 2000
  retry_delay_ms: 250
",
    )
    .unwrap();
    let h = harness_with(&config, Capabilities::default());
    for _ in 0..3 {
        h.gateway.join(PlayerId::new()).await.unwrap();
    }
    h.backend.set_write_delay(Duration::from_secs(30));

    let started = Instant::now();
    let summary = h.gateway.shutdown_flush().await.unwrap();
    assert_eq!(summary.failed, 3);
    assert!(started.elapsed() <= Duration::from_millis(2100));
}

#[tokio::test(start_paused = true)]
async fn shutdown_flush_retries_transient_failures_within_deadline() {
    let h = harness();
    let id = PlayerId::new();
    h.gateway.join(id).await.unwrap();
    h.backend.fail_next(2);

    let summary = h.gateway.shutdown_flush().await.unwrap();
    assert_eq!(summary.saved, 1);
    assert!(h.gateway.session(id).await.unwrap().lock().await.is_saved());
}

#[tokio::test(start_paused = true)]
async fn failed_leave_is_saved_by_shutdown_flush() {
    let h = harness();
    let id = PlayerId::new();
    h.gateway.join(id).await.unwrap();
    h.gateway
        .with_session(id, |s| {
            s.record_mining_hit("copper", 4, 3, 1).unwrap();
            s.sell().unwrap()
        })
        .await
        .unwrap();
    h.backend.set_unavailable(true);

    assert!(!h.gateway.leave(id).await);
    assert!(h.gateway.session(id).await.is_none());

    // Play time stops at departure even while the record waits.
    h.clock.advance(500);
    h.backend.set_unavailable(false);
    let summary = h.gateway.shutdown_flush().await.unwrap();
    assert_eq!(summary.saved, 1);

    let stored = h.backend.peek(&h.gateway.store().key(id)).await.unwrap();
    assert_eq!(stored["currency"], json!(4));
    assert_eq!(stored["stats"]["playTimeSeconds"], json!(0));
    assert_eq!(stored["lastSavedAt"], json!(START));
}

#[derive(Default)]
struct RecordingHooks {
    events: std::sync::Mutex<Vec<String>>,
}

impl RecordingHooks {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl EventHooks for RecordingHooks {
    fn session_started(&self, _player: PlayerId, unsaved_baseline: bool) {
        self.push(format!("started baseline={unsaved_baseline}"));
    }

    fn ore_discovered(&self, _player: PlayerId, kind: &str) {
        self.push(format!("discovered {kind}"));
    }

    fn backpack_full(&self, _player: PlayerId, capacity: u32) {
        self.push(format!("full {capacity}"));
    }

    fn record_saved(&self, _player: PlayerId, ok: bool) {
        self.push(format!("saved {ok}"));
    }

    fn session_ended(&self, _player: PlayerId) {
        self.push("ended".to_owned());
    }
}

#[tokio::test(start_paused = true)]
async fn hooks_observe_without_affecting_state() {
    let config = ServerConfig::parse(
        r"
inventory:
  backpack_capacities: [1]
",
    )
    .unwrap();
    let hooks = Arc::new(RecordingHooks::default());
    let h = harness_with(&config, Capabilities::default().with_hooks(hooks.clone()));
    let id = PlayerId::new();
    h.gateway.join(id).await.unwrap();

    let second = h
        .gateway
        .with_session(id, |s| {
            s.record_mining_hit("quartz", 3, 1, 1).unwrap();
            s.record_mining_hit("quartz", 3, 1, 1)
        })
        .await
        .unwrap();
    assert_eq!(second.unwrap_err().reason(), DeclineReason::CapacityExceeded);
    assert!(h.gateway.leave(id).await);

    let events = hooks.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "started baseline=false".to_owned(),
            "discovered quartz".to_owned(),
            "full 1".to_owned(),
            "saved true".to_owned(),
            "ended".to_owned(),
        ]
    );
}
