//! Reveal timing against the server's clock sampling.
//!
//! Rounds are started at arbitrary offsets from the runtime's tick phase; the
//! reveal must never arrive before the round's limit has elapsed.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use proptest::prelude::*;
use unveil_harness::{SimClient, run_sim_server};
use unveil_proto::{ClientMessage, ServerMessage};
use unveil_server::ServerRuntimeConfig;

const ADDR: &str = "server:3000";

/// Longest a reveal may trail its deadline: one tick interval plus slack.
const LATE_BOUND: Duration = Duration::from_millis(200);

/// Run one round of `limit` seconds, started `offset` after the owner joins.
/// Returns how long after `timerStarted` the owner saw the reveal.
fn reveal_delay(limit: u32, offset: Duration) -> Duration {
    let mut sim = turmoil::Builder::new()
        .simulation_duration(Duration::from_secs(30))
        .min_message_latency(Duration::from_millis(1))
        .max_message_latency(Duration::from_millis(1))
        .build();

    sim.host("server", || async {
        let config =
            ServerRuntimeConfig { bind_address: "0.0.0.0:3000".to_string(), ..Default::default() };
        run_sim_server(config, 7).await
    });

    let observed = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&observed);

    sim.client("owner", async move {
        let mut alice = SimClient::connect(ADDR).await?;
        alice.join("R1", "Alice", true).await?;
        assert!(matches!(alice.recv().await?, ServerMessage::UpdatePlayers(_)));
        assert!(matches!(alice.recv().await?, ServerMessage::Joined { .. }));

        alice
            .send(&ClientMessage::SetTimerLimit { room_id: "R1".into(), limit: limit.into() })
            .await?;
        assert_eq!(alice.recv().await?, ServerMessage::LimitUpdated(limit));

        tokio::time::sleep(offset).await;
        alice.send(&ClientMessage::StartTimer("R1".into())).await?;
        assert_eq!(alice.recv().await?, ServerMessage::TimerStarted(limit));
        let started = tokio::time::Instant::now();

        assert!(matches!(alice.recv().await?, ServerMessage::Reveal(_)));
        *slot.lock().expect("slot poisoned") = Some(started.elapsed());

        Ok(())
    });

    sim.run().expect("simulation failed");
    let delay = observed.lock().expect("slot poisoned").take();
    delay.expect("owner never saw the reveal")
}

#[test]
fn round_started_just_before_a_tick_lasts_its_limit() {
    let elapsed = reveal_delay(2, Duration::from_millis(1900));

    assert!(elapsed >= Duration::from_secs(2), "revealed after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2) + LATE_BOUND, "revealed after {elapsed:?}");
}

#[test]
fn round_started_mid_tick_lasts_its_limit() {
    let elapsed = reveal_delay(1, Duration::from_millis(1_050));

    assert!(elapsed >= Duration::from_secs(1), "revealed after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1) + LATE_BOUND, "revealed after {elapsed:?}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn reveal_never_precedes_the_limit(limit in 1u32..=3, offset_ms in 0u64..1_000) {
        let elapsed = reveal_delay(limit, Duration::from_millis(offset_ms));
        let limit = Duration::from_secs(u64::from(limit));

        prop_assert!(elapsed >= limit, "revealed after {:?} for {:?}", elapsed, limit);
        prop_assert!(elapsed < limit + LATE_BOUND, "revealed after {:?} for {:?}", elapsed, limit);
    }
}
