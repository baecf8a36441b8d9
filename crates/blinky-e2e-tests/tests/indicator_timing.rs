//! E2E: indicator pulse timing across telemetry and inbound messages.
//! Runs on a paused clock.

mod helpers;

use std::time::Duration;

use blinky_agent::indicator::PULSE_DURATION;

use helpers::{LED_PIN, TestHarness};

#[tokio::test(start_paused = true)]
async fn acknowledged_send_pulses_once() {
    let mut h = TestHarness::new();

    h.invoke("start", "1", b"null").await;
    let pkids = h.write_outgoing().await;
    assert_eq!(pkids, vec![1]);
    assert!(h.gpio.writes_to(LED_PIN).is_empty());

    h.puback(1).await;
    assert_eq!(h.gpio.level(LED_PIN), Some(true));

    tokio::time::sleep(PULSE_DURATION + Duration::from_millis(1)).await;
    assert_eq!(h.gpio.writes_to(LED_PIN), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn unacknowledged_send_does_not_pulse() {
    let mut h = TestHarness::new();

    h.invoke("start", "1", b"null").await;
    h.write_outgoing().await;
    tokio::time::sleep(PULSE_DURATION * 2).await;

    assert!(h.gpio.writes_to(LED_PIN).is_empty());
    assert_eq!(h.ctx.hub().undelivered(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn acks_out_of_order_pulse_per_message() {
    let mut h = TestHarness::new();

    h.invoke("start", "1", b"null").await;
    h.invoke("stop", "2", b"null").await;
    assert_eq!(h.write_outgoing().await, vec![1, 2]);

    h.puback(2).await;
    assert_eq!(h.ctx.hub().undelivered(), vec![1]);
    h.puback(1).await;
    assert!(h.ctx.hub().undelivered().is_empty());
    assert_eq!(h.gpio.writes_to(LED_PIN), vec![true, true]);
}

#[tokio::test(start_paused = true)]
async fn failed_send_does_not_pulse() {
    let mut h = TestHarness::new();
    h.mqtt.set_fail_publish(true);

    h.invoke("start", "1", b"null").await;
    tokio::time::sleep(PULSE_DURATION * 2).await;

    assert!(h.gpio.writes_to(LED_PIN).is_empty());
}

#[tokio::test(start_paused = true)]
async fn overlapping_pulses_extend_the_on_period() {
    let mut h = TestHarness::new();

    h.cloud_to_device(b"first").await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    h.cloud_to_device(b"second").await;

    // Past the first pulse's deadline, still lit.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.gpio.level(LED_PIN), Some(true));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.gpio.writes_to(LED_PIN), vec![true, true, false]);
}

#[tokio::test(start_paused = true)]
async fn remote_indicator_is_not_pulsed() {
    let mut h = TestHarness::new();

    h.invoke("start", "1", b"null").await;
    tokio::time::sleep(PULSE_DURATION * 2).await;

    assert_eq!(h.gpio.writes_to(helpers::REMOTE_LED_PIN), vec![true]);
}
