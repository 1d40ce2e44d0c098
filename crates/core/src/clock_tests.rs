// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances_instant_and_epoch_together() {
    let clock = FakeClock::new();
    let start = clock.now();
    let epoch = clock.epoch_ms();

    clock.advance(Duration::from_millis(2500));

    assert_eq!(clock.now() - start, Duration::from_millis(2500));
    assert_eq!(clock.epoch_ms(), epoch + 2500);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let clone = clock.clone();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clone.now(), clock.now());
}

#[test]
fn system_clock_epoch_is_sane() {
    let clock = SystemClock;
    // Well after 2020-01-01 in epoch milliseconds
    assert!(clock.epoch_ms() > 1_577_836_800_000);
}
