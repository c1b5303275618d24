// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn refresh_wait_leaves_the_buffer() {
    let strategy = RefreshStrategy { buffer_secs: 300, error_retry: Duration::from_secs(5) };
    // expires_at 1000, buffer 300, now 100 -> fire in 600s.
    assert_eq!(strategy.refresh_wait(1_000, 100), Duration::from_secs(600));
}

#[test]
fn refresh_wait_is_zero_when_inside_the_buffer() {
    let strategy = RefreshStrategy::default();
    assert_eq!(strategy.refresh_wait(1_000, 700), Duration::ZERO);
    assert_eq!(strategy.refresh_wait(1_000, 1_000), Duration::ZERO);
    // Token already expired.
    assert_eq!(strategy.refresh_wait(1_000, 2_000), Duration::ZERO);
}

#[test]
fn refresh_wait_saturates_on_short_lived_tokens() {
    let strategy = RefreshStrategy::default();
    // Lifetime shorter than the buffer: refresh immediately, no underflow.
    assert_eq!(strategy.refresh_wait(200, 0), Duration::ZERO);
}

#[test]
fn default_strategy_values() {
    let strategy = RefreshStrategy::default();
    assert_eq!(strategy.buffer_secs, 300);
    assert_eq!(strategy.error_retry, Duration::from_secs(5));
}
