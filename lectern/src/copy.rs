//! Copied-code indicator with a self-cancelling reset timer.
//!
//! At most one code block shows a "copied" indicator at a time. Activating a
//! second block replaces the first immediately; the first block's pending
//! reset timer is invalidated by an epoch check when it fires, so it can
//! never clear the newer indicator. This is the same compare-and-discard
//! staleness idiom the chapter session uses for fetches.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use tokio::sync::watch;

/// Indicator reset delay.
pub const RESET_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct IndicatorState {
  epoch:  u64,
  active: Option<String>,
}

/// Tracks which code block, if any, currently shows a "copied" indicator.
#[derive(Debug, Clone)]
pub struct CopyIndicator {
  delay: Duration,
  state: Arc<Mutex<IndicatorState>>,
  tx:    watch::Sender<Option<String>>,
}

impl Default for CopyIndicator {
  fn default() -> Self {
    Self::new(RESET_DELAY)
  }
}

impl CopyIndicator {
  /// Create an indicator with a custom reset delay.
  #[must_use]
  pub fn new(delay: Duration) -> Self {
    let (tx, _rx) = watch::channel(None);
    Self {
      delay,
      state: Arc::new(Mutex::new(IndicatorState::default())),
      tx,
    }
  }

  /// Record that the given block was copied. Any previously active
  /// indicator is replaced and its pending reset is invalidated.
  ///
  /// Must be called from within a tokio runtime (the reset timer is a
  /// spawned task).
  pub fn copied(&self, block_id: impl Into<String>) {
    let block_id = block_id.into();
    let epoch = {
      let Ok(mut state) = self.state.lock() else {
        return;
      };
      state.epoch += 1;
      state.active = Some(block_id.clone());
      state.epoch
    };
    let _ = self.tx.send(Some(block_id));

    let state = Arc::clone(&self.state);
    let tx = self.tx.clone();
    let delay = self.delay;
    tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let Ok(mut state) = state.lock() else {
        return;
      };
      // A newer copy superseded this timer; leave its indicator alone.
      if state.epoch != epoch {
        return;
      }
      state.active = None;
      let _ = tx.send(None);
    });
  }

  /// The block currently showing the indicator, if any.
  #[must_use]
  pub fn active(&self) -> Option<String> {
    self.state.lock().map(|s| s.active.clone()).unwrap_or(None)
  }

  /// Subscribe to indicator changes.
  #[must_use]
  pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
    self.tx.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn indicator_resets_after_delay() {
    let indicator = CopyIndicator::new(Duration::from_secs(2));
    indicator.copied("block-x");
    assert_eq!(indicator.active().as_deref(), Some("block-x"));

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(indicator.active(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn second_copy_replaces_first_without_stale_reset() {
    let indicator = CopyIndicator::new(Duration::from_secs(2));
    indicator.copied("block-x");

    // Copy Y while X's reset is still pending.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    indicator.copied("block-y");
    assert_eq!(indicator.active().as_deref(), Some("block-y"));

    // X's timer fires here; it must not clear Y's indicator.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(indicator.active().as_deref(), Some("block-y"));

    // Y's own timer eventually clears it.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(indicator.active(), None);
  }
}
