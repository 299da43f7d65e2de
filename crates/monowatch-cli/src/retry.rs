//! Reattaching to the emulator.

use anyhow::Result;
use monowatch::memory::layout::timing::ATTACH_RETRY_DELAY;
use monowatch::worker::StopSignal;
use monowatch::{AttachedProcess, GameLayout};
use tracing::{debug, info};

/// Attach to `pid`, retrying until it succeeds.
///
/// Returns `Ok(None)` if shutdown was signaled. Configuration errors are not
/// retried.
pub fn attach_with_retry(
    pid: u32,
    layout: &GameLayout,
    stop: &StopSignal,
) -> Result<Option<AttachedProcess>> {
    let mut attempts = 0u32;
    loop {
        if stop.is_stopped() {
            return Ok(None);
        }
        attempts += 1;

        match AttachedProcess::attach(pid, layout.regions.clone(), layout.byte_order) {
            Ok(process) => return Ok(Some(process)),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for process {}...", pid);
                }
                debug!(
                    "Attach failed ({}), retrying in {}s (attempt {})",
                    e,
                    ATTACH_RETRY_DELAY.as_secs(),
                    attempts
                );
            }
        }

        if stop.sleep(ATTACH_RETRY_DELAY) {
            return Ok(None);
        }
    }
}
