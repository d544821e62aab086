//! CPU placement helpers for latency-critical threads.

use anyhow::{anyhow, Result};

/// Pin the current thread to a specific CPU core.
///
/// Keeps the ingest thread's cache state and interrupt behavior stable under
/// load. Fails if the core id does not exist on this machine.
pub fn pin_to_core(core: usize) -> Result<()> {
    let core_ids =
        core_affinity::get_core_ids().ok_or_else(|| anyhow!("could not enumerate CPU cores"))?;
    let target = core_ids
        .into_iter()
        .find(|id| id.id == core)
        .ok_or_else(|| anyhow!("core {} not present on this machine", core))?;
    if !core_affinity::set_for_current(target) {
        return Err(anyhow!("failed to set affinity to core {}", core));
    }
    Ok(())
}
