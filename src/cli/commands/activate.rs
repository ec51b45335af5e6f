//! Activate command - switch to the current generation and reap the rest

use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::store::CacheStore;
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;

/// Execute the activate command
pub async fn execute(config: &Config, store: Arc<dyn CacheStore>) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let worker = super::build_worker(config, store)?;

    if !worker.adopt_installed().await? {
        return Err(PrecacheError::LifecycleOrder {
            action: "activate".to_string(),
            state: worker.state().await.to_string(),
        });
    }

    let generation = worker.registry().generation().clone();
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Reaping stale generations...");
    let report = worker.activate().await?;

    if report.is_clean() {
        spinner.stop(&format!("Activated generation {}", generation));
    } else {
        spinner.stop_error(&format!(
            "Activated generation {} with {} stale generation(s) left behind",
            generation,
            report.failed.len()
        ));
    }

    for name in &report.deleted {
        ui::step_ok_detail(&ctx, "Deleted generation", name);
    }
    for (name, reason) in &report.failed {
        ui::step_warn_hint(&ctx, &format!("Could not delete {}", name), reason);
    }
    Ok(())
}
