//! Install command - precache the current generation

use crate::config::Config;
use crate::error::PrecacheResult;
use crate::store::CacheStore;
use crate::ui::{self, InstallProgress, UiContext};
use std::sync::Arc;

/// Execute the install command
pub async fn execute(config: &Config, store: Arc<dyn CacheStore>) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let worker = super::build_worker(config, store)?;
    let registry = worker.registry();

    let progress = InstallProgress::new(
        &ctx,
        registry.generation().as_str(),
        registry.manifest().len(),
    );
    let result = worker
        .install_with_progress(&|done, total, path| progress.on_stored(done, total, path))
        .await;
    progress.finish();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if e.is_retryable() {
                ui::step_warn(&ctx, "Nothing was stored; the install can be retried");
            }
            return Err(e);
        }
    };

    ui::step_ok_detail(
        &ctx,
        &format!("Installed generation {}", report.generation),
        &format!("{} assets, {} bytes", report.assets, report.bytes),
    );
    ui::step_info(&ctx, "Run `precache activate` to start serving it");
    Ok(())
}
