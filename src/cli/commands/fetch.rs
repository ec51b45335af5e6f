//! Fetch command - resolve one request the way the worker would

use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{parse_method, Request, RequestMode};
use crate::store::CacheStore;
use crate::ui::{self, UiContext};
use std::io::Write;
use std::sync::Arc;
use tokio::fs;

/// Execute the fetch command
pub async fn execute(
    args: FetchArgs,
    config: &Config,
    store: Arc<dyn CacheStore>,
) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let worker = super::build_worker(config, store)?;

    if !worker.resume().await? {
        ui::step_warn_hint(
            &ctx,
            &format!(
                "Generation {} is not installed",
                worker.registry().generation()
            ),
            "Run: precache install && precache activate",
        );
    }

    let mut request = Request::new(parse_method(&args.method)?, &args.url)?;
    if let Some(data) = args.data {
        request = request.with_body(data);
    }
    if args.cors {
        request = request.with_mode(RequestMode::Cors);
    }
    let outcome = worker.fetch(&request).await;
    let source = outcome.source();

    let Some(mut response) = outcome.response() else {
        ui::step_info(
            &ctx,
            &format!("Request declined, {} is not handled by the cache", args.url),
        );
        return Ok(());
    };

    // Let a network write-back land before the process exits
    worker.flush().await;

    ui::key_value(&ctx, "source", source);
    ui::key_value(
        &ctx,
        "status",
        &format!("{} {}", response.status, response.status_text),
    );
    ui::key_value(&ctx, "type", &response.response_type.to_string());

    let body = response.bytes()?;
    ui::key_value(&ctx, "bytes", &body.len().to_string());
    match args.output {
        Some(path) => {
            fs::write(&path, &body)
                .await
                .map_err(|e| PrecacheError::io(format!("writing {}", path.display()), e))?;
            ui::step_ok_detail(&ctx, "Wrote body", &path.display().to_string());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&body)
                .and_then(|_| stdout.flush())
                .map_err(|e| PrecacheError::io("writing response body", e))?;
        }
    }
    Ok(())
}
