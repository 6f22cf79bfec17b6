use super::print_json;
use crate::context::Context;
use anyhow::Result;
use parking_lot::Mutex;
use std::ops::ControlFlow;
use std::sync::Arc;
use tether_application::{PollOutcome, StatusPoller};
use tether_core::SessionRecord;

/// Polls the session and prints the record whenever it changes.
pub async fn run(ctx: &Context) -> Result<()> {
    ctx.manager.initialize().await;

    let settings = ctx.poller_settings();
    eprintln!(
        "Watching session every {:?} (stops after {:?}, Ctrl-C to quit)",
        settings.interval, settings.ceiling
    );

    let poller = StatusPoller::new(settings);
    let token = poller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let last_seen: Arc<Mutex<Option<SessionRecord>>> = Arc::new(Mutex::new(None));
    let outcome = poller
        .run(|| {
            let manager = Arc::clone(&ctx.manager);
            let last_seen = Arc::clone(&last_seen);
            async move {
                match manager.refresh().await {
                    Ok(record) => {
                        let changed = last_seen.lock().as_ref() != Some(&record);
                        if changed {
                            if let Err(e) = print_json(&record) {
                                tracing::warn!("[Watch] Failed to print record: {}", e);
                            }
                            *last_seen.lock() = Some(record);
                        }
                    }
                    Err(e) => tracing::warn!("[Watch] Refresh failed: {}", e),
                }
                ControlFlow::Continue(())
            }
        })
        .await;

    match outcome {
        PollOutcome::CeilingReached { polls } => {
            eprintln!("Stopped after {} polls: time limit reached", polls)
        }
        PollOutcome::Cancelled { polls } => eprintln!("Stopped after {} polls", polls),
        PollOutcome::Completed { polls } => eprintln!("Finished after {} polls", polls),
    }
    Ok(())
}
