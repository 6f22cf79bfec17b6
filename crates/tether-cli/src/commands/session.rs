use super::print_json;
use crate::context::Context;
use anyhow::{Result, bail};
use clap::Args;
use serde_json::json;
use tether_core::WindowStatePatch;

#[derive(Args, Debug)]
pub struct PatchArgs {
    #[arg(long)]
    core_open: Option<bool>,
    #[arg(long)]
    text_open: Option<bool>,
    #[arg(long)]
    text_open_window_up: Option<bool>,
    #[arg(long)]
    text_welcome: Option<bool>,
    #[arg(long)]
    voice_open: Option<bool>,
    #[arg(long)]
    voice_open_window_up: Option<bool>,
    #[arg(long)]
    auto_mic: Option<bool>,
}

impl From<PatchArgs> for WindowStatePatch {
    fn from(args: PatchArgs) -> Self {
        WindowStatePatch {
            core_open: args.core_open,
            text_open: args.text_open,
            text_open_window_up: args.text_open_window_up,
            text_welcome: args.text_welcome,
            voice_open: args.voice_open,
            voice_open_window_up: args.voice_open_window_up,
            auto_mic: args.auto_mic,
        }
    }
}

async fn acquire(ctx: &Context) {
    ctx.manager.initialize().await;
    ctx.manager.settle().await;
    if !ctx.manager.current_record().is_persisted() {
        eprintln!("warning: no session could be acquired, changes will not persist");
    }
}

pub async fn init(ctx: &Context) -> Result<()> {
    acquire(ctx).await;
    print_json(&ctx.manager.current_record())
}

pub async fn show(ctx: &Context) -> Result<()> {
    acquire(ctx).await;
    let manager = &ctx.manager;
    print_json(&json!({
        "ownerId": manager.owner_id(),
        "phase": format!("{:?}", manager.phase()),
        "currentThreadId": manager.current_thread_id(),
        "launcher": format!("{:?}", manager.visibility().state()),
        "surfaces": ctx.surface.snapshot(),
        "session": manager.current_record(),
    }))
}

pub async fn patch(ctx: &Context, args: PatchArgs) -> Result<()> {
    let patch = WindowStatePatch::from(args);
    if patch.is_empty() {
        bail!("Nothing to patch: pass at least one flag such as --text-open true");
    }

    acquire(ctx).await;
    ctx.manager.request_patch(patch);
    ctx.manager.settle().await;
    print_json(&ctx.manager.current_record())
}

pub async fn clear(ctx: &Context) -> Result<()> {
    acquire(ctx).await;
    let record = ctx.manager.clear_history().await?;
    print_json(&json!({
        "currentThreadId": ctx.manager.current_thread_id(),
        "session": record,
    }))
}

pub async fn forget(ctx: &Context) -> Result<()> {
    ctx.manager.forget_session().await?;
    println!("Session handle for {} forgotten", ctx.config.owner_id);
    Ok(())
}
