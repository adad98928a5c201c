use crate::cli::{Context, OutboxCommands, OutboxDrainArgs, OutboxListArgs};
use anyhow::Result;
use noteweave_core::Storage;

pub async fn run(cmd: OutboxCommands, ctx: &Context) -> Result<()> {
    match cmd {
        OutboxCommands::List(args) => list(args, ctx),
        OutboxCommands::Drain(args) => drain(args, ctx),
    }
}

fn list(args: OutboxListArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;
    let events = nw.storage().pending_events(args.limit)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("(outbox empty)");
        return Ok(());
    }
    println!(
        "{:<16}  {:<12}  {:<12}  {:<36}  {}",
        "CREATED", "RECIPIENT", "ACTOR", "SOURCE", "TARGET"
    );
    println!("{}", "─".repeat(120));
    for e in &events {
        println!(
            "{:<16}  {:<12}  {:<12}  {:<36}  {}",
            e.created_at.format("%Y-%m-%d %H:%M"),
            crate::cli::truncate(&e.recipient, 12),
            crate::cli::truncate(&e.actor, 12),
            e.source,
            e.target
        );
    }

    Ok(())
}

/// One JSON object per line on stdout; an event is acked once written.
fn drain(args: OutboxDrainArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;

    let delivered = nw.drain_outbox(args.limit, |event| {
        let line = serde_json::to_string(event).map_err(|e| {
            noteweave_core::NoteweaveError::Validation(format!("Unencodable event: {}", e))
        })?;
        println!("{}", line);
        Ok(())
    })?;

    tracing::info!("Delivered {} outbox events", delivered);
    Ok(())
}
