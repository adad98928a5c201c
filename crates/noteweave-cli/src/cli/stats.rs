use crate::cli::{Context, FormatArgs, StatsArgs};
use anyhow::Result;
use noteweave_core::Storage;

pub async fn run(args: StatsArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;
    let stats = nw.stats()?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let db_mb = stats.db_size_bytes as f64 / 1_048_576.0;
    let fmt_time = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    println!();
    println!("Noteweave Overview");
    println!("{}", "─".repeat(50));
    println!("Notes:       {:>8}", stats.note_count);
    println!("  public     {:>8}", stats.public_note_count);
    println!("  embedded   {:>8}", stats.embedded_note_count);
    println!("Edges:       {:>8}", stats.edge_count);
    println!("Tags:        {:>8}", stats.tag_count);
    println!("Outbox:      {:>8}", stats.pending_events);
    println!("Oldest:      {}", fmt_time(stats.oldest_note));
    println!("Newest:      {}", fmt_time(stats.newest_note));
    println!("Model:       {}", nw.embedding_model());
    println!("DB Size:     {:>7.1} MB", db_mb);
    println!("{}", "─".repeat(50));
    println!();

    Ok(())
}

pub async fn tags(args: FormatArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;
    let tags = nw.storage().list_tags()?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }

    if tags.is_empty() {
        println!("(no tags)");
        return Ok(());
    }
    println!("{:<32}  {:>8}", "TAG", "NOTES");
    println!("{}", "─".repeat(42));
    for tag in &tags {
        println!("{:<32}  {:>8}", tag.name, tag.usage_count);
    }

    Ok(())
}
