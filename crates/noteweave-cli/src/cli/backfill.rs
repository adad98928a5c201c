use crate::cli::{BackfillArgs, Context};
use anyhow::Result;
use noteweave_core::BackfillReport;

pub async fn run(args: BackfillArgs, ctx: &Context) -> Result<()> {
    if ctx.config.embedding_model.is_none() {
        anyhow::bail!(
            "No embedding_model set in {}; nothing to backfill with",
            ctx.config_path.display()
        );
    }

    let nw = ctx.open()?;
    let batch = args.batch.unwrap_or(ctx.config.backfill.batch_size).max(1);
    tracing::info!("Backfilling with {} in batches of {}", nw.embedding_model(), batch);

    let mut total = BackfillReport::default();
    loop {
        let report = nw.backfill_embeddings(batch).await?;
        total.embedded += report.embedded;
        total.failed += report.failed;
        total.remaining = report.remaining;

        // Stop when a batch makes no progress, or after one batch without --all
        if !args.all || report.remaining == 0 || report.embedded == 0 {
            break;
        }
    }

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&total)?);
    } else {
        println!(
            "Embedded {} notes ({} failed), {} remaining, {} indexed",
            total.embedded,
            total.failed,
            total.remaining,
            nw.indexed_count()
        );
    }

    Ok(())
}
