use crate::cli::{BackupArgs, Context};
use anyhow::Result;

pub async fn run(args: BackupArgs, ctx: &Context) -> Result<()> {
    let db_path = ctx.config.db_path();
    if !db_path.exists() {
        anyhow::bail!("Database not found at {}", db_path.display());
    }

    let nw = ctx.open()?;
    println!(
        "Creating backup: {} -> {}",
        db_path.display(),
        args.path.display()
    );

    nw.backup(&args.path)?;
    tracing::info!("Backup written to {}", args.path.display());

    let size = std::fs::metadata(&args.path).map(|m| m.len()).unwrap_or(0);
    println!(
        "Backup complete: {} ({:.1} MB)",
        args.path.display(),
        size as f64 / 1_048_576.0
    );

    Ok(())
}
