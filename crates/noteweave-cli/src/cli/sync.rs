use crate::cli::note::print_sync_line;
use crate::cli::{parse_id, Context, SyncArgs};
use anyhow::Result;

pub async fn run(args: SyncArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;

    let report = if args.all {
        nw.resync_all()?
    } else {
        let raw = args
            .id
            .ok_or_else(|| anyhow::anyhow!("Give a note id or --all"))?;
        let id = parse_id(&raw)?;
        let note = nw
            .get_note(id)?
            .filter(|n| !n.deleted)
            .ok_or_else(|| anyhow::anyhow!("Note {} not found", id))?;
        // Edges are always derived as the note's owner
        nw.sync(note.id, &note.body, &note.owner)?
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_sync_line(&report);
        tracing::debug!("{}", nw.linker_metrics().summary());
    }

    Ok(())
}
