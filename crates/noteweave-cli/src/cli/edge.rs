use crate::cli::{parse_id, print_edge_table, Context, EdgeCommands, EdgeListArgs};
use anyhow::Result;
use noteweave_core::Storage;

pub async fn run(cmd: EdgeCommands, ctx: &Context) -> Result<()> {
    match cmd {
        EdgeCommands::List(args) => list(args, ctx),
    }
}

fn list(args: EdgeListArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;
    let id = parse_id(&args.note)?;
    let storage = nw.storage();

    let edges = match args.direction.as_str() {
        "outgoing" | "out" => storage.edges_from(id)?,
        "incoming" | "in" => storage.edges_to(id)?,
        "both" => {
            let mut edges = storage.edges_from(id)?;
            edges.extend(storage.edges_to(id)?);
            edges
        }
        other => anyhow::bail!(
            "Unknown direction '{}', expected outgoing|incoming|both",
            other
        ),
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&edges)?);
    } else {
        print_edge_table(&edges);
    }

    Ok(())
}
