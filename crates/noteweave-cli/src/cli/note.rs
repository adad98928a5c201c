use crate::cli::{
    parse_id, print_note_table, read_body, truncate, Context, NoteCommands, NoteCreateArgs,
    NoteDeleteArgs, NoteEditArgs, NoteGetArgs, NoteListArgs,
};
use anyhow::Result;
use noteweave_core::{normalize_tag, Note, NoteFilter, Storage, SyncReport};

pub async fn run(cmd: NoteCommands, ctx: &Context) -> Result<()> {
    match cmd {
        NoteCommands::Create(args) => create(args, ctx),
        NoteCommands::Get(args) => get(args, ctx),
        NoteCommands::List(args) => list(args, ctx),
        NoteCommands::Edit(args) => edit(args, ctx),
        NoteCommands::Delete(args) => delete(args, ctx),
    }
}

fn create(args: NoteCreateArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;
    let body = read_body(args.body, args.stdin)?;

    let (note, report) = nw.create_note(&ctx.user, args.visibility, args.title, body, &args.tags)?;

    if args.format == "json" {
        println!(
            "{}",
            serde_json::json!({
                "note": note,
                "sync": report,
            })
        );
    } else {
        println!("Created note {}", note.id);
        print_note_detail(&note);
        print_sync_line(&report);
    }

    Ok(())
}

fn get(args: NoteGetArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;
    let id = parse_id(&args.id)?;

    let note = nw
        .get_note(id)?
        .filter(|n| !n.deleted && n.is_visible_to(&ctx.user))
        .ok_or_else(|| anyhow::anyhow!("Note {} not found", id))?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        print_note_detail(&note);
        let outgoing = nw.storage().edges_from(id)?.len();
        let incoming = nw.storage().edges_to(id)?.len();
        println!("Links:      {} out, {} in", outgoing, incoming);
    }

    Ok(())
}

fn list(args: NoteListArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;

    let mut filter = NoteFilter::new()
        .visible_to(&ctx.user)
        .with_limit(args.limit)
        .with_offset(args.offset);
    if args.mine {
        filter = filter.with_owner(&ctx.user);
    }
    if !args.tags.is_empty() {
        filter = filter.with_tags(args.tags.iter().map(|t| normalize_tag(t)).collect());
    }

    let notes = nw.list_notes(filter)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else {
        print_note_table(&notes);
    }

    Ok(())
}

fn edit(args: NoteEditArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;
    let id = parse_id(&args.id)?;
    let body = read_body(args.body, args.stdin)?;

    let (note, report) = nw.update_body(id, body, &ctx.user)?;

    if args.format == "json" {
        println!(
            "{}",
            serde_json::json!({
                "note": note,
                "sync": report,
            })
        );
    } else {
        println!("Updated note {}", note.id);
        print_sync_line(&report);
    }

    Ok(())
}

fn delete(args: NoteDeleteArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;
    let id = parse_id(&args.id)?;

    nw.delete_note(id, &ctx.user)?;
    println!("Deleted note {}", id);

    Ok(())
}

pub fn print_note_detail(n: &Note) {
    println!("ID:         {}", n.id);
    println!("Title:      {}", n.title);
    println!("Owner:      {}", n.owner);
    println!("Visibility: {}", n.visibility);
    println!("Body:       {}", truncate(&n.body, 120));
    println!("Tags:       {}", n.tags.join(", "));
    println!("Created:    {}", n.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Updated:    {}", n.updated_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Embedding:  {}", if n.embedding.is_some() { "yes" } else { "no" });
}

pub fn print_sync_line(report: &SyncReport) {
    println!(
        "Links: {} valid ({} created, {} updated, {} removed, {} unresolved)",
        report.valid_links, report.created, report.updated, report.removed, report.unresolved
    );
    if !report.is_clean() {
        println!("Warning: {} storage or notification failures, see log", report.failures);
    }
}
