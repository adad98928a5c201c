use crate::cli::{parse_id, print_suggestion_table, Context, SuggestArgs};
use anyhow::Result;
use noteweave_core::SuggestRequest;

pub async fn run(args: SuggestArgs, ctx: &Context) -> Result<()> {
    let nw = ctx.open()?;

    let request = match (args.note, args.text) {
        (Some(raw), _) => {
            let id = parse_id(&raw)?;
            let note = nw
                .get_note(id)?
                .filter(|n| !n.deleted && n.is_visible_to(&ctx.user))
                .ok_or_else(|| anyhow::anyhow!("Note {} not found", id))?;

            let mut request = SuggestRequest::for_note(&note, args.limit).with_viewer(&ctx.user);
            if !args.tags.is_empty() {
                request = request.with_tags(&args.tags);
            }
            request
        }
        (None, Some(text)) => SuggestRequest::new(text, args.limit)
            .with_tags(&args.tags)
            .with_viewer(&ctx.user),
        (None, None) => anyhow::bail!("Give --note <id> or --text <text>"),
    };

    let suggestions = nw.suggest(&request).await;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
    } else {
        print_suggestion_table(&suggestions);
    }

    Ok(())
}
