use crate::cli::{ConfigCommands, Context};
use anyhow::Result;

pub async fn run(cmd: ConfigCommands, ctx: &Context) -> Result<()> {
    match cmd {
        ConfigCommands::Validate => validate(ctx),
        ConfigCommands::Show => show(ctx),
    }
}

fn validate(ctx: &Context) -> Result<()> {
    let path = &ctx.config_path;
    if !path.exists() {
        println!("{} not found; defaults apply and are valid.", path.display());
        return Ok(());
    }

    let config = crate::config::NoteweaveConfig::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;

    let errors = config.validate();
    if errors.is_empty() {
        println!("{} is valid.", path.display());
        Ok(())
    } else {
        println!("Validation errors in {}:", path.display());
        for e in &errors {
            println!("  - {}", e);
        }
        anyhow::bail!("{} invalid setting(s)", errors.len())
    }
}

/// The effective configuration, after defaults and overrides
fn show(ctx: &Context) -> Result<()> {
    match toml::to_string_pretty(&ctx.config) {
        Ok(s) => println!("{}", s),
        Err(e) => anyhow::bail!("Failed to serialize config: {}", e),
    }
    Ok(())
}
