use noteweave_core::{LibraryConfig, Noteweave, Storage, SuggestRequest, Visibility};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Noteweave Basic Usage Example ===\n");

    // 1. Open the database. No embedding model: suggestions use tags and recency.
    std::fs::create_dir_all("./data")?;
    let nw = Noteweave::open("./data/example.redb", LibraryConfig::default())?;
    println!("1. Database opened at ./data/example.redb\n");

    // 2. Notes that others will link to
    let physics = vec!["physics".to_string()];
    let (entanglement, _) = nw.create_note(
        "bob",
        Visibility::Public,
        "Quantum Entanglement",
        "Correlations that no local hidden variable theory explains.",
        &physics,
    )?;
    let (diary, _) = nw.create_note(
        "bob",
        Visibility::Private,
        "Bob's Diary",
        "Nobody else should see this.",
        &[],
    )?;
    println!("2. Bob wrote {} (public) and {} (private)\n", entanglement.title, diary.title);

    // 3. Alice links to both; only the public note resolves for her
    let (bell, report) = nw.create_note(
        "alice",
        Visibility::Public,
        "Bell's Theorem",
        "Bell tested [[Quantum Entanglement]]. He never read [[Bob's Diary]]. \
         [[Quantum Entanglement]] comes up again here!",
        &physics,
    )?;
    println!(
        "3. Synced {}: {} valid link(s), {} unresolved",
        bell.title, report.valid_links, report.unresolved
    );
    for edge in nw.storage().edges_from(bell.id)? {
        println!("   -> {} : \"{}\"", edge.target, edge.context);
    }
    println!();

    // 4. Bob has a notification waiting
    let delivered = nw.drain_outbox(10, |event| {
        println!("4. Notify {}: {} linked to your note", event.recipient, event.actor);
        Ok(())
    })?;
    println!("   {} event(s) delivered\n", delivered);

    // 5. Related notes, excluding anything already linked
    nw.create_note("carol", Visibility::Public, "Decoherence", "", &physics)?;
    let related = nw
        .suggest(&SuggestRequest::for_note(&bell, 5).with_viewer("alice"))
        .await;
    println!("5. Suggestions for {}:", bell.title);
    for s in &related {
        println!("   {:.2}  {}", s.score, s.title);
    }

    println!("\n{}", nw.linker_metrics().summary());
    Ok(())
}
