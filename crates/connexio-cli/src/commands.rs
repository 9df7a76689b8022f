use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use connexio_server::{ConnexioServer, ServerConfig};
use connexio_store::Persistence;
use connexio_types::{preview_of, ItemKind, SlotSummary, SyncItem};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Status(args) => cmd_status(args),
    }
}

/// Config file first, then explicit flags on top.
fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(host) = args.host {
        config = config.with_host(host);
    }
    if let Some(data) = &args.data {
        config = config.with_data_dir(data);
    }
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    println!(
        "{} Connexio server on {} (data: {})",
        "✓".green().bold(),
        config.bind_addr.to_string().bold(),
        config.data_dir.display()
    );
    let server = ConnexioServer::new(config).context("failed to open data directory")?;
    server.serve().await?;
    Ok(())
}

fn cmd_status(args: StatusArgs) -> anyhow::Result<()> {
    if !args.data.is_dir() {
        bail!("no data directory at {}", args.data.display());
    }
    let snapshot = Persistence::at(&args.data).load();

    println!("Data directory: {}", args.data.display().to_string().bold());
    match &snapshot.current {
        Some(item) => println!("Current: {}", describe_item(item)),
        None => println!("Current: {}", "empty".dimmed()),
    }

    let mut slots: Vec<SlotSummary> = snapshot.slots.values().map(|s| s.summary()).collect();
    slots.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    println!("\n{} saved slot(s)", slots.len().to_string().bold());
    for slot in &slots {
        print_slot(slot);
    }
    print_blob_count(&args.data);
    Ok(())
}

fn describe_item(item: &SyncItem) -> String {
    let kind = item.kind.to_string().cyan();
    match item.kind {
        ItemKind::Text => format!("{kind} \"{}\"", preview_of(item)),
        ItemKind::Image => format!(
            "{kind} {} ({} base64 chars)",
            item.mime_type,
            item.content.len()
        ),
        ItemKind::File => match &item.file_id {
            Some(id) => format!("{kind} {} [{}]", item.filename, id.short_id().yellow()),
            None => format!("{kind} {}", item.filename),
        },
    }
}

fn print_slot(slot: &SlotSummary) {
    let name = if slot.name.is_empty() {
        "(unnamed)".dimmed().to_string()
    } else {
        slot.name.bold().to_string()
    };
    print!(
        "  {} {} {} {}",
        slot.id.as_str().yellow(),
        name,
        slot.kind.to_string().cyan(),
        slot.saved_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    );
    if slot.preview.is_empty() {
        println!();
    } else {
        println!("  \"{}\"", slot.preview);
    }
}

fn print_blob_count(data: &Path) {
    let files = data.join(connexio_store::FILES_DIR);
    if let Ok(entries) = std::fs::read_dir(&files) {
        println!("\n{} stored file(s)", entries.count().to_string().bold());
    }
}
