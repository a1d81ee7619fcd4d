//! Cache command - inspect and clean the vault and build cache

use super::{blocking, project_root, router_for};
use crate::cache::fsops;
use crate::cache::{
    disk_usage, BuildMaterializer, ContentStore, EntryInfo, EntryState, RootKind, WorkspaceRouter,
    DEFAULT_LOCK_TIMEOUT,
};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::{DepvaultError, DepvaultResult};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> DepvaultResult<()> {
    let router = router_for(config, &project_root(args.project)?);

    match args.action {
        CacheAction::List { format } => list_entries(&router, format).await,
        CacheAction::Info => show_info(&router).await,
        CacheAction::Clean { legacy, yes } => clean(&router, legacy, yes).await,
    }
}

/// One listed entry with its tier
#[derive(Debug, Serialize)]
struct ListedEntry {
    tier: &'static str,
    #[serde(flatten)]
    entry: EntryInfo,
}

async fn collect_entries(router: &WorkspaceRouter) -> DepvaultResult<Vec<ListedEntry>> {
    let vault_root = router.root_for(RootKind::Vault);
    let builds_root = router.root_for(RootKind::Builds);

    blocking(move || {
        let vault = ContentStore::new(vault_root, DEFAULT_LOCK_TIMEOUT).entries()?;
        let builds = BuildMaterializer::new(builds_root, DEFAULT_LOCK_TIMEOUT).entries()?;
        Ok(vault
            .into_iter()
            .map(|entry| ListedEntry { tier: "vault", entry })
            .chain(builds.into_iter().map(|entry| ListedEntry { tier: "build", entry }))
            .collect())
    })
    .await
}

/// List vault and build entries
async fn list_entries(router: &WorkspaceRouter, format: OutputFormat) -> DepvaultResult<()> {
    let entries = collect_entries(router).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }
        OutputFormat::Plain => {
            for listed in &entries {
                println!("{}", listed.entry.path.display());
            }
            return Ok(());
        }
        OutputFormat::Table => {}
    }

    if entries.is_empty() {
        println!("No cache entries found.");
        return Ok(());
    }

    println!("{:<6} {:<12} {}", "TIER", "STATE", "ENTRY");
    println!("{}", "-".repeat(80));
    for listed in &entries {
        let state = match listed.entry.state {
            EntryState::Complete => style("complete").green().to_string(),
            EntryState::Incomplete => style("incomplete").yellow().to_string(),
        };
        println!("{:<6} {:<12} {}", listed.tier, state, listed.entry.name);
    }

    let incomplete = entries.iter().filter(|l| !l.entry.is_complete()).count();
    println!();
    println!("Total: {} entries", entries.len());
    if incomplete > 0 {
        println!(
            "{} {} incomplete entries; remove them by hand to have them recreated",
            style("!").yellow(),
            incomplete
        );
    }
    Ok(())
}

/// Show roots, mode and usage
async fn show_info(router: &WorkspaceRouter) -> DepvaultResult<()> {
    let ctx = UiContext::detect();
    let entries = collect_entries(router).await?;
    let vault_root = router.root_for(RootKind::Vault);
    let builds_root = router.root_for(RootKind::Builds);

    let (vault_bytes, builds_bytes) = {
        let (v, b) = (vault_root.clone(), builds_root.clone());
        blocking(move || Ok((disk_usage(&v), disk_usage(&b)))).await?
    };
    let count = |tier: &str| entries.iter().filter(|l| l.tier == tier).count();

    ui::section(&ctx, "Dependency cache");
    ui::key_value(&ctx, "Mode", &router.mode().to_string());
    ui::key_value(&ctx, "Project", &router.project_root().display().to_string());
    ui::key_value(
        &ctx,
        "Vault",
        &format!(
            "{} ({} entries, {})",
            vault_root.display(),
            count("vault"),
            format_bytes(vault_bytes)
        ),
    );
    ui::key_value(
        &ctx,
        "Builds",
        &format!(
            "{} ({} entries, {})",
            builds_root.display(),
            count("build"),
            format_bytes(builds_bytes)
        ),
    );

    if let Some(stray) = router.stray_project_cache() {
        ui::step_warn_hint(
            &ctx,
            &format!("Unused project-local cache at {}", stray.display()),
            "Run: depvault cache clean --legacy",
        );
    }
    Ok(())
}

/// Sweep staging directories and optionally the stray project-local cache
async fn clean(router: &WorkspaceRouter, legacy: bool, yes: bool) -> DepvaultResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let roots = [
        router.root_for(RootKind::Vault),
        router.root_for(RootKind::Builds),
    ];

    let removed = blocking(move || {
        let mut removed = Vec::new();
        for root in &roots {
            removed.extend(fsops::sweep_staging(root)?);
        }
        Ok(removed)
    })
    .await?;

    if removed.is_empty() {
        ui::step_info(&ctx, "No abandoned staging directories");
    } else {
        for path in &removed {
            ui::remark(&ctx, &path.display().to_string());
        }
        ui::step_ok(
            &ctx,
            &format!("Removed {} abandoned staging directories", removed.len()),
        );
    }

    if !legacy {
        return Ok(());
    }

    let Some(stray) = router.stray_project_cache() else {
        ui::step_info(&ctx, "No project-local cache to remove");
        return Ok(());
    };

    let prompt = format!("Delete project-local cache {}?", stray.display());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn(&ctx, "Project-local cache kept");
        return Ok(());
    }

    tokio::fs::remove_dir_all(&stray)
        .await
        .map_err(|e| DepvaultError::io(format!("removing {}", stray.display()), e))?;
    ui::step_ok_detail(&ctx, "Removed project-local cache", &stray.display().to_string());
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
