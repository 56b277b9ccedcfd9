use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use presencebridge_core::snapshot::{write_snapshot, PresenceSnapshot};
use presencebridge_core::{folders, ModuleHandle, PresenceConfig, PresenceContext};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(module_path) = args.first() else {
        eprintln!("Usage: presencebridge <companion-module> [config.json] [snapshot-dir]");
        process::exit(2);
    };

    let config = match args.get(1) {
        Some(path) => PresenceConfig::load(Path::new(path))?,
        None => default_config(),
    };

    let module = ModuleHandle::open(Path::new(module_path));
    let context = PresenceContext::query(&module, &config)?;

    if context.is_available() {
        println!("Presence available (client {})", context.client_id());
        print_field("state", context.state());
        print_field("details", context.details());
        print_field("large icon", context.large_icon_url());
        print_field("small icon", context.small_icon_url());
    } else {
        println!("Presence unavailable");
    }

    if let Some(dir) = args.get(2) {
        let snapshot = PresenceSnapshot::capture(&context);
        let path = write_snapshot(&snapshot, &PathBuf::from(dir))?;
        println!("Snapshot written to {}", path.display());
    }

    Ok(())
}

/// Use the product config file when one exists, otherwise defaults.
fn default_config() -> PresenceConfig {
    let Ok(dir) = folders::app_config_dir() else {
        return PresenceConfig::default();
    };
    let path = dir.join("config.json");
    if path.exists() {
        PresenceConfig::load(&path).unwrap_or_default()
    } else {
        PresenceConfig::default()
    }
}

fn print_field(label: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {}: {}", label, v),
        None => println!("  {}: (unset)", label),
    }
}
