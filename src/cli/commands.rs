use anyhow::{Context, Result};
use serde::Serialize;

use super::OutputFormat;
use crate::config::{Config, SecretString};
use crate::onboarding::{
    CodeMatcher, ConnectionMode, FileOnboardingStore, OnboardingRecord, OnboardingStore,
    WizardPage, nix_mode_from_env, page_order, should_show_with,
};

pub(super) fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

#[derive(Serialize)]
struct PlannedPage {
    id: u8,
    name: String,
    title: &'static str,
}

#[derive(Serialize)]
struct Plan {
    mode: ConnectionMode,
    needs_bootstrap: bool,
    pages: Vec<PlannedPage>,
}

fn build_plan(mode: ConnectionMode, needs_bootstrap: bool) -> Plan {
    let pages = page_order(mode, needs_bootstrap)
        .into_iter()
        .map(|page: WizardPage| PlannedPage {
            id: page.id(),
            name: page.to_string(),
            title: page.title(),
        })
        .collect();
    Plan {
        mode,
        needs_bootstrap,
        pages,
    }
}

pub(super) fn cmd_plan(mode: ConnectionMode, needs_bootstrap: bool, format: OutputFormat) -> Result<()> {
    let plan = build_plan(mode, needs_bootstrap);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text => {
            println!("📋 {} mode (bootstrap: {})\n", plan.mode, plan.needs_bootstrap);
            let last = plan.pages.len().saturating_sub(1);
            for (i, page) in plan.pages.iter().enumerate() {
                let button = if i == last { "Finish" } else { "Next" };
                println!("  {}. [{}] {:<12} {} ({})", i + 1, page.id, page.name, page.title, button);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct Status {
    show_onboarding: bool,
    nix_mode: bool,
    path: String,
    #[serde(flatten)]
    record: OnboardingRecord,
}

pub(super) fn cmd_status(format: OutputFormat) -> Result<()> {
    let store = FileOnboardingStore::default_location();
    let nix_mode = nix_mode_from_env();
    let status = Status {
        show_onboarding: should_show_with(&store, nix_mode),
        nix_mode,
        path: store.path().display().to_string(),
        record: store.load().unwrap_or_default(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => {
            println!("🧭 Onboarding Status\n");
            println!("  State file:      {}", status.path);
            println!("  Completed:       {}", status.record.seen);
            println!("  Version:         {}", status.record.version);
            if let Some(at) = status.record.completed_at {
                println!("  Completed at:    {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if status.nix_mode {
                println!("  Managed install: yes");
            }
            println!(
                "\n  {}",
                if status.show_onboarding {
                    "Wizard will be shown on next launch"
                } else {
                    "Wizard will be skipped"
                }
            );
        }
    }
    Ok(())
}

pub(super) fn cmd_reset(force: bool) -> Result<()> {
    let store = FileOnboardingStore::default_location();
    if !force {
        println!("⚠️  This forgets that onboarding was completed.");
        println!("   Re-run with --force to confirm.");
        return Ok(());
    }
    store
        .clear()
        .with_context(|| format!("Failed to reset {:?}", store.path()))?;
    println!("✅ Onboarding state cleared");
    Ok(())
}

pub(super) fn cmd_extract(config: &Config, text: &str) -> Result<()> {
    let matcher = CodeMatcher::new(&config.onboarding.code_pattern)?;
    match matcher.extract(text) {
        Some(code) => {
            let code = SecretString::new(code);
            println!("✅ Authorization code ({} chars, {})", code.len(), code.fingerprint());
        }
        None => println!("❌ Not an authorization code"),
    }
    Ok(())
}

pub(super) fn cmd_config(config: &Config) -> Result<()> {
    let toml = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("⚙️  Configuration\n");
    println!("{}", toml);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_json_shape() {
        let plan = build_plan(ConnectionMode::Remote, true);
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["mode"], "remote");
        let ids: Vec<u64> = value["pages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 5, 8, 9]);
        assert_eq!(value["pages"][3]["name"], "chat");
    }
}
