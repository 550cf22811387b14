//! CLI entry point for the `pv` binary.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::info;

use promptvault::cli::{Cli, Command, EnvCommand, FavoriteCommand, FragmentCommand, VarCommand};
use promptvault::{Config, Scope, Vault, names, template};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: &str) -> Result<()> {
    // Priority: CLI --log-level > config file > INFO
    let level_str = cli_log_level.unwrap_or(config_log_level);
    let level = match level_str.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        other => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    // Logs go to stderr so stdout stays clean for command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

async fn fragment_body(body: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (body, file) {
        (_, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .context(format!("Failed to read {}", path.display())),
        (Some(body), None) => Ok(body),
        (None, None) => Err(eyre!("Provide a BODY argument or --file")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), &config.log_level).context("Failed to setup logging")?;

    info!("promptvault starting");

    let vault = Vault::open(&config).await?;

    match cli.command {
        Command::Sync { directory: Some(directory) } => {
            let id = vault.sync.sync_one(&directory).await?;
            println!("{} Synced {} (id {})", "✓".green(), directory.cyan(), id);
        }
        Command::Sync { directory: None } => {
            let report = vault.sync.sync_all().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} Synced {} prompts ({} skipped, {} removed)",
                    "✓".green(),
                    report.synced,
                    report.skipped.len(),
                    report.removed
                );
                for directory in &report.skipped {
                    println!("  {} {}", "skipped".yellow(), directory);
                }
            }
        }
        Command::List => {
            let prompts = vault.catalog.all_prompts().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&prompts)?);
            } else if prompts.is_empty() {
                println!("No prompts found; run `pv sync` after adding some");
            } else {
                for prompt in prompts {
                    println!(
                        "{:>4}  {} {}",
                        prompt.id.to_string().dimmed(),
                        prompt.title,
                        format!("[{}]", prompt.primary_category).dimmed()
                    );
                }
            }
        }
        Command::Categories => {
            let categories = vault.catalog.categories().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else if categories.is_empty() {
                println!("No prompts found; run `pv sync` after adding some");
            } else {
                for (category, prompts) in &categories {
                    println!("{} ({})", names::title_case(category).cyan().bold(), prompts.len());
                    for prompt in prompts {
                        println!("  {:>4}  {}", prompt.id.to_string().dimmed(), prompt.title);
                    }
                }
            }
        }
        Command::Show { reference, clean, body } => {
            if body {
                println!("{}", vault.prompts.content(&reference).await?);
            } else {
                let prompt = vault.catalog.prompt(&reference, clean).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&prompt)?);
                } else {
                    println!("{} {}", prompt.title.cyan().bold(), format!("(id {})", prompt.id).dimmed());
                    println!("  Category: {}", names::title_case(&prompt.primary_category));
                    if !prompt.subcategories.is_empty() {
                        println!("  Subcategories: {}", prompt.subcategories.join(", "));
                    }
                    if !prompt.tags.is_empty() {
                        println!("  Tags: {}", prompt.tags.join(", "));
                    }
                    if !prompt.one_line_description.is_empty() {
                        println!("  {}", prompt.one_line_description);
                    }
                    if !prompt.variables.is_empty() {
                        println!("  Variables:");
                        for variable in &prompt.variables {
                            if variable.value.is_empty() {
                                println!("    {} {}", variable.name, "(unset)".dimmed());
                            } else {
                                println!("    {} = {}", variable.name, variable.value);
                            }
                        }
                    }
                    for link in &prompt.fragments {
                        println!("  Fragment: {}/{} -> {}", link.category, link.name, link.variable);
                    }
                }
            }
        }
        Command::Search { term } => {
            let hits = vault.catalog.search(&term).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else if hits.is_empty() {
                println!("No prompts match '{}'", term);
            } else {
                for hit in hits {
                    println!(
                        "{:>4}  {} {}",
                        hit.id.to_string().dimmed(),
                        hit.title,
                        format!("[{}]", hit.primary_category).dimmed()
                    );
                }
            }
        }
        Command::Run { reference, set } => {
            let prompt = vault.catalog.prompt(&reference, false).await?;
            let mut inputs: HashMap<String, String> = prompt
                .variables
                .iter()
                .filter(|v| !v.value.is_empty())
                .map(|v| (v.name.clone(), v.value.clone()))
                .collect();
            for pair in &set {
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| eyre!("Expected NAME=VALUE, got '{}'", pair))?;
                inputs.insert(names::normalize(name), value.to_string());
            }

            let resolved = vault.resolver.resolve_inputs(&inputs).await?;
            let content = vault.prompts.content(&reference).await?;
            let rendered = template::apply_variables(&content, &resolved);

            if cli.json {
                let out = serde_json::json!({ "rendered": rendered, "variables": resolved });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", rendered);
            }
            vault.history.record_execution(&reference).await?;
        }
        Command::Delete { reference } => {
            vault.prompts.delete(&reference).await?;
            println!("{} Deleted prompt: {}", "✓".green(), reference);
        }
        Command::Var(VarCommand::Set { reference, name, value }) => {
            vault.prompts.set_variable_value(&reference, &name, &value).await?;
            println!("{} Set {} on {}", "✓".green(), names::normalize(&name).cyan(), reference);
        }
        Command::Var(VarCommand::Unset { reference, name }) => {
            vault.prompts.set_variable_value(&reference, &name, "").await?;
            println!("{} Cleared {} on {}", "✓".green(), names::normalize(&name).cyan(), reference);
        }
        Command::Env(EnvCommand::Set { name, value, description, secret, prompt }) => {
            let scope = if prompt.is_some() { Scope::Prompt } else { Scope::Global };
            let var = vault.env.set(&name, &value, scope, prompt).await?;
            if description.is_some() || secret {
                vault
                    .env
                    .set_details(&name, description.as_deref(), secret.then_some(true))
                    .await?;
            }
            println!("{} Set env var: {}", "✓".green(), var.name.cyan());
        }
        Command::Env(EnvCommand::Unset { name }) => {
            vault.env.unset(&name).await?;
            println!("{} Removed env var: {}", "✓".green(), names::normalize(&name).cyan());
        }
        Command::Env(EnvCommand::List { show_secrets }) => {
            let mut vars = vault.env.list().await?;
            if !show_secrets {
                for var in &mut vars {
                    if var.secret {
                        var.value = "********".to_string();
                    }
                }
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&vars)?);
            } else if vars.is_empty() {
                println!("No env vars set");
            } else {
                for var in &vars {
                    let scope = match var.prompt_id {
                        Some(id) => format!("prompt {}", id),
                        None => var.scope.to_string(),
                    };
                    println!("{} = {} {}", var.name.cyan(), var.value, format!("[{}]", scope).dimmed());
                    if !var.description.is_empty() {
                        println!("    {}", var.description.dimmed());
                    }
                }
            }
        }
        Command::Fragment(FragmentCommand::List) => {
            let fragments = vault.fragments.list().await?;
            if cli.json {
                let refs: Vec<String> = fragments.iter().map(|f| f.to_string()).collect();
                println!("{}", serde_json::to_string_pretty(&refs)?);
            } else if fragments.is_empty() {
                println!("No fragments found");
            } else {
                for fragment in fragments {
                    println!("{}", fragment);
                }
            }
        }
        Command::Fragment(FragmentCommand::Show { category, name }) => {
            println!("{}", vault.fragments.content(&category, &name).await?);
        }
        Command::Fragment(FragmentCommand::Add { category, name, body, file }) => {
            let body = fragment_body(body, file).await?;
            vault.fragments.add(&category, &name, &body).await?;
            println!("{} Added fragment: {}/{}", "✓".green(), category, name.cyan());
        }
        Command::Fragment(FragmentCommand::Update { category, name, body, file }) => {
            let body = fragment_body(body, file).await?;
            vault.fragments.update(&category, &name, &body).await?;
            println!("{} Updated fragment: {}/{}", "✓".green(), category, name.cyan());
        }
        Command::Fragment(FragmentCommand::Remove { category, name }) => {
            vault.fragments.remove(&category, &name).await?;
            println!("{} Removed fragment: {}/{}", "✓".green(), category, name.cyan());
        }
        Command::History { limit } => {
            let executions = vault.history.recent(limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&executions)?);
            } else if executions.is_empty() {
                println!("No executions recorded");
            } else {
                for execution in executions {
                    println!(
                        "{}  {} {}",
                        execution.executed_at.dimmed(),
                        execution.title,
                        format!("(id {})", execution.prompt_id).dimmed()
                    );
                }
            }
        }
        Command::Favorite(FavoriteCommand::Add { reference }) => {
            if vault.history.add_favorite(&reference).await? {
                println!("{} Added favorite: {}", "✓".green(), reference.cyan());
            } else {
                println!("Already a favorite: {}", reference);
            }
        }
        Command::Favorite(FavoriteCommand::Remove { reference }) => {
            if vault.history.remove_favorite(&reference).await? {
                println!("{} Removed favorite: {}", "✓".green(), reference.cyan());
            } else {
                println!("Not a favorite: {}", reference);
            }
        }
        Command::Favorite(FavoriteCommand::List) => {
            let favorites = vault.history.favorites().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&favorites)?);
            } else if favorites.is_empty() {
                println!("No favorites yet");
            } else {
                for favorite in favorites {
                    println!(
                        "{:>4}  {} {}",
                        favorite.id.to_string().dimmed(),
                        favorite.title,
                        format!("[{}]", favorite.primary_category).dimmed()
                    );
                }
            }
        }
    }

    vault.close().await;
    Ok(())
}
