//! Ballpark CLI - software-effort estimation from seeded and tracked time data.

use ballpark::action_log;
use ballpark::cli::{
    Cli, Commands, ConfigCommands, FeatureCommands, SystemCommands, TimeCommands,
};
use ballpark::commands::{self, CommandResult};
use ballpark::storage::find_git_root;
use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // Determine repo path: --repo flag > BP_REPO env > auto-detect git root > cwd
    let repo_path = resolve_repo_path(cli.repo_path, human);

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    // Start timing
    let start = Instant::now();

    // Execute command
    let result = run_command(cli.command, &repo_path, human);

    // Calculate duration
    let duration = start.elapsed().as_millis() as u64;

    // Determine success/error
    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Log the action (silently fails if logging encounters errors)
    let _ = action_log::log_action(&repo_path, &cmd_name, args_json, success, error, duration);

    // Handle result
    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!(r#"{{"error": "{}"}}"#, e);
        }
        process::exit(1);
    }
}

/// Resolve the project path based on explicit flag, environment variable, or
/// auto-detection.
///
/// Priority: --repo flag > BP_REPO env var > git root detection > current
/// working directory. An explicit path is used literally without git root
/// detection, which allows targeting subdirectories within a repository.
fn resolve_repo_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                if human {
                    eprintln!(
                        "Error: Specified repo path does not exist: {}",
                        path.display()
                    );
                } else {
                    eprintln!(
                        r#"{{"error": "Specified repo path does not exist: {}"}}"#,
                        path.display()
                    );
                }
                process::exit(1);
            }
            path
        }
        None => {
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_git_root(&cwd).unwrap_or(cwd)
        }
    }
}

/// Print a command result as JSON or human-readable text.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Describe the command for the action log.
fn serialize_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    match command {
        None => ("help".to_string(), serde_json::Value::Null),
        Some(Commands::Feature { command }) => match command {
            FeatureCommands::Add { name, team, seed_hours, .. } => (
                "feature add".to_string(),
                serde_json::json!({"name": name, "team": team, "seed_hours": seed_hours}),
            ),
            FeatureCommands::List => ("feature list".to_string(), serde_json::Value::Null),
            FeatureCommands::Show { id } => {
                ("feature show".to_string(), serde_json::json!({"id": id}))
            }
            FeatureCommands::SetSeed { id, hours } => (
                "feature set-seed".to_string(),
                serde_json::json!({"id": id, "hours": hours}),
            ),
            FeatureCommands::AddSynonym { id, synonym } => (
                "feature add-synonym".to_string(),
                serde_json::json!({"id": id, "synonym": synonym}),
            ),
            FeatureCommands::Rm { id } => {
                ("feature rm".to_string(), serde_json::json!({"id": id}))
            }
            FeatureCommands::Search { query } => (
                "feature search".to_string(),
                serde_json::json!({"query": query}),
            ),
        },
        Some(Commands::Time { command }) => match command {
            TimeCommands::Add { feature, hours, member, .. } => (
                "time add".to_string(),
                serde_json::json!({"feature": feature, "hours": hours, "member": member}),
            ),
            TimeCommands::Import { file } => (
                "time import".to_string(),
                serde_json::json!({"file": file.display().to_string()}),
            ),
            TimeCommands::List { .. } => ("time list".to_string(), serde_json::Value::Null),
        },
        Some(Commands::Stats { name }) => {
            ("stats".to_string(), serde_json::json!({"name": name}))
        }
        Some(Commands::Estimate { names, experience, seed_default }) => (
            "estimate".to_string(),
            serde_json::json!({
                "names": names,
                "experience": experience,
                "seed_default": seed_default,
            }),
        ),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Get { key } => {
                ("config get".to_string(), serde_json::json!({"key": key}))
            }
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                serde_json::json!({"key": key, "value": value}),
            ),
            ConfigCommands::List => ("config list".to_string(), serde_json::Value::Null),
        },
        Some(Commands::Log) => ("log".to_string(), serde_json::Value::Null),
        Some(Commands::System { command }) => match command {
            SystemCommands::Init => ("system init".to_string(), serde_json::Value::Null),
            SystemCommands::Rebuild => ("system rebuild".to_string(), serde_json::Value::Null),
        },
    }
}

fn run_command(
    command: Option<Commands>,
    repo_path: &Path,
    human: bool,
) -> Result<(), ballpark::Error> {
    match command {
        None => {
            eprintln!("No command given. Try `bp --help`.");
            Ok(())
        }
        Some(Commands::Feature { command }) => match command {
            FeatureCommands::Add {
                name,
                team,
                seed_hours,
                category,
                synonyms,
                notes,
            } => {
                let result = commands::feature_add(
                    repo_path, &name, &team, seed_hours, category, synonyms, notes,
                )?;
                output(&result, human);
                Ok(())
            }
            FeatureCommands::List => {
                let result = commands::feature_list(repo_path)?;
                output(&result, human);
                Ok(())
            }
            FeatureCommands::Show { id } => {
                let result = commands::feature_show(repo_path, &id)?;
                output(&result, human);
                Ok(())
            }
            FeatureCommands::SetSeed { id, hours } => {
                let result = commands::feature_set_seed(repo_path, &id, hours)?;
                output(&result, human);
                Ok(())
            }
            FeatureCommands::AddSynonym { id, synonym } => {
                let result = commands::feature_add_synonym(repo_path, &id, &synonym)?;
                output(&result, human);
                Ok(())
            }
            FeatureCommands::Rm { id } => {
                let result = commands::feature_rm(repo_path, &id)?;
                output(&result, human);
                Ok(())
            }
            FeatureCommands::Search { query } => {
                let result = commands::feature_search(repo_path, &query)?;
                output(&result, human);
                Ok(())
            }
        },
        Some(Commands::Time { command }) => match command {
            TimeCommands::Add {
                feature,
                hours,
                team,
                member,
                category,
                date,
            } => {
                let result =
                    commands::time_add(repo_path, &feature, hours, &team, &member, category, date)?;
                output(&result, human);
                Ok(())
            }
            TimeCommands::Import { file } => {
                let result = commands::time_import(repo_path, &file)?;
                output(&result, human);
                Ok(())
            }
            TimeCommands::List { member, feature } => {
                let result =
                    commands::time_list(repo_path, member.as_deref(), feature.as_deref())?;
                output(&result, human);
                Ok(())
            }
        },
        Some(Commands::Stats { name }) => {
            let result = commands::stats(repo_path, &name)?;
            output(&result, human);
            Ok(())
        }
        Some(Commands::Estimate {
            names,
            experience,
            seed_default,
        }) => {
            let result = commands::estimate(repo_path, names, experience, seed_default)?;
            output(&result, human);
            Ok(())
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Get { key } => {
                let result = commands::config_get(repo_path, &key)?;
                output(&result, human);
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(repo_path, &key, &value)?;
                output(&result, human);
                Ok(())
            }
            ConfigCommands::List => {
                let result = commands::config_list(repo_path)?;
                output(&result, human);
                Ok(())
            }
        },
        Some(Commands::Log) => {
            let result = commands::log_show(repo_path)?;
            output(&result, human);
            Ok(())
        }
        Some(Commands::System { command }) => match command {
            SystemCommands::Init => {
                let result = commands::system_init(repo_path)?;
                output(&result, human);
                Ok(())
            }
            SystemCommands::Rebuild => {
                let result = commands::system_rebuild(repo_path)?;
                output(&result, human);
                Ok(())
            }
        },
    }
}
