use clap::{Parser, Subcommand};
use dupe_arbiter_core::locations::{IgnoreList, Location};
use dupe_arbiter_core::safety::SafetyManager;
use dupe_arbiter_core::search::JsonResultSource;
use dupe_arbiter_core::{ActionPlan, Config, ImageId, LogLevel, Session};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dupe-arbiter")]
#[command(about = "Decide which duplicate images to keep and apply the decision safely")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write rotating log files to this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the decision for every duplicate group
    Plan {
        /// Results exported by the comparison engine
        results: PathBuf,

        /// Pairs never to report again
        #[arg(long)]
        ignore: Option<PathBuf>,
    },

    /// Apply the decision for every duplicate group
    Apply {
        /// Results exported by the comparison engine
        results: PathBuf,

        /// Pairs never to report again
        #[arg(long)]
        ignore: Option<PathBuf>,

        /// Run without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Restore files staged for deletion by an interrupted run
    Recover {
        /// Directories to search for staged files
        #[arg(required = true)]
        directories: Vec<PathBuf>,

        /// Do not descend into subdirectories
        #[arg(long)]
        no_subfolders: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "dupe-arbiter.json")]
        path: PathBuf,
    },
}

fn load_config(path: Option<&Path>, verbose: u8) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => match Config::default_path().filter(|p| p.exists()) {
            Some(default) => {
                info!("Using configuration at {}", default.display());
                Config::from_file(&default)?
            }
            None => Config::default(),
        },
    };

    config.log_level = match verbose {
        0 => config.log_level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    config.validate()?;
    Ok(config)
}

/// Level for the logger; a broken config is reported later by the command itself
fn log_level(path: Option<&Path>, verbose: u8) -> LogLevel {
    load_config(path, verbose)
        .map(|config| config.log_level)
        .unwrap_or(LogLevel::Info)
}

fn open_session(config: Config, results: &Path, ignore: Option<&Path>) -> anyhow::Result<Session> {
    let ignore_list = match ignore {
        Some(path) if path.exists() => IgnoreList::from_file(path)?,
        _ => IgnoreList::default(),
    };
    let mut session = Session::new(config)?.with_ignore_list(ignore_list);
    let mut source = JsonResultSource::new(results);
    let loaded = session.load_from(&mut source)?;
    info!("Loaded {} duplicate results from {}", loaded, results.display());
    Ok(session)
}

fn describe(plan: &ActionPlan, session: &Session) -> String {
    let path = |id: ImageId| {
        session
            .images()
            .path(id)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| format!("{:?}", id))
    };
    match plan {
        ActionPlan::DeleteOthers { keep, delete } => {
            let mut lines = vec![format!("  keep    {}", path(*keep))];
            lines.extend(delete.iter().map(|id| format!("  delete  {}", path(*id))));
            lines.join("\n")
        }
        ActionPlan::Replace {
            source,
            target,
            delete,
        } => {
            let mut lines = vec![format!("  move    {} -> {}", path(*source), path(*target))];
            lines.extend(delete.iter().map(|id| format!("  delete  {}", path(*id))));
            lines.join("\n")
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command line arguments
    let cli = Cli::parse();

    let level = log_level(cli.config.as_deref(), cli.verbose);
    match &cli.log_dir {
        Some(dir) => {
            dupe_arbiter_core::logging::init_logger(dir, level)
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
        }
        None => env_logger::Builder::from_default_env()
            .filter_level(level.into())
            .init(),
    }

    match cli.command {
        Commands::Plan { results, ignore } => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            let session = open_session(config, &results, ignore.as_deref())?;

            for (group, decision) in session.plan() {
                match decision.outcome {
                    Ok(plan) => println!(
                        "Group {} ({} files)\n{}",
                        group.id.0,
                        group.files.len(),
                        describe(&plan, &session)
                    ),
                    Err(reason) => println!("Group {} skipped: {}", group.id.0, reason),
                }
            }
            Ok(())
        }

        Commands::Apply {
            results,
            ignore,
            dry_run,
        } => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            let mut session = open_session(config, &results, ignore.as_deref())?;
            let plans = session.plan();

            let progress = ProgressBar::new(plans.len() as u64);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) - {msg}")?
                    .progress_chars("#>-"),
            );

            let (mut applied, mut skipped, mut failed) = (0, 0, 0);
            for (group, decision) in plans {
                progress.inc(1);
                let plan = match decision.outcome {
                    Ok(plan) => plan,
                    Err(reason) => {
                        info!("Group {} skipped: {}", group.id.0, reason);
                        skipped += 1;
                        continue;
                    }
                };
                if dry_run {
                    progress.println(format!("Group {}\n{}", group.id.0, describe(&plan, &session)));
                    applied += 1;
                    continue;
                }
                progress.set_message(format!("group {}", group.id.0));
                match session.apply_plan(plan) {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        warn!("Group {} failed: {}", group.id.0, e);
                        failed += 1;
                    }
                }
            }
            progress.finish_with_message("done");

            let ignore_list = session.close()?;
            if let Some(path) = ignore {
                ignore_list.save_to_file(&path)?;
            }
            println!(
                "{} groups {}, {} skipped, {} failed",
                applied,
                if dry_run { "planned" } else { "applied" },
                skipped,
                failed
            );
            Ok(())
        }

        Commands::Recover {
            directories,
            no_subfolders,
        } => {
            let config = load_config(cli.config.as_deref(), cli.verbose)?;
            let safety = SafetyManager::new(&config);
            let locations: Vec<Location> = directories
                .into_iter()
                .map(|dir| Location::new(dir, !no_subfolders))
                .collect();

            let orphans = safety.find_orphaned_temp_files(&locations);
            if orphans.is_empty() {
                println!("No staged files found");
            }
            for temp in orphans {
                match safety.recover(&temp) {
                    Ok(original) => println!("Restored {}", original.display()),
                    Err(e) => warn!("Could not restore {}: {}", temp.display(), e),
                }
            }
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
