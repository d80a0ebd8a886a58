mod cli_args;
mod output;
mod source;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::process;

use cli_args::Cli;
use repoflat_core::{AppError, PageInfo, RenderConfig};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;
    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = match e.downcast_ref::<AppError>() {
                Some(AppError::Config(_)) => 1,
                Some(AppError::TomlParse(_)) => 1,
                Some(AppError::Glob(_)) => 1,
                Some(AppError::Io(_)) => 2,
                Some(AppError::Access { .. }) => 2,
                Some(AppError::EntryRead { .. }) => 2,
                Some(AppError::FileWrite { .. }) => 2,
                Some(_) => 1,
                None => 1,
            };
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    let acquired = source::acquire(&cli.source)
        .with_context(|| format!("Failed to acquire source '{}'", cli.source))?;

    let base = RenderConfig::resolve(&acquired.root, cli.config.as_deref())
        .context("Failed to load configuration")?;
    let config = merge_config_with_cli_overrides(base, &cli);
    log::debug!("Effective config: {:?}", config);

    let info = PageInfo {
        title: acquired.name.clone(),
        source: acquired.display.clone(),
        head_commit: acquired.head_commit.clone(),
    };
    let result = repoflat_core::render(&acquired.root, &info, &config)?;

    let content = match result.human {
        Some(ref human) => human.as_str(),
        None => result.corpus.as_str(),
    };
    let out_path = cli
        .out
        .clone()
        .unwrap_or_else(|| output::default_output_path(&acquired.name, config.llm_only));
    output::write_document(&out_path, content)?;
    output::print_summary(&out_path, content.len(), &result.stats, quiet);

    if !cli.no_open && !config.llm_only {
        output::open_in_browser(&out_path);
    }
    Ok(())
}

/// Flags win over whatever the config file said; excludes accumulate.
fn merge_config_with_cli_overrides(mut config: RenderConfig, cli: &Cli) -> RenderConfig {
    if let Some(max_bytes) = cli.max_bytes {
        config.size_threshold_bytes = max_bytes;
    }
    config.exclude_globs.extend(cli.exclude.iter().cloned());
    if cli.minify {
        config.minify = true;
    }
    if cli.llm {
        config.llm_only = true;
    }
    if cli.follow_symlinks {
        config.follow_symlinks = true;
    }
    if cli.no_gitignore {
        config.use_gitignore = false;
    }
    config
}
