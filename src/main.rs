//! surfmap - Continuous attack surface discovery.
//!
//! CLI entry point.

use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use surfmap::{
    Collaborators, Commands, Config, ConsoleOutput, CrtShEnumerator, HickoryResolver,
    KnownSurfaceFile, Pipeline, ReqwestProber, RunConfig, ScopeFile, WordlistPermuter,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging
    let filter = if config.verbose {
        EnvFilter::new("surfmap=debug,info")
    } else {
        EnvFilter::new("surfmap=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // First signal stops the run after the current stage; a second one exits.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        warn!("Signal received, finishing the current stage...");
        signal_token.cancel();

        wait_for_signal().await;
        eprintln!("\nSecond signal received, exiting");
        std::process::exit(130);
    });

    let result = match config.command.clone() {
        Commands::Run(run_config) => run_pipeline(run_config, &config, &cancel).await,
        Commands::Validate => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                error!("Failed to register signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn run_pipeline(
    run_config: RunConfig,
    global_config: &Config,
    cancel: &CancellationToken,
) -> Result<(), ExitCode> {
    let console = ConsoleOutput::new(global_config.verbose, run_config.json);
    console.print_banner();

    let known_surface = match KnownSurfaceFile::open(&global_config.data_folder) {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open known surface: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };
    if known_surface.was_created() {
        console.print_warning("Known-surface file was missing and has been created");
    }

    let enumerator = match CrtShEnumerator::new(
        run_config.timeout,
        run_config.rate_limit,
        run_config.max_retries,
    ) {
        Ok(e) => e,
        Err(e) => {
            error!("Failed to create enumerator: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let prober = match ReqwestProber::new(
        run_config.timeout,
        run_config.rate_limit,
        run_config.user_agent(),
    ) {
        Ok(p) => p.with_progress(!run_config.json),
        Err(e) => {
            error!("Failed to create prober: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let collaborators = Collaborators {
        scope: Arc::new(ScopeFile::new(&global_config.config_folder)),
        known_surface: Arc::new(known_surface),
        enumerator: Arc::new(enumerator),
        resolver: Arc::new(HickoryResolver::new(run_config.timeout)),
        permuter: Arc::new(WordlistPermuter::new(run_config.max_permutations)),
        prober: Arc::new(prober),
    };

    let pipeline = Pipeline::new(collaborators, run_config.pipeline_options())
        .with_console(console.clone());

    match pipeline.run(cancel).await {
        Ok(report) => {
            console.print_summary(&report);
            write_json(&report, &run_config)
        }
        Err(partial) => {
            console.print_partial(&partial);
            error!("{}", partial);
            // Keep what was found so far.
            write_json(&partial.surface, &run_config)?;
            Err(ExitCode::FAILURE)
        }
    }
}

/// Print JSON in JSON mode and write it to the output file when one is set.
fn write_json<T: Serialize>(value: &T, run_config: &RunConfig) -> Result<(), ExitCode> {
    if !run_config.json && run_config.output.is_none() {
        return Ok(());
    }

    let json = match serde_json::to_string_pretty(value) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize results: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    match run_config.output {
        Some(ref output_path) => write_output(output_path, &json),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}

fn write_output(path: &Path, json: &str) -> Result<(), ExitCode> {
    if let Err(e) = fs::write(path, json) {
        error!("Failed to write output file: {}", e);
        return Err(ExitCode::FAILURE);
    }
    info!("Results written to: {:?}", path);
    Ok(())
}

fn run_validate(global_config: &Config) -> Result<(), ExitCode> {
    let console = ConsoleOutput::new(global_config.verbose, false);

    let scope_file = ScopeFile::new(&global_config.config_folder);
    match scope_file.parse() {
        Ok((scope, exclusions)) => console.print_info(&format!(
            "Scope OK: {} (exclusions: {})",
            scope.summary(),
            exclusions.summary()
        )),
        Err(e) => {
            error!("{}", e);
            return Err(ExitCode::FAILURE);
        }
    }

    let known = KnownSurfaceFile::open(&global_config.data_folder).and_then(|file| file.parse());
    match known {
        Ok(surface) => {
            console.print_info(&format!("Known surface OK: {}", surface.summary()));
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(ExitCode::FAILURE)
        }
    }
}
