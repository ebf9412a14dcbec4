//! Application orchestrator.
//! Loads and merges config, initializes logging, wires Ctrl-C to cancellation,
//! runs the engine on a worker thread and prints its progress.

use anyhow::{Context, Result, anyhow, bail};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use tracing::{debug, error, info, warn};

use forensic_transfer::config::{
    CONFIG_ENV_VAR, create_template_config, default_config_path, ensure_destination_root,
    load_config,
};
use forensic_transfer::output as out;
use forensic_transfer::{
    ChannelProgress, HashManifest, LogLevel, MoveBehavior, ProgressEvent, TransferEngine,
    TransferItem, TransferResult,
};

use crate::cli::Args;
use crate::logging::init_tracing;

const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Run the CLI application and return the process exit code.
pub fn run(args: Args) -> Result<ExitCode> {
    // Handled before logging init
    if args.print_config {
        print_config_location()?;
        return Ok(ExitCode::SUCCESS);
    }
    if args.init_config {
        let path = default_config_path()?;
        create_template_config(&path)?;
        out::print_success(&format!("A template config was written to: {}", path.display()));
        return Ok(ExitCode::SUCCESS);
    }

    let (mut cfg, cfg_path) = load_config()?;
    args.apply_overrides(&mut cfg);
    cfg.validate()?;

    let dest = args
        .dest
        .clone()
        .ok_or_else(|| anyhow!("--dest <DIR> is required"))?;
    if args.sources.is_empty() {
        bail!("at least one SOURCE is required");
    }

    let _guard = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json)
        .context("initialize logging")?;
    if let Some(p) = &cfg_path {
        debug!(path = %p.display(), "using config file");
    }
    debug!(?args, "starting fxfer");

    let items = args
        .sources
        .iter()
        .map(TransferItem::from_path)
        .collect::<Result<Vec<_>, _>>()?;
    ensure_destination_root(&dest)?;

    let (sink, rx) = ChannelProgress::bounded(PROGRESS_CHANNEL_CAPACITY);
    let mut engine = TransferEngine::new(cfg.transfer_options()).with_progress(sink);
    if cfg.same_drive_behavior == MoveBehavior::AskCaller {
        engine = engine.with_resolver(prompt_for_behavior);
    }

    let control = engine.control();
    if let Err(e) = ctrlc::set_handler(move || {
        out::print_warn("Received interrupt; cancelling and rolling back...");
        control.cancel();
    }) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let worker = thread::spawn(move || engine.run(&items, &dest));

    let show_progress = cfg.log_level != LogLevel::Quiet;
    let show_files = matches!(cfg.log_level, LogLevel::Info | LogLevel::Debug);
    for ev in rx.iter() {
        match ev {
            ProgressEvent::Progress { percent, message } if show_progress => {
                out::print_progress(percent, &message)
            }
            ProgressEvent::FileCompleted {
                relative_path,
                operation,
                verified,
            } if show_files => out::print_progress_file(&relative_path, operation, verified),
            _ => {}
        }
    }

    let result = worker
        .join()
        .map_err(|_| anyhow!("transfer worker panicked"))?;

    write_manifests(&args, &result);
    out::print_summary(&result);

    let status = result.status();
    if result.is_success() {
        info!(%status, "fxfer finished");
    } else {
        error!(%status, error = ?result.error(), "fxfer finished");
    }
    Ok(ExitCode::from(status.exit_code()))
}

fn print_config_location() -> Result<()> {
    let path = default_config_path()?;
    if std::env::var_os(CONFIG_ENV_VAR).is_some() {
        out::print_info(&format!("Using {CONFIG_ENV_VAR} (explicit):\n  {}", path.display()));
    } else {
        out::print_info(&format!("Default fxfer config path:\n  {}", path.display()));
    }
    if path.exists() {
        out::print_info("A config file exists at that location.");
    } else {
        out::print_info(
            "No config file exists there yet. Run with --init-config to create a template.",
        );
    }
    Ok(())
}

/// Manifests cover whatever outcomes the run produced, including partial
/// ones. A write failure is reported but does not change the exit code.
fn write_manifests(args: &Args, result: &TransferResult) {
    if args.manifest.is_none() && args.manifest_json.is_none() {
        return;
    }
    let manifest = HashManifest::from_outcomes(result.outcomes());
    let targets: [(Option<&PathBuf>, bool); 2] =
        [(args.manifest.as_ref(), false), (args.manifest_json.as_ref(), true)];
    for (path, json) in targets {
        let Some(path) = path else { continue };
        let written = if json {
            manifest.write_json(path)
        } else {
            manifest.write_csv(path)
        };
        match written {
            Ok(()) => out::print_info(&format!("Manifest written to {}", path.display())),
            Err(e) => out::print_error(&format!("Could not write manifest: {e}")),
        }
    }
}

/// Ask on stdin whether same-device items may be moved. Anything but an
/// explicit yes copies.
fn prompt_for_behavior(items: &[TransferItem]) -> MoveBehavior {
    let mut err = io::stderr().lock();
    let _ = writeln!(
        err,
        "These items are on the destination device and can be moved instead of copied:"
    );
    for item in items {
        let _ = writeln!(err, "  {}", item.source_path().display());
    }
    let _ = write!(err, "Move them (source will no longer exist)? [y/N] ");
    let _ = err.flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) if matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes") => {
            MoveBehavior::AlwaysMoveIfPossible
        }
        _ => MoveBehavior::AlwaysCopy,
    }
}
