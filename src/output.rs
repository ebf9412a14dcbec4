//! User-facing console output for the `fxfer` binary.
//! Colors are used only when stdout is a TTY.

use owo_colors::OwoColorize;
use std::path::Path;

use crate::fs_ops::format_bytes;
use crate::transfer::{RunStatus, TransferOperation, TransferResult};

fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {msg}", "info:".cyan().bold());
    } else {
        println!("info: {msg}");
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {msg}", "warn:".yellow().bold());
    } else {
        eprintln!("warn: {msg}");
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {msg}", "error:".red().bold());
    } else {
        eprintln!("error: {msg}");
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {msg}", "ok:".green().bold());
    } else {
        println!("ok: {msg}");
    }
}

/// One progress line, e.g. `[ 42%] Copying case/a.bin`.
pub fn print_progress(percent: u8, msg: &str) {
    if is_tty() {
        println!("{} {msg}", format!("[{percent:>3}%]").blue());
    } else {
        println!("[{percent:>3}%] {msg}");
    }
}

/// One line per finished file.
pub fn print_progress_file(relative: &Path, operation: TransferOperation, verified: bool) {
    let mark = if verified { "verified" } else { "unverified" };
    if is_tty() {
        println!("       {} {} ({mark})", operation.dimmed(), relative.display());
    } else {
        println!("       {operation} {} ({mark})", relative.display());
    }
}

/// Closing summary for a run; the headline depends on the run status.
pub fn print_summary(result: &TransferResult) {
    let m = result.metrics();
    let verified = result.outcomes().values().filter(|o| o.verified).count();
    let detail = format!(
        "{} file(s), {} in {:.1}s ({:.1} MB/s, {} verified, mode {})",
        m.files_processed,
        format_bytes(m.bytes_processed),
        m.elapsed().as_secs_f64(),
        m.average_speed_mbps(),
        verified,
        m.operation_mode,
    );
    match result.status() {
        RunStatus::Success => print_success(&format!("Transfer complete: {detail}")),
        RunStatus::PartialIntegrityFailure => print_warn(&format!(
            "Transfer finished with hash mismatches: {detail}"
        )),
        status => {
            if let Some(e) = result.error() {
                print_error(&format!("{status}: {e}"));
            } else {
                print_error(&status.to_string());
            }
            if let Some(rb) = result.rollback() {
                if rb.preserved {
                    print_warn(&format!(
                        "{} completed file(s) were kept at the destination",
                        result.outcomes().len()
                    ));
                } else {
                    print_info(&format!(
                        "Rolled back {} item(s), {} failed; removed {} created folder(s)",
                        rb.restored.len(),
                        rb.failed.len(),
                        rb.dirs_removed.len()
                    ));
                }
                for f in &rb.failed {
                    print_error(&format!(
                        "Rollback failed for {}: {}",
                        f.current.display(),
                        f.error
                    ));
                }
            }
        }
    }
}
