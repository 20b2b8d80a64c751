use std::path::{Path, PathBuf};

use droid_triage::items::Item;
use droid_triage::logging::init_logging;
use droid_triage::source::{parse_bugreport_file, parse_logcat_file, parse_monkey_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Bugreport,
    Logcat,
    Monkey,
}

#[derive(Debug)]
struct Args {
    input: PathBuf,
    mode: Mode,
    compact: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut input: Option<PathBuf> = None;
    let mut mode: Option<Mode> = None;
    let mut compact = false;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--input" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--input requires a value".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--mode" => {
                let value = it
                    .next()
                    .ok_or_else(|| "--mode requires a value".to_string())?;
                mode = Some(match value.as_str() {
                    "bugreport" => Mode::Bugreport,
                    "logcat" => Mode::Logcat,
                    "monkey" => Mode::Monkey,
                    other => return Err(format!("Unknown mode: {other}")),
                });
            }
            "--compact" => {
                compact = true;
            }
            "-h" | "--help" => {
                return Err(
                    "Usage: triage --input PATH [--mode bugreport|logcat|monkey] [--compact]\n"
                        .to_string(),
                );
            }
            other => {
                // A bare path works too, for piping convenience.
                if input.is_none() && !other.starts_with('-') {
                    input = Some(PathBuf::from(other));
                } else {
                    return Err(format!("Unknown arg: {other}"));
                }
            }
        }
    }

    let input = input.ok_or_else(|| "an input path is required".to_string())?;
    let mode = mode.unwrap_or_else(|| infer_mode(&input));
    Ok(Args {
        input,
        mode,
        compact,
    })
}

/// Guess the log flavor from the file name when `--mode` is absent.
fn infer_mode(input: &Path) -> Mode {
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.contains("monkey") {
        Mode::Monkey
    } else if name.contains("logcat") {
        Mode::Logcat
    } else {
        Mode::Bugreport
    }
}

fn main() {
    init_logging();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let item = match args.mode {
        Mode::Bugreport => parse_bugreport_file(&args.input).map(Item::Bugreport),
        Mode::Logcat => parse_logcat_file(&args.input).map(Item::Logcat),
        Mode::Monkey => parse_monkey_file(&args.input).map(Item::MonkeyLog),
    };
    let item = match item {
        Ok(item) => item,
        Err(err) => {
            eprintln!("Failed to parse {}: {err}", args.input.display());
            std::process::exit(1);
        }
    };

    let rendered = if args.compact {
        serde_json::to_string(&item)
    } else {
        serde_json::to_string_pretty(&item)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("Failed to render output: {err}");
            std::process::exit(1);
        }
    }
}
