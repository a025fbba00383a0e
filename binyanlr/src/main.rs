//! YANLR command-line tool for turning YAML documents into key sets.
//!
//! Usage: yanlr [OPTIONS] [FILE]
//!
//! Options:
//!   -r, --root <NAME>      Root key name [default: $YANLR_ROOT or user]
//!   --tokens               Print the token stream instead of keys
//!   --tree                 Print the parse tree instead of keys
//!   --meta                 Also print key metadata
//!   --check                Check if file is valid (exit 0 if valid, 1 if invalid)
//!   -o, --output <FILE>    Write output to specified file
//!   -h, --help             Print help
//!   -V, --version          Print version

use libyanlr::{parse_tree, parse_with_filename, tokenize_with_filename, KeyName};
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Root key name used when neither `--root` nor `YANLR_ROOT` is given.
const DEFAULT_ROOT: &str = "user";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Keys,
    Tokens,
    Tree,
    Check,
}

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();

    let mut root: Option<String> = None;
    let mut mode = Mode::Keys;
    let mut with_meta = false;
    let mut output_file: Option<&str> = None;
    let mut input_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "-V" | "--version" => {
                println!("yanlr {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "-r" | "--root" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --root requires a key name");
                    process::exit(1);
                }
                root = Some(args[i].clone());
            }
            "--tokens" => set_mode(&mut mode, Mode::Tokens),
            "--tree" => set_mode(&mut mode, Mode::Tree),
            "--check" => set_mode(&mut mode, Mode::Check),
            "--meta" => {
                with_meta = true;
            }
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --output requires an argument");
                    process::exit(1);
                }
                output_file = Some(&args[i]);
            }
            "-" => {
                // Explicit stdin
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                process::exit(1);
            }
            _ => {
                if input_path.is_some() {
                    eprintln!("Error: Multiple input paths not supported");
                    process::exit(1);
                }
                input_path = Some(&args[i]);
            }
        }
        i += 1;
    }

    let root = root.unwrap_or_else(root_from_env);
    if let Err(e) = KeyName::new(&root) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let input = match read_input(input_path) {
        Ok(input) => input,
        Err(message) => {
            eprintln!("{}", message);
            process::exit(1);
        }
    };

    let exit_code = process_input(&input, input_path, &root, mode, with_meta, output_file);
    process::exit(exit_code);
}

fn set_mode(mode: &mut Mode, next: Mode) {
    if *mode != Mode::Keys && *mode != next {
        eprintln!("Error: --tokens, --tree and --check are mutually exclusive");
        process::exit(1);
    }
    *mode = next;
}

/// Install a stderr subscriber filtered by `YANLR_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("YANLR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install logger: {}", e);
    }
}

fn root_from_env() -> String {
    env::var("YANLR_ROOT")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_ROOT.to_string())
}

fn read_input(input_path: Option<&str>) -> Result<String, String> {
    match input_path {
        Some(path) => {
            let bytes = fs::read(path).map_err(|e| format!("Error reading {}: {}", path, e))?;
            String::from_utf8(bytes)
                .map_err(|e| format!("Error: {} is not valid UTF-8: {}", path, e))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Error reading stdin: {}", e))?;
            Ok(buffer)
        }
    }
}

fn process_input(
    input: &str,
    input_file: Option<&str>,
    root: &str,
    mode: Mode,
    with_meta: bool,
    output_file: Option<&str>,
) -> i32 {
    let filename = input_file.map(|p| {
        Path::new(p)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| p.to_string())
    });
    debug!(file = ?input_file, root, ?mode, "processing input");

    let result = match mode {
        Mode::Tokens => tokenize_with_filename(input, filename.as_deref()).map(|tokens| {
            tokens
                .iter()
                .map(|t| format!("{}\n", t))
                .collect::<String>()
        }),
        Mode::Tree => parse_tree(input, filename.as_deref()).map(|tree| format!("{}\n", tree)),
        Mode::Keys | Mode::Check => {
            parse_with_filename(input, root, filename.as_deref()).map(|keys| keys.format(with_meta))
        }
    };

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("{}: {}", input_file.unwrap_or("<stdin>"), e);
            return 1;
        }
    };

    if mode == Mode::Check {
        match input_file {
            Some(path) => println!("{}: ok", path),
            None => println!("ok"),
        }
        return 0;
    }

    match output_file {
        Some(path) => {
            if let Err(e) = fs::write(path, output) {
                eprintln!("Error writing {}: {}", path, e);
                return 1;
            }
        }
        None => print!("{}", output),
    }
    0
}

fn print_help() {
    println!(
        "yanlr - convert YAML documents into hierarchical key sets

USAGE:
    yanlr [OPTIONS] [FILE]

ARGS:
    [FILE]    Input file (reads from stdin if not provided or '-')

OPTIONS:
    -r, --root <NAME>      Root key name [default: $YANLR_ROOT or {}]

    --tokens               Print the token stream instead of keys

    --tree                 Print the parse tree instead of keys

    --meta                 Print metadata lines (name meta:array = #1)

    --check                Check if input is valid (exit 0 if valid, 1 if invalid)

    -o, --output <FILE>    Write output to specified file

    -h, --help             Print help

    -V, --version          Print version

ENVIRONMENT:
    YANLR_ROOT    Root key name when --root is not given
    YANLR_LOG     Log filter, e.g. debug or libyanlr=trace [default: warn]

EXAMPLES:
    # Print the keys of a configuration file
    yanlr config.yaml

    # Mount below another root and show array metadata
    yanlr --root system/app --meta config.yaml

    # Show how the scanner tokenizes a document
    yanlr --tokens config.yaml",
        DEFAULT_ROOT
    );
}
