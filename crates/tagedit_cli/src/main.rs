use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value as JsonValue;
use tagedit_core::core_api::{EditMode, Engine, FsStore, OpenMode, Session};
use tagedit_core::{TagPath, hex};
use tagedit_render::{
    JsonStyle, TextRenderOptions, TextStyle, render_children, render_json_session,
    render_session_header, render_text_with_options, tag_to_json,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Suffixes that are worth a structured parse without `--structured`.
const STRUCTURED_EXTENSIONS: &[&str] = &[
    "dat",
    "dat_old",
    "nbt",
    "schematic",
    "schem",
    "litematic",
    "mcstructure",
];

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Log more detail to stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the whole file as a tree, or its bytes when it has no tree.
    Show {
        #[command(flatten)]
        file: FileArgs,
        #[arg(long)]
        json: bool,
        /// With --json, wrap every value with its tag kind.
        #[arg(long, requires = "json")]
        typed: bool,
        /// Print the tree on one line in stringified form.
        #[arg(long, conflicts_with = "json")]
        snbt: bool,
        /// Print every array element.
        #[arg(long)]
        full_arrays: bool,
    },
    /// Print the node at PATH, e.g. `Inventory/[0]/id`.
    Get {
        #[command(flatten)]
        file: FileArgs,
        path: TagPath,
        #[arg(long)]
        json: bool,
    },
    /// List the children of the compound or list at PATH.
    Ls {
        #[command(flatten)]
        file: FileArgs,
        #[arg(default_value = "")]
        path: TagPath,
    },
    /// Replace the value at PATH, keeping its kind.
    Set {
        #[command(flatten)]
        file: FileArgs,
        path: TagPath,
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },
    /// Remove the compound entry or list element at PATH.
    Rm {
        #[command(flatten)]
        file: FileArgs,
        path: TagPath,
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },
    /// Print the decompressed bytes as a hex dump.
    Hex {
        #[command(flatten)]
        file: FileArgs,
        /// Print the strict editable form accepted by `patch-hex`.
        #[arg(long)]
        editable: bool,
    },
    /// Replace the decompressed bytes with the contents of a hex text file.
    PatchHex {
        file: String,
        #[arg(value_name = "HEXFILE")]
        hex_file: String,
        #[arg(long, value_name = "PATH")]
        output: Option<String>,
    },
    /// List a directory.
    Dir {
        #[arg(default_value = ".")]
        path: String,
    },
}

#[derive(Debug, Args)]
struct FileArgs {
    file: String,
    /// Try a structured parse whatever the file extension.
    #[arg(long, conflicts_with = "raw")]
    structured: bool,
    /// Never try a structured parse.
    #[arg(long)]
    raw: bool,
}

impl FileArgs {
    fn open_mode(&self) -> OpenMode {
        if self.raw {
            OpenMode::Raw
        } else if self.structured || has_structured_extension(&self.file) {
            OpenMode::Auto
        } else {
            OpenMode::Raw
        }
    }
}

fn has_structured_extension(file: &str) -> bool {
    Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            STRUCTURED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = Engine::new(Arc::new(FsStore::new()));
    match cli.command {
        Command::Show {
            file,
            json,
            typed,
            snbt,
            full_arrays,
        } => {
            let session = open(&engine, &file).await;
            if json {
                let style = if typed { JsonStyle::Typed } else { JsonStyle::Plain };
                print_json(&render_json_session(&session, style));
                return;
            }
            match session.tree() {
                Some(tree) => {
                    let style = if snbt { TextStyle::Snbt } else { TextStyle::Tree };
                    let options = TextRenderOptions {
                        verbose: full_arrays,
                    };
                    print!("{}", render_session_header(&session));
                    println!();
                    let text = render_text_with_options(tree, style, options);
                    println!("{}", text.trim_end());
                }
                None => {
                    print!("{}", render_session_header(&session));
                    println!();
                    println!("{}", session.dump());
                }
            }
        }
        Command::Get { file, path, json } => {
            let session = open_structured(&engine, &file).await;
            let Some(tag) = session.get(path.segments()) else {
                die(1, format!("Path {path} does not resolve in {}", file.file));
            };
            if json {
                print_json(&tag_to_json(tag, JsonStyle::Plain));
            } else {
                println!("{tag}");
            }
        }
        Command::Ls { file, path } => {
            let session = open_structured(&engine, &file).await;
            let Some(tree) = session.tree() else {
                die(1, format!("{} has no tree", file.file));
            };
            let Some(listing) = render_children(tree, path.segments()) else {
                die(
                    1,
                    format!("Path {path} is not a compound or list in {}", file.file),
                );
            };
            print!("{listing}");
        }
        Command::Set {
            file,
            path,
            value,
            output,
        } => {
            let mut session = open_structured(&engine, &file).await;
            let Some(current) = session.get(path.segments()) else {
                die(1, format!("Path {path} does not resolve in {}", file.file));
            };
            let replacement = current.parse_like(&value).unwrap_or_else(|e| {
                die(1, format!("Error applying edit at {path}: {e}"));
            });
            session
                .set(path.segments(), replacement)
                .unwrap_or_else(|e| die(1, format!("Error applying edit at {path}: {e}")));
            save(&engine, &mut session, output.as_deref()).await;
        }
        Command::Rm { file, path, output } => {
            let mut session = open_structured(&engine, &file).await;
            let removed = session
                .remove(path.segments())
                .unwrap_or_else(|e| die(1, format!("Error removing {path}: {e}")));
            if !removed {
                die(1, format!("Path {path} cannot be removed from {}", file.file));
            }
            save(&engine, &mut session, output.as_deref()).await;
        }
        Command::Hex { file, editable } => {
            let session = open(&engine, &file).await;
            if editable {
                match session.hex_text() {
                    Some(text) => println!("{text}"),
                    None => println!("{}", hex::to_editable(session.payload())),
                }
            } else {
                println!("{}", session.dump());
            }
        }
        Command::PatchHex {
            file,
            hex_file,
            output,
        } => {
            let text = fs::read_to_string(&hex_file).unwrap_or_else(|e| {
                die(1, format!("Error reading {hex_file}: {e}"));
            });
            let mut session = engine.open(&file, OpenMode::Raw).await.unwrap_or_else(|e| {
                die(1, format!("Error opening {file}: {e}"));
            });
            session
                .set_hex_text(text)
                .unwrap_or_else(|e| die(1, format!("Error editing {file}: {e}")));
            save(&engine, &mut session, output.as_deref()).await;
        }
        Command::Dir { path } => {
            let entries = engine.list_dir(&path).await.unwrap_or_else(|e| {
                die(1, format!("Error listing {path}: {e}"));
            });
            for entry in entries {
                if entry.is_dir {
                    println!("{}/", entry.name);
                } else {
                    println!("{:<40} {:>10}", entry.name, entry.len);
                }
            }
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn open(engine: &Engine, file: &FileArgs) -> Session {
    let mode = file.open_mode();
    debug!(file = %file.file, ?mode, "opening");
    engine
        .open(&file.file, mode)
        .await
        .unwrap_or_else(|e| die(1, format!("Error opening {}: {e}", file.file)))
}

async fn open_structured(engine: &Engine, file: &FileArgs) -> Session {
    let session = open(engine, file).await;
    if session.mode() != EditMode::Structured {
        die(
            1,
            format!(
                "{} did not parse as a tag tree; use `hex` or `patch-hex`",
                file.file
            ),
        );
    }
    session
}

async fn save(engine: &Engine, session: &mut Session, output: Option<&str>) {
    let result = match output {
        Some(path) => engine.save_as(session, path).await,
        None => engine.save(session).await,
    };
    match result {
        Ok(report) => {
            let note = if report.reused_original {
                " (unchanged)"
            } else {
                ""
            };
            println!(
                "Wrote {} bytes to {}{note}",
                report.bytes_written,
                session.path()
            );
        }
        Err(e) => die(1, format!("Error saving {}: {e}", session.path())),
    }
}

fn print_json(value: &JsonValue) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        die(1, format!("Error rendering JSON output: {e}"));
    });
    println!("{rendered}");
}

fn die(code: i32, message: impl Display) -> ! {
    eprintln!("{message}");
    process::exit(code);
}
