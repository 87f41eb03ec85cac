#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # cclab
//! ## Introduction
//!
//! Scaffolding and grading checks for C++ lab assignments.
//!
//! ## Tools
//!
//! `clang++`, `clang-format` and `clang-tidy` need to be on your `PATH`. Their
//! names and deadlines can be overridden with the `CCLAB_*` environment
//! variables, also read from a `.env` file.

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use bpaf::*;
use cclab::{
    DEFAULT_LAB_CONFIG, LabConfig, PartId, Platform, SystemRunner,
    cc::{
        CommentStripper, FormatChecker, LintChecker, diff::DEFAULT_CONTEXT, strip_and_compare,
        util::find_sources,
    },
    config,
    scaffold::{
        CompileDbOutcome, compile_db::DEFAULT_COMPILE_COMMAND, generate_doxyfile,
        generate_makefiles, write_compile_db,
    },
};
use dotenvy::dotenv;
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Generate the Makefiles of a lab
    Makefiles {
        /// lab configuration
        lab:  PathBuf,
        /// repository root
        root: PathBuf,
    },
    /// Generate a Doxyfile
    Doxyfile {
        /// documentation output directory
        docdir: String,
        /// where to write the Doxyfile
        dir:    PathBuf,
    },
    /// Generate compile_commands.json
    CompileDb {
        /// where to write the database
        dir:             PathBuf,
        /// compiler invocation
        command:         String,
        /// replace an existing database
        remove_existing: bool,
        /// files to list
        files:           Vec<String>,
    },
    /// Print a file without comments
    Strip(PathBuf),
    /// Diff two files with comments removed
    Compare {
        /// lines of context
        context:    usize,
        /// reference file
        base:       PathBuf,
        /// student file
        submission: PathBuf,
    },
    /// Check files against the course style
    FormatCheck(Vec<PathBuf>),
    /// Lint files
    Lint {
        /// lab configuration
        lab:   PathBuf,
        /// one-based part number
        part:  usize,
        /// files to lint
        files: Vec<PathBuf>,
    },
    /// Print a lab configuration value
    Config {
        /// lab configuration
        lab:  PathBuf,
        /// key path
        keys: Vec<String>,
    },
    /// List C++ sources and headers
    Sources(PathBuf),
}

/// Global flags plus the command.
#[derive(Debug, Clone)]
struct Opts {
    /// Log debug output
    verbose: bool,
    /// What to do
    cmd:     Cmd,
}

/// Parse the command line arguments and return `Opts`
fn options() -> Opts {
    /// parses the lab configuration path
    fn lab() -> impl Parser<PathBuf> {
        long("lab")
            .help("Path to the lab configuration")
            .argument::<PathBuf>("PATH")
            .fallback(PathBuf::from(DEFAULT_LAB_CONFIG))
    }

    /// parses a directory, defaulting to the current one
    fn dir(name: &'static str) -> impl Parser<PathBuf> {
        positional::<PathBuf>(name)
            .help("Directory to work in")
            .fallback(PathBuf::from("."))
    }

    /// parses one or more source files
    fn files() -> impl Parser<Vec<PathBuf>> {
        positional::<PathBuf>("FILE")
            .help("C++ source or header file")
            .some("at least one file is required")
    }

    let makefiles = {
        let lab = lab();
        let root = dir("ROOT");
        construct!(Cmd::Makefiles { lab, root })
    }
    .to_options()
    .command("makefiles")
    .help("Generate the Makefiles of every part, backing up old ones");

    let doxyfile = {
        let docdir = long("docdir")
            .help("Documentation output directory")
            .argument::<String>("DIR")
            .fallback("doc".to_string());
        let dir = dir("DIR");
        construct!(Cmd::Doxyfile { docdir, dir })
    }
    .to_options()
    .command("doxyfile")
    .help("Generate a basic Doxyfile, backing up an old one");

    let compile_db = {
        let dir = long("dir")
            .help("Directory to write compile_commands.json into")
            .argument::<PathBuf>("DIR")
            .fallback(PathBuf::from("."));
        let command = long("command")
            .help("Compiler invocation")
            .argument::<String>("CMD")
            .fallback(DEFAULT_COMPILE_COMMAND.to_string());
        let remove_existing = long("remove-existing")
            .help("Replace an existing database")
            .switch();
        let files = positional::<String>("FILE")
            .help("Source files; every *.cc file in DIR when omitted")
            .many();
        construct!(Cmd::CompileDb {
            dir,
            command,
            remove_existing,
            files
        })
    }
    .to_options()
    .command("compile-db")
    .help("Generate a clang compile commands database");

    let strip = {
        let file = positional::<PathBuf>("FILE").help("C++ source file");
        construct!(Cmd::Strip(file))
    }
    .to_options()
    .command("strip")
    .help("Print a file with its comments removed");

    let compare = {
        let context = short('c')
            .long("context")
            .help("Lines of context around each change")
            .argument::<usize>("N")
            .fallback(DEFAULT_CONTEXT);
        let base = positional::<PathBuf>("BASE").help("Reference (starter) file");
        let submission = positional::<PathBuf>("SUBMISSION").help("Student file");
        construct!(Cmd::Compare {
            context,
            base,
            submission
        })
    }
    .to_options()
    .command("compare")
    .help("Diff two files after removing comments");

    let format_check = {
        let files = files();
        construct!(Cmd::FormatCheck(files))
    }
    .to_options()
    .command("format-check")
    .help("Diff files against their clang-format output");

    let lint = {
        let lab = lab();
        let part = long("part")
            .help("Part number, starting at 1")
            .argument::<usize>("N")
            .fallback(1)
            .guard(|n| *n >= 1, "parts are numbered from 1");
        let files = files();
        construct!(Cmd::Lint { lab, part, files })
    }
    .to_options()
    .command("lint")
    .help("Lint files with clang-tidy");

    let config = {
        let lab = lab();
        let keys = positional::<String>("KEY")
            .help("gradedsrc | makefile_name | num_parts | parts <n> <key> | <key>")
            .some("a key is required");
        construct!(Cmd::Config { lab, keys })
    }
    .to_options()
    .command("config")
    .help("Print a value from the lab configuration");

    let sources = {
        let dir = dir("DIR");
        construct!(Cmd::Sources(dir))
    }
    .to_options()
    .command("sources")
    .help("List .cc and .h files");

    let cmd = construct!([
        makefiles,
        doxyfile,
        compile_db,
        strip,
        compare,
        format_check,
        lint,
        config,
        sources
    ]);

    let verbose = short('v')
        .long("verbose")
        .help("Log debug output")
        .switch();

    construct!(Opts { verbose, cmd })
        .to_options()
        .descr("Scaffolding and grading checks for C++ labs")
        .run()
}

/// Logs `err` with its causes and returns a failing exit code.
fn fail(err: impl Into<anyhow::Error>) -> ExitCode {
    tracing::error!("{:#}", err.into());
    ExitCode::FAILURE
}

/// Executes one command.
fn run(cmd: Cmd) -> Result<ExitCode> {
    let tools = config::tools();
    let runner = SystemRunner;

    match cmd {
        Cmd::Makefiles { lab, root } => {
            let lab = LabConfig::load(&lab)?;
            match generate_makefiles(&root, &lab) {
                Ok(written) => {
                    for path in written {
                        tracing::info!("Wrote {}", path.display());
                    }
                }
                Err(e) => return Ok(fail(e)),
            }
        }
        Cmd::Doxyfile { docdir, dir } => match generate_doxyfile(&dir, &docdir) {
            Ok(path) => tracing::info!("Wrote {}", path.display()),
            Err(e) => return Ok(fail(e)),
        },
        Cmd::CompileDb {
            dir,
            command,
            remove_existing,
            files,
        } => {
            match write_compile_db(dir, files, command, remove_existing) {
                Ok(CompileDbOutcome::Written(path)) => tracing::info!("Wrote {}", path.display()),
                Ok(CompileDbOutcome::KeptExisting(_)) => {}
                Err(e) => return Ok(fail(e)),
            }
        }
        Cmd::Strip(file) => match CommentStripper::new(&runner, &tools).strip(&file) {
            Some(text) => {
                for line in text.lines() {
                    println!("{line}");
                }
            }
            None => return Ok(ExitCode::FAILURE),
        },
        Cmd::Compare {
            context,
            base,
            submission,
        } => {
            let stripper = CommentStripper::new(&runner, &tools);
            match strip_and_compare(&stripper, &base, &submission, context) {
                Ok(report) if report.is_empty() => {
                    tracing::info!("No differences once comments are removed.")
                }
                Ok(report) => println!("{}", report.colored()),
                Err(_) => return Ok(ExitCode::FAILURE),
            }
        }
        Cmd::FormatCheck(files) => {
            let checker = FormatChecker::new(&runner, &tools);
            let mut status = ExitCode::SUCCESS;
            for file in files {
                match checker.check(&file) {
                    Ok(report) if report.is_empty() => {
                        println!("{}: formatted correctly", file.display())
                    }
                    Ok(report) => println!("{}\n{}", file.display(), report.colored()),
                    Err(e) => status = fail(e),
                }
            }
            return Ok(status);
        }
        Cmd::Lint { lab, part, files } => {
            let lab = LabConfig::load(&lab)?;
            let checker = LintChecker::new(&runner, &tools);
            let part = PartId(part - 1);
            let mut status = ExitCode::SUCCESS;
            for file in files {
                match checker.check_part(&file, &lab, part, Platform::current()) {
                    Ok(warnings) if warnings.is_empty() => println!("{}: No lint", file.display()),
                    Ok(warnings) => println!("{}: {}", file.display(), warnings.join("\n")),
                    Err(e) => status = fail(e),
                }
            }
            return Ok(status);
        }
        Cmd::Config { lab, keys } => {
            let lab = LabConfig::load(&lab)?;
            println!("{}", lab.lookup(keys.as_slice())?);
        }
        Cmd::Sources(dir) => {
            for path in find_sources(&dir).context("Could not list sources")? {
                println!("{}", path.display());
            }
        }
    };

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    dotenv().ok();

    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = LevelFilter::from_level(if opts.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    });
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    config::ensure_initialized()?;
    run(opts.cmd)
}
