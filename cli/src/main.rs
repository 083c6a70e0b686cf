use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Context as AnyhowContext;
use clap::{Parser, Subcommand};
use flexi_logger::{FileSpec, LevelFilter, LogSpecification, Logger, LoggerHandle, WriteMode};

use applist::{Context, DefaultContext};

mod console;
mod printer;
mod utils;

mod run;
use run::{AlreadyReported, Run};

mod destination;
use destination::Destination;

mod history;
use history::{History, Latest};

mod export;
use export::ExportPackages;

mod devices;
use devices::Devices;

const SIMPLE_VERSION_STRING: &str = include!(concat!(env!("OUT_DIR"), "/simple_version_string"));
const VERSION_STRING: &str = include!(concat!(env!("OUT_DIR"), "/version_string"));

#[derive(Parser)]
#[command(name = "applist-backup")]
#[command(version(SIMPLE_VERSION_STRING))]
#[command(long_version(VERSION_STRING))]
struct Cli {
    /// `-e`, `--log-stderr`: log to `stderr` instead of the log file
    #[arg(short = 'e', long, help = "Log to stderr instead of a file", action = clap::ArgAction::SetTrue, default_value_t = false)]
    log_stderr: bool,

    /// `-f`, `--log-file`: where to write the log, defaults to `log` in the
    /// user's local data directory
    #[arg(short = 'f', long, help = "Send log output to the given file")]
    log_file: Option<PathBuf>,

    /// `-s`, `--log-spec`: a [flexi_logger](https://docs.rs/flexi_logger/latest/flexi_logger/struct.LogSpecification.html) log spec
    #[arg(short = 's', long, help = "Log spec for flexi_logger")]
    log_spec: Option<String>,

    /// `-l`, `--log-level`: log verbosity
    ///
    /// | Value | Log Level |
    /// | ----- | --------- |
    /// | **0** | **Warn** |
    /// | 1 | Info |
    /// | 2 | Debug |
    /// | 3 | Trace |
    #[arg(
        short = 'l',
        long,
        help = "Set the log level, 0 = warn, 1 = info, etc",
        long_help = None,
        default_value_t = 0
    )]
    log_level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the full version string and exit
    #[command()]
    Version,

    /// Back up the app list of the connected device as an HTML report
    #[command()]
    Run(Run),

    /// Manage the folder backups are written to
    #[command()]
    Destination(Destination),

    /// List previous backups, newest first
    #[command()]
    History(History),

    /// Show the most recent backup
    #[command()]
    Latest(Latest),

    /// Save the device's package list as JSON for `run --from-json`
    #[command()]
    ExportPackages(ExportPackages),

    /// List the devices `adb` can see
    #[command()]
    Devices(Devices),
}

fn level_filter(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

impl Cli {
    fn configure_loggers(&self, ctx: &dyn Context) -> anyhow::Result<LoggerHandle> {
        let log_spec = match &self.log_spec {
            Some(s) => {
                LogSpecification::parse(s).with_context(|| format!("parsing log spec {}", s))?
            }
            None if self.log_level > 0 => {
                let lvl = level_filter(self.log_level);
                LogSpecification::builder()
                    .module("applist", lvl)
                    .module("applist_backup", lvl)
                    .build()
            }
            None => LogSpecification::env_or_parse("warn")
                .with_context(|| "getting log spec from env")?,
        };

        let mut logger = Logger::with(log_spec);

        if !self.log_stderr {
            let path = match &self.log_file {
                Some(v) if v.is_absolute() => Some(Cow::Borrowed(v)),
                Some(v) => Some(Cow::Owned(std::env::current_dir()?.join(v))),
                None => ctx.get_user_local_dir_child("log").map(Cow::Owned).ok(),
            };

            if let Some(p) = &path {
                if let Some(parent) = p.parent() {
                    applist::utils::ensure_dir_exists(parent)
                        .with_context(|| format!("creating log dir {}", parent.display()))?;
                }
                logger = logger
                    .log_to_file(
                        FileSpec::try_from(p.as_ref()).with_context(|| "creating filespec")?,
                    )
                    .append()
                    .write_mode(WriteMode::BufferAndFlush);
            }
        }

        logger.start().with_context(|| "starting logger")
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = &cli.command {
        println!("{}", VERSION_STRING);
        return Ok(());
    }

    let ctx = DefaultContext::new();

    let log_handle = cli.configure_loggers(&ctx)?;

    let res = match &cli.command {
        Commands::Run(c) => c.run(&ctx),
        Commands::Destination(c) => c.run(&ctx),
        Commands::History(c) => c.run(&ctx),
        Commands::Latest(c) => c.run(&ctx),
        Commands::ExportPackages(c) => c.run(&ctx),
        Commands::Devices(c) => c.run(&ctx),

        Commands::Version => unreachable!(),
    };

    log_handle.flush();

    match res {
        Err(e) if e.is::<AlreadyReported>() => std::process::exit(1),
        other => other,
    }
}
