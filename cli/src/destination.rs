use std::path::PathBuf;

use anyhow::Context as AnyhowContext;
use clap::{self, Args, Subcommand};

use applist::utils::{file_url, readable_path};
use applist::Context;

use crate::printer::Printer;
use crate::utils::{check_dir, load_strings};

#[derive(Args)]
pub struct Destination {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store the folder backups are written to
    #[command()]
    Set {
        /// The folder, created on the first backup if it doesn't exist
        dir: PathBuf,
    },

    /// Show the stored folder
    #[command()]
    Show,

    /// Forget the stored folder
    #[command()]
    Clear,
}

impl Destination {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let printer = Printer::new();
        match &self.command {
            Command::Set { dir } => {
                let dir = check_dir(dir)?;
                let mut config = ctx.get_config()?.clone();
                config.set_destination(Some(&dir));
                config.save().with_context(|| "saving config")?;
                printer.println(readable_path(&dir));
            }
            Command::Show => match ctx.get_config()?.destination()? {
                Some(dir) => {
                    printer.println(readable_path(&dir));
                    printer.println(file_url(&dir));
                }
                None => {
                    let strings = load_strings(ctx)?;
                    printer.println(strings.label("destination_not_set_notification"));
                }
            },
            Command::Clear => {
                let mut config = ctx.get_config()?.clone();
                config.set_destination(None);
                config.save().with_context(|| "saving config")?;
            }
        }
        Ok(())
    }
}
