use std::path::PathBuf;

use anyhow::Context as AnyhowContext;
use clap::{self, Args};

use applist::source::{AdbPackageSource, ExportedPackages};
use applist::utils::readable_path;
use applist::Context;

use crate::printer::Printer;

#[derive(Args)]
pub struct ExportPackages {
    /// JSON file to write
    file: PathBuf,

    /// Leave icons out of the export
    #[arg(short = 'n', long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    no_icons: bool,
}

impl ExportPackages {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let source = AdbPackageSource::from_context(ctx)?;
        let icons = source.icons_enabled() && !self.no_icons;
        let source = source.with_icons(icons);

        let printer = Printer::new();
        printer.status("reading packages from the device");
        let exported = ExportedPackages::collect(&source, icons)?;
        printer.clear_status();

        exported
            .save(&self.file)
            .with_context(|| format!("writing {}", self.file.display()))?;
        printer.println(format!(
            "{} packages saved to {}",
            exported.packages.len(),
            readable_path(&self.file)
        ));
        Ok(())
    }
}
