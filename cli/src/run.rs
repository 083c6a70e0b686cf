use std::fmt;
use std::path::PathBuf;

use anyhow::Context as AnyhowContext;
use clap::{self, Args};

use applist::source::{AdbPackageSource, JsonPackageSource, PackageSource};
use applist::{BackupRequest, BackupService, Context};

use crate::console::ConsoleObserver;
use crate::utils::load_strings;

/// Marks an error the console observer already showed to the user
#[derive(Debug)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backup failed")
    }
}

impl std::error::Error for AlreadyReported {}

#[derive(Args)]
pub struct Run {
    /// What started this run, `tasker` and `automatic` mark it as automatic
    #[arg(short = 'S', long)]
    source: Option<String>,

    /// Write the backup here instead of the configured destination
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Use a package list saved with `export-packages` instead of a device
    #[arg(short = 'j', long)]
    from_json: Option<PathBuf>,

    /// Skip pulling APKs for app names and icons
    #[arg(short = 'n', long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    no_icons: bool,
}

impl Run {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        // Nothing touches the device until there is somewhere to write to
        if !self.has_destination(ctx)? {
            let observer = ConsoleObserver::new(load_strings(ctx)?);
            let message = applist::Error::NoDestination.to_string();
            observer.show_failure(&message);
            log::error!("backup failed: {}", message);
            return Err(AlreadyReported.into());
        }

        let source = self.package_source(ctx)?;
        let service = BackupService::from_context(ctx, source)?;
        let observer = ConsoleObserver::new(service.strings().clone());

        let mut request = BackupRequest::new();
        if let Some(tag) = &self.source {
            request = request.with_source(tag.as_str());
        }
        if let Some(dest) = &self.destination {
            let dest = std::path::absolute(dest)
                .with_context(|| format!("resolving {}", dest.display()))?;
            request = request.with_destination(dest);
        }

        match service.run(request, &observer) {
            Ok(_) => Ok(()),
            Err(e) => {
                log::error!("backup failed: {}", e);
                Err(AlreadyReported.into())
            }
        }
    }

    fn has_destination(&self, ctx: &dyn Context) -> anyhow::Result<bool> {
        if self.destination.is_some() {
            return Ok(true);
        }
        Ok(ctx.get_config()?.destination()?.is_some())
    }

    fn package_source(&self, ctx: &dyn Context) -> anyhow::Result<Box<dyn PackageSource>> {
        if let Some(path) = &self.from_json {
            let source = JsonPackageSource::load(path)
                .with_context(|| format!("loading packages from {}", path.display()))?;
            return Ok(Box::new(source));
        }
        let source = AdbPackageSource::from_context(ctx)?;
        let icons = source.icons_enabled() && !self.no_icons;
        Ok(Box::new(source.with_icons(icons)))
    }
}
