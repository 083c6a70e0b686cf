//! One backup run from start to finish.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossbeam::channel::{bounded, Receiver, TryRecvError};

use crate::backup::backup_title;
use crate::observer::BackupObserver;
use crate::report::{ReportCounts, ReportGenerator, ReportMeta, Trigger};
use crate::source::PackageSource;
use crate::strings::Strings;
use crate::template::Template;
use crate::utils::ensure_dir_exists;
use crate::Context;

static NEXT_INVOCATION: AtomicU64 = AtomicU64::new(1);

/// Tells apart the runs of one process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationId(u64);

impl InvocationId {
    fn next() -> Self {
        Self(NEXT_INVOCATION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type CompletionCallback = Box<dyn FnOnce(&Path) + Send>;

/// Everything specific to a single run
#[derive(Default)]
pub struct BackupRequest {
    /// Free form tag naming what started the run, see [Trigger::from_source]
    pub source: Option<String>,
    /// Used instead of the configured destination
    pub destination: Option<PathBuf>,
    /// Called with the written file once the run succeeded
    pub on_complete: Option<CompletionCallback>,
}

impl BackupRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_destination<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.destination = Some(dir.into());
        self
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&Path) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn trigger(&self) -> Trigger {
        Trigger::from_source(self.source.as_deref())
    }
}

impl fmt::Debug for BackupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupRequest")
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub path: PathBuf,
    pub title: String,
    pub counts: ReportCounts,
    pub trigger: Trigger,
    pub duration: Duration,
}

type Clock = Box<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Enumerates packages, renders the report and writes it to the destination
pub struct BackupService {
    source: Box<dyn PackageSource>,
    template: Template,
    strings: Strings,
    destination: Option<PathBuf>,
    clock: Clock,
}

impl BackupService {
    pub fn new(source: Box<dyn PackageSource>, template: Template, strings: Strings) -> Self {
        Self {
            source,
            template,
            strings,
            destination: None,
            clock: Box::new(Local::now),
        }
    }

    /// Template, labels and destination come from the user config
    pub fn from_context(ctx: &dyn Context, source: Box<dyn PackageSource>) -> crate::Result<Self> {
        let config = ctx.get_config()?;
        let template = match config.template_path()? {
            Some(path) => Template::load(&path)?,
            None => Template::builtin(),
        };
        let strings = match config.strings_path()? {
            Some(path) => Strings::load(&path)?,
            None => Strings::new(),
        };
        Ok(Self::new(source, template, strings).with_destination(config.destination()?))
    }

    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    /// Replace the clock used for the report time and file name
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Local> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn strings(&self) -> &Strings {
        &self.strings
    }

    /// Run a backup on the current thread.
    ///
    /// The observer sees `failed` for every error, `started` is only sent
    /// once a destination is known.
    pub fn run(
        &self,
        request: BackupRequest,
        observer: &dyn BackupObserver,
    ) -> crate::Result<BackupOutcome> {
        self.run_as(InvocationId::next(), request, observer)
    }

    /// Run a backup on a new thread
    pub fn spawn(
        self: &Arc<Self>,
        request: BackupRequest,
        observer: Arc<dyn BackupObserver>,
    ) -> crate::Result<BackupHandle> {
        let id = InvocationId::next();
        let (tx, rx) = bounded(1);
        let service = Arc::clone(self);

        std::thread::Builder::new()
            .name(format!("backup-{}", id.value()))
            .spawn(move || {
                let res = service.run_as(id, request, observer.as_ref());
                // Nobody is waiting if the handle was dropped
                _ = tx.send(res);
            })?;

        Ok(BackupHandle { id, rx })
    }

    fn run_as(
        &self,
        id: InvocationId,
        request: BackupRequest,
        observer: &dyn BackupObserver,
    ) -> crate::Result<BackupOutcome> {
        let trigger = request.trigger();
        let BackupRequest {
            destination,
            on_complete,
            ..
        } = request;

        let destination = destination.or_else(|| self.destination.clone());
        match self.backup(id, trigger, destination, observer) {
            Ok(outcome) => {
                observer.succeeded(id, &outcome);
                if let Some(cb) = on_complete {
                    cb(&outcome.path);
                }
                Ok(outcome)
            }
            Err(e) => {
                observer.failed(id, &e.to_string());
                Err(e)
            }
        }
    }

    fn backup(
        &self,
        id: InvocationId,
        trigger: Trigger,
        destination: Option<PathBuf>,
        observer: &dyn BackupObserver,
    ) -> crate::Result<BackupOutcome> {
        let dest = destination.ok_or(crate::Error::NoDestination)?;
        observer.started(id);

        let start = Instant::now();
        let generated_at = (self.clock)();

        let packages = self.source.installed_packages()?;
        let launchable = self.source.launchable_packages()?;

        let generator = ReportGenerator::new(&self.template, &self.strings);
        let items = generator.render_items(&packages, &launchable, &mut |done, total| {
            observer.progress(id, done, total)
        })?;
        let meta = ReportMeta {
            generated_at,
            trigger,
            duration: start.elapsed(),
        };
        let report = generator.finish(items, &meta);

        let path = write_report(&dest, &report.file_name, &report.html)?;
        log::debug!("wrote {:?}", path);

        Ok(BackupOutcome {
            path,
            title: backup_title(&generated_at.naive_local()),
            counts: report.counts,
            trigger,
            duration: meta.duration,
        })
    }
}

/// Write `html` to `dir/name` through a temp file in the same folder. An
/// existing file is never replaced and nothing is left behind on failure.
fn write_report(dir: &Path, name: &str, html: &str) -> crate::Result<PathBuf> {
    if dir.exists() && !dir.is_dir() {
        return Err(crate::Error::NotADirectory(dir.to_path_buf()));
    }
    ensure_dir_exists(dir)?;

    let target = dir.join(name);
    let mut tmp = tempfile::Builder::new()
        .prefix(".app-list-backup-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(html.as_bytes())?;
    tmp.as_file().sync_all()?;

    tmp.persist_noclobber(&target).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            crate::Error::BackupExists(target.clone())
        } else {
            crate::Error::IO(e.error)
        }
    })?;
    Ok(target)
}

/// The pending result of a spawned run
pub struct BackupHandle {
    id: InvocationId,
    rx: Receiver<crate::Result<BackupOutcome>>,
}

impl BackupHandle {
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Block until the run is done
    pub fn wait(self) -> crate::Result<BackupOutcome> {
        match self.rx.recv() {
            Ok(res) => res,
            Err(_) => Err(crate::Error::new_generic("backup worker exited without a result")),
        }
    }

    /// The result if the run is done, the handle otherwise
    pub fn try_wait(self) -> std::result::Result<crate::Result<BackupOutcome>, Self> {
        match self.rx.try_recv() {
            Ok(res) => Ok(res),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => Ok(Err(crate::Error::new_generic(
                "backup worker exited without a result",
            ))),
        }
    }
}
