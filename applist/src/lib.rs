pub mod context;
pub use context::{Context, DefaultContext};

pub mod config;

pub mod errors;
pub use errors::{Error, Result};

pub mod adb;

pub mod command;
pub use command::run_cmd;

pub mod package;
pub use package::{Icon, PackageRecord};

pub mod source;
pub use source::PackageSource;

pub mod icon;

pub mod template;

pub mod strings;

pub mod report;

pub mod backup;
pub use backup::{BackupFile, BackupIndex};

pub mod observer;
pub use observer::BackupObserver;

pub mod service;
pub use service::{BackupOutcome, BackupRequest, BackupService};

pub mod utils;

#[cfg(test)]
pub mod testing;
