use std::path::{Path, PathBuf};

use clap::{self, Args};
use itertools::Itertools;
use serde::Serialize;

use applist::backup::{BackupFile, BackupIndex, FILE_TIME_FORMAT};
use applist::utils::{file_url, readable_path};
use applist::Context;

use crate::printer::Printer;
use crate::utils::backup_dir;

#[derive(Args)]
pub struct History {
    /// Print JSON instead of text
    #[arg(short, long, action = clap::ArgAction::SetTrue, default_value_t = false)]
    json: bool,

    /// Look in this folder instead of the configured destination
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct Latest {
    /// Look in this folder instead of the configured destination
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct HistoryEntry<'a> {
    title: &'a str,
    created: String,
    path: String,
    url: String,
}

impl<'a> From<&'a BackupFile> for HistoryEntry<'a> {
    fn from(backup: &'a BackupFile) -> Self {
        Self {
            title: &backup.title,
            created: backup.created.format(FILE_TIME_FORMAT).to_string(),
            path: backup.path.to_string_lossy().into_owned(),
            url: file_url(&backup.path),
        }
    }
}

fn no_backups_line(dir: &Path) -> String {
    format!("no backups in {}", readable_path(dir))
}

fn format_history(backups: &[BackupFile]) -> String {
    backups
        .iter()
        .map(|it| format!("{}  {}", it.title, readable_path(&it.path)))
        .join("\n")
}

impl History {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let dir = backup_dir(ctx, self.dir.as_deref())?;
        let backups = BackupIndex::new(dir).list()?;
        let printer = Printer::new();

        if self.json {
            let entries: Vec<HistoryEntry> = backups.iter().map(HistoryEntry::from).collect();
            printer.println(serde_json::to_string_pretty(&entries)?);
        } else if !backups.is_empty() {
            printer.println(format_history(&backups));
        }
        Ok(())
    }
}

impl Latest {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let dir = backup_dir(ctx, self.dir.as_deref())?;
        let printer = Printer::new();
        match BackupIndex::new(&dir).latest()? {
            Some(backup) => {
                printer.println_bold(&backup.title);
                printer.println(file_url(&backup.path));
            }
            None => printer.println(no_backups_line(&dir)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn backup(name: &str) -> BackupFile {
        BackupFile::from_path(&Path::new("/backups").join(name)).expect("a backup name")
    }

    #[test]
    fn test_format_history() {
        let backups = vec![
            backup("app-list-backup-2024-06-01-09-00-00.html"),
            backup("app-list-backup-2024-01-01-10-00-00.html"),
        ];
        assert_eq!(
            format_history(&backups),
            "Jun 01, 2024 09:00  /backups/app-list-backup-2024-06-01-09-00-00.html\n\
             Jan 01, 2024 10:00  /backups/app-list-backup-2024-01-01-10-00-00.html"
        );
    }

    #[test]
    fn test_history_entry_json() {
        let b = backup("app-list-backup-2024-06-01-09-00-00.html");
        let json = serde_json::to_value(HistoryEntry::from(&b)).unwrap();
        assert_eq!(json["title"], "Jun 01, 2024 09:00");
        assert_eq!(json["created"], "2024-06-01-09-00-00");
        assert_eq!(
            json["url"],
            "file:///backups/app-list-backup-2024-06-01-09-00-00.html"
        );
    }

    #[test]
    fn test_latest_without_backups() {
        let dir = std::env::temp_dir().join(format!("applist_cli_latest_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        assert!(BackupIndex::new(&dir).latest().unwrap().is_none());
        assert_eq!(
            no_backups_line(Path::new("/srv/backups")),
            "no backups in /srv/backups"
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
