use std::cmp::Reverse;
use std::fmt::Display;
use std::fs::read_dir;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;

pub const BACKUP_PREFIX: &str = "app-list-backup-";
pub const BACKUP_SUFFIX: &str = ".html";

/// Timestamp format embedded in backup file names
pub const FILE_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Format of the human readable backup title
pub const TITLE_FORMAT: &str = "%b %d, %Y %H:%M";

lazy_static! {
    static ref BACKUP_NAME: Regex =
        Regex::new(r"^app-list-backup-(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2})\.html$").unwrap();
    static ref BACKUP_NAME_ANYWHERE: Regex =
        Regex::new(r"app-list-backup-(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2})\.html").unwrap();
}

/// A report written by a previous run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: PathBuf,
    /// Wall clock time of the run, as encoded in the file name
    pub created: NaiveDateTime,
    pub title: String,
}

impl BackupFile {
    /// Returns `None` if the path doesn't name a backup
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let created = parse_backup_name(name)?;
        Some(Self {
            path: path.to_path_buf(),
            created,
            title: backup_title(&created),
        })
    }
}

/// The file name for a backup generated at `at`, second resolution
pub fn backup_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{}{}{}",
        BACKUP_PREFIX,
        at.format(FILE_TIME_FORMAT),
        BACKUP_SUFFIX
    )
}

/// Parse the timestamp out of an exact backup file name
pub fn parse_backup_name(name: &str) -> Option<NaiveDateTime> {
    let caps = BACKUP_NAME.captures(name)?;
    NaiveDateTime::parse_from_str(caps.get(1)?.as_str(), FILE_TIME_FORMAT).ok()
}

/// Parse the timestamp of a backup file name found anywhere in `s`, such as a
/// full path or a `file://` link
pub fn parse_backup_time(s: &str) -> Option<NaiveDateTime> {
    let caps = BACKUP_NAME_ANYWHERE.captures(s)?;
    NaiveDateTime::parse_from_str(caps.get(1)?.as_str(), FILE_TIME_FORMAT).ok()
}

pub fn backup_title(created: &NaiveDateTime) -> String {
    created.format(TITLE_FORMAT).to_string()
}

/// Read only view of the backups in a destination folder
pub struct BackupIndex {
    dir: PathBuf,
}

impl BackupIndex {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All backups, newest first.
    ///
    /// Order comes from the time in the file name only. Entries that don't
    /// follow the naming pattern are skipped. A missing folder has no backups.
    pub fn list(&self) -> crate::Result<Vec<BackupFile>> {
        if !self.dir.exists() {
            log::debug!("backup dir {:?} doesn't exist", self.dir);
            return Ok(Vec::new());
        }
        if !self.dir.is_dir() {
            return Err(crate::Error::NotADirectory(self.dir.clone()));
        }

        let mut backups = Vec::new();
        for entry in read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match BackupFile::from_path(&entry.path()) {
                Some(b) => backups.push(b),
                None => log::trace!("skipping non backup {:?}", entry.file_name()),
            }
        }

        backups.sort_by_key(|it| Reverse((it.created, it.path.clone())));
        Ok(backups)
    }

    /// The most recent backup, if any
    pub fn latest(&self) -> crate::Result<Option<BackupFile>> {
        Ok(self.list()?.into_iter().next())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_context, TestContext};
    use chrono::{Local, NaiveDate, Utc};
    use rstest::*;
    use std::fs;
    use std::time::{Duration, SystemTime};

    fn ndt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_file_name_roundtrip_same_second() {
        let now = Local::now();
        let name = backup_file_name(&now);
        assert!(BACKUP_NAME.is_match(&name), "{} doesn't match", name);

        let parsed = parse_backup_name(&name).expect("parsing generated name");
        let delta = now.naive_local() - parsed;
        assert!(delta.num_milliseconds() >= 0);
        assert!(delta.num_milliseconds() < 1000);
    }

    #[test]
    fn test_file_name_is_fixed_width() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            backup_file_name(&at),
            "app-list-backup-2024-01-02-03-04-05.html"
        );
    }

    #[rstest]
    #[case("app-list-backup-2024-03-09-17-05-59.html", Some(ndt(2024, 3, 9, 17, 5, 59)))]
    #[case("app-list-backup-2024-3-9-17-5-59.html", None)]
    #[case("app-list-backup-2024-03-09-17-05-59.html.bak", None)]
    #[case("copy of app-list-backup-2024-03-09-17-05-59.html", None)]
    #[case("app-list-backup-2024-13-09-17-05-59.html", None)]
    #[case("notes.html", None)]
    fn test_parse_backup_name(#[case] name: &str, #[case] expected: Option<NaiveDateTime>) {
        assert_eq!(parse_backup_name(name), expected);
    }

    #[test]
    fn test_parse_backup_time_anywhere() {
        assert_eq!(
            parse_backup_time("file:///sdcard/Backups/app-list-backup-2023-12-31-23-59-00.html"),
            Some(ndt(2023, 12, 31, 23, 59, 0))
        );
        assert_eq!(parse_backup_time("file:///sdcard/Backups/"), None);
    }

    #[test]
    fn test_title() {
        assert_eq!(backup_title(&ndt(2024, 3, 9, 17, 5, 59)), "Mar 09, 2024 17:05");
    }

    #[rstest]
    fn test_index_sorted_by_name_time(tmp_context: TestContext) {
        let dir = tmp_context.get_temp_dir();
        let names = [
            "app-list-backup-2024-01-01-10-00-00.html",
            "app-list-backup-2024-06-01-09-00-00.html",
            "app-list-backup-2023-12-31-23-59-59.html",
            "app-list-backup-garbage.html",
            "readme.txt",
        ];
        // mtimes follow the list, so the oldest name has the newest mtime
        for (i, n) in names.iter().enumerate() {
            let path = dir.join(n);
            fs::write(&path, "<html></html>").unwrap();
            let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 * (i as u64 + 1));
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(mtime)
                .unwrap();
        }
        fs::create_dir(dir.join("app-list-backup-2025-01-01-00-00-00.html")).unwrap();

        let index = BackupIndex::new(&dir);
        let listed = index.list().unwrap();
        let titles: Vec<_> = listed.iter().map(|it| it.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Jun 01, 2024 09:00", "Jan 01, 2024 10:00", "Dec 31, 2023 23:59"]
        );
        assert_eq!(listed[0].path, dir.join(names[1]));

        let latest = index.latest().unwrap().expect("a latest backup");
        assert_eq!(latest.created, ndt(2024, 6, 1, 9, 0, 0));
    }

    #[rstest]
    fn test_index_missing_dir(tmp_context: TestContext) {
        let index = BackupIndex::new(tmp_context.to_abs("nope"));
        assert!(index.list().unwrap().is_empty());
        assert!(index.latest().unwrap().is_none());
    }

    #[rstest]
    fn test_index_file_is_error(tmp_context: TestContext) {
        let file = tmp_context.new_tmp_file("x").unwrap();
        assert!(matches!(
            BackupIndex::new(&file).list(),
            Err(crate::Error::NotADirectory(_))
        ));
    }
}
