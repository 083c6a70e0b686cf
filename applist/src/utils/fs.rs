use std::borrow::Cow;
use std::fs::{self, create_dir_all};
use std::io::{self, ErrorKind};
use std::path::Path;

use directories::BaseDirs;

pub fn ensure_dir_exists(p: &Path) -> io::Result<()> {
    if p.exists() {
        return Ok(());
    }

    create_dir_all(p)
}

pub fn path_has_ext<P: AsRef<Path> + ?Sized>(p: &P, ext: &str) -> bool {
    p.as_ref()
        .extension()
        .map_or(false, |it| it.eq_ignore_ascii_case(ext))
}

/// The path as UTF-8, needed wherever it is handed to another program
pub fn path_str(path: &Path) -> crate::Result<&str> {
    path.to_str()
        .ok_or_else(|| crate::Error::BadPath(path.to_path_buf()))
}

pub fn read_file(path: &Path) -> crate::Result<String> {
    match fs::read_to_string(path) {
        Ok(v) => Ok(v),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => Err(crate::Error::MissingFile(path.display().to_string())),
            _ => Err(e.into()),
        },
    }
}

/// Returns a human readable version of the given path, with the user's home
/// directory abbreviated to `~`
pub fn readable_path(path: &Path) -> Cow<'_, str> {
    let home = BaseDirs::new().map(|it| it.home_dir().to_path_buf());
    readable_path_in(path, home.as_deref())
}

fn readable_path_in<'a>(path: &'a Path, home: Option<&Path>) -> Cow<'a, str> {
    if let Some(rel) = home.and_then(|h| path.strip_prefix(h).ok()) {
        if rel.as_os_str().is_empty() {
            return Cow::Borrowed("~");
        }
        return Cow::Owned(format!("~/{}", rel.to_string_lossy()));
    }
    path.to_string_lossy()
}

/// Turns a local path into a `file://` link that can be opened directly
pub fn file_url(path: &Path) -> String {
    let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let as_str = abs.to_string_lossy();
    let mut url = String::with_capacity(as_str.len() + 8);
    url.push_str("file://");
    if !as_str.starts_with('/') {
        url.push('/');
    }
    for c in as_str.chars() {
        match c {
            '%' => url.push_str("%25"),
            ' ' => url.push_str("%20"),
            '#' => url.push_str("%23"),
            '?' => url.push_str("%3F"),
            '\\' => url.push('/'),
            _ => url.push(c),
        }
    }
    url
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_readable_path() {
        let home = PathBuf::from("/home/alice");
        assert_eq!(
            readable_path_in(Path::new("/home/alice/Backups/apps"), Some(&home)),
            "~/Backups/apps"
        );
        assert_eq!(readable_path_in(Path::new("/home/alice"), Some(&home)), "~");
        assert_eq!(
            readable_path_in(Path::new("/mnt/sdcard/apps"), Some(&home)),
            "/mnt/sdcard/apps"
        );
        assert_eq!(readable_path_in(Path::new("/mnt/x"), None), "/mnt/x");
    }

    #[test]
    fn test_path_has_ext() {
        assert!(path_has_ext("base.APK", "apk"));
        assert!(!path_has_ext("base.apk.tmp", "apk"));
        assert!(!path_has_ext("noext", "apk"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url() {
        assert_eq!(
            file_url(Path::new("/definitely/not here/a.html")),
            "file:///definitely/not%20here/a.html"
        );
        assert_eq!(
            file_url(Path::new("/definitely/100% done/#1?.html")),
            "file:///definitely/100%25%20done/%231%3F.html"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_path_str() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        assert_eq!(path_str(Path::new("/tmp/a.apk")).unwrap(), "/tmp/a.apk");
        let bad = Path::new(OsStr::from_bytes(b"/tmp/\xff.apk"));
        assert!(matches!(path_str(bad), Err(crate::Error::BadPath(p)) if p == bad));
    }
}
