use std::path::{Path, PathBuf};

use anyhow::{bail, Context as AnyhowContext};

use applist::strings::Strings;
use applist::Context;

/// Labels from the configured strings file, or the built in ones
pub fn load_strings(ctx: &dyn Context) -> anyhow::Result<Strings> {
    match ctx.get_config()?.strings_path()? {
        Some(path) => Ok(Strings::load(&path)
            .with_context(|| format!("loading labels from {}", path.display()))?),
        None => Ok(Strings::new()),
    }
}

/// `dir` made absolute, it must be a directory if it exists
pub fn check_dir(dir: &Path) -> anyhow::Result<PathBuf> {
    let abs = std::path::absolute(dir).with_context(|| format!("resolving {}", dir.display()))?;
    if abs.exists() && !abs.is_dir() {
        bail!("{} is not a directory", abs.display());
    }
    Ok(abs)
}

/// The folder holding the backups, `dir` if given and the configured one
/// otherwise
pub fn backup_dir(ctx: &dyn Context, dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(d) = dir {
        return check_dir(d);
    }
    match ctx.get_config()?.destination()? {
        Some(d) => Ok(d),
        None => bail!(load_strings(ctx)?
            .label("destination_not_set_notification")
            .to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_check_dir() {
        let base = env::temp_dir().join(format!("applist_cli_dir_{}", std::process::id()));
        fs::create_dir_all(&base).unwrap();

        assert_eq!(check_dir(&base).unwrap(), base);
        assert_eq!(check_dir(&base.join("later")).unwrap(), base.join("later"));

        let file = base.join("file");
        fs::write(&file, "x").unwrap();
        assert!(check_dir(&file).is_err());

        fs::remove_dir_all(&base).unwrap();
    }
}
