use blanket::blanket;
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;

use directories::BaseDirs;
use which::which;

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::Error;

use std::ops::DerefMut;
use std::sync::Mutex;

/// Directory name used under the user's config, data, and cache dirs
pub const APP_DIR_NAME: &str = "applist-backup";

/// Env var that overrides the location of the config file
pub const CONFIG_ENV: &str = "APPLIST_BACKUP_CONFIG";

#[derive(Clone)]
struct CachedBin {
    name: String,
    path: String,
}

fn find_program(prog: &str) -> Option<String> {
    which(prog).ok().map(|it| it.to_string_lossy().into())
}

/// Context is a trait for an object that can help standardize file locations,
/// find binaries, and lookup env vars.
///
/// Most methods on this trait have a default implementation that is perfectly
/// safe to leave unchanged.
#[blanket(derive(Ref, Box))]
pub trait Context: Send + Sync {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn maybe_get_bin(&self, bin: &str) -> Option<String> {
        find_program(bin)
    }

    fn get_bin(&self, bin: &str) -> crate::Result<String> {
        self.maybe_get_bin(bin)
            .ok_or_else(|| Error::MissingBin(bin.into()))
    }

    fn get_env(&self, key: &str) -> crate::Result<String> {
        self.maybe_get_env(key)
            .ok_or_else(|| Error::MissingEnv(key.into()))
    }

    /// Returns the user's configuration, an empty configuration is returned
    /// if the file doesn't exist yet
    fn get_config<'a>(&'a self) -> crate::Result<&'a Config>;

    fn get_config_file(&self) -> crate::Result<PathBuf> {
        if let Some(path) = self.maybe_get_env(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(self.get_user_config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Directory holding pulled APKs and other scratch files
    fn get_cache_dir(&self) -> crate::Result<PathBuf> {
        let bd = BaseDirs::new().ok_or(Error::NoBaseDirs)?;
        Ok(bd.cache_dir().join(APP_DIR_NAME))
    }

    fn get_cache_dir_child(&self, child: &str) -> crate::Result<PathBuf> {
        self.get_cache_dir().map(|x| x.join(child))
    }

    fn get_user_local_dir(&self) -> crate::Result<PathBuf> {
        let bd = BaseDirs::new().ok_or(Error::NoBaseDirs)?;
        Ok(bd.data_local_dir().join(APP_DIR_NAME))
    }

    fn get_user_local_dir_child(&self, child: &str) -> crate::Result<PathBuf> {
        self.get_user_local_dir().map(|x| x.join(child))
    }

    fn get_user_config_dir(&self) -> crate::Result<PathBuf> {
        let bd = BaseDirs::new().ok_or(Error::NoBaseDirs)?;
        Ok(bd.config_dir().join(APP_DIR_NAME))
    }
}

pub struct DefaultContext {
    bin_cache: Mutex<Vec<CachedBin>>,
    config: OnceCell<Config>,
}

impl Clone for DefaultContext {
    fn clone(&self) -> Self {
        let cache = self.bin_cache.lock().expect("failed to lock");
        Self {
            bin_cache: Mutex::new(cache.clone()),
            config: self.config.clone(),
        }
    }
}

impl DefaultContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for DefaultContext {
    fn default() -> Self {
        Self {
            bin_cache: Mutex::new(Vec::new()),
            config: OnceCell::new(),
        }
    }
}

impl Context for DefaultContext {
    fn get_config<'a>(&'a self) -> crate::Result<&'a Config> {
        self.config.get_or_try_init(|| {
            let path = self.get_config_file()?;
            Config::load_or_empty(&path)
        })
    }

    fn maybe_get_bin(&self, prog: &str) -> Option<String> {
        let mut cache_guard = self.bin_cache.lock().expect("failed to lock");
        let cache = cache_guard.deref_mut();
        if let Some(val) = cache.iter().find(|it| it.name == prog) {
            return Some(val.path.clone());
        }

        let found = find_program(prog)?;

        cache.push(CachedBin {
            name: prog.into(),
            path: found.clone(),
        });

        Some(found)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_context, TestContext};
    use rstest::*;

    #[rstest]
    fn test_config_file_env_override(mut tmp_context: TestContext) {
        let default = tmp_context.get_config_file().unwrap();
        assert!(default.ends_with(CONFIG_FILE_NAME));

        tmp_context.set_env(CONFIG_ENV, "/etc/applist.toml");
        assert_eq!(
            tmp_context.get_config_file().unwrap(),
            PathBuf::from("/etc/applist.toml")
        );
    }

    #[rstest]
    fn test_missing_bin(tmp_context: TestContext) {
        match tmp_context.get_bin("aapt2") {
            Err(Error::MissingBin(name)) => assert_eq!(name, "aapt2"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
