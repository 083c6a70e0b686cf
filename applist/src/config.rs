use std::borrow::Cow;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::utils::{ensure_dir_exists, read_file};

/// Name of the config file inside the user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

const KEY_DESTINATION: &str = "destination";
const KEY_TEMPLATE: &str = "template";
const KEY_STRINGS: &str = "strings";
const KEY_ICONS: &str = "icons";
const KEY_ADB: &str = "adb";

#[derive(Debug)]
pub enum Error {
    InvalidType,
    MissingKey,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::InvalidType => "InvalidType",
                Self::MissingKey => "MissingKey",
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct ConfigMap<'c> {
    path: &'c Path,
    name: Option<Cow<'c, str>>,
    table: &'c Table,
}

/// The user's configuration file
///
/// ```toml
/// destination = "/home/user/Backups/apps"
/// template = "template.html"
/// strings = "strings.de.toml"
/// icons = true
///
/// [adb]
/// executable = "/opt/android/platform-tools/adb"
/// serial = "emulator-5554"
/// ```
///
/// Relative paths are resolved against the directory holding the config file.
#[derive(Clone, Debug)]
pub struct Config {
    path: PathBuf,
    base: Table,
}

/// Settings for reaching the device over `adb`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdbConfig {
    pub executable: Option<String>,
    pub serial: Option<String>,
}

impl Config {
    pub fn parse(source: &Path) -> crate::Result<Self> {
        let as_str = read_file(source)?;

        let path = PathBuf::from(source);

        let base: Table = match toml::from_str(&as_str) {
            Ok(v) => v,
            Err(e) => return Err(crate::Error::new_cfg(source, &e)),
        };
        Ok(Self { base, path })
    }

    /// Parse the file at `source` if it exists, otherwise return an empty
    /// config that will be written to `source` on [Config::save]
    pub fn load_or_empty(source: &Path) -> crate::Result<Self> {
        if source.exists() {
            Self::parse(source)
        } else {
            log::debug!("no config at {:?}, using an empty one", source);
            Ok(Self::empty(source))
        }
    }

    pub fn empty(path: &Path) -> Self {
        Self {
            path: PathBuf::from(path),
            base: Table::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn invalid_error(&self, msg: String) -> crate::Error {
        crate::Error::InvalidConfig(self.path.display().to_string(), msg)
    }

    pub fn get_map(&self) -> ConfigMap {
        ConfigMap {
            name: None,
            path: &self.path,
            table: &self.base,
        }
    }

    fn resolve(&self, raw: &str) -> PathBuf {
        let p = PathBuf::from(raw);
        if p.is_absolute() {
            return p;
        }
        match self.path.parent() {
            Some(parent) => parent.join(p),
            None => p,
        }
    }

    fn get_path(&self, key: &str) -> crate::Result<Option<PathBuf>> {
        let map = self.get_map();
        Ok(map
            .maybe_get_str_typecheck(key)?
            .filter(|it| !it.is_empty())
            .map(|it| self.resolve(it)))
    }

    /// The folder backups are written to
    pub fn destination(&self) -> crate::Result<Option<PathBuf>> {
        self.get_path(KEY_DESTINATION)
    }

    /// An optional replacement for the built in report template
    pub fn template_path(&self) -> crate::Result<Option<PathBuf>> {
        self.get_path(KEY_TEMPLATE)
    }

    /// An optional TOML file with localized labels
    pub fn strings_path(&self) -> crate::Result<Option<PathBuf>> {
        self.get_path(KEY_STRINGS)
    }

    pub fn icons_enabled(&self) -> bool {
        self.get_map().get_bool_or(KEY_ICONS, true)
    }

    pub fn adb(&self) -> crate::Result<AdbConfig> {
        let base = self.get_map();
        let Some(adb) = base.maybe_get_map_typecheck(KEY_ADB)? else {
            return Ok(AdbConfig::default());
        };
        Ok(AdbConfig {
            executable: adb.maybe_get_str_typecheck("executable")?.map(String::from),
            serial: adb.maybe_get_str_typecheck("serial")?.map(String::from),
        })
    }

    /// Set or clear the stored destination, call [Config::save] to persist it
    pub fn set_destination(&mut self, dest: Option<&Path>) {
        match dest {
            Some(d) => {
                let value = Value::String(d.to_string_lossy().into_owned());
                self.base.insert(KEY_DESTINATION.into(), value);
            }
            None => {
                self.base.remove(KEY_DESTINATION);
            }
        }
    }

    pub fn save(&self) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir_exists(parent)?;
        }
        let as_str = toml::to_string(&self.base).map_err(|e| self.invalid_error(e.to_string()))?;
        fs::write(&self.path, as_str)?;
        log::debug!("saved config to {:?}", self.path);
        Ok(())
    }
}

pub fn parse_config<R, F>(file: &Path, f: F) -> crate::Result<R>
where
    F: FnOnce(&ConfigMap) -> crate::Result<R>,
{
    let as_str = read_file(file)?;

    let table: Table = match toml::from_str(&as_str) {
        Ok(v) => v,
        Err(e) => return Err(crate::Error::new_cfg(file, &e)),
    };

    let base = ConfigMap {
        name: None,
        path: file,
        table: &table,
    };

    f(&base)
}

impl<'c> ConfigMap<'c> {
    fn get_full_path<'a>(&'a self) -> Option<&'a str> {
        self.name.as_ref().map(|it| it.as_ref())
    }

    fn key_path<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self.get_full_path() {
            None => Cow::Borrowed(key),
            Some(v) => Cow::Owned(format!("{}.{}", v, key)),
        }
    }

    /// Helper to create a crate::Error for a missing key
    pub fn missing_key(&self, key: &str) -> crate::Error {
        let path = self.key_path(key);
        crate::Error::InvalidConfig(
            self.path.display().to_string(),
            format!("missing key: {}", path),
        )
    }

    /// Helper to create a crate::Error for an invalid key
    pub fn invalid_key(&self, key: &str, expected: &str) -> crate::Error {
        let path = self.key_path(key);
        crate::Error::InvalidConfig(
            self.path.display().to_string(),
            format!(
                "invalid value for key: {} (expected type: {})",
                path, expected
            ),
        )
    }

    pub fn has(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<&'c Value> {
        self.table.get(key)
    }

    /// Iterate over all string values in this map, other value types are
    /// reported as invalid
    pub fn str_entries(&self) -> crate::Result<Vec<(&'c str, &'c str)>> {
        let table: &'c Table = self.table;
        let mut entries = Vec::with_capacity(table.len());
        for (k, v) in table.iter() {
            match v.as_str() {
                Some(s) => entries.push((k.as_str(), s)),
                None => return Err(self.invalid_key(k, "string")),
            }
        }
        Ok(entries)
    }

    pub fn get_str(&self, key: &str) -> Result<&'c str> {
        self.maybe_get_str(key)?.ok_or(Error::MissingKey)
    }

    pub fn maybe_get_str(&self, key: &str) -> Result<Option<&'c str>> {
        match self.get(key) {
            Some(v) => match v.as_str() {
                Some(v) => Ok(Some(v)),
                None => Err(Error::InvalidType),
            },
            None => Ok(None),
        }
    }

    pub fn maybe_get_str_typecheck(&self, key: &str) -> crate::Result<Option<&'c str>> {
        self.maybe_get_str(key)
            .map_err(|_| self.invalid_key(key, "string"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
            .ok_or(Error::MissingKey)?
            .as_bool()
            .ok_or(Error::InvalidType)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.table
            .get(key)
            .map(|it| it.as_bool().unwrap_or(default))
            .unwrap_or(default)
    }

    pub fn maybe_get_map(&self, key: &str) -> Result<Option<ConfigMap<'c>>> {
        match self.get(key) {
            Some(v) => match v.as_table() {
                Some(table) => {
                    let name = match &self.get_full_path() {
                        Some(parents) => Cow::Owned(format!("{parents}.{key}")),
                        None => Cow::Owned(key.to_string()),
                    };
                    Ok(Some(ConfigMap {
                        name: Some(name),
                        path: self.path,
                        table,
                    }))
                }
                None => Err(Error::InvalidType),
            },
            None => Ok(None),
        }
    }

    pub fn get_map(&self, key: &str) -> Result<ConfigMap<'c>> {
        self.maybe_get_map(key)?.ok_or(Error::MissingKey)
    }

    pub fn maybe_get_map_typecheck(&self, key: &str) -> crate::Result<Option<ConfigMap<'c>>> {
        self.maybe_get_map(key)
            .map_err(|_| self.invalid_key(key, "table"))
    }

    pub fn must_get_map(&self, key: &str) -> crate::Result<ConfigMap<'c>> {
        match self.get_map(key) {
            Err(Error::InvalidType) => Err(self.invalid_key(key, "table")),
            Err(Error::MissingKey) => Err(self.missing_key(key)),
            Ok(v) => Ok(v),
        }
    }
}
