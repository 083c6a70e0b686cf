use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Local, NaiveDateTime, TimeZone};
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use super::apk::{parse_badging, read_apk_icon, Badging};
use super::PackageSource;
use crate::adb::{Adb, ExecAdb};
use crate::command::{quote, run_cmd};
use crate::icon;
use crate::package::PackageRecord;
use crate::utils::{ensure_dir_exists, path_str};
use crate::Context;

pub const DUMPSYS_CMD: &str = "dumpsys package packages";

pub const LAUNCHER_QUERY_CMD: &str = "cmd package query-activities --brief \
-a android.intent.action.MAIN -c android.intent.category.LAUNCHER";

/// Prints the device's current UTC offset as `+hhmm`
pub const DEVICE_OFFSET_CMD: &str = "date +%z";

/// Format of the install and update times in `dumpsys package`
const DUMPSYS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `COMPONENT_ENABLED_STATE_DISABLED*` values
const DISABLED_STATES: &[&str] = &["2", "3", "4"];

const SYSTEM_FLAGS: &[&str] = &["SYSTEM", "UPDATED_SYSTEM_APP"];

lazy_static! {
    static ref PACKAGE_HEADER: Regex = Regex::new(r"^\s*Package \[([^\]]+)\] \(").unwrap();
    static ref USER_LINE: Regex = Regex::new(r"^\s*User \d+:").unwrap();
    static ref COMPONENT: Regex = Regex::new(r"^\s*([A-Za-z][\w.]*)/[\w.$]+\s*$").unwrap();
}

/// Reads packages from a device through `adb`.
///
/// Metadata comes from `dumpsys package`. Labels and icons need the APK
/// itself, so when icons are enabled every APK is pulled into the cache and
/// inspected with `aapt2`/`aapt` if one of them is available.
pub struct AdbPackageSource {
    adb: Box<dyn Adb>,
    apk_cache: PathBuf,
    aapt: Option<String>,
    icons: bool,
}

impl AdbPackageSource {
    pub fn new(ctx: &dyn Context, adb: Box<dyn Adb>) -> crate::Result<Self> {
        let icons = ctx.get_config()?.icons_enabled();
        let aapt = ctx
            .maybe_get_bin("aapt2")
            .or_else(|| ctx.maybe_get_bin("aapt"));
        Ok(Self {
            adb,
            apk_cache: ctx.get_cache_dir_child("apks")?,
            aapt,
            icons,
        })
    }

    /// Uses the `adb` configured in the context
    pub fn from_context(ctx: &dyn Context) -> crate::Result<Self> {
        let adb = ExecAdb::new(ctx)?;
        Self::new(ctx, Box::new(adb))
    }

    pub fn with_icons(mut self, icons: bool) -> Self {
        self.icons = icons;
        self
    }

    pub fn icons_enabled(&self) -> bool {
        self.icons
    }

    fn pull_apk(&self, pkg: &PackageRecord) -> crate::Result<PathBuf> {
        let file_name = format!("{}-{}.apk", pkg.package_name, pkg.version_code);
        let local = self.apk_cache.join(&file_name);
        if local.exists() {
            log::trace!("using cached {:?}", local);
            return Ok(local);
        }

        let out = self
            .adb
            .shell_stdout(&format!("pm path {}", quote(&pkg.package_name)))?;
        let remote = parse_pm_path(&out).ok_or_else(|| {
            crate::Error::Generic(format!("no apk path for {}", pkg.package_name))
        })?;

        ensure_dir_exists(&self.apk_cache)?;
        let partial = self.apk_cache.join(format!("{}.part", file_name));
        self.adb
            .pull(remote, path_str(&partial)?)?
            .err_on_status()?;
        fs::rename(&partial, &local)?;
        Ok(local)
    }

    fn badging(&self, apk: &Path) -> Badging {
        let Some(aapt) = &self.aapt else {
            return Badging::default();
        };
        let args = [OsStr::new("dump"), OsStr::new("badging"), apk.as_os_str()];
        match run_cmd(aapt, &args) {
            Ok(out) if out.ok() => parse_badging(&out.stdout_utf8_lossy()),
            Ok(out) => {
                log::warn!(
                    "{} dump badging failed for {:?}: {}",
                    aapt,
                    apk,
                    out.stderr_utf8_lossy().trim()
                );
                Badging::default()
            }
            Err(e) => {
                log::warn!("failed to run {}: {}", aapt, e);
                Badging::default()
            }
        }
    }

    /// The zone `dumpsys` times are written in. This is the current offset,
    /// times from the other side of a DST switch are off by the difference.
    fn device_offset(&self) -> FixedOffset {
        let host = *Local::now().offset();
        match self.adb.shell_stdout(DEVICE_OFFSET_CMD) {
            Ok(out) => parse_utc_offset(&out).unwrap_or_else(|| {
                log::warn!("unexpected offset {:?} from the device, using the host's", out.trim());
                host
            }),
            Err(e) => {
                log::warn!("failed to read the device's UTC offset, using the host's: {}", e);
                host
            }
        }
    }

    /// Fill in the label and icon from the package's APK
    fn add_apk_details(&self, pkg: &mut PackageRecord) -> crate::Result<()> {
        let apk = self.pull_apk(pkg)?;
        let badging = self.badging(&apk);
        if let Some(label) = badging.label {
            pkg.label = label;
        }

        let Some(found) = read_apk_icon(&apk, badging.icon.as_deref())? else {
            log::debug!("no icon found for {}", pkg.package_name);
            return Ok(());
        };
        pkg.icon = icon::usable(&pkg.package_name, found);
        Ok(())
    }
}

impl PackageSource for AdbPackageSource {
    fn installed_packages(&self) -> crate::Result<Vec<PackageRecord>> {
        let out = self.adb.shell_stdout(DUMPSYS_CMD)?;
        let mut packages = parse_dumpsys(&out, &self.device_offset());
        log::debug!("device reported {} packages", packages.len());

        if !self.icons {
            return Ok(packages);
        }
        if self.aapt.is_none() {
            log::warn!("neither aapt2 nor aapt found, app names will be package names");
        }
        for pkg in packages.iter_mut() {
            if let Err(e) = self.add_apk_details(pkg) {
                log::warn!("failed to read the apk of {}: {}", pkg.package_name, e);
            }
        }
        Ok(packages)
    }

    fn launchable_packages(&self) -> crate::Result<HashSet<String>> {
        let out = self.adb.shell_stdout(LAUNCHER_QUERY_CMD)?;
        Ok(parse_launchable(&out))
    }
}

/// The base APK from `pm path` output, split APKs only carry resources for
/// other configurations
fn parse_pm_path(out: &str) -> Option<&str> {
    out.lines()
        .filter_map(|l| l.trim().strip_prefix("package:"))
        .find_or_first(|it| it.ends_with("/base.apk"))
}

/// `+hhmm` or `+hh:mm`
fn parse_utc_offset(out: &str) -> Option<FixedOffset> {
    let out = out.trim();
    let (sign, rest) = match out.chars().next()? {
        '+' => (1, &out[1..]),
        '-' => (-1, &out[1..]),
        _ => return None,
    };
    let digits = rest.replace(':', "");
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_time<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), DUMPSYS_TIME_FORMAT).ok()?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|it| it.timestamp_millis())
}

fn has_system_flag(line: &str) -> bool {
    let Some((_, flags)) = line.split_once('[') else {
        return false;
    };
    flags
        .trim_end_matches(']')
        .split_ascii_whitespace()
        .any(|f| SYSTEM_FLAGS.contains(&f))
}

fn line_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.split_ascii_whitespace()
        .filter_map(|token| token.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Parse `dumpsys package packages` into records, in the order the device
/// lists them. Times are read as local times in `tz`.
pub fn parse_dumpsys<Tz: TimeZone>(out: &str, tz: &Tz) -> Vec<PackageRecord> {
    let mut packages: Vec<PackageRecord> = Vec::new();
    let mut current: Option<PackageRecord> = None;
    let mut seen_user = false;

    for line in out.lines() {
        let trimmed = line.trim();
        // Factory versions of updated system apps, already listed above
        if trimmed == "Hidden system packages:" {
            break;
        }

        if let Some(caps) = PACKAGE_HEADER.captures(line) {
            if let Some(done) = current.take() {
                packages.push(done);
            }
            current = Some(PackageRecord::new(&caps[1], packages.len()));
            seen_user = false;
            continue;
        }

        let Some(pkg) = current.as_mut() else {
            continue;
        };

        if let Some(v) = trimmed.strip_prefix("versionName=") {
            pkg.version_name = Some(v.into());
        } else if let Some(v) = trimmed.strip_prefix("firstInstallTime=") {
            pkg.first_install_time = parse_time(v, tz).unwrap_or(0);
        } else if let Some(v) = trimmed.strip_prefix("lastUpdateTime=") {
            pkg.last_update_time = parse_time(v, tz).unwrap_or(0);
        } else if trimmed.starts_with("flags=[") || trimmed.starts_with("pkgFlags=[") {
            pkg.is_system |= has_system_flag(trimmed);
        } else if USER_LINE.is_match(line) {
            if seen_user {
                continue;
            }
            seen_user = true;
            if let Some(state) = line_value(trimmed, "enabled") {
                pkg.is_enabled = !DISABLED_STATES.contains(&state);
            }
        } else {
            if let Some(code) = line_value(trimmed, "versionCode") {
                pkg.version_code = code.parse().unwrap_or(0);
            }
            if let Some(min) = line_value(trimmed, "minSdk") {
                pkg.min_sdk = min.parse().ok();
            }
        }
    }

    if let Some(done) = current {
        packages.push(done);
    }
    packages
}

/// Package ids out of `query-activities --brief` component lines
pub fn parse_launchable(out: &str) -> HashSet<String> {
    out.lines()
        .filter_map(|l| COMPONENT.captures(l))
        .filter_map(|caps| caps.get(1).map(|m| String::from(m.as_str())))
        .collect()
}
