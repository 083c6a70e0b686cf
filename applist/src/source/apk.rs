use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use image::ImageReader;
use lazy_static::lazy_static;
use regex::Regex;
use zip::ZipArchive;

use crate::package::Icon;

lazy_static! {
    static ref LABEL: Regex = Regex::new(r"^application-label:'(.*)'$").unwrap();
    static ref APPLICATION: Regex =
        Regex::new(r"^application: label='((?:[^'\\]|\\.)*)' icon='([^']*)'").unwrap();
    static ref ICON: Regex = Regex::new(r"^application-icon-(\d+):'([^']*)'$").unwrap();
}

/// Densities at or above this are `anydpi`/`nodpi`, usually an XML icon
const ANY_DENSITY: u32 = 65534;

const IMAGE_EXTS: &[&str] = &["png", "webp"];

/// Name of the launcher icon when nothing better is known
const DEFAULT_ICON_STEM: &str = "ic_launcher";

/// The parts of `aapt dump badging` the report uses
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Badging {
    pub label: Option<String>,
    /// Path of the best launcher icon inside the APK
    pub icon: Option<String>,
}

fn unescape(s: &str) -> String {
    s.replace("\\'", "'").replace("\\\\", "\\")
}

fn is_image(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| IMAGE_EXTS.contains(&ext))
}

/// Parse `aapt dump badging` (or `aapt2 dump badging`) output.
///
/// The icon with the highest real density wins. `anydpi` entries are only
/// used if nothing else exists.
pub fn parse_badging(out: &str) -> Badging {
    let mut badging = Badging::default();
    let mut fallback_label = None;
    let mut fallback_icon = None;
    // (prefer raster, density, path)
    let mut best_icon: Option<(bool, u32, &str)> = None;

    for line in out.lines() {
        let line = line.trim_end();
        if let Some(caps) = LABEL.captures(line) {
            if let Some(m) = caps.get(1) {
                badging.label = Some(unescape(m.as_str()));
            }
        } else if let Some(caps) = APPLICATION.captures(line) {
            fallback_label = caps.get(1).map(|m| unescape(m.as_str()));
            fallback_icon = caps.get(2).map(|m| m.as_str());
        } else if let Some(caps) = ICON.captures(line) {
            let (Some(density), Some(path)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let density: u32 = density.as_str().parse().unwrap_or(0);
            let path = path.as_str();
            let key = (is_image(path) && density < ANY_DENSITY, density, path);
            if best_icon.map_or(true, |b| (key.0, key.1) > (b.0, b.1)) {
                best_icon = Some(key);
            }
        }
    }

    if badging.label.is_none() {
        badging.label = fallback_label.filter(|it| !it.is_empty());
    }
    badging.icon = best_icon
        .map(|(_, _, path)| path)
        .or(fallback_icon)
        .filter(|it| !it.is_empty())
        .map(String::from);
    badging
}

/// Higher for denser resource folders, used to pick the sharpest variant
fn density_rank(entry: &str) -> u8 {
    let dir = entry.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    for (i, qualifier) in ["xxxhdpi", "xxhdpi", "xhdpi", "hdpi", "mdpi", "ldpi"]
        .iter()
        .enumerate()
    {
        if dir.contains(qualifier) {
            return 6 - i as u8;
        }
    }
    0
}

fn file_stem(entry: &str) -> &str {
    let name = entry.rsplit('/').next().unwrap_or(entry);
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

/// The densest raster entry under `res/` whose file name is `stem` plus an
/// image extension
fn best_entry<'a>(names: &[&'a str], stem: &str) -> Option<&'a str> {
    names
        .iter()
        .copied()
        .filter(|n| n.starts_with("res/") && is_image(n) && file_stem(n) == stem)
        .max_by_key(|n| (density_rank(n), std::cmp::Reverse(*n)))
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> crate::Result<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut data = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut data)?;
    Ok(data)
}

fn dimensions(data: &[u8]) -> crate::Result<(u32, u32)> {
    Ok(ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_dimensions()?)
}

/// Read the launcher icon out of an APK.
///
/// `icon_path` is the path reported by `aapt`. An XML (adaptive) icon is
/// resolved by looking for `<name>_background` and `<name>_foreground`
/// images, and then for a plain `<name>` image. Returns `None` if nothing
/// usable is found.
pub fn read_apk_icon(apk: &Path, icon_path: Option<&str>) -> crate::Result<Option<Icon>> {
    let mut archive = ZipArchive::new(File::open(apk)?)?;

    if let Some(path) = icon_path.filter(|it| is_image(it)) {
        if archive.index_for_name(path).is_some() {
            return Ok(Some(Icon::Encoded(read_entry(&mut archive, path)?)));
        }
        log::debug!("{} not found in {:?}", path, apk);
    }

    let stem = icon_path.map(file_stem).unwrap_or(DEFAULT_ICON_STEM);
    let names: Vec<String> = archive.file_names().map(String::from).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();

    let foreground = best_entry(&names, &format!("{}_foreground", stem));
    if let Some(fg) = foreground {
        let mut layers = Vec::with_capacity(2);
        if let Some(bg) = best_entry(&names, &format!("{}_background", stem)) {
            layers.push(read_entry(&mut archive, bg)?);
        }
        let fg_data = read_entry(&mut archive, fg)?;
        let (width, height) = dimensions(&fg_data)?;
        layers.push(fg_data);
        return Ok(Some(Icon::Layered {
            width,
            height,
            layers,
        }));
    }

    match best_entry(&names, stem) {
        Some(entry) => Ok(Some(Icon::Encoded(read_entry(&mut archive, entry)?))),
        None => Ok(None),
    }
}
