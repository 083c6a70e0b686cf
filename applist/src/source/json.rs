use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PackageSource;
use crate::icon::{self, icon_png};
use crate::package::{Icon, PackageRecord};
use crate::utils::{base64_bytes, unbase64};

/// Current layout of exported package lists
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// A package list saved for offline use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPackages {
    pub format: u32,
    pub packages: Vec<ExportedPackage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPackage {
    #[serde(flatten)]
    pub record: PackageRecord,
    pub launchable: bool,
    /// Base64 PNG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ExportedPackages {
    /// Snapshot everything `source` reports
    pub fn collect(source: &dyn PackageSource, with_icons: bool) -> crate::Result<Self> {
        let launchable = source.launchable_packages()?;
        let packages = source
            .installed_packages()?
            .into_iter()
            .map(|record| {
                let icon = if with_icons {
                    encode_icon(&record)
                } else {
                    None
                };
                ExportedPackage {
                    launchable: launchable.contains(&record.package_name),
                    record,
                    icon,
                }
            })
            .collect();
        Ok(Self {
            format: EXPORT_FORMAT_VERSION,
            packages,
        })
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => crate::Error::MissingFile(path.to_string_lossy().into()),
            _ => crate::Error::IO(e),
        })?;
        let exported: Self = serde_json::from_reader(BufReader::new(file))?;
        if exported.format != EXPORT_FORMAT_VERSION {
            return Err(crate::Error::Json(format!(
                "unsupported format {} in {:?}",
                exported.format, path
            )));
        }
        Ok(exported)
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

fn encode_icon(record: &PackageRecord) -> Option<String> {
    let icon = record.icon.as_ref()?;
    match icon_png(Some(icon)) {
        Ok(png) => Some(base64_bytes(&png)),
        Err(e) => {
            log::warn!("not exporting icon of {}: {}", record.package_name, e);
            None
        }
    }
}

/// Replays an exported package list
pub struct JsonPackageSource {
    exported: ExportedPackages,
}

impl JsonPackageSource {
    pub fn new(exported: ExportedPackages) -> Self {
        Self { exported }
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        log::debug!("loading packages from {:?}", path);
        Ok(Self::new(ExportedPackages::load(path)?))
    }
}

impl PackageSource for JsonPackageSource {
    fn installed_packages(&self) -> crate::Result<Vec<PackageRecord>> {
        Ok(self
            .exported
            .packages
            .iter()
            .map(|it| {
                let mut record = it.record.clone();
                record.icon = match it.icon.as_deref().map(unbase64) {
                    Some(Some(png)) => icon::usable(&record.package_name, Icon::Encoded(png)),
                    Some(None) => {
                        log::warn!("icon of {} is not base64", record.package_name);
                        None
                    }
                    None => None,
                };
                record
            })
            .collect())
    }

    fn launchable_packages(&self) -> crate::Result<HashSet<String>> {
        Ok(self
            .exported
            .packages
            .iter()
            .filter(|it| it.launchable)
            .map(|it| it.record.package_name.clone())
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::icon::rasterize;
    use crate::testing::{mock_source, package_set, tmp_context, TestContext};
    use image::{Rgba, RgbaImage};
    use rstest::*;
    use std::fs;

    #[rstest]
    fn test_export_and_replay(tmp_context: TestContext) {
        let (mut packages, launchable) = package_set(2, 1, 1);
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        packages[0].icon = Some(Icon::Argb {
            width: 1,
            height: 1,
            pixels: vec![0xFF010203],
        });
        packages[1].icon = Some(Icon::Encoded(crate::icon::encode_png(&img).unwrap()));

        let source = mock_source(packages.clone(), launchable.clone());
        let exported = ExportedPackages::collect(&source, true).unwrap();
        let path = tmp_context.get_temp_path(Some("json"));
        exported.save(&path).unwrap();

        let replay = JsonPackageSource::load(&path).unwrap();
        let loaded = replay.installed_packages().unwrap();
        assert_eq!(loaded.len(), packages.len());
        assert_eq!(replay.launchable_packages().unwrap(), launchable);

        for (before, after) in packages.iter().zip(loaded.iter()) {
            assert_eq!(before.package_name, after.package_name);
            assert_eq!(before.index, after.index);
            assert_eq!(before.is_system, after.is_system);
            assert_eq!(before.icon.is_some(), after.icon.is_some());
        }
        // Raw pixels come back as PNG with the same content
        let first = rasterize(loaded[0].icon.as_ref().unwrap()).unwrap();
        assert_eq!(first.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[rstest]
    fn test_export_without_icons(tmp_context: TestContext) {
        let (mut packages, launchable) = package_set(1, 0, 0);
        packages[0].icon = Some(Icon::Encoded(b"garbage".to_vec()));
        let source = mock_source(packages, launchable);
        let exported = ExportedPackages::collect(&source, false).unwrap();
        assert!(exported.packages[0].icon.is_none());

        let path = tmp_context.get_temp_path(Some("json"));
        exported.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(!text.contains("\"icon\""));
    }

    #[rstest]
    fn test_bad_icon_data(tmp_context: TestContext) {
        let path = tmp_context
            .new_tmp_file_suffix(
                Some("json"),
                r#"{"format": 1, "packages": [{
                    "package_name": "a.b", "label": "A", "is_system": false,
                    "is_enabled": true, "version_name": null, "version_code": 1,
                    "min_sdk": null, "first_install_time": 0, "last_update_time": 0,
                    "index": 0, "launchable": true, "icon": "%%%"}]}"#,
            )
            .unwrap();
        let replay = JsonPackageSource::load(&path).unwrap();
        let packages = replay.installed_packages().unwrap();
        assert_eq!(packages.len(), 1);
        assert!(packages[0].icon.is_none());
    }

    #[test]
    fn test_undecodable_icon_is_dropped() {
        let (mut packages, launchable) = package_set(2, 1, 0);
        let img = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        for pkg in packages.iter_mut() {
            pkg.icon = Some(Icon::Encoded(crate::icon::encode_png(&img).unwrap()));
        }
        let source = mock_source(packages, launchable);
        let mut exported = ExportedPackages::collect(&source, true).unwrap();
        exported.packages[1].icon = Some(base64_bytes(b"definitely not a png"));

        let replay = JsonPackageSource::new(exported);
        let loaded = replay.installed_packages().unwrap();
        assert!(loaded[0].icon.is_some());
        assert!(loaded[1].icon.is_none());
        assert!(loaded[2].icon.is_some());

        let report = crate::report::ReportGenerator::with_timezone(
            &crate::template::Template::builtin(),
            &crate::strings::Strings::new(),
            chrono::Utc,
        )
        .render_items(&loaded, &replay.launchable_packages().unwrap(), &mut |_, _| {});
        assert_eq!(report.unwrap().counts.total, 3);
    }

    #[rstest]
    #[case("{\"format\": 9, \"packages\": []}")]
    #[case("not json")]
    fn test_rejects_bad_files(tmp_context: TestContext, #[case] content: &str) {
        let path = tmp_context.new_tmp_file(content).unwrap();
        assert!(matches!(
            JsonPackageSource::load(&path),
            Err(crate::Error::Json(_))
        ));
    }

    #[rstest]
    fn test_missing_file(tmp_context: TestContext) {
        assert!(matches!(
            JsonPackageSource::load(&tmp_context.to_abs("nope.json")),
            Err(crate::Error::MissingFile(_))
        ));
    }
}
