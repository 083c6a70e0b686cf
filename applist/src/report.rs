//! Renders the app list into the HTML report.

use std::collections::HashSet;
use std::fmt::{Display, Write as _};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};

use crate::backup::backup_file_name;
use crate::icon;
use crate::package::PackageRecord;
use crate::strings::{Strings, LOCALISATION_PLACEHOLDERS};
use crate::template::{Placeholders, Template};
use crate::utils::escape_html;

/// Format used for every time shown in the report
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source tags that mark a run as automatic
const AUTOMATIC_SOURCES: &[&str] = &["tasker", "automatic"];

/// What started a backup, this only changes a label in the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    #[default]
    Manual,
    Automatic,
}

impl Trigger {
    pub fn from_source(source: Option<&str>) -> Self {
        match source {
            Some(s) if AUTOMATIC_SOURCES.iter().any(|it| s.eq_ignore_ascii_case(it)) => {
                Self::Automatic
            }
            _ => Self::Manual,
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

/// Aggregate counts over the packages included in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportCounts {
    pub total: usize,
    pub system: usize,
    pub enabled: usize,
    /// System packages left out because they can't be launched
    pub excluded: usize,
}

impl ReportCounts {
    pub fn user(&self) -> usize {
        self.total - self.system
    }

    pub fn disabled(&self) -> usize {
        self.total - self.enabled
    }

    /// Every package that was looked at, included or not
    pub fn enumerated(&self) -> usize {
        self.total + self.excluded
    }
}

/// User packages are always kept, system packages only if they can be launched
pub fn is_included(pkg: &PackageRecord, launchable: &HashSet<String>) -> bool {
    !pkg.is_system || launchable.contains(&pkg.package_name)
}

/// The rendered app items, before they go into the template
#[derive(Debug, Clone, Default)]
pub struct AppItems {
    pub html: String,
    pub counts: ReportCounts,
}

/// Details about the run that end up in the report header
#[derive(Debug, Clone)]
pub struct ReportMeta<Tz: TimeZone> {
    pub generated_at: DateTime<Tz>,
    pub trigger: Trigger,
    pub duration: Duration,
}

/// A finished report
#[derive(Debug, Clone)]
pub struct Report {
    pub html: String,
    pub counts: ReportCounts,
    pub file_name: String,
}

pub struct ReportGenerator<'a, Tz: TimeZone = Local> {
    template: &'a Template,
    strings: &'a Strings,
    tz: Tz,
}

impl<'a> ReportGenerator<'a, Local> {
    /// A generator showing times in the local timezone
    pub fn new(template: &'a Template, strings: &'a Strings) -> Self {
        Self::with_timezone(template, strings, Local)
    }
}

impl<'a, Tz> ReportGenerator<'a, Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn with_timezone(template: &'a Template, strings: &'a Strings, tz: Tz) -> Self {
        Self {
            template,
            strings,
            tz,
        }
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    fn format_millis(&self, millis: i64) -> String {
        match self.tz.timestamp_millis_opt(millis).earliest() {
            Some(dt) => dt.format(DISPLAY_TIME_FORMAT).to_string(),
            None => millis.to_string(),
        }
    }

    /// Render the HTML for a single package
    pub fn render_app_item(&self, pkg: &PackageRecord) -> crate::Result<String> {
        let s = self.strings;
        let name = escape_html(&pkg.label);
        let package_name = escape_html(&pkg.package_name);
        let version_name = pkg
            .version_name
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| String::from("-"));
        let min_sdk = pkg
            .min_sdk
            .map(|it| it.to_string())
            .unwrap_or_else(|| String::from("-"));
        let icon = icon::data_uri(pkg.icon.as_ref())?;

        let mut html = String::with_capacity(1024 + icon.len());
        // Writing to a String can't fail
        _ = write!(
            html,
            r#"<div class="app-item"
data-install-time="{install}"
data-update-time="{update}"
data-app-name="{name}"
data-package-name="{package_name}"
data-is-system-app="{system}"
data-is-enabled="{enabled}"
data-default-order="{index}">
    <img src="{icon}" alt="{name}">
    <div class="app-details">
        <strong class="app-name">{name}</strong><br>
        <strong>{package_title}:</strong> {package_name}<br>
        <strong>{system_title}:</strong> {system}<br>
        <strong>{enabled_title}:</strong> {enabled}<br>
        <strong>{version_title}:</strong> {version_name} ({version_code})<br>
        <strong>{min_sdk_title}:</strong> {min_sdk}<br>
        <strong>{installed_at_title}:</strong> {installed_at}<br>
        <strong>{updated_at_title}:</strong> {updated_at}<br>
        <strong>{links_title}</strong> ({links_details}):<br>
        <a target="_blank" rel="noopener noreferrer" href="{play}">Play Market</a> |
        <a target="_blank" rel="noopener noreferrer" href="{fdroid}">F-Droid</a>
    </div>
</div>
"#,
            install = pkg.first_install_time,
            update = pkg.last_update_time,
            system = pkg.is_system,
            enabled = pkg.is_enabled,
            index = pkg.index,
            version_code = pkg.version_code,
            package_title = escape_html(s.label("package_title")),
            system_title = escape_html(s.label("system_title")),
            enabled_title = escape_html(s.label("enabled_title")),
            version_title = escape_html(s.label("version_title")),
            min_sdk_title = escape_html(s.label("min_sdk_version_title")),
            installed_at_title = escape_html(s.label("installed_at_title")),
            updated_at_title = escape_html(s.label("updated_at_title")),
            links_title = escape_html(s.label("links_title")),
            links_details = escape_html(s.label("links_title_details")),
            installed_at = self.format_millis(pkg.first_install_time),
            updated_at = self.format_millis(pkg.last_update_time),
            play = escape_html(&pkg.play_store_url()),
            fdroid = escape_html(&pkg.fdroid_url()),
        );
        Ok(html)
    }

    /// Filter the packages and render every one that is kept, counting as it
    /// goes. `on_progress` gets the number of packages looked at so far and
    /// the total.
    pub fn render_items(
        &self,
        packages: &[PackageRecord],
        launchable: &HashSet<String>,
        on_progress: &mut dyn FnMut(usize, usize),
    ) -> crate::Result<AppItems> {
        let mut items = AppItems::default();
        let total = packages.len();

        for (i, pkg) in packages.iter().enumerate() {
            if !is_included(pkg, launchable) {
                log::trace!("skipping background system package {}", pkg.package_name);
                items.counts.excluded += 1;
                on_progress(i + 1, total);
                continue;
            }

            items.html.push_str(&self.render_app_item(pkg)?);
            items.counts.total += 1;
            if pkg.is_system {
                items.counts.system += 1;
            }
            if pkg.is_enabled {
                items.counts.enabled += 1;
            }
            on_progress(i + 1, total);
        }

        log::debug!(
            "rendered {} apps, skipped {} system packages",
            items.counts.total,
            items.counts.excluded
        );
        Ok(items)
    }

    /// All placeholder values for a report over `items`
    pub fn placeholders(&self, items: &AppItems, meta: &ReportMeta<Tz>) -> Placeholders {
        let s = self.strings;
        let counts = &items.counts;
        let mut placeholders = Placeholders::new();

        placeholders
            .insert("APP_ITEMS_PLACEHOLDER", items.html.as_str())
            .insert(
                "BACKUP_TIME_PLACEHOLDER",
                meta.generated_at
                    .with_timezone(&self.tz)
                    .format(DISPLAY_TIME_FORMAT)
                    .to_string(),
            )
            .insert("TOTAL_APPS_COUNT_PLACEHOLDER", counts.total.to_string())
            .insert("USER_APPS_COUNT_PLACEHOLDER", counts.user().to_string())
            .insert("SYSTEM_APPS_COUNT_PLACEHOLDER", counts.system.to_string())
            .insert("ENABLED_APPS_COUNT_PLACEHOLDER", counts.enabled.to_string())
            .insert(
                "DISABLED_APPS_COUNT_PLACEHOLDER",
                counts.disabled().to_string(),
            );

        if let Some(trigger) = s.get(meta.trigger.label_key()) {
            placeholders.insert("TRIGGER_TYPE_PLACEHOLDER", escape_html(trigger));
        }

        if let Some(seconds) = s.get("seconds") {
            let duration = format!(
                "{:.3} {}",
                meta.duration.as_secs_f64(),
                escape_html(seconds)
            );
            placeholders.insert("BACKUP_DURATION_PLACEHOLDER", duration);
        }

        for (marker, key) in LOCALISATION_PLACEHOLDERS {
            if let Some(label) = s.get(key) {
                placeholders.insert(*marker, escape_html(label));
            }
        }

        placeholders
    }

    /// Put the rendered items into the template
    pub fn finish(&self, items: AppItems, meta: &ReportMeta<Tz>) -> Report {
        let placeholders = self.placeholders(&items, meta);
        Report {
            html: self.template.render(&placeholders),
            counts: items.counts,
            file_name: backup_file_name(&meta.generated_at.with_timezone(&self.tz)),
        }
    }

    /// [ReportGenerator::render_items] and [ReportGenerator::finish] in one go
    pub fn render(
        &self,
        packages: &[PackageRecord],
        launchable: &HashSet<String>,
        meta: &ReportMeta<Tz>,
    ) -> crate::Result<Report> {
        let items = self.render_items(packages, launchable, &mut |_, _| {})?;
        Ok(self.finish(items, meta))
    }
}
