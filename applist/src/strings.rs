use std::collections::HashMap;
use std::path::Path;

use crate::config::parse_config;

/// Built in English labels
const DEFAULTS: &[(&str, &str)] = &[
    // Per app details
    ("package_title", "Package"),
    ("system_title", "System"),
    ("enabled_title", "Enabled"),
    ("version_title", "Version"),
    ("min_sdk_version_title", "Min SDK"),
    ("installed_at_title", "Installed at"),
    ("updated_at_title", "Updated at"),
    ("links_title", "Links"),
    ("links_title_details", "may not exist"),
    // Report header
    ("automatic", "Automatic"),
    ("manual", "Manual"),
    ("seconds", "seconds"),
    ("created_at", "Created at"),
    ("trigger_type", "Trigger type"),
    ("total_apps_count", "Total apps"),
    ("user_apps_count", "User apps"),
    ("system_apps_count", "System apps"),
    ("enabled_apps_count", "Enabled apps"),
    ("disabled_apps_count", "Disabled apps"),
    ("installed_apps_count", "Installed apps"),
    ("uninstalled_apps_count", "Uninstalled apps"),
    ("backup_duration", "Backup duration"),
    // Search, sort, and filter controls
    ("search_placeholder", "Search by name or package"),
    ("sort_options", "Sort"),
    ("filter_options", "Filter"),
    ("no_items_placeholder", "No apps match"),
    ("sorting", "Sorting"),
    ("sort_by_default", "Default"),
    ("sort_by_install_time", "Install time"),
    ("sort_by_update_time", "Update time"),
    ("sort_by_app_name", "App name"),
    ("sort_by_package_name", "Package name"),
    ("order", "Order"),
    ("order_ascending", "Ascending"),
    ("order_descending", "Descending"),
    ("close", "Close"),
    ("apps_filtering", "Apps filtering"),
    ("include_user_apps", "Include user apps"),
    ("include_system_apps", "Include system apps"),
    ("include_enabled_apps", "Include enabled apps"),
    ("include_disabled_apps", "Include disabled apps"),
    ("include_installed_apps", "Include installed apps"),
    ("apply_filters_button", "Apply"),
    // Status messages
    ("backup_started", "Backup started"),
    ("in_progress", "In progress"),
    ("backup_done_title", "{0} apps backed up ({1})"),
    ("backup_done_text", "{0} user apps, {1} system apps"),
    ("backup_failed", "Backup failed"),
    (
        "destination_not_set_notification",
        "Backup destination is not set",
    ),
    ("file_create_failed", "Failed to create the backup file"),
];

/// Template placeholders that take a localized label, paired with the label key
pub const LOCALISATION_PLACEHOLDERS: &[(&str, &str)] = &[
    ("LOCALISATION_CREATED_AT", "created_at"),
    ("LOCALISATION_TRIGGER_TYPE", "trigger_type"),
    ("LOCALISATION_TOTAL_APPS_COUNT", "total_apps_count"),
    ("LOCALISATION_USER_APPS_COUNT", "user_apps_count"),
    ("LOCALISATION_SYSTEM_APPS_COUNT", "system_apps_count"),
    ("LOCALISATION_ENABLED_APPS_COUNT", "enabled_apps_count"),
    ("LOCALISATION_DISABLED_APPS_COUNT", "disabled_apps_count"),
    ("LOCALISATION_INSTALLED_APPS_COUNT", "installed_apps_count"),
    ("LOCALISATION_UNINSTALLED_APPS_COUNT", "uninstalled_apps_count"),
    ("LOCALISATION_SEARCH_PLACEHOLDER", "search_placeholder"),
    ("LOCALISATION_SORT_OPTIONS", "sort_options"),
    ("LOCALISATION_FILTER_OPTIONS", "filter_options"),
    ("LOCALISATION_NO_ITEMS_PLACEHOLDER", "no_items_placeholder"),
    ("LOCALISATION_SORTING", "sorting"),
    ("LOCALISATION_SORT_BY_DEFAULT", "sort_by_default"),
    ("LOCALISATION_SORT_BY_INSTALL_TIME", "sort_by_install_time"),
    ("LOCALISATION_SORT_BY_UPDATE_TIME", "sort_by_update_time"),
    ("LOCALISATION_SORT_BY_APP_NAME", "sort_by_app_name"),
    ("LOCALISATION_SORT_BY_PACKAGE_NAME", "sort_by_package_name"),
    ("LOCALISATION_ORDER", "order"),
    ("LOCALISATION_ORDER_ASCENDING", "order_ascending"),
    ("LOCALISATION_ORDER_DESCENDING", "order_descending"),
    ("LOCALISATION_CLOSE_BUTTON", "close"),
    ("LOCALISATION_APPS_FILTERING", "apps_filtering"),
    ("LOCALISATION_INCLUDE_USER_APPS", "include_user_apps"),
    ("LOCALISATION_INCLUDE_SYSTEM_APPS", "include_system_apps"),
    ("LOCALISATION_INCLUDE_ENABLED_APPS", "include_enabled_apps"),
    ("LOCALISATION_INCLUDE_DISABLED_APPS", "include_disabled_apps"),
    ("LOCALISATION_INCLUDE_INSTALLED_APPS", "include_installed_apps"),
    ("LOCALISATION_APPLY_FILTERS_BUTTON", "apply_filters_button"),
    ("LOCALISATION_BACKUP_DURATION", "backup_duration"),
];

/// Lookup table from label keys to display strings.
///
/// Overrides take precedence over the built in English defaults.
#[derive(Debug, Clone)]
pub struct Strings {
    overrides: HashMap<String, String>,
    use_defaults: bool,
}

impl Default for Strings {
    fn default() -> Self {
        Self::new()
    }
}

impl Strings {
    /// Only the built in defaults
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            use_defaults: true,
        }
    }

    /// A table holding only the given entries, without any defaults
    pub fn from_entries<K: Into<String>, V: Into<String>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            overrides: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            use_defaults: false,
        }
    }

    /// Load overrides from the `[strings]` table of a TOML file
    ///
    /// ```toml
    /// [strings]
    /// package_title = "Paket"
    /// ```
    pub fn load(path: &Path) -> crate::Result<Self> {
        log::debug!("loading labels from {:?}", path);
        let overrides = parse_config(path, |cfg| {
            let strings = cfg.must_get_map("strings")?;
            Ok(strings
                .str_entries()?
                .into_iter()
                .map(|(k, v)| (String::from(k), String::from(v)))
                .collect::<HashMap<String, String>>())
        })?;
        Ok(Self {
            overrides,
            use_defaults: true,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.overrides.get(key) {
            return Some(v.as_str());
        }
        if !self.use_defaults {
            return None;
        }
        DEFAULTS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// Like [Strings::get] but falls back to the key itself
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    /// Fills `{0}`, `{1}`, ... in the label with the given arguments
    pub fn format(&self, key: &str, args: &[&str]) -> String {
        let mut formatted = String::from(self.label(key));
        for (i, arg) in args.iter().enumerate() {
            formatted = formatted.replace(&format!("{{{}}}", i), arg);
        }
        formatted
    }
}
