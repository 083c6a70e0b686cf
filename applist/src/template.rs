//! Report templates and placeholder substitution.
//!
//! A placeholder is an HTML comment holding only its name, `<!-- NAME -->`.
//! Substitution replaces each marker whose name is known with its value and
//! leaves every other marker untouched.

use std::collections::HashMap;
use std::path::Path;

use crate::utils::read_file;

const MARKER_OPEN: &str = "<!-- ";
const MARKER_CLOSE: &str = " -->";

const BUILTIN_TEMPLATE: &str = include_str!("../templates/template.html");

/// Every template needs somewhere to put the apps
const REQUIRED_PLACEHOLDER: &str = "APP_ITEMS_PLACEHOLDER";

/// Returns the marker text for the placeholder `name`
pub fn marker(name: &str) -> String {
    format!("{MARKER_OPEN}{name}{MARKER_CLOSE}")
}

fn is_marker_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Values for named placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    values: HashMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Placeholders {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Replace every known `<!-- NAME -->` marker in `template` with its value.
///
/// The template is scanned once from left to right and substituted values are
/// never scanned again. Markers with no value are copied verbatim.
pub fn substitute(template: &str, placeholders: &Placeholders) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(MARKER_OPEN) {
        let after_open = &rest[start + MARKER_OPEN.len()..];
        let Some(end) = after_open.find(MARKER_CLOSE) else {
            break;
        };
        let name = &after_open[..end];
        match placeholders.get(name) {
            Some(value) if is_marker_name(name) => {
                out.push_str(&rest[..start]);
                out.push_str(value);
                rest = &after_open[end + MARKER_CLOSE.len()..];
            }
            _ => {
                // Not ours, keep the opening and look for a marker after it
                out.push_str(&rest[..start + MARKER_OPEN.len()]);
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Names of all placeholder markers in `text`, in order of appearance
pub fn marker_names(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(MARKER_OPEN) {
        let after_open = &rest[start + MARKER_OPEN.len()..];
        let Some(end) = after_open.find(MARKER_CLOSE) else {
            break;
        };
        let name = &after_open[..end];
        if is_marker_name(name) {
            names.push(name);
            rest = &after_open[end + MARKER_CLOSE.len()..];
        } else {
            rest = after_open;
        }
    }
    names
}

/// The HTML document a report is rendered into
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
}

impl Template {
    /// The template compiled into the binary
    pub fn builtin() -> Self {
        Self {
            source: BUILTIN_TEMPLATE.into(),
        }
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        log::debug!("loading report template from {:?}", path);
        let source = read_file(path)?;
        if !marker_names(&source).contains(&REQUIRED_PLACEHOLDER) {
            return Err(crate::Error::Template(
                path.to_string_lossy().into(),
                format!("no {} marker", marker(REQUIRED_PLACEHOLDER)),
            ));
        }
        Ok(Self { source })
    }

    pub fn from_source<S: Into<String>>(source: S) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, placeholders: &Placeholders) -> String {
        let rendered = substitute(&self.source, placeholders);
        if log::log_enabled!(log::Level::Debug) {
            for name in marker_names(&rendered) {
                log::debug!("placeholder {} left unresolved", name);
            }
        }
        rendered
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_context, TestContext};
    use rstest::*;

    #[rstest]
    #[case("<p><!-- TOTAL_APPS_COUNT_PLACEHOLDER --></p>", "<p>42</p>")]
    #[case(
        "<!-- TOTAL_APPS_COUNT_PLACEHOLDER -->/<!-- TOTAL_APPS_COUNT_PLACEHOLDER -->",
        "42/42"
    )]
    #[case("<!-- MISSING_PLACEHOLDER -->", "<!-- MISSING_PLACEHOLDER -->")]
    #[case("<!-- a real comment --><!-- USER_APPS_COUNT_PLACEHOLDER -->", "<!-- a real comment -->40")]
    #[case("<!--TOTAL_APPS_COUNT_PLACEHOLDER-->", "<!--TOTAL_APPS_COUNT_PLACEHOLDER-->")]
    #[case("unterminated <!-- TOTAL_APPS_COUNT_PLACEHOLDER", "unterminated <!-- TOTAL_APPS_COUNT_PLACEHOLDER")]
    #[case("<!-- <!-- USER_APPS_COUNT_PLACEHOLDER -->", "<!-- 40")]
    fn test_substitute(#[case] template: &str, #[case] expected: &str) {
        let placeholders: Placeholders = [
            ("TOTAL_APPS_COUNT_PLACEHOLDER", "42"),
            ("USER_APPS_COUNT_PLACEHOLDER", "40"),
        ]
        .into_iter()
        .collect();
        assert_eq!(substitute(template, &placeholders), expected);
    }

    #[test]
    fn test_substitute_is_idempotent() {
        let template = "<h1><!-- A_PLACEHOLDER --></h1><!-- B_PLACEHOLDER --><i><!-- C --></i>";
        let placeholders: Placeholders =
            [("A_PLACEHOLDER", "alpha"), ("B_PLACEHOLDER", "<b>beta</b>")]
                .into_iter()
                .collect();
        let once = substitute(template, &placeholders);
        let twice = substitute(&once, &placeholders);
        assert_eq!(once, "<h1>alpha</h1><b>beta</b><i><!-- C --></i>");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let placeholders: Placeholders = [
            ("A_PLACEHOLDER", "<!-- B_PLACEHOLDER -->"),
            ("B_PLACEHOLDER", "b"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            substitute("<!-- A_PLACEHOLDER -->", &placeholders),
            "<!-- B_PLACEHOLDER -->"
        );
    }

    #[test]
    fn test_marker_names() {
        let text = "<!-- A --> <!-- not one --> <!-- B_2 --><!-- A -->";
        assert_eq!(marker_names(text), vec!["A", "B_2", "A"]);
        assert_eq!(marker("X_PLACEHOLDER"), "<!-- X_PLACEHOLDER -->");
    }

    #[rstest]
    fn test_load_requires_app_items(tmp_context: TestContext) {
        let good = tmp_context
            .new_tmp_file("<body><!-- APP_ITEMS_PLACEHOLDER --></body>")
            .unwrap();
        assert!(Template::load(&good).is_ok());

        let bad = tmp_context.new_tmp_file("<body></body>").unwrap();
        assert!(matches!(
            Template::load(&bad),
            Err(crate::Error::Template(_, _))
        ));
        assert!(matches!(
            Template::load(&tmp_context.to_abs("missing.html")),
            Err(crate::Error::MissingFile(_))
        ));
    }

    #[test]
    fn test_builtin_template_has_markers() {
        let template = Template::builtin();
        let names = marker_names(template.source());
        for required in [
            "APP_ITEMS_PLACEHOLDER",
            "BACKUP_TIME_PLACEHOLDER",
            "TRIGGER_TYPE_PLACEHOLDER",
            "TOTAL_APPS_COUNT_PLACEHOLDER",
            "USER_APPS_COUNT_PLACEHOLDER",
            "SYSTEM_APPS_COUNT_PLACEHOLDER",
            "ENABLED_APPS_COUNT_PLACEHOLDER",
            "DISABLED_APPS_COUNT_PLACEHOLDER",
            "BACKUP_DURATION_PLACEHOLDER",
            "LOCALISATION_SEARCH_PLACEHOLDER",
        ] {
            assert!(names.contains(&required), "missing {}", required);
        }
    }
}
