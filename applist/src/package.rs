use std::fmt;

use serde::{Deserialize, Serialize};

/// Raster source for a package's launcher icon
#[derive(Clone, PartialEq, Eq)]
pub enum Icon {
    /// An already encoded image (PNG, WebP)
    Encoded(Vec<u8>),

    /// Raw 32 bit pixels in `0xAARRGGBB` order, row major
    Argb {
        width: u32,
        height: u32,
        pixels: Vec<u32>,
    },

    /// Encoded layers drawn bottom to top on a transparent canvas of the given
    /// intrinsic size, this is what adaptive icons turn into
    Layered {
        width: u32,
        height: u32,
        layers: Vec<Vec<u8>>,
    },
}

impl fmt::Debug for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoded(data) => write!(f, "Encoded({} bytes)", data.len()),
            Self::Argb { width, height, .. } => write!(f, "Argb({}x{})", width, height),
            Self::Layered {
                width,
                height,
                layers,
            } => write!(f, "Layered({}x{}, {} layers)", width, height, layers.len()),
        }
    }
}

/// A snapshot of one installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub package_name: String,
    /// Display name, the package name if no label is known
    pub label: String,
    #[serde(skip)]
    pub icon: Option<Icon>,
    /// Pre-installed or an update to a pre-installed package
    pub is_system: bool,
    pub is_enabled: bool,
    pub version_name: Option<String>,
    pub version_code: i64,
    pub min_sdk: Option<u32>,
    /// Epoch millis
    pub first_install_time: i64,
    /// Epoch millis
    pub last_update_time: i64,
    /// Position in the platform's enumeration order
    pub index: usize,
}

impl PackageRecord {
    /// Creates an enabled user package with no metadata beyond its name
    pub fn new(package_name: &str, index: usize) -> Self {
        Self {
            package_name: package_name.into(),
            label: package_name.into(),
            icon: None,
            is_system: false,
            is_enabled: true,
            version_name: None,
            version_code: 0,
            min_sdk: None,
            first_install_time: 0,
            last_update_time: 0,
            index,
        }
    }

    pub fn play_store_url(&self) -> String {
        format!(
            "https://play.google.com/store/apps/details?id={}",
            self.package_name
        )
    }

    pub fn fdroid_url(&self) -> String {
        format!("https://f-droid.org/packages/{}", self.package_name)
    }
}

impl fmt::Display for PackageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.package_name)
    }
}
