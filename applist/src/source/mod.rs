//! Where package records come from.

use std::collections::HashSet;

use crate::package::PackageRecord;

mod adb;
pub use adb::*;

mod apk;
pub use apk::*;

mod json;
pub use json::*;

/// Lists the packages installed on a device
pub trait PackageSource: Send + Sync {
    /// Every installed package in enumeration order with `index` set
    fn installed_packages(&self) -> crate::Result<Vec<PackageRecord>>;

    /// Ids of the packages that show up in the launcher
    fn launchable_packages(&self) -> crate::Result<HashSet<String>>;
}

impl<T: PackageSource + ?Sized> PackageSource for Box<T> {
    fn installed_packages(&self) -> crate::Result<Vec<PackageRecord>> {
        (**self).installed_packages()
    }

    fn launchable_packages(&self) -> crate::Result<HashSet<String>> {
        (**self).launchable_packages()
    }
}
