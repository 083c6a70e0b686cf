use std::collections::HashSet;

use mockall::mock;

use crate::package::PackageRecord;

mock! {
    pub PackageSource {

    }

    impl crate::source::PackageSource for PackageSource {
        fn installed_packages(&self) -> crate::Result<Vec<PackageRecord>>;
        fn launchable_packages(&self) -> crate::Result<HashSet<String>>;
    }
}

/// A source that always reports the given packages
pub fn mock_source(packages: Vec<PackageRecord>, launchable: HashSet<String>) -> MockPackageSource {
    let mut source = MockPackageSource::new();
    source
        .expect_installed_packages()
        .returning(move || Ok(packages.clone()));
    source
        .expect_launchable_packages()
        .returning(move || Ok(launchable.clone()));
    source
}

pub fn system_package(name: &str, index: usize) -> PackageRecord {
    let mut pkg = PackageRecord::new(name, index);
    pkg.is_system = true;
    pkg
}

/// `user` user apps, `launchable` system apps with a launcher entry and
/// `background` system packages without one, in that order
pub fn package_set(
    user: usize,
    launchable: usize,
    background: usize,
) -> (Vec<PackageRecord>, HashSet<String>) {
    let mut packages = Vec::with_capacity(user + launchable + background);
    let mut launcher = HashSet::new();

    for i in 0..user {
        let mut pkg = PackageRecord::new(&format!("com.example.user{}", i), packages.len());
        pkg.label = format!("User App {}", i);
        pkg.version_name = Some(format!("1.{}", i));
        pkg.version_code = i as i64 + 1;
        launcher.insert(pkg.package_name.clone());
        packages.push(pkg);
    }
    for i in 0..launchable {
        let pkg = system_package(&format!("com.android.app{}", i), packages.len());
        launcher.insert(pkg.package_name.clone());
        packages.push(pkg);
    }
    for i in 0..background {
        packages.push(system_package(
            &format!("com.android.service{}", i),
            packages.len(),
        ));
    }

    (packages, launcher)
}
