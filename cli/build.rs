use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

const REVISION_ENV: &str = "APPLIST_GIT_REVISION";

fn main() {
    println!("cargo:rerun-if-env-changed={}", REVISION_ENV);
    if let Err(e) = write_version_files() {
        panic!("failed to write version files: {:?}", e);
    }
}

fn out_dir() -> PathBuf {
    PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"))
}

fn write_version_files() -> io::Result<()> {
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into());
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".into());
    let rev = git_rev().unwrap_or_else(|| "unknown".into());

    let out = out_dir();
    fs::write(out.join("simple_version_string"), format!("{:?}", version))?;
    fs::write(
        out.join("version_string"),
        format!("{:?}", format!("{} ({})\nrev {}", version, target, rev)),
    )?;
    Ok(())
}

/// The revision from the environment if set, otherwise from git
fn git_rev() -> Option<String> {
    if let Ok(rev) = env::var(REVISION_ENV) {
        return Some(rev.trim().into());
    }
    let out = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let rev = String::from_utf8(out.stdout).ok()?;
    let rev = rev.trim();
    (!rev.is_empty()).then(|| rev.into())
}
