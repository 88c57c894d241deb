use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=PROMCLI_GIT_REVISION");
    println!("cargo:rerun-if-env-changed=PROMCLI_BUILD_TIME");
    println!("cargo:rerun-if-changed=.git/HEAD");

    let revision = std::env::var("PROMCLI_GIT_REVISION")
        .ok()
        .or_else(git_revision)
        .unwrap_or_else(|| "unknown".to_string());
    let build_time = std::env::var("PROMCLI_BUILD_TIME")
        .unwrap_or_else(|_| chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());

    println!("cargo:rustc-env=PROMCLI_GIT_REVISION={}", revision);
    println!("cargo:rustc-env=PROMCLI_BUILD_TIME={}", build_time);
}

fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if rev.is_empty() {
        None
    } else {
        Some(rev)
    }
}
