use std::process::Command;

fn git_short_sha(repo_root: &str) -> Option<String> {
    let out = Command::new("git")
        .args(["-C", repo_root, "rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let repo_root = format!("{}/..", manifest_dir);
    let version = env!("CARGO_PKG_VERSION");

    let build_version = match git_short_sha(&repo_root) {
        Some(sha) => format!("{version} ({sha})"),
        None => version.to_string(),
    };

    println!("cargo:rerun-if-changed={}/.git/HEAD", repo_root);
    println!("cargo:rustc-env=LOOT_BUILD_VERSION={}", build_version);
}
