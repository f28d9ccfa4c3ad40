// build.rs
use std::process::Command;

fn git_output(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let git_commit = git_output(&["rev-parse", "--short", "HEAD"]);
    let build_date = git_output(&["log", "-1", "--format=%cs"]);

    println!("cargo:rustc-env=QSOPS_GIT_COMMIT={}", git_commit);
    println!("cargo:rustc-env=QSOPS_BUILD_DATE={}", build_date);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");
}
