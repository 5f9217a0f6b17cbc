use std::process::Command;

fn main() {
    for (var, exported) in [
        ("TARGET", "PACERLINK_BUILD_TARGET"),
        ("PROFILE", "PACERLINK_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }

    // Release builds from CI pass GIT_HASH explicitly; local builds ask git.
    let hash = std::env::var("GIT_HASH").ok().or_else(|| {
        let output = Command::new("git")
            .args(["rev-parse", "--short=12", "HEAD"])
            .output()
            .ok()?;
        let hash = String::from_utf8(output.stdout).ok()?;
        let hash = hash.trim();
        (output.status.success() && !hash.is_empty()).then(|| hash.to_string())
    });
    if let Some(hash) = hash {
        println!("cargo:rustc-env=PACERLINK_GIT_HASH={hash}");
    }
    println!("cargo:rerun-if-env-changed=GIT_HASH");
}
