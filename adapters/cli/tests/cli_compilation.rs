use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "breach-algo"])
        .status()
        .expect("failed to invoke cargo check for breach-algo binary");

    assert!(status.success(), "cargo check --bin breach-algo should succeed");
}

#[test]
fn built_in_profiles_print_as_toml() {
    let output = Command::new(env!("CARGO_BIN_EXE_breach-algo"))
        .args(["--strategy", "viral", "--print-profile"])
        .output()
        .expect("failed to run breach-algo");

    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("profile is utf-8");
    assert!(text.contains("name = \"viral\""), "unexpected profile dump: {text}");
}
