use std::{fs, path::Path, process::Command};

const APP: &str = r#"{
    "package": "app",
    "declarations": [
        {"name": "answer", "kind": "property", "type": "Int", "initializer": {"expr": "const", "value": 42}},
        {"name": "main", "kind": "function", "return_type": "Int", "body": [
            {"stmt": "return", "value": {"expr": "call", "callee": "answer"}}
        ]}
    ]
}"#;

const BROKEN: &str = r#"{
    "package": "app",
    "declarations": [
        {"name": "main", "kind": "function", "return_type": "Int", "body": [
            {"stmt": "return", "value": {"expr": "call", "callee": "missing"}}
        ]}
    ]
}"#;

fn project(source: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("app.json"), source).expect("Failed to write source");
    fs::write(
        dir.path().join("kiln.toml"),
        "sources = [\"app.json\"]\noutput-dir = \"out\"\n",
    )
    .expect("Failed to write kiln.toml");
    dir
}

fn kiln(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_kiln"))
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run kiln")
}

#[test]
fn test_compile_writes_listing() {
    let dir = project(APP);

    let output = kiln(dir.path(), &["compile"]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("✓ compiled main (bytecode)"));
    let listing = fs::read_to_string(dir.path().join("out").join("main.kbc")).expect("listing");
    assert!(listing.starts_with("module main\n"));
}

#[test]
fn test_compile_module_target_from_flag() {
    let dir = project(APP);

    let output = kiln(dir.path(), &["compile", "--target", "module", "--module-name", "app"]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("out").join("app.klib").exists());
}

#[test]
fn test_check_reports_errors_with_exit_code() {
    let dir = project(BROKEN);

    let output = kiln(dir.path(), &["check"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unresolved reference: missing"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_check_valid_program() {
    let dir = project(APP);

    let output = kiln(dir.path(), &["check"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ kiln.toml is valid"), "{stdout}");
}

#[test]
fn test_phases_lists_tree() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let output = kiln(dir.path(), &["phases", "--disable-phases", "const-folding"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Lowering phases (bytecode)\n"), "{stdout}");
    assert!(stdout.contains("const-folding (Disabled)"), "{stdout}");
}

#[test]
fn test_missing_explicit_config() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let output = kiln(dir.path(), &["compile", "--config", "elsewhere.toml"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("elsewhere.toml"));
}
