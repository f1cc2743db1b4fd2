//! Command line handling of the relay binary

use std::process::{Command, Stdio};

fn run(args: &[&str]) -> (bool, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_ptyspawn"))
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to run ptyspawn");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn test_request_rejects_mode_and_command_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("request.json");
    std::fs::write(&path, r#"{ "command": ["/bin/true"] }"#).unwrap();
    let path = path.to_str().unwrap();

    for extra in [
        &["--no-echo"][..],
        &["--raw"],
        &["--clear-env"],
        &["--", "/bin/echo", "hi"],
        &["/bin/echo"],
    ] {
        let mut args = vec!["--request", path];
        args.extend_from_slice(extra);
        let (ok, stderr) = run(&args);
        assert!(!ok, "{:?} was accepted", extra);
        assert!(
            stderr.contains("cannot be combined"),
            "Unexpected stderr for {:?}: {:?}",
            extra,
            stderr
        );
    }
}

#[test]
fn test_unknown_option_fails() {
    let (ok, stderr) = run(&["--bogus"]);
    assert!(!ok);
    assert!(stderr.contains("Unknown option"), "Unexpected stderr: {:?}", stderr);
}
