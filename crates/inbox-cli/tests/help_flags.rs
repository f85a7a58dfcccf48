#[test]
fn help_lists_subcommands_and_global_flags() {
    let output = std::process::Command::new(assert_cmd::cargo::cargo_bin!("inbox"))
        .arg("--help")
        .output()
        .expect("run help");
    assert!(output.status.success(), "--help should succeed");
    let text = String::from_utf8_lossy(&output.stdout);

    for needle in [
        "--root", "--signer", "--pretty", "publish", "unpublish", "claim", "events",
    ] {
        assert!(
            text.contains(needle),
            "help output should contain '{needle}'"
        );
    }
}
