use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn inbox(root: &Path, signer: Option<&str>) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("inbox"));
    cmd.current_dir(root)
        .env_remove("INBOX_ROOT")
        .env_remove("INBOX_SIGNER")
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(root.join("ledger"));
    if let Some(signer) = signer {
        cmd.args(["--signer", signer]);
    }
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let assert = cmd.arg("--json").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    serde_json::from_str(&stdout).expect("json")
}

fn publish_foo(root: &Path) {
    inbox(root, Some("0x1"))
        .args(["save", "--path", "/storage/foo", "--int-array", "3"])
        .assert()
        .success();
    inbox(root, Some("0x1"))
        .args(["link", "--path", "/public/foo", "--target", "/storage/foo", "--type", "&[Int]"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Capability<&[Int]>"));
    inbox(root, Some("0x1"))
        .args([
            "publish",
            "--capability-path",
            "/public/foo",
            "--type",
            "&[Int]",
            "--name",
            "foo",
            "--recipient",
            "0x2",
        ])
        .assert()
        .success();
}

#[test]
fn publish_then_claim_across_invocations() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();
    publish_foo(root);

    let json = json_output(inbox(root, Some("0x3")).args([
        "claim", "--name", "foo", "--provider", "0x1", "--type", "&[Int]",
    ]));
    assert!(json["data"].is_null(), "stranger must not see the entry");
    assert_eq!(json["meta"]["writes"], 0);

    inbox(root, Some("0x2"))
        .args(["claim", "--name", "foo", "--provider", "0x1", "--type", "&[String]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "failed to force-cast value: expected type `Capability<&[String]>`, got `Capability<&[Int]>`",
        ));

    let json = json_output(inbox(root, Some("0x2")).args([
        "claim", "--name", "foo", "--provider", "0x1", "--type", "&[Int]",
    ]));
    assert_eq!(json["data"]["value"], "[3]");
    assert_eq!(
        json["data"]["capability"],
        "Capability<&[Int]>(address: 0x0000000000000001, path: /public/foo)"
    );

    let json = json_output(inbox(root, None).arg("events"));
    let ids: Vec<_> = json["data"]
        .as_array()
        .expect("event list")
        .iter()
        .map(|event| event["id"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(ids, vec!["flow.InboxValuePublished", "flow.InboxValueClaimed"]);
}

#[test]
fn unpublish_withdraws_the_entry() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();
    publish_foo(root);

    let json = json_output(
        inbox(root, Some("0x1")).args(["unpublish", "--name", "foo", "--type", "&[Int]"]),
    );
    assert_eq!(
        json["data"]["capability"],
        "Capability<&[Int]>(address: 0x0000000000000001, path: /public/foo)"
    );

    let json = json_output(
        inbox(root, Some("0x1")).args(["unpublish", "--name", "foo", "--type", "&[Int]"]),
    );
    assert!(json["data"]["capability"].is_null());
    assert!(json["warnings"][0]
        .as_str()
        .unwrap_or_default()
        .contains("nothing published under 'foo'"));

    inbox(root, None)
        .arg("events")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "flow.InboxValueUnpublished(provider: 0x0000000000000001, name: \"foo\")",
        ));
}

#[test]
fn signer_comes_from_env() {
    let tmp = TempDir::new().expect("tmpdir");
    let root = tmp.path();

    inbox(root, None)
        .args(["save", "--path", "/storage/foo", "--int", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no signer"));

    inbox(root, None)
        .env("INBOX_SIGNER", "0x1")
        .args(["save", "--path", "/storage/foo", "--int", "7"])
        .assert()
        .success();

    inbox(root, Some("0x1"))
        .args(["save", "--path", "/storage/foo", "--int", "8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already stores an object"));
}
