use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::tempdir;

const SHARD: &str = r#"{"id":1,"type":"vertex","label":"document","uri":"file:///ci/build/src/a.cs","languageId":"csharp"}
{"id":2,"type":"vertex","label":"range","start":{"line":0,"character":0},"end":{"line":0,"character":1}}
{"id":3,"type":"edge","label":"contains","outV":1,"inVs":[2]}
"#;

fn lsif_debug_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_lsif-debug"))
}

fn run(args: &[&str], cwd: &Path) -> Output {
    Command::new(lsif_debug_bin())
        .args(args)
        .current_dir(cwd)
        .env_remove("RUST_LOG")
        .output()
        .expect("run lsif-debug")
}

#[test]
fn flatten_writes_normalized_file_next_to_input() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dump.lsif"), SHARD).unwrap();

    let out = run(&["flatten", "dump.lsif", "--strip-ids"], dir.path());
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let normalized = fs::read_to_string(dir.path().join("dump.lsif.normalized.lsif")).unwrap();
    assert_eq!(normalized.lines().count(), 3);
    assert!(normalized.contains(r#""flattenedUri":"file:///ci/build/src/a.cs""#));
    assert!(normalized.contains(r#""id":"ID""#));
}

#[test]
fn flatten_of_broken_dump_exits_non_zero() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("broken.lsif"),
        r#"{"id":1,"type":"edge","label":"contains","outV":4,"inVs":[5]}"#,
    )
    .unwrap();

    let out = run(&["flatten", "broken.lsif"], dir.path());
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Errors"));
}

#[test]
fn link_directory_writes_sibling_linked_file() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("checkout/src");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.cs"), "class A {}").unwrap();

    let shards = dir.path().join("shards");
    fs::create_dir_all(&shards).unwrap();
    fs::write(shards.join("one.lsif"), SHARD).unwrap();
    fs::write(shards.join("two.lsif"), SHARD).unwrap();

    let out = run(
        &["link", "shards", source.to_str().unwrap()],
        dir.path(),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let linked = fs::read_to_string(dir.path().join("shards.linked.lsif")).unwrap();
    let lines: Vec<&str> = linked.lines().collect();
    assert_eq!(lines.len(), 2 + 3 + 3);
    assert!(lines[0].contains(r#""label":"metaData""#));
    assert!(lines[5].contains(r#""id":4"#));
    assert!(!linked.contains("file:///ci/build"));
}

#[test]
fn link_with_a_bad_shard_still_writes_output_but_fails() {
    let dir = tempdir().unwrap();
    let shards = dir.path().join("shards");
    fs::create_dir_all(&shards).unwrap();
    fs::write(shards.join("a.lsif"), SHARD).unwrap();
    fs::write(shards.join("b.lsif"), "{ nope").unwrap();

    let out = run(&["link", "shards", "."], dir.path());
    assert!(!out.status.success());
    assert!(dir.path().join("shards.linked.lsif").is_file());
}

#[test]
fn visualize_without_linked_files_fails() {
    let dir = tempdir().unwrap();
    let out = run(&["visualize", "."], dir.path());
    assert!(!out.status.success());
}
