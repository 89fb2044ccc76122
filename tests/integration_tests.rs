//! Integration tests for the complete lsif-debug pipeline
//!
//! These tests drive the library the way the CLI does:
//! - shard directory → link → `.linked.lsif` on disk
//! - linked dump → flatten → `.normalized.lsif` on disk
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::path::Path;

use lsif_debug_core::files::read_text;
use lsif_debug_core::{
    flatten_text, linked_output_path, normalized_output_path, resolve_lsif_files, write_lines,
    FlattenOptions, Graph, LinkOptions, Linker, LsifFileKind, Shard,
};
use serde_json::Value;
use tempfile::tempdir;

const LIB_SHARD: &str = r#"{"id":1,"type":"vertex","label":"project","kind":"csharp","resource":"file:///agent/_work/7/s/lib/lib.csproj","name":"lib"}
{"id":2,"type":"vertex","label":"$event","kind":"begin","scope":"project","data":1}
{"id":3,"type":"vertex","label":"document","uri":"file:///agent/_work/7/s/lib/Greeter.cs","languageId":"csharp"}
{"id":4,"type":"vertex","label":"$event","kind":"begin","scope":"document","data":3}
{"id":5,"type":"vertex","label":"range","start":{"line":0,"character":13},"end":{"line":0,"character":20}}
{"id":6,"type":"vertex","label":"resultSet"}
{"id":7,"type":"edge","label":"next","outV":5,"inV":6}
{"id":8,"type":"vertex","label":"definitionResult"}
{"id":9,"type":"edge","label":"textDocument/definition","outV":6,"inV":8}
{"id":10,"type":"edge","label":"item","outV":8,"inVs":[5],"shard":3}
{"id":11,"type":"edge","label":"contains","outV":3,"inVs":[5]}
{"id":12,"type":"vertex","label":"$event","kind":"end","scope":"document","data":3}
{"id":13,"type":"vertex","label":"$event","kind":"end","scope":"project","data":1}
"#;

const APP_SHARD: &str = r#"{"type":"vertex","label":"metaData","version":"0.4.3","positionEncoding":"utf-16"}
{"id":1,"type":"vertex","label":"project","kind":"csharp","resource":"file:///agent/_work/7/s/app/app.csproj","name":"app"}
{"id":2,"type":"vertex","label":"document","uri":"file:///agent/_work/7/s/app/Program.cs","languageId":"csharp"}
{"id":3,"type":"vertex","label":"range","start":{"line":4,"character":8},"end":{"line":4,"character":15}}
{"id":4,"type":"edge","label":"contains","outV":2,"inVs":[3]}
"#;

fn write_checkout(root: &Path) {
    fs::create_dir_all(root.join("lib")).unwrap();
    fs::create_dir_all(root.join("app")).unwrap();
    fs::write(root.join("lib/lib.csproj"), "<Project />").unwrap();
    fs::write(root.join("lib/Greeter.cs"), "public class Greeter {}").unwrap();
    fs::write(root.join("app/app.csproj"), "<Project />").unwrap();
    fs::write(root.join("app/Program.cs"), "Greeter g;").unwrap();
}

#[test]
fn test_link_directory_then_flatten_linked_dump() {
    let dir = tempdir().unwrap();
    let checkout = dir.path().join("repo");
    write_checkout(&checkout);

    let shards_dir = dir.path().join("shards");
    fs::create_dir_all(&shards_dir).unwrap();
    fs::write(shards_dir.join("1-lib.lsif"), LIB_SHARD).unwrap();
    fs::write(shards_dir.join("2-app.lsif"), APP_SHARD).unwrap();

    // Link every shard in sorted order.
    let inputs = resolve_lsif_files(&shards_dir, LsifFileKind::Shard).unwrap();
    assert_eq!(inputs.len(), 2);
    let shards: Vec<Shard> = inputs.iter().map(|p| Shard::read(p).unwrap()).collect();

    let output = Linker::new(&checkout, LinkOptions::default())
        .unwrap()
        .link(&shards);
    assert!(output.succeeded());
    assert_eq!(output.shards[1].id_offset, 14);

    let linked_path = linked_output_path(&shards_dir);
    assert_eq!(linked_path, dir.path().join("shards.linked.lsif"));
    write_lines(&linked_path, &output.to_lines().unwrap()).unwrap();

    // A second directory walk must not pick the generated file up as a shard.
    assert_eq!(
        resolve_lsif_files(dir.path(), LsifFileKind::Shard).unwrap().len(),
        2
    );

    // Flatten the linked dump.
    let text = read_text(&linked_path).unwrap();
    let flattened = flatten_text(&text, &FlattenOptions::default()).unwrap();
    assert!(flattened.diagnostics.is_empty());
    assert_eq!(flattened.remaining_active_documents, 0);

    let normalized_path = normalized_output_path(&linked_path);
    write_lines(&normalized_path, &flattened.lines).unwrap();
    assert!(normalized_path.is_file());

    let records: Vec<Value> = flattened
        .lines
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let greeter_uri = url::Url::from_file_path(checkout.canonicalize().unwrap().join("lib/Greeter.cs"))
        .unwrap()
        .to_string();
    let range = records
        .iter()
        .find(|r| r["label"] == "range" && r["id"] == 5)
        .unwrap();
    assert_eq!(range["flattenedUri"], Value::from(greeter_uri.clone()));
    assert_eq!(range["flattenedActiveProjects"], "lib");

    let definition = records
        .iter()
        .find(|r| r["label"] == "definitionResult")
        .unwrap();
    assert_eq!(
        definition["flattenedResults"],
        serde_json::json!([format!("{greeter_uri}: (0, 13) to (0, 20)")])
    );

    // The app shard's range was renumbered past the lib shard.
    let app_range = records
        .iter()
        .find(|r| r["label"] == "range" && r["id"] == 17)
        .unwrap();
    assert!(app_range["flattenedUri"]
        .as_str()
        .unwrap()
        .ends_with("app/Program.cs"));
}

#[test]
fn test_linked_graph_is_rebuildable_and_preamble_is_unique() {
    let dir = tempdir().unwrap();
    let checkout = dir.path().join("repo");
    write_checkout(&checkout);

    let output = Linker::new(&checkout, LinkOptions::default())
        .unwrap()
        .link(&[Shard::new("lib", LIB_SHARD), Shard::new("app", APP_SHARD)]);

    let graph = Graph::from_text(&output.to_lines().unwrap().join("\n")).unwrap();
    let metadata = graph
        .elements()
        .iter()
        .filter(|e| e.label() == "metaData")
        .count();
    assert_eq!(metadata, 1);
    assert_eq!(graph.max_id(), Some(14 + 4));
    assert_eq!(output.diagnostics.warnings().count(), 1);
}
