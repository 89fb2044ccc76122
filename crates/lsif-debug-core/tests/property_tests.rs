use lsif_debug_core::{
    flatten_text, offset_ids, parse_records, FlattenOptions, Graph, IntegrityChecker, LinkOptions,
    Linker, LsifError, Shard,
};
use proptest::prelude::*;

const MAX_VERTICES: usize = 24;
const MAX_EDGES: usize = 24;

/// A dependency-ordered dump: `vertices` ranges, then edges between them.
///
/// Edge endpoints are indices into the vertex list, so every reference points
/// at an id that was already declared.
fn dump_strategy() -> impl Strategy<Value = String> {
    (1usize..=MAX_VERTICES)
        .prop_flat_map(|vertices| {
            let edge = (0..vertices, prop::collection::vec(0..vertices, 1..4));
            (Just(vertices), prop::collection::vec(edge, 0..MAX_EDGES))
        })
        .prop_map(|(vertices, edges)| {
            let mut lines = Vec::new();
            for id in 1..=vertices {
                lines.push(format!(
                    r#"{{"id":{id},"type":"vertex","label":"range","start":{{"line":{id},"character":0}},"end":{{"line":{id},"character":1}}}}"#
                ));
            }
            for (i, (out_v, in_vs)) in edges.into_iter().enumerate() {
                let id = vertices + i + 1;
                let in_vs: Vec<String> = in_vs.iter().map(|v| (v + 1).to_string()).collect();
                lines.push(format!(
                    r#"{{"id":{id},"type":"edge","label":"item","outV":{},"inVs":[{}]}}"#,
                    out_v + 1,
                    in_vs.join(",")
                ));
            }
            lines.join("\n")
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn dependency_ordered_dumps_pass_integrity(dump in dump_strategy()) {
        let records = parse_records(&dump).unwrap();
        prop_assert!(IntegrityChecker::new().check_all(&records).is_ok());
    }

    #[test]
    fn repeating_any_record_is_a_duplicate(dump in dump_strategy(), pick in any::<prop::sample::Index>()) {
        let lines: Vec<&str> = dump.lines().collect();
        let repeated = lines[pick.index(lines.len())];
        let text = format!("{dump}\n{repeated}");

        let records = parse_records(&text).unwrap();
        let err = IntegrityChecker::new().check_all(&records).unwrap_err();
        let is_duplicate = matches!(err, LsifError::DuplicateId { .. });
        prop_assert!(is_duplicate);
    }

    #[test]
    fn reference_past_the_last_id_is_unknown(dump in dump_strategy()) {
        let graph = Graph::from_text(&dump).unwrap();
        let max = graph.max_id().unwrap();
        let text = format!(
            r#"{dump}
{{"id":{},"type":"edge","label":"next","outV":1,"inV":{}}}"#,
            max + 1,
            max + 2
        );

        let records = parse_records(&text).unwrap();
        let err = IntegrityChecker::new().check_all(&records).unwrap_err();
        let is_unknown = matches!(err, LsifError::UnknownId { field: "inV", .. });
        prop_assert!(is_unknown);
    }

    #[test]
    fn offsetting_preserves_integrity_and_shifts_max(dump in dump_strategy(), by in 0u64..10_000) {
        let mut records = parse_records(&dump).unwrap();
        let before = Graph::from_elements(records.clone()).max_id().unwrap();
        for r in records.iter_mut() {
            offset_ids(r, by).unwrap();
        }

        prop_assert!(IntegrityChecker::new().check_all(&records).is_ok());
        prop_assert_eq!(Graph::from_elements(records).max_id(), Some(before + by));
    }

    #[test]
    fn linked_shards_occupy_disjoint_increasing_id_ranges(dumps in prop::collection::vec(dump_strategy(), 1..4)) {
        let source = tempfile::tempdir().unwrap();
        let linker = Linker::new(source.path(), LinkOptions::default()).unwrap();
        let shards: Vec<Shard> = dumps
            .iter()
            .enumerate()
            .map(|(i, d)| Shard::new(format!("{i}.lsif"), d.as_str()))
            .collect();

        let output = linker.link(&shards);
        prop_assert!(output.succeeded());
        prop_assert!(output.diagnostics.is_empty());

        let mut floor = 0;
        for summary in &output.shards {
            prop_assert!(summary.id_offset >= floor);
            let max = summary.max_id.unwrap();
            prop_assert!(max > summary.id_offset);
            floor = max + 1;
        }

        let records = output.records;
        prop_assert!(IntegrityChecker::new().check_all(&records).is_ok());
    }

    #[test]
    fn stripped_flatten_is_independent_of_id_assignment(dump in dump_strategy(), by in 1u64..1_000) {
        let shifted = parse_records(&dump)
            .unwrap()
            .into_iter()
            .map(|mut r| {
                offset_ids(&mut r, by).unwrap();
                serde_json::to_string(&r).unwrap()
            })
            .collect::<Vec<_>>()
            .join("\n");

        let options = FlattenOptions { strip_ids: true, ..FlattenOptions::default() };
        let a = flatten_text(&dump, &options).unwrap();
        let b = flatten_text(&shifted, &options).unwrap();
        prop_assert_eq!(a.lines, b.lines);
    }
}
