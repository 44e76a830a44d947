//! Property tests for flat L2 index search ordering and persistence.

use medai_rag::VectorIndex;
use proptest::prelude::*;

const DIM: usize = 8;

/// Components drawn from a small grid so that equal distances (ties) occur.
fn arb_embedding() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec((-4i8..=4).prop_map(|v| f32::from(v) * 0.25), DIM)
}

fn arb_index() -> impl Strategy<Value = VectorIndex> {
    proptest::collection::vec(arb_embedding(), 0..40).prop_map(|rows| {
        let chunks = (0..rows.len()).map(|i| format!("chunk {i}")).collect();
        VectorIndex::build("test-model", DIM, rows, chunks).unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn search_is_ascending_with_row_tiebreak_and_bounded_by_k(
        index in arb_index(),
        query in arb_embedding(),
        k in 0usize..50,
    ) {
        let hits = index.search(&query, k).unwrap();

        prop_assert_eq!(hits.len(), k.min(index.len()));
        for pair in hits.windows(2) {
            let ordered = pair[0].distance < pair[1].distance
                || (pair[0].distance == pair[1].distance && pair[0].row < pair[1].row);
            prop_assert!(ordered, "out of order: {:?} then {:?}", pair[0], pair[1]);
        }
        // Nothing skipped is closer than the farthest returned hit.
        if let Some(last) = hits.last() {
            let returned: Vec<usize> = hits.iter().map(|h| h.row).collect();
            for row in (0..index.len()).filter(|r| !returned.contains(r)) {
                let embedding = index.embedding(row).unwrap();
                let distance = medai_rag::index::squared_l2(&query, embedding);
                prop_assert!(distance >= last.distance);
            }
        }
    }

    #[test]
    fn persist_then_load_gives_bit_identical_results(
        index in arb_index(),
        query in arb_embedding(),
        k in 1usize..50,
    ) {
        let dir = tempfile::tempdir().unwrap();
        index.persist(dir.path()).unwrap();
        let loaded = VectorIndex::load(dir.path(), "test-model").unwrap();

        let before = index.search(&query, k).unwrap();
        let after = loaded.search(&query, k).unwrap();
        prop_assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            prop_assert_eq!(a.row, b.row);
            prop_assert_eq!(a.distance.to_bits(), b.distance.to_bits());
            prop_assert_eq!(index.chunk(a.row), loaded.chunk(b.row));
        }
    }
}

#[test]
fn stored_embedding_as_query_is_distance_zero_and_first() {
    let rows = vec![vec![0.1, 0.2, 0.3], vec![0.9, -0.4, 0.05], vec![0.3, 0.3, 0.3]];
    let chunks = vec!["filters".to_string(), "dialysis".to_string(), "urine".to_string()];
    let index = VectorIndex::build("test-model", 3, rows.clone(), chunks).unwrap();

    let hits = index.search(&rows[1], 3).unwrap();
    assert_eq!(hits[0].row, 1);
    assert_eq!(hits[0].distance, 0.0);
    assert_eq!(index.chunk(hits[0].row).unwrap().text, "dialysis");
}
