use proptest::prelude::*;
use repodigest::{FileRecord, TopKSelector, pack, tokens::estimate_tokens};

fn records_from_scores(scores: &[i32]) -> Vec<FileRecord> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| FileRecord::from_parts(format!("f{i}"), "", 0, f64::from(*score)))
        .collect()
}

fn records_from_tokens(tokens: &[usize]) -> Vec<FileRecord> {
    tokens
        .iter()
        .enumerate()
        .map(|(i, t)| FileRecord::from_parts(format!("f{i}"), "", *t, 0.0))
        .collect()
}

fn paths(records: &[FileRecord]) -> Vec<String> {
    records.iter().map(|r| r.path().to_string()).collect()
}

proptest! {
    #[test]
    fn selector_returns_true_top_k(
        scores in prop::collection::vec(-1000i32..1000, 0..200),
        k in 0usize..30,
    ) {
        let records = records_from_scores(&scores);
        let mut selector = TopKSelector::new(k);
        for record in records.iter().cloned() {
            selector.offer(record);
        }
        let drained = selector.drain();

        // stable sort keeps first-seen order among equal scores
        let mut expected = records.clone();
        expected.sort_by(|a, b| b.score().total_cmp(&a.score()));
        expected.truncate(k);

        prop_assert_eq!(drained.len(), k.min(records.len()));
        prop_assert_eq!(paths(&drained), paths(&expected));
    }

    #[test]
    fn selector_ignores_offer_order(
        scores in prop::collection::hash_set(-10_000i32..10_000, 0..100),
        k in 1usize..20,
        seed in any::<u64>(),
    ) {
        let scores: Vec<i32> = scores.into_iter().collect();
        let records = records_from_scores(&scores);

        let mut shuffled = records.clone();
        let len = shuffled.len();
        if len > 1 {
            let mut state = seed;
            for i in (1..len).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                shuffled.swap(i, j);
            }
        }

        let mut forward = TopKSelector::new(k);
        records.into_iter().for_each(|r| { forward.offer(r); });
        let mut permuted = TopKSelector::new(k);
        shuffled.into_iter().for_each(|r| { permuted.offer(r); });

        prop_assert_eq!(paths(&forward.drain()), paths(&permuted.drain()));
    }

    #[test]
    fn packing_respects_budget_and_order(
        tokens in prop::collection::vec(0usize..3000, 0..100),
        max in 1usize..2000,
    ) {
        let records = records_from_tokens(&tokens);
        let batches = pack(records.clone(), max).unwrap();

        for batch in &batches {
            prop_assert!(!batch.is_empty());
            let sum: usize = batch.files().iter().map(FileRecord::token_count).sum();
            prop_assert_eq!(sum, batch.total_tokens());
            prop_assert!(sum <= max || batch.len() == 1);
        }

        let flattened: Vec<FileRecord> = batches
            .iter()
            .flat_map(|b| b.files().iter().cloned())
            .collect();
        prop_assert_eq!(flattened, records);
    }

    #[test]
    fn packing_is_deterministic(
        tokens in prop::collection::vec(0usize..3000, 0..60),
        max in 1usize..2000,
    ) {
        let records = records_from_tokens(&tokens);
        let first = pack(records.clone(), max).unwrap();
        let second = pack(records, max).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn token_estimate_is_monotone(a in ".{0,200}", b in ".{0,200}") {
        let joined = format!("{a}{b}");
        prop_assert!(estimate_tokens(&joined) >= estimate_tokens(&a));
        prop_assert!(estimate_tokens(&joined) <= estimate_tokens(&a) + estimate_tokens(&b));
    }
}
