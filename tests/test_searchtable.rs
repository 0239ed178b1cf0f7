use hstrat::HstratError;
use hstrat::model::Trie;
use hstrat::reconstruction::searchtable::{DATA_ID_ATTRIBUTE, DSTREAM_S_ATTRIBUTE, Searchtable, TaxonAlleles};

fn taxon(data_id: u64, alleles: &[(u64, u64)]) -> TaxonAlleles {
    TaxonAlleles {
        data_id,
        alleles: alleles.to_vec(),
    }
}

fn leaf_of(trie: &Trie, data_id: u64) -> usize {
    trie.nodes()
        .iter()
        .find(|node| node.is_leaf() && node.attribute(DATA_ID_ATTRIBUTE) == Some(data_id))
        .map(|node| node.index())
        .unwrap()
}

/// Ranks of the inner nodes above a leaf, deepest first.
fn ancestor_ranks(trie: &Trie, leaf: usize) -> Vec<u64> {
    let mut ranks = Vec::new();
    let mut current = trie.parent(leaf);
    while let Some(node) = current {
        if let Some(rank) = trie[node].own_rank() {
            ranks.push(rank);
        }
        current = trie.parent(node);
    }
    ranks
}

// --- TESTS INSERTION ---
#[test]
fn test_thinned_taxon_matches_through_dropped_ranks() {
    // Taxon 1 no longer retains ranks 1 and 3 but agrees at ranks 0 and 2
    let taxa = vec![
        taxon(1, &[(0, 5), (2, 8), (5, 1)]),
        taxon(0, &[(0, 5), (1, 3), (2, 8), (3, 9)]),
    ];
    let trie = Searchtable::from_taxa(&taxa).unwrap().into_trie(None).unwrap();

    assert_eq!(trie.num_origins(), 1);
    assert_eq!(ancestor_ranks(&trie, leaf_of(&trie, 0)), vec![3, 2, 1, 0]);
    assert_eq!(ancestor_ranks(&trie, leaf_of(&trie, 1)), vec![5, 2, 1, 0]);
    assert!(trie.is_valid());
}

#[test]
fn test_thinned_taxon_diverging_at_shared_rank() {
    let taxa = vec![
        taxon(0, &[(0, 5), (1, 3), (2, 8), (3, 9)]),
        taxon(1, &[(0, 5), (2, 7), (5, 1)]),
    ];
    let trie = Searchtable::from_taxa(&taxa).unwrap().into_trie(None).unwrap();

    assert_eq!(ancestor_ranks(&trie, leaf_of(&trie, 1)), vec![5, 2, 0]);
}

#[test]
fn test_identical_taxa_share_host() {
    let taxa = vec![taxon(3, &[(0, 1), (4, 2)]), taxon(4, &[(0, 1), (4, 2)])];
    let trie = Searchtable::from_taxa(&taxa).unwrap().into_trie(Some(2)).unwrap();

    let first = leaf_of(&trie, 3);
    let second = leaf_of(&trie, 4);
    assert_eq!(trie.parent(first), trie.parent(second));
    assert_eq!(trie[first].taxon_label(), Some("3"));
    for node in trie.nodes() {
        assert_eq!(node.attribute(DSTREAM_S_ATTRIBUTE), Some(2));
    }
}

#[test]
fn test_leaf_count_matches_taxa() {
    let taxa: Vec<TaxonAlleles> = (0..25u64)
        .map(|data_id| {
            let alleles: Vec<(u64, u64)> = (0..8u64)
                .filter(|rank| rank % 2 == 0 || (rank + data_id) % 3 == 0)
                .map(|rank| (rank, if rank == 0 { 0 } else { (data_id >> (rank % 3)) & 1 }))
                .collect();
            taxon(data_id, &alleles)
        })
        .collect();
    let trie = Searchtable::from_taxa(&taxa).unwrap().into_trie(None).unwrap();

    assert_eq!(trie.num_leaves(), taxa.len());
    assert!(trie.is_valid());
}

#[test]
fn test_empty_taxon_hangs_off_root() {
    let mut table = Searchtable::new();
    let leaf = table.insert_artifact(&[], 9).unwrap();
    assert_eq!(table.record(leaf).ancestor_id, 0);
    assert!(table.record(leaf).is_leaf());
}

// --- TESTS ERRORS ---
#[test]
fn test_reserved_data_id_rejected() {
    let mut table = Searchtable::new();
    let result = table.insert_artifact(&[(0, 1)], u64::MAX);
    assert!(matches!(result, Err(HstratError::MalformedAnnotation { .. })));
}

#[test]
fn test_repeated_rank_rejected() {
    let mut table = Searchtable::new();
    let result = table.insert_artifact(&[(0, 1), (2, 1), (2, 3)], 1);
    assert!(matches!(result, Err(HstratError::MalformedAnnotation { .. })));
}
