use hstrat::model::{NodeKind, Trie};

/// root -> {a -> {b -> x, y}, c -> z}
fn small_trie() -> Trie {
    let mut trie = Trie::new();
    let a = trie.add_inner(trie.root_index(), 0, 1);
    let b = trie.add_inner(a, 2, 3);
    trie.attach_leaf(b, "x".to_string());
    trie.attach_leaf(a, "y".to_string());
    let c = trie.add_inner(trie.root_index(), 1, 4);
    trie.attach_leaf(c, "z".to_string());
    trie
}

// --- TESTS TRAVERSAL ---
#[test]
fn test_pre_order_visits_parents_first() {
    let trie = small_trie();
    let order: Vec<usize> = trie.pre_order_iter().map(|node| node.index()).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_post_order_visits_children_first() {
    let trie = small_trie();
    let order: Vec<usize> = trie.post_order_iter().map(|node| node.index()).collect();
    assert_eq!(order, vec![3, 2, 4, 1, 6, 5, 0]);
}

#[test]
fn test_deep_chain_traversal() {
    let mut trie = Trie::new();
    let mut parent = trie.root_index();
    for rank in 0..100_000u64 {
        parent = trie.add_inner(parent, rank, 0);
    }
    trie.attach_leaf(parent, "deep".to_string());

    assert_eq!(trie.pre_order_iter().count(), trie.num_nodes());
    assert_eq!(trie.post_order_iter().next().map(|node| node.is_leaf()), Some(true));
    assert_eq!(trie.leaf_counts()[0], 1);
    assert!(trie.is_valid());
}

// --- TESTS COUNTS AND ACCESSORS ---
#[test]
fn test_counts() {
    let trie = small_trie();
    assert_eq!(trie.num_nodes(), 7);
    assert_eq!(trie.num_leaves(), 3);
    assert_eq!(trie.num_inner(), 3);
    assert_eq!(trie.num_origins(), 2);
    assert_eq!(trie.leaf_counts(), vec![3, 2, 1, 1, 1, 1, 1]);
    assert!(!trie.is_empty());
    assert!(Trie::new().is_empty());
}

#[test]
fn test_leaves_report_parent_allele() {
    let trie = small_trie();
    assert_eq!(trie.rank_of(3), Some(2));
    assert_eq!(trie.differentia_of(3), Some(3));
    assert_eq!(trie.rank_of(4), Some(0));
    assert_eq!(trie.rank_of(0), None);
    assert_eq!(trie[3].own_rank(), None);
    assert_eq!(trie[3].taxon_label(), Some("x"));
}

#[test]
fn test_child_filters() {
    let trie = small_trie();
    assert_eq!(trie.inner_children(1).collect::<Vec<_>>(), vec![2]);
    assert_eq!(trie.leaf_children(1).collect::<Vec<_>>(), vec![4]);
    assert_eq!(trie.min_inner_child_rank(0), Some(0));
    assert_eq!(trie.min_inner_child_rank(2), None);
}

// --- TESTS RESTRUCTURING ---
#[test]
fn test_clone_inner_under_copies_payload_only() {
    let mut trie = small_trie();
    trie[2].set_origin_time(2.5);
    trie[2].set_attribute("dstream_S", 8);

    let copy = trie.clone_inner_under(2, 5);
    assert_eq!(trie.parent(copy), Some(5));
    assert!(trie.children(copy).is_empty());
    assert!(matches!(
        trie[copy].kind(),
        NodeKind::Inner { rank: 2, differentia: 3 }
    ));
    assert_eq!(trie[copy].origin_time(), Some(2.5));
    assert_eq!(trie[copy].attribute("dstream_S"), Some(8));
    assert!(trie.is_valid());
}

#[test]
fn test_reparent_moves_subtree() {
    let mut trie = small_trie();
    trie.reparent(2, 5);

    assert_eq!(trie.children(1), &[4]);
    assert_eq!(trie.children(5), &[6, 2]);
    assert_eq!(trie.parent(2), Some(5));
    assert_eq!(trie.leaf_counts()[5], 2);
    assert!(trie.is_valid());
}

#[test]
fn test_reparent_breaking_rank_order_is_invalid() {
    let mut trie = small_trie();
    // c (rank 1) moved under b (rank 2)
    trie.reparent(5, 2);
    assert!(!trie.is_valid());
}

#[test]
fn test_clone_is_deep() {
    let trie = small_trie();
    let mut copy = trie.deep_copy();
    copy.attach_leaf(5, "w".to_string());
    assert_eq!(trie.num_leaves(), 3);
    assert_eq!(copy.num_leaves(), 4);
}

#[test]
#[should_panic]
fn test_attach_under_leaf_panics() {
    let mut trie = small_trie();
    trie.attach_leaf(3, "nope".to_string());
}

// --- TESTS PRINTING ---
#[test]
fn test_display_outline() {
    let mut trie = Trie::new();
    let a = trie.add_inner(trie.root_index(), 0, 17);
    trie.attach_leaf(a, "a".to_string());
    trie.add_inner(trie.root_index(), 0, 4);

    let expected = "[0] Root\n  ├─ [1] Inner (rank 0, differentia 17)\n  │   └─ [2] Leaf \"a\"\n  └─ [3] Inner (rank 0, differentia 4)\n";
    assert_eq!(trie.to_string(), expected);
}
