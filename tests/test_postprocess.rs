use hstrat::model::{Annotation, PhylogenyTable, Trie, UnifurcationCollapse};
use hstrat::postprocess::{
    AssignDestructionTime, AssignOriginTimeExpectedValue, AssignOriginTimeNaive, AssignOriginTimeNodeRank,
    AssignOriginTimeSample, Compound, Epoch, Nop, PeelBackConjoinedLeaves, SampleAncestralRollbacks,
    TriePostprocessor, num_possible_rollbacks,
};
use hstrat::prior::{ArbitraryPrior, GeometricPrior, UniformPrior};
use hstrat::reconstruction::{build_trie_from_artifacts, trie_to_phylogeny};

const P: f64 = 1.0 / 256.0;

fn population_trie() -> Trie {
    let population: Vec<Annotation> = (0..12u64)
        .map(|member| {
            Annotation::new(
                20,
                8,
                vec![(0, 7), (4, member % 2), (9, member % 3), (15, member % 4), (19, member % 6)],
            )
            .unwrap()
        })
        .collect();
    build_trie_from_artifacts(&population, None, &mut |_| {}).unwrap()
}

fn apply(postprocessor: &dyn TriePostprocessor, trie: Trie) -> Trie {
    postprocessor.apply(trie, P, true, &mut |_| {}).unwrap()
}

fn export(trie: &Trie) -> PhylogenyTable {
    trie_to_phylogeny(trie, UnifurcationCollapse::Keep).unwrap()
}

/// root -> a -> {b -> {d -> l1, e -> l2}, c -> l3}
fn nested_trie() -> Trie {
    let mut trie = Trie::new();
    let a = trie.add_inner(trie.root_index(), 0, 0);
    let b = trie.add_inner(a, 1, 0);
    let c = trie.add_inner(a, 1, 1);
    let d = trie.add_inner(b, 2, 0);
    let e = trie.add_inner(b, 2, 1);
    trie.attach_leaf(d, "1".to_string());
    trie.attach_leaf(e, "2".to_string());
    trie.attach_leaf(c, "3".to_string());
    trie
}

fn leaves_below(trie: &Trie, index: usize) -> usize {
    let mut stack = vec![index];
    let mut count = 0;
    while let Some(next) = stack.pop() {
        if trie[next].is_leaf() {
            count += 1;
        }
        stack.extend_from_slice(trie.children(next));
    }
    count
}

// --- TESTS IDEMPOTENCY AND COMPOSITION ---
#[test]
fn test_node_rank_is_idempotent() {
    let postprocessor = AssignOriginTimeNodeRank::default();
    let once = apply(&postprocessor, population_trie());
    let twice = apply(&postprocessor, once.clone());
    assert_eq!(export(&once), export(&twice));
}

#[test]
fn test_nop_is_idempotent() {
    let once = apply(&Nop, population_trie());
    let twice = apply(&Nop, once.clone());
    assert_eq!(export(&once), export(&twice));
    assert_eq!(export(&once), export(&population_trie()));
}

#[test]
fn test_compound_is_associative() {
    let flat = Compound::default()
        .with_stage(PeelBackConjoinedLeaves)
        .with_stage(AssignOriginTimeNodeRank::default())
        .with_stage(AssignDestructionTime);
    let nested = Compound::default()
        .with_stage(
            Compound::default()
                .with_stage(PeelBackConjoinedLeaves)
                .with_stage(AssignOriginTimeNodeRank::default()),
        )
        .with_stage(AssignDestructionTime);

    assert_eq!(
        export(&apply(&flat, population_trie())),
        export(&apply(&nested, population_trie()))
    );
}

#[test]
fn test_empty_compound_is_nop() {
    let compound = Compound::default();
    assert!(compound.is_empty());
    assert_eq!(
        export(&apply(&compound, population_trie())),
        export(&population_trie())
    );
}

#[test]
fn test_node_rank_epoch_attribute() {
    let mut trie = nested_trie();
    for index in 0..trie.num_nodes() {
        trie[index].set_attribute("dstream_S", 1);
    }
    let trie = apply(&AssignOriginTimeNodeRank::with_epoch_attribute("dstream_S"), trie);
    assert_eq!(trie.root().origin_time(), Some(-1.0));
    assert_eq!(trie[1].origin_time(), Some(-1.0));
    assert_eq!(trie[4].origin_time(), Some(1.0));

    let missing = AssignOriginTimeNodeRank::new(Epoch::Attribute("missing".to_string()))
        .apply(nested_trie(), P, true, &mut |_| {});
    assert!(missing.is_err());
}

// --- TESTS ORIGIN AND DESTRUCTION TIMES ---
#[test]
fn test_destruction_not_before_origin() {
    let pipeline = Compound::default()
        .with_stage(AssignOriginTimeNaive::new(UniformPrior))
        .with_stage(AssignDestructionTime);
    let trie = apply(&pipeline, population_trie());

    for node in trie.pre_order_iter() {
        let origin = node.origin_time().unwrap();
        let destruction = node.destruction_time().unwrap();
        assert!(destruction >= origin, "node {}: {destruction} < {origin}", node.index());
        if node.is_leaf() {
            assert_eq!(destruction, f64::INFINITY);
        }
    }
}

#[test]
fn test_naive_origin_times_monotone() {
    let trie = apply(&AssignOriginTimeNaive::new(ArbitraryPrior), population_trie());
    for node in trie.pre_order_iter() {
        if let Some(parent) = node.parent() {
            assert!(trie[parent].origin_time().unwrap() <= node.origin_time().unwrap());
        }
        if let Some(rank) = node.own_rank() {
            assert!(node.origin_time().unwrap() >= rank as f64);
        }
    }
}

#[test]
fn test_expected_value_stays_between_parent_and_naive() {
    let naive = apply(&AssignOriginTimeNaive::new(UniformPrior), population_trie());
    let expected = apply(
        &AssignOriginTimeExpectedValue::new(UniformPrior),
        population_trie(),
    );

    for node in expected.pre_order_iter() {
        let value = node.origin_time().unwrap();
        let naive_value = naive[node.index()].origin_time().unwrap();
        assert!(value <= naive_value + 1e-9);
        if let Some(parent) = node.parent() {
            assert!(expected[parent].origin_time().unwrap() <= value + 1e-9);
        }
    }
}

#[test]
fn test_sampled_origin_times_are_seeded() {
    let postprocessor = AssignOriginTimeSample::new(GeometricPrior::new(1.05).unwrap(), Some(3));
    let first = export(&apply(&postprocessor, population_trie()));
    let second = export(&apply(&postprocessor, population_trie()));
    assert_eq!(first, second);
    assert!(first.iter().all(|row| row.origin_time.is_some()));
}

// --- TESTS RESTRUCTURING ---
#[test]
fn test_peel_back_leaves_one_leaf_per_host() {
    let mut trie = Trie::new();
    let a = trie.add_inner(trie.root_index(), 0, 0);
    let b = trie.add_inner(a, 3, 1);
    for label in ["x", "y", "z"] {
        trie.attach_leaf(b, label.to_string());
    }

    let trie = apply(&PeelBackConjoinedLeaves, trie);
    assert_eq!(trie.num_leaves(), 3);
    assert_eq!(trie.children(a).len(), 3);
    for &host in trie.children(a) {
        assert_eq!(trie.rank_of(host), Some(3));
        assert_eq!(trie.differentia_of(host), Some(1));
        assert_eq!(trie.leaf_children(host).count(), 1);
    }
    assert!(trie.is_valid());
}

#[test]
fn test_rollbacks_under_certain_collision_give_star() {
    let trie = nested_trie();
    assert_eq!(num_possible_rollbacks(&trie), 3);

    let trie = SampleAncestralRollbacks::new(Some(1))
        .apply(trie, 1.0, true, &mut |_| {})
        .unwrap();

    assert_eq!(trie.num_leaves(), 3);
    assert_eq!(num_possible_rollbacks(&trie), 0);
    let root_children = trie.children(trie.root_index());
    assert_eq!(root_children.len(), 3);
    for &child in root_children {
        assert_eq!(leaves_below(&trie, child), 1);
    }
    assert!(trie.is_valid());
}

#[test]
fn test_rollbacks_seeded_runs_agree() {
    let run = || {
        let trie = SampleAncestralRollbacks::new(Some(9))
            .apply(population_trie(), 0.25, true, &mut |_| {})
            .unwrap();
        export(&trie)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_invalid_collision_probability_rejected() {
    assert!(Nop.apply(nested_trie(), 1.5, true, &mut |_| {}).is_err());
    assert!(AssignDestructionTime.apply(nested_trie(), -0.1, true, &mut |_| {}).is_err());
}
