use hstrat::HstratError;
use hstrat::model::{Annotation, PhylogenyRow, PhylogenyTable};
use hstrat::newick::{to_newick, write_newick_file};
use hstrat::reconstruction::BuildTreeTrie;
use std::fs::{self, File};

fn row(id: u64, ancestor_id: u64, origin_time: Option<i64>, label: Option<&str>) -> PhylogenyRow {
    let mut row = PhylogenyRow::new(id, ancestor_id);
    row.origin_time = origin_time;
    row.taxon_label = label.map(str::to_string);
    row
}

// --- TESTS STRUCTURE ---
#[test]
fn test_siblings_written_in_id_order() {
    let table = PhylogenyTable::new(vec![
        row(0, 0, None, None),
        row(5, 0, None, Some("x")),
        row(2, 0, None, Some("y")),
    ]);
    assert_eq!(to_newick(&table).unwrap(), vec!["(y,x);".to_string()]);
}

#[test]
fn test_one_line_per_root() {
    let table = PhylogenyTable::new(vec![
        row(0, 0, None, None),
        row(1, 0, None, Some("a")),
        row(2, 2, None, Some("b")),
    ]);
    assert_eq!(to_newick(&table).unwrap(), vec!["(a);".to_string(), "b;".to_string()]);
}

#[test]
fn test_nested_with_inner_label_and_lengths() {
    let table = PhylogenyTable::new(vec![
        row(0, 0, Some(0), None),
        row(1, 0, Some(2), Some("anc")),
        row(2, 1, Some(7), Some("a")),
        row(3, 1, Some(4), Some("b")),
        row(4, 0, Some(9), Some("c")),
    ]);
    assert_eq!(
        to_newick(&table).unwrap(),
        vec!["((a:5,b:2)anc:2,c:9);".to_string()]
    );
}

#[test]
fn test_branch_length_needs_both_origins() {
    let table = PhylogenyTable::new(vec![
        row(0, 0, None, None),
        row(1, 0, Some(3), None),
        row(2, 1, Some(4), Some("a")),
        row(3, 1, None, Some("b")),
    ]);
    assert_eq!(to_newick(&table).unwrap(), vec!["((a:1,b));".to_string()]);
}

#[test]
fn test_labels_are_quoted() {
    let table = PhylogenyTable::new(vec![
        row(0, 0, None, None),
        row(1, 0, None, Some("Swamp hen")),
        row(2, 0, None, Some("Baillon's")),
    ]);
    assert_eq!(
        to_newick(&table).unwrap(),
        vec!["('Swamp hen','Baillon''s');".to_string()]
    );
}

#[test]
fn test_empty_table_gives_no_trees() {
    assert!(to_newick(&PhylogenyTable::empty()).unwrap().is_empty());
}

// --- TESTS ERRORS ---
#[test]
fn test_cycle_rejected() {
    let table = PhylogenyTable::new(vec![row(0, 0, None, None), row(1, 2, None, None), row(2, 1, None, Some("a"))]);
    assert!(matches!(
        to_newick(&table),
        Err(HstratError::UnsatisfiableInvariant { .. })
    ));
}

#[test]
fn test_dangling_ancestor_rejected() {
    let table = PhylogenyTable::new(vec![row(0, 0, None, None), row(1, 8, None, Some("a"))]);
    assert!(to_newick(&table).is_err());
}

// --- TESTS RECONSTRUCTION OUTPUT ---
#[test]
fn test_reconstruction_writes_single_tree() {
    let population: Vec<Annotation> = (0..6u64)
        .map(|member| Annotation::new(5, 8, vec![(0, 3), (2, member % 2), (4, member)]).unwrap())
        .collect();
    let table = BuildTreeTrie::new().build(&population).unwrap();

    let trees = to_newick(&table).unwrap();
    assert_eq!(trees.len(), 1);
    let tree = &trees[0];
    assert!(tree.starts_with('(') && tree.ends_with(';'));
    assert_eq!(tree.matches('(').count(), tree.matches(')').count());
    for member in 0..6 {
        assert!(tree.contains(&format!("{member}:")), "missing leaf {member} in {tree}");
    }
}

#[test]
fn test_write_newick_file_one_line_per_tree() {
    let table = PhylogenyTable::new(vec![
        row(0, 0, Some(0), None),
        row(1, 0, Some(1), Some("a")),
        row(2, 2, Some(0), None),
        row(3, 2, Some(2), Some("b")),
        row(4, 2, Some(3), Some("c")),
    ]);
    let path = std::env::temp_dir().join(format!("hstrat_newick_{}.nwk", std::process::id()));

    write_newick_file(File::create(&path).unwrap(), &table).unwrap();
    let written = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(written, "(a:1);\n(b:2,c:3);\n");
}
