//! Scalar trie builder: merges a population of annotations into one trie by
//! allele placement.

use crate::error::{HstratError, Result};
use crate::model::annotation::validate_population;
use crate::model::{HereditaryStratigraphicArtifact, NodeIndex, Trie};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Builds a trie whose root-to-leaf paths spell each member's retained
/// alleles in ascending rank order.
///
/// Members descend from the root, following the child that originates their
/// next allele and creating it when absent; once a member's alleles are
/// exhausted a leaf is attached. Members sharing their first `d` alleles
/// therefore share the first `d` inner nodes of their path. Children keep
/// the order in which they were first created.
///
/// # Arguments
/// * `population` - Annotations to merge
/// * `taxon_labels` - One label per member; defaults to the member's index
/// * `progress` - Called with the number of members placed so far
///
/// # Errors
/// * [HstratError::InvalidBitwidth] / [HstratError::MalformedAnnotation] for
///   invalid members or bitwidths that differ across the population
/// * [HstratError::InvalidConfiguration] if the label count does not match
///
/// # Example
/// ```
/// use hstrat::model::Annotation;
/// use hstrat::reconstruction::build_trie_from_artifacts;
///
/// let population = vec![
///     Annotation::new(2, 8, vec![(0, 1), (1, 2)]).unwrap(),
///     Annotation::new(2, 8, vec![(0, 1), (1, 3)]).unwrap(),
/// ];
/// let trie = build_trie_from_artifacts(&population, None, &mut |_| {}).unwrap();
///
/// assert_eq!(trie.num_origins(), 1);
/// assert_eq!(trie.num_inner(), 3);
/// assert_eq!(trie.num_leaves(), 2);
/// ```
pub fn build_trie_from_artifacts<A: HereditaryStratigraphicArtifact>(
    population: &[A],
    taxon_labels: Option<&[String]>,
    progress: &mut dyn FnMut(u64),
) -> Result<Trie> {
    validate_population(population)?;
    if let Some(labels) = taxon_labels {
        if labels.len() != population.len() {
            return Err(HstratError::config(format!(
                "{} taxon labels supplied for a population of {}",
                labels.len(),
                population.len()
            )));
        }
    }

    let mut trie = Trie::new();
    // (parent, rank, differentia) -> child originating that allele
    let mut originations: HashMap<(NodeIndex, u64, u64), NodeIndex> = HashMap::new();

    for (member, artifact) in population.iter().enumerate() {
        let mut current = trie.root_index();
        for (rank, differentia) in artifact.iter_retained() {
            current = *originations
                .entry((current, rank, differentia))
                .or_insert_with(|| trie.add_inner(current, rank, differentia));
        }

        let label = match taxon_labels {
            Some(labels) => labels[member].clone(),
            None => member.to_string(),
        };
        trace!(member, leaf_parent = current, label = %label, "placed population member");
        trie.attach_leaf(current, label);
        progress(member as u64 + 1);
    }

    debug!(
        num_members = population.len(),
        num_nodes = trie.num_nodes(),
        num_origins = trie.num_origins(),
        "built trie from artifacts"
    );
    Ok(trie)
}

// =#========================================================================#=
// TESTS - SCALAR BUILDER
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Annotation;

    #[test]
    fn test_shared_prefix_is_shared() {
        let population = vec![
            Annotation::new(5, 8, vec![(0, 1), (2, 2), (4, 3)]).unwrap(),
            Annotation::new(5, 8, vec![(0, 1), (2, 2), (4, 4)]).unwrap(),
            Annotation::new(5, 8, vec![(0, 1), (3, 9)]).unwrap(),
        ];
        let trie = build_trie_from_artifacts(&population, None, &mut |_| {}).unwrap();

        // root, (0,1), (2,2), (4,3), (4,4), (3,9) + 3 leaves
        assert_eq!(trie.num_nodes(), 9);
        assert_eq!(trie.num_origins(), 1);
        assert!(trie.is_valid());
    }

    #[test]
    fn test_empty_annotation_hangs_off_root() {
        let population = vec![Annotation::new(0, 1, vec![]).unwrap()];
        let trie = build_trie_from_artifacts(&population, None, &mut |_| {}).unwrap();
        assert_eq!(trie.children(0).len(), 1);
        assert!(trie[trie.children(0)[0]].is_leaf());
    }

    #[test]
    fn test_label_count_mismatch() {
        let population = vec![Annotation::new(1, 8, vec![(0, 1)]).unwrap()];
        let labels = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            build_trie_from_artifacts(&population, Some(&labels), &mut |_| {}),
            Err(HstratError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_progress_counts_members() {
        let population = vec![
            Annotation::new(1, 8, vec![(0, 1)]).unwrap(),
            Annotation::new(1, 8, vec![(0, 1)]).unwrap(),
        ];
        let mut seen = Vec::new();
        build_trie_from_artifacts(&population, None, &mut |count| seen.push(count)).unwrap();
        assert_eq!(seen, vec![1, 2]);
    }
}
