//! Scalar reconstruction API: annotations in, phylogeny table out.

use crate::error::{HstratError, Result};
use crate::model::annotation::p_differentia_collision;
use crate::model::{HereditaryStratigraphicArtifact, PhylogenyTable, UnifurcationCollapse};
use crate::postprocess::{
    AssignOriginTimeExpectedValue, AssignOriginTimeNaive, Compound, PeelBackConjoinedLeaves,
    SampleAncestralRollbacks, TriePostprocessor,
};
use crate::prior::{ArbitraryPrior, ExponentialPrior, GeometricPrior, Prior, UniformPrior};
use crate::reconstruction::build_trie::build_trie_from_artifacts;
use crate::reconstruction::export::trie_to_phylogeny;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Default seed of [BuildTreeTrie].
pub const DEFAULT_SEED: Option<u64> = Some(1);

// =#========================================================================#=
// BIAS ADJUSTMENT
// =#========================================================================#=
/// Correction applied for fingerprint collisions inflating relatedness.
///
/// | Variant | Postprocess pipeline |
/// |---|---|
/// | `None` | naive origin times under an arbitrary prior |
/// | `SampleAncestralRollbacks` | rollback sampling, then naive origin times |
/// | `Prior(p)` | leaf peeling, then expected-value origin times under `p` |
///
/// Parses from the tags `"none"`, `"sample_ancestral_rollbacks"`,
/// `"arbitrary"`, `"uniform"`, `"exponential:<f>"` and `"geometric:<f>"`,
/// where `f` is the per-rank growth factor of the selected prior.
#[derive(Clone, Default)]
pub enum BiasAdjustment {
    #[default]
    None,
    SampleAncestralRollbacks,
    Prior(Arc<dyn Prior>),
}

impl BiasAdjustment {
    /// Shorthand for [BiasAdjustment::Prior].
    pub fn prior(prior: impl Prior + 'static) -> Self {
        BiasAdjustment::Prior(Arc::new(prior))
    }

    /// Returns the postprocess pipeline implementing this adjustment.
    pub fn postprocessor(&self, seed: Option<u64>) -> Box<dyn TriePostprocessor> {
        match self {
            BiasAdjustment::None => Box::new(AssignOriginTimeNaive::new(ArbitraryPrior)),
            BiasAdjustment::SampleAncestralRollbacks => Box::new(
                Compound::default()
                    .with_stage(SampleAncestralRollbacks::new(seed))
                    .with_stage(AssignOriginTimeNaive::default()),
            ),
            BiasAdjustment::Prior(prior) => Box::new(
                Compound::default()
                    .with_stage(PeelBackConjoinedLeaves)
                    .with_stage(AssignOriginTimeExpectedValue::from_shared(Arc::clone(prior))),
            ),
        }
    }
}

impl fmt::Debug for BiasAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasAdjustment::None => write!(f, "None"),
            BiasAdjustment::SampleAncestralRollbacks => write!(f, "SampleAncestralRollbacks"),
            BiasAdjustment::Prior(prior) => write!(f, "Prior({prior:?})"),
        }
    }
}

impl FromStr for BiasAdjustment {
    type Err = HstratError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "none" => Ok(BiasAdjustment::None),
            "sample_ancestral_rollbacks" => Ok(BiasAdjustment::SampleAncestralRollbacks),
            "arbitrary" => Ok(BiasAdjustment::prior(ArbitraryPrior)),
            "uniform" => Ok(BiasAdjustment::prior(UniformPrior)),
            other => match other.split_once(':') {
                Some(("exponential", factor)) => Ok(BiasAdjustment::prior(ExponentialPrior::new(
                    parse_growth_factor(factor)?,
                )?)),
                Some(("geometric", factor)) => {
                    Ok(BiasAdjustment::prior(GeometricPrior::new(parse_growth_factor(factor)?)?))
                }
                _ => Err(HstratError::config(format!("unknown bias adjustment '{other}'"))),
            },
        }
    }
}

fn parse_growth_factor(factor: &str) -> Result<f64> {
    factor
        .trim()
        .parse()
        .map_err(|_| HstratError::config(format!("invalid growth factor '{factor}'")))
}

// =#========================================================================#=
// BUILD TREE TRIE (builder)
// =#========================================================================#=
/// Configures and runs scalar reconstruction.
///
/// Defaults: labels are member indices, common ancestry is not forced,
/// seed [DEFAULT_SEED], [BiasAdjustment::None].
///
/// # Example
/// ```
/// use hstrat::model::Annotation;
/// use hstrat::reconstruction::{BiasAdjustment, BuildTreeTrie};
///
/// let population = vec![
///     Annotation::new(2, 8, vec![(0, 1), (1, 2)]).unwrap(),
///     Annotation::new(2, 8, vec![(0, 1), (1, 3)]).unwrap(),
/// ];
/// let table = BuildTreeTrie::new()
///     .with_taxon_labels(vec!["a".to_string(), "b".to_string()])
///     .with_bias_adjustment("uniform".parse::<BiasAdjustment>()?)
///     .build(&population)?;
///
/// assert_eq!(table.rows()[0].ancestor_id, 0);
/// assert!(table.validate().is_ok());
/// # Ok::<(), hstrat::HstratError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BuildTreeTrie {
    taxon_labels: Option<Vec<String>>,
    force_common_ancestry: bool,
    seed: Option<u64>,
    bias_adjustment: BiasAdjustment,
}

impl Default for BuildTreeTrie {
    fn default() -> Self {
        BuildTreeTrie {
            taxon_labels: None,
            force_common_ancestry: false,
            seed: DEFAULT_SEED,
            bias_adjustment: BiasAdjustment::None,
        }
    }
}

impl BuildTreeTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels leaves; must hold exactly one label per population member.
    pub fn with_taxon_labels(mut self, taxon_labels: Vec<String>) -> Self {
        self.taxon_labels = Some(taxon_labels);
        self
    }

    /// Tolerates several independent origins under a synthetic root.
    pub fn with_force_common_ancestry(mut self, force_common_ancestry: bool) -> Self {
        self.force_common_ancestry = force_common_ancestry;
        self
    }

    /// Seeds random postprocessors; `None` uses the ambient generator.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_bias_adjustment(mut self, bias_adjustment: BiasAdjustment) -> Self {
        self.bias_adjustment = bias_adjustment;
        self
    }

    /// Reconstructs the phylogeny of `population`.
    ///
    /// Builds the trie, applies the bias-adjustment pipeline with
    /// `p = 2^-bitwidth`, exports with sole-leaf parents collapsed, and
    /// assigns contiguous ids.
    ///
    /// # Errors
    /// * [HstratError::InvalidBitwidth] / [HstratError::MalformedAnnotation]
    ///   for invalid members
    /// * [HstratError::InvalidConfiguration] for a label count mismatch
    /// * [HstratError::MultipleIndependentOrigins] if members do not share a
    ///   first allele and common ancestry is not forced
    #[tracing::instrument(skip_all, fields(num_members = population.len()))]
    pub fn build<A: HereditaryStratigraphicArtifact>(&self, population: &[A]) -> Result<PhylogenyTable> {
        // Validated by the trie builder
        let trie = build_trie_from_artifacts(population, self.taxon_labels.as_deref(), &mut |_| {})?;

        if trie.num_origins() > 1 && !self.force_common_ancestry {
            return Err(HstratError::MultipleIndependentOrigins {
                num_origins: trie.num_origins(),
            });
        }
        let Some(bitwidth) = population.first().map(|artifact| artifact.bitwidth()) else {
            return Ok(PhylogenyTable::empty());
        };

        let postprocessor = self.bias_adjustment.postprocessor(self.seed);
        let trie = postprocessor.apply(trie, p_differentia_collision(bitwidth), true, &mut |_| {})?;

        let mut table = trie_to_phylogeny(&trie, UnifurcationCollapse::SoleLeafParents)?;
        table.assign_contiguous_ids()?;
        table.validate()?;

        info!(
            num_rows = table.len(),
            bias_adjustment = ?self.bias_adjustment,
            "reconstructed phylogeny"
        );
        Ok(table)
    }
}

/// Reconstructs a phylogeny with explicit options.
///
/// See [BuildTreeTrie::build] for details.
pub fn build_tree_trie<A: HereditaryStratigraphicArtifact>(
    population: &[A],
    taxon_labels: Option<Vec<String>>,
    force_common_ancestry: bool,
    seed: Option<u64>,
    bias_adjustment: BiasAdjustment,
) -> Result<PhylogenyTable> {
    let mut builder = BuildTreeTrie::new()
        .with_force_common_ancestry(force_common_ancestry)
        .with_seed(seed)
        .with_bias_adjustment(bias_adjustment);
    if let Some(taxon_labels) = taxon_labels {
        builder = builder.with_taxon_labels(taxon_labels);
    }
    builder.build(population)
}
