//! Hereditary stratigraphic annotations: ranked, thinned fingerprint sequences.
//!
//! The trie core only needs three things from an annotation, captured by
//! [HereditaryStratigraphicArtifact]: how many strata were deposited, the
//! fingerprint bitwidth, and the retained `(rank, differentia)` pairs in
//! ascending rank order. [Annotation] is the owned implementation.

use crate::error::{HstratError, Result};

/// Fingerprint bitwidths supported by the reconstruction engine.
pub const SUPPORTED_BITWIDTHS: [u32; 7] = [1, 2, 4, 8, 16, 32, 64];

// =#========================================================================#=
// ARTIFACT (trait)
// =#========================================================================#=
/// Read access to a hereditary stratigraphic annotation.
///
/// Implementors must yield retained strata with strictly increasing ranks,
/// each below [num_strata_deposited](Self::num_strata_deposited), and each
/// differentia fitting in [bitwidth](Self::bitwidth) bits.
/// Use [validate_artifact] to check an implementation's output.
pub trait HereditaryStratigraphicArtifact {
    /// Number of generations (strata) deposited so far.
    fn num_strata_deposited(&self) -> u64;

    /// Width of each fingerprint in bits.
    fn bitwidth(&self) -> u32;

    /// Retained `(rank, differentia)` pairs in ascending rank order.
    fn iter_retained(&self) -> impl Iterator<Item = (u64, u64)> + '_;
}

// =#========================================================================#=
// ANNOTATION
// =#========================================================================#=
/// Owned annotation `(num_deposited, bitwidth, retained_fingerprints)`.
///
/// # Invariants
/// - `0 <= rank < num_strata_deposited` for each retained pair
/// - ranks strictly increasing
/// - every differentia fits in `bitwidth` bits
///
/// # Example
/// ```
/// use hstrat::model::Annotation;
///
/// let annotation = Annotation::new(3, 8, vec![(0, 17), (1, 200), (2, 3)]).unwrap();
/// assert_eq!(annotation.num_retained(), 3);
/// assert!(Annotation::new(3, 8, vec![(1, 0), (0, 0)]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    num_strata_deposited: u64,
    bitwidth: u32,
    retained: Vec<(u64, u64)>,
}

impl Annotation {
    /// Creates a validated annotation.
    ///
    /// # Errors
    /// [HstratError::InvalidBitwidth] for unsupported bitwidths and
    /// [HstratError::MalformedAnnotation] for any other violated invariant.
    pub fn new(num_strata_deposited: u64, bitwidth: u32, retained: Vec<(u64, u64)>) -> Result<Self> {
        let annotation = Annotation {
            num_strata_deposited,
            bitwidth,
            retained,
        };
        validate_artifact(&annotation)?;
        Ok(annotation)
    }

    /// Creates a validated annotation from parallel rank and differentia slices.
    ///
    /// # Errors
    /// As [Annotation::new], plus [HstratError::MalformedAnnotation] if the
    /// slices differ in length.
    pub fn from_columns(
        num_strata_deposited: u64,
        bitwidth: u32,
        ranks: &[u64],
        differentiae: &[u64],
    ) -> Result<Self> {
        if ranks.len() != differentiae.len() {
            return Err(HstratError::malformed(format!(
                "{} ranks but {} differentiae",
                ranks.len(),
                differentiae.len()
            )));
        }
        let retained = ranks.iter().copied().zip(differentiae.iter().copied()).collect();
        Self::new(num_strata_deposited, bitwidth, retained)
    }

    /// Returns the number of retained strata.
    pub fn num_retained(&self) -> usize {
        self.retained.len()
    }

    /// Returns the retained `(rank, differentia)` pairs.
    pub fn retained(&self) -> &[(u64, u64)] {
        &self.retained
    }
}

impl HereditaryStratigraphicArtifact for Annotation {
    fn num_strata_deposited(&self) -> u64 {
        self.num_strata_deposited
    }

    fn bitwidth(&self) -> u32 {
        self.bitwidth
    }

    fn iter_retained(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.retained.iter().copied()
    }
}

// ============================================================================
// Validation (pub)
// ============================================================================
/// Checks that `bitwidth` is one of [SUPPORTED_BITWIDTHS].
///
/// # Errors
/// [HstratError::InvalidBitwidth] otherwise.
pub fn check_bitwidth(bitwidth: u32) -> Result<()> {
    if SUPPORTED_BITWIDTHS.contains(&bitwidth) {
        Ok(())
    } else {
        Err(HstratError::InvalidBitwidth { bitwidth })
    }
}

/// Returns whether `differentia` fits in `bitwidth` bits.
pub fn fits_bitwidth(differentia: u64, bitwidth: u32) -> bool {
    bitwidth >= 64 || differentia >> bitwidth == 0
}

/// Probability that two independently drawn fingerprints of the given
/// bitwidth collide, `2^-bitwidth`.
pub fn p_differentia_collision(bitwidth: u32) -> f64 {
    0.5f64.powi(bitwidth as i32)
}

/// Validates every annotation invariant for any artifact implementation.
///
/// # Errors
/// [HstratError::InvalidBitwidth] or [HstratError::MalformedAnnotation].
pub fn validate_artifact<A: HereditaryStratigraphicArtifact + ?Sized>(artifact: &A) -> Result<()> {
    let bitwidth = artifact.bitwidth();
    check_bitwidth(bitwidth)?;

    let num_deposited = artifact.num_strata_deposited();
    let mut previous_rank: Option<u64> = None;
    for (rank, differentia) in artifact.iter_retained() {
        if rank >= num_deposited {
            return Err(HstratError::malformed(format!(
                "rank {rank} not below number of strata deposited {num_deposited}"
            )));
        }
        if previous_rank.is_some_and(|previous| previous >= rank) {
            return Err(HstratError::malformed(format!(
                "ranks not strictly increasing at rank {rank}"
            )));
        }
        if !fits_bitwidth(differentia, bitwidth) {
            return Err(HstratError::malformed(format!(
                "differentia {differentia} at rank {rank} exceeds {bitwidth} bits"
            )));
        }
        previous_rank = Some(rank);
    }

    Ok(())
}

/// Validates a whole population and returns its shared bitwidth.
///
/// Returns `None` for an empty population.
///
/// # Errors
/// As [validate_artifact], plus [HstratError::MalformedAnnotation] if
/// members disagree on bitwidth.
pub fn validate_population<A: HereditaryStratigraphicArtifact>(population: &[A]) -> Result<Option<u32>> {
    let mut shared_bitwidth = None;
    for (index, artifact) in population.iter().enumerate() {
        validate_artifact(artifact)?;
        match shared_bitwidth {
            None => shared_bitwidth = Some(artifact.bitwidth()),
            Some(bitwidth) if bitwidth != artifact.bitwidth() => {
                return Err(HstratError::malformed(format!(
                    "population member {index} has bitwidth {} but others have {bitwidth}",
                    artifact.bitwidth()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(shared_bitwidth)
}
