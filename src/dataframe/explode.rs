//! Packed annotations and their explosion into per-fingerprint rows.
//!
//! A packed annotation stores its fingerprints bit-packed, most significant
//! bit first, into a hex string; ranks are stored explicitly. Exploding
//! turns a population of annotations into the row-per-fingerprint schema
//! consumed by [surface_build_tree](crate::dataframe::surface_build_tree):
//!
//! | Column | Type |
//! |---|---|
//! | `data_id` | `u64` |
//! | `rank` | `u64` |
//! | `differentia` | `u64` |
//! | `differentia_bitwidth` | `u32` |
//! | `dstream_S` | `u32` |

use crate::dataframe::frame::{Column, Frame};
use crate::error::{HstratError, Result};
use crate::model::annotation::check_bitwidth;
use crate::model::{Annotation, HereditaryStratigraphicArtifact};

// =#========================================================================#=
// PACKED ANNOTATION
// =#========================================================================#=
/// One annotation in packed form.
///
/// # Example
/// ```
/// use hstrat::dataframe::PackedAnnotation;
/// use hstrat::model::Annotation;
///
/// let annotation = Annotation::new(5, 4, vec![(0, 0xA), (3, 0x5), (4, 0xF)]).unwrap();
/// let packed = PackedAnnotation::pack(7, &annotation, 8);
/// assert_eq!(packed.differentiae_hex, "a5f0");
/// assert_eq!(packed.unpack().unwrap(), annotation);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackedAnnotation {
    pub data_id: u64,
    pub num_strata_deposited: u64,
    pub differentia_bitwidth: u32,
    pub dstream_s: u32,
    pub retained_ranks: Vec<u64>,
    pub differentiae_hex: String,
}

impl PackedAnnotation {
    /// Packs any artifact.
    pub fn pack<A: HereditaryStratigraphicArtifact + ?Sized>(data_id: u64, artifact: &A, dstream_s: u32) -> Self {
        let bitwidth = artifact.bitwidth();
        let (retained_ranks, differentiae): (Vec<u64>, Vec<u64>) = artifact.iter_retained().unzip();
        PackedAnnotation {
            data_id,
            num_strata_deposited: artifact.num_strata_deposited(),
            differentia_bitwidth: bitwidth,
            dstream_s,
            retained_ranks,
            differentiae_hex: hex::encode(pack_bits(&differentiae, bitwidth)),
        }
    }

    /// Decodes the fingerprints in rank order.
    ///
    /// # Errors
    /// * [HstratError::InvalidBitwidth] for unsupported bitwidths
    /// * [HstratError::MalformedAnnotation] for invalid hex or a byte count
    ///   not matching the number of retained ranks
    pub fn differentiae(&self) -> Result<Vec<u64>> {
        check_bitwidth(self.differentia_bitwidth)?;
        let bytes = hex::decode(&self.differentiae_hex).map_err(|err| {
            HstratError::malformed(format!("data_id {}: invalid differentiae hex: {err}", self.data_id))
        })?;

        let count = self.retained_ranks.len();
        let expected = packed_len(count, self.differentia_bitwidth);
        if bytes.len() != expected {
            return Err(HstratError::malformed(format!(
                "data_id {}: {} packed bytes for {count} differentiae of {} bits, expected {expected}",
                self.data_id,
                bytes.len(),
                self.differentia_bitwidth
            )));
        }
        Ok(unpack_bits(&bytes, count, self.differentia_bitwidth))
    }

    /// Unpacks into a validated [Annotation].
    ///
    /// # Errors
    /// As [differentiae](Self::differentiae) and [Annotation::from_columns].
    pub fn unpack(&self) -> Result<Annotation> {
        let differentiae = self.differentiae()?;
        Annotation::from_columns(
            self.num_strata_deposited,
            self.differentia_bitwidth,
            &self.retained_ranks,
            &differentiae,
        )
    }
}

// ============================================================================
// Explosion (pub)
// ============================================================================
/// Explodes packed annotations into one row per retained fingerprint.
///
/// Annotations are validated while unpacking.
///
/// # Errors
/// As [PackedAnnotation::unpack].
pub fn explode_packed(packed: &[PackedAnnotation]) -> Result<Frame> {
    let mut columns = ExplodedColumns::default();
    for annotation in packed {
        let unpacked = annotation.unpack()?;
        columns.push(annotation.data_id, &unpacked, annotation.dstream_s);
    }
    columns.into_frame()
}

/// Explodes `(data_id, annotation)` pairs sharing one `dstream_s`.
///
/// # Errors
/// [HstratError::MalformedAnnotation] / [HstratError::InvalidBitwidth] for
/// invalid annotations.
pub fn explode_annotations<A: HereditaryStratigraphicArtifact>(
    annotations: &[(u64, A)],
    dstream_s: u32,
) -> Result<Frame> {
    let mut columns = ExplodedColumns::default();
    for (data_id, annotation) in annotations {
        crate::model::annotation::validate_artifact(annotation)?;
        columns.push(*data_id, annotation, dstream_s);
    }
    columns.into_frame()
}

#[derive(Default)]
struct ExplodedColumns {
    data_id: Vec<u64>,
    rank: Vec<u64>,
    differentia: Vec<u64>,
    differentia_bitwidth: Vec<u32>,
    dstream_s: Vec<u32>,
}

impl ExplodedColumns {
    fn push<A: HereditaryStratigraphicArtifact + ?Sized>(&mut self, data_id: u64, artifact: &A, dstream_s: u32) {
        for (rank, differentia) in artifact.iter_retained() {
            self.data_id.push(data_id);
            self.rank.push(rank);
            self.differentia.push(differentia);
            self.differentia_bitwidth.push(artifact.bitwidth());
            self.dstream_s.push(dstream_s);
        }
    }

    fn into_frame(self) -> Result<Frame> {
        Frame::new()
            .with_column("data_id", Column::U64(self.data_id))?
            .with_column("rank", Column::U64(self.rank))?
            .with_column("differentia", Column::U64(self.differentia))?
            .with_column("differentia_bitwidth", Column::U32(self.differentia_bitwidth))?
            .with_column("dstream_S", Column::U32(self.dstream_s))
    }
}

// ============================================================================
// Bit packing (private)
// ============================================================================
fn packed_len(count: usize, bitwidth: u32) -> usize {
    (count * bitwidth as usize).div_ceil(8)
}

/// Packs values MSB first; the final byte is zero-padded.
fn pack_bits(values: &[u64], bitwidth: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; packed_len(values.len(), bitwidth)];
    let mut bit = 0usize;
    for &value in values {
        for shift in (0..bitwidth).rev() {
            if (value >> shift) & 1 == 1 {
                bytes[bit / 8] |= 0x80 >> (bit % 8);
            }
            bit += 1;
        }
    }
    bytes
}

fn unpack_bits(bytes: &[u8], count: usize, bitwidth: u32) -> Vec<u64> {
    let mut values = Vec::with_capacity(count);
    let mut bit = 0usize;
    for _ in 0..count {
        let mut value = 0u64;
        for _ in 0..bitwidth {
            let set = (bytes[bit / 8] >> (7 - bit % 8)) & 1;
            value = (value << 1) | set as u64;
            bit += 1;
        }
        values.push(value);
    }
    values
}
