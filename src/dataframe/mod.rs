//! Bulk reconstruction over exploded, columnar annotation data.
//!
//! Input is one row per retained fingerprint with the columns `data_id`,
//! `rank`, `differentia`, `differentia_bitwidth` and `dstream_S` (see
//! [explode]). An optional `origin_time` column overrides leaf origin
//! times; any other column is forwarded onto the leaf rows of the output.
//!
//! # Quick API
//! * [surface_build_tree] - reconstructs with default settings, returns a [Frame]
//! * [explode_annotations] / [explode_packed] - builds input frames
//!
//! # Full API
//! * [SurfaceBuildTree] - builder controlling slice size, trie
//!   postprocessing, trunk handling and unifurcation collapse

pub mod explode;
pub mod frame;
pub mod surface_build_tree;

pub use self::explode::{PackedAnnotation, explode_annotations, explode_packed};
pub use self::frame::{Column, Frame};
pub use self::surface_build_tree::{SurfaceBuildTree, surface_build_tree};
