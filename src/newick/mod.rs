//! Newick rendering of reconstructed phylogenies.
//!
//! # Quick API
//! * [to_newick] - one Newick string per root of a [PhylogenyTable](crate::model::PhylogenyTable)
//! * [write_newick_file] - writes these strings to a file, one tree per line
//!
//! # Format
//! * `tree ::= vertex ';'`
//! * `vertex ::= leaf | '(' vertex {',' vertex} ')' [label] [branch_length]`
//! * `leaf ::= label [branch_length]`
//! * `branch_length ::= ':' integer`
//!
//! Furthermore:
//! * Children appear in ascending id order
//! * Branch lengths are origin time differences and are only written when
//!   both a vertex and its parent carry an origin time
//! * Labels containing whitespace or Newick punctuation are single-quoted,
//!   with internal single quotes doubled

mod escape;
pub mod writer;

pub use self::escape::escape_label;
pub use self::writer::{to_newick, write_newick_file};
