//! Label quoting for Newick output.

/// Returns `true` if `label` must be quoted to survive a Newick parser.
pub fn needs_quoting(label: &str) -> bool {
    label.is_empty()
        || label.chars().any(|c| {
            matches!(
                c,
                ' ' | ',' | ';' | '\t' | '\n' | '\r' | '(' | ')' | ':' | '[' | ']' | '\''
            )
        })
}

/// Escapes a label for Newick output.
///
/// Labels with whitespace or punctuation are wrapped in single quotes and
/// their internal single quotes doubled; all others are returned unchanged.
///
/// # Examples
/// ```
/// use hstrat::newick::escape_label;
///
/// assert_eq!(escape_label("Pukeko"), "Pukeko");
/// assert_eq!(escape_label("Pu[ke]ko"), "'Pu[ke]ko'");
/// assert_eq!(escape_label("Swamp hen"), "'Swamp hen'");
/// assert_eq!(escape_label("Baillon's"), "'Baillon''s'");
/// ```
pub fn escape_label(label: &str) -> String {
    if needs_quoting(label) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

// =#========================================================================#=
// TESTS - ESCAPING
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_labels_unchanged() {
        assert_eq!(escape_label("42"), "42");
        assert_eq!(escape_label("taxon_7"), "taxon_7");
    }

    #[test]
    fn test_empty_label_quoted() {
        assert_eq!(escape_label(""), "''");
    }

    #[test]
    fn test_punctuation_quoted() {
        assert_eq!(escape_label("a,b"), "'a,b'");
        assert_eq!(escape_label("x:1"), "'x:1'");
        assert_eq!(escape_label("'q'"), "'''q'''");
    }
}
