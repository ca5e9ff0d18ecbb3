use glob::Pattern;
use lazy_static::lazy_static;

/// File names picked up by the scan (fnmatch-style glob on the base name).
pub const SOURCE_PATTERN: &str = "*-runtime.csv";

/// Column layout of runtime files written before 4/2022.
pub const OLD_HEADLINE: [&str; 10] = [
    "Timestamp",
    "Runtime ms",
    "Samples count",
    "Notes count",
    "Platform ms",
    "Expense Factor",
    "Expense Factor(current)",
    "Delta ms",
    "MA Time short",
    "Tolerance",
];

/// Current column layout: the moving average moved next to the runtime.
pub const NEW_HEADLINE: [&str; 10] = [
    "Timestamp",
    "Runtime ms",
    "MA Time",
    "Samples",
    "Notes",
    "Platform ms",
    "Expense",
    "Expense(curr)",
    "Delta ms",
    "Tolerance",
];

/// Column whose value gets relocated.
const RELOCATED_COLUMN: &str = "MA Time short";
/// The relocated value lands right behind this column.
const ANCHOR_COLUMN: &str = "Runtime ms";

lazy_static! {
    pub static ref OLD_QUOTED: Vec<String> = quote(&OLD_HEADLINE);
    pub static ref NEW_QUOTED: Vec<String> = quote(&NEW_HEADLINE);
    pub static ref MAPPING: ColumnMapping =
        ColumnMapping::derive(&OLD_HEADLINE, RELOCATED_COLUMN, ANCHOR_COLUMN)
            .expect("relocated and anchor columns are part of OLD_HEADLINE");
    pub static ref RUNTIME_CSV: Pattern = Pattern::new(SOURCE_PATTERN).unwrap();
}

/// Single-column relocation from the old into the new row layout.
///
/// `extract_pos` indexes the old row, `insert_pos` indexes the row after the
/// extracted field has been removed. Both are below the row length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub extract_pos: usize,
    pub insert_pos: usize,
}

impl ColumnMapping {
    /// Locate `relocated` and `anchor` in `headline`; the relocated column is
    /// re-inserted directly behind the anchor.
    pub fn derive(headline: &[&str], relocated: &str, anchor: &str) -> Option<Self> {
        let extract_pos = headline.iter().position(|h| *h == relocated)?;
        let insert_pos = headline.iter().position(|h| *h == anchor)? + 1;
        if insert_pos >= headline.len() {
            return None;
        }
        Some(Self {
            extract_pos,
            insert_pos,
        })
    }
}

/// Wrap each label into literal double quotes, the way runtime files store
/// every field on disk.
pub fn quote<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels
        .iter()
        .map(|l| format!("\"{}\"", l.as_ref()))
        .collect()
}

/// Number of fields every record of a runtime file must carry.
pub fn expected_columns() -> usize {
    OLD_HEADLINE.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_derived_from_old_headline() {
        assert_eq!(MAPPING.extract_pos, 8);
        assert_eq!(MAPPING.insert_pos, 2);
        assert!(MAPPING.extract_pos < OLD_HEADLINE.len());
        assert!(MAPPING.insert_pos < OLD_HEADLINE.len());
    }

    #[test]
    fn derive_rejects_unknown_columns() {
        assert_eq!(ColumnMapping::derive(&OLD_HEADLINE, "Nope", "Runtime ms"), None);
        assert_eq!(ColumnMapping::derive(&OLD_HEADLINE, "MA Time short", "Nope"), None);
        // anchor at the end leaves no slot behind it
        assert_eq!(ColumnMapping::derive(&OLD_HEADLINE, "Timestamp", "Tolerance"), None);
    }

    #[test]
    fn quote_wraps_literal_double_quotes() {
        assert_eq!(quote(&["a", "b c"]), vec!["\"a\"", "\"b c\""]);
        assert_eq!(OLD_QUOTED[8], "\"MA Time short\"");
        assert_eq!(NEW_QUOTED[2], "\"MA Time\"");
    }

    #[test]
    fn pattern_matches_runtime_files_only() {
        assert!(RUNTIME_CSV.matches("synth-runtime.csv"));
        assert!(RUNTIME_CSV.matches("-runtime.csv"));
        assert!(!RUNTIME_CSV.matches("synth-expense.csv"));
        assert!(!RUNTIME_CSV.matches("synth-runtime.csv.tmp42"));
        assert!(!RUNTIME_CSV.matches("synth-Runtime.CSV"));
    }

    #[test]
    fn schemas_have_equal_width() {
        assert_eq!(OLD_HEADLINE.len(), NEW_HEADLINE.len());
        assert_eq!(expected_columns(), 10);
    }
}
