use csv::StringRecord;

use crate::models::{NEW_QUOTED, OLD_QUOTED};

/// Classification of a runtime file by its headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderClass {
    AlreadyMigrated,
    EligibleForMigration,
    LengthMismatch { found: usize },
    HeaderMismatch,
}

/// Compare the raw headline (quotes kept as read) against both schemas.
///
/// The width check comes first, so a headline that is neither schema but has
/// the wrong width counts as a format error, not a mismatch. `None` stands
/// for a file without any record.
pub fn classify_header(header: Option<&StringRecord>) -> HeaderClass {
    let Some(header) = header else {
        return HeaderClass::LengthMismatch { found: 0 };
    };
    if header.len() != OLD_QUOTED.len() {
        return HeaderClass::LengthMismatch {
            found: header.len(),
        };
    }
    if matches_headline(header, &NEW_QUOTED) {
        HeaderClass::AlreadyMigrated
    } else if matches_headline(header, &OLD_QUOTED) {
        HeaderClass::EligibleForMigration
    } else {
        HeaderClass::HeaderMismatch
    }
}

fn matches_headline(header: &StringRecord, expected: &[String]) -> bool {
    header.iter().eq(expected.iter().map(String::as_str))
}
