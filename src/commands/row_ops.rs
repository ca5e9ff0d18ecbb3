use crate::models::ColumnMapping;

/// Move the field at `mapping.extract_pos` to `mapping.insert_pos`.
///
/// The row must be exactly as wide as the old headline; callers check the
/// width before reordering. All other fields keep their relative order and
/// their content.
pub fn reorder_row<T>(mut fields: Vec<T>, mapping: &ColumnMapping) -> Vec<T> {
    debug_assert!(mapping.extract_pos < fields.len());
    debug_assert!(mapping.insert_pos < fields.len());
    let extracted = fields.remove(mapping.extract_pos);
    fields.insert(mapping.insert_pos, extracted);
    fields
}
