//! Marks form fields whose links were rejected by validation.
//!
//! Rejections are matched to fields by trimmed string equality. When several
//! fields hold the same link they are all marked; the protocol carries no
//! per-field identity to tell them apart.

use crate::api::RejectedLink;
use crate::page::LinkField;

/// Drops the invalid mark from every field.
pub fn clear_invalid_marks(fields: &mut [LinkField]) {
    for field in fields {
        field.invalid = false;
    }
}

/// Clears previous marks, then marks every field matching a rejected link.
///
/// Returns the number of fields marked.
pub fn mark_invalid_links(fields: &mut [LinkField], invalid: &[RejectedLink]) -> usize {
    clear_invalid_marks(fields);

    let mut marked = 0;
    for field in fields.iter_mut() {
        let value = field.value.trim();
        if invalid.iter().any(|link| link.url == value) {
            field.invalid = true;
            marked += 1;
        }
    }
    log::debug!("Marked {marked} field(s) invalid for {} rejection(s)", invalid.len());
    marked
}
