//! Lookup of normalized pavilion-name candidates against the registry.

use std::collections::HashSet;

use crate::models::Pavilion;
use crate::store::{Store, StoreError};

use super::pavilion_names::{collapse_whitespace, expand_location_to_pavilion_names};

/// Finds pavilions for a list of candidate names. Each name is tried as-is
/// and then with whitespace collapsed; the first store match wins. Results
/// are deduplicated by id and keep the order of first match. Names with no
/// match are skipped silently; the caller records them as unmatched.
pub fn find_pavilions_by_names(
    store: &mut dyn Store,
    names: &[String],
    building_id: Option<i32>,
) -> Result<Vec<Pavilion>, StoreError> {
    let mut found = Vec::new();
    let mut seen_ids = HashSet::new();

    for name in names {
        if name.is_empty() {
            continue;
        }

        for candidate in name_candidates(name) {
            if let Some(pavilion) = store.find_pavilion_by_name(&candidate, building_id)? {
                if seen_ids.insert(pavilion.id) {
                    found.push(pavilion);
                    break;
                }
            }
        }
    }

    Ok(found)
}

/// Resolves a raw location string to a single pavilion: expands it into
/// candidate names and returns the first match, if any.
pub fn find_pavilion_by_name(
    store: &mut dyn Store,
    location: &str,
    building_id: Option<i32>,
) -> Result<Option<Pavilion>, StoreError> {
    let names = expand_location_to_pavilion_names(location);
    let pavilions = find_pavilions_by_names(store, &names, building_id)?;
    Ok(pavilions.into_iter().next())
}

/// The lookup variants for one name: as-is, then whitespace-collapsed.
pub(crate) fn name_candidates(name: &str) -> Vec<String> {
    let mut candidates = vec![name.to_string()];
    let collapsed = collapse_whitespace(name);
    if collapsed != name && !collapsed.is_empty() {
        candidates.push(collapsed);
    }
    candidates
}
