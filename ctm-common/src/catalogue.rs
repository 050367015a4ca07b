//! K/S/E/C catalogue bulk edit
//!
//! The editor posts `item_id_<i>`, `item_<i>` and `item_type_<i>` for every
//! row in display order. A save rewrites the catalogue of one type in a single
//! transaction: posted ids are updated, rows without an id are created and
//! stored items that were not posted are deleted. Positions are renumbered per
//! category so codes stay contiguous (`GE(K)1`, `GE(K)2`, `CE(K)1`, ...).

use crate::codes::{KsecCategory, KsecType};
use crate::db::{curricula, ksec};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::info;

static ITEM_FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^item(_id|_type)?_(\d+)$").expect("static regex"));

/// One posted catalogue row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSubmission {
    pub id: Option<i64>,
    pub category: KsecCategory,
    pub description: String,
}

#[derive(Default)]
struct RawItem {
    id: Option<String>,
    description: Option<String>,
    category: Option<String>,
}

/// Parse editor fields into rows in form order
///
/// Rows with an empty description are dropped. A row with a description but
/// an unknown category is [`Error::InvalidInput`].
pub fn parse_items<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Vec<ItemSubmission>> {
    let mut raw: BTreeMap<u64, RawItem> = BTreeMap::new();
    for (key, value) in fields {
        let Some(caps) = ITEM_FIELD_RE.captures(key) else {
            continue;
        };
        let Ok(index) = caps[2].parse::<u64>() else {
            continue;
        };
        let entry = raw.entry(index).or_default();
        match caps.get(1).map(|m| m.as_str()) {
            Some("_id") => entry.id = Some(value.trim().to_string()),
            Some("_type") => entry.category = Some(value.trim().to_string()),
            _ => entry.description = Some(value.trim().to_string()),
        }
    }

    let mut items = Vec::new();
    for (index, item) in raw {
        let description = item.description.unwrap_or_default();
        if description.is_empty() {
            continue;
        }
        let category_text = item.category.unwrap_or_default();
        let category = KsecCategory::parse(&category_text).ok_or_else(|| {
            Error::invalid(format!("Row {} needs a GE or CE category, got '{}'", index + 1, category_text))
        })?;
        let id = match item.id.as_deref() {
            None | Some("") => None,
            Some(text) => Some(
                text.parse()
                    .map_err(|_| Error::invalid(format!("Bad item id '{}'", text)))?,
            ),
        };
        items.push(ItemSubmission {
            id,
            category,
            description,
        });
    }
    Ok(items)
}

/// Counts reported after a catalogue save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogueOutcome {
    pub updated: usize,
    pub created: usize,
    pub deleted: usize,
}

/// Replace the catalogue of one type with the posted rows
pub async fn save_catalogue(
    editable: &SqlitePool,
    curriculum_id: i64,
    ksec_type: KsecType,
    items: &[ItemSubmission],
) -> Result<CatalogueOutcome> {
    let mut tx = editable.begin().await?;
    curricula::require(&mut tx, curriculum_id).await?;

    let stored = ksec::list_type(&mut tx, curriculum_id, ksec_type).await?;
    let mut outcome = CatalogueOutcome::default();
    let mut keep: Vec<i64> = Vec::with_capacity(items.len());
    let mut positions: BTreeMap<KsecCategory, i64> = BTreeMap::new();

    for item in items {
        let position = positions.entry(item.category).or_insert(0);
        let sort_order = *position;
        *position += 1;

        match item.id.filter(|id| stored.iter().any(|s| s.id == *id)) {
            Some(id) => {
                ksec::update(&mut tx, id, item.category, &item.description, sort_order).await?;
                keep.push(id);
                outcome.updated += 1;
            }
            None => {
                let id = ksec::insert(
                    &mut tx,
                    curriculum_id,
                    ksec_type,
                    item.category,
                    &item.description,
                    sort_order,
                )
                .await?;
                keep.push(id);
                outcome.created += 1;
            }
        }
    }

    for old in stored.iter().filter(|s| !keep.contains(&s.id)) {
        ksec::delete(&mut tx, old.id).await?;
        outcome.deleted += 1;
    }

    curricula::bump_revision(&mut tx, curriculum_id).await?;
    tx.commit().await?;

    info!(
        "Saved {} catalogue of curriculum {}: {:?}",
        ksec_type.name(),
        curriculum_id,
        outcome
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_in_form_order() {
        let fields = vec![
            ("item_id_1", ""),
            ("item_1", "Teamwork"),
            ("item_type_1", "CE"),
            ("item_id_0", "7"),
            ("item_0", " Ethics basics "),
            ("item_type_0", "GE"),
            ("item_2", ""),
            ("item_type_2", "GE"),
            ("total_items", "3"),
        ];
        let items = parse_items(fields).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, Some(7));
        assert_eq!(items[0].description, "Ethics basics");
        assert_eq!(items[1].category, KsecCategory::Core);
        assert_eq!(items[1].id, None);
    }

    #[test]
    fn test_parse_items_bad_category() {
        let fields = vec![("item_0", "Something"), ("item_type_0", "XX")];
        assert!(matches!(parse_items(fields), Err(Error::InvalidInput(_))));
    }
}
