// 🗂️ Catalog Normalizer
// Flattens the interpreted catalogData literal into content-addressed price
// records. Invalid entries are dropped silently: the import is lossy by
// design and does not count or log what it skips.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::store::Fields;
use crate::value::Value;

/// Prefix tagging price item document ids.
pub const PRICE_ID_PREFIX: &str = "p_";

/// Hex characters of the digest kept in the id.
pub const PRICE_ID_HEX_LEN: usize = 16;

/// Normalized, persisted price item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    /// Document id; not stored as a field.
    #[serde(skip)]
    pub id: String,
    pub category: String,
    pub name: String,
    pub price1: f64,
    pub price2: f64,
    pub sort_category: usize,
    pub sort_item: usize,
    pub active: bool,
}

impl PriceRecord {
    /// Store fields for a merge write. `updatedAt` is added by the store.
    pub fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            // A struct of finite numbers, strings and bools always serializes
            // to an object.
            _ => Fields::new(),
        }
    }
}

/// Deterministic document id for a (category, name) pair:
/// `p_` + the first 16 hex chars of SHA-1 over `category + "\n" + name`.
///
/// Equal pairs collide on purpose; that is how re-imports overwrite instead
/// of duplicating.
pub fn price_record_id(category: &str, name: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(category.as_bytes());
    hasher.update(b"\n");
    hasher.update(name.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    format!("{PRICE_ID_PREFIX}{}", &hex[..PRICE_ID_HEX_LEN])
}

/// Flatten the catalog into records, in encounter order.
///
/// A category is skipped when its name trims to empty or `items` is not an
/// array. An item is skipped when its name trims to empty or either price is
/// not a finite number. Duplicated pairs are all emitted.
pub fn flatten_catalog(catalog: &[Value]) -> Vec<PriceRecord> {
    let mut out = Vec::new();

    for (cat_idx, cat) in catalog.iter().enumerate() {
        let category = cat.get("category").text_or_empty().trim().to_string();
        let items = match cat.get("items").as_array() {
            Some(items) if !category.is_empty() => items,
            _ => continue,
        };

        for (item_idx, item) in items.iter().enumerate() {
            let name = item.get("name").text_or_empty().trim().to_string();
            if name.is_empty() {
                continue;
            }
            let price1 = item.get("price1").to_number();
            let price2 = item.get("price2").to_number();
            if !price1.is_finite() || !price2.is_finite() {
                continue;
            }

            out.push(PriceRecord {
                id: price_record_id(&category, &name),
                category: category.clone(),
                name,
                price1,
                price2,
                sort_category: cat_idx,
                sort_item: item_idx,
                active: true,
            });
        }
    }

    out
}
