//! Data inventory: where a subject's data lives and which keys protect it.

use crate::key::KeyScope;
use serde::{Deserialize, Serialize};

/// A single location a subject's data has been discovered at.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataLocation {
    pub table_name: String,
    pub field_name: String,
    pub data_category: String,
    pub key_id: Option<String>,
    pub estimated_size_bytes: u64,
}

/// Binds a `key_id` to the scope it protects, derived from the key's
/// purpose.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyReference {
    pub key_id: String,
    pub scope: KeyScope,
}

/// A registered field that a subject's data may appear in, as recorded by
/// `register`. Registration is validated at insert time: all five
/// string fields must be non-empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldRegistration {
    pub table_name: String,
    pub field_name: String,
    pub data_category: String,
    pub data_subject_id_column: String,
    pub key_id_column: String,
}

/// The discovery result for a subject: all known locations and the keys
/// protecting them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataInventory {
    pub data_subject_id_hash: String,
    pub locations: Vec<DataLocation>,
    pub associated_keys: Vec<KeyReference>,
}

/// Summary of discovered inventory returned alongside a schedule result
///.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InventorySummary {
    pub encrypted_field_count: usize,
    pub key_count: usize,
    pub data_categories: Vec<String>,
    pub affected_tables: Vec<String>,
    pub estimated_data_size_bytes: u64,
}

impl From<&DataInventory> for InventorySummary {
    fn from(inv: &DataInventory) -> Self {
        let mut data_categories: Vec<String> = inv
            .locations
            .iter()
            .map(|l| l.data_category.clone())
            .collect();
        data_categories.sort();
        data_categories.dedup();

        let mut affected_tables: Vec<String> =
            inv.locations.iter().map(|l| l.table_name.clone()).collect();
        affected_tables.sort();
        affected_tables.dedup();

        let encrypted_field_count = inv.locations.iter().filter(|l| l.key_id.is_some()).count();
        let estimated_data_size_bytes =
            inv.locations.iter().map(|l| l.estimated_size_bytes).sum();

        Self {
            encrypted_field_count,
            key_count: inv.associated_keys.len(),
            data_categories,
            affected_tables,
            estimated_data_size_bytes,
        }
    }
}
