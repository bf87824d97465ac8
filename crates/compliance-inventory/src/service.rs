//! `DataInventoryService`: composes registrations, previously
//! discovered locations, and live key lookups into a subject's inventory.

use compliance_types::{
    scope_from_purpose, DataInventory, DataInventoryStore, DataLocation, KeyManagementProvider, KeyReference, Result,
};
use std::sync::Arc;

pub struct DataInventoryService {
    store: Arc<dyn DataInventoryStore>,
    key_management: Arc<dyn KeyManagementProvider>,
}

impl DataInventoryService {
    pub fn new(store: Arc<dyn DataInventoryStore>, key_management: Arc<dyn KeyManagementProvider>) -> Self {
        Self { store, key_management }
    }

    /// Discovers a subject's inventory: registrations matching the
    /// request's scope, previously recorded locations, and — for each
    /// location's `key_id` — a live `KeyReference` derived from the key's
    /// purpose. Key-provider errors omit that reference rather than
    /// failing discovery.
    pub async fn discover(
        &self,
        data_subject_id_hash: &str,
        tenant_id: Option<&str>,
    ) -> Result<DataInventory> {
        let registrations = self.store.registrations_for(None, tenant_id).await?;
        let mut locations = self.store.discovered_locations(data_subject_id_hash).await?;

        // Registered field mappings with no recorded location yet still
        // describe a place this subject's data can live; fold them in as
        // locations with no confirmed key/size rather than dropping them.
        let mut seen_fields: std::collections::HashSet<(String, String)> = locations
            .iter()
            .map(|location| (location.table_name.clone(), location.field_name.clone()))
            .collect();
        for registration in &registrations {
            let field = (registration.table_name.clone(), registration.field_name.clone());
            if seen_fields.insert(field) {
                locations.push(DataLocation {
                    table_name: registration.table_name.clone(),
                    field_name: registration.field_name.clone(),
                    data_category: registration.data_category.clone(),
                    key_id: None,
                    estimated_size_bytes: 0,
                });
            }
        }

        let mut associated_keys = Vec::new();
        let mut seen_keys = std::collections::HashSet::new();
        for location in &locations {
            let Some(key_id) = &location.key_id else { continue };
            if !seen_keys.insert(key_id.clone()) {
                continue;
            }
            if let Ok(metadata) = self.key_management.get_key(key_id).await {
                associated_keys.push(KeyReference {
                    key_id: key_id.clone(),
                    scope: scope_from_purpose(metadata.purpose.as_deref()),
                });
            }
        }

        Ok(DataInventory {
            data_subject_id_hash: data_subject_id_hash.to_string(),
            locations,
            associated_keys,
        })
    }
}
