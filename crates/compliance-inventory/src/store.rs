//! In-memory `DataInventoryStore` reference implementation.

use async_trait::async_trait;
use compliance_types::{ComplianceError, DataInventory, DataInventoryStore, DataLocation, FieldRegistration, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct InMemoryDataInventoryStore {
    // (table_name, field_name) -> registration
    registrations: DashMap<(String, String), FieldRegistration>,
    // data_subject_id_hash -> discovered locations
    discovered: RwLock<std::collections::HashMap<String, Vec<DataLocation>>>,
    registration_count: AtomicUsize,
    data_subject_count: AtomicUsize,
}

impl InMemoryDataInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.registrations.clear();
        self.discovered.write().clear();
        self.registration_count.store(0, Ordering::SeqCst);
        self.data_subject_count.store(0, Ordering::SeqCst);
    }
}

fn validate_registration(reg: &FieldRegistration) -> Result<()> {
    let fields = [
        ("table_name", &reg.table_name),
        ("field_name", &reg.field_name),
        ("data_category", &reg.data_category),
        ("data_subject_id_column", &reg.data_subject_id_column),
        ("key_id_column", &reg.key_id_column),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(ComplianceError::configuration(format!("{name} must not be empty")));
        }
    }
    Ok(())
}

#[async_trait]
impl DataInventoryStore for InMemoryDataInventoryStore {
    async fn register(&self, registration: FieldRegistration) -> Result<()> {
        validate_registration(&registration)?;
        let key = (registration.table_name.clone(), registration.field_name.clone());
        if self.registrations.insert(key, registration).is_none() {
            self.registration_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn unregister(&self, table_name: &str, field_name: &str) -> Result<bool> {
        let removed = self
            .registrations
            .remove(&(table_name.to_string(), field_name.to_string()))
            .is_some();
        if removed {
            self.registration_count.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(removed)
    }

    async fn registrations_for(&self, _id_type_hint: Option<&str>, _tenant_id: Option<&str>) -> Result<Vec<FieldRegistration>> {
        Ok(self.registrations.iter().map(|e| e.value().clone()).collect())
    }

    async fn discovered_locations(&self, data_subject_id_hash: &str) -> Result<Vec<DataLocation>> {
        Ok(self
            .discovered
            .read()
            .get(data_subject_id_hash)
            .cloned()
            .unwrap_or_default())
    }

    async fn record_discovery(&self, inventory: DataInventory) -> Result<()> {
        let mut discovered = self.discovered.write();
        if !discovered.contains_key(&inventory.data_subject_id_hash) {
            self.data_subject_count.fetch_add(1, Ordering::SeqCst);
        }
        discovered.insert(inventory.data_subject_id_hash, inventory.locations);
        Ok(())
    }

    fn registration_count(&self) -> usize {
        self.registration_count.load(Ordering::SeqCst)
    }

    fn data_subject_count(&self) -> usize {
        self.data_subject_count.load(Ordering::SeqCst)
    }
}
