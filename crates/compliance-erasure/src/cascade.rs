//! `CascadeErasureResolver`: BFS traversal over the relationship
//! graph, forwarding each discovered subject to the erasure service.

use crate::service::{ErasureService, ScheduleResult};
use compliance_types::{CascadeRelationshipResolver, ErasureRequest, Result};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

/// Traversal controls.
#[derive(Clone, Debug)]
pub struct CascadeOptions {
    /// When `false`, only the root subject is forwarded to the erasure
    /// service; related subjects are still discovered and reported but not
    /// erased.
    pub include_related_records: bool,
    /// `N`: nodes at depth `N` are discovered but their neighbors are not
    /// explored.
    pub relationship_depth: u32,
    pub dry_run: bool,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self { include_related_records: true, relationship_depth: 0, dry_run: false }
    }
}

/// Template the cascade fills in per discovered subject id.
#[derive(Clone, Debug)]
pub struct CascadeErasureTemplate {
    pub id_type: compliance_types::IdType,
    pub tenant_id: Option<String>,
    pub scope: compliance_types::ErasureScope,
    pub legal_basis: compliance_types::LegalBasis,
    pub requested_by: String,
    pub data_categories: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct CascadeResult {
    pub success: bool,
    pub discovered_subjects: Vec<String>,
    pub scheduled_request_ids: Vec<Uuid>,
    pub error_message: Option<String>,
}

pub struct CascadeErasureResolver {
    relationships: Arc<dyn CascadeRelationshipResolver>,
    erasure: Arc<ErasureService>,
}

impl CascadeErasureResolver {
    pub fn new(relationships: Arc<dyn CascadeRelationshipResolver>, erasure: Arc<ErasureService>) -> Self {
        Self { relationships, erasure }
    }

    pub async fn cascade_erase(
        &self,
        root_subject_id: &str,
        template: CascadeErasureTemplate,
        options: CascadeOptions,
    ) -> Result<CascadeResult> {
        let mut visited = HashSet::new();
        visited.insert(root_subject_id.to_string());
        let mut discovered = vec![root_subject_id.to_string()];
        let mut queue = VecDeque::new();
        queue.push_back((root_subject_id.to_string(), 0u32));

        while let Some((subject, depth)) = queue.pop_front() {
            if depth >= options.relationship_depth {
                continue;
            }
            let related = match self.relationships.get_related_subjects(&subject).await {
                Ok(related) => related,
                Err(err) => {
                    return Ok(CascadeResult {
                        success: false,
                        discovered_subjects: discovered,
                        scheduled_request_ids: Vec::new(),
                        error_message: Some(format!("relationship lookup failed for {root_subject_id}: {err}")),
                    });
                }
            };
            for neighbor in related {
                if visited.insert(neighbor.clone()) {
                    discovered.push(neighbor.clone());
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        if options.dry_run {
            return Ok(CascadeResult { success: true, discovered_subjects: discovered, scheduled_request_ids: Vec::new(), error_message: None });
        }

        let mut scheduled = Vec::new();
        for (index, subject) in discovered.iter().enumerate() {
            let is_root = index == 0;
            if !is_root && !options.include_related_records {
                continue;
            }
            let request = ErasureRequest {
                request_id: Uuid::new_v4(),
                data_subject_id: subject.clone(),
                id_type: template.id_type,
                tenant_id: template.tenant_id.clone(),
                scope: template.scope,
                legal_basis: template.legal_basis.clone(),
                external_reference: None,
                requested_by: template.requested_by.clone(),
                requested_at: chrono::Utc::now(),
                grace_period_override: None,
                data_categories: template.data_categories.clone(),
                metadata: None,
            };
            match self.erasure.request_erasure(request).await {
                Ok(ScheduleResult::Scheduled { status, .. }) => scheduled.push(status.request_id),
                Ok(ScheduleResult::Blocked { .. }) => {}
                Err(err) => {
                    tracing::warn!(%subject, %err, "cascade erasure forwarding failed for subject");
                }
            }
        }

        Ok(CascadeResult { success: true, discovered_subjects: discovered, scheduled_request_ids: scheduled, error_message: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ErasureService, ErasureServiceOptions};
    use crate::store::InMemoryErasureStore;
    use async_trait::async_trait;
    use compliance_keys::InMemoryKeyManagementProvider;
    use compliance_metrics::MetricRegistry;
    use compliance_types::{ComplianceError, ErasureScope, IdType, LegalBasis};
    use dashmap::DashMap;

    struct GraphResolver {
        edges: DashMap<String, Vec<String>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl CascadeRelationshipResolver for GraphResolver {
        async fn get_related_subjects(&self, data_subject_id: &str) -> Result<Vec<String>> {
            if self.fail_for.as_deref() == Some(data_subject_id) {
                return Err(ComplianceError::invariant("relationship backend unavailable"));
            }
            Ok(self.edges.get(data_subject_id).map(|e| e.clone()).unwrap_or_default())
        }
    }

    fn template() -> CascadeErasureTemplate {
        CascadeErasureTemplate {
            id_type: IdType::UserId,
            tenant_id: None,
            scope: ErasureScope::User,
            legal_basis: LegalBasis::ConsentWithdrawal,
            requested_by: "dpo@example.com".to_string(),
            data_categories: None,
        }
    }

    fn resolver_for(name: Option<&str>, edges: &[(&str, &[&str])]) -> Arc<GraphResolver> {
        let map = DashMap::new();
        for (from, tos) in edges {
            map.insert(from.to_string(), tos.iter().map(|s| s.to_string()).collect());
        }
        Arc::new(GraphResolver { edges: map, fail_for: name.map(|s| s.to_string()) })
    }

    fn erasure_service() -> Arc<ErasureService> {
        let metrics = MetricRegistry::new();
        Arc::new(
            ErasureService::new(
                Arc::new(InMemoryErasureStore::new()),
                Arc::new(InMemoryKeyManagementProvider::new()),
                None,
                None,
                vec![],
                ErasureServiceOptions::new(vec![9u8; 32]).unwrap(),
                &metrics,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn diamond_graph_erases_each_node_once() {
        // A -> {B, C}, B -> {D}, C -> {D}
        let resolver = resolver_for(None, &[("root", &["b", "c"]), ("b", &["d"]), ("c", &["d"])]);
        let erasure = erasure_service();
        let cascade = CascadeErasureResolver::new(resolver, erasure);

        let result = cascade
            .cascade_erase("root", template(), CascadeOptions { include_related_records: true, relationship_depth: 5, dry_run: false })
            .await
            .unwrap();

        assert!(result.success);
        let mut subjects = result.discovered_subjects.clone();
        subjects.sort();
        subjects.dedup();
        assert_eq!(subjects.len(), result.discovered_subjects.len());
        assert_eq!(result.scheduled_request_ids.len(), 4);
    }

    #[tokio::test]
    async fn depth_bound_stops_expansion() {
        let resolver = resolver_for(None, &[("root", &["b"]), ("b", &["c"])]);
        let erasure = erasure_service();
        let cascade = CascadeErasureResolver::new(resolver, erasure);

        let result = cascade
            .cascade_erase("root", template(), CascadeOptions { include_related_records: true, relationship_depth: 1, dry_run: false })
            .await
            .unwrap();

        assert_eq!(result.discovered_subjects.len(), 2);
        assert!(!result.discovered_subjects.contains(&"c".to_string()));
    }

    #[tokio::test]
    async fn dry_run_discovers_without_scheduling() {
        let resolver = resolver_for(None, &[("root", &["b"])]);
        let erasure = erasure_service();
        let cascade = CascadeErasureResolver::new(resolver, erasure);

        let result = cascade
            .cascade_erase("root", template(), CascadeOptions { include_related_records: true, relationship_depth: 3, dry_run: true })
            .await
            .unwrap();

        assert_eq!(result.discovered_subjects.len(), 2);
        assert!(result.scheduled_request_ids.is_empty());
    }

    #[tokio::test]
    async fn exclude_related_records_only_erases_root() {
        let resolver = resolver_for(None, &[("root", &["b", "c"])]);
        let erasure = erasure_service();
        let cascade = CascadeErasureResolver::new(resolver, erasure);

        let result = cascade
            .cascade_erase("root", template(), CascadeOptions { include_related_records: false, relationship_depth: 2, dry_run: false })
            .await
            .unwrap();

        assert_eq!(result.discovered_subjects.len(), 3);
        assert_eq!(result.scheduled_request_ids.len(), 1);
    }

    #[tokio::test]
    async fn resolver_failure_aborts_cascade() {
        let resolver = resolver_for(Some("root"), &[("root", &["b"])]);
        let erasure = erasure_service();
        let cascade = CascadeErasureResolver::new(resolver, erasure);

        let result = cascade
            .cascade_erase("root", template(), CascadeOptions { include_related_records: true, relationship_depth: 2, dry_run: false })
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("root"));
    }
}
