//! `ErasureService`: request validation, grace-period scheduling,
//! legal-hold gating, the atomic execute state machine, and signed
//! certificate generation — the hardest component in the runtime.

use chrono::{DateTime, Duration, Utc};
use compliance_inventory::DataInventoryService;
use compliance_legal_hold::LegalHoldService;
use compliance_metrics::{BucketConfig, MetricRegistry, RateCounter, ValueHistogram};
use compliance_types::{
    CertificateSummary, ComplianceError, ContributorContext, ErasureCertificate, ErasureContributor, ErasureMethod,
    ErasureRequest, ErasureStatus, ErasureStatusKind, ErasureStore, InventorySummary, KeyManagementProvider,
    LegalHold, Result, VerificationMethod,
};
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_GRACE_PERIOD_HOURS: i64 = 72;
const MINIMUM_GRACE_PERIOD_HOURS: i64 = 1;
const MAXIMUM_GRACE_PERIOD_DAYS: i64 = 30;
const CERTIFICATE_RETENTION_YEARS: i64 = 7;
const MINIMUM_SIGNING_KEY_LEN: usize = 32;

/// Grace-period bounds and the certificate signing key. Defaults match
/// Reasonable production values; the signing key has no default and must be supplied.
pub struct ErasureServiceOptions {
    pub default_grace_period: Duration,
    pub minimum_grace_period: Duration,
    pub maximum_grace_period: Duration,
    pub signing_key: Vec<u8>,
}

impl ErasureServiceOptions {
    pub fn new(signing_key: Vec<u8>) -> Result<Self> {
        if signing_key.len() < MINIMUM_SIGNING_KEY_LEN {
            return Err(ComplianceError::configuration(format!(
                "certificate signing key must be at least {MINIMUM_SIGNING_KEY_LEN} bytes"
            )));
        }
        Ok(Self {
            default_grace_period: Duration::hours(DEFAULT_GRACE_PERIOD_HOURS),
            minimum_grace_period: Duration::hours(MINIMUM_GRACE_PERIOD_HOURS),
            maximum_grace_period: Duration::days(MAXIMUM_GRACE_PERIOD_DAYS),
            signing_key,
        })
    }
}

/// Result of `request_erasure`.
pub enum ScheduleResult {
    Scheduled {
        status: ErasureStatus,
        inventory_summary: Option<InventorySummary>,
    },
    Blocked {
        hold: LegalHold,
    },
}

/// Result of `execute`.
#[derive(Clone, Debug, Default)]
pub struct ExecutionResult {
    pub success: bool,
    pub keys_deleted: u32,
    pub records_affected: u64,
    pub exceptions: Vec<String>,
    pub failure_reason: Option<String>,
}

/// Context retained across `request_erasure` -> `execute` ->
/// `generate_certificate` that the persisted [`ErasureStatus`] alone
/// doesn't carry (tenant id, legal basis, original request timestamp).
struct RequestContext {
    tenant_id: Option<String>,
    legal_basis: String,
    requested_at: DateTime<Utc>,
    exceptions: Vec<String>,
}

pub struct ErasureService {
    store: Arc<dyn ErasureStore>,
    key_management: Arc<dyn KeyManagementProvider>,
    legal_hold: Option<Arc<LegalHoldService>>,
    inventory: Option<Arc<DataInventoryService>>,
    contributors: Vec<Arc<dyn ErasureContributor>>,
    options: ErasureServiceOptions,
    contexts: DashMap<Uuid, RequestContext>,
    requests_counter: Arc<RateCounter>,
    completed_counter: Arc<RateCounter>,
    blocked_counter: Arc<RateCounter>,
    execute_duration: Arc<ValueHistogram>,
}

impl ErasureService {
    pub fn new(
        store: Arc<dyn ErasureStore>,
        key_management: Arc<dyn KeyManagementProvider>,
        legal_hold: Option<Arc<LegalHoldService>>,
        inventory: Option<Arc<DataInventoryService>>,
        contributors: Vec<Arc<dyn ErasureContributor>>,
        options: ErasureServiceOptions,
        metrics: &MetricRegistry,
    ) -> Result<Self> {
        let requests_counter = metrics
            .counter("erasure_requests_total")
            .map_err(|e| ComplianceError::configuration(e.to_string()))?;
        let completed_counter = metrics
            .counter("erasure_completed_total")
            .map_err(|e| ComplianceError::configuration(e.to_string()))?;
        let blocked_counter = metrics
            .counter("erasure_blocked_total")
            .map_err(|e| ComplianceError::configuration(e.to_string()))?;
        let execute_duration = metrics
            .histogram("erasure_execute_duration_ms", BucketConfig::DefaultLatency)
            .map_err(|e| ComplianceError::configuration(e.to_string()))?;
        Ok(Self {
            store,
            key_management,
            legal_hold,
            inventory,
            contributors,
            options,
            contexts: DashMap::new(),
            requests_counter,
            completed_counter,
            blocked_counter,
            execute_duration,
        })
    }

    fn effective_grace_period(&self, override_grace: Option<Duration>) -> Duration {
        let requested = override_grace.unwrap_or(self.options.default_grace_period);
        requested
            .max(self.options.minimum_grace_period)
            .min(self.options.maximum_grace_period)
    }

    pub async fn request_erasure(&self, request: ErasureRequest) -> Result<ScheduleResult> {
        request.validate()?;
        self.requests_counter.increment(1);
        let hash = request.data_subject_id_hash();

        if let Some(legal_hold) = &self.legal_hold {
            if let Some(hold) = legal_hold
                .find_blocking_hold(&hash, request.id_type, request.tenant_id.as_deref())
                .await?
            {
                self.blocked_counter.increment(1);
                return Ok(ScheduleResult::Blocked { hold });
            }
        }

        let grace = self.effective_grace_period(request.grace_period_override);
        let execution_at = Utc::now() + grace;
        let status = self.store.save_request(&request, execution_at).await?;

        let inventory_summary = match &self.inventory {
            Some(inventory) => {
                let discovered = inventory.discover(&hash, request.tenant_id.as_deref()).await?;
                Some(InventorySummary::from(&discovered))
            }
            None => None,
        };

        self.contexts.insert(
            status.request_id,
            RequestContext {
                tenant_id: request.tenant_id.clone(),
                legal_basis: legal_basis_label(&request.legal_basis),
                requested_at: request.requested_at,
                exceptions: Vec::new(),
            },
        );

        Ok(ScheduleResult::Scheduled { status, inventory_summary })
    }

    pub async fn get_status(&self, request_id: Uuid) -> Result<Option<ErasureStatus>> {
        self.store.get_status(request_id).await
    }

    /// SLA reporting against the 30-day statutory deadline.
    pub async fn check_response_deadline(&self, request_id: Uuid) -> Result<crate::report::ComplianceReport> {
        let status = self
            .store
            .get_status(request_id)
            .await?
            .ok_or_else(|| ComplianceError::invariant(format!("erasure request {request_id} not found")))?;
        Ok(crate::report::compliance_report_for(&status, Utc::now()))
    }

    pub async fn cancel_erasure(&self, request_id: Uuid) -> Result<bool> {
        let Some(status) = self.store.get_status(request_id).await? else {
            return Ok(false);
        };
        if !status.can_cancel() {
            return Err(ComplianceError::StateTransition(format!(
                "request {request_id} cannot be cancelled from {:?}",
                status.status
            )));
        }
        self.store.record_cancellation(request_id).await?;
        Ok(true)
    }

    pub async fn execute(&self, request_id: Uuid) -> Result<ExecutionResult> {
        self.execute_duration.time_async(self.execute_inner(request_id)).await
    }

    async fn execute_inner(&self, request_id: Uuid) -> Result<ExecutionResult> {
        let Some(status) = self.store.get_status(request_id).await? else {
            return Err(ComplianceError::invariant(format!("erasure request {request_id} not found")));
        };
        if status.status != ErasureStatusKind::Scheduled {
            return Ok(ExecutionResult {
                success: false,
                failure_reason: Some(format!("request is not scheduled (current state: {:?})", status.status)),
                ..Default::default()
            });
        }

        let tenant_id = self.contexts.get(&request_id).and_then(|c| c.tenant_id.clone());

        if let Some(legal_hold) = &self.legal_hold {
            if let Some(hold) = legal_hold
                .find_blocking_hold(&status.data_subject_id_hash, compliance_types::IdType::Hash, tenant_id.as_deref())
                .await?
            {
                self.store.record_blocked(request_id, hold.hold_id).await?;
                self.blocked_counter.increment(1);
                return Ok(ExecutionResult {
                    success: false,
                    failure_reason: Some(format!("blocked by legal hold {}", hold.hold_id)),
                    ..Default::default()
                });
            }
        }

        let claimed = self
            .store
            .update_status(request_id, ErasureStatusKind::InProgress, Some(ErasureStatusKind::Scheduled))
            .await?;
        if !claimed {
            return Ok(ExecutionResult {
                success: false,
                failure_reason: Some("concurrent execution already claimed this request".to_string()),
                ..Default::default()
            });
        }

        let mut exceptions = Vec::new();
        let mut records_affected = 0u64;

        let context = ContributorContext {
            request_id,
            data_subject_id_hash: status.data_subject_id_hash.clone(),
            tenant_id: tenant_id.clone(),
        };
        for contributor in &self.contributors {
            match contributor.erase(&context).await {
                Ok(outcome) => {
                    records_affected += outcome.records_affected;
                    if !outcome.success {
                        let message = outcome.message.unwrap_or_else(|| "contributor reported failure".to_string());
                        tracing::warn!(contributor = contributor.name(), %message, "erasure contributor soft-failed");
                        exceptions.push(format!("{}: {}", contributor.name(), message));
                    }
                }
                Err(err) => {
                    tracing::warn!(contributor = contributor.name(), %err, "erasure contributor errored");
                    exceptions.push(format!("{}: {}", contributor.name(), err));
                }
            }
        }

        let mut keys_deleted = 0u32;
        if let Some(inventory) = &self.inventory {
            let discovered = match inventory.discover(&status.data_subject_id_hash, tenant_id.as_deref()).await {
                Ok(discovered) => discovered,
                Err(err) => {
                    let reason = format!("inventory discovery failed during execution: {err}");
                    tracing::error!(%request_id, %err, "erasure execution failed: inventory discovery error");
                    self.store.record_failure(request_id, &reason).await?;
                    return Ok(ExecutionResult {
                        success: false,
                        failure_reason: Some(reason),
                        ..Default::default()
                    });
                }
            };
            for key_ref in discovered.associated_keys {
                match self.key_management.delete_key(&key_ref.key_id, 0).await {
                    Ok(()) => keys_deleted += 1,
                    Err(err) => {
                        tracing::warn!(key_id = %key_ref.key_id, %err, "key deletion failed during erasure");
                        exceptions.push(format!("key {}: {}", key_ref.key_id, err));
                    }
                }
            }
        }

        self.store
            .record_completion(request_id, keys_deleted, records_affected, None)
            .await?;
        self.completed_counter.increment(1);

        if let Some(mut ctx) = self.contexts.get_mut(&request_id) {
            ctx.exceptions = exceptions.clone();
        }

        Ok(ExecutionResult {
            success: true,
            keys_deleted,
            records_affected,
            exceptions,
            failure_reason: None,
        })
    }

    pub async fn generate_certificate(&self, request_id: Uuid) -> Result<ErasureCertificate> {
        let status = self
            .store
            .get_status(request_id)
            .await?
            .ok_or_else(|| ComplianceError::invariant(format!("erasure request {request_id} not found")))?;
        if !status.is_executed() {
            return Err(ComplianceError::StateTransition(format!(
                "request {request_id} has not been executed (current state: {:?})",
                status.status
            )));
        }

        if let Some(cert_store) = self.store.certificate_store() {
            if let Some(existing) = cert_store.get_certificate(request_id).await? {
                return Ok(existing);
            }
        }

        let completed_at = status.completed_at.unwrap_or_else(Utc::now);
        let (legal_basis, request_received_at, exceptions) = match self.contexts.get(&request_id) {
            Some(ctx) => (ctx.legal_basis.clone(), ctx.requested_at, ctx.exceptions.clone()),
            None => ("UNKNOWN".to_string(), status.requested_at, Vec::new()),
        };

        let summary = CertificateSummary {
            keys_deleted: status.keys_deleted,
            records_affected: status.records_affected,
            contributors_invoked: self.contributors.len() as u32,
        };

        let mut certificate = ErasureCertificate {
            certificate_id: Uuid::new_v4(),
            request_id,
            data_subject_reference: status.data_subject_id_hash.clone(),
            request_received_at,
            completed_at,
            method: ErasureMethod::CryptographicErasure,
            summary,
            verification: vec![VerificationMethod::KeyDeletionConfirmed],
            legal_basis,
            exceptions,
            signature: String::new(),
            retain_until: completed_at + Duration::days(365 * CERTIFICATE_RETENTION_YEARS),
            format_version: ErasureCertificate::FORMAT_VERSION.to_string(),
            generated_at: Utc::now(),
        };
        certificate.signature = self.sign(&certificate);

        if let Some(cert_store) = self.store.certificate_store() {
            cert_store.save_certificate(certificate.clone()).await?;
        }

        Ok(certificate)
    }

    fn sign(&self, certificate: &ErasureCertificate) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.options.signing_key)
            .expect("HMAC accepts keys of any length");
        mac.update(&certificate.canonical_signing_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

fn legal_basis_label(basis: &compliance_types::LegalBasis) -> String {
    use compliance_types::LegalBasis;
    match basis {
        LegalBasis::ConsentWithdrawal => "ConsentWithdrawal".to_string(),
        LegalBasis::RightToObject => "RightToObject".to_string(),
        LegalBasis::NoLongerNecessary => "NoLongerNecessary".to_string(),
        LegalBasis::UnlawfulProcessing => "UnlawfulProcessing".to_string(),
        LegalBasis::LegalObligation => "LegalObligation".to_string(),
        LegalBasis::Other(label) => label.clone(),
    }
}
