use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::clients::dynamodb::{DynamoRecordStore, RecordStore};
use crate::clients::memory::{MemoryMatcher, MemoryObjectStore, MemoryRecordStore};
use crate::clients::rekognition::{FaceMatcher, RekognitionMatcher};
use crate::clients::s3::{ObjectStore, S3ObjectStore};
use crate::config::{BackendKind, Config};
use crate::services::{
    AccountService, AuditService, EnrollmentService, IdentityService, UploadSpool,
};

/// The three external collaborators, behind trait objects so deployment
/// (AWS), local development (memory) and tests can swap them freely.
pub struct Backends {
    pub matcher: Arc<dyn FaceMatcher>,
    pub objects: Arc<dyn ObjectStore>,
    pub records: Arc<dyn RecordStore>,
}

impl Backends {
    pub async fn from_config(config: &Config) -> Self {
        match config.backend {
            BackendKind::Aws => Self::aws(config).await,
            BackendKind::Memory => Self::memory(),
        }
    }

    async fn aws(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.aws.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        Self {
            matcher: Arc::new(RekognitionMatcher::new(
                &sdk_config,
                config.aws.collection_id.clone(),
            )),
            objects: Arc::new(S3ObjectStore::new(&sdk_config, config.aws.bucket.clone())),
            records: Arc::new(DynamoRecordStore::new(
                &sdk_config,
                config.aws.users_table.clone(),
                config.aws.logs_table.clone(),
            )),
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        Self {
            matcher: Arc::new(MemoryMatcher::new()),
            objects: Arc::new(MemoryObjectStore::new()),
            records: Arc::new(MemoryRecordStore::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub identity: Arc<IdentityService>,

    pub enrollment: Arc<EnrollmentService>,

    pub audit: Arc<AuditService>,

    pub accounts: Arc<AccountService>,

    pub records: Arc<dyn RecordStore>,

    pub uploads: UploadSpool,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub async fn from_config(
        config: Config,
        prometheus_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Arc<Self>> {
        config.validate()?;
        let backends = Backends::from_config(&config).await;
        Ok(Self::with_backends(config, backends, prometheus_handle))
    }

    /// Wires the service layer onto explicit backends. Tests use this to keep
    /// handles on the in-memory stores they pass in.
    #[must_use]
    pub fn with_backends(
        config: Config,
        backends: Backends,
        prometheus_handle: Option<PrometheusHandle>,
    ) -> Arc<Self> {
        let threshold = config.matcher.similarity_threshold;

        let identity = Arc::new(IdentityService::new(backends.matcher.clone(), threshold));
        let enrollment = Arc::new(EnrollmentService::new(
            backends.matcher,
            backends.objects,
            backends.records.clone(),
            threshold,
            config.enrollment.default_balance,
        ));
        let audit = Arc::new(AuditService::new(backends.records.clone()));
        let accounts = Arc::new(AccountService::new(backends.records.clone()));
        let uploads = UploadSpool::new(PathBuf::from(&config.general.upload_temp_dir));

        Arc::new(Self {
            config: Arc::new(config),
            identity,
            enrollment,
            audit,
            accounts,
            records: backends.records,
            uploads,
            prometheus_handle,
        })
    }

    /// Maximum age of spooled uploads before cleanup removes them.
    #[must_use]
    pub fn upload_max_age(&self) -> Duration {
        Duration::from_secs(self.config.maintenance.max_age_minutes * 60)
    }
}
