//! User-facing operations composed from the engine modules.
//!
//! Every read is scoped to the requesting user; a dataset owned by someone
//! else is reported exactly like a missing one.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::analytics::analyze;
use crate::dashboard::aggregate;
use crate::data::ingest;
use crate::error::{EngineError, Result};
use crate::logging::{log_failure, log_read, log_rejected, log_summary, log_upload, v_str, Domain, ProfileScope};
use crate::model::{AnalyticsRecord, Dashboard, Dataset, DatasetId, HistoryEntry};
use crate::report::{compose, ReportDocument};
use crate::retention::{Recorded, RetentionManager};
use crate::storage::DatasetStore;

pub struct AnalyticsEngine<S> {
    retention: RetentionManager<S>,
}

impl<S: DatasetStore> AnalyticsEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            retention: RetentionManager::new(store),
        }
    }

    fn store(&self) -> &S {
        self.retention.store()
    }

    /// Validate, summarize and record an upload. Nothing is stored when
    /// validation fails.
    pub fn upload(&self, user: &str, file_name: &str, bytes: &[u8]) -> Result<Recorded> {
        self.upload_at(user, file_name, bytes, Utc::now())
    }

    pub fn upload_at(&self, user: &str, file_name: &str, bytes: &[u8], uploaded_at: DateTime<Utc>) -> Result<Recorded> {
        let _scope = ProfileScope::with_context("upload", &[("user", v_str(user)), ("name", v_str(file_name))]);
        let new = ingest(file_name, bytes, uploaded_at).inspect_err(|e| log_rejected(user, file_name, e))?;
        log_summary(user, &new.name, &new.summary);
        let recorded = self.retention.record(user, new)?;
        let ds = &recorded.dataset;
        log_upload(user, ds.id.0, &ds.name, ds.summary.total_count, &ds.fingerprint);
        Ok(recorded)
    }

    pub fn history(&self, user: &str) -> Result<Vec<HistoryEntry>> {
        log_read(Domain::Store, "history", user, None);
        Ok(self.retention.list(user)?.iter().map(HistoryEntry::from).collect())
    }

    pub fn dataset(&self, user: &str, id: DatasetId) -> Result<Dataset> {
        log_read(Domain::Store, "dataset", user, Some(id.0));
        self.store()
            .get(user, id)?
            .ok_or(EngineError::NotFound { id })
            .inspect_err(|e| log_failure(Domain::Store, "dataset", user, e))
    }

    pub fn analytics(&self, user: &str, id: DatasetId) -> Result<AnalyticsRecord> {
        let ds = self.dataset(user, id)?;
        log_read(Domain::Analytics, "analytics", user, Some(id.0));
        analyze(&ds).inspect_err(|e| log_failure(Domain::Analytics, "analytics", user, e))
    }

    pub fn dashboard(&self, user: &str) -> Result<Dashboard> {
        let _scope = ProfileScope::new("dashboard");
        log_read(Domain::Dashboard, "dashboard", user, None);
        Ok(aggregate(&self.retention.list(user)?))
    }

    pub fn report(&self, user: &str, id: DatasetId) -> Result<ReportDocument> {
        let ds = self.dataset(user, id)?;
        log_read(Domain::Report, "report", user, Some(id.0));
        Ok(compose(&ds.name, &ds.summary))
    }

    pub fn delete(&self, user: &str, id: DatasetId) -> Result<()> {
        if self.store().delete(user, id)? {
            log_read(Domain::Store, "deleted", user, Some(id.0));
            Ok(())
        } else {
            Err(EngineError::NotFound { id })
        }
    }
}
