//! Publish event ingestion
//!
//! Every report is an independent fact. Reports for the same run may arrive
//! out of order, repeat, or regress; all are appended as they come.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use apigw_core::PublishEventReport;

use super::{log_failure, ServiceError};
use crate::context::RequestContext;
use crate::storage::ControlStore;

/// Validates and appends publish pipeline progress reports
#[derive(Debug, Clone)]
pub struct PublishEventService {
    store: Arc<dyn ControlStore>,
}

impl PublishEventService {
    pub fn new(store: Arc<dyn ControlStore>) -> Self {
        Self { store }
    }

    /// Append one report to the ledger, stamped with the ingestion time
    pub async fn report(
        &self,
        ctx: &RequestContext,
        report: PublishEventReport,
    ) -> Result<(), ServiceError> {
        let result = self.append(ctx, report).await;
        if let Err(err) = &result {
            log_failure("report_publish_event", err);
        }
        result
    }

    async fn append(
        &self,
        ctx: &RequestContext,
        report: PublishEventReport,
    ) -> Result<(), ServiceError> {
        report.validate()?;

        let event = report.into_event(Utc::now());
        self.store
            .insert_publish_event(ctx, &event)
            .await
            .map_err(|err| match ServiceError::from(err) {
                // The ledger has no record to miss
                ServiceError::NotFound(what) => ServiceError::System(what),
                other => other,
            })?;

        info!(
            publish_id = event.publish_id,
            gateway = %event.gateway_name,
            stage = %event.stage_name,
            step = %event.step_name,
            rank = event.step_rank(),
            status = %event.status,
            "Recorded publish event"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use apigw_core::{EventDetail, PublishEventStatus};

    fn report(step: &str, status: PublishEventStatus) -> PublishEventReport {
        PublishEventReport {
            publish_id: 42,
            gateway_name: "benchmark".into(),
            stage_name: "dev".into(),
            step_name: step.into(),
            status,
            detail: EventDetail::new(),
        }
    }

    #[tokio::test]
    async fn test_out_of_order_and_regressions_accepted() {
        let store = Arc::new(MemoryStore::new());
        let svc = PublishEventService::new(store.clone());
        let ctx = RequestContext::background();

        svc.report(&ctx, report("load_configuration", PublishEventStatus::Success))
            .await
            .unwrap();
        svc.report(&ctx, report("generate_release_task", PublishEventStatus::Doing))
            .await
            .unwrap();
        svc.report(&ctx, report("generate_release_task", PublishEventStatus::Pending))
            .await
            .unwrap();

        let ranks: Vec<u8> = store
            .publish_events_for(42)
            .unwrap()
            .iter()
            .map(|e| e.step_rank())
            .collect();
        assert_eq!(ranks, vec![5, 1, 1]);
    }

    #[tokio::test]
    async fn test_unknown_step_stored_unranked() {
        let store = Arc::new(MemoryStore::new());
        let svc = PublishEventService::new(store.clone());

        svc.report(
            &RequestContext::background(),
            report("warm_caches", PublishEventStatus::Doing),
        )
        .await
        .unwrap();

        let events = store.publish_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].step_rank(), 0);
    }

    #[tokio::test]
    async fn test_missing_stage_rejected_before_storage() {
        let store = Arc::new(MemoryStore::new());
        let svc = PublishEventService::new(store.clone());
        let mut bad = report("parse_configuration", PublishEventStatus::Doing);
        bad.stage_name.clear();

        let err = svc
            .report(&RequestContext::background(), bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.publish_events().unwrap().is_empty());
    }
}
