//! Job Module Tests
//!
//! ## Test Scopes
//! - **Registry**: registration, lookup, invocation, and the built-in diagnostic handler.
//! - **Data Types**: builder defaults, owned mutators, and wire serialization of `Job`.

#[cfg(test)]
mod tests {
    use crate::error::JobError;
    use crate::job::registry::{JobContext, JobHandler, JobHandlerRegistry};
    use crate::job::types::{
        Capability, DIAGNOSTIC_JOB_KIND, Job, JobBehavior, JobId, JobOrigin,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ============================================================
    // REGISTRY
    // ============================================================

    #[tokio::test]
    async fn test_registry_register_and_invoke() {
        // ARRANGE
        let registry = JobHandlerRegistry::new();
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        registry.register("index_folder", move |job| {
            let count = call_count_clone.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::json!({ "indexed": job.payload["path"] }))
            }
        });

        // ACT
        let result = registry
            .invoke(
                "index_folder",
                serde_json::json!({ "path": "/books" }),
                &JobContext::default(),
            )
            .await;

        // ASSERT
        assert_eq!(result.unwrap(), serde_json::json!({ "indexed": "/books" }));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(registry.has_handler("index_folder"));
    }

    #[tokio::test]
    async fn test_registry_unknown_kind_is_typed_error() {
        let registry = JobHandlerRegistry::new();

        let result = registry
            .invoke("missing", serde_json::Value::Null, &JobContext::default())
            .await;

        assert!(matches!(result, Err(JobError::UnknownHandler(kind)) if kind == "missing"));
    }

    #[tokio::test]
    async fn test_registry_handler_failure_is_wrapped() {
        let registry = JobHandlerRegistry::new();
        registry.register("failing", |_job| async {
            Err(anyhow::anyhow!("Intentional error"))
        });

        let result = registry
            .invoke("failing", serde_json::Value::Null, &JobContext::default())
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, JobError::Failed(_)));
        assert!(err.to_string().contains("Intentional error"));
    }

    #[test]
    fn test_registry_has_diagnostic_handler_by_default() {
        let registry = JobHandlerRegistry::new();

        assert!(registry.has_handler(DIAGNOSTIC_JOB_KIND));
        assert_eq!(registry.handler_count(), 1);
    }

    #[tokio::test]
    async fn test_registry_custom_handler_hooks() {
        struct Counting {
            before: AtomicUsize,
            after: AtomicUsize,
        }

        #[async_trait]
        impl JobHandler for Counting {
            async fn before_execute(&self, _job: &Job) {
                self.before.fetch_add(1, Ordering::SeqCst);
            }

            async fn perform(
                &self,
                _job: &Job,
                _ctx: &JobContext,
            ) -> anyhow::Result<serde_json::Value> {
                Ok(serde_json::Value::Null)
            }

            async fn after_execute(&self, _job: &Job, _error: Option<&JobError>) {
                self.after.fetch_add(1, Ordering::SeqCst);
            }
        }

        let registry = JobHandlerRegistry::new();
        let handler = Arc::new(Counting {
            before: AtomicUsize::new(0),
            after: AtomicUsize::new(0),
        });
        registry.register_handler("counting", handler.clone());

        let resolved = registry.get("counting").expect("handler registered");
        let job = Job::new("counting", serde_json::Value::Null);
        resolved.before_execute(&job).await;
        resolved.after_execute(&job, None).await;

        assert_eq!(handler.before.load(Ordering::SeqCst), 1);
        assert_eq!(handler.after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_context_reports_interrupt() {
        let token = tokio_util::sync::CancellationToken::new();
        let ctx = JobContext::new(token.clone());

        assert!(!ctx.is_interrupted());
        token.cancel();
        assert!(ctx.is_interrupted());
    }

    // ============================================================
    // JOB
    // ============================================================

    #[test]
    fn test_job_id_is_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_job_defaults() {
        let job = Job::new("index_folder", serde_json::Value::Null);

        assert_eq!(job.priority(), 0);
        assert_eq!(job.behavior(), JobBehavior::ConsumerRuns);
        assert_eq!(job.origin, JobOrigin::Active);
        assert!(!job.durable);
        assert!(job.required_capabilities.is_empty());
        assert!(job.shard_key.is_none());
    }

    #[test]
    fn test_job_mutators_only_touch_own_fields() {
        let mut job = Job::new("index_folder", serde_json::Value::Null)
            .with_priority(3)
            .requires("search-backend");

        job.set_priority(9);
        job.set_behavior(JobBehavior::Delegate);

        assert_eq!(job.priority(), 9);
        assert!(job.is_delegated());
        assert!(
            job.required_capabilities
                .contains(&Capability::new("search-backend"))
        );
    }

    #[test]
    fn test_diagnostic_job_is_delegated_noop() {
        let job = Job::diagnostic();

        assert_eq!(job.kind, DIAGNOSTIC_JOB_KIND);
        assert_eq!(job.behavior(), JobBehavior::Delegate);
        assert!(job.required_capabilities.is_empty());
    }

    #[test]
    fn test_job_json_serialization() {
        let job = Job::new("index_folder", serde_json::json!({ "path": "/a" }))
            .with_priority(-2)
            .durable(true)
            .requires("search-backend")
            .partitioned("shard-7")
            .recovered();

        let json = serde_json::to_string(&job).expect("Serialization failed");
        let restored: Job = serde_json::from_str(&json).expect("Deserialization failed");

        assert_eq!(restored, job);
    }
}
