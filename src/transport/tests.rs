//! Transport Module Tests
//!
//! ## Test Scopes
//! - **Wire format**: envelope encoding, version and corruption handling.
//! - **Ingress**: text/malformed discard, accepting flag, queue hand-off.
//! - **Egress**: delivery mode, priority clamping, rollback on failure.
//! - **Loopback**: committed messages reach the listener, rolled-back ones never do.

#[cfg(test)]
mod tests {
    use crate::error::TransportError;
    use crate::job::types::{Job, JobBehavior};
    use crate::queue::BoundedPriorityQueue;
    use crate::transport::egress::{EgressAdapter, PublishTransaction, Publisher};
    use crate::transport::ingress::{IngressAdapter, MessageListener};
    use crate::transport::loopback::LoopbackTransport;
    use crate::transport::types::{
        DeliveryMode, ENVELOPE_VERSION, JobEnvelope, OutboundMessage, clamp_priority, decode_job,
        encode_job,
    };

    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn sample_job() -> Job {
        Job::new(
            "index_folder",
            serde_json::json!({ "folder": "/library/music", "depth": 3 }),
        )
        .with_priority(7)
        .with_behavior(JobBehavior::Delegate)
        .durable(true)
        .requires("search")
        .requires("extractor")
        .partitioned("shard-7")
        .recovered()
    }

    // ============================================================
    // WIRE FORMAT
    // ============================================================

    #[test]
    fn test_envelope_preserves_job() {
        let job = sample_job();

        let decoded = decode_job(&encode_job(&job).unwrap()).unwrap();

        assert_eq!(decoded, job);
        assert_eq!(decoded.priority(), 7);
        assert!(decoded.is_delegated());
    }

    #[test]
    fn test_unknown_envelope_version_is_malformed() {
        let mut envelope = JobEnvelope::from_job(&sample_job()).unwrap();
        envelope.version = ENVELOPE_VERSION + 1;
        let bytes = envelope.encode().unwrap();

        assert!(matches!(
            JobEnvelope::decode(&bytes),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn test_corrupt_bytes_are_malformed() {
        assert!(matches!(
            decode_job(&[0xde, 0xad, 0xbe, 0xef]),
            Err(TransportError::Decode(_))
        ));

        let mut envelope = JobEnvelope::from_job(&sample_job()).unwrap();
        envelope.payload_json = "{not json".to_string();
        let bytes = envelope.encode().unwrap();
        assert!(matches!(decode_job(&bytes), Err(TransportError::Decode(_))));
    }

    // ============================================================
    // INGRESS
    // ============================================================

    #[test]
    fn test_ingress_enqueues_decoded_jobs() {
        // ARRANGE
        let queue = Arc::new(BoundedPriorityQueue::new(16));
        let ingress = IngressAdapter::new(queue.clone());
        let job = sample_job();

        // ACT
        ingress.on_structured(&encode_job(&job).unwrap());

        // ASSERT
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_up_to(1)[0].job.id, job.id);
        assert_eq!(ingress.stats().accepted, 1);
    }

    #[test]
    fn test_ingress_discards_text_and_garbage() {
        let queue = Arc::new(BoundedPriorityQueue::new(16));
        let ingress = IngressAdapter::new(queue.clone());

        ingress.on_text("{\"kind\":\"index_folder\"}");
        ingress.on_structured(b"not an envelope");

        assert!(queue.is_empty());
        assert_eq!(ingress.stats().malformed, 2);
        assert!(ingress.is_accepting());
    }

    #[test]
    fn test_ingress_stopped_discards_messages() {
        let queue = Arc::new(BoundedPriorityQueue::new(16));
        let ingress = IngressAdapter::new(queue.clone());
        let bytes = encode_job(&sample_job()).unwrap();

        assert!(ingress.stop());
        assert!(!ingress.stop());
        ingress.on_structured(&bytes);
        assert!(queue.is_empty());
        assert_eq!(ingress.stats().discarded, 1);

        assert!(ingress.start());
        assert!(!ingress.start());
        ingress.on_structured(&bytes);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_ingress_counts_rejections() {
        // Capacity 1 holding a high priority job: a low priority arrival evicts itself.
        let queue = Arc::new(BoundedPriorityQueue::new(1));
        let ingress = IngressAdapter::new(queue.clone());
        queue.offer(Job::new("index_folder", serde_json::Value::Null).with_priority(9));

        ingress.on_structured(
            &encode_job(&Job::new("index_folder", serde_json::Value::Null).with_priority(1))
                .unwrap(),
        );
        queue.close();
        ingress.on_structured(&encode_job(&sample_job()).unwrap());

        assert_eq!(ingress.stats().rejected, 2);
        assert_eq!(ingress.stats().accepted, 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_listener_close_stops_ingress() {
        let ingress = IngressAdapter::new(Arc::new(BoundedPriorityQueue::new(4)));
        ingress.close();
        assert!(!ingress.is_accepting());
    }

    // ============================================================
    // EGRESS
    // ============================================================

    /// Publisher that records transaction calls and can fail on demand.
    #[derive(Default)]
    struct RecordingPublisher {
        fail_send: bool,
        fail_commit: bool,
        log: Arc<Mutex<Vec<String>>>,
        committed: Arc<Mutex<Vec<OutboundMessage>>>,
    }

    struct RecordingTransaction {
        fail_send: bool,
        fail_commit: bool,
        log: Arc<Mutex<Vec<String>>>,
        committed: Arc<Mutex<Vec<OutboundMessage>>>,
        pending: Vec<OutboundMessage>,
    }

    impl Publisher for RecordingPublisher {
        fn begin(&self) -> Result<Box<dyn PublishTransaction>, TransportError> {
            self.log.lock().push("begin".to_string());
            Ok(Box::new(RecordingTransaction {
                fail_send: self.fail_send,
                fail_commit: self.fail_commit,
                log: self.log.clone(),
                committed: self.committed.clone(),
                pending: Vec::new(),
            }))
        }
    }

    impl PublishTransaction for RecordingTransaction {
        fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
            self.log.lock().push("send".to_string());
            if self.fail_send {
                return Err(TransportError::Publish("broker refused".to_string()));
            }
            self.pending.push(message);
            Ok(())
        }

        fn commit(&mut self) -> Result<(), TransportError> {
            self.log.lock().push("commit".to_string());
            if self.fail_commit {
                return Err(TransportError::Commit("session lost".to_string()));
            }
            self.committed.lock().append(&mut self.pending);
            Ok(())
        }

        fn rollback(&mut self) {
            self.log.lock().push("rollback".to_string());
            self.pending.clear();
        }
    }

    #[test]
    fn test_priority_clamped_to_transport_range() {
        assert_eq!(clamp_priority(-5), 0);
        assert_eq!(clamp_priority(0), 0);
        assert_eq!(clamp_priority(4), 4);
        assert_eq!(clamp_priority(9), 9);
        assert_eq!(clamp_priority(42), 9);
    }

    #[test]
    fn test_egress_publishes_with_delivery_mode_and_priority() {
        // ARRANGE
        let publisher = Arc::new(RecordingPublisher::default());
        let egress = EgressAdapter::with_ttl(publisher.clone(), Some(Duration::from_secs(60)));
        let durable = Job::new("index_folder", serde_json::Value::Null)
            .with_priority(100)
            .durable(true);
        let transient = Job::new("refresh_thumbnail", serde_json::Value::Null).with_priority(3);

        // ACT
        egress.submit(&durable, None).unwrap();
        egress.submit(&transient, Some(-1)).unwrap();

        // ASSERT
        let committed = publisher.committed.lock();
        assert_eq!(committed.len(), 2);
        assert_eq!(committed[0].delivery, DeliveryMode::Persistent);
        assert_eq!(committed[0].priority, 9);
        assert_eq!(committed[0].ttl, Some(Duration::from_secs(60)));
        assert_eq!(committed[1].delivery, DeliveryMode::NonPersistent);
        assert_eq!(committed[1].priority, 0);
        assert_eq!(decode_job(&committed[1].body).unwrap().priority(), 3);
        assert_eq!(
            *publisher.log.lock(),
            vec!["begin", "send", "commit", "begin", "send", "commit"]
        );
    }

    #[test]
    fn test_egress_rolls_back_on_send_failure() {
        let publisher = Arc::new(RecordingPublisher {
            fail_send: true,
            ..Default::default()
        });
        let egress = EgressAdapter::new(publisher.clone());

        let result = egress.submit(&sample_job(), None);

        assert!(matches!(result, Err(TransportError::Publish(_))));
        assert_eq!(*publisher.log.lock(), vec!["begin", "send", "rollback"]);
        assert!(publisher.committed.lock().is_empty());
    }

    #[test]
    fn test_egress_rolls_back_on_commit_failure() {
        let publisher = Arc::new(RecordingPublisher {
            fail_commit: true,
            ..Default::default()
        });
        let egress = EgressAdapter::new(publisher.clone());

        let result = egress.submit(&sample_job(), None);

        assert!(matches!(result, Err(TransportError::Commit(_))));
        assert_eq!(
            *publisher.log.lock(),
            vec!["begin", "send", "commit", "rollback"]
        );
        assert!(publisher.committed.lock().is_empty());
    }

    // ============================================================
    // LOOPBACK
    // ============================================================

    #[tokio::test]
    async fn test_loopback_delivers_committed_messages_to_ingress() {
        // ARRANGE
        let queue = Arc::new(BoundedPriorityQueue::new(16));
        let ingress = IngressAdapter::new(queue.clone());
        let transport = LoopbackTransport::new();
        let delivery = transport.attach(ingress.clone()).unwrap();
        let egress = EgressAdapter::new(transport.clone());

        // ACT
        egress.submit(&sample_job(), None).unwrap();
        egress
            .submit(&Job::new("index_folder", serde_json::Value::Null), None)
            .unwrap();

        let mut rolled_back = transport.begin().unwrap();
        rolled_back
            .send(OutboundMessage {
                body: encode_job(&sample_job()).unwrap(),
                delivery: DeliveryMode::NonPersistent,
                priority: 0,
                ttl: None,
            })
            .unwrap();
        rolled_back.rollback();
        drop(rolled_back);

        transport.shutdown();
        delivery.await.unwrap();

        // ASSERT
        assert_eq!(queue.len(), 2);
        assert_eq!(transport.committed(), 2);
        assert_eq!(ingress.stats().accepted, 2);
        assert!(!ingress.is_accepting());
        assert!(matches!(transport.begin(), Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_loopback_commit_fails_when_delivery_is_gone() {
        // ARRANGE: a transaction with a pending message, then the delivery task dies.
        let queue = Arc::new(BoundedPriorityQueue::new(16));
        let ingress = IngressAdapter::new(queue.clone());
        let transport = LoopbackTransport::new();
        let delivery = transport.attach(ingress).unwrap();

        let mut tx = transport.begin().unwrap();
        tx.send(OutboundMessage {
            body: encode_job(&sample_job()).unwrap(),
            delivery: DeliveryMode::Persistent,
            priority: 4,
            ttl: None,
        })
        .unwrap();

        delivery.abort();
        let _ = delivery.await;

        // ACT
        let result = tx.commit();

        // ASSERT
        assert!(matches!(result, Err(TransportError::Commit(_))));
        assert_eq!(transport.committed(), 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_loopback_drops_expired_messages() {
        let queue = Arc::new(BoundedPriorityQueue::new(16));
        let ingress = IngressAdapter::new(queue.clone());
        let transport = LoopbackTransport::new();
        let egress = EgressAdapter::with_ttl(transport.clone(), Some(Duration::ZERO));

        egress.submit(&sample_job(), None).unwrap();
        let delivery = transport.attach(ingress).unwrap();
        transport.shutdown();
        delivery.await.unwrap();

        assert!(queue.is_empty());
        assert_eq!(transport.expired(), 1);
    }

    #[tokio::test]
    async fn test_loopback_single_listener() {
        let transport = LoopbackTransport::new();
        let ingress = IngressAdapter::new(Arc::new(BoundedPriorityQueue::new(4)));

        let first = transport.attach(ingress.clone()).unwrap();
        assert!(transport.attach(ingress).is_err());

        transport.shutdown();
        first.await.unwrap();
    }
}
