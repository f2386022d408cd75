//! Integration tests for the full provisioning pipeline.
//!
//! Tests: Queue → Consumer → (Dedup, Decoder, LedgerEngine) → Store
//!
//! Verifies:
//! - A duplicate delivery within the dedup TTL provisions exactly once
//! - Failed messages stay on the queue; successes are acknowledged
//! - The skip/delete policy on duplicates is an observable configuration
//! - Fatal transport errors stop the worker; shutdown joins cleanly

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mintbank_accounts::{
        InMemoryLedgerStore, LedgerEngine, LedgerError, LedgerStore, TransactionKind,
    };
    use mintbank_core::UserId;
    use mintbank_messaging::{
        ConsumerConfig, DedupStore, DuplicateAction, InMemoryDedupStore, InMemoryQueue,
        ProvisioningConsumer, ProvisioningRequest, QueueClient,
    };

    use crate::notify::RecordingNotifier;
    use crate::wiring::event_provisioning_handler;

    type Engine = LedgerEngine<Arc<InMemoryLedgerStore>, Arc<RecordingNotifier>>;

    struct Pipeline {
        queue: Arc<InMemoryQueue>,
        dedup: Arc<InMemoryDedupStore>,
        store: Arc<InMemoryLedgerStore>,
        notifier: Arc<RecordingNotifier>,
        engine: Arc<Engine>,
    }

    /// Wire up the whole pipeline over in-memory adapters. Visibility
    /// timeout zero: an unacknowledged message redelivers immediately.
    fn setup() -> Pipeline {
        mintbank_observability::init();
        let queue = Arc::new(InMemoryQueue::with_visibility_timeout(Duration::ZERO));
        let dedup = Arc::new(InMemoryDedupStore::new());
        let store = Arc::new(InMemoryLedgerStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = Arc::new(LedgerEngine::with_seed(
            Arc::clone(&store),
            Arc::clone(&notifier),
            42,
        ));
        Pipeline {
            queue,
            dedup,
            store,
            notifier,
            engine,
        }
    }

    fn consumer(
        p: &Pipeline,
        config: ConsumerConfig,
    ) -> ProvisioningConsumer<
        Arc<InMemoryQueue>,
        Arc<InMemoryDedupStore>,
        impl Fn(ProvisioningRequest) -> Result<(), LedgerError> + Send + 'static,
    > {
        ProvisioningConsumer::with_config(
            Arc::clone(&p.queue),
            Arc::clone(&p.dedup),
            event_provisioning_handler(Arc::clone(&p.engine)),
            config,
        )
    }

    fn quick_config() -> ConsumerConfig {
        ConsumerConfig::default().with_queue_wait(Duration::from_millis(10))
    }

    /// Mark a message id as already processed, as an earlier delivery
    /// would have.
    fn mark_processed(p: &Pipeline, message_id: &str) {
        p.dedup
            .set(
                &format!("account-event:{message_id}"),
                "processed",
                Duration::from_secs(3600),
            )
            .unwrap();
    }

    #[test]
    fn event_provisions_an_account_and_acknowledges() {
        let p = setup();
        let c = consumer(&p, quick_config());

        p.queue.send(&br#"{"userId":10,"userName":"Tester"}"#[..]);
        assert_eq!(c.poll_once().unwrap(), 1);

        let account = p
            .store
            .find_by_user_id(UserId::new(10))
            .unwrap()
            .expect("account should be provisioned");
        assert_eq!(account.user_name.as_deref(), Some("Tester"));
        assert!(account.balance >= 0);
        assert!(!p.store.transactions_for(account.id).unwrap().is_empty());

        // Acknowledged: nothing left to deliver, dedup mark set.
        assert_eq!(p.queue.visible_len(), 0);
        assert_eq!(p.queue.in_flight_len(), 0);
        assert_eq!(p.dedup.len(), 1);
        assert_eq!(p.notifier.events().len(), 1);
    }

    #[test]
    fn redelivery_after_a_crash_before_ack_provisions_exactly_once() {
        let p = setup();
        let c = consumer(&p, quick_config());

        // A previous consumer received this message and died before
        // acknowledging; the transport redelivers it with the same id.
        p.queue.send(&br#"{"userId":11}"#[..]);
        let stolen = p.queue.receive(Duration::ZERO, 1).unwrap();
        assert_eq!(stolen.len(), 1);

        assert_eq!(c.poll_once().unwrap(), 1);
        assert_eq!(p.store.account_count(), 1);
        assert_eq!(p.notifier.events().len(), 1);
        assert_eq!(p.queue.visible_len(), 0);
    }

    #[test]
    fn marked_message_is_skipped_without_reprocessing() {
        let p = setup();
        let c = consumer(&p, quick_config());

        let id = p.queue.send(&br#"{"userId":12}"#[..]);
        mark_processed(&p, &id);

        assert_eq!(c.poll_once().unwrap(), 1);

        // Skipped: no account, no notification, and with the default
        // policy the queue copy is left for its owning delivery.
        assert_eq!(p.store.account_count(), 0);
        assert!(p.notifier.events().is_empty());
        assert_eq!(p.queue.visible_len(), 1);
    }

    #[test]
    fn duplicate_delete_policy_drains_the_copy() {
        let p = setup();
        let config = quick_config().with_duplicate_action(DuplicateAction::Delete);
        let c = consumer(&p, config);

        let id = p.queue.send(&br#"{"userId":13}"#[..]);
        mark_processed(&p, &id);

        assert_eq!(c.poll_once().unwrap(), 1);

        assert_eq!(p.store.account_count(), 0);
        assert_eq!(p.queue.visible_len(), 0);
        assert_eq!(p.queue.in_flight_len(), 0);
    }

    #[test]
    fn same_payload_under_a_fresh_id_is_absorbed_by_the_ledger() {
        let p = setup();
        let c = consumer(&p, quick_config());

        // The dedup mark only covers the message id; a relay may re-emit
        // the same payload under a new id. Provisioning is idempotent per
        // user, so the second copy is acknowledged without a second
        // account or notification.
        p.queue.send(&br#"{"userId":14}"#[..]);
        assert_eq!(c.poll_once().unwrap(), 1);
        p.queue.send(&br#"{"userId":14}"#[..]);
        assert_eq!(c.poll_once().unwrap(), 1);

        assert_eq!(p.store.account_count(), 1);
        assert_eq!(p.notifier.events().len(), 1);
        assert_eq!(p.queue.visible_len(), 0);
    }

    #[test]
    fn malformed_message_stays_for_redelivery() {
        let p = setup();
        let c = consumer(&p, quick_config());

        p.queue.send(&b"{not json"[..]);
        assert_eq!(c.poll_once().unwrap(), 1);

        // Not acknowledged, not marked: the transport will redeliver.
        assert_eq!(p.queue.visible_len(), 1);
        assert_eq!(p.dedup.len(), 0);
        assert_eq!(p.store.account_count(), 0);
    }

    #[test]
    fn one_bad_message_does_not_abort_the_batch() {
        let p = setup();
        let c = consumer(&p, quick_config());

        p.queue.send(&br#"{"userName":"no-user-id"}"#[..]);
        p.queue.send(&br#"{"userId":15}"#[..]);

        assert_eq!(c.poll_once().unwrap(), 2);

        // The good message was provisioned and acknowledged; the bad one
        // is back on the queue.
        assert!(p.store.find_by_user_id(UserId::new(15)).unwrap().is_some());
        assert_eq!(p.queue.visible_len(), 1);
    }

    #[test]
    fn relay_wrapped_and_direct_payloads_provision_identical_accounts() {
        let p = setup();
        let c = consumer(&p, quick_config());

        p.queue
            .send(&br#"{"userId":16,"userName":"Wrapped","salary":"3000000"}"#[..]);
        p.queue.send(
            &br#"{"Type":"Notification","Message":"{\"userId\":17,\"userName\":\"Wrapped\",\"salary\":\"3000000\"}"}"#[..],
        );
        assert_eq!(c.poll_once().unwrap(), 2);

        let direct = p.store.find_by_user_id(UserId::new(16)).unwrap().unwrap();
        let wrapped = p.store.find_by_user_id(UserId::new(17)).unwrap().unwrap();
        assert_eq!(direct.user_name, wrapped.user_name);
        assert_eq!(direct.salary, wrapped.salary);
        assert_eq!(direct.salary, Some(3_000_000));
    }

    #[test]
    fn provisioned_account_supports_the_ledger_operations() {
        let p = setup();
        let c = consumer(&p, quick_config());

        p.queue.send(&br#"{"userId":18}"#[..]);
        assert_eq!(c.poll_once().unwrap(), 1);

        let user = UserId::new(18);
        let before = p.engine.account(user).unwrap().balance;
        let after = p.engine.deposit(user, 10_000, None).unwrap();
        assert_eq!(after.balance, before + 10_000);

        let txs = p.engine.transactions(user).unwrap();
        assert_eq!(txs[0].kind, TransactionKind::Deposit);
        assert_eq!(txs[0].amount, 10_000);
    }

    #[test]
    fn worker_processes_in_the_background_and_shuts_down() {
        let p = setup();
        let c = consumer(&p, quick_config().with_name("test-worker"));

        let handle = c.spawn();
        p.queue.send(&br#"{"userId":19}"#[..]);

        let mut provisioned = false;
        for _ in 0..100 {
            if p.store.find_by_user_id(UserId::new(19)).unwrap().is_some() {
                provisioned = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(provisioned);

        handle.shutdown();
    }

    #[test]
    fn fatal_transport_error_stops_the_worker() {
        let p = setup();
        let c = consumer(&p, quick_config());

        let handle = c.spawn();
        p.queue.close();

        // The worker exits on its own; shutdown just joins it.
        handle.shutdown();
    }
}
