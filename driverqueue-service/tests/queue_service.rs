use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use driverqueue_db::{create_pool, DbConnectionConfig, DbPool};
use driverqueue_notify::RecordingGateway;
use driverqueue_service::{
    phone, Clock, DriverStatus, QueueError, QueuePolicy, QueueService, RegisterDriver,
};

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        )))
    }

    fn advance(&self, secs: i64) {
        let mut now = self.0.lock().unwrap();
        *now += Duration::seconds(secs);
    }

    fn rewind(&self, secs: i64) {
        self.advance(-secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

struct Harness {
    service: QueueService,
    gateway: Arc<RecordingGateway>,
    clock: Arc<ManualClock>,
}

async fn migrated_pool(url: &str) -> DbPool {
    let pool = create_pool(&DbConnectionConfig::new(url)).await.unwrap();
    driverqueue_migrations::sqlite_migrator()
        .run(&pool)
        .await
        .unwrap();
    pool
}

async fn harness_with(gateway: RecordingGateway) -> Harness {
    let pool = migrated_pool("sqlite::memory:").await;
    let gateway = Arc::new(gateway);
    let clock = ManualClock::new();
    let service = QueueService::new(pool, gateway.clone(), QueuePolicy::default())
        .with_clock(clock.clone());
    Harness {
        service,
        gateway,
        clock,
    }
}

async fn harness() -> Harness {
    harness_with(RecordingGateway::new()).await
}

fn driver(plate: &str, name: &str, phone: &str) -> RegisterDriver {
    RegisterDriver {
        plate: plate.into(),
        name: name.into(),
        phone_number: phone.into(),
    }
}

#[tokio::test]
async fn register_enqueues_waiting_entry() {
    let h = harness().await;
    let entry = h
        .service
        .register(driver(" abc1234 ", "  Alice ", "(11) 99999-0000"))
        .await
        .unwrap();

    assert_eq!(entry.status, DriverStatus::Waiting);
    assert_eq!(entry.call_attempts, 0);
    assert_eq!(entry.plate, "ABC1234");
    assert_eq!(entry.name, "Alice");
    assert_eq!(entry.phone_number, "+5511999990000");
    assert!(phone::is_e164(&entry.phone_number));
    assert!(entry.called_time.is_none());
    assert_eq!(h.gateway.count(), 0);
}

#[tokio::test]
async fn register_reports_all_invalid_fields() {
    let h = harness().await;
    let err = h.service.register(driver("", "", "")).await.unwrap_err();
    match err {
        QueueError::Validation(issues) => {
            let fields: HashSet<_> = issues.iter().map(|i| i.field.as_str()).collect();
            assert_eq!(fields, HashSet::from(["plate", "name", "phoneNumber"]));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(h.service.list_waiting().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_plate_is_a_conflict_after_normalization() {
    let h = harness().await;
    h.service
        .register(driver("abc1234", "Alice", "+5511999990000"))
        .await
        .unwrap();
    let err = h
        .service
        .register(driver(" ABC1234", "Bob Driver", "+5511999990001"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::Conflict { ref plate } if plate == "ABC1234"));
}

#[tokio::test]
async fn call_next_on_empty_queue_does_nothing() {
    let h = harness().await;
    assert!(h.service.call_next().await.unwrap().is_none());
    assert_eq!(h.gateway.count(), 0);
    assert!(h.service.last_called().await.unwrap().is_none());
}

#[tokio::test]
async fn call_next_takes_oldest_entry_then_lowest_id() {
    let h = harness().await;
    let late = h
        .service
        .register(driver("LATE001", "Late Driver", "+5511999990001"))
        .await
        .unwrap();
    h.clock.rewind(60);
    let early_a = h
        .service
        .register(driver("EARLY01", "Early A", "+5511999990002"))
        .await
        .unwrap();
    let early_b = h
        .service
        .register(driver("EARLY02", "Early B", "+5511999990003"))
        .await
        .unwrap();
    assert_eq!(early_a.entry_time, early_b.entry_time);

    let waiting: Vec<_> = h
        .service
        .list_waiting()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(waiting, [early_a.id, early_b.id, late.id]);

    let order: Vec<_> = [
        h.service.call_next().await.unwrap().unwrap().id,
        h.service.call_next().await.unwrap().unwrap().id,
        h.service.call_next().await.unwrap().unwrap().id,
    ]
    .into();
    assert_eq!(order, [early_a.id, early_b.id, late.id]);
    assert!(h.service.call_next().await.unwrap().is_none());
}

#[tokio::test]
async fn call_next_sends_one_call_message() {
    let h = harness().await;
    h.service
        .register(driver("ABC1234", "Alice", "+5511999990000"))
        .await
        .unwrap();
    h.service.call_next().await.unwrap();

    let sent = h.gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "+5511999990000");
    assert!(sent[0].body.starts_with("Hello Alice, it's your turn"));
}

#[tokio::test]
async fn call_next_stays_called_when_notification_fails() {
    let h = harness_with(RecordingGateway::failing()).await;
    let registered = h
        .service
        .register(driver("ABC1234", "Alice", "+5511999990000"))
        .await
        .unwrap();

    let called = h.service.call_next().await.unwrap().unwrap();
    assert_eq!(called.id, registered.id);
    assert_eq!(called.status, DriverStatus::Called);
    assert_eq!(called.call_attempts, 1);
    assert_eq!(h.gateway.count(), 1);

    let stored = h.service.get(registered.id).await.unwrap();
    assert_eq!(stored.status, DriverStatus::Called);
    assert_eq!(stored.call_attempts, 1);
}

#[tokio::test]
async fn recall_below_limit_increments_and_notifies_once() {
    let h = harness().await;
    h.service
        .register(driver("ABC1234", "Alice", "+5511999990000"))
        .await
        .unwrap();
    let called = h.service.call_next().await.unwrap().unwrap();
    h.clock.advance(30);

    let recalled = h.service.recall(called.id).await.unwrap();
    assert_eq!(recalled.status, DriverStatus::Called);
    assert_eq!(recalled.call_attempts, called.call_attempts + 1);
    assert!(recalled.called_time > called.called_time);
    assert_eq!(h.gateway.count(), 2);
}

#[tokio::test]
async fn recall_at_limit_marks_no_show_silently() {
    let h = harness().await;
    h.service
        .register(driver("ABC1234", "Alice", "+5511999990000"))
        .await
        .unwrap();
    let called = h.service.call_next().await.unwrap().unwrap();
    let second = h.service.recall(called.id).await.unwrap();
    assert_eq!(second.call_attempts, 2);
    let before = h.gateway.count();

    let given_up = h.service.recall(called.id).await.unwrap();
    assert_eq!(given_up.status, DriverStatus::NoShow);
    assert_eq!(given_up.call_attempts, 2);
    assert_eq!(given_up.called_time, second.called_time);
    assert_eq!(h.gateway.count(), before);
}

#[tokio::test]
async fn recall_and_attend_require_called_status() {
    let h = harness().await;
    let waiting = h
        .service
        .register(driver("ABC1234", "Alice", "+5511999990000"))
        .await
        .unwrap();

    let err = h.service.recall(waiting.id).await.unwrap_err();
    assert!(matches!(
        err,
        QueueError::InvalidState {
            actual: DriverStatus::Waiting,
            expected: DriverStatus::Called,
            ..
        }
    ));
    let err = h.service.mark_attended(waiting.id).await.unwrap_err();
    assert!(matches!(err, QueueError::InvalidState { .. }));

    assert_eq!(h.service.get(waiting.id).await.unwrap(), waiting);
    assert_eq!(h.gateway.count(), 0);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let h = harness().await;
    assert!(matches!(h.service.get(99).await, Err(QueueError::NotFound(99))));
    assert!(matches!(h.service.recall(99).await, Err(QueueError::NotFound(99))));
    assert!(matches!(
        h.service.mark_attended(99).await,
        Err(QueueError::NotFound(99))
    ));
}

#[tokio::test]
async fn attended_is_terminal() {
    let h = harness().await;
    h.service
        .register(driver("ABC1234", "Alice", "+5511999990000"))
        .await
        .unwrap();
    let called = h.service.call_next().await.unwrap().unwrap();

    let attended = h.service.mark_attended(called.id).await.unwrap();
    assert_eq!(attended.status, DriverStatus::Attended);
    assert!(attended.status.is_terminal());
    assert_eq!(attended.call_attempts, 1);

    assert!(matches!(
        h.service.recall(called.id).await,
        Err(QueueError::InvalidState {
            actual: DriverStatus::Attended,
            ..
        })
    ));
    assert!(matches!(
        h.service.mark_attended(called.id).await,
        Err(QueueError::InvalidState { .. })
    ));
    assert!(h.service.list_called().await.unwrap().is_empty());
}

#[tokio::test]
async fn clear_waiting_only_touches_waiting_entries() {
    let h = harness().await;
    h.service
        .register(driver("CALL001", "Called One", "+5511999990000"))
        .await
        .unwrap();
    let called = h.service.call_next().await.unwrap().unwrap();
    h.clock.advance(1);
    for (i, plate) in ["WAIT001", "WAIT002", "WAIT003"].iter().enumerate() {
        h.service
            .register(driver(plate, "Waiting Driver", &format!("+551199999000{}", i + 1)))
            .await
            .unwrap();
    }

    assert_eq!(h.service.clear_waiting().await.unwrap(), 3);
    assert!(h.service.list_waiting().await.unwrap().is_empty());

    let still_called = h.service.get(called.id).await.unwrap();
    assert_eq!(still_called.status, DriverStatus::Called);
    assert_eq!(still_called.call_attempts, 1);

    let history = h.service.history(None).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history
        .iter()
        .all(|e| e.status == DriverStatus::Cleared && e.call_attempts == 0));

    assert_eq!(h.service.clear_waiting().await.unwrap(), 0);
}

#[tokio::test]
async fn list_called_is_most_recent_first() {
    let h = harness().await;
    for (plate, phone) in [("AAA0001", "+5511999990001"), ("AAA0002", "+5511999990002")] {
        h.service
            .register(driver(plate, "Some Driver", phone))
            .await
            .unwrap();
    }
    let first = h.service.call_next().await.unwrap().unwrap();
    h.clock.advance(10);
    let second = h.service.call_next().await.unwrap().unwrap();

    let called: Vec<_> = h
        .service
        .list_called()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(called, [second.id, first.id]);
}

#[tokio::test]
async fn last_called_follows_recalls() {
    let h = harness().await;
    for (plate, phone) in [("AAA0001", "+5511999990001"), ("AAA0002", "+5511999990002")] {
        h.service
            .register(driver(plate, "Some Driver", phone))
            .await
            .unwrap();
    }
    let first = h.service.call_next().await.unwrap().unwrap();
    h.clock.advance(10);
    let second = h.service.call_next().await.unwrap().unwrap();
    assert_eq!(h.service.last_called().await.unwrap().unwrap().id, second.id);

    h.clock.advance(10);
    h.service.recall(first.id).await.unwrap();
    assert_eq!(h.service.last_called().await.unwrap().unwrap().id, first.id);

    // Still reported after it leaves CALLED.
    h.service.mark_attended(first.id).await.unwrap();
    let last = h.service.last_called().await.unwrap().unwrap();
    assert_eq!(last.id, first.id);
    assert_eq!(last.status, DriverStatus::Attended);
}

#[tokio::test]
async fn history_limit_is_bounded() {
    let h = harness().await;
    assert!(matches!(
        h.service.history(Some(0)).await,
        Err(QueueError::Validation(_))
    ));
    assert!(matches!(
        h.service.history(Some(501)).await,
        Err(QueueError::Validation(_))
    ));
    assert!(h.service.history(Some(500)).await.unwrap().is_empty());
}

#[tokio::test]
async fn scenario_single_driver_reaches_no_show() {
    let h = harness().await;
    let alice = h
        .service
        .register(driver("ABC1234", "Alice", "+5511999990000"))
        .await
        .unwrap();

    let called = h.service.call_next().await.unwrap().unwrap();
    assert_eq!(called.id, alice.id);
    assert_eq!(called.status, DriverStatus::Called);
    assert_eq!(called.call_attempts, 1);

    let recalled = h.service.recall(alice.id).await.unwrap();
    assert_eq!(recalled.call_attempts, 2);
    assert_eq!(recalled.status, DriverStatus::Called);

    let no_show = h.service.recall(alice.id).await.unwrap();
    assert_eq!(no_show.status, DriverStatus::NoShow);
    assert_eq!(h.gateway.count(), 2);
}

#[tokio::test]
async fn scenario_two_drivers_called_in_arrival_order() {
    let h = harness().await;
    let a = h
        .service
        .register(driver("AAA1111", "Driver A", "+5511999990001"))
        .await
        .unwrap();
    h.clock.advance(5);
    let b = h
        .service
        .register(driver("BBB2222", "Driver B", "+5511999990002"))
        .await
        .unwrap();
    assert!(b.entry_time > a.entry_time);

    assert_eq!(h.service.call_next().await.unwrap().unwrap().id, a.id);
    assert_eq!(h.service.call_next().await.unwrap().unwrap().id, b.id);
}

#[tokio::test]
async fn concurrent_call_next_never_returns_the_same_entry() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("queue.sqlite").display());
    let pool = migrated_pool(&url).await;
    let gateway = Arc::new(RecordingGateway::new());
    let service =
        QueueService::new(pool, gateway.clone(), QueuePolicy::default()).with_max_retries(100);

    for i in 0..5 {
        service
            .register(driver(
                &format!("CONC{i:03}"),
                "Concurrent Driver",
                &format!("+55119999900{i:02}"),
            ))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.call_next().await }));
    }

    let mut called = Vec::new();
    for handle in handles {
        if let Some(entry) = handle.await.unwrap().unwrap() {
            called.push(entry.id);
        }
    }

    let unique: HashSet<_> = called.iter().copied().collect();
    assert_eq!(called.len(), 5);
    assert_eq!(unique.len(), 5);
    assert_eq!(gateway.count(), 5);
    assert!(service.list_waiting().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_call_next_with_default_retries_serves_every_caller() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("queue.sqlite").display());
    let pool = migrated_pool(&url).await;
    let gateway = Arc::new(RecordingGateway::new());
    let service = QueueService::new(pool, gateway.clone(), QueuePolicy::default());

    for i in 0..40 {
        service
            .register(driver(
                &format!("PAR{i:03}"),
                "Parallel Driver",
                &format!("+55119888800{i:02}"),
            ))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move { service.call_next().await }));
    }

    let mut called = Vec::new();
    for handle in handles {
        let entry = handle
            .await
            .unwrap()
            .expect("call_next must not report contention")
            .expect("drivers are still waiting");
        called.push(entry.id);
    }

    let unique: HashSet<_> = called.iter().copied().collect();
    assert_eq!(unique.len(), 16);
    assert_eq!(gateway.count(), 16);
    assert_eq!(service.list_waiting().await.unwrap().len(), 24);
}
