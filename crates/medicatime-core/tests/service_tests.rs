//! End-to-end service flows over both key-value backends.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use medicatime_core::clock::FixedClock;
use medicatime_core::config::CoreConfig;
use medicatime_core::db::{KeyValueStore, MemoryKvStore, SqliteKvStore};
use medicatime_core::models::{MedicationRoute, NewMedication, Profile};
use medicatime_core::notifier::NoopNotifier;
use medicatime_core::schedule::SchedulerOutcome;
use medicatime_core::service::{MedicaTime, ServiceError};
use medicatime_core::store::{StoragePolicy, StoreError};

fn morning(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medicatime_core=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn setup_service<S: KeyValueStore>(kv: S, config: CoreConfig) -> MedicaTime<S, NoopNotifier> {
    MedicaTime::with_clock(kv, NoopNotifier, Box::new(FixedClock::new(morning(1))), config)
}

fn draft(times: &[&str]) -> NewMedication {
    NewMedication {
        name: "Insulin".to_string(),
        dose: "10 units".to_string(),
        route: MedicationRoute::IntramuscularInjection,
        times: times.iter().map(|t| t.to_string()).collect(),
        notes: None,
    }
}

#[test]
fn test_cascade_delete_clears_active_profile() {
    init_tracing();
    let service = setup_service(MemoryKvStore::new(), CoreConfig::default());
    let mom = service.create_profile("Mom").unwrap();
    let dad = service.create_profile("Dad").unwrap();
    service.add_medication(&mom, draft(&["08:00"])).unwrap();
    service.add_medication(&dad, draft(&["09:00"])).unwrap();
    service.select_profile(&mom).unwrap();

    let report = service.delete_profile(&mom.id).unwrap();

    assert!(report.profile_removed);
    assert_eq!(report.medications_removed, 1);
    assert_eq!(report.logs_removed, 7);
    assert!(report.active_cleared);
    assert!(service.active_profile().unwrap().is_none());

    assert_eq!(service.list_profiles().unwrap(), vec![dad.clone()]);
    assert_eq!(service.medications(&dad).unwrap().len(), 1);
    assert_eq!(service.logs(&dad).unwrap().len(), 7);
    assert!(matches!(
        service.delete_profile(&mom.id),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn test_select_profile_runs_scheduler_once_per_day() {
    let service = setup_service(MemoryKvStore::new(), CoreConfig::default());
    let mom = service.create_profile("Mom").unwrap();
    service.add_medication(&mom, draft(&["08:00"])).unwrap();

    let first = service.select_profile(&mom).unwrap();
    let second = service.on_activate().unwrap();

    assert!(first.generated());
    assert!(matches!(second, SchedulerOutcome::UpToDate { .. }));
}

#[test]
fn test_lenient_policy_swallows_failures() {
    init_tracing();
    let service = setup_service(MemoryKvStore::new(), CoreConfig::default());
    let mom = service.create_profile("Mom").unwrap();

    service.store().kv().fail_reads(true);
    assert!(service.list_profiles().unwrap().is_empty());
    assert!(service.active_profile().unwrap().is_none());

    service.store().kv().fail_reads(false);
    service.store().kv().fail_writes(true);
    let ghost = service.create_profile("Ghost").unwrap();
    service.store().kv().fail_writes(false);

    let names: Vec<String> = service
        .list_profiles()
        .unwrap()
        .into_iter()
        .map(|p: Profile| p.name)
        .collect();
    assert_eq!(names, vec![mom.name]);
    assert_eq!(ghost.name, "Ghost");
}

#[test]
fn test_strict_policy_reports_failures() {
    let config = CoreConfig::default().with_storage_policy(StoragePolicy::Strict);
    let service = setup_service(MemoryKvStore::new(), config);
    service.create_profile("Mom").unwrap();

    service.store().kv().fail_reads(true);
    assert!(matches!(
        service.list_profiles(),
        Err(ServiceError::Store(StoreError::StorageRead { .. }))
    ));

    service.store().kv().fail_reads(false);
    service.store().kv().fail_writes(true);
    assert!(matches!(
        service.create_profile("Dad"),
        Err(ServiceError::Store(StoreError::StorageWrite { .. }))
    ));
}

#[test]
fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medicatime.db");

    let profile = {
        let service = setup_service(SqliteKvStore::open(&path).unwrap(), CoreConfig::default());
        let profile = service.create_profile("Mom").unwrap();
        service.add_medication(&profile, draft(&["08:00", "21:00"])).unwrap();
        service.select_profile(&profile).unwrap();
        profile
    };

    let clock = FixedClock::new(morning(1));
    clock.advance(Duration::days(1));
    let service = MedicaTime::with_clock(
        SqliteKvStore::open(&path).unwrap(),
        NoopNotifier,
        Box::new(clock),
        CoreConfig::default(),
    );

    assert_eq!(service.active_profile().unwrap(), Some(profile.clone()));
    assert_eq!(service.logs(&profile).unwrap().len(), 14);

    let outcome = service.on_activate().unwrap();
    assert!(outcome.generated());
    assert_eq!(service.logs(&profile).unwrap().len(), 16);
}

#[test]
fn test_clear_all_data() {
    let service = setup_service(MemoryKvStore::new(), CoreConfig::default());
    let mom = service.create_profile("Mom").unwrap();
    service.add_medication(&mom, draft(&["08:00"])).unwrap();
    service.select_profile(&mom).unwrap();

    service.clear_all_data().unwrap();

    assert!(service.store().kv().is_empty());
    assert!(service.store().last_generation().unwrap().is_none());
    assert!(matches!(
        service.on_activate(),
        Err(ServiceError::NoActiveProfile)
    ));
}
