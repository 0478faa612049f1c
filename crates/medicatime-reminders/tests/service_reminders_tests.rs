//! Reminder book driven by the core service.

use chrono::NaiveDate;
use proptest::prelude::*;

use medicatime_core::clock::FixedClock;
use medicatime_core::config::CoreConfig;
use medicatime_core::db::MemoryKvStore;
use medicatime_core::models::{MedicationRoute, NewMedication};
use medicatime_core::service::MedicaTime;
use medicatime_reminders::{resolve_response, PermissionState, ReminderBook};

fn setup_service(permission: PermissionState) -> MedicaTime<MemoryKvStore, ReminderBook> {
    let now = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(7, 0, 0)
        .unwrap();
    MedicaTime::with_clock(
        MemoryKvStore::new(),
        ReminderBook::new(permission),
        Box::new(FixedClock::new(now)),
        CoreConfig::default(),
    )
}

fn draft(times: Vec<String>) -> NewMedication {
    NewMedication {
        name: "Omeprazole".to_string(),
        dose: "20 mg".to_string(),
        route: MedicationRoute::Tablet,
        times,
        notes: None,
    }
}

#[test]
fn test_tapped_reminder_opens_existing_log() {
    let service = setup_service(PermissionState::Granted);
    let profile = service.create_profile("Me").unwrap();
    let medication = service
        .add_medication(&profile, draft(vec!["08:00".into(), "19:00".into()]))
        .unwrap();

    let reminders = service.notifier().pending_for(&medication.id);
    assert_eq!(reminders.len(), 2);

    let data = serde_json::to_value(&reminders[1].data).unwrap();
    let log_id = resolve_response(&data, service.now().date()).unwrap();
    let log = service.store().get_log(&log_id).unwrap().unwrap();
    assert_eq!(log.scheduled_time, "2024-01-01T19:00:00");
}

#[test]
fn test_delete_medication_cancels_reminders() {
    let service = setup_service(PermissionState::Granted);
    let profile = service.create_profile("Me").unwrap();
    let kept = service
        .add_medication(&profile, draft(vec!["08:00".into()]))
        .unwrap();
    let dropped = service
        .add_medication(&profile, draft(vec!["09:00".into()]))
        .unwrap();

    service.delete_medication(&dropped.id).unwrap();

    assert!(service.notifier().pending_for(&dropped.id).is_empty());
    assert_eq!(service.notifier().pending_for(&kept.id).len(), 1);
}

#[test]
fn test_profile_delete_and_clear_all_cancel_reminders() {
    let service = setup_service(PermissionState::Granted);
    let me = service.create_profile("Me").unwrap();
    let kid = service.create_profile("Kid").unwrap();
    service
        .add_medication(&me, draft(vec!["08:00".into()]))
        .unwrap();
    let kid_med = service
        .add_medication(&kid, draft(vec!["10:00".into()]))
        .unwrap();

    service.delete_profile(&me.id).unwrap();
    let pending = service.notifier().pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].data.medication_id, kid_med.id);

    service.clear_all_data().unwrap();
    assert!(service.notifier().pending().is_empty());
}

#[test]
fn test_denied_permission_still_saves_medication() {
    let service = setup_service(PermissionState::Denied);
    let profile = service.create_profile("Me").unwrap();

    let medication = service
        .add_medication(&profile, draft(vec!["08:00".into()]))
        .unwrap();

    assert!(service.notifier().pending().is_empty());
    assert_eq!(service.medications(&profile).unwrap(), vec![medication]);
    assert_eq!(service.logs(&profile).unwrap().len(), 7);
}

proptest! {
    #[test]
    fn prop_one_reminder_per_distinct_time(
        times in prop::collection::vec((0u32..24, 0u32..60), 1..6),
    ) {
        let service = setup_service(PermissionState::Granted);
        let profile = service.create_profile("Me").unwrap();
        let raw: Vec<String> = times.iter().map(|(h, m)| format!("{}:{:02}", h, m)).collect();

        let medication = service.add_medication(&profile, draft(raw)).unwrap();
        let reminders = service.notifier().pending_for(&medication.id);

        prop_assert_eq!(reminders.len(), medication.times.len());
        for (reminder, time) in reminders.iter().zip(&medication.times) {
            prop_assert_eq!(&reminder.data.time, time);
        }
    }
}
