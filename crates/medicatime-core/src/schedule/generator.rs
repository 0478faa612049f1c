//! Log generator: materializes the forward-looking dose window.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};

use crate::clock::Clock;
use crate::db::KeyValueStore;
use crate::models::{log_id, scheduled_time_string, Medication, MedicationLog};
use crate::store::{EntityStore, StoreResult};

/// Logs that must be added to complete a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationPlan {
    /// New untaken logs, in day-then-medication-then-time order
    pub new_logs: Vec<MedicationLog>,
    /// Slots that already had a log
    pub skipped: usize,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub profile_id: String,
    /// Number of logs added
    pub created: usize,
    /// Number of slots already covered
    pub skipped: usize,
    /// First and last day of the window (None for an empty window)
    pub window: Option<(NaiveDate, NaiveDate)>,
}

/// Consecutive days starting at `today`.
fn window_days(today: NaiveDate, days_ahead: u32) -> impl Iterator<Item = NaiveDate> {
    (0..u64::from(days_ahead)).map_while(move |offset| today.checked_add_days(Days::new(offset)))
}

/// First and last day of the window.
pub fn window_bounds(today: NaiveDate, days_ahead: u32) -> Option<(NaiveDate, NaiveDate)> {
    let last = window_days(today, days_ahead).last()?;
    Some((today, last))
}

/// Compute the logs missing from `existing` for the window.
///
/// A slot is covered when any existing log has its ID, or has the same
/// medication and scheduled time.
pub fn plan_missing_logs(
    profile_id: &str,
    medications: &[Medication],
    existing: &[MedicationLog],
    today: NaiveDate,
    days_ahead: u32,
) -> GenerationPlan {
    let mut known_ids: HashSet<String> = existing.iter().map(|l| l.id.clone()).collect();
    let mut known_slots: HashSet<(String, String)> = existing
        .iter()
        .map(|l| (l.medication_id.clone(), l.scheduled_time.clone()))
        .collect();

    let mut plan = GenerationPlan::default();

    for date in window_days(today, days_ahead) {
        for medication in medications {
            for time in &medication.times {
                let id = log_id(&medication.id, time, date);
                let slot = (medication.id.clone(), scheduled_time_string(time, date));

                if known_ids.contains(&id) || known_slots.contains(&slot) {
                    plan.skipped += 1;
                    continue;
                }

                plan.new_logs
                    .push(MedicationLog::scheduled(profile_id, &medication.id, time, date));
                known_ids.insert(id);
                known_slots.insert(slot);
            }
        }
    }

    plan
}

/// Appends missing logs for a profile's medications.
pub struct LogGenerator<'a, S: KeyValueStore> {
    store: &'a EntityStore<S>,
    clock: &'a dyn Clock,
}

impl<'a, S: KeyValueStore> LogGenerator<'a, S> {
    pub fn new(store: &'a EntityStore<S>, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Ensure logs exist for every medication of the profile over the next
    /// `days_ahead` days, then record the run.
    pub fn generate(&self, profile_id: &str, days_ahead: u32) -> StoreResult<GenerationReport> {
        let medications = self.store.medications(Some(profile_id))?;
        let existing = self.store.logs(Some(profile_id))?;
        let today = self.clock.today();

        let plan = plan_missing_logs(profile_id, &medications, &existing, today, days_ahead);
        let slots = plan.new_logs.len() + plan.skipped;

        tracing::debug!(
            profile_id = %profile_id,
            medications = medications.len(),
            existing = existing.len(),
            planned = plan.new_logs.len(),
            skipped = plan.skipped,
            "Planned log generation"
        );

        let created = self.append_missing(plan.new_logs)?;
        if created > 0 {
            tracing::info!(profile_id = %profile_id, created, "Generated dose logs");
        }

        self.store.set_last_generation(self.clock.now())?;

        Ok(GenerationReport {
            profile_id: profile_id.to_string(),
            created,
            skipped: slots - created,
            window: window_bounds(today, days_ahead),
        })
    }

    /// Materialize the window for a single, newly added medication.
    ///
    /// Uses the same IDs as [`generate`](Self::generate), so later runs find
    /// nothing to add. Does not record a generation run.
    pub fn generate_for_medication(
        &self,
        medication: &Medication,
        days_ahead: u32,
    ) -> StoreResult<GenerationReport> {
        let existing = self.store.logs(Some(&medication.profile_id))?;
        let today = self.clock.today();

        let plan = plan_missing_logs(
            &medication.profile_id,
            std::slice::from_ref(medication),
            &existing,
            today,
            days_ahead,
        );
        let slots = plan.new_logs.len() + plan.skipped;

        let created = self.append_missing(plan.new_logs)?;
        if created > 0 {
            tracing::info!(
                medication_id = %medication.id,
                created,
                "Generated dose logs for medication"
            );
        }

        Ok(GenerationReport {
            profile_id: medication.profile_id.clone(),
            created,
            skipped: slots - created,
            window: window_bounds(today, days_ahead),
        })
    }

    /// Append the planned logs whose ID and slot are still absent from the
    /// stored records. Returns how many were appended.
    ///
    /// The plan may come from a stale or degraded read, so it is checked
    /// again against the records loaded for the write.
    fn append_missing(&self, planned: Vec<MedicationLog>) -> StoreResult<usize> {
        if planned.is_empty() {
            return Ok(0);
        }

        self.store.mutate::<MedicationLog, _, _>(|records| {
            let missing: Vec<MedicationLog> = {
                let known_ids: HashSet<&str> = records.iter().map(|l| l.id.as_str()).collect();
                let known_slots: HashSet<(&str, &str)> = records
                    .iter()
                    .map(|l| (l.medication_id.as_str(), l.scheduled_time.as_str()))
                    .collect();

                planned
                    .into_iter()
                    .filter(|l| {
                        !known_ids.contains(l.id.as_str())
                            && !known_slots
                                .contains(&(l.medication_id.as_str(), l.scheduled_time.as_str()))
                    })
                    .collect()
            };

            let appended = missing.len();
            records.extend(missing);
            (appended, appended > 0)
        })
    }
}
