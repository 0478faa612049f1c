//! Application service: the flows a host UI drives.
//!
//! Every profile-scoped operation takes the active profile explicitly.
//! Log-generator runs are serialized by an internal generation lock.

use std::sync::Mutex;

use chrono::{Days, NaiveDateTime};
use thiserror::Error;

use crate::backup::{backup_file_name, BackupCodec, BackupError};
use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::db::KeyValueStore;
use crate::models::{
    date_string, Medication, MedicationLog, ModelError, NewMedication, Profile,
};
use crate::notifier::{Notifier, NotifierError};
use crate::schedule::{GenerationScheduler, LogGenerator, SchedulerOutcome};
use crate::store::{CascadeReport, EntityStore, StoreError};

/// Service errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No active profile selected")]
    NoActiveProfile,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("Reminder error: {0}")]
    Notifier(#[from] NotifierError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// The next upcoming dose of a medication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextDose {
    /// Time of day, `HH:MM`
    pub time: String,
    /// Whether the dose falls tomorrow rather than later today
    pub tomorrow: bool,
}

/// Medication reminder core over a key-value store and a reminder backend.
pub struct MedicaTime<S: KeyValueStore, N: Notifier> {
    store: EntityStore<S>,
    notifier: N,
    clock: Box<dyn Clock>,
    config: CoreConfig,
    generation: Mutex<()>,
}

impl<S: KeyValueStore, N: Notifier> MedicaTime<S, N> {
    /// Create a service on the device clock.
    pub fn new(kv: S, notifier: N, config: CoreConfig) -> Self {
        Self::with_clock(kv, notifier, Box::new(SystemClock), config)
    }

    pub fn with_clock(kv: S, notifier: N, clock: Box<dyn Clock>, config: CoreConfig) -> Self {
        let store = EntityStore::with_options(kv, config.storage_policy, &config.key_prefix);
        Self {
            store,
            notifier,
            clock,
            config,
            generation: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &EntityStore<S> {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Create a profile with a trimmed, non-empty name.
    pub fn create_profile(&self, name: &str) -> ServiceResult<Profile> {
        let profile = Profile::new(profile_name(name)?);
        self.store.add(&profile)?;
        Ok(profile)
    }

    /// Rename a profile, keeping the active pointer in sync.
    pub fn rename_profile(&self, id: &str, name: &str) -> ServiceResult<Profile> {
        let name = profile_name(name)?;
        let profile = self
            .store
            .get_profile(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("profile {}", id)))?
            .renamed(name);
        self.store.update(&profile)?;

        if matches!(self.store.active_profile()?, Some(active) if active.id == id) {
            self.store.set_active_profile(&profile)?;
        }
        Ok(profile)
    }

    /// Delete a profile with its medications, logs and reminders.
    pub fn delete_profile(&self, id: &str) -> ServiceResult<CascadeReport> {
        if self.store.get_profile(id)?.is_none() {
            return Err(ServiceError::NotFound(format!("profile {}", id)));
        }
        let medications = self.store.medications(Some(id))?;

        let report = {
            let _guard = self.generation.lock().unwrap_or_else(|e| e.into_inner());
            self.store.delete_profile(id)?
        };

        for medication in &medications {
            self.notifier.cancel(&medication.id)?;
        }
        Ok(report)
    }

    pub fn list_profiles(&self) -> ServiceResult<Vec<Profile>> {
        Ok(self.store.profiles()?)
    }

    // =========================================================================
    // Active profile
    // =========================================================================

    /// Make `profile` active and bring its dose window up to date.
    pub fn select_profile(&self, profile: &Profile) -> ServiceResult<SchedulerOutcome> {
        self.store.set_active_profile(profile)?;
        self.ensure_current(&profile.id)
    }

    pub fn active_profile(&self) -> ServiceResult<Option<Profile>> {
        Ok(self.store.active_profile()?)
    }

    pub fn require_active_profile(&self) -> ServiceResult<Profile> {
        self.active_profile()?.ok_or(ServiceError::NoActiveProfile)
    }

    /// Foreground hook: run the generation scheduler for the active profile.
    pub fn on_activate(&self) -> ServiceResult<SchedulerOutcome> {
        let profile = self.require_active_profile()?;
        self.ensure_current(&profile.id)
    }

    /// Run the generation scheduler for one profile.
    pub fn ensure_current(&self, profile_id: &str) -> ServiceResult<SchedulerOutcome> {
        let _guard = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        let scheduler =
            GenerationScheduler::new(&self.store, self.clock.as_ref(), self.config.days_ahead);
        Ok(scheduler.ensure_current(profile_id)?)
    }

    // =========================================================================
    // Medications
    // =========================================================================

    pub fn medications(&self, profile: &Profile) -> ServiceResult<Vec<Medication>> {
        Ok(self.store.medications(Some(&profile.id))?)
    }

    /// Validate and save a medication, fill its dose window and schedule its
    /// reminders.
    ///
    /// A failed window generation is logged and left to the next scheduler
    /// run; the medication stays saved.
    pub fn add_medication(
        &self,
        profile: &Profile,
        draft: NewMedication,
    ) -> ServiceResult<Medication> {
        let medication = draft.into_medication(&profile.id)?;
        self.store.add(&medication)?;
        self.fill_window(&medication);
        self.notifier.schedule(&medication)?;

        tracing::info!(
            profile_id = %profile.id,
            medication_id = %medication.id,
            times = medication.times.len(),
            "Added medication"
        );
        Ok(medication)
    }

    /// Replace a medication's fields and reschedule its reminders.
    ///
    /// Logs for newly added times are generated; logs of removed times stay.
    pub fn update_medication(&self, medication: Medication) -> ServiceResult<Medication> {
        let valid = NewMedication {
            name: medication.name,
            dose: medication.dose,
            route: medication.route,
            times: medication.times,
            notes: medication.notes,
        }
        .validate()?;
        let medication = Medication {
            name: valid.name,
            dose: valid.dose,
            route: valid.route,
            times: valid.times,
            notes: valid.notes,
            ..medication
        };

        if !self.store.update(&medication)? {
            return Err(ServiceError::NotFound(format!("medication {}", medication.id)));
        }
        self.fill_window(&medication);
        self.notifier.schedule(&medication)?;
        Ok(medication)
    }

    /// Delete a medication and cancel its reminders. Its logs are kept.
    pub fn delete_medication(&self, id: &str) -> ServiceResult<()> {
        if !self.store.delete_medication(id)? {
            return Err(ServiceError::NotFound(format!("medication {}", id)));
        }
        self.notifier.cancel(id)?;
        Ok(())
    }

    fn fill_window(&self, medication: &Medication) {
        let _guard = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        let generator = LogGenerator::new(&self.store, self.clock.as_ref());
        if let Err(e) = generator.generate_for_medication(medication, self.config.days_ahead) {
            tracing::warn!(
                medication_id = %medication.id,
                error = %e,
                "Dose window generation failed, deferring to next activation"
            );
        }
    }

    // =========================================================================
    // Doses
    // =========================================================================

    pub fn logs(&self, profile: &Profile) -> ServiceResult<Vec<MedicationLog>> {
        Ok(self.store.logs(Some(&profile.id))?)
    }

    /// Set a dose's taken state. `taken_at` defaults to now.
    pub fn record_dose(
        &self,
        log_id: &str,
        taken: bool,
        taken_at: Option<NaiveDateTime>,
    ) -> ServiceResult<MedicationLog> {
        let mut log = self
            .store
            .get_log(log_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("log {}", log_id)))?;

        if taken {
            log.mark_taken(taken_at.unwrap_or_else(|| self.clock.now()));
        } else {
            log.mark_not_taken();
        }

        if !self.store.update(&log)? {
            return Err(ServiceError::NotFound(format!("log {}", log_id)));
        }
        Ok(log)
    }

    pub fn mark_dose_taken_now(&self, log_id: &str) -> ServiceResult<MedicationLog> {
        self.record_dose(log_id, true, None)
    }

    /// Dose history: doses due by `now` first (most recent first), then
    /// upcoming doses (soonest first).
    pub fn dose_history(
        &self,
        profile: &Profile,
        medication_id: Option<&str>,
        now: NaiveDateTime,
    ) -> ServiceResult<Vec<MedicationLog>> {
        let logs = self
            .store
            .logs(Some(&profile.id))?
            .into_iter()
            .filter(|l| medication_id.map_or(true, |id| l.medication_id == id));

        let (mut past, mut upcoming): (Vec<_>, Vec<_>) = logs
            .map(|l| (l.scheduled_at(), l))
            .partition(|(at, _)| at.map_or(true, |at| at <= now));

        past.sort_by(|a, b| b.0.cmp(&a.0));
        upcoming.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(past.into_iter().chain(upcoming).map(|(_, l)| l).collect())
    }

    /// Next dose of a medication: the first untaken dose later today, else the
    /// first dose tomorrow, else the medication's first time tomorrow.
    pub fn next_dose(
        &self,
        profile: &Profile,
        medication: &Medication,
        now: NaiveDateTime,
    ) -> ServiceResult<Option<NextDose>> {
        let Some(first_time) = medication.times.first() else {
            return Ok(None);
        };
        let today = date_string(now.date());
        let tomorrow = now
            .date()
            .checked_add_days(Days::new(1))
            .map(date_string)
            .unwrap_or_default();

        let mut logs: Vec<MedicationLog> = self
            .store
            .logs(Some(&profile.id))?
            .into_iter()
            .filter(|l| l.medication_id == medication.id)
            .collect();
        logs.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));

        let later_today = logs.iter().find(|l| {
            l.date == today && !l.taken && l.scheduled_at().map_or(false, |at| at > now)
        });
        if let Some(time) = later_today.and_then(MedicationLog::time_of_day) {
            return Ok(Some(NextDose {
                time: time.to_string(),
                tomorrow: false,
            }));
        }

        let time = logs
            .iter()
            .find(|l| l.date == tomorrow)
            .and_then(MedicationLog::time_of_day)
            .unwrap_or(first_time);
        Ok(Some(NextDose {
            time: time.to_string(),
            tomorrow: true,
        }))
    }

    /// Most recent taken dose, by taken time falling back to scheduled time.
    pub fn last_taken(&self, medication: &Medication) -> ServiceResult<Option<MedicationLog>> {
        Ok(self
            .store
            .logs_for_medication(&medication.id)?
            .into_iter()
            .filter(|l| l.taken)
            .max_by_key(|l| l.taken_at().or_else(|| l.scheduled_at())))
    }

    // =========================================================================
    // Backup and data
    // =========================================================================

    /// Backup text and suggested file name for a profile.
    pub fn export_profile(&self, profile: &Profile) -> ServiceResult<(String, String)> {
        let text = BackupCodec::new(&self.store).export(profile)?;
        Ok((backup_file_name(profile), text))
    }

    /// Import a backup and make its profile active.
    pub fn import_backup(&self, text: &str) -> ServiceResult<Profile> {
        let profile = {
            let _guard = self.generation.lock().unwrap_or_else(|e| e.into_inner());
            BackupCodec::new(&self.store).import(text)?
        };
        self.store.set_active_profile(&profile)?;
        Ok(profile)
    }

    /// Remove all stored data and every reminder.
    pub fn clear_all_data(&self) -> ServiceResult<()> {
        {
            let _guard = self.generation.lock().unwrap_or_else(|e| e.into_inner());
            self.store.clear_all()?;
        }
        self.notifier.cancel_all()?;
        Ok(())
    }
}

fn profile_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ModelError::EmptyProfileName.into());
    }
    Ok(name.to_string())
}
