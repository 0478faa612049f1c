//! MedicaTime Core Library
//!
//! Local-first medication reminders: profiles, medication schedules, dose
//! logs and profile backups over a small key-value store.
//!
//! # Architecture
//!
//! ```text
//!   Host UI ──► MedicaTime service ──► Notifier (daily reminders)
//!                     │
//!          ┌──────────┼──────────────┬──────────────────┐
//!          ▼          ▼              ▼                  ▼
//!     Entity Store   Log Generator  Generation        Backup Codec
//!          │         (N-day window) Scheduler         (export/import,
//!          │              │         (once per day)     merge by name)
//!          │              └────────────┘
//!          ▼
//!   KeyValueStore (SQLite kv_store table / in-memory)
//! ```
//!
//! # Modules
//!
//! - [`db`]: key-value persistence (SQLite and in-memory)
//! - [`models`]: Profile, Medication, MedicationLog
//! - [`store`]: collection CRUD, cascades and singleton state
//! - [`schedule`]: log generation and its daily scheduler
//! - [`backup`]: single-profile backup export and import
//! - [`service`]: the application flows
//! - [`notifier`]: reminder scheduling seam

pub mod backup;
pub mod clock;
pub mod config;
pub mod db;
pub mod models;
pub mod notifier;
pub mod schedule;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use backup::{BackupCodec, BackupDocument, BackupError, BackupSummary};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use db::{KeyValueStore, MemoryKvStore, SqliteKvStore};
pub use models::{Medication, MedicationLog, MedicationRoute, NewMedication, Profile};
pub use notifier::{NoopNotifier, Notifier, NotifierError};
pub use schedule::{GenerationReport, GenerationScheduler, LogGenerator, SchedulerOutcome};
pub use service::{MedicaTime, NextDose, ServiceError};
pub use store::{EntityStore, StoragePolicy, StoreError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use clock::parse_timestamp;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedicaTimeError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid backup file: {0}")]
    MalformedBackup(String),

    #[error("No active profile selected")]
    NoActiveProfile,

    #[error("Reminder error: {0}")]
    ReminderError(String),
}

impl From<ServiceError> for MedicaTimeError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NoActiveProfile => MedicaTimeError::NoActiveProfile,
            ServiceError::NotFound(what) => MedicaTimeError::NotFound(what),
            ServiceError::Validation(e) => MedicaTimeError::InvalidInput(e.to_string()),
            ServiceError::Store(e) => e.into(),
            ServiceError::Backup(e) => e.into(),
            ServiceError::Notifier(e) => MedicaTimeError::ReminderError(e.to_string()),
        }
    }
}

impl From<StoreError> for MedicaTimeError {
    fn from(e: StoreError) -> Self {
        MedicaTimeError::StorageError(e.to_string())
    }
}

impl From<BackupError> for MedicaTimeError {
    fn from(e: BackupError) -> Self {
        match e {
            BackupError::MalformedBackup(reason) => MedicaTimeError::MalformedBackup(reason),
            BackupError::Store(e) => e.into(),
        }
    }
}

impl From<db::KvError> for MedicaTimeError {
    fn from(e: db::KvError) -> Self {
        MedicaTimeError::StorageError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedicaTimeError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedicaTimeError::StorageError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

type Service = MedicaTime<SqliteKvStore, NoopNotifier>;

/// Open or create a store at the given path.
///
/// Configuration is read from the environment.
#[uniffi::export]
pub fn open_store(path: String) -> Result<Arc<MedicaTimeCore>, MedicaTimeError> {
    let kv = SqliteKvStore::open(&path)?;
    Ok(MedicaTimeCore::wrap(MedicaTime::new(
        kv,
        NoopNotifier,
        CoreConfig::from_env(),
    )))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_store_in_memory() -> Result<Arc<MedicaTimeCore>, MedicaTimeError> {
    let kv = SqliteKvStore::open_in_memory()?;
    Ok(MedicaTimeCore::wrap(MedicaTime::new(
        kv,
        NoopNotifier,
        CoreConfig::default(),
    )))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe service wrapper for FFI.
///
/// Reminders are scheduled by the host from the returned medications.
#[derive(uniffi::Object)]
pub struct MedicaTimeCore {
    service: Arc<Mutex<Service>>,
}

impl MedicaTimeCore {
    fn wrap(service: Service) -> Arc<Self> {
        Arc::new(Self {
            service: Arc::new(Mutex::new(service)),
        })
    }
}

#[uniffi::export]
impl MedicaTimeCore {
    // =========================================================================
    // Profile Operations
    // =========================================================================

    pub fn create_profile(&self, name: String) -> Result<FfiProfile, MedicaTimeError> {
        let service = self.service.lock()?;
        Ok(service.create_profile(&name)?.into())
    }

    pub fn rename_profile(&self, id: String, name: String) -> Result<FfiProfile, MedicaTimeError> {
        let service = self.service.lock()?;
        Ok(service.rename_profile(&id, &name)?.into())
    }

    /// Delete a profile with its medications and logs.
    pub fn delete_profile(&self, id: String) -> Result<(), MedicaTimeError> {
        let service = self.service.lock()?;
        service.delete_profile(&id)?;
        Ok(())
    }

    pub fn list_profiles(&self) -> Result<Vec<FfiProfile>, MedicaTimeError> {
        let service = self.service.lock()?;
        Ok(service
            .list_profiles()?
            .into_iter()
            .map(|p| p.into())
            .collect())
    }

    /// Make a profile active and bring its dose window up to date.
    pub fn select_profile(&self, id: String) -> Result<FfiProfile, MedicaTimeError> {
        let service = self.service.lock()?;
        let profile = service
            .store()
            .get_profile(&id)?
            .ok_or_else(|| MedicaTimeError::NotFound(format!("profile {}", id)))?;
        service.select_profile(&profile)?;
        Ok(profile.into())
    }

    pub fn active_profile(&self) -> Result<Option<FfiProfile>, MedicaTimeError> {
        let service = self.service.lock()?;
        Ok(service.active_profile()?.map(|p| p.into()))
    }

    /// Foreground hook. Returns the number of dose logs generated.
    pub fn on_activate(&self) -> Result<u32, MedicaTimeError> {
        let service = self.service.lock()?;
        Ok(match service.on_activate()? {
            SchedulerOutcome::Generated(report) => report.created as u32,
            SchedulerOutcome::UpToDate { .. } => 0,
        })
    }

    // =========================================================================
    // Medication Operations (active profile)
    // =========================================================================

    pub fn add_medication(
        &self,
        name: String,
        dose: String,
        route: String,
        times: Vec<String>,
        notes: Option<String>,
    ) -> Result<FfiMedication, MedicaTimeError> {
        let service = self.service.lock()?;
        let profile = service.require_active_profile()?;
        let route = MedicationRoute::from_label(&route)
            .ok_or_else(|| MedicaTimeError::InvalidInput(format!("unknown route {}", route)))?;
        let draft = NewMedication {
            name,
            dose,
            route,
            times,
            notes,
        };
        Ok(service.add_medication(&profile, draft)?.into())
    }

    pub fn list_medications(&self) -> Result<Vec<FfiMedication>, MedicaTimeError> {
        let service = self.service.lock()?;
        let profile = service.require_active_profile()?;
        Ok(service
            .medications(&profile)?
            .into_iter()
            .map(|m| m.into())
            .collect())
    }

    pub fn delete_medication(&self, id: String) -> Result<(), MedicaTimeError> {
        let service = self.service.lock()?;
        service.delete_medication(&id)?;
        Ok(())
    }

    // =========================================================================
    // Dose Log Operations (active profile)
    // =========================================================================

    pub fn list_logs(&self) -> Result<Vec<FfiMedicationLog>, MedicaTimeError> {
        let service = self.service.lock()?;
        let profile = service.require_active_profile()?;
        Ok(service.logs(&profile)?.into_iter().map(|l| l.into()).collect())
    }

    /// Past doses first (most recent first), then upcoming doses.
    pub fn dose_history(
        &self,
        medication_id: Option<String>,
    ) -> Result<Vec<FfiMedicationLog>, MedicaTimeError> {
        let service = self.service.lock()?;
        let profile = service.require_active_profile()?;
        let now = service.now();
        Ok(service
            .dose_history(&profile, medication_id.as_deref(), now)?
            .into_iter()
            .map(|l| l.into())
            .collect())
    }

    /// Set a dose's taken state. `taken_time` defaults to now.
    pub fn record_dose(
        &self,
        log_id: String,
        taken: bool,
        taken_time: Option<String>,
    ) -> Result<FfiMedicationLog, MedicaTimeError> {
        let taken_at = match taken_time {
            Some(raw) => Some(
                parse_timestamp(&raw)
                    .ok_or_else(|| MedicaTimeError::InvalidInput(format!("timestamp {}", raw)))?,
            ),
            None => None,
        };
        let service = self.service.lock()?;
        Ok(service.record_dose(&log_id, taken, taken_at)?.into())
    }

    pub fn mark_dose_taken_now(&self, log_id: String) -> Result<FfiMedicationLog, MedicaTimeError> {
        let service = self.service.lock()?;
        Ok(service.mark_dose_taken_now(&log_id)?.into())
    }

    // =========================================================================
    // Backup Operations
    // =========================================================================

    /// Export the active profile as backup text.
    pub fn export_active_profile(&self) -> Result<String, MedicaTimeError> {
        let service = self.service.lock()?;
        let profile = service.require_active_profile()?;
        let (_, text) = service.export_profile(&profile)?;
        Ok(text)
    }

    /// Import backup text and make its profile active.
    pub fn import_backup(&self, text: String) -> Result<FfiProfile, MedicaTimeError> {
        let service = self.service.lock()?;
        Ok(service.import_backup(&text)?.into())
    }

    pub fn clear_all_data(&self) -> Result<(), MedicaTimeError> {
        let service = self.service.lock()?;
        service.clear_all_data()?;
        Ok(())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe profile.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProfile {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl From<Profile> for FfiProfile {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            created_at: profile.created_at,
        }
    }
}

/// FFI-safe medication.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    pub dose: String,
    pub route: String,
    pub times: Vec<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl From<Medication> for FfiMedication {
    fn from(medication: Medication) -> Self {
        Self {
            id: medication.id,
            profile_id: medication.profile_id,
            name: medication.name,
            dose: medication.dose,
            route: medication.route.label().to_string(),
            times: medication.times,
            notes: medication.notes,
            created_at: medication.created_at,
        }
    }
}

/// FFI-safe dose log.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationLog {
    pub id: String,
    pub profile_id: String,
    pub medication_id: String,
    pub scheduled_time: String,
    pub taken: bool,
    pub taken_time: Option<String>,
    pub date: String,
}

impl From<MedicationLog> for FfiMedicationLog {
    fn from(log: MedicationLog) -> Self {
        Self {
            id: log.id,
            profile_id: log.profile_id,
            medication_id: log.medication_id,
            scheduled_time: log.scheduled_time,
            taken: log.taken,
            taken_time: log.taken_time,
            date: log.date,
        }
    }
}
