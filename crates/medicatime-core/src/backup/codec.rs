//! Backup document format and the import merge.

use serde::{Deserialize, Serialize};

use super::{BackupError, BackupResult};
use crate::db::KeyValueStore;
use crate::models::{Medication, MedicationLog, Profile};
use crate::store::EntityStore;

/// A single-profile backup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupDocument {
    pub profile: Profile,
    pub medications: Vec<Medication>,
    pub logs: Vec<MedicationLog>,
}

impl BackupDocument {
    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Counts for a confirmation prompt.
    pub fn summary(&self) -> BackupSummary {
        BackupSummary {
            profile_name: self.profile.name.clone(),
            medications: self.medications.len(),
            logs: self.logs.len(),
        }
    }
}

/// What a backup contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSummary {
    pub profile_name: String,
    pub medications: usize,
    pub logs: usize,
}

/// Backup as found on disk, before validation.
#[derive(Debug, Deserialize)]
struct RawBackup {
    profile: Option<RawProfile>,
    medications: Option<Vec<Medication>>,
    logs: Option<Vec<MedicationLog>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    id: Option<String>,
    name: Option<String>,
    created_at: Option<String>,
}

/// Parse and validate backup text without touching storage.
///
/// A profile without an ID or creation time gets a fresh one. Missing
/// medication or log arrays read as empty.
pub fn parse_backup(text: &str) -> BackupResult<BackupDocument> {
    let raw: RawBackup =
        serde_json::from_str(text).map_err(|e| BackupError::MalformedBackup(e.to_string()))?;

    let profile = raw
        .profile
        .ok_or_else(|| BackupError::MalformedBackup("missing profile".into()))?;
    let name = profile
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| BackupError::MalformedBackup("profile has no name".into()))?;

    let mut resolved = Profile::new(name);
    if let Some(id) = profile.id.filter(|id| !id.is_empty()) {
        resolved.id = id;
    }
    if let Some(created_at) = profile.created_at.filter(|c| !c.is_empty()) {
        resolved.created_at = created_at;
    }

    Ok(BackupDocument {
        profile: resolved,
        medications: raw.medications.unwrap_or_default(),
        logs: raw.logs.unwrap_or_default(),
    })
}

/// Suggested file name for a profile's backup.
pub fn backup_file_name(profile: &Profile) -> String {
    format!("medicatime_{}.txt", profile.name)
}

/// Exports and imports profile backups against an [`EntityStore`].
pub struct BackupCodec<'a, S: KeyValueStore> {
    store: &'a EntityStore<S>,
}

impl<'a, S: KeyValueStore> BackupCodec<'a, S> {
    pub fn new(store: &'a EntityStore<S>) -> Self {
        Self { store }
    }

    /// Build the backup document for a profile.
    pub fn document(&self, profile: &Profile) -> BackupResult<BackupDocument> {
        Ok(BackupDocument {
            profile: profile.clone(),
            medications: self.store.medications(Some(&profile.id))?,
            logs: self.store.logs(Some(&profile.id))?,
        })
    }

    /// Export a profile with its medications and logs as JSON text.
    pub fn export(&self, profile: &Profile) -> BackupResult<String> {
        self.document(profile)?
            .to_json()
            .map_err(|e| BackupError::MalformedBackup(e.to_string()))
    }

    /// Import backup text, merging into an existing profile of the same name.
    ///
    /// A new profile keeps the backup's ID unless another profile already
    /// holds it, in which case it gets a fresh one.
    ///
    /// The whole document is validated before anything is written. The target
    /// profile's medications and logs are replaced by the backup's, re-owned
    /// by the target; other profiles are untouched.
    pub fn import(&self, text: &str) -> BackupResult<Profile> {
        let document = parse_backup(text)?;

        let (target, merged) = match self.store.find_profile_by_name(&document.profile.name)? {
            Some(existing) => (existing, true),
            None => {
                let mut profile = document.profile;
                if self.store.get_profile(&profile.id)?.is_some() {
                    let fresh = uuid::Uuid::new_v4().to_string();
                    tracing::debug!(
                        backup_id = %profile.id,
                        profile_id = %fresh,
                        "Backup profile ID already in use, reassigned"
                    );
                    profile.id = fresh;
                }
                self.store.add(&profile)?;
                (profile, false)
            }
        };

        let medications: Vec<Medication> = document
            .medications
            .into_iter()
            .map(|mut m| {
                m.profile_id = target.id.clone();
                m
            })
            .collect();
        let logs: Vec<MedicationLog> = document
            .logs
            .into_iter()
            .map(|mut l| {
                l.profile_id = target.id.clone();
                l
            })
            .collect();
        let (medication_count, log_count) = (medications.len(), logs.len());

        self.store.mutate::<Medication, _, _>(|records| {
            records.retain(|m| m.profile_id != target.id);
            records.extend(medications);
            ((), true)
        })?;
        self.store.replace_profile_logs(&target.id, logs)?;

        tracing::info!(
            profile_id = %target.id,
            merged,
            medications = medication_count,
            logs = log_count,
            "Imported backup"
        );

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKvStore;
    use crate::models::MedicationRoute;
    use chrono::NaiveDate;

    fn setup_store() -> EntityStore<MemoryKvStore> {
        EntityStore::new(MemoryKvStore::new())
    }

    fn profile(id: &str, name: &str) -> Profile {
        Profile {
            id: id.into(),
            name: name.into(),
            created_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    fn medication(id: &str, profile_id: &str) -> Medication {
        Medication {
            id: id.into(),
            profile_id: profile_id.into(),
            name: "Metformin".into(),
            dose: "850 mg".into(),
            route: MedicationRoute::Tablet,
            times: vec!["08:00".into(), "20:00".into()],
            notes: Some("with food".into()),
            created_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    fn log(medication_id: &str, profile_id: &str) -> MedicationLog {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        MedicationLog::scheduled(profile_id, medication_id, "08:00", date)
    }

    #[test]
    fn test_export_contains_only_profile_data() {
        let store = setup_store();
        let mom = profile("p1", "Mom");
        store.add(&mom).unwrap();
        store.add(&medication("m1", "p1")).unwrap();
        store.add(&medication("m2", "p2")).unwrap();
        store.add(&log("m1", "p1")).unwrap();
        store.add(&log("m2", "p2")).unwrap();

        let text = BackupCodec::new(&store).export(&mom).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["profile"]["name"], "Mom");
        assert_eq!(value["medications"].as_array().unwrap().len(), 1);
        assert_eq!(value["medications"][0]["id"], "m1");
        assert_eq!(value["logs"].as_array().unwrap().len(), 1);
        assert!(text.contains('\n'));
    }

    #[test]
    fn test_parse_defaults_missing_fields() {
        let document = parse_backup(r#"{"profile": {"name": "Dad"}}"#).unwrap();
        assert_eq!(document.profile.name, "Dad");
        assert_eq!(document.profile.id.len(), 36);
        assert!(document.medications.is_empty());
        assert!(document.logs.is_empty());

        let summary = document.summary();
        assert_eq!(summary.medications, 0);
        assert_eq!(summary.profile_name, "Dad");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "not json",
            "[]",
            r#"{"medications": []}"#,
            r#"{"profile": null}"#,
            r#"{"profile": {"id": "p1"}}"#,
            r#"{"profile": {"name": ""}}"#,
            r#"{"profile": {"name": "X"}, "medications": [{"id": 1}]}"#,
        ] {
            assert!(
                matches!(parse_backup(text), Err(BackupError::MalformedBackup(_))),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_import_new_profile_keeps_backup_id() {
        let store = setup_store();
        let text = r#"{
            "profile": {"id": "old-id", "name": "Grandpa", "createdAt": "2023-05-01T00:00:00Z"},
            "medications": [{"id": "m9", "profileId": "old-id", "name": "Aspirin",
                             "dose": "81 mg", "route": "Tablet", "times": ["09:00"],
                             "createdAt": "2023-05-01T00:00:00Z"}]
        }"#;

        let imported = BackupCodec::new(&store).import(text).unwrap();

        assert_eq!(imported.id, "old-id");
        assert_eq!(imported.created_at, "2023-05-01T00:00:00Z");
        assert_eq!(store.profiles().unwrap().len(), 1);
        assert_eq!(store.medications(Some("old-id")).unwrap().len(), 1);
    }

    #[test]
    fn test_import_merges_by_name() {
        let store = setup_store();
        store.add(&profile("local", "Mom")).unwrap();
        store.add(&medication("stale", "local")).unwrap();
        store.add(&log("stale", "local")).unwrap();
        store.add(&medication("other", "p2")).unwrap();

        let backup = BackupDocument {
            profile: profile("remote", "Mom"),
            medications: vec![medication("m1", "remote")],
            logs: vec![log("m1", "remote")],
        };
        let imported = BackupCodec::new(&store)
            .import(&backup.to_json().unwrap())
            .unwrap();

        assert_eq!(imported.id, "local");
        assert_eq!(store.profiles().unwrap().len(), 1);

        let medications = store.medications(Some("local")).unwrap();
        assert_eq!(medications.len(), 1);
        assert_eq!(medications[0].id, "m1");
        assert_eq!(medications[0].profile_id, "local");

        let logs = store.logs(Some("local")).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].profile_id, "local");

        assert_eq!(store.medications(Some("p2")).unwrap().len(), 1);
    }

    #[test]
    fn test_import_id_collision_gets_fresh_id() {
        let store = setup_store();
        store.add(&profile("p1", "Mother")).unwrap();
        store.add(&medication("m1", "p1")).unwrap();
        store.add(&log("m1", "p1")).unwrap();

        let backup = BackupDocument {
            profile: profile("p1", "Dad"),
            medications: vec![medication("m2", "p1")],
            logs: vec![log("m2", "p1")],
        };
        let imported = BackupCodec::new(&store)
            .import(&backup.to_json().unwrap())
            .unwrap();

        assert_ne!(imported.id, "p1");
        assert_eq!(imported.name, "Dad");

        let profiles = store.profiles().unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(store.get_profile("p1").unwrap().unwrap().name, "Mother");

        let mother_meds = store.medications(Some("p1")).unwrap();
        assert_eq!(mother_meds.len(), 1);
        assert_eq!(mother_meds[0].id, "m1");
        assert_eq!(store.logs(Some("p1")).unwrap().len(), 1);

        let dad_meds = store.medications(Some(&imported.id)).unwrap();
        assert_eq!(dad_meds.len(), 1);
        assert_eq!(dad_meds[0].id, "m2");
        assert_eq!(store.logs(Some(&imported.id)).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_import_writes_nothing() {
        let store = setup_store();
        store.add(&profile("p1", "Mom")).unwrap();
        let before = store.kv().raw("@medicatime_profiles");

        let result = BackupCodec::new(&store)
            .import(r#"{"profile": {"name": "Mom"}, "logs": [{"id": "x"}]}"#);

        assert!(matches!(result, Err(BackupError::MalformedBackup(_))));
        assert_eq!(store.kv().raw("@medicatime_profiles"), before);
        assert!(store.kv().raw("@medicatime_medications").is_none());
    }

    #[test]
    fn test_backup_file_name() {
        assert_eq!(backup_file_name(&profile("p1", "Mom")), "medicatime_Mom.txt");
    }
}
