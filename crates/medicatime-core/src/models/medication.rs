//! Medication models and dose-time parsing.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::{ModelError, ModelResult};

/// How a medication is administered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MedicationRoute {
    #[default]
    #[serde(rename = "Tablet")]
    Tablet,
    #[serde(rename = "Spoon/Syrup")]
    Syrup,
    #[serde(rename = "Intramuscular Injection")]
    IntramuscularInjection,
    #[serde(rename = "Intravenous Injection")]
    IntravenousInjection,
    #[serde(rename = "Inhaler")]
    Inhaler,
    #[serde(rename = "Drop")]
    Drop,
    #[serde(rename = "Cream")]
    Cream,
}

impl MedicationRoute {
    /// All routes, in picker order.
    pub const ALL: [MedicationRoute; 7] = [
        MedicationRoute::Tablet,
        MedicationRoute::Syrup,
        MedicationRoute::IntramuscularInjection,
        MedicationRoute::IntravenousInjection,
        MedicationRoute::Inhaler,
        MedicationRoute::Drop,
        MedicationRoute::Cream,
    ];

    /// Stored label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            MedicationRoute::Tablet => "Tablet",
            MedicationRoute::Syrup => "Spoon/Syrup",
            MedicationRoute::IntramuscularInjection => "Intramuscular Injection",
            MedicationRoute::IntravenousInjection => "Intravenous Injection",
            MedicationRoute::Inhaler => "Inhaler",
            MedicationRoute::Drop => "Drop",
            MedicationRoute::Cream => "Cream",
        }
    }

    /// Parse a stored label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.label() == label)
    }
}

/// A recurring drug/dose definition with one or more daily intake times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// Opaque unique ID
    pub id: String,
    /// Owning profile ID
    #[serde(default)]
    pub profile_id: String,
    /// Medication name
    pub name: String,
    /// Free-text dose (e.g., "500 mg", "2 puffs")
    pub dose: String,
    /// Route of administration
    pub route: MedicationRoute,
    /// Daily intake times, "HH:MM", unique and ascending
    pub times: Vec<String>,
    /// Optional notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl Medication {
    /// Whether the medication has at least one daily time to schedule.
    pub fn is_schedulable(&self) -> bool {
        !self.times.is_empty()
    }
}

/// Unvalidated medication form input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewMedication {
    pub name: String,
    pub dose: String,
    pub route: MedicationRoute,
    pub times: Vec<String>,
    pub notes: Option<String>,
}

impl NewMedication {
    /// Validate and normalize the form input.
    ///
    /// Name and dose are trimmed and must be non-empty, at least one valid
    /// time is required, times are normalized to zero-padded `HH:MM`,
    /// deduplicated and sorted, and a blank note becomes `None`.
    pub fn validate(self) -> ModelResult<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ModelError::EmptyName);
        }
        let dose = self.dose.trim().to_string();
        if dose.is_empty() {
            return Err(ModelError::EmptyDose);
        }
        let times = normalize_times(&self.times)?;
        if times.is_empty() {
            return Err(ModelError::NoTimes);
        }
        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(Self {
            name,
            dose,
            route: self.route,
            times,
            notes,
        })
    }

    /// Validate and build a medication owned by `profile_id`.
    pub fn into_medication(self, profile_id: &str) -> ModelResult<Medication> {
        let valid = self.validate()?;
        Ok(Medication {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            name: valid.name,
            dose: valid.dose,
            route: valid.route,
            times: valid.times,
            notes: valid.notes,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Parse a 24-hour "H:MM" / "HH:MM" time of day.
pub fn parse_dose_time(raw: &str) -> ModelResult<NaiveTime> {
    let raw = raw.trim();
    let (hours, minutes) = raw
        .split_once(':')
        .ok_or_else(|| ModelError::InvalidTime(raw.to_string()))?;
    if minutes.len() != 2 || hours.is_empty() || hours.len() > 2 {
        return Err(ModelError::InvalidTime(raw.to_string()));
    }
    let hour: u32 = hours
        .parse()
        .map_err(|_| ModelError::InvalidTime(raw.to_string()))?;
    let minute: u32 = minutes
        .parse()
        .map_err(|_| ModelError::InvalidTime(raw.to_string()))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| ModelError::InvalidTime(raw.to_string()))
}

/// Format a time of day as zero-padded "HH:MM".
pub fn format_dose_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Normalize a list of times: zero-padded, unique, ascending.
pub fn normalize_times(times: &[String]) -> ModelResult<Vec<String>> {
    let mut parsed = times
        .iter()
        .map(|t| parse_dose_time(t))
        .collect::<ModelResult<Vec<_>>>()?;
    parsed.sort();
    parsed.dedup();
    Ok(parsed.into_iter().map(format_dose_time).collect())
}
