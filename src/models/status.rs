use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Value of one activity sub-status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString, ToSchema)]
pub enum StatusValue {
    #[serde(rename = "Inprogress")]
    #[strum(serialize = "Inprogress")]
    InProgress,
    #[serde(rename = "completed")]
    #[strum(serialize = "completed")]
    Completed,
}

impl StatusValue {
    /// Normalises the spellings found in stored rows and request bodies.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['_', ' ', '-'], "").as_str() {
            "inprogress" | "pending" | "" => Some(StatusValue::InProgress),
            "completed" | "complete" | "done" => Some(StatusValue::Completed),
            _ => None,
        }
    }

    /// Column value; unknown stored values read as in progress.
    pub fn from_column(raw: &str) -> Self {
        Self::parse_lenient(raw).unwrap_or(StatusValue::InProgress)
    }

    pub fn as_column(&self) -> &'static str {
        match self {
            StatusValue::InProgress => "Inprogress",
            StatusValue::Completed => "completed",
        }
    }
}

impl<'de> Deserialize<'de> for StatusValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        StatusValue::parse_lenient(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown status value `{}`", raw)))
    }
}

/// The four sub-statuses tracked on every activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActivityStatuses {
    pub status: StatusValue,
    pub qc: StatusValue,
    pub mesh_mold: StatusValue,
    pub reinforcement: StatusValue,
}

impl ActivityStatuses {
    pub fn in_progress() -> Self {
        Self {
            status: StatusValue::InProgress,
            qc: StatusValue::InProgress,
            mesh_mold: StatusValue::InProgress,
            reinforcement: StatusValue::InProgress,
        }
    }

    pub fn all_completed(&self) -> bool {
        [self.status, self.qc, self.mesh_mold, self.reinforcement]
            .iter()
            .all(|s| *s == StatusValue::Completed)
    }

    pub fn apply(&mut self, patch: &StatusPatch) {
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.qc {
            self.qc = v;
        }
        if let Some(v) = patch.mesh_mold {
            self.mesh_mold = v;
        }
        if let Some(v) = patch.reinforcement {
            self.reinforcement = v;
        }
    }

    /// True when the patch would move any sub-status backwards.
    pub fn regresses(&self, patch: &StatusPatch) -> bool {
        let pairs = [
            (self.status, patch.status),
            (self.qc, patch.qc),
            (self.mesh_mold, patch.mesh_mold),
            (self.reinforcement, patch.reinforcement),
        ];
        pairs.iter().any(|(cur, next)| {
            *cur == StatusValue::Completed && *next == Some(StatusValue::InProgress)
        })
    }
}

/// Partial update of the sub-statuses; absent fields are left alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusPatch {
    #[serde(default)]
    pub status: Option<StatusValue>,
    #[serde(default)]
    pub qc: Option<StatusValue>,
    #[serde(default)]
    pub mesh_mold: Option<StatusValue>,
    #[serde(default)]
    pub reinforcement: Option<StatusValue>,
}

impl StatusPatch {
    pub fn all(value: StatusValue) -> Self {
        Self {
            status: Some(value),
            qc: Some(value),
            mesh_mold: Some(value),
            reinforcement: Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.qc.is_none()
            && self.mesh_mold.is_none()
            && self.reinforcement.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parsing_folds_spellings() {
        assert_eq!(
            StatusValue::parse_lenient("In_Progress"),
            Some(StatusValue::InProgress)
        );
        assert_eq!(
            StatusValue::parse_lenient("Completed"),
            Some(StatusValue::Completed)
        );
        assert_eq!(StatusValue::parse_lenient("unknown"), None);
        assert_eq!(StatusValue::from_column("garbage"), StatusValue::InProgress);
    }

    #[test]
    fn serialises_with_stored_spelling() {
        assert_eq!(
            serde_json::to_string(&StatusValue::InProgress).unwrap(),
            "\"Inprogress\""
        );
        assert_eq!(
            serde_json::to_string(&StatusValue::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut statuses = ActivityStatuses::in_progress();
        statuses.apply(&StatusPatch {
            qc: Some(StatusValue::Completed),
            ..Default::default()
        });
        assert_eq!(statuses.qc, StatusValue::Completed);
        assert_eq!(statuses.status, StatusValue::InProgress);
        assert!(!statuses.all_completed());

        statuses.apply(&StatusPatch::all(StatusValue::Completed));
        assert!(statuses.all_completed());
    }

    #[test]
    fn detects_regressions() {
        let mut statuses = ActivityStatuses::in_progress();
        statuses.qc = StatusValue::Completed;
        assert!(statuses.regresses(&StatusPatch {
            qc: Some(StatusValue::InProgress),
            ..Default::default()
        }));
        assert!(!statuses.regresses(&StatusPatch::all(StatusValue::Completed)));
    }
}
