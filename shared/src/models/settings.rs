//! School branding and calendar settings

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{validate_hex_color, validate_week_start_day};

pub const DEFAULT_PRIMARY_COLOR: &str = "#0284c7";
pub const DEFAULT_SECONDARY_COLOR: &str = "#0369a1";
pub const DEFAULT_SCHOOL_NAME: &str = "My School";
pub const MAX_SCHOOL_NAME_LEN: usize = 255;
pub const MAX_CUSTOM_LABEL_LEN: usize = 100;

/// Rejected settings change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SettingsError {
    pub field: &'static str,
    pub message: String,
}

impl SettingsError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchoolLevel {
    MiddleSchool,
    JuniorHigh,
    #[default]
    HighSchool,
    SeniorHigh,
    Other,
}

impl SchoolLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchoolLevel::MiddleSchool => "middle_school",
            SchoolLevel::JuniorHigh => "junior_high",
            SchoolLevel::HighSchool => "high_school",
            SchoolLevel::SeniorHigh => "senior_high",
            SchoolLevel::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SchoolLevel::MiddleSchool => "Middle School",
            SchoolLevel::JuniorHigh => "Junior High",
            SchoolLevel::HighSchool => "High School",
            SchoolLevel::SeniorHigh => "Senior High",
            SchoolLevel::Other => "Other",
        }
    }
}

impl std::str::FromStr for SchoolLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "middle_school" => Ok(SchoolLevel::MiddleSchool),
            "junior_high" => Ok(SchoolLevel::JuniorHigh),
            "high_school" => Ok(SchoolLevel::HighSchool),
            "senior_high" => Ok(SchoolLevel::SeniorHigh),
            "other" => Ok(SchoolLevel::Other),
            other => Err(format!("Unknown school level: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
    #[default]
    Band,
    Orchestra,
    Choir,
    Other,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramType::Band => "band",
            ProgramType::Orchestra => "orchestra",
            ProgramType::Choir => "choir",
            ProgramType::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgramType::Band => "Band",
            ProgramType::Orchestra => "Orchestra",
            ProgramType::Choir => "Choir",
            ProgramType::Other => "Other",
        }
    }
}

impl std::str::FromStr for ProgramType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "band" => Ok(ProgramType::Band),
            "orchestra" => Ok(ProgramType::Orchestra),
            "choir" => Ok(ProgramType::Choir),
            "other" => Ok(ProgramType::Other),
            other => Err(format!("Unknown program type: {}", other)),
        }
    }
}

/// The school-wide settings row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchoolSettings {
    pub primary_color: String,
    pub secondary_color: String,
    pub logo_url: Option<String>,
    /// 0 = Sunday through 6 = Saturday
    pub week_start_day: i16,
    pub school_name: String,
    pub school_level: SchoolLevel,
    pub program_type: ProgramType,
    pub custom_school_level: Option<String>,
    pub custom_program_type: Option<String>,
}

impl Default for SchoolSettings {
    fn default() -> Self {
        Self {
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            secondary_color: DEFAULT_SECONDARY_COLOR.to_string(),
            logo_url: None,
            week_start_day: 0,
            school_name: DEFAULT_SCHOOL_NAME.to_string(),
            school_level: SchoolLevel::default(),
            program_type: ProgramType::default(),
            custom_school_level: None,
            custom_program_type: None,
        }
    }
}

/// Partial settings change; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub week_start_day: Option<i16>,
    pub school_name: Option<String>,
    pub school_level: Option<SchoolLevel>,
    pub program_type: Option<ProgramType>,
    pub custom_school_level: Option<String>,
    pub custom_program_type: Option<String>,
}

impl SchoolSettings {
    /// Apply a partial update. Nothing is changed if any field is invalid.
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<(), SettingsError> {
        if let Some(day) = update.week_start_day {
            validate_week_start_day(day).map_err(|e| SettingsError::new("week_start_day", e))?;
        }
        if let Some(color) = &update.primary_color {
            validate_hex_color(color).map_err(|e| SettingsError::new("primary_color", e))?;
        }
        if let Some(color) = &update.secondary_color {
            validate_hex_color(color).map_err(|e| SettingsError::new("secondary_color", e))?;
        }
        let school_name = match update.school_name {
            Some(name) if name.trim().is_empty() => {
                return Err(SettingsError::new("school_name", "School name cannot be empty"));
            }
            Some(name) if name.trim().chars().count() > MAX_SCHOOL_NAME_LEN => {
                return Err(SettingsError::new(
                    "school_name",
                    format!("School name must be at most {} characters", MAX_SCHOOL_NAME_LEN),
                ));
            }
            Some(name) => Some(name.trim().to_string()),
            None => None,
        };
        check_label_len("custom_school_level", &update.custom_school_level)?;
        check_label_len("custom_program_type", &update.custom_program_type)?;

        if let Some(color) = update.primary_color {
            self.primary_color = color;
        }
        if let Some(color) = update.secondary_color {
            self.secondary_color = color;
        }
        if let Some(day) = update.week_start_day {
            self.week_start_day = day;
        }
        if let Some(name) = school_name {
            self.school_name = name;
        }

        // Custom labels only travel with their enum field
        if let Some(level) = update.school_level {
            self.school_level = level;
            self.custom_school_level = match level {
                SchoolLevel::Other => non_blank(update.custom_school_level),
                _ => None,
            };
        }
        if let Some(program) = update.program_type {
            self.program_type = program;
            self.custom_program_type = match program {
                ProgramType::Other => non_blank(update.custom_program_type),
                _ => None,
            };
        }

        Ok(())
    }

    /// Display label for the school level, preferring the custom label
    pub fn level_label(&self) -> String {
        match (&self.school_level, &self.custom_school_level) {
            (SchoolLevel::Other, Some(custom)) => custom.clone(),
            (level, _) => level.label().to_string(),
        }
    }

    /// Display label for the program type, preferring the custom label
    pub fn program_label(&self) -> String {
        match (&self.program_type, &self.custom_program_type) {
            (ProgramType::Other, Some(custom)) => custom.clone(),
            (program, _) => program.label().to_string(),
        }
    }
}

fn check_label_len(field: &'static str, label: &Option<String>) -> Result<(), SettingsError> {
    match label {
        Some(label) if label.trim().chars().count() > MAX_CUSTOM_LABEL_LEN => Err(SettingsError::new(
            field,
            format!("Custom label must be at most {} characters", MAX_CUSTOM_LABEL_LEN),
        )),
        _ => Ok(()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SchoolSettings::default();
        assert_eq!(settings.primary_color, "#0284c7");
        assert_eq!(settings.secondary_color, "#0369a1");
        assert_eq!(settings.week_start_day, 0);
        assert_eq!(settings.school_name, "My School");
        assert_eq!(settings.school_level, SchoolLevel::HighSchool);
        assert_eq!(settings.program_type, ProgramType::Band);
    }

    #[test]
    fn test_enum_round_trip_strings() {
        assert_eq!("junior_high".parse::<SchoolLevel>().unwrap(), SchoolLevel::JuniorHigh);
        assert_eq!("choir".parse::<ProgramType>().unwrap(), ProgramType::Choir);
        assert!("college".parse::<SchoolLevel>().is_err());
    }

    #[test]
    fn test_labels() {
        let mut settings = SchoolSettings::default();
        assert_eq!(settings.level_label(), "High School");
        settings
            .apply(SettingsUpdate {
                program_type: Some(ProgramType::Other),
                custom_program_type: Some("Jazz Ensemble".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.program_label(), "Jazz Ensemble");
    }

    #[test]
    fn test_length_limits() {
        let mut settings = SchoolSettings::default();
        let before = settings.clone();

        let err = settings
            .apply(SettingsUpdate {
                school_name: Some("x".repeat(MAX_SCHOOL_NAME_LEN + 1)),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.field, "school_name");

        let err = settings
            .apply(SettingsUpdate {
                program_type: Some(ProgramType::Other),
                custom_program_type: Some("y".repeat(MAX_CUSTOM_LABEL_LEN + 1)),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.field, "custom_program_type");
        assert_eq!(settings, before);

        // Multi-byte names count characters, not bytes
        settings
            .apply(SettingsUpdate {
                school_name: Some("é".repeat(MAX_SCHOOL_NAME_LEN)),
                ..Default::default()
            })
            .unwrap();
    }
}
