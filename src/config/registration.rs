use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Patient onboarding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
    /// Days until the follow-up task created for a new applicant is due.
    #[serde(default = "default_due_days")]
    pub applicant_task_due_days: u32,

    /// Description of the new-applicant follow-up task.
    #[serde(default = "default_task_description")]
    pub applicant_task_description: String,

    /// First name given to placeholder patient records.
    #[serde(default = "default_first_name")]
    pub placeholder_first_name: String,

    /// Last name given to placeholder patient records.
    #[serde(default = "default_last_name")]
    pub placeholder_last_name: String,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            applicant_task_due_days: default_due_days(),
            applicant_task_description: default_task_description(),
            placeholder_first_name: default_first_name(),
            placeholder_last_name: default_last_name(),
        }
    }
}

impl RegistrationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Placeholders must still pass patient name validation.
        for (field, value) in [
            ("placeholder_first_name", &self.placeholder_first_name),
            ("placeholder_last_name", &self.placeholder_last_name),
        ] {
            let len = value.trim().chars().count();
            if !(2..=50).contains(&len) {
                return Err(ConfigError::Validation(format!(
                    "registration.{field} must be 2 to 50 characters"
                )));
            }
        }
        if self.applicant_task_description.chars().count() > 1000 {
            return Err(ConfigError::Validation(
                "registration.applicant_task_description must be at most 1000 characters".into(),
            ));
        }
        Ok(())
    }
}

fn default_due_days() -> u32 {
    3
}

fn default_task_description() -> String {
    "Verify ID & prep for provider".to_string()
}

fn default_first_name() -> String {
    "New".to_string()
}

fn default_last_name() -> String {
    "Patient".to_string()
}
