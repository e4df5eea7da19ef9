use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validators::{PHONE_REGEX, validate_date_of_birth, validate_not_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub medical_record_number: String,
    pub status: PatientStatus,
    /// Owning actor account, once linked
    pub user_id: Option<Uuid>,
    pub health_question_one: Option<String>,
    pub health_question_two: Option<String>,
    pub health_question_three: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Age in whole years on the given date.
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        let dob = self.date_of_birth;
        let mut age = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        age
    }

    pub fn is_active(&self) -> bool {
        self.status == PatientStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePatient {
    #[validate(length(min = 2, max = 50), custom(function = "validate_not_blank"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50), custom(function = "validate_not_blank"))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(regex(path = *PHONE_REGEX))]
    pub phone: String,
    #[validate(custom(function = "validate_date_of_birth"))]
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 5, max = 20))]
    pub medical_record_number: String,
    #[serde(default)]
    pub status: PatientStatus,
    #[serde(default)]
    pub health_question_one: Option<String>,
    #[serde(default)]
    pub health_question_two: Option<String>,
    #[serde(default)]
    pub health_question_three: Option<String>,
}

impl CreatePatient {
    /// Build a new, unowned record. Does not validate.
    pub fn build(&self, now: DateTime<Utc>) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.clone(),
            date_of_birth: self.date_of_birth,
            medical_record_number: self.medical_record_number.clone(),
            status: self.status,
            user_id: None,
            health_question_one: self.health_question_one.clone(),
            health_question_two: self.health_question_two.clone(),
            health_question_three: self.health_question_three.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePatient {
    #[validate(length(min = 2, max = 50), custom(function = "validate_not_blank"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50), custom(function = "validate_not_blank"))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(regex(path = *PHONE_REGEX))]
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(min = 5, max = 20))]
    pub medical_record_number: Option<String>,
    pub status: Option<PatientStatus>,
    pub health_question_one: Option<String>,
    pub health_question_two: Option<String>,
    pub health_question_three: Option<String>,
}

impl UpdatePatient {
    /// Apply the present fields onto an existing record.
    pub fn apply_to(self, patient: &mut Patient) {
        if let Some(v) = self.first_name {
            patient.first_name = v;
        }
        if let Some(v) = self.last_name {
            patient.last_name = v;
        }
        if let Some(v) = self.email {
            patient.email = v;
        }
        if let Some(v) = self.phone {
            patient.phone = v;
        }
        if let Some(v) = self.date_of_birth {
            patient.date_of_birth = v;
        }
        if let Some(v) = self.medical_record_number {
            patient.medical_record_number = v;
        }
        if let Some(v) = self.status {
            patient.status = v;
        }
        if self.health_question_one.is_some() {
            patient.health_question_one = self.health_question_one;
        }
        if self.health_question_two.is_some() {
            patient.health_question_two = self.health_question_two;
        }
        if self.health_question_three.is_some() {
            patient.health_question_three = self.health_question_three;
        }
        patient.updated_at = Utc::now();
    }
}

/// Self-service registration form. The MRN and status are assigned by the
/// registration flow, not the applicant.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PatientApplication {
    #[validate(length(min = 2, max = 50), custom(function = "validate_not_blank"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50), custom(function = "validate_not_blank"))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(regex(path = *PHONE_REGEX))]
    pub phone: String,
    #[validate(custom(function = "validate_date_of_birth"))]
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub health_question_one: Option<String>,
    #[serde(default)]
    pub health_question_two: Option<String>,
    #[serde(default)]
    pub health_question_three: Option<String>,
}

impl PatientApplication {
    pub fn into_create(self, medical_record_number: String) -> CreatePatient {
        CreatePatient {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            medical_record_number,
            status: PatientStatus::Active,
            health_question_one: self.health_question_one,
            health_question_two: self.health_question_two,
            health_question_three: self.health_question_three,
        }
    }
}
