use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Classification data attached to a profile. The record is explicitly
/// versioned: early registrations stored a free-form course code, later
/// ones a validated degree code broken into its parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Enrollment {
    /// v1: free-form course code, accepted verbatim.
    CourseCode(String),
    /// v2: validated degree code.
    Degree {
        code: String,
        university: String,
        degree: String,
        group: String,
    },
}

impl Enrollment {
    pub fn version(&self) -> i64 {
        match self {
            Enrollment::CourseCode(_) => 1,
            Enrollment::Degree { .. } => 2,
        }
    }

    /// One-line rendering for listings and the account view.
    pub fn summary(&self) -> String {
        match self {
            Enrollment::CourseCode(code) => code.clone(),
            Enrollment::Degree {
                code,
                university,
                degree,
                group,
            } => format!("{} - {} at {} (group {})", code, degree, university, group),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub chat_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    pub birthday: NaiveDate,
    pub enrollment: Enrollment,
    pub notify_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Birthday in the long human format used by listings and broadcasts,
    /// e.g. "May 20, 2000".
    pub fn birthday_long(&self) -> String {
        format_long_date(self.birthday)
    }
}

pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Data collected by the registration flow, before the store fills in
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub chat_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    pub birthday: NaiveDate,
    pub enrollment: Enrollment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_date_has_no_zero_padding() {
        let date = NaiveDate::from_ymd_opt(2000, 5, 20).unwrap();
        assert_eq!(format_long_date(date), "May 20, 2000");

        let date = NaiveDate::from_ymd_opt(1999, 1, 3).unwrap();
        assert_eq!(format_long_date(date), "January 3, 1999");
    }

    #[test]
    fn enrollment_versions() {
        assert_eq!(Enrollment::CourseCode("SE-20".into()).version(), 1);
        let degree = Enrollment::Degree {
            code: "SE-UGC-B1".into(),
            university: "NSBM Green University".into(),
            degree: "Software Engineering".into(),
            group: "B1".into(),
        };
        assert_eq!(degree.version(), 2);
        assert!(degree.summary().contains("group B1"));
    }
}
