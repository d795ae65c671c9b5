use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};

use crate::{
    error::Result,
    storage::models::{Enrollment, NewProfile, UserProfile},
    validation::{parse_degree_code, DegreeCode},
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                chat_id INTEGER PRIMARY KEY,
                display_name TEXT NOT NULL,
                username TEXT,
                birthday TEXT NOT NULL,
                enrollment_version INTEGER NOT NULL,
                course_code TEXT,
                degree_code TEXT,
                university TEXT,
                degree_name TEXT,
                group_code TEXT,
                notify_enabled INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Single-row marker making the daily broadcast idempotent per date.
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS broadcast_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_run TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_notify ON users(notify_enabled)",
            [],
        )?;

        Ok(())
    }

    /// Insert a new profile, or, if the chat already has one, switch its
    /// notifications back on without touching the stored data. One statement,
    /// so rapid-fire /register calls cannot create a duplicate.
    pub fn upsert_profile(&self, profile: &NewProfile) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let (course_code, degree_code, university, degree_name, group) =
            match &profile.enrollment {
                Enrollment::CourseCode(code) => (Some(code.as_str()), None, None, None, None),
                Enrollment::Degree {
                    code,
                    university,
                    degree,
                    group,
                } => (
                    None,
                    Some(code.as_str()),
                    Some(university.as_str()),
                    Some(degree.as_str()),
                    Some(group.as_str()),
                ),
            };

        self.conn.execute(
            "INSERT INTO users
                (chat_id, display_name, username, birthday, enrollment_version,
                 course_code, degree_code, university, degree_name, group_code,
                 notify_enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?11)
             ON CONFLICT(chat_id) DO UPDATE SET
                notify_enabled = 1,
                updated_at = excluded.updated_at",
            params![
                profile.chat_id,
                profile.display_name,
                profile.username,
                profile.birthday.to_string(),
                profile.enrollment.version(),
                course_code,
                degree_code,
                university,
                degree_name,
                group,
                now,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_chat(&self, chat_id: i64) -> Result<Option<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT chat_id, display_name, username, birthday, enrollment_version,
                    course_code, degree_code, university, degree_name, group_code,
                    notify_enabled, created_at, updated_at
             FROM users WHERE chat_id = ?1",
        )?;

        let mut rows = stmt.query_map([chat_id], row_to_profile)?;
        Ok(rows.next().transpose()?)
    }

    /// Flip the notify flag; returns false when no row changed (unknown chat
    /// or flag already in the requested state).
    pub fn set_notify(&self, chat_id: i64, enabled: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET notify_enabled = ?2, updated_at = ?3
             WHERE chat_id = ?1 AND notify_enabled != ?2",
            params![chat_id, enabled, Utc::now().to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// Replace only the classification fields of an existing profile and bump
    /// it to the current record version. Returns false if the profile is gone.
    pub fn update_enrollment(&self, chat_id: i64, code: &DegreeCode) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET
                enrollment_version = 2,
                course_code = NULL,
                degree_code = ?2,
                university = ?3,
                degree_name = ?4,
                group_code = ?5,
                updated_at = ?6
             WHERE chat_id = ?1",
            params![
                chat_id,
                code.code,
                code.university,
                code.degree,
                code.group,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    /// Profiles whose stored birthday falls on the given month/day,
    /// regardless of year.
    pub fn birthdays_on(&self, month: u32, day: u32) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT chat_id, display_name, username, birthday, enrollment_version,
                    course_code, degree_code, university, degree_name, group_code,
                    notify_enabled, created_at, updated_at
             FROM users
             WHERE CAST(strftime('%m', birthday) AS INTEGER) = ?1
               AND CAST(strftime('%d', birthday) AS INTEGER) = ?2",
        )?;

        let profiles = stmt
            .query_map(params![month, day], row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    pub fn notify_enabled_profiles(&self) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT chat_id, display_name, username, birthday, enrollment_version,
                    course_code, degree_code, university, degree_name, group_code,
                    notify_enabled, created_at, updated_at
             FROM users WHERE notify_enabled = 1",
        )?;

        let profiles = stmt
            .query_map([], row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    pub fn all_profiles(&self) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT chat_id, display_name, username, birthday, enrollment_version,
                    course_code, degree_code, university, degree_name, group_code,
                    notify_enabled, created_at, updated_at
             FROM users ORDER BY created_at",
        )?;

        let profiles = stmt
            .query_map([], row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    /// Upgrade v1 rows whose free-form course code happens to be a valid
    /// degree code. Rows that don't validate stay at v1 untouched.
    pub fn migrate_legacy_enrollments(&self) -> Result<usize> {
        let mut stmt = self.conn.prepare(
            "SELECT chat_id, course_code FROM users
             WHERE enrollment_version = 1 AND course_code IS NOT NULL",
        )?;
        let legacy = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut migrated = 0;
        for (chat_id, course_code) in legacy {
            if let Ok(code) = parse_degree_code(&course_code) {
                if self.update_enrollment(chat_id, &code)? {
                    migrated += 1;
                }
            }
        }
        Ok(migrated)
    }

    pub fn last_broadcast_date(&self) -> Result<Option<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT last_run FROM broadcast_state WHERE id = 1")?;

        let mut rows = stmt.query_map([], |row| {
            let raw: String = row.get(0)?;
            raw.parse::<NaiveDate>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })?;
        Ok(rows.next().transpose()?)
    }

    pub fn mark_broadcast_ran(&self, date: NaiveDate) -> Result<()> {
        self.conn.execute(
            "INSERT INTO broadcast_state (id, last_run) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET last_run = excluded.last_run",
            params![date.to_string()],
        )?;
        Ok(())
    }
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    let version: i64 = row.get(4)?;
    let enrollment = if version >= 2 {
        Enrollment::Degree {
            code: row.get(6)?,
            university: row.get(7)?,
            degree: row.get(8)?,
            group: row.get(9)?,
        }
    } else {
        Enrollment::CourseCode(row.get::<_, Option<String>>(5)?.unwrap_or_default())
    };

    Ok(UserProfile {
        chat_id: row.get(0)?,
        display_name: row.get(1)?,
        username: row.get(2)?,
        birthday: parse_sql_date(row, 3)?,
        enrollment,
        notify_enabled: row.get(10)?,
        created_at: parse_sql_datetime(row, 11)?,
        updated_at: parse_sql_datetime(row, 12)?,
    })
}

fn parse_sql_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_sql_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        (dir, db)
    }

    fn sample_profile(chat_id: i64) -> NewProfile {
        NewProfile {
            chat_id,
            display_name: "Jane Doe".into(),
            username: Some("jane".into()),
            birthday: NaiveDate::from_ymd_opt(2000, 5, 20).unwrap(),
            enrollment: Enrollment::Degree {
                code: "SE-UGC-B1".into(),
                university: "NSBM Green University".into(),
                degree: "Software Engineering".into(),
                group: "B1".into(),
            },
        }
    }

    #[test]
    fn double_register_keeps_one_row() {
        let (_dir, db) = test_db();
        db.upsert_profile(&sample_profile(10)).unwrap();
        db.upsert_profile(&sample_profile(10)).unwrap();

        assert_eq!(db.all_profiles().unwrap().len(), 1);
        let profile = db.find_by_chat(10).unwrap().unwrap();
        assert!(profile.notify_enabled);
    }

    #[test]
    fn unregister_then_register_restores_notify() {
        let (_dir, db) = test_db();
        db.upsert_profile(&sample_profile(10)).unwrap();

        assert!(db.set_notify(10, false).unwrap());
        assert!(!db.find_by_chat(10).unwrap().unwrap().notify_enabled);
        // Disabling twice changes nothing.
        assert!(!db.set_notify(10, false).unwrap());

        db.upsert_profile(&sample_profile(10)).unwrap();
        assert_eq!(db.all_profiles().unwrap().len(), 1);
        assert!(db.find_by_chat(10).unwrap().unwrap().notify_enabled);
    }

    #[test]
    fn reregister_does_not_overwrite_profile_data() {
        let (_dir, db) = test_db();
        db.upsert_profile(&sample_profile(10)).unwrap();

        let mut second = sample_profile(10);
        second.display_name = "Someone Else".into();
        db.upsert_profile(&second).unwrap();

        let profile = db.find_by_chat(10).unwrap().unwrap();
        assert_eq!(profile.display_name, "Jane Doe");
    }

    #[test]
    fn birthday_round_trips_as_given() {
        let (_dir, db) = test_db();
        db.upsert_profile(&sample_profile(10)).unwrap();

        let profile = db.find_by_chat(10).unwrap().unwrap();
        assert_eq!(profile.birthday_long(), "May 20, 2000");
    }

    #[test]
    fn birthdays_on_matches_month_and_day_only() {
        let (_dir, db) = test_db();
        let mut a = sample_profile(1);
        a.birthday = NaiveDate::from_ymd_opt(1998, 5, 20).unwrap();
        let mut b = sample_profile(2);
        b.birthday = NaiveDate::from_ymd_opt(2001, 5, 20).unwrap();
        let mut c = sample_profile(3);
        c.birthday = NaiveDate::from_ymd_opt(2001, 5, 21).unwrap();
        for p in [&a, &b, &c] {
            db.upsert_profile(p).unwrap();
        }

        let matches = db.birthdays_on(5, 20).unwrap();
        let mut ids: Vec<i64> = matches.iter().map(|p| p.chat_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);

        assert!(db.birthdays_on(12, 25).unwrap().is_empty());
    }

    #[test]
    fn notify_enabled_set_excludes_disabled() {
        let (_dir, db) = test_db();
        for id in 1..=3 {
            db.upsert_profile(&sample_profile(id)).unwrap();
        }
        db.set_notify(2, false).unwrap();

        let enabled = db.notify_enabled_profiles().unwrap();
        let mut ids: Vec<i64> = enabled.iter().map(|p| p.chat_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn update_enrollment_replaces_classification_only() {
        let (_dir, db) = test_db();
        db.upsert_profile(&sample_profile(10)).unwrap();

        let code = parse_degree_code("cs-vu-a2").unwrap();
        assert!(db.update_enrollment(10, &code).unwrap());

        let profile = db.find_by_chat(10).unwrap().unwrap();
        assert_eq!(profile.display_name, "Jane Doe");
        match profile.enrollment {
            Enrollment::Degree {
                code,
                university,
                group,
                ..
            } => {
                assert_eq!(code, "CS-VU-A2");
                assert_eq!(university, "Victoria University");
                assert_eq!(group, "A2");
            }
            other => panic!("expected degree enrollment, got {:?}", other),
        }

        // Vanished profile reports no change.
        assert!(!db.update_enrollment(999, &code).unwrap());
    }

    #[test]
    fn legacy_rows_migrate_when_they_validate() {
        let (_dir, db) = test_db();
        let mut legacy_valid = sample_profile(1);
        legacy_valid.enrollment = Enrollment::CourseCode("se-ugc-b1".into());
        let mut legacy_freeform = sample_profile(2);
        legacy_freeform.enrollment = Enrollment::CourseCode("Intro to Pottery".into());
        db.upsert_profile(&legacy_valid).unwrap();
        db.upsert_profile(&legacy_freeform).unwrap();

        assert_eq!(db.migrate_legacy_enrollments().unwrap(), 1);

        match db.find_by_chat(1).unwrap().unwrap().enrollment {
            Enrollment::Degree { code, .. } => assert_eq!(code, "SE-UGC-B1"),
            other => panic!("expected migrated enrollment, got {:?}", other),
        }
        match db.find_by_chat(2).unwrap().unwrap().enrollment {
            Enrollment::CourseCode(code) => assert_eq!(code, "Intro to Pottery"),
            other => panic!("expected untouched v1 row, got {:?}", other),
        }
    }

    #[test]
    fn broadcast_marker_round_trips() {
        let (_dir, db) = test_db();
        assert!(db.last_broadcast_date().unwrap().is_none());

        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        db.mark_broadcast_ran(today).unwrap();
        assert_eq!(db.last_broadcast_date().unwrap(), Some(today));

        let next = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        db.mark_broadcast_ran(next).unwrap();
        assert_eq!(db.last_broadcast_date().unwrap(), Some(next));
    }
}
