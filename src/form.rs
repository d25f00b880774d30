use chrono::{Local, NaiveDateTime, Timelike};

use crate::data::loader::{DatasetKind, DEPARTMENTS, INTERESTS};
use crate::data::model::Value;
use crate::error::{DataError, StoreResult};
use crate::store::TabularStore;

pub const AGE_RANGE: (i64, i64) = (18, 30);
pub const GRADE_RANGE: (f64, f64) = (0.0, 4.0);
pub const ATTENDANCE_RANGE: (f64, f64) = (0.0, 100.0);

/// One student record as entered in the data-entry form.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentEntry {
    pub name: String,
    pub age: i64,
    pub grade: f64,
    pub department: String,
    pub attendance: f64,
    pub interests: Vec<String>,
}

impl Default for StudentEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: 20,
            grade: 3.0,
            department: DEPARTMENTS[0].to_string(),
            attendance: 75.0,
            interests: Vec::new(),
        }
    }
}

impl StudentEntry {
    /// Check every field before anything is written.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.name.trim().is_empty() {
            return Err(DataError::Validation("Please enter student name!".to_string()));
        }
        if !(AGE_RANGE.0..=AGE_RANGE.1).contains(&self.age) {
            return Err(DataError::Validation(format!(
                "age {} is outside {}..={}",
                self.age, AGE_RANGE.0, AGE_RANGE.1
            )));
        }
        if !(GRADE_RANGE.0..=GRADE_RANGE.1).contains(&self.grade) {
            return Err(DataError::Validation(format!(
                "grade {} is outside {}..={}",
                self.grade, GRADE_RANGE.0, GRADE_RANGE.1
            )));
        }
        if !(ATTENDANCE_RANGE.0..=ATTENDANCE_RANGE.1).contains(&self.attendance) {
            return Err(DataError::Validation(format!(
                "attendance {} is outside {}..={}",
                self.attendance, ATTENDANCE_RANGE.0, ATTENDANCE_RANGE.1
            )));
        }
        if !DEPARTMENTS.contains(&self.department.as_str()) {
            return Err(DataError::Validation(format!(
                "unknown department '{}'",
                self.department
            )));
        }
        if let Some(bad) = self.interests.iter().find(|i| !INTERESTS.contains(&i.as_str())) {
            return Err(DataError::Validation(format!("unknown interest '{bad}'")));
        }
        Ok(())
    }

    /// Column/value pairs for the insert; `id` is left to the store.
    fn to_values(&self, submitted: NaiveDateTime) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::Text(self.name.trim().to_string())),
            ("age", Value::Integer(self.age)),
            ("grade", Value::Float(self.grade)),
            ("department", Value::Text(self.department.clone())),
            ("attendance", Value::Float(self.attendance)),
            ("interests", Value::Text(self.interests.join(","))),
            ("submission_date", Value::Timestamp(submitted)),
        ]
    }

    /// Flip membership of one interest option.
    pub fn toggle_interest(&mut self, interest: &str) {
        match self.interests.iter().position(|i| i == interest) {
            Some(pos) => {
                self.interests.remove(pos);
            }
            None => self.interests.push(interest.to_string()),
        }
    }
}

/// Local wall-clock time truncated to whole seconds.
fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

impl TabularStore {
    /// Validate `entry`, create the students table if needed, and insert it
    /// stamped with the current local time. Returns the new id.
    pub fn insert_student(&mut self, entry: &StudentEntry) -> StoreResult<i64> {
        self.insert_student_at(entry, now_local())
    }

    pub fn insert_student_at(&mut self, entry: &StudentEntry, submitted: NaiveDateTime) -> StoreResult<i64> {
        entry.validate()?;
        let kind = DatasetKind::Students;
        let schema = kind.schema();
        self.ensure_table(kind.table_name(), &schema)?;
        self.insert_row(kind.table_name(), &schema, &entry.to_values(submitted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use chrono::NaiveDate;

    fn entry(name: &str) -> StudentEntry {
        StudentEntry {
            name: name.to_string(),
            interests: vec!["AI/ML".into(), "Design".into()],
            ..StudentEntry::default()
        }
    }

    #[test]
    fn default_entry_only_lacks_a_name() {
        let err = StudentEntry::default().validate().unwrap_err();
        assert_eq!(err, DataError::Validation("Please enter student name!".into()));
        assert!(entry("Ana").validate().is_ok());
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut e = entry("Ana");
        e.age = 31;
        assert!(e.validate().is_err());

        let mut e = entry("Ana");
        e.grade = 4.1;
        assert!(e.validate().is_err());

        let mut e = entry("Ana");
        e.attendance = -0.1;
        assert!(e.validate().is_err());

        let mut e = entry("Ana");
        e.department = "History".into();
        assert!(e.validate().is_err());

        let mut e = entry("Ana");
        e.interests.push("Knitting".into());
        assert!(e.validate().is_err());
    }

    #[test]
    fn toggling_an_interest_twice_restores_it() {
        let mut e = StudentEntry::default();
        e.toggle_interest("Networking");
        assert_eq!(e.interests, vec!["Networking".to_string()]);
        e.toggle_interest("Networking");
        assert!(e.interests.is_empty());
    }

    #[test]
    fn blank_name_leaves_the_store_untouched() {
        let mut store = TabularStore::open_in_memory().unwrap();
        let err = store.insert_student(&entry("   ")).unwrap_err();
        assert!(matches!(err, StoreError::Data(DataError::Validation(_))));
        assert!(!store.table_exists("students").unwrap());
    }

    #[test]
    fn inserted_student_reads_back() {
        let mut store = TabularStore::open_in_memory().unwrap();
        let at = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap();
        let first = store.insert_student_at(&entry("Ana"), at).unwrap();
        let second = store.insert_student_at(&entry("Ben"), at).unwrap();
        assert!(second > first);

        let kind = DatasetKind::Students;
        let ds = store.read_table(kind.table_name(), &kind.schema()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0][1], Value::from("Ana"));
        assert_eq!(ds.rows()[0][6], Value::from("AI/ML,Design"));
        assert_eq!(ds.rows()[0][7], Value::Timestamp(at));
    }
}
