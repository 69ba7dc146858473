//! Generated student reports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of report period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Monthly,
    Weekly,
    Custom,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Monthly => "monthly",
            ReportType::Weekly => "weekly",
            ReportType::Custom => "custom",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(ReportType::Monthly),
            "weekly" => Ok(ReportType::Weekly),
            "custom" => Ok(ReportType::Custom),
            other => Err(crate::Error::Invalid(format!("unknown report type: {}", other))),
        }
    }
}

/// Inclusive date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> crate::Result<Self> {
        if start > end {
            return Err(crate::Error::Invalid(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Check whether a date falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

/// Percentage of `part` in `total`, rounded to the nearest integer; 0 when `total` is 0.
pub fn rate(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(total) * 100.0).round() as u32
}

/// Student display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
}

/// Academy display fields, used only when formatting messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademyInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// One exam in the report period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub name: String,
    pub date: NaiveDate,
    pub score: f64,
    pub max_score: f64,
    /// Rounded `score / max_score * 100`.
    pub percentage: u32,
}

impl ExamResult {
    /// Unrounded percentage; 0 when `max_score` is not positive.
    pub fn raw_percentage(score: f64, max_score: f64) -> f64 {
        if max_score > 0.0 {
            score / max_score * 100.0
        } else {
            0.0
        }
    }

    pub fn new(name: impl Into<String>, date: NaiveDate, score: f64, max_score: f64) -> Self {
        Self {
            name: name.into(),
            date,
            score,
            max_score,
            percentage: Self::raw_percentage(score, max_score).round() as u32,
        }
    }
}

/// Mean of the unrounded exam percentages, rounded; 0 with no exams.
pub fn average_percentage(exams: &[ExamResult]) -> u32 {
    if exams.is_empty() {
        return 0;
    }
    let sum: f64 = exams
        .iter()
        .map(|e| ExamResult::raw_percentage(e.score, e.max_score))
        .sum();
    (sum / exams.len() as f64).round() as u32
}

/// Attendance tallies with the derived rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total_days: u32,
    pub present_days: u32,
    pub late_days: u32,
    pub absent_days: u32,
    pub rate: u32,
}

impl AttendanceSummary {
    pub fn from_counts(present_days: u32, late_days: u32, absent_days: u32) -> Self {
        let total_days = present_days + late_days + absent_days;
        Self {
            total_days,
            present_days,
            late_days,
            absent_days,
            rate: rate(present_days, total_days),
        }
    }
}

/// Homework tallies with the derived rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkSummary {
    pub total: u32,
    pub completed: u32,
    pub rate: u32,
}

impl HomeworkSummary {
    pub fn from_counts(total: u32, completed: u32) -> Self {
        Self {
            total,
            completed,
            rate: rate(completed, total),
        }
    }
}

/// A consultation note included in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationSummary {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub summary: String,
}

/// The aggregated payload of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub student: StudentSummary,
    pub period: DateRange,
    pub exams: Vec<ExamResult>,
    pub avg_score: u32,
    pub attendance: AttendanceSummary,
    pub homework: HomeworkSummary,
    /// Newest first.
    pub consultations: Vec<ConsultationSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academy: Option<AcademyInfo>,
}

/// One generated report for one student over one date range.
///
/// Immutable once built: there are no setters, and corrections mean
/// generating a new report with a new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    id: String,
    tenant_id: String,
    #[serde(default)]
    student_id: Option<String>,
    #[serde(rename = "type")]
    report_type: ReportType,
    data: ReportData,
    generated_by: String,
    created_at: DateTime<Utc>,
}

impl Report {
    /// Build a report with a fresh id and creation time.
    pub fn new(
        tenant_id: impl Into<String>,
        student_id: Option<String>,
        report_type: ReportType,
        data: ReportData,
        generated_by: impl Into<String>,
    ) -> Self {
        Self {
            id: crate::id::report_id(),
            tenant_id: tenant_id.into(),
            student_id,
            report_type,
            data,
            generated_by: generated_by.into(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn student_id(&self) -> Option<&str> {
        self.student_id.as_deref()
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    pub fn data(&self) -> &ReportData {
        &self.data
    }

    pub fn generated_by(&self) -> &str {
        &self.generated_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_rate_never_divides_by_zero() {
        assert_eq!(rate(0, 0), 0);
        assert_eq!(rate(4, 5), 80);
        assert_eq!(rate(2, 3), 67);
        assert_eq!(rate(1, 8), 13);
    }

    #[test]
    fn test_attendance_from_counts() {
        let a = AttendanceSummary::from_counts(9, 0, 1);
        assert_eq!(a.total_days, 10);
        assert_eq!(a.rate, 90);
        assert_eq!(AttendanceSummary::from_counts(0, 0, 0).rate, 0);
    }

    #[test]
    fn test_average_percentage() {
        let exams = vec![
            ExamResult::new("a", d(2026, 9, 1), 80.0, 100.0),
            ExamResult::new("b", d(2026, 9, 8), 45.0, 50.0),
            ExamResult::new("c", d(2026, 9, 15), 20.0, 20.0),
        ];
        assert_eq!(average_percentage(&exams), 90);
        assert_eq!(average_percentage(&[]), 0);
    }

    #[test]
    fn test_zero_max_score() {
        let exam = ExamResult::new("x", d(2026, 9, 1), 10.0, 0.0);
        assert_eq!(exam.percentage, 0);
    }

    #[test]
    fn test_date_range() {
        assert!(DateRange::new(d(2026, 9, 30), d(2026, 9, 1)).is_err());
        let range = DateRange::new(d(2026, 9, 1), d(2026, 9, 30)).unwrap();
        assert!(range.contains(d(2026, 9, 30)));
        assert!(!range.contains(d(2026, 10, 1)));
        assert_eq!(range.to_string(), "2026-09-01 ~ 2026-09-30");
    }

    #[test]
    fn test_report_type_parse() {
        assert_eq!("Weekly".parse::<ReportType>().unwrap(), ReportType::Weekly);
        assert!("daily".parse::<ReportType>().is_err());
    }
}
