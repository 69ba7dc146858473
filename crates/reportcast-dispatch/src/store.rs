//! Activity data and report persistence ports.
//!
//! The aggregator reads through [`ActivitySource`]; generated reports are
//! kept in a [`ReportStore`]. Both are external collaborators, so each
//! comes with a small in-process implementation for the CLI and tests.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reportcast_core::{AcademyInfo, Channel, ContactKind, DateRange, Recipient, Report};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

type Result<T> = std::result::Result<T, StoreError>;

/// A guardian who can receive notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardian {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

impl Guardian {
    fn contact(&self, kind: ContactKind) -> Option<&str> {
        let contact = match kind {
            ContactKind::Phone => self.phone.as_deref(),
            ContactKind::Email => self.email.as_deref(),
        };
        contact.map(str::trim).filter(|c| !c.is_empty())
    }
}

/// A student as stored by the academy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guardians: Vec<Guardian>,
    /// Soft-delete marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StudentRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The guardian to notify over `channel`: the primary guardian if they
    /// have a usable contact, otherwise the first guardian who does.
    pub fn recipient_for(&self, channel: Channel) -> Option<Recipient> {
        let kind = channel.contact_kind();
        self.guardians
            .iter()
            .filter(|g| g.primary)
            .chain(self.guardians.iter().filter(|g| !g.primary))
            .find_map(|g| g.contact(kind).map(|c| Recipient::new(g.name.clone(), c)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub student_id: String,
    pub name: String,
    pub date: NaiveDate,
    pub score: f64,
    pub max_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub student_id: String,
    pub due_date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRecord {
    pub student_id: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub summary: String,
}

/// Read access to a tenant's activity records.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Look up a student, including soft-deleted ones.
    async fn student(&self, tenant_id: &str, student_id: &str) -> Result<Option<StudentRecord>>;

    /// Exams taken in the range.
    async fn exams(
        &self,
        tenant_id: &str,
        student_id: &str,
        period: &DateRange,
    ) -> Result<Vec<ExamRecord>>;

    /// Attendance rows in the range.
    async fn attendance(
        &self,
        tenant_id: &str,
        student_id: &str,
        period: &DateRange,
    ) -> Result<Vec<AttendanceRecord>>;

    /// Assignments due in the range.
    async fn assignments(
        &self,
        tenant_id: &str,
        student_id: &str,
        period: &DateRange,
    ) -> Result<Vec<AssignmentRecord>>;

    /// Consultations held in the range.
    async fn consultations(
        &self,
        tenant_id: &str,
        student_id: &str,
        period: &DateRange,
    ) -> Result<Vec<ConsultationRecord>>;
}

/// A tenant's activity records as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academy: Option<AcademyInfo>,
    #[serde(default)]
    pub students: Vec<StudentRecord>,
    #[serde(default)]
    pub exams: Vec<ExamRecord>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub assignments: Vec<AssignmentRecord>,
    #[serde(default)]
    pub consultations: Vec<ConsultationRecord>,
}

/// [`ActivitySource`] over an in-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct SnapshotActivitySource {
    snapshot: ActivitySnapshot,
}

impl SnapshotActivitySource {
    pub fn new(snapshot: ActivitySnapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot file.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        let data = tokio::fs::read_to_string(path).await?;
        let snapshot: ActivitySnapshot = serde_json::from_str(&data)?;
        debug!(
            "Loaded activity snapshot with {} student(s) from {}",
            snapshot.students.len(),
            path.display()
        );
        Ok(Self::new(snapshot))
    }

    pub fn academy(&self) -> Option<&AcademyInfo> {
        self.snapshot.academy.as_ref()
    }

    fn belongs(&self, tenant_id: &str, student_id: &str) -> bool {
        self.snapshot
            .students
            .iter()
            .any(|s| s.id == student_id && s.tenant_id == tenant_id)
    }

    fn select<T: Clone>(
        &self,
        rows: &[T],
        tenant_id: &str,
        student_id: &str,
        matches: impl Fn(&T) -> bool,
    ) -> Vec<T> {
        if !self.belongs(tenant_id, student_id) {
            return Vec::new();
        }
        rows.iter().filter(|r| matches(r)).cloned().collect()
    }
}

#[async_trait]
impl ActivitySource for SnapshotActivitySource {
    async fn student(&self, tenant_id: &str, student_id: &str) -> Result<Option<StudentRecord>> {
        Ok(self
            .snapshot
            .students
            .iter()
            .find(|s| s.id == student_id && s.tenant_id == tenant_id)
            .cloned())
    }

    async fn exams(
        &self,
        tenant_id: &str,
        student_id: &str,
        period: &DateRange,
    ) -> Result<Vec<ExamRecord>> {
        Ok(self.select(&self.snapshot.exams, tenant_id, student_id, |r| {
            r.student_id == student_id && period.contains(r.date)
        }))
    }

    async fn attendance(
        &self,
        tenant_id: &str,
        student_id: &str,
        period: &DateRange,
    ) -> Result<Vec<AttendanceRecord>> {
        Ok(self.select(&self.snapshot.attendance, tenant_id, student_id, |r| {
            r.student_id == student_id && period.contains(r.date)
        }))
    }

    async fn assignments(
        &self,
        tenant_id: &str,
        student_id: &str,
        period: &DateRange,
    ) -> Result<Vec<AssignmentRecord>> {
        Ok(self.select(&self.snapshot.assignments, tenant_id, student_id, |r| {
            r.student_id == student_id && period.contains(r.due_date)
        }))
    }

    async fn consultations(
        &self,
        tenant_id: &str,
        student_id: &str,
        period: &DateRange,
    ) -> Result<Vec<ConsultationRecord>> {
        Ok(self.select(&self.snapshot.consultations, tenant_id, student_id, |r| {
            r.student_id == student_id && period.contains(r.date)
        }))
    }
}

/// Persistence for generated reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Get a report by id.
    async fn get(&self, id: &str) -> Result<Option<Report>>;

    /// Save a report. Reports are immutable, so saving an existing id
    /// overwrites it with identical content.
    async fn save(&self, report: &Report) -> Result<()>;

    /// Reports for a tenant, newest first.
    async fn list(&self, tenant_id: &str) -> Result<Vec<Report>>;
}

fn newest_first(mut reports: Vec<Report>) -> Vec<Report> {
    reports.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    reports
}

/// In-memory report store.
pub struct MemoryReportStore {
    reports: RwLock<HashMap<String, Report>>,
}

impl Default for MemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn get(&self, id: &str) -> Result<Option<Report>> {
        let reports = self.reports.read().await;
        Ok(reports.get(id).cloned())
    }

    async fn save(&self, report: &Report) -> Result<()> {
        let mut reports = self.reports.write().await;
        reports.insert(report.id().to_string(), report.clone());
        Ok(())
    }

    async fn list(&self, tenant_id: &str) -> Result<Vec<Report>> {
        let reports = self.reports.read().await;
        Ok(newest_first(
            reports
                .values()
                .filter(|r| r.tenant_id() == tenant_id)
                .cloned()
                .collect(),
        ))
    }
}

/// Report store keeping one JSON file per report.
///
/// Files are written atomically (write to tmp, then rename).
pub struct FileReportStore {
    dir: PathBuf,
}

impl FileReportStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a report id; ids that could escape the directory have none.
    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        safe.then(|| self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn get(&self, id: &str) -> Result<Option<Report>> {
        let Some(path) = self.path_for(id) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn save(&self, report: &Report) -> Result<()> {
        let path = self
            .path_for(report.id())
            .ok_or_else(|| StoreError::Unavailable(format!("unsafe report id {}", report.id())))?;
        let tmp_path = path.with_extension("tmp");
        let data = serde_json::to_string_pretty(report)?;
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        debug!("Saved report {} to {}", report.id(), path.display());
        Ok(())
    }

    async fn list(&self, tenant_id: &str) -> Result<Vec<Report>> {
        let mut reports = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = tokio::fs::read_to_string(&path).await?;
            let report: Report = serde_json::from_str(&data)?;
            if report.tenant_id() == tenant_id {
                reports.push(report);
            }
        }
        Ok(newest_first(reports))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportcast_core::{
        AttendanceSummary, HomeworkSummary, ReportData, ReportType, StudentSummary,
    };

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn report(tenant: &str) -> Report {
        let data = ReportData {
            student: StudentSummary {
                id: "stu-1".into(),
                name: "김민준".into(),
                grade: None,
                school: None,
            },
            period: DateRange::new(d(9, 1), d(9, 30)).unwrap(),
            exams: vec![],
            avg_score: 0,
            attendance: AttendanceSummary::default(),
            homework: HomeworkSummary::default(),
            consultations: vec![],
            comment: None,
            academy: None,
        };
        Report::new(tenant, Some("stu-1".into()), ReportType::Monthly, data, "teacher-1")
    }

    fn student() -> StudentRecord {
        StudentRecord {
            id: "stu-1".into(),
            tenant_id: "t1".into(),
            name: "김민준".into(),
            grade: None,
            school: None,
            guardians: vec![
                Guardian {
                    name: "김아빠".into(),
                    phone: Some("010-1111-2222".into()),
                    email: None,
                    primary: false,
                },
                Guardian {
                    name: "김엄마".into(),
                    phone: Some(" ".into()),
                    email: Some("mom@example.com".into()),
                    primary: true,
                },
            ],
            deleted_at: None,
        }
    }

    #[test]
    fn test_recipient_for_prefers_primary_with_contact() {
        let student = student();
        assert_eq!(
            student.recipient_for(Channel::Email),
            Some(Recipient::new("김엄마", "mom@example.com"))
        );
        // Primary has a blank phone, so the next guardian is used.
        assert_eq!(
            student.recipient_for(Channel::Sms),
            Some(Recipient::new("김아빠", "010-1111-2222"))
        );

        let mut orphan = student;
        orphan.guardians.clear();
        assert!(orphan.recipient_for(Channel::Kakao).is_none());
    }

    #[tokio::test]
    async fn test_snapshot_filters_by_range_and_tenant() {
        let source = SnapshotActivitySource::new(ActivitySnapshot {
            students: vec![student()],
            exams: vec![
                ExamRecord {
                    student_id: "stu-1".into(),
                    name: "in".into(),
                    date: d(9, 10),
                    score: 1.0,
                    max_score: 1.0,
                },
                ExamRecord {
                    student_id: "stu-1".into(),
                    name: "out".into(),
                    date: d(10, 1),
                    score: 1.0,
                    max_score: 1.0,
                },
            ],
            ..Default::default()
        });
        let period = DateRange::new(d(9, 1), d(9, 30)).unwrap();

        let exams = source.exams("t1", "stu-1", &period).await.unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].name, "in");

        assert!(source.exams("t2", "stu-1", &period).await.unwrap().is_empty());
        assert!(source.student("t2", "stu-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SnapshotActivitySource::load(&dir.path().join("none.json")).await;
        let err = tokio_test::assert_err!(result);
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_memory_report_store() {
        let store = MemoryReportStore::new();
        let report = report("t1");
        store.save(&report).await.unwrap();
        store.save(&self::report("t2")).await.unwrap();

        assert_eq!(store.get(report.id()).await.unwrap(), Some(report.clone()));
        assert_eq!(store.list("t1").await.unwrap(), vec![report]);
    }

    #[tokio::test]
    async fn test_file_report_store_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let report = report("t1");

        {
            let store = FileReportStore::new(dir.path().join("reports")).await.unwrap();
            store.save(&report).await.unwrap();
        }

        let store = FileReportStore::new(dir.path().join("reports")).await.unwrap();
        assert_eq!(store.get(report.id()).await.unwrap(), Some(report.clone()));
        assert_eq!(store.list("t1").await.unwrap().len(), 1);
        assert!(store.list("t2").await.unwrap().is_empty());
        assert!(store.get("../etc/passwd").await.unwrap().is_none());
        assert!(store.get("rpt_missing").await.unwrap().is_none());
    }
}
