//! Report aggregation (`GenerateStudentReport`).

use crate::error::{AggregateError, StoreError};
use crate::store::{ActivitySource, AttendanceStatus};
use reportcast_core::{
    average_percentage, AcademyInfo, AttendanceSummary, ConsultationSummary, DateRange,
    ExamResult, HomeworkSummary, Report, ReportData, ReportType, StudentSummary,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consultations kept per report.
pub const DEFAULT_CONSULTATION_LIMIT: usize = 5;

/// What to generate.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub tenant_id: String,
    pub student_id: String,
    pub period: DateRange,
    pub report_type: ReportType,
    pub generated_by: String,
    pub comment: Option<String>,
}

/// Builds reports from a student's activity records.
///
/// The student lookup runs first and gates everything else. The four
/// activity queries then run concurrently; any one of them failing is
/// logged and replaced with an empty result, so a partial report is still
/// produced.
pub struct ReportAggregator {
    source: Arc<dyn ActivitySource>,
    academy: Option<AcademyInfo>,
    consultation_limit: usize,
}

impl ReportAggregator {
    pub fn new(source: Arc<dyn ActivitySource>) -> Self {
        Self {
            source,
            academy: None,
            consultation_limit: DEFAULT_CONSULTATION_LIMIT,
        }
    }

    /// Academy display fields stamped on every report.
    pub fn with_academy(mut self, academy: Option<AcademyInfo>) -> Self {
        self.academy = academy;
        self
    }

    pub fn with_consultation_limit(mut self, limit: usize) -> Self {
        self.consultation_limit = limit;
        self
    }

    /// Generate a report. Fails only if the student is missing or deleted,
    /// or the student lookup itself fails.
    pub async fn generate(&self, request: GenerateRequest) -> Result<Report, AggregateError> {
        let tenant = request.tenant_id.as_str();
        let student_id = request.student_id.as_str();
        let period = &request.period;

        let student = self
            .source
            .student(tenant, student_id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| AggregateError::NotFound(student_id.to_string()))?;

        debug!("Aggregating {} for {} ({})", request.report_type, student.name, period);

        let (exams, attendance, assignments, consultations) = tokio::join!(
            or_empty("exams", student_id, self.source.exams(tenant, student_id, period)),
            or_empty(
                "attendance",
                student_id,
                self.source.attendance(tenant, student_id, period)
            ),
            or_empty(
                "assignments",
                student_id,
                self.source.assignments(tenant, student_id, period)
            ),
            or_empty(
                "consultations",
                student_id,
                self.source.consultations(tenant, student_id, period)
            ),
        );

        let mut exams: Vec<ExamResult> = exams
            .into_iter()
            .map(|e| ExamResult::new(e.name, e.date, e.score, e.max_score))
            .collect();
        exams.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));

        let count = |status| attendance.iter().filter(|a| a.status == status).count() as u32;
        let attendance = AttendanceSummary::from_counts(
            count(AttendanceStatus::Present),
            count(AttendanceStatus::Late),
            count(AttendanceStatus::Absent),
        );

        let homework = HomeworkSummary::from_counts(
            assignments.len() as u32,
            assignments.iter().filter(|a| a.completed).count() as u32,
        );

        let mut consultations = consultations;
        consultations.sort_by(|a, b| b.date.cmp(&a.date));
        let consultations = consultations
            .into_iter()
            .take(self.consultation_limit)
            .map(|c| ConsultationSummary {
                date: c.date,
                category: c.category,
                summary: c.summary,
            })
            .collect();

        let data = ReportData {
            student: StudentSummary {
                id: student.id.clone(),
                name: student.name,
                grade: student.grade,
                school: student.school,
            },
            period: request.period,
            avg_score: average_percentage(&exams),
            exams,
            attendance,
            homework,
            consultations,
            comment: request.comment.filter(|c| !c.trim().is_empty()),
            academy: self.academy.clone(),
        };

        let report = Report::new(
            request.tenant_id,
            Some(student.id),
            request.report_type,
            data,
            request.generated_by,
        );
        info!(
            "Generated report {} (avg {}, attendance {}%, homework {}%)",
            report.id(),
            report.data().avg_score,
            report.data().attendance.rate,
            report.data().homework.rate
        );
        Ok(report)
    }
}

/// Await a sub-fetch, substituting an empty result on failure.
async fn or_empty<T>(
    what: &str,
    student_id: &str,
    fetch: impl Future<Output = Result<Vec<T>, StoreError>>,
) -> Vec<T> {
    match fetch.await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Failed to fetch {} for {}; using empty data: {}", what, student_id, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        ActivitySnapshot, AssignmentRecord, AttendanceRecord, ConsultationRecord, ExamRecord,
        SnapshotActivitySource, StudentRecord,
    };
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn september() -> DateRange {
        DateRange::new(d(9, 1), d(9, 30)).unwrap()
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            tenant_id: "t1".into(),
            student_id: "stu-1".into(),
            period: september(),
            report_type: ReportType::Monthly,
            generated_by: "teacher-1".into(),
            comment: Some("잘하고 있어요".into()),
        }
    }

    fn student() -> StudentRecord {
        StudentRecord {
            id: "stu-1".into(),
            tenant_id: "t1".into(),
            name: "김민준".into(),
            grade: Some("중2".into()),
            school: None,
            guardians: vec![],
            deleted_at: None,
        }
    }

    fn scenario() -> ActivitySnapshot {
        let exam = |name: &str, day, score| ExamRecord {
            student_id: "stu-1".into(),
            name: name.into(),
            date: d(9, day),
            score,
            max_score: 100.0,
        };
        let mut attendance: Vec<AttendanceRecord> = (1..=9)
            .map(|day| AttendanceRecord {
                student_id: "stu-1".into(),
                date: d(9, day),
                status: AttendanceStatus::Present,
            })
            .collect();
        attendance.push(AttendanceRecord {
            student_id: "stu-1".into(),
            date: d(9, 10),
            status: AttendanceStatus::Absent,
        });
        let assignments = (1..=5)
            .map(|day| AssignmentRecord {
                student_id: "stu-1".into(),
                due_date: d(9, day),
                completed: day != 3,
            })
            .collect();
        let consultations = (1..=7)
            .map(|day| ConsultationRecord {
                student_id: "stu-1".into(),
                date: d(9, day * 2),
                category: None,
                summary: format!("상담 {}", day),
            })
            .collect();

        ActivitySnapshot {
            academy: None,
            students: vec![student()],
            exams: vec![exam("b", 20, 90.0), exam("a", 5, 80.0), exam("c", 25, 100.0)],
            attendance,
            assignments,
            consultations,
        }
    }

    /// Source whose activity queries can be made to fail.
    struct FlakySource {
        inner: SnapshotActivitySource,
        fail_attendance: bool,
    }

    #[async_trait]
    impl ActivitySource for FlakySource {
        async fn student(
            &self,
            tenant_id: &str,
            student_id: &str,
        ) -> Result<Option<StudentRecord>, StoreError> {
            self.inner.student(tenant_id, student_id).await
        }

        async fn exams(
            &self,
            t: &str,
            s: &str,
            p: &DateRange,
        ) -> Result<Vec<ExamRecord>, StoreError> {
            self.inner.exams(t, s, p).await
        }

        async fn attendance(
            &self,
            t: &str,
            s: &str,
            p: &DateRange,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            if self.fail_attendance {
                return Err(StoreError::Unavailable("attendance table offline".into()));
            }
            self.inner.attendance(t, s, p).await
        }

        async fn assignments(
            &self,
            t: &str,
            s: &str,
            p: &DateRange,
        ) -> Result<Vec<AssignmentRecord>, StoreError> {
            self.inner.assignments(t, s, p).await
        }

        async fn consultations(
            &self,
            t: &str,
            s: &str,
            p: &DateRange,
        ) -> Result<Vec<ConsultationRecord>, StoreError> {
            self.inner.consultations(t, s, p).await
        }
    }

    fn aggregator(snapshot: ActivitySnapshot) -> ReportAggregator {
        ReportAggregator::new(Arc::new(SnapshotActivitySource::new(snapshot)))
    }

    #[tokio::test]
    async fn test_scenario_rates() {
        let report = aggregator(scenario()).generate(request()).await.unwrap();
        let data = report.data();

        assert_eq!(data.avg_score, 90);
        assert_eq!(data.attendance.rate, 90);
        assert_eq!(data.attendance.total_days, 10);
        assert_eq!(data.attendance.present_days, 9);
        assert_eq!(data.attendance.absent_days, 1);
        assert_eq!(data.homework.rate, 80);
        assert_eq!(data.homework.total, 5);
        assert_eq!(data.homework.completed, 4);

        let names: Vec<_> = data.exams.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        assert_eq!(report.tenant_id(), "t1");
        assert_eq!(report.student_id(), Some("stu-1"));
        assert_eq!(report.generated_by(), "teacher-1");
    }

    #[tokio::test]
    async fn test_consultations_capped_newest_first() {
        let report = aggregator(scenario()).generate(request()).await.unwrap();
        let dates: Vec<_> = report.data().consultations.iter().map(|c| c.date).collect();
        assert_eq!(dates, vec![d(9, 14), d(9, 12), d(9, 10), d(9, 8), d(9, 6)]);
    }

    #[tokio::test]
    async fn test_empty_activity_yields_zero_rates() {
        let snapshot = ActivitySnapshot {
            students: vec![student()],
            ..Default::default()
        };
        let report = aggregator(snapshot).generate(request()).await.unwrap();
        let data = report.data();
        assert_eq!(data.avg_score, 0);
        assert_eq!(data.attendance.rate, 0);
        assert_eq!(data.homework.rate, 0);
        assert!(data.consultations.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_zeroes_only_that_section() {
        let source = FlakySource {
            inner: SnapshotActivitySource::new(scenario()),
            fail_attendance: true,
        };
        let report = ReportAggregator::new(Arc::new(source))
            .generate(request())
            .await
            .unwrap();
        let data = report.data();

        assert_eq!(data.attendance, AttendanceSummary::default());
        assert_eq!(data.avg_score, 90);
        assert_eq!(data.homework.rate, 80);
        assert_eq!(data.consultations.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_or_deleted_student() {
        let mut snapshot = scenario();
        let result = aggregator(snapshot.clone())
            .generate(GenerateRequest {
                student_id: "nobody".into(),
                ..request()
            })
            .await;
        assert!(matches!(result, Err(AggregateError::NotFound(_))));

        snapshot.students[0].deleted_at = Some(Utc::now());
        let result = aggregator(snapshot).generate(request()).await;
        assert!(matches!(result, Err(AggregateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_regeneration_is_deterministic() {
        let aggregator = aggregator(scenario());
        let first = aggregator.generate(request()).await.unwrap();
        let second = aggregator.generate(request()).await.unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(first.data(), second.data());
    }

    #[tokio::test]
    async fn test_academy_is_stamped() {
        let academy = AcademyInfo {
            name: "해법학원".into(),
            phone: None,
        };
        let report = aggregator(scenario())
            .with_academy(Some(academy.clone()))
            .generate(request())
            .await
            .unwrap();
        assert_eq!(report.data().academy, Some(academy));
    }
}
