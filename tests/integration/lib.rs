//! Shared fixtures for the integration tests.

use chrono::NaiveDate;
use reportcast_core::{AcademyInfo, Config};
use reportcast_dispatch::store::{
    ActivitySnapshot, AssignmentRecord, AttendanceRecord, AttendanceStatus, ConsultationRecord,
    ExamRecord, Guardian, StudentRecord,
};
use std::path::Path;

pub const TENANT: &str = "academy-1";
pub const STUDENT: &str = "stu-1";

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).expect("valid March date")
}

/// Configuration pointing the SMS gateway at `gateway_url` and all storage into `dir`.
pub fn config(gateway_url: &str, dir: &Path) -> Config {
    let mut config = Config::parse(&format!(
        r#"{{
            reports: {{ base_url: "https://reports.example.com/app" }},
            messaging: {{
                sms: {{
                    api_url: "{}",
                    user_id: "academy",
                    api_key: "test-key",
                    sender: "02-123-4567",
                    timeout_secs: 5,
                    sms_cost: 20,
                    lms_cost: 50,
                }},
            }},
            ledger: {{ backend: "sqlite" }},
        }}"#,
        gateway_url
    ))
    .expect("fixture config parses");
    config.ledger.path = Some(dir.join("ledger.db"));
    config.storage.reports_dir = Some(dir.join("reports"));
    config.storage.activity_file = Some(dir.join("activity.json"));
    config
}

/// One student in March 2024: exams 85 and 95, attendance 9 of 10, homework 4 of 5.
pub fn snapshot() -> ActivitySnapshot {
    let student = StudentRecord {
        id: STUDENT.into(),
        tenant_id: TENANT.into(),
        name: "김민준".into(),
        grade: Some("중2".into()),
        school: None,
        guardians: vec![Guardian {
            name: "김엄마".into(),
            phone: Some("010-1234-5678".into()),
            email: Some("mom@example.com".into()),
            primary: true,
        }],
        deleted_at: None,
    };

    let exams = vec![
        ExamRecord {
            student_id: STUDENT.into(),
            name: "수학 단원평가".into(),
            date: day(8),
            score: 85.0,
            max_score: 100.0,
        },
        ExamRecord {
            student_id: STUDENT.into(),
            name: "영어 모의고사".into(),
            date: day(22),
            score: 95.0,
            max_score: 100.0,
        },
    ];

    let attendance = (1..=10)
        .map(|d| AttendanceRecord {
            student_id: STUDENT.into(),
            date: day(d),
            status: if d == 5 {
                AttendanceStatus::Late
            } else {
                AttendanceStatus::Present
            },
        })
        .collect();

    let assignments = (1..=5)
        .map(|d| AssignmentRecord {
            student_id: STUDENT.into(),
            due_date: day(d * 5),
            completed: d != 3,
        })
        .collect();

    let consultations = vec![ConsultationRecord {
        student_id: STUDENT.into(),
        date: day(15),
        category: Some("학습".into()),
        summary: "서술형 풀이 연습 필요".into(),
    }];

    ActivitySnapshot {
        academy: Some(AcademyInfo {
            name: "해법수학".into(),
            phone: None,
        }),
        students: vec![student],
        exams,
        attendance,
        assignments,
        consultations,
    }
}

/// Write the fixture snapshot where `config` expects it.
pub fn write_snapshot(config: &Config) {
    let path = config.activity_file().expect("activity path");
    let json = serde_json::to_string_pretty(&snapshot()).expect("snapshot serializes");
    std::fs::write(path, json).expect("snapshot written");
}
