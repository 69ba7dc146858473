//! Full pipeline tests: aggregate, store, dispatch over a mocked SMS gateway,
//! record in a SQLite ledger, then confirm delivery.

use reportcast_channels::ProviderRegistry;
use reportcast_core::{Channel, DateRange, MessageStatus, ReportType};
use reportcast_dispatch::{
    ActivitySource, DeliveryTracker, DispatchError, DispatchOrchestrator, ErrorKind,
    FileReportStore, FormatContext, GenerateRequest, RefreshOutcome, ReportAggregator,
    ReportStore, SendReportRequest, SnapshotActivitySource,
};
use reportcast_integration_tests::{config, day, write_snapshot, STUDENT, TENANT};
use reportcast_ledger::{Ledger, LedgerQuery};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Pipeline {
    _dir: TempDir,
    config: reportcast_core::Config,
    source: Arc<SnapshotActivitySource>,
    reports: Arc<FileReportStore>,
    ledger: Arc<dyn Ledger>,
    orchestrator: DispatchOrchestrator,
    tracker: DeliveryTracker,
}

async fn pipeline(server: &MockServer) -> Pipeline {
    pipeline_with(server, |_| {}).await
}

async fn pipeline_with(
    server: &MockServer,
    tweak: impl FnOnce(&mut reportcast_core::Config),
) -> Pipeline {
    let dir = TempDir::new().unwrap();
    let mut config = config(&server.uri(), dir.path());
    tweak(&mut config);
    write_snapshot(&config);

    let source = Arc::new(
        SnapshotActivitySource::load(&config.activity_file().unwrap())
            .await
            .unwrap(),
    );
    let reports = Arc::new(FileReportStore::new(config.reports_dir().unwrap()).await.unwrap());
    let registry = ProviderRegistry::from_config(&config.messaging).unwrap();
    let ledger = reportcast_ledger::open(&config).await.unwrap();

    let orchestrator = DispatchOrchestrator::new(
        reports.clone(),
        registry.clone(),
        ledger.clone(),
        FormatContext::from_config(&config).unwrap(),
    );
    let tracker = DeliveryTracker::new(registry, ledger.clone());

    Pipeline {
        _dir: dir,
        config,
        source,
        reports,
        ledger,
        orchestrator,
        tracker,
    }
}

impl Pipeline {
    async fn generate(&self) -> reportcast_core::Report {
        let aggregator = ReportAggregator::new(self.source.clone())
            .with_academy(self.source.academy().cloned());
        let report = aggregator
            .generate(GenerateRequest {
                tenant_id: TENANT.into(),
                student_id: STUDENT.into(),
                period: DateRange::new(day(1), day(31)).unwrap(),
                report_type: ReportType::Monthly,
                generated_by: "teacher-1".into(),
                comment: Some("꾸준히 잘하고 있습니다.".into()),
            })
            .await
            .unwrap();
        self.reports.save(&report).await.unwrap();
        report
    }

    async fn request(&self, report_id: &str, channel: Channel) -> SendReportRequest {
        let student = self.source.student(TENANT, STUDENT).await.unwrap().unwrap();
        SendReportRequest {
            report_id: report_id.to_string(),
            channel,
            recipient: student.recipient_for(channel).unwrap(),
            sender_id: "teacher-1".into(),
        }
    }
}

async fn mount_send(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/send/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_report_is_sent_logged_and_confirmed() {
    let server = MockServer::start().await;
    mount_send(
        &server,
        json!({"result_code": "1", "message": "success", "msg_id": "5001"}),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/sms_list/"))
        .and(body_string_contains("mid=5001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": 1,
            "message": "success",
            "list": [{"sms_state": "1", "reg_date": "2024-04-01 09:00:05"}]
        })))
        .mount(&server)
        .await;

    let p = pipeline(&server).await;
    let report = p.generate().await;
    assert_eq!(report.data().avg_score, 90);
    assert_eq!(report.data().attendance.rate, 90);
    assert_eq!(report.data().homework.rate, 80);

    let response = p
        .orchestrator
        .send_report(p.request(report.id(), Channel::Lms).await)
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.message_id.as_deref(), Some("5001"));
    assert_eq!(response.cost, Some(50.0));

    let sent = server.received_requests().await.unwrap();
    let form = String::from_utf8_lossy(&sent[0].body).to_string();
    assert!(form.contains("msg_type=LMS"));
    assert!(form.contains("receiver=01012345678"));

    let rows = p.ledger.list(&LedgerQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.status, MessageStatus::Sent);
    assert_eq!(row.channel, Channel::Lms);
    assert_eq!(row.provider, "aligo");
    assert_eq!(row.recipient_name, "김엄마");
    assert_eq!(row.metadata.report_id, report.id());
    assert_eq!(row.metadata.student_id.as_deref(), Some(STUDENT));
    assert!(row.message_body.contains("평균 점수: 90점"));
    assert!(row
        .message_body
        .contains(&format!("https://reports.example.com/app/reports/{}", report.id())));
    assert!(row.sent_at.is_some());

    let outcome = p.tracker.refresh(&row.id).await.unwrap();
    let RefreshOutcome::Updated(updated) = outcome else {
        panic!("expected the row to be updated");
    };
    assert_eq!(updated.status, MessageStatus::Delivered);
    assert!(updated.delivered_at.is_some());

    // A second confirmation never rewrites a final row
    assert!(matches!(
        p.tracker.refresh(&row.id).await.unwrap(),
        RefreshOutcome::AlreadyFinal(_)
    ));
}

#[tokio::test]
async fn test_gateway_rejection_is_logged_and_classified() {
    let server = MockServer::start().await;
    mount_send(
        &server,
        json!({"result_code": "-101", "message": "잔액이 부족합니다"}),
    )
    .await;

    let p = pipeline(&server).await;
    let report = p.generate().await;

    let response = p
        .orchestrator
        .send_report(p.request(report.id(), Channel::Sms).await)
        .await
        .unwrap();
    assert!(!response.success);

    let rows = p.ledger.list(&LedgerQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, MessageStatus::Failed);
    assert_eq!(rows[0].error_message.as_deref(), Some("잔액이 부족합니다"));
    assert!(rows[0].failed_at.is_some());
    assert!(rows[0].message_id.is_none());

    let classification = p.orchestrator.classify(&response).unwrap();
    assert_eq!(classification.code, "balance_insufficient");
    assert_eq!(classification.kind, ErrorKind::Recoverable);
    assert!(classification.retryable);

    // Resending appends a new attempt
    p.orchestrator
        .send_report(p.request(report.id(), Channel::Sms).await)
        .await
        .unwrap();
    assert_eq!(p.ledger.list(&LedgerQuery::default()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unconfigured_channel_writes_nothing() {
    let server = MockServer::start().await;
    let p = pipeline(&server).await;
    let report = p.generate().await;

    let err = p
        .orchestrator
        .send_report(p.request(report.id(), Channel::Kakao).await)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnconfiguredChannel(Channel::Kakao)));
    assert_eq!(p.orchestrator.classify_error(&err).code, "provider_unconfigured");

    let err = p
        .orchestrator
        .send_report(p.request("rpt_missing", Channel::Sms).await)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));

    assert!(p.ledger.list(&LedgerQuery::default()).await.unwrap().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ledger_and_reports_survive_reopen() {
    let server = MockServer::start().await;
    mount_send(
        &server,
        json!({"result_code": "1", "message": "success", "msg_id": "7"}),
    )
    .await;

    let p = pipeline(&server).await;
    let report = p.generate().await;
    p.orchestrator
        .send_report(p.request(report.id(), Channel::Sms).await)
        .await
        .unwrap();

    let ledger = reportcast_ledger::open(&p.config).await.unwrap();
    let rows = ledger
        .list(&LedgerQuery {
            tenant_id: Some(TENANT.into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].message_id.as_deref(), Some("7"));
    // The report link pushes the short notice past the 90-byte SMS limit
    assert_eq!(rows[0].cost, Some(50.0));

    let reports = FileReportStore::new(p.config.reports_dir().unwrap())
        .await
        .unwrap();
    let stored = reports.get(report.id()).await.unwrap().unwrap();
    assert_eq!(stored, report);
}

#[tokio::test]
async fn test_short_link_keeps_sms_short() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send/"))
        .and(body_string_contains("msg_type=SMS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result_code": "1",
            "message": "success",
            "msg_id": "8"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let p = pipeline_with(&server, |config| {
        config.reports.short_base_url = Some("https://rc.kr".into());
    })
    .await;
    let report = p.generate().await;

    let response = p
        .orchestrator
        .send_report(p.request(report.id(), Channel::Sms).await)
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.cost, Some(20.0));

    let rows = p.ledger.list(&LedgerQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0]
        .message_body
        .ends_with(&format!("https://rc.kr/reports/{}", report.id())));
}
