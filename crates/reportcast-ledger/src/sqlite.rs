//! SQLite-backed ledger.

use crate::store::{Ledger, LedgerQuery};
use crate::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reportcast_core::{Correlation, DeliveryUpdate, MessageLog};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS message_logs (
    id                TEXT PRIMARY KEY,
    tenant_id         TEXT NOT NULL,
    channel           TEXT NOT NULL,
    provider          TEXT NOT NULL,
    recipient_name    TEXT NOT NULL,
    recipient_contact TEXT NOT NULL,
    message_subject   TEXT,
    message_body      TEXT NOT NULL,
    status            TEXT NOT NULL,
    message_id        TEXT,
    cost              REAL,
    error_message     TEXT,
    metadata          TEXT NOT NULL,
    sent_at           TEXT,
    delivered_at      TEXT,
    failed_at         TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_message_logs_tenant ON message_logs (tenant_id);
CREATE INDEX IF NOT EXISTS idx_message_logs_message_id ON message_logs (message_id);
"#;

const COLUMNS: &str = "id, tenant_id, channel, provider, recipient_name, recipient_contact, \
    message_subject, message_body, status, message_id, cost, error_message, metadata, \
    sent_at, delivered_at, failed_at, created_at, updated_at";

/// Ledger persisted to a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Open (or create) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        info!("Opened ledger database {}", path.display());
        Self::with_pool(pool).await
    }

    /// A private in-memory database. One connection, so every query sees
    /// the same data.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    async fn fetch_one_where(&self, column: &str, value: &str) -> Result<Option<MessageLog>> {
        let sql = format!(
            "SELECT {} FROM message_logs WHERE {} = ? ORDER BY rowid DESC LIMIT 1",
            COLUMNS, column
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }
}

fn decode_row(row: &SqliteRow) -> Result<MessageLog> {
    let id: String = row.try_get("id")?;
    let corrupt = |field: &str, e: &dyn std::fmt::Display| {
        LedgerError::Corrupt(format!("{} on row {}: {}", field, id, e))
    };

    let channel: String = row.try_get("channel")?;
    let status: String = row.try_get("status")?;
    let metadata: String = row.try_get("metadata")?;

    Ok(MessageLog {
        tenant_id: row.try_get("tenant_id")?,
        channel: channel.parse().map_err(|e| corrupt("channel", &e))?,
        provider: row.try_get("provider")?,
        recipient_name: row.try_get("recipient_name")?,
        recipient_contact: row.try_get("recipient_contact")?,
        message_subject: row.try_get("message_subject")?,
        message_body: row.try_get("message_body")?,
        status: status.parse().map_err(|e| corrupt("status", &e))?,
        message_id: row.try_get("message_id")?,
        cost: row.try_get("cost")?,
        error_message: row.try_get("error_message")?,
        metadata: serde_json::from_str::<Correlation>(&metadata)
            .map_err(|e| corrupt("metadata", &e))?,
        sent_at: row.try_get::<Option<DateTime<Utc>>, _>("sent_at")?,
        delivered_at: row.try_get::<Option<DateTime<Utc>>, _>("delivered_at")?,
        failed_at: row.try_get::<Option<DateTime<Utc>>, _>("failed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        id,
    })
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn append(&self, log: MessageLog) -> Result<()> {
        let metadata = serde_json::to_string(&log.metadata)?;
        let sql = format!(
            "INSERT INTO message_logs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COLUMNS
        );

        let result = sqlx::query(&sql)
            .bind(&log.id)
            .bind(&log.tenant_id)
            .bind(log.channel.as_str())
            .bind(&log.provider)
            .bind(&log.recipient_name)
            .bind(&log.recipient_contact)
            .bind(&log.message_subject)
            .bind(&log.message_body)
            .bind(log.status.as_str())
            .bind(&log.message_id)
            .bind(log.cost)
            .bind(&log.error_message)
            .bind(metadata)
            .bind(log.sent_at)
            .bind(log.delivered_at)
            .bind(log.failed_at)
            .bind(log.created_at)
            .bind(log.updated_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                debug!("Ledger append {} ({})", log.id, log.status);
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(LedgerError::Conflict(format!("duplicate id {}", log.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<MessageLog>> {
        self.fetch_one_where("id", id).await
    }

    async fn find_by_message_id(&self, message_id: &str) -> Result<Option<MessageLog>> {
        self.fetch_one_where("message_id", message_id).await
    }

    async fn list(&self, query: &LedgerQuery) -> Result<Vec<MessageLog>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM message_logs WHERE 1 = 1", COLUMNS));

        if let Some(tenant_id) = &query.tenant_id {
            builder.push(" AND tenant_id = ").push_bind(tenant_id.clone());
        }
        if let Some(channel) = query.channel {
            builder.push(" AND channel = ").push_bind(channel.as_str());
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        builder
            .push(" ORDER BY rowid DESC LIMIT ")
            .push_bind(query.limit as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn record_delivery(&self, id: &str, update: DeliveryUpdate) -> Result<MessageLog> {
        let mut log = self
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(id))?;

        log.apply(update, Utc::now())
            .map_err(|e| LedgerError::Conflict(e.to_string()))?;

        // Guard on the old status so a concurrent confirmation cannot
        // overwrite a terminal row.
        let result = sqlx::query(
            "UPDATE message_logs SET status = ?, delivered_at = ?, failed_at = ?, \
             error_message = ?, updated_at = ? WHERE id = ? AND status = 'sent'",
        )
        .bind(log.status.as_str())
        .bind(log.delivered_at)
        .bind(log.failed_at)
        .bind(&log.error_message)
        .bind(log.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::Conflict(format!(
                "message log {} changed concurrently",
                id
            )));
        }

        debug!("Ledger {} is now {}", id, log.status);
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportcast_core::{AttemptRecord, Channel, MessageContent, MessageStatus, Recipient};

    fn sent(tenant: &str, message_id: &str) -> MessageLog {
        let content = MessageContent::Text {
            subject: Some("[해법학원] 김민준 학습 리포트".into()),
            body: "본문".into(),
        };
        AttemptRecord::new(
            Channel::Lms,
            "aligo",
            Recipient::new("보호자", "01012345678"),
            Some(&content),
            Correlation {
                tenant_id: tenant.to_string(),
                student_id: Some("stu-1".into()),
                report_id: "rpt_1".into(),
                sender_id: "teacher-1".into(),
            },
        )
        .sent(message_id.to_string(), Some(25.0), Utc::now())
    }

    #[tokio::test]
    async fn test_round_trip_row() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        let log = sent("t1", "m-1");
        tokio_test::assert_ok!(ledger.append(log.clone()).await);

        let loaded = ledger.get(&log.id).await.unwrap().unwrap();
        assert_eq!(loaded.channel, Channel::Lms);
        assert_eq!(loaded.status, MessageStatus::Sent);
        assert_eq!(loaded.message_subject, log.message_subject);
        assert_eq!(loaded.metadata, log.metadata);
        assert_eq!(loaded.cost, Some(25.0));
        assert_eq!(loaded.sent_at, log.sent_at);
        assert!(loaded.delivered_at.is_none());

        let by_mid = ledger.find_by_message_id("m-1").await.unwrap().unwrap();
        assert_eq!(by_mid.id, log.id);
    }

    #[tokio::test]
    async fn test_duplicate_append() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        let log = sent("t1", "m-1");
        tokio_test::assert_ok!(ledger.append(log.clone()).await);
        assert!(matches!(
            ledger.append(log).await,
            Err(LedgerError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        let a = sent("t1", "m-1");
        let b = sent("t2", "m-2");
        let c = sent("t1", "m-3");
        for log in [&a, &b, &c] {
            ledger.append(log.clone()).await.unwrap();
        }

        let t1 = ledger
            .list(&LedgerQuery {
                tenant_id: Some("t1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = t1.iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids, vec![c.id.clone(), a.id.clone()]);

        let failed = ledger
            .list(&LedgerQuery {
                status: Some(MessageStatus::Failed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(failed.is_empty());
    }

    #[tokio::test]
    async fn test_record_delivery_once() {
        let ledger = SqliteLedger::in_memory().await.unwrap();
        let log = sent("t1", "m-1");
        tokio_test::assert_ok!(ledger.append(log.clone()).await);

        let updated = ledger
            .record_delivery(
                &log.id,
                DeliveryUpdate::Failed {
                    at: Utc::now(),
                    reason: "수신 거부".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, MessageStatus::Failed);

        let stored = ledger.get(&log.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("수신 거부"));

        assert!(matches!(
            ledger
                .record_delivery(&log.id, DeliveryUpdate::Delivered { at: Utc::now() })
                .await,
            Err(LedgerError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");
        let ledger = SqliteLedger::open(&path).await.unwrap();
        ledger.append(sent("t1", "m-1")).await.unwrap();
        assert!(path.exists());

        let reopened = SqliteLedger::open(&path).await.unwrap();
        assert_eq!(
            reopened.list(&LedgerQuery::default()).await.unwrap().len(),
            1
        );
    }
}
