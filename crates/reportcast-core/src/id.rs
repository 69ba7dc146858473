//! ID generation utilities.

use uuid::Uuid;

/// Generate a new UUID v4.
pub fn uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a report identifier.
pub fn report_id() -> String {
    format!("rpt_{}", Uuid::new_v4().simple())
}

/// Generate a delivery ledger identifier.
pub fn log_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid() {
        let id = uuid();
        assert_eq!(id.len(), 36);
        assert!(id.contains('-'));
    }

    #[test]
    fn test_prefixed_ids() {
        let report = report_id();
        let log = log_id();
        assert!(report.starts_with("rpt_"));
        assert!(log.starts_with("msg_"));
        assert_eq!(report.len(), 4 + 32);
        assert_ne!(log_id(), log);
    }
}
