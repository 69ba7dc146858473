//! Channel identifiers and delivery addressing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An external messaging transport a report notification can travel over.
///
/// Adding a transport means adding a variant here and registering a provider
/// for it; nothing else enumerates channels by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    /// Short message (single-part SMS).
    Sms,
    /// Long message (LMS), always sent as the long type.
    Lms,
    /// Kakao alimtalk business message, rendered from a server-side template.
    Kakao,
    /// Email with an HTML body.
    Email,
}

impl Channel {
    /// Every known channel.
    pub const ALL: [Channel; 4] = [Channel::Sms, Channel::Lms, Channel::Kakao, Channel::Email];

    /// Wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "SMS",
            Channel::Lms => "LMS",
            Channel::Kakao => "KAKAO",
            Channel::Email => "EMAIL",
        }
    }

    /// What kind of contact the channel addresses.
    pub fn contact_kind(&self) -> ContactKind {
        match self {
            Channel::Email => ContactKind::Email,
            Channel::Sms | Channel::Lms | Channel::Kakao => ContactKind::Phone,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SMS" => Ok(Channel::Sms),
            "LMS" => Ok(Channel::Lms),
            "KAKAO" | "ALIMTALK" => Ok(Channel::Kakao),
            "EMAIL" => Ok(Channel::Email),
            other => Err(crate::Error::Invalid(format!("unknown channel: {}", other))),
        }
    }
}

/// The kind of contact a channel delivers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Phone,
    Email,
}

/// The guardian a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Display name.
    pub name: String,

    /// Phone number or email address, depending on the channel.
    pub contact: String,
}

impl Recipient {
    /// Create a new recipient.
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
        }
    }
}

/// Advisory linkage carried with every send and stored on the ledger row.
///
/// Not a foreign key: the referenced report or student may be gone later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    pub tenant_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,

    pub report_id: String,

    pub sender_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_parse() {
        assert_eq!("sms".parse::<Channel>().unwrap(), Channel::Sms);
        assert_eq!(" LMS ".parse::<Channel>().unwrap(), Channel::Lms);
        assert_eq!("alimtalk".parse::<Channel>().unwrap(), Channel::Kakao);
        assert!("fax".parse::<Channel>().is_err());
    }

    #[test]
    fn test_channel_serde_uses_wire_ids() {
        assert_eq!(serde_json::to_string(&Channel::Kakao).unwrap(), "\"KAKAO\"");
        let ch: Channel = serde_json::from_str("\"EMAIL\"").unwrap();
        assert_eq!(ch, Channel::Email);
        for ch in Channel::ALL {
            assert_eq!(ch.to_string(), ch.as_str());
        }
    }

    #[test]
    fn test_contact_kind() {
        assert_eq!(Channel::Email.contact_kind(), ContactKind::Email);
        assert_eq!(Channel::Kakao.contact_kind(), ContactKind::Phone);
    }

    #[test]
    fn test_correlation_camel_case() {
        let c = Correlation {
            tenant_id: "t1".into(),
            student_id: None,
            report_id: "r1".into(),
            sender_id: "u1".into(),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["tenantId"], "t1");
        assert!(json.get("studentId").is_none());
    }
}
