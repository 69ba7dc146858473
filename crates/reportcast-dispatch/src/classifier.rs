//! Failure classification.
//!
//! Raw failure text from providers (or raised internally) is matched
//! case-insensitively against an ordered rule table. The first rule in
//! table order with a matching pattern wins; text no rule matches falls
//! back to a generic retryable `temporary` classification, so
//! [`ErrorClassifier::classify`] always returns a usable result.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use reportcast_core::config::{ClassifierConfig, ClassifierRuleConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What kind of action a failure calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Configuration or data the operator must fix before any resend works.
    Structural,
    /// An account condition fixable out of band; then resend as-is.
    Recoverable,
    /// A network or server fault; resending may simply work.
    Temporary,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Structural => "structural",
            ErrorKind::Recoverable => "recoverable",
            ErrorKind::Temporary => "temporary",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structural" => Ok(ErrorKind::Structural),
            "recoverable" => Ok(ErrorKind::Recoverable),
            "temporary" => Ok(ErrorKind::Temporary),
            other => Err(ClassifierError::InvalidKind(other.to_string())),
        }
    }
}

/// Errors building a classifier from configured rules.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("unknown error kind '{0}'")]
    InvalidKind(String),

    #[error("rule '{0}' has no patterns")]
    EmptyRule(String),

    #[error("failed to build pattern matcher: {0}")]
    Build(#[from] aho_corasick::BuildError),
}

/// One classification rule: any pattern matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub code: String,
    pub kind: ErrorKind,
    pub patterns: Vec<String>,
    pub title: String,
    pub description: String,
    pub remedy: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,
}

impl Rule {
    fn classification(&self) -> ErrorClassification {
        ErrorClassification {
            code: self.code.clone(),
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            remedy: self.remedy.clone(),
            retryable: self.retryable,
            help_link: self.help_link.clone(),
        }
    }
}

impl TryFrom<&ClassifierRuleConfig> for Rule {
    type Error = ClassifierError;

    fn try_from(config: &ClassifierRuleConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            code: config.code.clone(),
            kind: config.kind.parse()?,
            patterns: config.patterns.clone(),
            title: config.title.clone(),
            description: config.description.clone(),
            remedy: config.remedy.clone(),
            retryable: config.retryable,
            help_link: config.help_link.clone(),
        })
    }
}

/// A versioned, ordered rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: u32,
    pub rules: Vec<Rule>,
}

/// Structured, operator-facing description of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorClassification {
    pub code: String,
    pub kind: ErrorKind,
    pub title: String,
    pub description: String,
    pub remedy: String,
    pub retryable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,
}

const BUILTIN_VERSION: u32 = 1;

// (code, kind, patterns, title, description, remedy, retryable, help link)
type RuleRow = (
    &'static str,
    ErrorKind,
    &'static [&'static str],
    &'static str,
    &'static str,
    &'static str,
    bool,
    Option<&'static str>,
);

const BUILTIN_RULES: &[RuleRow] = &[
    // Structural
    (
        "provider_unconfigured",
        ErrorKind::Structural,
        &["is not configured", "no provider configured", "활성화된 발송", "발송 서비스가 설정"],
        "발송 서비스 미설정",
        "이 채널로 메시지를 보낼 발송 서비스가 설정되어 있지 않습니다.",
        "설정 > 메시지 발송에서 해당 채널의 발송 서비스를 등록하세요.",
        false,
        Some("/settings/messaging"),
    ),
    (
        "guardian_missing",
        ErrorKind::Structural,
        &["보호자", "no guardian"],
        "보호자 정보 없음",
        "학생에게 등록된 보호자가 없거나 연락 가능한 보호자가 없습니다.",
        "학생 정보에서 보호자와 연락처를 등록하세요.",
        false,
        Some("/students"),
    ),
    (
        "contact_invalid",
        ErrorKind::Structural,
        &["연락처", "이메일 주소", "invalid recipient", "invalid phone"],
        "수신자 연락처 오류",
        "수신자 연락처가 비어 있거나 형식이 올바르지 않습니다.",
        "보호자의 전화번호 또는 이메일 주소를 확인하세요.",
        false,
        Some("/students"),
    ),
    (
        "academy_info_missing",
        ErrorKind::Structural,
        &["학원 정보", "academy display name"],
        "학원 정보 없음",
        "메시지에 표시할 학원 이름이 설정되어 있지 않습니다.",
        "설정 > 학원 정보에서 학원 이름을 입력하세요.",
        false,
        Some("/settings/academy"),
    ),
    (
        "template_missing",
        ErrorKind::Structural,
        &["템플릿", "template"],
        "알림톡 템플릿 미등록",
        "알림톡 발송에 필요한 승인된 템플릿이 등록되어 있지 않습니다.",
        "설정 > 메시지 발송에서 승인된 알림톡 템플릿을 등록하세요.",
        false,
        Some("/settings/messaging"),
    ),
    (
        "record_missing",
        ErrorKind::Structural,
        &[
            "report not found",
            "student not found",
            "리포트를 찾을 수 없",
            "학생을 찾을 수 없",
        ],
        "대상 정보 없음",
        "리포트 또는 학생 정보가 삭제되었거나 존재하지 않습니다.",
        "리포트를 다시 생성한 뒤 발송하세요.",
        false,
        Some("/reports"),
    ),
    (
        "request_rejected",
        ErrorKind::Structural,
        &["request rejected", "http 400", "http 404"],
        "발송 요청 거부",
        "발송 서비스가 요청 형식이나 주소를 받아들이지 않았습니다.",
        "설정 > 메시지 발송에서 발송 서비스 주소와 설정 값을 확인하세요.",
        false,
        Some("/settings/messaging"),
    ),
    // Recoverable
    (
        "balance_insufficient",
        ErrorKind::Recoverable,
        &["잔액", "잔여", "insufficient balance", "not enough credit"],
        "발송 잔액 부족",
        "메시지 발송 서비스의 충전 잔액이 부족합니다.",
        "발송 서비스에서 잔액을 충전한 뒤 다시 보내세요.",
        true,
        Some("/settings/messaging"),
    ),
    (
        "sender_unregistered",
        ErrorKind::Recoverable,
        &["발신번호", "발신 번호", "sender number", "unregistered sender"],
        "발신번호 미등록",
        "발신번호가 발송 서비스에 등록되어 있지 않거나 승인되지 않았습니다.",
        "발송 서비스에서 발신번호를 등록하고 승인을 받으세요.",
        false,
        Some("/settings/messaging"),
    ),
    (
        "credentials_invalid",
        ErrorKind::Recoverable,
        &[
            "인증",
            "api key",
            "apikey",
            "invalid credentials",
            "unauthorized",
            "authentication",
        ],
        "발송 서비스 인증 실패",
        "발송 서비스의 API 키 또는 계정 정보가 올바르지 않습니다.",
        "설정 > 메시지 발송에서 API 키와 계정 아이디를 확인하세요.",
        false,
        Some("/settings/messaging"),
    ),
    // Temporary
    (
        "rate_limited",
        ErrorKind::Temporary,
        &["rate limited", "too many requests", "http 429"],
        "요청 한도 초과",
        "짧은 시간에 너무 많은 발송 요청을 보냈습니다.",
        "잠시 후 다시 시도하세요.",
        true,
        None,
    ),
    (
        "timeout",
        ErrorKind::Temporary,
        &["timed out", "timeout", "시간 초과", "시간이 초과"],
        "응답 시간 초과",
        "발송 서비스가 제한 시간 안에 응답하지 않았습니다.",
        "잠시 후 다시 시도하세요.",
        true,
        None,
    ),
    (
        "dns_failure",
        ErrorKind::Temporary,
        &["dns", "failed to lookup address", "name resolution"],
        "주소 확인 실패",
        "발송 서비스의 주소를 확인하지 못했습니다.",
        "네트워크 상태를 확인한 뒤 다시 시도하세요.",
        true,
        None,
    ),
    (
        "network_error",
        ErrorKind::Temporary,
        &["network error", "connection", "연결"],
        "네트워크 오류",
        "발송 서비스와 통신하는 중 네트워크 오류가 발생했습니다.",
        "잠시 후 다시 시도하세요.",
        true,
        None,
    ),
    (
        "server_error",
        ErrorKind::Temporary,
        &["server error", "http 5", "서버 오류"],
        "발송 서비스 서버 오류",
        "발송 서비스 서버에서 오류가 발생했습니다.",
        "잠시 후 다시 시도하세요.",
        true,
        None,
    ),
    (
        "link_shortening",
        ErrorKind::Temporary,
        &["shorten", "단축"],
        "링크 생성 실패",
        "리포트 링크를 만드는 중 일시적인 오류가 발생했습니다.",
        "잠시 후 다시 시도하세요.",
        true,
        None,
    ),
];

impl RuleSet {
    /// The built-in rule table.
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(
                |(code, kind, patterns, title, description, remedy, retryable, help_link)| Rule {
                    code: code.to_string(),
                    kind: *kind,
                    patterns: patterns.iter().map(|p| p.to_string()).collect(),
                    title: title.to_string(),
                    description: description.to_string(),
                    remedy: remedy.to_string(),
                    retryable: *retryable,
                    help_link: help_link.map(str::to_string),
                },
            )
            .collect();
        Self {
            version: BUILTIN_VERSION,
            rules,
        }
    }

    /// The built-in table with configured rules evaluated first.
    pub fn with_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let mut rules = config
            .extra_rules
            .iter()
            .map(Rule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let builtin = Self::builtin();
        rules.extend(builtin.rules);
        Ok(Self {
            version: builtin.version,
            rules,
        })
    }
}

static BUILTIN: Lazy<ErrorClassifier> = Lazy::new(|| {
    ErrorClassifier::new(RuleSet::builtin()).expect("Failed to build built-in classifier")
});

/// Classify with the built-in rule table.
pub fn classify(raw: &str) -> ErrorClassification {
    BUILTIN.classify(raw)
}

/// Compiled rule table.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rule_set: RuleSet,
    automaton: AhoCorasick,
    /// Rule index for each automaton pattern.
    pattern_rules: Vec<usize>,
}

impl ErrorClassifier {
    /// Compile a rule set.
    pub fn new(rule_set: RuleSet) -> Result<Self, ClassifierError> {
        let mut patterns = Vec::new();
        let mut pattern_rules = Vec::new();
        for (index, rule) in rule_set.rules.iter().enumerate() {
            let mut any = false;
            for pattern in rule.patterns.iter().filter(|p| !p.trim().is_empty()) {
                patterns.push(pattern.to_lowercase());
                pattern_rules.push(index);
                any = true;
            }
            if !any {
                return Err(ClassifierError::EmptyRule(rule.code.clone()));
            }
        }

        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&patterns)?;

        Ok(Self {
            rule_set,
            automaton,
            pattern_rules,
        })
    }

    /// Built-in rules plus configured extras.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        Self::new(RuleSet::with_config(config)?)
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Classify raw failure text. Never fails.
    pub fn classify(&self, raw: &str) -> ErrorClassification {
        let haystack = raw.to_lowercase();
        self.automaton
            .find_overlapping_iter(&haystack)
            .map(|m| self.pattern_rules[m.pattern().as_usize()])
            .min()
            .map(|index| self.rule_set.rules[index].classification())
            .unwrap_or_else(fallback)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

fn fallback() -> ErrorClassification {
    ErrorClassification {
        code: "unknown".to_string(),
        kind: ErrorKind::Temporary,
        title: "발송 실패".to_string(),
        description: "알 수 없는 이유로 메시지를 보내지 못했습니다.".to_string(),
        remedy: "잠시 후 다시 시도하고, 계속 실패하면 관리자에게 문의하세요.".to_string(),
        retryable: true,
        help_link: None,
    }
}
