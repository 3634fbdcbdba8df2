// src/models/security.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityEventType {
    UnauthorizedAccess,
    SuspiciousActivity,
    SecurityViolation,
    RateLimitExceeded,
    TenantStatusChanged,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::UnauthorizedAccess => "UnauthorizedAccess",
            SecurityEventType::SuspiciousActivity => "SuspiciousActivity",
            SecurityEventType::SecurityViolation => "SecurityViolation",
            SecurityEventType::RateLimitExceeded => "RateLimitExceeded",
            SecurityEventType::TenantStatusChanged => "TenantStatusChanged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

// Só os primeiros caracteres do id vão para a auditoria.
pub fn mask_id(id: Uuid) -> String {
    let raw = id.to_string();
    format!("{}****", &raw[..8])
}

// Registro de auditoria. Só acrescentado, nunca alterado.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub event_type: SecurityEventType,
    pub description: String,
    pub ip_address: String,
    pub user_id: Option<Uuid>,
    pub user_agent: Option<String>,
    pub request_path: String,
    pub risk_level: RiskLevel,
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn new(
        event_type: SecurityEventType,
        risk_level: RiskLevel,
        description: impl Into<String>,
        origin: &RequestOrigin,
    ) -> Self {
        Self {
            event_type,
            description: description.into(),
            ip_address: origin.ip_address.clone(),
            user_id: None,
            user_agent: origin.user_agent.clone(),
            request_path: origin.path.clone(),
            risk_level,
            metadata: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Quem está pedindo: IP, User-Agent e rota. Guardado nas extensions.
#[derive(Debug, Clone)]
pub struct RequestOrigin {
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IpBlockEntry {
    pub ip_address: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
