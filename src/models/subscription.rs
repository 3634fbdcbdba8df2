// src/models/subscription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

pub const TRIAL_PLAN: &str = "trial";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub tenant_id: Uuid,
    pub plan_type: String,
    pub start_date: DateTime<Utc>,
    // NULL = assinatura sem data de término.
    pub end_date: Option<DateTime<Utc>>,
}

impl SubscriptionRecord {
    // Derivado, nunca armazenado.
    pub fn is_trial(&self) -> bool {
        self.plan_type.eq_ignore_ascii_case(TRIAL_PLAN)
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && self.end_date.is_none_or(|end| end > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    // None = ilimitado
    pub max_users: Option<u32>,
    pub max_branches: Option<u32>,
}

impl PlanLimits {
    pub const UNLIMITED: PlanLimits = PlanLimits {
        max_users: None,
        max_branches: None,
    };

    /// Tabela estática de planos. Plano desconhecido cai no mais restritivo.
    pub fn for_plan(plan: &str) -> Self {
        match plan.to_ascii_lowercase().as_str() {
            "professional" => PlanLimits {
                max_users: Some(25),
                max_branches: Some(5),
            },
            "enterprise" => Self::UNLIMITED,
            _ => PlanLimits {
                max_users: Some(5),
                max_branches: Some(1),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Suspended,
    Active,
    Trial,
    Expired,
}

/// Resultado do SubscriptionGate, recalculado a cada requisição.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub state: SubscriptionState,
    pub has_access: bool,
    pub is_trial: bool,
    pub trial_expired: bool,
    pub tenant_suspended: bool,
    pub plan_type: Option<String>,
    pub limits: Option<PlanLimits>,
    pub reason: String,
}
