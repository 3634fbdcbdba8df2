// src/services/subscription_gate.rs

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::{
    db::tenancy_repo::SubscriptionStore,
    models::{
        subscription::{PlanLimits, SubscriptionRecord, SubscriptionState, SubscriptionStatus},
        tenancy::TenantRecord,
    },
};

/// Máquina de estados da assinatura. Nada é persistido: recalcula a cada requisição.
///
/// - `Suspended`: tenant suspenso, sem acesso (terminal).
/// - `Active`: existe assinatura paga vigente; limites do plano anexados.
/// - `Trial`: sem assinatura, dentro da janela de teste (limite inclusivo).
/// - `Expired`: sem assinatura e janela de teste encerrada.
pub fn compute_status(
    tenant: &TenantRecord,
    subscriptions: &[SubscriptionRecord],
    now: DateTime<Utc>,
    trial_window: Duration,
) -> SubscriptionStatus {
    if tenant.is_suspended() {
        return SubscriptionStatus {
            state: SubscriptionState::Suspended,
            has_access: false,
            is_trial: false,
            trial_expired: false,
            tenant_suspended: true,
            plan_type: tenant.subscription_plan.clone(),
            limits: None,
            reason: "tenant suspended".to_string(),
        };
    }

    // Pode haver histórico; vale a paga vigente que termina por último.
    let active = subscriptions
        .iter()
        .filter(|s| !s.is_trial() && s.is_active_at(now))
        .max_by_key(|s| s.end_date.unwrap_or(DateTime::<Utc>::MAX_UTC));

    if let Some(subscription) = active {
        return SubscriptionStatus {
            state: SubscriptionState::Active,
            has_access: true,
            is_trial: false,
            trial_expired: false,
            tenant_suspended: false,
            plan_type: Some(subscription.plan_type.clone()),
            limits: Some(PlanLimits::for_plan(&subscription.plan_type)),
            reason: "active subscription".to_string(),
        };
    }

    // Janela que estoura o calendário nunca termina.
    let in_trial = tenant
        .created_at
        .checked_add_signed(trial_window)
        .is_none_or(|trial_end| now <= trial_end);
    if in_trial {
        return SubscriptionStatus {
            state: SubscriptionState::Trial,
            has_access: true,
            is_trial: true,
            trial_expired: false,
            tenant_suspended: false,
            plan_type: Some("trial".to_string()),
            limits: Some(PlanLimits::UNLIMITED),
            reason: "trial period".to_string(),
        };
    }

    SubscriptionStatus {
        state: SubscriptionState::Expired,
        has_access: false,
        is_trial: false,
        trial_expired: true,
        tenant_suspended: false,
        plan_type: None,
        limits: None,
        reason: "trial expired and no active subscription".to_string(),
    }
}

#[derive(Clone)]
pub struct SubscriptionGate {
    subscriptions: Arc<dyn SubscriptionStore>,
    trial_window: Duration,
    fail_open: bool,
}

impl SubscriptionGate {
    pub fn new(subscriptions: Arc<dyn SubscriptionStore>, trial_days: i64, fail_open: bool) -> Self {
        Self {
            subscriptions,
            trial_window: Duration::try_days(trial_days).unwrap_or(Duration::MAX),
            fail_open,
        }
    }

    pub async fn evaluate(&self, tenant: &TenantRecord) -> SubscriptionStatus {
        self.evaluate_at(tenant, Utc::now()).await
    }

    pub async fn evaluate_at(&self, tenant: &TenantRecord, now: DateTime<Utc>) -> SubscriptionStatus {
        // Suspensão não depende do banco de assinaturas.
        if tenant.is_suspended() {
            return compute_status(tenant, &[], now, self.trial_window);
        }

        match self.subscriptions.subscriptions_for(tenant.id).await {
            Ok(subscriptions) => compute_status(tenant, &subscriptions, now, self.trial_window),
            // Fail-open proposital: uma queda do banco de assinaturas não derruba o app.
            // Com SUBSCRIPTION_FAIL_OPEN=false o comportamento se inverte.
            Err(e) if self.fail_open => {
                tracing::warn!(
                    tenant_id = %tenant.id,
                    "Falha ao verificar assinatura; liberando acesso (fail-open): {}",
                    e
                );
                SubscriptionStatus {
                    state: SubscriptionState::Active,
                    has_access: true,
                    is_trial: false,
                    trial_expired: false,
                    tenant_suspended: false,
                    plan_type: tenant.subscription_plan.clone(),
                    limits: None,
                    reason: "subscription check unavailable".to_string(),
                }
            }
            Err(e) => {
                tracing::error!(
                    tenant_id = %tenant.id,
                    "Falha ao verificar assinatura; negando acesso (fail-closed): {}",
                    e
                );
                SubscriptionStatus {
                    state: SubscriptionState::Expired,
                    has_access: false,
                    is_trial: false,
                    trial_expired: false,
                    tenant_suspended: false,
                    plan_type: None,
                    limits: None,
                    reason: "subscription check unavailable".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::tenancy::TenantStatus,
        testing::{tenant, FakeTenantStore},
    };
    use chrono::TimeZone;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn gate(store: &FakeTenantStore) -> SubscriptionGate {
        SubscriptionGate::new(Arc::new(store.clone()), 14, true)
    }

    #[tokio::test]
    async fn trial_window_is_inclusive() {
        let store = FakeTenantStore::default();
        let t = tenant("acme", TenantStatus::Active, at("2024-01-01T00:00:00Z"));

        let inside = gate(&store).evaluate_at(&t, at("2024-01-14T23:59:59Z")).await;
        assert!(inside.has_access && inside.is_trial);
        assert_eq!(inside.limits, Some(PlanLimits::UNLIMITED));

        let boundary = gate(&store).evaluate_at(&t, at("2024-01-15T00:00:00Z")).await;
        assert!(boundary.has_access && boundary.is_trial);

        let after = gate(&store).evaluate_at(&t, at("2024-01-15T00:00:01Z")).await;
        assert!(!after.has_access && after.trial_expired);
        assert_eq!(after.state, SubscriptionState::Expired);
    }

    #[tokio::test]
    async fn oversized_trial_window_does_not_overflow() {
        let store = FakeTenantStore::default();
        let t = tenant("acme", TenantStatus::Active, at("2024-01-01T00:00:00Z"));

        let status = SubscriptionGate::new(Arc::new(store.clone()), i64::MAX, true)
            .evaluate_at(&t, at("2030-01-01T00:00:00Z"))
            .await;
        assert!(status.has_access && status.is_trial);

        let status = compute_status(&t, &[], at("2030-01-01T00:00:00Z"), Duration::MAX);
        assert_eq!(status.state, SubscriptionState::Trial);
    }

    #[tokio::test]
    async fn paid_subscription_attaches_plan_limits() {
        let store = FakeTenantStore::default();
        let t = tenant("acme", TenantStatus::Active, at("2023-01-01T00:00:00Z"));
        store.add_subscription(SubscriptionRecord {
            tenant_id: t.id,
            plan_type: "professional".into(),
            start_date: at("2024-01-01T00:00:00Z"),
            end_date: Some(at("2025-01-01T00:00:00Z")),
        });

        let status = gate(&store).evaluate_at(&t, at("2024-06-01T00:00:00Z")).await;
        assert_eq!(status.state, SubscriptionState::Active);
        assert!(status.has_access && !status.is_trial);
        assert_eq!(status.limits, Some(PlanLimits::for_plan("professional")));

        // end_date > now é estrito.
        let status = gate(&store).evaluate_at(&t, at("2025-01-01T00:00:00Z")).await;
        assert_eq!(status.state, SubscriptionState::Expired);
    }

    #[test]
    fn unknown_plan_falls_back_to_most_restrictive() {
        assert_eq!(PlanLimits::for_plan("gold-legacy"), PlanLimits::for_plan("basic"));
        assert_eq!(PlanLimits::for_plan("ENTERPRISE"), PlanLimits::UNLIMITED);
    }

    #[test]
    fn trial_records_do_not_count_as_paid() {
        let t = tenant("acme", TenantStatus::Active, at("2023-01-01T00:00:00Z"));
        let subs = vec![SubscriptionRecord {
            tenant_id: t.id,
            plan_type: "trial".into(),
            start_date: at("2024-01-01T00:00:00Z"),
            end_date: None,
        }];
        let status = compute_status(&t, &subs, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(), Duration::days(14));
        assert_eq!(status.state, SubscriptionState::Expired);
    }

    #[tokio::test]
    async fn suspension_is_terminal() {
        let store = FakeTenantStore::default();
        let t = tenant("frozen", TenantStatus::Suspended, Utc::now());
        store.add_subscription(SubscriptionRecord {
            tenant_id: t.id,
            plan_type: "enterprise".into(),
            start_date: Utc::now() - Duration::days(1),
            end_date: None,
        });

        let status = gate(&store).evaluate(&t).await;
        assert!(!status.has_access && status.tenant_suspended);
    }

    #[tokio::test]
    async fn lookup_errors_fail_open_unless_inverted() {
        let store = FakeTenantStore::default();
        store.fail_subscription_lookups();
        let t = tenant("acme", TenantStatus::Active, at("2020-01-01T00:00:00Z"));

        let status = gate(&store).evaluate(&t).await;
        assert!(status.has_access);

        let strict = SubscriptionGate::new(Arc::new(store.clone()), 14, false);
        assert!(!strict.evaluate(&t).await.has_access);
    }
}
