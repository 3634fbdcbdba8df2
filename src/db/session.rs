// src/db/session.rs

// ---
// Vinculação do contexto RLS (a "chave") em uma conexão da pool.
// ---
// O contexto vive junto com a conexão emprestada, nunca com a requisição:
// conexões são reaproveitadas entre tenants, então sair sem limpar é vazamento
// de dados entre tenants.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{pool::PoolConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::session::{DbSessionContext, UnitOfWork},
};

const SET_CONTEXT_SQL: &str = r#"
    SELECT set_config('app.tenant_id', $1, false),
           set_config('app.user_id', $2, false),
           set_config('app.role', $3, false),
           set_config('app.branch_id', $4, false)
"#;

// String vazia = "não definido" para as policies.
const CLEAR_CONTEXT_SQL: &str = r#"
    SELECT set_config('app.tenant_id', '', false),
           set_config('app.user_id', '', false),
           set_config('app.role', '', false),
           set_config('app.branch_id', '', false)
"#;

const READ_CONTEXT_SQL: &str = r#"
    SELECT current_setting('app.tenant_id', true),
           current_setting('app.user_id', true),
           current_setting('app.role', true),
           current_setting('app.branch_id', true)
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxControl {
    Begin,
    Commit,
    Rollback,
}

impl TxControl {
    fn sql(&self) -> &'static str {
        match self {
            TxControl::Begin => "BEGIN",
            TxControl::Commit => "COMMIT",
            TxControl::Rollback => "ROLLBACK",
        }
    }
}

/// Uma conexão emprestada que aceita parâmetros de sessão.
#[async_trait]
pub trait SessionConnection: Send + 'static {
    async fn set_context(&mut self, ctx: &DbSessionContext) -> Result<(), AppError>;
    async fn clear_context(&mut self) -> Result<(), AppError>;
    async fn current_context(&mut self) -> Result<Option<DbSessionContext>, AppError>;
    async fn control(&mut self, control: TxControl) -> Result<(), AppError>;

    /// Fecha a conexão sem devolvê-la à pool.
    fn discard(self);
}

#[async_trait]
pub trait SessionPool: Send + Sync {
    type Conn: SessionConnection;

    async fn checkout(&self) -> Result<Self::Conn, AppError>;
}

#[async_trait]
impl SessionPool for PgPool {
    type Conn = PoolConnection<Postgres>;

    async fn checkout(&self) -> Result<Self::Conn, AppError> {
        self.acquire()
            .await
            .map_err(|e| AppError::Downstream(format!("pool de conexões indisponível: {e}")))
    }
}

#[async_trait]
impl SessionConnection for PoolConnection<Postgres> {
    async fn set_context(&mut self, ctx: &DbSessionContext) -> Result<(), AppError> {
        sqlx::query(SET_CONTEXT_SQL)
            .bind(ctx.tenant_id.to_string())
            .bind(ctx.user_id.to_string())
            .bind(&ctx.role)
            .bind(ctx.branch_id.as_deref().unwrap_or(""))
            .execute(&mut **self)
            .await?;
        Ok(())
    }

    async fn clear_context(&mut self) -> Result<(), AppError> {
        sqlx::query(CLEAR_CONTEXT_SQL).execute(&mut **self).await?;
        Ok(())
    }

    async fn current_context(&mut self) -> Result<Option<DbSessionContext>, AppError> {
        let (tenant_id, user_id, role, branch_id): (
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        ) = sqlx::query_as(READ_CONTEXT_SQL).fetch_one(&mut **self).await?;

        let parse = |raw: Option<String>| {
            raw.filter(|v| !v.is_empty())
                .and_then(|v| Uuid::parse_str(&v).ok())
        };

        Ok(match (parse(tenant_id), parse(user_id)) {
            (Some(tenant_id), Some(user_id)) => Some(DbSessionContext {
                tenant_id,
                user_id,
                role: role.unwrap_or_default(),
                branch_id: branch_id.filter(|b| !b.is_empty()),
            }),
            _ => None,
        })
    }

    async fn control(&mut self, control: TxControl) -> Result<(), AppError> {
        sqlx::query(control.sql()).execute(&mut **self).await?;
        Ok(())
    }

    fn discard(self) {
        // Desanexada da pool; o drop fecha o socket.
        drop(self.detach());
    }
}

// ---
// Guarda RAII: enquanto `conn` estiver aqui, ela pode estar "suja".
// ---
struct BoundConnection<C: SessionConnection> {
    conn: Option<C>,
    bound: bool,
    in_transaction: bool,
}

impl<C: SessionConnection> BoundConnection<C> {
    fn new(conn: C) -> Self {
        Self {
            conn: Some(conn),
            bound: false,
            in_transaction: false,
        }
    }

    fn conn_mut(&mut self) -> Result<&mut C, AppError> {
        self.conn
            .as_mut()
            .ok_or_else(|| AppError::ContextBinding("conexão já liberada".into()))
    }

    async fn bind(&mut self, ctx: &DbSessionContext, mode: UnitOfWork) -> Result<(), AppError> {
        // Marcado antes: um set parcial também precisa ser limpo.
        self.bound = true;
        let conn = self.conn_mut()?;
        conn.set_context(ctx)
            .await
            .map_err(|e| AppError::ContextBinding(e.to_string()))?;

        if mode == UnitOfWork::Transaction {
            self.in_transaction = true;
            self.conn_mut()?
                .control(TxControl::Begin)
                .await
                .map_err(|e| AppError::ContextBinding(e.to_string()))?;
        }
        Ok(())
    }

    async fn end_transaction(&mut self, commit: bool) -> Result<(), AppError> {
        if !self.in_transaction {
            return Ok(());
        }
        let control = if commit { TxControl::Commit } else { TxControl::Rollback };
        let result = self.conn_mut()?.control(control).await;
        self.in_transaction = false;
        result
    }

    /// Limpa o contexto e devolve a conexão. Se não der para limpar, descarta.
    async fn release(&mut self) {
        let Some(conn) = self.conn.as_mut() else {
            return;
        };

        if self.in_transaction {
            if let Err(e) = conn.control(TxControl::Rollback).await {
                tracing::warn!("Falha no ROLLBACK antes de liberar a conexão: {}", e);
            }
            self.in_transaction = false;
        }

        match conn.clear_context().await {
            Ok(()) => {
                self.bound = false;
                // Só agora ela volta para a pool.
                self.conn.take();
            }
            Err(e) => {
                tracing::error!("🔥 Não foi possível limpar o contexto RLS; conexão descartada: {}", e);
                if let Some(conn) = self.conn.take() {
                    conn.discard();
                }
                self.bound = false;
            }
        }
    }
}

impl<C: SessionConnection> Drop for BoundConnection<C> {
    // Pânico ou cancelamento no meio do trabalho: a conexão ainda está suja.
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if !self.bound && !self.in_transaction {
            return;
        }
        scrub_detached(conn, self.in_transaction);
    }
}

fn scrub_detached<C: SessionConnection>(mut conn: C, in_transaction: bool) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            tracing::warn!("Unidade de trabalho interrompida; limpando contexto RLS em segundo plano");
            handle.spawn(async move {
                if in_transaction {
                    let _ = conn.control(TxControl::Rollback).await;
                }
                if let Err(e) = conn.clear_context().await {
                    tracing::error!("🔥 Limpeza tardia falhou; conexão descartada: {}", e);
                    conn.discard();
                }
            });
        }
        Err(_) => {
            tracing::error!("🔥 Sem runtime para limpar o contexto RLS; conexão descartada");
            conn.discard();
        }
    }
}

/// Executa `work` com tenant/usuário/papel/filial vinculados em uma conexão.
#[derive(Clone)]
pub struct SessionBinder<P> {
    pool: P,
}

impl<P: SessionPool> SessionBinder<P> {
    pub fn new(pool: P) -> Self {
        Self { pool }
    }

    pub async fn with_bound_context<T, F>(
        &self,
        ctx: &DbSessionContext,
        mode: UnitOfWork,
        work: F,
    ) -> Result<T, AppError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut P::Conn) -> BoxFuture<'c, Result<T, AppError>> + Send,
    {
        let conn = self.pool.checkout().await?;
        let mut guard = BoundConnection::new(conn);

        // Fail-closed: sem contexto vinculado, o trabalho nunca roda.
        if let Err(e) = guard.bind(ctx, mode).await {
            tracing::error!(tenant_id = %ctx.tenant_id, "🔥 Falha ao vincular contexto RLS: {}", e);
            guard.release().await;
            return Err(e);
        }

        let outcome = work(guard.conn_mut()?).await;
        let ended = guard.end_transaction(outcome.is_ok()).await;
        guard.release().await;

        let value = outcome?;
        ended?;
        Ok(value)
    }
}
