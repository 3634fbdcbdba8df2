// src/db/branch_repo.rs

use async_trait::async_trait;
use futures::FutureExt;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::session::SessionBinder,
    models::{
        branch::{BranchNode, BranchTree},
        session::{DbSessionContext, UnitOfWork},
    },
};

#[async_trait]
pub trait BranchStore: Send + Sync {
    /// Carrega a árvore do tenant de `scope`, lida com esse contexto RLS vinculado.
    async fn load_tree(&self, scope: &DbSessionContext) -> Result<BranchTree, AppError>;
}

// `branches` tem FORCE ROW LEVEL SECURITY: sem contexto vinculado, nenhuma linha volta.
#[derive(Clone)]
pub struct BranchRepository {
    binder: SessionBinder<PgPool>,
}

impl BranchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            binder: SessionBinder::new(pool),
        }
    }
}

#[async_trait]
impl BranchStore for BranchRepository {
    async fn load_tree(&self, scope: &DbSessionContext) -> Result<BranchTree, AppError> {
        let tenant_id = scope.tenant_id;
        let branches = self
            .binder
            .with_bound_context(scope, UnitOfWork::Session, move |conn| {
                async move {
                    let rows = sqlx::query_as::<_, BranchNode>(
                        "SELECT id, tenant_id, parent_branch_id FROM branches WHERE tenant_id = $1",
                    )
                    .bind(tenant_id)
                    .fetch_all(&mut **conn)
                    .await?;
                    Ok::<_, AppError>(rows)
                }
                .boxed()
            })
            .await?;

        BranchTree::build(tenant_id, branches)
            .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("árvore de filiais inválida: {e}")))
    }
}
