// src/models/branch.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

// ---
// Filial (a "Loja" dentro da farmácia)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BranchNode {
    pub id: String,
    pub tenant_id: Uuid,
    // NULL = filial raiz
    pub parent_branch_id: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BranchTreeError {
    #[error("branch {0} appears more than once")]
    Duplicate(String),
    #[error("branch {branch} belongs to tenant {found}, expected {expected}")]
    TenantMismatch {
        branch: String,
        expected: Uuid,
        found: Uuid,
    },
    #[error("branch {0} has an unknown parent {1}")]
    UnknownParent(String, String),
    #[error("cycle detected at branch {0}")]
    Cycle(String),
}

/// Árvore de filiais de um tenant: arena indexada por id, sem ponteiros.
#[derive(Debug, Clone, Default)]
pub struct BranchTree {
    nodes: HashMap<String, BranchNode>,
}

impl BranchTree {
    /// Monta e valida a árvore: um único tenant, pais existentes e sem ciclos.
    pub fn build(tenant_id: Uuid, branches: Vec<BranchNode>) -> Result<Self, BranchTreeError> {
        let mut nodes = HashMap::with_capacity(branches.len());
        for node in branches {
            if node.tenant_id != tenant_id {
                return Err(BranchTreeError::TenantMismatch {
                    branch: node.id,
                    expected: tenant_id,
                    found: node.tenant_id,
                });
            }
            if nodes.contains_key(&node.id) {
                return Err(BranchTreeError::Duplicate(node.id));
            }
            nodes.insert(node.id.clone(), node);
        }

        let tree = Self { nodes };
        for node in tree.nodes.values() {
            if let Some(parent) = &node.parent_branch_id {
                if !tree.nodes.contains_key(parent) {
                    return Err(BranchTreeError::UnknownParent(node.id.clone(), parent.clone()));
                }
            }
            tree.ancestors(&node.id)?;
        }
        Ok(tree)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id)?.parent_branch_id.as_deref()
    }

    /// Cadeia de ancestrais, do pai até a raiz.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&str>, BranchTreeError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            if !seen.insert(parent) {
                return Err(BranchTreeError::Cycle(id.to_string()));
            }
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }

    /// `true` se `child` está no máximo `depth` arestas abaixo de `ancestor`.
    pub fn is_descendant_within(&self, ancestor: &str, child: &str, depth: usize) -> bool {
        self.ancestors(child)
            .map(|chain| chain.iter().take(depth).any(|id| *id == ancestor))
            .unwrap_or(false)
    }

    /// Regra atual de negócio: só filhos diretos (uma aresta).
    pub fn is_direct_child(&self, parent: &str, child: &str) -> bool {
        self.is_descendant_within(parent, child, 1)
    }
}
