// src/services/security_sentinel.rs

use axum::http::HeaderMap;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    common::error::AppError,
    db::security_repo::{IpBlockList, SecurityEventSink},
    models::security::{IpBlockEntry, RequestOrigin, SecurityEvent},
};

const ATTACK_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "union",
    "select",
    "drop table",
    "insert into",
    "../",
    "..\\",
    "%2e%2e",
    "%3cscript",
    "etc/passwd",
    "eval(",
    "' or '1'='1",
];

const SCANNER_AGENTS: &[&str] = &[
    "sqlmap", "nikto", "nmap", "masscan", "zgrab", "nuclei", "dirbuster", "gobuster", "wpscan",
    "acunetix", "nessus", "burp",
];

/// Resultado da inspeção de uma requisição.
#[derive(Debug, Clone, Default)]
pub struct Inspection {
    pub block: Option<IpBlockEntry>,
    pub suspicious: bool,
    pub score: u32,
    pub findings: Vec<String>,
}

impl Inspection {
    pub fn blocked(&self) -> bool {
        self.block.is_some()
    }
}

/// IP do cliente: primeiro item do X-Forwarded-For, depois X-Real-IP, depois o socket.
pub fn client_ip(headers: &HeaderMap, socket: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }
    socket
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Pontua heurísticas de ataque. Não nega nada sozinho.
pub fn score_request(path_and_query: &str, user_agent: Option<&str>) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut findings = Vec::new();
    let target = path_and_query.to_ascii_lowercase();

    for pattern in ATTACK_PATTERNS.iter().filter(|p| target.contains(**p)) {
        score += 10;
        findings.push(format!("pattern:{pattern}"));
    }

    match user_agent.map(str::trim).filter(|ua| !ua.is_empty()) {
        None => {
            score += 5;
            findings.push("missing_user_agent".to_string());
        }
        Some(ua) => {
            let ua = ua.to_ascii_lowercase();
            if let Some(tool) = SCANNER_AGENTS.iter().find(|t| ua.contains(**t)) {
                score += 20;
                findings.push(format!("scanner:{tool}"));
            }
        }
    }

    (score, findings)
}

#[derive(Clone)]
pub struct SecuritySentinel {
    blocklist: Arc<dyn IpBlockList>,
}

impl SecuritySentinel {
    pub fn new(blocklist: Arc<dyn IpBlockList>) -> Self {
        Self { blocklist }
    }

    pub async fn inspect(
        &self,
        origin: &RequestOrigin,
        path_and_query: &str,
    ) -> Result<Inspection, AppError> {
        if let Some(entry) = self.blocklist.find_block(&origin.ip_address).await? {
            return Ok(Inspection {
                block: Some(entry),
                ..Default::default()
            });
        }

        let (score, findings) = score_request(path_and_query, origin.user_agent.as_deref());
        Ok(Inspection {
            block: None,
            suspicious: !findings.is_empty(),
            score,
            findings,
        })
    }
}

// ---
// Despacho de auditoria: fila limitada, um worker, ordem preservada.
// Fila cheia descarta o evento novo e conta o descarte.
// ---
pub const DEFAULT_AUDIT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct AuditDispatcher {
    tx: mpsc::Sender<SecurityEvent>,
    dropped: Arc<AtomicU64>,
}

impl AuditDispatcher {
    /// Sobe o worker que grava os eventos na ordem em que foram emitidos.
    pub fn spawn(sink: Arc<dyn SecurityEventSink>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<SecurityEvent>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.append(&event).await {
                    tracing::error!(
                        event_type = event.event_type.as_str(),
                        "Falha ao gravar evento de segurança: {}",
                        e
                    );
                }
            }
        });
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Não bloqueia e não espera o banco.
    pub fn emit(&self, event: SecurityEvent) {
        tracing::warn!(
            event_type = event.event_type.as_str(),
            risk = event.risk_level.as_str(),
            ip = %event.ip_address,
            path = %event.request_path,
            "{}",
            event.description
        );
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    event_type = event.event_type.as_str(),
                    dropped_total = total,
                    "Fila de auditoria cheia; evento descartado"
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Worker de auditoria encerrado; evento descartado");
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
