//! Audit recorder for back-office mutations.
//!
//! Entries are written after the primary mutation has committed. A missing
//! `operation_logs` table counts as success; any other store failure is returned
//! to the caller as a value and never unwinds past this module.

use std::str::FromStr;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{AuditLogRequest, NewAuditEntry, OperationType},
    repository::Repository,
    session::SessionClaims,
};

/// Actor id clients send when they have no user; stored as "no actor".
pub const EMPTY_ACTOR: Uuid = Uuid::nil();
pub const UNKNOWN_IP: &str = "unknown";

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// AuditContext
///
/// Request-derived facts the recorder needs besides the entry itself.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditContext {
    // Identity of the authenticated caller, if the session carries one.
    pub caller_id: Option<Uuid>,
    pub ip_address: String,
}

impl AuditContext {
    pub fn from_headers(headers: &HeaderMap, session: Option<&SessionClaims>) -> Self {
        Self {
            caller_id: session.and_then(SessionClaims::user_id),
            ip_address: client_ip(headers),
        }
    }
}

/// AuditOutcome
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    Recorded(Uuid),
    // The audit table is not provisioned; nothing was written.
    SchemaGap,
}

impl AuditOutcome {
    pub fn log_id(&self) -> Option<Uuid> {
        match self {
            AuditOutcome::Recorded(id) => Some(*id),
            AuditOutcome::SchemaGap => None,
        }
    }
}

/// AuditStatus
///
/// What a mutating handler learns about its audit entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditStatus {
    Recorded,
    Warning(String),
}

impl AuditStatus {
    pub fn into_warning(self) -> Option<String> {
        match self {
            AuditStatus::Recorded => None,
            AuditStatus::Warning(reason) => Some(reason),
        }
    }
}

/// client_ip
///
/// First hop of `x-forwarded-for`, then `x-real-ip`, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    header(FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .or_else(|| header(REAL_IP))
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

/// resolve_actor
///
/// Explicit id unless it is the empty sentinel, then the caller, then nothing.
pub fn resolve_actor(explicit: Option<Uuid>, caller: Option<Uuid>) -> Option<Uuid> {
    explicit.filter(|id| *id != EMPTY_ACTOR).or(caller)
}

/// validate
///
/// Turns a raw request into an insertable entry. Fails before any store access
/// when the operation type or target table is missing or malformed.
pub fn validate(request: AuditLogRequest, ctx: &AuditContext) -> Result<NewAuditEntry, AppError> {
    let operation_type = request
        .operation_type
        .as_deref()
        .map(str::trim)
        .filter(|op| !op.is_empty())
        .ok_or_else(|| AppError::Validation("operationType is required".to_string()))
        .and_then(OperationType::from_str)?;

    let target_table = request
        .target_table
        .map(|table| table.trim().to_string())
        .filter(|table| !table.is_empty())
        .ok_or_else(|| AppError::Validation("targetTable is required".to_string()))?;

    let explicit_actor = match request.user_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| AppError::Validation("userId must be a UUID".to_string()))?,
        ),
    };

    Ok(NewAuditEntry {
        operation_type,
        target_table,
        target_id: request.target_id,
        details: request.details,
        user_id: resolve_actor(explicit_actor, ctx.caller_id),
        ip_address: ctx.ip_address.clone(),
    })
}

/// record
///
/// Validates and writes one audit entry.
pub async fn record(
    repo: &dyn Repository,
    request: AuditLogRequest,
    ctx: &AuditContext,
) -> Result<AuditOutcome, AppError> {
    let entry = validate(request, ctx)?;
    let operation = entry.operation_type;
    let table = entry.target_table.clone();

    tracing::debug!(%operation, %table, actor = ?entry.user_id, "recording audit entry");

    match repo.insert_audit_entry(entry).await {
        Ok(id) => Ok(AuditOutcome::Recorded(id)),
        Err(err) if err.is_missing_relation() => {
            tracing::info!(%operation, %table, "operation_logs is not provisioned, audit entry skipped");
            Ok(AuditOutcome::SchemaGap)
        }
        Err(err) => {
            tracing::warn!(%operation, %table, error = %err, "failed to persist audit entry");
            Err(AppError::from(err))
        }
    }
}

/// record_best_effort
///
/// `record` for callers whose primary mutation already committed: the outcome is
/// reduced to a soft warning and never turned into an error response.
pub async fn record_best_effort(
    repo: &dyn Repository,
    request: AuditLogRequest,
    ctx: &AuditContext,
) -> AuditStatus {
    match record(repo, request, ctx).await {
        Ok(_) => AuditStatus::Recorded,
        Err(err) => {
            tracing::warn!(code = err.code(), error = %err, "audit entry lost after committed mutation");
            AuditStatus::Warning("the change was saved but could not be added to the operation log".to_string())
        }
    }
}
