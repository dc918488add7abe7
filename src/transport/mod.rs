//! gRPC transport layer for pathvet.
//!
//! Every RPC is a self-contained unit of work over the [`PolicyManager`]
//! orchestrators. Timestamps cross this boundary as ISO-8601 strings with
//! millisecond precision; the transport owns nothing but mapping and input
//! limits.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tonic::{Request, Response, Status};
use tracing::error;

use crate::engine::{PolicyManager, PolicyUpdate};
use crate::error::PathvetError;
use crate::issuer::{Issuer, IssuerId};
use crate::path::{Hop, Path};
use crate::policy::{Policy, PolicyId};
use crate::time::TimeInterval;

#[allow(missing_docs)]
pub mod proto {
    tonic::include_proto!("pathvet");
}

use proto::policy_manager_server::PolicyManagerServer;

// ----------------------------------------------------------------------------
// Limits (DoS protection)
// ----------------------------------------------------------------------------

/// Maximum size of a submitted rule program.
const MAX_STATEMENTS_BYTES: usize = 256 * 1024; // 256 KiB

/// Maximum number of hops in a submitted path.
const MAX_PATH_HOPS: usize = 1024;

/// gRPC service implementation for the policy manager.
pub struct PolicyManagerService {
    manager: Arc<PolicyManager>,
}

impl PolicyManagerService {
    /// Creates the service over an orchestrator.
    #[must_use]
    pub fn new(manager: Arc<PolicyManager>) -> Self {
        Self { manager }
    }

    /// Wraps the service into a tonic server.
    #[must_use]
    pub fn into_server(self) -> PolicyManagerServer<Self> {
        PolicyManagerServer::new(self)
    }
}

fn invalid_argument(msg: impl Into<String>) -> Status {
    Status::invalid_argument(msg.into())
}

fn parse_uuid(s: &str) -> Result<uuid::Uuid, Status> {
    if s.len() > 64 {
        return Err(invalid_argument("uuid string too long"));
    }
    s.parse()
        .map_err(|_| invalid_argument("invalid UUID format"))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, Status> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| invalid_argument(format!("invalid ISO-8601 timestamp '{s}': {e}")))
}

/// Renders a timestamp as ISO-8601 with millisecond precision.
fn iso_millis(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn check_statements_size(statements: &str) -> Result<(), Status> {
    if statements.len() > MAX_STATEMENTS_BYTES {
        return Err(invalid_argument("statements exceed maximum size"));
    }
    Ok(())
}

fn issuer_to_message(issuer: &Issuer) -> proto::Issuer {
    proto::Issuer {
        id: issuer.id.to_string(),
        created_at: iso_millis(issuer.created_at),
        updated_at: iso_millis(issuer.updated_at),
        name: issuer.name.clone(),
        is_default: issuer.default,
        description: issuer.description.clone(),
    }
}

fn policy_to_message(policy: &Policy) -> proto::Policy {
    proto::Policy {
        id: policy.id.to_string(),
        created_at: iso_millis(policy.created_at),
        updated_at: iso_millis(policy.updated_at),
        active: policy.active,
        title: policy.title.clone(),
        description: policy.description.clone(),
        statements: policy.statements.clone(),
        issuer: Some(issuer_to_message(&policy.issuer)),
    }
}

fn status_from_error(err: PathvetError) -> Status {
    match err {
        // Unknown ids on Get map to NOT_FOUND in the handler itself; every
        // other input problem is the client's argument.
        PathvetError::Validation(v) => Status::invalid_argument(format!("{}: {v}", v.field())),
        PathvetError::Execution(e) => {
            error!(error = %e, "request failed on a dependency");
            Status::internal(e.to_string())
        }
        PathvetError::Internal { message } => Status::internal(message),
    }
}

#[tonic::async_trait]
impl proto::policy_manager_server::PolicyManager for PolicyManagerService {
    async fn create_policy(
        &self,
        request: Request<proto::CreatePolicyRequest>,
    ) -> Result<Response<proto::CreatePolicyResponse>, Status> {
        let req = request.into_inner();
        let issuer_id = IssuerId::from_uuid(parse_uuid(&req.issuer_id)?);
        check_statements_size(&req.statements)?;

        let policy = self
            .manager
            .create_policy(issuer_id, req.title, req.statements, req.description)
            .map_err(status_from_error)?;

        Ok(Response::new(proto::CreatePolicyResponse {
            policy: Some(policy_to_message(&policy)),
        }))
    }

    async fn update_policy(
        &self,
        request: Request<proto::UpdatePolicyRequest>,
    ) -> Result<Response<proto::UpdatePolicyResponse>, Status> {
        let req = request.into_inner();
        let id = PolicyId::from_uuid(parse_uuid(&req.id)?);
        if let Some(statements) = &req.statements {
            check_statements_size(statements)?;
        }

        let policy = self
            .manager
            .update_policy(
                id,
                PolicyUpdate {
                    title: req.title,
                    statements: req.statements,
                    description: req.description,
                },
            )
            .map_err(status_from_error)?;

        Ok(Response::new(proto::UpdatePolicyResponse {
            policy: Some(policy_to_message(&policy)),
        }))
    }

    async fn delete_policy(
        &self,
        request: Request<proto::DeletePolicyRequest>,
    ) -> Result<Response<proto::DeletePolicyResponse>, Status> {
        let req = request.into_inner();
        let id = PolicyId::from_uuid(parse_uuid(&req.id)?);
        self.manager.delete_policy(id).map_err(status_from_error)?;
        Ok(Response::new(proto::DeletePolicyResponse {}))
    }

    async fn list_policies(
        &self,
        _request: Request<proto::ListPoliciesRequest>,
    ) -> Result<Response<proto::ListPoliciesResponse>, Status> {
        let policies = self.manager.list_policies().map_err(status_from_error)?;
        Ok(Response::new(proto::ListPoliciesResponse {
            policies: policies.iter().map(policy_to_message).collect(),
        }))
    }

    async fn get_policy(
        &self,
        request: Request<proto::GetPolicyRequest>,
    ) -> Result<Response<proto::GetPolicyResponse>, Status> {
        let req = request.into_inner();
        let id = PolicyId::from_uuid(parse_uuid(&req.id)?);

        let policy = self
            .manager
            .get_policy(id)
            .map_err(status_from_error)?
            .ok_or_else(|| Status::not_found(format!("Policy not found: {id}")))?;

        Ok(Response::new(proto::GetPolicyResponse {
            policy: Some(policy_to_message(&policy)),
        }))
    }

    async fn get_default_issuer(
        &self,
        _request: Request<proto::GetDefaultIssuerRequest>,
    ) -> Result<Response<proto::GetDefaultIssuerResponse>, Status> {
        let issuer = self.manager.default_issuer().map_err(status_from_error)?;
        Ok(Response::new(proto::GetDefaultIssuerResponse {
            issuer: Some(issuer_to_message(&issuer)),
        }))
    }

    async fn validate_path(
        &self,
        request: Request<proto::ValidatePathRequest>,
    ) -> Result<Response<proto::ValidatePathResponse>, Status> {
        let req = request.into_inner();
        let path_msg = req
            .path
            .ok_or_else(|| invalid_argument("path is required"))?;
        if path_msg.hops.len() > MAX_PATH_HOPS {
            return Err(invalid_argument("path exceeds maximum hop count"));
        }

        let hops = path_msg
            .hops
            .into_iter()
            .map(|h| Hop::new(h.isd_as, h.inbound_interface, h.outbound_interface))
            .collect();
        let path = Path::new(
            path_msg.fingerprint,
            path_msg.src_isd_as,
            path_msg.dst_isd_as,
            hops,
        )
        .map_err(|e| status_from_error(e.into()))?;

        // Both bounds or neither; a half-open request falls back to the
        // default window.
        let interval = match (req.start_time, req.end_time) {
            (Some(start), Some(end)) => Some(
                TimeInterval::new(parse_timestamp(&start)?, parse_timestamp(&end)?)
                    .map_err(|e| status_from_error(e.into()))?,
            ),
            _ => None,
        };

        let verdict = self
            .manager
            .validate_path(&path, interval)
            .await
            .map_err(status_from_error)?;

        Ok(Response::new(proto::ValidatePathResponse {
            fingerprint: verdict.fingerprint,
            valid: verdict.valid,
        }))
    }

    async fn get_latest_policy_timestamp(
        &self,
        _request: Request<proto::GetLatestPolicyTimestampRequest>,
    ) -> Result<Response<proto::GetLatestPolicyTimestampResponse>, Status> {
        let timestamp = self
            .manager
            .latest_policy_timestamp()
            .map_err(status_from_error)?;
        Ok(Response::new(proto::GetLatestPolicyTimestampResponse {
            timestamp: iso_millis(timestamp),
        }))
    }
}
