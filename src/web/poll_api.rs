use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};

use crate::error::{CreateError, StoreError, VoteError, VoteRejection};
use crate::pipeline::PollService;
use crate::voting::{CreatePoll, OriginFingerprint};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: Uuid,
    /// The client's self-assigned voter token.
    pub user_id: String,
}

pub async fn list_polls(service: Arc<PollService>) -> Result<Response, Infallible> {
    Ok(match service.list_polls().await {
        Ok(polls) => reply::json(&polls).into_response(),
        Err(err) => {
            error!(%err, "failed to list polls");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "could not load polls")
        }
    })
}

pub async fn create_poll(
    settings: CreatePoll,
    service: Arc<PollService>,
) -> Result<Response, Infallible> {
    Ok(match service.create_poll(settings).await {
        // Plain 200 with the poll body, the shape the client already reads.
        Ok(poll) => reply::json(&poll).into_response(),
        Err(CreateError::Invalid(err)) => error_reply(StatusCode::BAD_REQUEST, &err.to_string()),
        Err(CreateError::Store(err)) => {
            error!(%err, "failed to create poll");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "could not create poll")
        }
    })
}

pub async fn cast_vote(
    poll_id: Uuid,
    addr: Option<SocketAddr>,
    request: VoteRequest,
    service: Arc<PollService>,
) -> Result<Response, Infallible> {
    let Some(addr) = addr else {
        return Ok(error_reply(
            StatusCode::BAD_REQUEST,
            "could not determine request origin",
        ));
    };
    let origin = OriginFingerprint::from_addr(addr);

    Ok(
        match service
            .cast_vote(poll_id, &request.user_id, &origin, request.option_id)
            .await
        {
            Ok(poll) => reply::json(&poll).into_response(),
            Err(err) => vote_error_reply(poll_id, err),
        },
    )
}

pub async fn like_poll(poll_id: Uuid, service: Arc<PollService>) -> Result<Response, Infallible> {
    Ok(match service.like_poll(poll_id).await {
        Ok(poll) => reply::json(&poll).into_response(),
        Err(err) => vote_error_reply(poll_id, err),
    })
}

fn vote_error_reply(poll_id: Uuid, err: VoteError) -> Response {
    let status = match &err {
        VoteError::Rejected(VoteRejection::OriginAlreadyVoted) => StatusCode::FORBIDDEN,
        VoteError::Rejected(VoteRejection::UnknownOption) => StatusCode::NOT_FOUND,
        VoteError::Rejected(_) => StatusCode::BAD_REQUEST,
        VoteError::PollNotFound => StatusCode::NOT_FOUND,
        VoteError::Store(StoreError::Contention) => StatusCode::SERVICE_UNAVAILABLE,
        VoteError::Store(StoreError::Unavailable) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(%poll_id, %err, "vote path failed");
    }
    error_reply(status, &err.to_string())
}

fn error_reply(status: StatusCode, msg: &str) -> Response {
    reply::with_status(reply::json(&json!({ "msg": msg })), status).into_response()
}
