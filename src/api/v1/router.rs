use super::error::*;
use super::handler;
use super::handler::TokenQuery;
use crate::application_port::{TokenService, VerifiedAccess};
use crate::domain_model::AccessToken;
use crate::server::*;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use warp::{Filter, http, reject};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let token = warp::get()
        .and(warp::path("token"))
        .and(warp::path::end())
        .and(warp::query::<TokenQuery>())
        .and(with_client_ip(server.trust_forwarded_for))
        .and(with(server.token_service.clone()))
        .and_then(handler::issue_tokens);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_client_ip(server.trust_forwarded_for))
        .and(with(server.token_service.clone()))
        .and_then(handler::refresh_tokens);

    let session = warp::get()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(with_verification(server.token_service.clone()))
        .and_then(handler::describe_session);

    token.or(refresh).or(session)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_client_ip(
    trust_forwarded_for: bool,
) -> impl Filter<Extract = (IpAddr,), Error = warp::Rejection> + Clone {
    warp::addr::remote()
        .and(warp::header::optional::<String>("x-forwarded-for"))
        .and_then(
            move |remote: Option<SocketAddr>, forwarded: Option<String>| async move {
                resolve_client_ip(remote, forwarded.as_deref(), trust_forwarded_for)
                    .ok_or_else(|| reject::custom(ApiErrorCode::BadRequest))
            },
        )
}

/// Peer address, or the first `X-Forwarded-For` hop when the proxy is trusted.
pub fn resolve_client_ip(
    remote: Option<SocketAddr>,
    forwarded_for: Option<&str>,
    trust_forwarded_for: bool,
) -> Option<IpAddr> {
    if trust_forwarded_for {
        let first_hop = forwarded_for
            .and_then(|value| value.split(',').next())
            .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
        if first_hop.is_some() {
            return first_hop;
        }
    }
    remote.map(|addr| addr.ip())
}

fn with_verification(
    token_service: Arc<dyn TokenService>,
) -> impl Filter<Extract = (VerifiedAccess,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let token_service = token_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let session = token_service
                    .verify_access_token(&AccessToken(token.to_string()))
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok(session)
            } else {
                Err(reject::custom(ApiErrorCode::InvalidToken))
            }
        }
    })
}
