//! Walks a single session through issue, rotation, replay and an IP change
//! against the in-process store. Alerts print through the log notifier.
//!
//! $ cargo run --bin token_demo
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use turnstile::application_impl::*;
use turnstile::application_port::*;
use turnstile::domain_model::SubjectId;
use turnstile::infra_mail::LogNotifier;
use turnstile::infra_memory::MemoryRevocationStore;
use turnstile::logger::*;
use turnstile::server::{AlertConfig, alert_channel};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logger = Logger::new_bootstrap();

    let cancel = CancellationToken::new();
    let (alerts, worker) = alert_channel(
        Arc::new(LogNotifier),
        AlertConfig {
            recipients: vec!["security@example.com".to_string()],
            timeout: Duration::from_secs(1),
            queue_capacity: 16,
        },
        cancel.clone(),
    );
    let worker = tokio::spawn(worker.run());

    let service = RealTokenService::new(
        Arc::new(MemoryRevocationStore::new()),
        Arc::new(Argon2SecretHasher::new(&HashCost::default())?),
        Arc::new(JwtHs512Signer::new(JwtConfig {
            issuer: "turnstile.demo".to_string(),
            audience: "demo-client".to_string(),
            access_ttl: Duration::from_secs(15 * 60),
            signing_key: b"demo-signing-key".to_vec(),
        })),
        Arc::new(alerts),
        TokenPolicy::default(),
    );

    let home: IpAddr = "10.0.0.1".parse()?;
    let away: IpAddr = "10.0.0.9".parse()?;

    let first = service
        .issue_token_pair(SubjectId::new("user-1"), home)
        .await?;
    info!(access = %first.access_token.0, "issued");

    let second = service.refresh(&first.refresh_token, home).await?;
    info!(refresh = %second.refresh_token.0, "rotated");

    match service.refresh(&first.refresh_token, home).await {
        Err(e) => info!("replay rejected: {}", e),
        Ok(_) => error!("replay unexpectedly accepted"),
    }

    let third = service.refresh(&second.refresh_token, away).await?;
    let session = service.verify_access_token(&third.access_token).await?;
    info!(?session, "rotated from a new address");

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    worker.await?;
    Ok(())
}
