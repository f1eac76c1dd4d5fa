use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_mail::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::*;
use crate::settings::Settings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub token_service: Arc<dyn TokenService>,
    pub trust_forwarded_for: bool,
    alert_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn RevocationStore> = match settings.store.backend.as_str() {
            "redis" => {
                let url = settings
                    .store
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.redis_url is required for redis"))?;
                let redis_client = redis::Client::open(url)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRevocationStore::new(
                    redis_manager,
                    settings.store.prefix.clone(),
                ))
            }
            "memory" => Arc::new(MemoryRevocationStore::new()),
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let notifier: Arc<dyn Notifier> = match settings.notify.backend.as_str() {
            "smtp" => {
                let notify = &settings.notify;
                let required = |value: &Option<String>, name: &str| {
                    value
                        .clone()
                        .ok_or_else(|| anyhow::anyhow!("notify.{} is required for smtp", name))
                };
                Arc::new(SmtpNotifier::new(&SmtpConfig {
                    host: required(&notify.smtp_host, "smtp_host")?,
                    port: notify.smtp_port.unwrap_or(587),
                    username: notify.smtp_username.clone(),
                    password: notify.smtp_password.clone(),
                    from: required(&notify.from, "from")?,
                })?)
            }
            "log" => Arc::new(LogNotifier),
            other => return Err(anyhow::anyhow!("Unknown notify backend: {}", other)),
        };

        let cancel = CancellationToken::new();
        let (alerts, alert_worker) = alert_channel(
            notifier,
            AlertConfig {
                recipients: settings.notify.recipients.clone(),
                timeout: Duration::from_millis(settings.notify.timeout_ms),
                queue_capacity: settings.notify.queue_capacity,
            },
            cancel.clone(),
        );

        let token = &settings.token;
        if token.signing_key.is_empty() {
            warn!("token.signing_key is empty, issuing will fail");
        }
        let hasher: Arc<dyn SecretHasher> = Arc::new(Argon2SecretHasher::new(&HashCost {
            memory_kib: settings.hash.memory_kib,
            iterations: settings.hash.iterations,
            parallelism: settings.hash.parallelism,
        })?);
        let signer: Arc<dyn TokenSigner> = Arc::new(JwtHs512Signer::new(JwtConfig {
            issuer: token.issuer.clone(),
            audience: token.audience.clone(),
            access_ttl: Duration::from_secs(token.access_ttl_secs),
            signing_key: token.signing_key.clone().into_bytes(),
        }));

        let token_service: Arc<dyn TokenService> = match token.backend.as_str() {
            "fake" => Arc::new(FakeTokenService::new()),
            "real" => Arc::new(RealTokenService::new(
                store,
                hasher,
                signer,
                Arc::new(alerts),
                TokenPolicy {
                    refresh_ttl: Duration::from_secs(token.refresh_ttl_secs),
                    store_timeout: Duration::from_millis(token.store_timeout_ms),
                },
            )),
            other => return Err(anyhow::anyhow!("Unknown token backend: {}", other)),
        };

        let alert_handle = tokio::spawn(alert_worker.run());

        info!("server started");

        Ok(Self {
            token_service,
            trust_forwarded_for: settings.http.trust_forwarded_for,
            alert_handle: Mutex::new(Some(alert_handle)),
            cancel,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = match self.alert_handle.lock() {
            Ok(mut lock) => lock.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let r = handle.await;
            info!("alert worker handle dropped: {:?}", r);
        }
    }
}
