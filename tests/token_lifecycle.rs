use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use turnstile::application_impl::*;
use turnstile::application_port::*;
use turnstile::domain_model::*;
use turnstile::domain_port::*;
use turnstile::infra_memory::MemoryRevocationStore;
use turnstile::server::{AlertConfig, alert_channel};

#[derive(Debug)]
struct Sent {
    recipients: Vec<String>,
    subject: String,
    body: String,
}

struct RecordingNotifier(mpsc::UnboundedSender<Sent>);

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let _ = self.0.send(Sent {
            recipients: recipients.to_vec(),
            subject: subject.to_owned(),
            body: body.to_owned(),
        });
        Ok(())
    }
}

struct Harness {
    service: Arc<RealTokenService>,
    store: Arc<MemoryRevocationStore>,
    hasher: Arc<Argon2SecretHasher>,
    sent: mpsc::UnboundedReceiver<Sent>,
    cancel: CancellationToken,
}

impl Harness {
    fn new() -> Self {
        Self::with_refresh_ttl(Duration::from_secs(60))
    }

    fn with_refresh_ttl(refresh_ttl: Duration) -> Self {
        let (tx, sent) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let (alerts, worker) = alert_channel(
            Arc::new(RecordingNotifier(tx)),
            AlertConfig {
                recipients: vec!["security@example.com".to_string()],
                timeout: Duration::from_secs(1),
                queue_capacity: 16,
            },
            cancel.clone(),
        );
        tokio::spawn(worker.run());

        let store = Arc::new(MemoryRevocationStore::new());
        let hasher = Arc::new(
            Argon2SecretHasher::new(&HashCost {
                memory_kib: 256,
                iterations: 1,
                parallelism: 1,
            })
            .unwrap(),
        );
        let signer = JwtHs512Signer::new(JwtConfig {
            issuer: "turnstile.test".to_string(),
            audience: "api-client".to_string(),
            access_ttl: Duration::from_secs(15 * 60),
            signing_key: b"integration-secret".to_vec(),
        });
        let service = Arc::new(RealTokenService::new(
            store.clone(),
            hasher.clone(),
            Arc::new(signer),
            Arc::new(alerts),
            TokenPolicy {
                refresh_ttl,
                store_timeout: Duration::from_secs(1),
            },
        ));

        Self {
            service,
            store,
            hasher,
            sent,
            cancel,
        }
    }

    /// Asserts nothing further arrives within a short grace period.
    async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(self.sent.try_recv().is_err(), "unexpected notification");
    }

    async fn next_notification(&mut self) -> Sent {
        tokio::time::timeout(Duration::from_secs(2), self.sent.recv())
            .await
            .expect("notification within 2s")
            .expect("notifier channel open")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn user(s: &str) -> SubjectId {
    SubjectId::new(s)
}

#[tokio::test]
async fn issued_refresh_token_points_at_a_verifying_record() {
    let h = Harness::new();
    let pair = h
        .service
        .issue_token_pair(user("user-1"), ip("10.0.0.1"))
        .await
        .unwrap();

    let (record_id, secret) = pair.refresh_token.split().expect("well-formed token");
    let record = h.store.get(&record_id).await.unwrap().expect("record stored");
    assert_eq!(record.subject, user("user-1"));
    assert_eq!(record.client_ip, ip("10.0.0.1"));
    assert_ne!(record.verifier.as_bytes(), secret.as_bytes());
    assert!(h.hasher.verify_secret(&secret, &record.verifier).await.unwrap());

    let claims = h
        .service
        .verify_access_token(&pair.access_token)
        .await
        .unwrap();
    assert_eq!(claims.subject, user("user-1"));
    assert_eq!(claims.record_id, record_id.to_string());
    assert!(pair.refresh_token_expires_at > pair.access_token_expires_at);
}

#[tokio::test]
async fn refresh_is_single_use_and_rotates_the_record_id() {
    let h = Harness::new();
    let pair = h
        .service
        .issue_token_pair(user("user-1"), ip("10.0.0.1"))
        .await
        .unwrap();

    let rotated = h
        .service
        .refresh(&pair.refresh_token, ip("10.0.0.1"))
        .await
        .unwrap();
    let (old_id, _) = pair.refresh_token.split().unwrap();
    let (new_id, _) = rotated.refresh_token.split().unwrap();
    assert_ne!(old_id, new_id);
    assert_eq!(h.store.len(), 1);

    let replay = h.service.refresh(&pair.refresh_token, ip("10.0.0.1")).await;
    assert!(matches!(replay, Err(TokenError::UnknownOrExpiredToken)));
}

#[tokio::test]
async fn ip_change_notifies_exactly_once() {
    let mut h = Harness::new();
    let pair = h
        .service
        .issue_token_pair(user("user-1"), ip("10.0.0.1"))
        .await
        .unwrap();

    let same = h
        .service
        .refresh(&pair.refresh_token, ip("10.0.0.1"))
        .await
        .unwrap();
    let _moved = h
        .service
        .refresh(&same.refresh_token, ip("10.0.0.9"))
        .await
        .unwrap();

    let sent = h.next_notification().await;
    assert_eq!(sent.recipients, vec!["security@example.com".to_string()]);
    assert_eq!(sent.subject, "Warning: IP address changed");
    assert!(sent.body.contains("10.0.0.1"));
    assert!(sent.body.contains("10.0.0.9"));
    h.assert_quiet().await;
}

#[tokio::test]
async fn tampered_secret_is_an_invalid_credential() {
    let h = Harness::new();
    let pair = h
        .service
        .issue_token_pair(user("user-1"), ip("10.0.0.1"))
        .await
        .unwrap();

    let decoded = STANDARD.decode(&pair.refresh_token.0).unwrap();
    let secret_start = decoded.iter().position(|&b| b == b':').unwrap() + 1;
    for at in [secret_start, decoded.len() - 1] {
        let flips = [decoded[at] ^ 0x01, b':', 0xff];
        for flipped in flips {
            let mut bytes = decoded.clone();
            bytes[at] = flipped;
            let tampered = RefreshToken(STANDARD.encode(&bytes));

            let result = h.service.refresh(&tampered, ip("10.0.0.1")).await;
            assert!(
                matches!(result, Err(TokenError::InvalidCredential)),
                "byte {at} set to {flipped:#04x}"
            );
        }
    }

    // A failed attempt does not consume the genuine token.
    assert!(h.service.refresh(&pair.refresh_token, ip("10.0.0.1")).await.is_ok());
}

#[tokio::test]
async fn malformed_tokens_are_rejected_before_lookup() {
    let h = Harness::new();
    let inputs = [
        "not base64!".to_string(),
        STANDARD.encode("no-delimiter"),
        STANDARD.encode(":secret"),
        STANDARD.encode("record:"),
    ];
    for raw in inputs {
        let result = h.service.refresh(&RefreshToken(raw.clone()), ip("10.0.0.1")).await;
        assert!(matches!(result, Err(TokenError::MalformedToken)), "{raw}");
    }
    assert!(h.store.is_empty());

    let unknown = RefreshToken::compose(&RecordId::generate(), &RawSecret::generate());
    let result = h.service.refresh(&unknown, ip("10.0.0.1")).await;
    assert!(matches!(result, Err(TokenError::UnknownOrExpiredToken)));
}

#[tokio::test]
async fn expired_records_cannot_be_refreshed() {
    let h = Harness::with_refresh_ttl(Duration::from_millis(50));
    let pair = h
        .service
        .issue_token_pair(user("user-1"), ip("10.0.0.1"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let result = h.service.refresh(&pair.refresh_token, ip("10.0.0.1")).await;
    assert!(matches!(result, Err(TokenError::UnknownOrExpiredToken)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refreshes_have_one_winner() {
    let h = Harness::new();
    let pair = h
        .service
        .issue_token_pair(user("user-1"), ip("10.0.0.1"))
        .await
        .unwrap();

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = h.service.clone();
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&token, ip("10.0.0.1")).await })
        })
        .collect();

    let mut wins = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => wins += 1,
            Err(TokenError::UnknownOrExpiredToken) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(h.store.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refreshes_from_a_new_ip_alert_once() {
    let mut h = Harness::new();
    let pair = h
        .service
        .issue_token_pair(user("user-1"), ip("10.0.0.1"))
        .await
        .unwrap();

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = h.service.clone();
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&token, ip("10.0.0.9")).await })
        })
        .collect();

    let mut wins = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    let sent = h.next_notification().await;
    assert!(sent.body.contains("10.0.0.9"));
    h.assert_quiet().await;
}

#[tokio::test]
async fn end_to_end_session() {
    let mut h = Harness::new();

    let (_a1, r1) = {
        let p = h
            .service
            .issue_token_pair(user("user-1"), ip("10.0.0.1"))
            .await
            .unwrap();
        (p.access_token, p.refresh_token)
    };

    let second = h.service.refresh(&r1, ip("10.0.0.1")).await.unwrap();
    h.assert_quiet().await;

    let replay = h.service.refresh(&r1, ip("10.0.0.1")).await;
    assert!(matches!(replay, Err(TokenError::UnknownOrExpiredToken)));

    let third = h
        .service
        .refresh(&second.refresh_token, ip("10.0.0.9"))
        .await
        .unwrap();
    let sent = h.next_notification().await;
    assert_eq!(sent.body, "Your session IP changed from 10.0.0.1 to 10.0.0.9");
    h.assert_quiet().await;

    let claims = h
        .service
        .verify_access_token(&third.access_token)
        .await
        .unwrap();
    assert_eq!(claims.subject, user("user-1"));
    assert_eq!(claims.client_ip, ip("10.0.0.9"));
}
