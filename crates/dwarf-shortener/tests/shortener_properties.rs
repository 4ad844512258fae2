use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use dwarf_core::{ReadRepository, Repository, SequenceSource, ShortCode};
use dwarf_shortener::generator::store::StoreGenerator;
use dwarf_shortener::{CreateParams, ExpirationPolicy, Shortener, ShortenerError, ShortenerService};
use dwarf_storage::{InMemoryRepository, SqliteRepository};
use jiff::{SignedDuration, Timestamp};

type Service<R> = ShortenerService<R, StoreGenerator<R>>;

fn service<R: Repository + SequenceSource>(repository: R) -> Arc<Service<R>> {
    let repository = Arc::new(repository);
    let generator = StoreGenerator::new(Arc::clone(&repository));
    Arc::new(ShortenerService::with_shared_repository(repository, generator))
}

fn memory() -> Arc<Service<InMemoryRepository>> {
    service(InMemoryRepository::new())
}

async fn sqlite() -> Arc<Service<SqliteRepository>> {
    service(SqliteRepository::in_memory().await.unwrap())
}

/// A database file in the temp directory, removed on drop.
struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    fn new(name: &str) -> Self {
        let unique = format!(
            "dwarf-shortener-{}-{}-{}.sqlite",
            name,
            std::process::id(),
            Timestamp::now().as_nanosecond()
        );
        Self {
            path: std::env::temp_dir().join(unique),
        }
    }

    async fn service(&self) -> Arc<Service<SqliteRepository>> {
        let url = format!("sqlite://{}", self.path.display());
        service(SqliteRepository::connect(&url).await.unwrap())
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = self.path.clone().into_os_string();
            sidecar.push(suffix);
            let _ = std::fs::remove_file(sidecar);
        }
    }
}

fn params(url: &str) -> CreateParams {
    CreateParams::builder().url(url).build()
}

fn custom(url: &str, code: &str) -> CreateParams {
    CreateParams::builder()
        .url(url)
        .code(Some(code.to_string()))
        .build()
}

async fn round_trip<R: Repository + SequenceSource>(service: Arc<Service<R>>) {
    let code = service.create(params("https://example.com")).await.unwrap();

    assert!(code.is_generated());
    assert_eq!(
        service.resolve(code.as_str(), None).await.unwrap(),
        "https://example.com"
    );
}

async fn concurrent_allocations_are_distinct<R: Repository + SequenceSource>(
    service: Arc<Service<R>>,
) {
    let mut handles = vec![];
    for i in 0..32 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .create(params(&format!("https://example.com/{}", i)))
                .await
                .unwrap()
        }));
    }

    let mut codes = HashSet::new();
    for handle in handles {
        let code = handle.await.unwrap();
        assert!(code.as_str().starts_with('@'));
        codes.insert(code);
    }
    assert_eq!(codes.len(), 32);
}

async fn explicit_code_conflict<R: Repository + SequenceSource>(service: Arc<Service<R>>) {
    service
        .create(custom("https://one.example", "abc"))
        .await
        .unwrap();

    let err = service
        .create(custom("https://two.example", "abc"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenerError::CodeTaken(_)));

    assert_eq!(
        service.resolve("abc", None).await.unwrap(),
        "https://one.example"
    );
}

async fn expired_link_is_gone<R: Repository + SequenceSource>(service: Arc<Service<R>>) {
    let code = service
        .create(
            CreateParams::builder()
                .url("https://example.com")
                .expiration(ExpirationPolicy::AtTimestamp(
                    Timestamp::now() - SignedDuration::from_secs(1),
                ))
                .build(),
        )
        .await
        .unwrap();

    let err = service.resolve(code.as_str(), None).await.unwrap_err();
    assert!(matches!(err, ShortenerError::NotFound));
    assert!(service.repository().get(&code).await.unwrap().is_none());

    let err = service.resolve(code.as_str(), None).await.unwrap_err();
    assert!(matches!(err, ShortenerError::NotFound));
}

async fn use_count_is_exact<R: Repository + SequenceSource>(service: Arc<Service<R>>) {
    let code = service
        .create(
            CreateParams::builder()
                .url("https://example.com")
                .uses(Some(2))
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(
        service.resolve(code.as_str(), None).await.unwrap(),
        "https://example.com"
    );
    assert_eq!(
        service.resolve(code.as_str(), None).await.unwrap(),
        "https://example.com"
    );
    let err = service.resolve(code.as_str(), None).await.unwrap_err();
    assert!(matches!(err, ShortenerError::NotFound));
}

async fn concurrent_resolves_respect_use_count<R: Repository + SequenceSource>(
    service: Arc<Service<R>>,
) {
    let code = service
        .create(
            CreateParams::builder()
                .url("https://example.com")
                .uses(Some(3))
                .build(),
        )
        .await
        .unwrap();

    let mut handles = vec![];
    for _ in 0..10 {
        let service = Arc::clone(&service);
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            service.resolve(code.as_str(), None).await
        }));
    }

    let mut resolved = 0;
    let mut not_found = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(url) => {
                assert_eq!(url, "https://example.com");
                resolved += 1;
            }
            Err(ShortenerError::NotFound) => not_found += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(resolved, 3);
    assert_eq!(not_found, 7);
}

async fn encryption_round_trip<R: Repository + SequenceSource>(service: Arc<Service<R>>) {
    let code = service
        .create(
            CreateParams::builder()
                .url("https://secret.example")
                .passphrase(Some("open sesame".to_string()))
                .build(),
        )
        .await
        .unwrap();

    let err = service.resolve(code.as_str(), None).await.unwrap_err();
    assert!(matches!(err, ShortenerError::PasswordRequired));

    let err = service
        .resolve(code.as_str(), Some("close sesame"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenerError::AuthenticationFailed));

    assert_eq!(
        service
            .resolve(code.as_str(), Some("open sesame"))
            .await
            .unwrap(),
        "https://secret.example"
    );
}

async fn failed_attempt_consumes_a_use<R: Repository + SequenceSource>(
    service: Arc<Service<R>>,
) {
    let code = service
        .create(
            CreateParams::builder()
                .url("https://secret.example")
                .uses(Some(1))
                .passphrase(Some("p".to_string()))
                .build(),
        )
        .await
        .unwrap();

    let err = service
        .resolve(code.as_str(), Some("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenerError::AuthenticationFailed));

    let err = service.resolve(code.as_str(), Some("p")).await.unwrap_err();
    assert!(matches!(err, ShortenerError::NotFound));
}

async fn sigil_code_is_rejected<R: Repository + SequenceSource>(service: Arc<Service<R>>) {
    let err = service
        .create(custom("https://example.com", "@evil"))
        .await
        .unwrap_err();

    assert!(matches!(err, ShortenerError::InvalidCode(_)));
    assert!(service
        .repository()
        .get(&ShortCode::new_unchecked("@evil"))
        .await
        .unwrap()
        .is_none());
}

macro_rules! backend_tests {
    ($($name:ident),* $(,)?) => {
        mod in_memory {
            $(
                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn $name() {
                    super::$name(super::memory()).await;
                }
            )*
        }

        mod sqlite {
            $(
                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn $name() {
                    super::$name(super::sqlite().await).await;
                }
            )*
        }

        mod sqlite_file {
            $(
                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn $name() {
                    let database = super::TempDatabase::new(stringify!($name));
                    super::$name(database.service().await).await;
                }
            )*
        }
    };
}

backend_tests!(
    round_trip,
    concurrent_allocations_are_distinct,
    explicit_code_conflict,
    expired_link_is_gone,
    use_count_is_exact,
    concurrent_resolves_respect_use_count,
    encryption_round_trip,
    failed_attempt_consumes_a_use,
    sigil_code_is_rejected,
);
