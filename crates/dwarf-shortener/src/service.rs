use crate::generator::Generator;
use async_trait::async_trait;
use dwarf_core::{
    Clock, CreateParams, EncryptedPayload, ExpirationPolicy, Repository, ShortCode,
    Shortener, ShortenerError, ShortlinkRecord, StorageError, SystemClock, Target,
};
use jiff::Timestamp;
use std::sync::Arc;
use tracing::{debug, trace, warn};

type Result<T> = std::result::Result<T, ShortenerError>;

/// Default bound on insert attempts for generated codes.
pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u32 = 8;

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `Repository`, a `Generator` and a `Clock` to handle:
/// - URL, use count, expiration and custom code validation
/// - passphrase encryption of the target
/// - generated code allocation with bounded retry on collisions
/// - lazy eviction of expired and exhausted records on resolve
#[derive(Debug, Clone)]
pub struct ShortenerService<R, G, C = SystemClock> {
    repository: Arc<R>,
    generator: Arc<G>,
    clock: C,
    max_allocation_attempts: u32,
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    /// Creates a new `ShortenerService` reading time from the system clock.
    pub fn new(repository: R, generator: G) -> Self {
        Self::with_shared_repository(Arc::new(repository), generator)
    }

    /// Creates a service over a repository handle that is also used elsewhere,
    /// e.g. by a [`StoreGenerator`](crate::generator::store::StoreGenerator).
    pub fn with_shared_repository(repository: Arc<R>, generator: G) -> Self {
        Self {
            repository,
            generator: Arc::new(generator),
            clock: SystemClock,
            max_allocation_attempts: DEFAULT_MAX_ALLOCATION_ATTEMPTS,
        }
    }
}

impl<R: Repository, G: Generator, C: Clock> ShortenerService<R, G, C> {
    /// Replaces the time source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ShortenerService<R, G, C2> {
        ShortenerService {
            repository: self.repository,
            generator: self.generator,
            clock,
            max_allocation_attempts: self.max_allocation_attempts,
        }
    }

    /// Sets how many generated codes are tried before giving up. At least one
    /// attempt is always made.
    pub fn with_max_allocation_attempts(mut self, attempts: u32) -> Self {
        self.max_allocation_attempts = attempts.max(1);
        self
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Accepts `url` as given when it parses as an absolute URL, otherwise
    /// retries with an `http://` prefix.
    fn validate_url(url: &str) -> Result<String> {
        if url.trim().is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }

        if url::Url::parse(url).is_ok() {
            return Ok(url.to_string());
        }

        let prefixed = format!("http://{}", url);
        match url::Url::parse(&prefixed) {
            Ok(_) => Ok(prefixed),
            Err(e) => Err(ShortenerError::InvalidUrl(format!("{}: {}", url, e))),
        }
    }

    fn validate_uses(uses: Option<u32>) -> Result<Option<u32>> {
        match uses {
            Some(0) => Err(ShortenerError::InvalidUses(
                "a use-limited link needs at least one use".to_string(),
            )),
            other => Ok(other),
        }
    }

    fn expiration_to_timestamp(
        expiration: &ExpirationPolicy,
        now: Timestamp,
    ) -> Result<Option<Timestamp>> {
        match expiration {
            ExpirationPolicy::Never => Ok(None),
            ExpirationPolicy::AfterDuration(duration) => now
                .checked_add(*duration)
                .map(Some)
                .map_err(|e| ShortenerError::InvalidExpiration(format!("{}: {}", duration, e))),
            ExpirationPolicy::AtTimestamp(timestamp) => Ok(Some(*timestamp)),
        }
    }

    /// Inserts `record` under freshly generated codes until one is free.
    async fn allocate(&self, record: ShortlinkRecord, now: Timestamp) -> Result<ShortCode> {
        for attempt in 1..=self.max_allocation_attempts {
            let code = self.generator.generate().await?;

            match self.repository.insert(&code, record.clone(), now).await {
                Ok(()) => return Ok(code),
                Err(StorageError::Conflict(_)) => {
                    warn!(code = %code, attempt, "generated code already taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ShortenerError::AllocationExhausted {
            attempts: self.max_allocation_attempts,
        })
    }

    /// Removes the record under `code` if it is still dead at `now`. Failures
    /// are only logged, the caller sees `NotFound` either way.
    async fn evict(&self, code: &ShortCode, now: Timestamp) {
        match self.repository.evict(code, now).await {
            Ok(true) => debug!(code = %code, "short link evicted"),
            Ok(false) => debug!(code = %code, "short link already gone or replaced"),
            Err(e) => warn!(code = %code, error = %e, "failed to evict short link"),
        }
    }
}

#[async_trait]
impl<R: Repository, G: Generator, C: Clock> Shortener for ShortenerService<R, G, C> {
    async fn create(&self, params: CreateParams) -> Result<ShortCode> {
        trace!(?params, "creating short link");

        let url = Self::validate_url(&params.url)?;
        let uses_remaining = Self::validate_uses(params.uses)?;
        let now = self.clock.now();
        let expires_at = Self::expiration_to_timestamp(&params.expiration, now)?;

        let custom_code = match params.code.as_deref() {
            Some(code) if !code.is_empty() => Some(ShortCode::new(code)?),
            _ => None,
        };

        let target = match params.passphrase.as_deref() {
            Some(passphrase) if !passphrase.is_empty() => {
                Target::Encrypted(EncryptedPayload::seal(&url, passphrase)?)
            }
            _ => Target::Plain(url),
        };

        let record = ShortlinkRecord {
            target,
            expires_at,
            uses_remaining,
        };

        let code = match custom_code {
            Some(code) => {
                self.repository.insert(&code, record, now).await?;
                code
            }
            None => self.allocate(record, now).await?,
        };

        debug!(code = %code, "short link created");
        Ok(code)
    }

    async fn resolve(&self, code: &str, passphrase: Option<&str>) -> Result<String> {
        trace!(code, "resolving short link");

        let Ok(code) = ShortCode::parse(code) else {
            debug!(code, "malformed short code");
            return Err(ShortenerError::NotFound);
        };

        let now = self.clock.now();
        let record = self
            .repository
            .get(&code)
            .await?
            .ok_or(ShortenerError::NotFound)?;

        let verdict = record.verdict(now);
        if !verdict.is_resolvable() {
            debug!(code = %code, ?verdict, "evicting short link");
            self.evict(&code, now).await;
            return Err(ShortenerError::NotFound);
        }

        // The use is taken before the passphrase is checked, so a failed
        // attempt still counts against the limit.
        let record = if record.uses_remaining.is_some() {
            match self.repository.decrement_uses(&code, now).await? {
                Some(taken) => {
                    debug!(code = %code, remaining = ?taken.uses_remaining, "consumed one use");
                    taken
                }
                None => {
                    debug!(code = %code, "short link died after it was read");
                    self.evict(&code, now).await;
                    return Err(ShortenerError::NotFound);
                }
            }
        } else {
            record
        };

        let url = match record.target {
            Target::Plain(url) => url,
            Target::Encrypted(payload) => {
                let passphrase = passphrase
                    .filter(|p| !p.is_empty())
                    .ok_or(ShortenerError::PasswordRequired)?;
                payload.open(passphrase)?
            }
        };

        Ok(url)
    }

    async fn delete(&self, code: &str) -> Result<bool> {
        trace!(code, "deleting short link");

        let Ok(code) = ShortCode::parse(code) else {
            return Ok(false);
        };

        Ok(self.repository.delete(&code).await?)
    }
}
