// Rate-limited fetch gateway. Every outbound feed request goes through one of
// these: a TTL cache in front, coalescing of identical in-flight requests, a
// concurrency limiter with minimum spacing between call starts, and a retry
// loop that cooperates with server-signaled rate limits.
//
// The cache, in-flight map, and pause clock are shared by every clone of the
// handle. The upstream rate limit is global to the process, so one gateway
// instance serializes all feed traffic for the session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use rand::Rng;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Attempt cap; a stuck upstream fails with `Upstream` instead of retrying forever.
pub const MAX_ATTEMPTS: u32 = 6;

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP: Duration = Duration::from_secs(30);
const JITTER_MS: u64 = 200;
const MAX_CACHE_ENTRIES: usize = 1000;

/// Options that affect the upstream response, and therefore the cache key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn with_user_agent(agent: &str) -> Self {
        Self {
            headers: vec![("User-Agent".to_string(), agent.to_string())],
        }
    }
}

/// What the gateway needs to know about an upstream response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Server-mandated retry delay, from the Retry-After header.
    pub retry_after: Option<Duration>,
    /// Remaining request budget, from x-ratelimit-remaining.
    pub ratelimit_remaining: Option<f64>,
    /// Time until the budget resets, from x-ratelimit-reset.
    pub ratelimit_reset: Option<Duration>,
    pub body: String,
}

/// The network seam. Production wraps reqwest; tests script responses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one HTTP GET. `Err` means no response at all (network failure);
    /// error statuses come back as `Ok` with the status set.
    async fn execute(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> anyhow::Result<TransportResponse>;
}

pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> anyhow::Result<TransportResponse> {
        let mut req = self.http.get(url);
        for (name, value) in &options.headers {
            req = req.header(name, value);
        }
        let resp = req.send().await?;

        let status = resp.status().as_u16();
        let header_f64 = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
        };
        let retry_after = header_f64("retry-after").map(Duration::from_secs_f64);
        let ratelimit_remaining = header_f64("x-ratelimit-remaining");
        let ratelimit_reset = header_f64("x-ratelimit-reset").map(Duration::from_secs_f64);

        let body = resp.text().await.unwrap_or_default();
        Ok(TransportResponse {
            status,
            retry_after,
            ratelimit_remaining,
            ratelimit_reset,
            body,
        })
    }
}

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

type SharedRequest = Shared<BoxFuture<'static, Result<serde_json::Value, FetchError>>>;

/// Cloneable handle; all clones share the same cache, limiter, and pause clock.
#[derive(Clone)]
pub struct FetchGateway {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, SharedRequest>>,
    permits: Semaphore,
    min_spacing: Duration,
    /// Earliest instant the next request may start (min-spacing limiter).
    next_start: Mutex<Instant>,
    /// While set and in the future, no network call executes; callers wait.
    paused_until: Mutex<Option<Instant>>,
}

impl FetchGateway {
    pub fn new(config: &FetchConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: &FetchConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                cache: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                permits: Semaphore::new(config.max_concurrency.max(1)),
                min_spacing: Duration::from_millis(config.min_spacing_ms),
                next_start: Mutex::new(Instant::now()),
                paused_until: Mutex::new(None),
            }),
        }
    }

    /// Fetch a JSON payload with caching, coalescing, and retries.
    ///
    /// Concurrent calls with the same url/options share one network call and
    /// all observe the same result.
    pub async fn request(
        &self,
        url: &str,
        options: &RequestOptions,
        ttl: Duration,
    ) -> Result<serde_json::Value, FetchError> {
        let key = cache_key(url, options);

        if let Some(hit) = self.inner.cached(&key).await {
            return Ok(hit);
        }

        let job = {
            let mut in_flight = self.inner.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(pending) => pending.clone(),
                None => {
                    let inner = self.inner.clone();
                    let url = url.to_string();
                    let options = options.clone();
                    let job_key = key.clone();
                    let job = async move {
                        let result = inner.execute_with_retries(&url, &options, ttl, &job_key).await;
                        inner.in_flight.lock().await.remove(&job_key);
                        result
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, job.clone());
                    job
                }
            }
        };

        job.await
    }
}

impl Inner {
    async fn execute_with_retries(
        &self,
        url: &str,
        options: &RequestOptions,
        ttl: Duration,
        key: &str,
    ) -> Result<serde_json::Value, FetchError> {
        let _permit = self.permits.acquire().await.map_err(|_| FetchError::Upstream {
            status: None,
            attempts: 0,
            message: "request limiter closed".to_string(),
        })?;
        self.wait_for_slot().await;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.wait_if_paused().await;

            match self.transport.execute(url, options).await {
                Ok(resp) if resp.status == 429 || resp.status >= 500 => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(transient_exhausted(resp.status, attempt, &resp.body));
                    }
                    let retry_after = resp.retry_after.unwrap_or(Duration::ZERO);
                    let wait = retry_after.max(backoff_delay(attempt));
                    tracing::debug!(url, status = resp.status, attempt, ?wait, "retrying after backoff");
                    // Let concurrent callers cooperate with a server-mandated pause.
                    if retry_after > Duration::ZERO {
                        self.pause_for(retry_after).await;
                    }
                    tokio::time::sleep(wait).await;
                }
                Ok(resp) if !(200..300).contains(&resp.status) => {
                    return Err(FetchError::Upstream {
                        status: Some(resp.status),
                        attempts: attempt,
                        message: snippet(&resp.body),
                    });
                }
                Ok(resp) => {
                    // Pre-emptively back off when the budget is (nearly) spent.
                    if let (Some(remaining), Some(reset)) =
                        (resp.ratelimit_remaining, resp.ratelimit_reset)
                    {
                        if remaining <= 1.0 && reset > Duration::ZERO {
                            tracing::debug!(?reset, "rate limit budget low, pausing");
                            self.pause_for(reset).await;
                        }
                    }
                    let value: serde_json::Value = serde_json::from_str(&resp.body)
                        .map_err(|e| FetchError::Decode(e.to_string()))?;
                    self.store(key.to_string(), value.clone(), ttl).await;
                    return Ok(value);
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(FetchError::Upstream {
                            status: None,
                            attempts: attempt,
                            message: e.to_string(),
                        });
                    }
                    let wait = backoff_delay(attempt);
                    tracing::debug!(url, attempt, ?wait, error = %e, "network failure, retrying");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    async fn cached(&self, key: &str) -> Option<serde_json::Value> {
        let mut cache = self.cache.lock().await;
        match cache.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    async fn store(&self, key: String, value: serde_json::Value, ttl: Duration) {
        let mut cache = self.cache.lock().await;
        if cache.len() >= MAX_CACHE_ENTRIES {
            let now = Instant::now();
            cache.retain(|_, e| e.expires_at > now);
            if cache.len() >= MAX_CACHE_ENTRIES {
                // Still full of live entries: evict the soonest-to-expire one.
                if let Some(victim) = cache
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone())
                {
                    cache.remove(&victim);
                }
            }
        }
        cache.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Enforce minimum spacing between request starts.
    async fn wait_for_slot(&self) {
        let wake = {
            let mut next = self.next_start.lock().await;
            let slot = (*next).max(Instant::now());
            *next = slot + self.min_spacing;
            slot
        };
        tokio::time::sleep_until(wake).await;
    }

    async fn wait_if_paused(&self) {
        let until = *self.paused_until.lock().await;
        if let Some(until) = until {
            if until > Instant::now() {
                tokio::time::sleep_until(until).await;
            }
        }
    }

    /// Extend the process-wide pause window; never shortens an existing one.
    async fn pause_for(&self, duration: Duration) {
        let until = Instant::now() + duration;
        let mut paused = self.paused_until.lock().await;
        if paused.map_or(true, |current| until > current) {
            *paused = Some(until);
        }
    }
}

fn cache_key(url: &str, options: &RequestOptions) -> String {
    let opts = serde_json::to_string(&options.headers).unwrap_or_default();
    format!("{}{}", url, opts)
}

/// Exponential backoff floor with jitter: `min(cap, base * 2^(attempt-1)) + rand(0..200ms)`.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(1 << (attempt - 1).min(16)));
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..JITTER_MS));
    exp.min(BACKOFF_CAP) + jitter
}

fn transient_exhausted(status: u16, attempts: u32, body: &str) -> FetchError {
    if status == 429 {
        FetchError::RateLimited { attempts }
    } else {
        FetchError::Upstream {
            status: Some(status),
            attempts,
            message: snippet(body),
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 200 {
        trimmed.chars().take(200).collect()
    } else {
        trimmed.to_string()
    }
}
