//! Image generation as fire-and-forget jobs.
//!
//! [`ImageJobService::submit`] validates the request, registers a pending
//! job and spawns the generation, returning the job id without waiting.
//! The spawned task does a cache lookup, waits on the pacer gate and makes
//! a deadline-bounded upstream call. Its result settles the job in the
//! [`JobTracker`]; a fresh image is cached only if that settle wins, so a
//! job already settled by the webhook keeps its cached URL.

use std::sync::Arc;
use std::time::Duration;

use kidstory_core::error::CoreError;
use kidstory_core::job::{JobId, JobOutcome};
use kidstory_core::models;
use kidstory_core::prompt;
use kidstory_core::upstream::UpstreamError;
use kidstory_openai::ImageGenerator;

use crate::cache::ResultCache;
use crate::config::JobsConfig;
use crate::pacer::Pacer;
use crate::tracker::JobTracker;

/// A client's request for an image.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    /// Image model id; `None` selects the default model.
    pub model: Option<String>,
}

/// Front door for image jobs. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct ImageJobService {
    tracker: Arc<JobTracker>,
    cache: Arc<ResultCache>,
    pacer: Arc<Pacer>,
    generator: Arc<dyn ImageGenerator>,
    call_timeout: Duration,
}

impl ImageJobService {
    pub fn new(generator: Arc<dyn ImageGenerator>, config: &JobsConfig) -> Self {
        Self {
            tracker: Arc::new(JobTracker::new(config.retention, config.push_timeout)),
            cache: Arc::new(ResultCache::new(config.cache_ttl)),
            pacer: Arc::new(Pacer::new(config.min_call_interval)),
            generator,
            call_timeout: config.call_timeout,
        }
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Accept an image request and start generating in the background.
    ///
    /// Only malformed input fails here; upstream failures are recorded on
    /// the job and surface through polling or the push channel.
    pub async fn submit(&self, request: ImageRequest) -> Result<JobId, CoreError> {
        prompt::validate_prompt(&request.prompt)?;
        let model = models::resolve_image_model(request.model.as_deref())?;
        let prompt = request.prompt.trim().to_string();

        let job_id = self.tracker.create(&prompt, model).await;
        tracing::info!(job_id = %job_id, model, "Image job submitted");

        let service = self.clone();
        tokio::spawn(async move {
            service.run_job(job_id, &prompt, model).await;
        });

        Ok(job_id)
    }

    /// Produce an image URL for `(prompt, model)`, reusing a cached result
    /// when one is fresh.
    pub async fn generate(&self, prompt: &str, model: &str) -> Result<String, UpstreamError> {
        match self.fetch(prompt, model).await? {
            Fetched::Cached(url) => Ok(url),
            Fetched::Fresh(url) => {
                self.cache.store(prompt, model, url.as_str()).await;
                Ok(url)
            }
        }
    }

    /// Cache lookup, pacer gate, then the deadline-bounded upstream call.
    /// Does not store the result.
    async fn fetch(&self, prompt: &str, model: &str) -> Result<Fetched, UpstreamError> {
        if let Some(url) = self.cache.lookup(prompt, model).await {
            tracing::debug!(model, "Image cache hit");
            return Ok(Fetched::Cached(url));
        }

        self.pacer.pace().await;

        // A request queued behind an identical one can reuse its result.
        if let Some(url) = self.cache.lookup(prompt, model).await {
            tracing::debug!(model, "Image cache hit after pacing");
            return Ok(Fetched::Cached(url));
        }

        let upstream_prompt = prompt::upstream_prompt(prompt);
        let call = self.generator.generate_image(&upstream_prompt, model);

        let url = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    model,
                    timeout_secs = self.call_timeout.as_secs(),
                    "Image generation timed out",
                );
                return Err(UpstreamError::timeout(self.call_timeout));
            }
        };

        Ok(Fetched::Fresh(url))
    }

    /// Settle a job from outside the process (the completion webhook).
    ///
    /// Behaves as if the background call had produced `outcome`; a
    /// successful image is also cached for the job's prompt.
    pub async fn complete_external(
        &self,
        job_id: JobId,
        outcome: JobOutcome,
    ) -> Result<(), CoreError> {
        let job = self.tracker.snapshot(job_id).await.ok_or(CoreError::NotFound {
            entity: "Job",
            id: job_id.to_string(),
        })?;

        self.tracker.complete(job_id, outcome.clone()).await?;

        if let JobOutcome::Completed(result) = &outcome {
            self.cache
                .store(&job.prompt, &job.model, result.image_url.as_str())
                .await;
        }
        Ok(())
    }

    async fn run_job(&self, job_id: JobId, prompt: &str, model: &str) {
        let fetched = self.fetch(prompt, model).await;
        if let Err(e) = &fetched {
            tracing::warn!(job_id = %job_id, kind = ?e.kind, error = %e, "Image job failed");
        }

        let fresh = match &fetched {
            Ok(Fetched::Fresh(url)) => Some(url.clone()),
            _ => None,
        };
        let result = fetched.map(Fetched::into_url);

        match self.tracker.complete(job_id, JobOutcome::from(result)).await {
            Ok(_) => {
                if let Some(url) = fresh {
                    self.cache.store(prompt, model, url).await;
                }
            }
            Err(CoreError::Conflict(_)) => {
                tracing::debug!(
                    job_id = %job_id,
                    "Job was already settled externally; discarding late result",
                );
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to settle image job");
            }
        }
    }
}

/// Where an image URL came from.
enum Fetched {
    Cached(String),
    Fresh(String),
}

impl Fetched {
    fn into_url(self) -> String {
        match self {
            Fetched::Cached(url) | Fetched::Fresh(url) => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use kidstory_core::job::JobStatus;
    use kidstory_core::upstream::UpstreamErrorKind;
    use tokio::time::Instant;

    use super::*;

    /// Records the start instant and prompt of each call, then answers
    /// after `delay`.
    struct FakeGenerator {
        delay: Duration,
        fail_with: Option<UpstreamError>,
        calls: Mutex<Vec<(Instant, String)>>,
    }

    impl FakeGenerator {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                fail_with: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: UpstreamError) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(10),
                fail_with: Some(error),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn call_starts(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
        }
    }

    #[async_trait]
    impl ImageGenerator for FakeGenerator {
        async fn generate_image(&self, prompt: &str, model: &str) -> Result<String, UpstreamError> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((Instant::now(), prompt.to_string()));
                calls.len()
            };
            tokio::time::sleep(self.delay).await;
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(format!("https://img.test/{model}/{n}.png")),
            }
        }
    }

    fn service(generator: Arc<FakeGenerator>) -> ImageJobService {
        ImageJobService::new(generator, &JobsConfig::default())
    }

    fn request(prompt: &str) -> ImageRequest {
        ImageRequest {
            prompt: prompt.to_string(),
            model: Some("dall-e-3".to_string()),
        }
    }

    /// Poll until the job leaves `Pending`, letting paused time auto-advance.
    async fn wait_for_terminal(service: &ImageJobService, id: JobId) -> JobStatus {
        for _ in 0..1000 {
            let status = service.tracker().poll_status(id).await;
            if status != JobStatus::Pending {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("job {id} never settled");
    }

    #[tokio::test(start_paused = true)]
    async fn submit_returns_before_generation_finishes() {
        let generator = FakeGenerator::new(Duration::from_secs(5));
        let service = service(generator.clone());

        let id = service.submit(request("a red fox")).await.unwrap();
        assert_eq!(service.tracker().poll_status(id).await, JobStatus::Pending);

        let status = wait_for_terminal(&service, id).await;
        assert_matches!(status, JobStatus::Completed(ref r) if r.image_url.starts_with("https://img.test/dall-e-3/"));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_creates_no_job() {
        let generator = FakeGenerator::new(Duration::ZERO);
        let service = service(generator.clone());

        let empty = service.submit(request("   ")).await;
        assert_matches!(empty, Err(CoreError::Validation(_)));

        let bad_model = service
            .submit(ImageRequest {
                prompt: "a red fox".into(),
                model: Some("gpt-4".into()),
            })
            .await;
        assert_matches!(bad_model, Err(CoreError::Validation(_)));

        assert_eq!(service.tracker().job_count().await, 0);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_failure_is_recorded_on_the_job() {
        let generator =
            FakeGenerator::failing(UpstreamError::new(UpstreamErrorKind::RateLimit, "slow down"));
        let service = service(generator);

        let id = service.submit(request("a red fox")).await.unwrap();

        assert_matches!(
            wait_for_terminal(&service, id).await,
            JobStatus::Failed { kind: UpstreamErrorKind::RateLimit, .. }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_upstream_times_out() {
        let generator = FakeGenerator::new(Duration::from_secs(120));
        let service = service(generator);

        let id = service.submit(request("a red fox")).await.unwrap();

        assert_matches!(
            wait_for_terminal(&service, id).await,
            JobStatus::Failed { kind: UpstreamErrorKind::Timeout, .. }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn identical_requests_within_ttl_call_upstream_once() {
        let generator = FakeGenerator::new(Duration::from_millis(500));
        let service = service(generator.clone());

        let first = service.generate("a red fox", "dall-e-3").await.unwrap();
        let second = service.generate("  A RED FOX ", "dall-e-3").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_request_after_ttl_calls_upstream_again() {
        let generator = FakeGenerator::new(Duration::from_millis(500));
        let service = service(generator.clone());

        service.generate("a red fox", "dall-e-3").await.unwrap();
        tokio::time::advance(JobsConfig::default().cache_ttl + Duration::from_secs(1)).await;
        service.generate("a red fox", "dall-e-3").await.unwrap();

        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_upstream_calls_are_paced() {
        let generator = FakeGenerator::new(Duration::from_millis(50));
        let service = service(generator.clone());

        let mut ids = Vec::new();
        for prompt in ["a red fox", "a blue whale", "a green frog", "a pink cat"] {
            ids.push(service.submit(request(prompt)).await.unwrap());
        }
        for id in ids {
            assert_matches!(wait_for_terminal(&service, id).await, JobStatus::Completed(_));
        }

        let mut starts = generator.call_starts();
        assert_eq!(starts.len(), 4);
        starts.sort();
        let interval = JobsConfig::default().min_call_interval;
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_receives_prefixed_truncated_prompt() {
        let generator = FakeGenerator::new(Duration::ZERO);
        let service = service(generator.clone());

        service.generate(&"x".repeat(950), "dall-e-3").await.unwrap();

        let calls = generator.calls.lock().unwrap();
        let sent = &calls[0].1;
        assert!(sent.starts_with(prompt::CHILD_FRIENDLY_PREFIX));
        assert_eq!(
            sent.chars().count(),
            prompt::CHILD_FRIENDLY_PREFIX.chars().count() + prompt::UPSTREAM_PROMPT_CHARS
        );
    }

    #[tokio::test(start_paused = true)]
    async fn external_completion_settles_job_and_fills_cache() {
        let generator = FakeGenerator::new(Duration::from_secs(20));
        let service = service(generator.clone());
        let id = service.submit(request("a red fox")).await.unwrap();

        service
            .complete_external(id, JobOutcome::completed("https://cdn.test/fox.png"))
            .await
            .unwrap();

        assert_matches!(
            service.tracker().poll_status(id).await,
            JobStatus::Completed(ref r) if r.image_url == "https://cdn.test/fox.png"
        );
        assert_eq!(
            service.cache().lookup("a red fox", "dall-e-3").await.as_deref(),
            Some("https://cdn.test/fox.png")
        );

        // The in-process call finishing later must not overwrite the result.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_matches!(
            service.tracker().poll_status(id).await,
            JobStatus::Completed(ref r) if r.image_url == "https://cdn.test/fox.png"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn late_upstream_result_does_not_replace_webhook_url_in_cache() {
        let generator = FakeGenerator::new(Duration::from_secs(20));
        let service = service(generator.clone());
        let id = service.submit(request("a red fox")).await.unwrap();

        // Let the background call start before the webhook settles the job.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(generator.call_count(), 1);

        service
            .complete_external(id, JobOutcome::completed("https://cdn.test/fox.png"))
            .await
            .unwrap();

        // The upstream call finishes with its own URL after the settle.
        tokio::time::sleep(Duration::from_secs(25)).await;

        assert_eq!(
            service.cache().lookup("a red fox", "dall-e-3").await.as_deref(),
            Some("https://cdn.test/fox.png")
        );

        // A later identical request is served the webhook's URL.
        let again = service.generate("a red fox", "dall-e-3").await.unwrap();
        assert_eq!(again, "https://cdn.test/fox.png");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_job_result_is_cached() {
        let generator = FakeGenerator::new(Duration::from_millis(10));
        let service = service(generator.clone());

        let id = service.submit(request("a red fox")).await.unwrap();
        let status = wait_for_terminal(&service, id).await;

        let url = match status {
            JobStatus::Completed(result) => result.image_url,
            other => panic!("expected completed job, got {other:?}"),
        };
        assert_eq!(
            service.cache().lookup("a red fox", "dall-e-3").await,
            Some(url)
        );
    }
}
