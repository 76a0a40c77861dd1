//! Pipeline orchestrator.
//!
//! A [`RemediClient`] owns one connection per configured server, one
//! dispatcher task per connection, and the correlation store those tasks
//! fill. Every request method sends exactly one frame per job and then
//! polls the store for the answer.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use remedi_core::wire;
use remedi_core::{
    reassemble, token_group, Chunk, ClientConfig, IcuSentenceSegmenter, JobIdGenerator, Message,
    ProcessorRequest, ProcessorResponse, Segmenter, StatusCode, SupportedLanguageRequest,
    SupportedLanguageResponse, TranslationRequest, TranslationResponse,
};

use crate::dispatch::InboundDispatcher;
use crate::error::{ClientError, Stage};
use crate::poll::{await_response, BackoffPolicy};
use crate::store::CorrelationStore;
use crate::transport::{Connector, Transport, CLOSE_REASON};

/// Which stages `translate_text` runs, decided by configured endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    TranslateOnly,
    TranslatePost,
    PreTranslate,
    PreTranslatePost,
}

impl Pipeline {
    pub fn of(pre_processing: bool, post_processing: bool) -> Self {
        match (pre_processing, post_processing) {
            (false, false) => Self::TranslateOnly,
            (false, true) => Self::TranslatePost,
            (true, false) => Self::PreTranslate,
            (true, true) => Self::PreTranslatePost,
        }
    }

    /// Stages in execution order.
    pub fn stages(self) -> &'static [Stage] {
        use Stage::*;
        match self {
            Self::TranslateOnly => &[Translation],
            Self::TranslatePost => &[Translation, PostProcessing],
            Self::PreTranslate => &[PreProcessing, Translation],
            Self::PreTranslatePost => &[PreProcessing, Translation, PostProcessing],
        }
    }
}

fn check_status(stage: Stage, status: StatusCode, message: &Option<String>) -> Result<(), ClientError> {
    if status.is_failure() {
        return Err(ClientError::StageFailed {
            stage,
            status,
            message: message.clone(),
        });
    }
    Ok(())
}

// ── Builder ───────────────────────────────────────────────────────────────────

pub struct ClientBuilder {
    config: ClientConfig,
    ids: Option<Arc<JobIdGenerator>>,
    segmenter: Option<Arc<dyn Segmenter>>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            ids: None,
            segmenter: None,
        }
    }

    /// Share a job id generator with other clients in the process.
    pub fn id_generator(mut self, ids: Arc<JobIdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    /// Validate the configuration and open every configured endpoint.
    pub async fn connect(self, connector: &dyn Connector) -> Result<RemediClient, ClientError> {
        self.config.validate()?;

        let store = CorrelationStore::new();
        let (shutdown, _) = broadcast::channel(1);
        let mut dispatchers = Vec::new();

        let endpoints = &self.config.endpoints;
        let open = |stage: Stage, endpoint: &str| {
            let store = store.clone();
            let shutdown = shutdown.subscribe();
            let endpoint = endpoint.to_string();
            async move {
                let connection = connector
                    .connect(&endpoint)
                    .await
                    .map_err(|source| ClientError::Connect { stage, source })?;
                tracing::info!(%stage, endpoint = %endpoint, "connected");
                let dispatcher = InboundDispatcher::new(store, endpoint);
                let handle = tokio::spawn(dispatcher.run(connection.inbound, shutdown));
                Ok::<_, ClientError>((connection.transport, handle))
            }
        };

        let pre_processing = match endpoints.pre_processing.as_deref() {
            Some(endpoint) => {
                let (transport, handle) = open(Stage::PreProcessing, endpoint).await?;
                dispatchers.push(handle);
                Some(transport)
            }
            None => None,
        };

        let (translation, handle) = open(Stage::Translation, &endpoints.translation).await?;
        dispatchers.push(handle);

        let post_processing = match endpoints.post_processing.as_deref() {
            Some(endpoint) => {
                let (transport, handle) = open(Stage::PostProcessing, endpoint).await?;
                dispatchers.push(handle);
                Some(transport)
            }
            None => None,
        };

        Ok(RemediClient {
            policy: BackoffPolicy::from(&self.config.polling),
            config: self.config,
            ids: self.ids.unwrap_or_default(),
            segmenter: self
                .segmenter
                .unwrap_or_else(|| Arc::new(IcuSentenceSegmenter)),
            store,
            pre_processing,
            translation,
            post_processing,
            shutdown,
            dispatchers,
        })
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Dropping the client stops its dispatchers without sending close frames.
pub struct RemediClient {
    config: ClientConfig,
    policy: BackoffPolicy,
    ids: Arc<JobIdGenerator>,
    segmenter: Arc<dyn Segmenter>,
    store: CorrelationStore,
    pre_processing: Option<Arc<dyn Transport>>,
    translation: Arc<dyn Transport>,
    post_processing: Option<Arc<dyn Transport>>,
    shutdown: broadcast::Sender<()>,
    dispatchers: Vec<JoinHandle<()>>,
}

impl RemediClient {
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Connect with the default id generator and segmenter.
    pub async fn connect(config: &ClientConfig, connector: &dyn Connector) -> Result<Self, ClientError> {
        ClientBuilder::new(config.clone()).connect(connector).await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::of(self.pre_processing.is_some(), self.post_processing.is_some())
    }

    /// Responses that arrived and were never claimed.
    pub fn unclaimed_responses(&self) -> usize {
        self.store.pending()
    }

    fn transport(&self, stage: Stage) -> Result<&Arc<dyn Transport>, ClientError> {
        match stage {
            Stage::PreProcessing => self.pre_processing.as_ref(),
            Stage::Translation => Some(&self.translation),
            Stage::PostProcessing => self.post_processing.as_ref(),
        }
        .ok_or(ClientError::StageUnconfigured(stage))
    }

    async fn exchange<T>(
        &self,
        stage: Stage,
        transport: &dyn Transport,
        message: &Message,
        take: impl FnMut() -> Option<T>,
    ) -> Result<T, ClientError> {
        let frame = wire::encode(message)?;
        tracing::debug!(%stage, kind = %message.kind(), "sending request");
        await_response(stage, &self.policy, transport.send(frame), take).await
    }

    // ── Language support ──────────────────────────────────────────────────

    /// Ask the translation server which language pairs it serves.
    pub async fn supported_languages(&self) -> Result<SupportedLanguageResponse, ClientError> {
        let message = Message::LanguageRequest(SupportedLanguageRequest {});
        let response = self
            .exchange(Stage::Translation, self.translation.as_ref(), &message, || {
                self.store.take_languages()
            })
            .await?;
        tracing::info!(sources = response.languages.len(), "supported languages received");
        Ok(response)
    }

    pub async fn supports_language_pair(&self, source: &str, target: &str) -> Result<bool, ClientError> {
        Ok(self.supported_languages().await?.supports_language_pair(source, target))
    }

    // ── Single stages ─────────────────────────────────────────────────────

    /// Run `text` through the pre-processor. Pass
    /// [`LANGUAGE_AUTO`](remedi_core::LANGUAGE_AUTO) to have it detect the language.
    pub async fn pre_process(&self, language: &str, text: &str) -> Result<ProcessorResponse, ClientError> {
        self.process_text(Stage::PreProcessing, language, text).await
    }

    pub async fn post_process(&self, language: &str, text: &str) -> Result<ProcessorResponse, ClientError> {
        self.process_text(Stage::PostProcessing, language, text).await
    }

    /// Segment `text` into sentences and translate them as one job.
    pub async fn translate(
        &self,
        source_language: &str,
        target_language: &str,
        text: &str,
    ) -> Result<TranslationResponse, ClientError> {
        let job_id = self.ids.next_id().ok_or(ClientError::JobIdsExhausted)?;
        let mut request = TranslationRequest::from_text(
            job_id,
            source_language,
            target_language,
            text,
            self.segmenter.as_ref(),
        );
        request.priority = self.config.requests.priority;
        request.translation_info = self.config.requests.translation_info;
        self.translate_request(request).await
    }

    /// Send a prepared translation request. Its `job_id` must be unique
    /// among in-flight jobs.
    pub async fn translate_request(&self, request: TranslationRequest) -> Result<TranslationResponse, ClientError> {
        let job_id = request.job_id;
        tracing::info!(
            job_id,
            source = %request.source_language,
            target = %request.target_language,
            sentences = request.source_sentences.len(),
            "translation requested"
        );

        let message = Message::TranslationRequest(request);
        let response = self
            .exchange(Stage::Translation, self.translation.as_ref(), &message, || {
                self.store.take_translation(job_id)
            })
            .await?;

        check_status(Stage::Translation, response.status, &response.status_message)?;
        tracing::info!(job_id, status = %response.status, "translation received");
        Ok(response)
    }

    async fn process_text(&self, stage: Stage, language: &str, text: &str) -> Result<ProcessorResponse, ClientError> {
        let mut request = ProcessorRequest::new(language, text);
        request.priority = self.config.requests.priority;

        let response = self.process(stage, request).await?;
        check_status(stage, response.status, &response.status_message)?;
        tracing::info!(%stage, token = %response.job_token, lang = %response.language, "stage complete");
        Ok(response)
    }

    async fn process(&self, stage: Stage, request: ProcessorRequest) -> Result<ProcessorResponse, ClientError> {
        let transport = self.transport(stage)?;
        let group = token_group(&request.job_token).to_string();
        let message = match stage {
            Stage::PreProcessing => Message::PreRequest(request),
            _ => Message::PostRequest(request),
        };
        self.exchange(stage, transport.as_ref(), &message, || match stage {
            Stage::PreProcessing => self.store.take_pre_processing(&group),
            _ => self.store.take_post_processing(&group),
        })
        .await
    }

    // ── Chunked stages ────────────────────────────────────────────────────

    pub async fn pre_process_chunks(&self, language: &str, chunks: &[Chunk]) -> Result<String, ClientError> {
        self.process_chunks(Stage::PreProcessing, language, chunks).await
    }

    pub async fn post_process_chunks(&self, language: &str, chunks: &[Chunk]) -> Result<String, ClientError> {
        self.process_chunks(Stage::PostProcessing, language, chunks).await
    }

    /// Send every chunk, wait for all of them, and reassemble.
    ///
    /// Chunk status never fails the call: a chunk that comes back not ok
    /// is treated as missing. Chunks with identical text share a token and
    /// therefore a single request.
    async fn process_chunks(&self, stage: Stage, language: &str, chunks: &[Chunk]) -> Result<String, ClientError> {
        self.transport(stage)?;

        let mut requests = ProcessorRequest::for_chunks(language, chunks);
        for request in &mut requests {
            request.priority = self.config.requests.priority;
        }

        let mut unique: HashMap<&str, &ProcessorRequest> = HashMap::new();
        for request in &requests {
            unique.entry(request.job_token.as_str()).or_insert(request);
        }
        tracing::info!(
            %stage,
            chunks = requests.len(),
            requests = unique.len(),
            "processing chunks"
        );

        let results = futures::future::try_join_all(unique.values().map(|request| async move {
            let response = self.process(stage, (*request).clone()).await?;
            Ok::<_, ClientError>((request.job_token.clone(), response))
        }))
        .await?;
        let by_token: HashMap<String, ProcessorResponse> = results.into_iter().collect();

        let responses: Vec<ProcessorResponse> = requests
            .iter()
            .filter_map(|request| {
                let response = by_token.get(&request.job_token)?;
                if response.chunk_index == request.chunk_index {
                    Some(response.clone())
                } else {
                    Some(ProcessorResponse {
                        chunk_index: request.chunk_index,
                        number_of_chunks: request.number_of_chunks,
                        ..response.clone()
                    })
                }
            })
            .collect();

        let assembly = &self.config.assembly;
        Ok(reassemble(&responses, &assembly.delimiter, assembly.placeholders))
    }

    // ── Full pipeline ─────────────────────────────────────────────────────

    /// Run `text` through every configured stage.
    ///
    /// A language detected by the pre-processor replaces
    /// `source_language` for translation. Post-processing runs in the
    /// target language on the assembled translation.
    pub async fn translate_text(
        &self,
        source_language: &str,
        target_language: &str,
        text: &str,
    ) -> Result<String, ClientError> {
        let pipeline = self.pipeline();
        tracing::info!(?pipeline, source = source_language, target = target_language, "translating text");

        let mut language = source_language.to_string();
        let mut text = text.to_string();
        for stage in pipeline.stages() {
            match stage {
                Stage::PreProcessing => {
                    let response = self.pre_process(&language, &text).await?;
                    if !response.language.is_empty() {
                        language = response.language;
                    }
                    text = response.text;
                }
                Stage::Translation => {
                    let response = self.translate(&language, target_language, &text).await?;
                    let assembly = &self.config.assembly;
                    text = response.assemble_target_data(&assembly.delimiter, assembly.placeholders);
                    language = target_language.to_string();
                }
                Stage::PostProcessing => {
                    text = self.post_process(&language, &text).await?.text;
                }
            }
        }
        Ok(text)
    }

    /// Send a close frame on every connection and stop the dispatchers.
    pub async fn close(self) {
        let transports = [
            self.pre_processing.as_ref(),
            Some(&self.translation),
            self.post_processing.as_ref(),
        ];
        for transport in transports.into_iter().flatten() {
            if let Err(e) = transport.close(CLOSE_REASON).await {
                tracing::warn!(error = %e, "failed to send close frame");
            }
        }

        let _ = self.shutdown.send(());
        for handle in self.dispatchers {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "dispatcher task failed");
            }
        }
        tracing::info!("client closed");
    }
}
