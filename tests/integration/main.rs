//! REMEDI client integration test harness.
//!
//! Every test runs the real client against scripted in-process servers
//! connected through `ChannelConnector`. A server is a closure from one
//! decoded request to the raw frames it answers with, so tests can send
//! malformed, duplicated or reordered responses.
//!
//!   cargo test --test integration
//!
//! Set RUST_LOG=remedi_client=debug to see the client's logs.

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use remedi_client::{ChannelConnector, ChannelServer, RemediClient, ServerEvent};
use remedi_core::wire;
use remedi_core::{
    ClientConfig, Message, ProcessorRequest, ProcessorResponse, StatusCode, TargetData,
    TranslationRequest, TranslationResponse,
};

mod dispatch;
mod failures;
mod translation;

// ── Harness ───────────────────────────────────────────────────────────────────

pub const PRE: &str = "mem://pre";
pub const MT: &str = "mem://mt";
pub const POST: &str = "mem://post";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config pointing at the in-process endpoints.
pub fn config(pre: bool, post: bool) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.endpoints.translation = MT.to_string();
    config.endpoints.pre_processing = pre.then(|| PRE.to_string());
    config.endpoints.post_processing = post.then(|| POST.to_string());
    config
}

/// Play the server end of a connection until the client closes it.
/// Resolves to every event the server saw, in order.
pub fn serve<F>(mut server: ChannelServer, mut handler: F) -> JoinHandle<Vec<ServerEvent>>
where
    F: FnMut(Message) -> Vec<String> + Send + 'static,
{
    tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = server.recv().await {
            seen.push(event.clone());
            match event {
                ServerEvent::Text(raw) => {
                    let request = wire::decode(&raw).expect("client sent an undecodable frame");
                    for reply in handler(request) {
                        if server.respond(reply).await.is_err() {
                            break;
                        }
                    }
                }
                ServerEvent::Close(_) => break,
            }
        }
        seen
    })
}

/// Server that never answers.
pub fn silent(_: Message) -> Vec<String> {
    Vec::new()
}

/// A client and the servers behind it.
pub struct Fixture {
    pub client: RemediClient,
    pub pre: Option<JoinHandle<Vec<ServerEvent>>>,
    pub mt: JoinHandle<Vec<ServerEvent>>,
    pub post: Option<JoinHandle<Vec<ServerEvent>>>,
}

pub type Handler = Box<dyn FnMut(Message) -> Vec<String> + Send>;

pub async fn connect(
    config: ClientConfig,
    pre: Option<Handler>,
    mt: Handler,
    post: Option<Handler>,
) -> Result<Fixture> {
    init_tracing();
    let connector = ChannelConnector::new();
    let pre = pre.map(|handler| serve(connector.register(PRE), handler));
    let mt = serve(connector.register(MT), mt);
    let post = post.map(|handler| serve(connector.register(POST), handler));

    let client = RemediClient::connect(&config, &connector)
        .await
        .context("client failed to connect")?;
    Ok(Fixture { client, pre, mt, post })
}

/// Translation-only fixture with default config.
pub async fn translate_only(mt: Handler) -> Result<Fixture> {
    connect(config(false, false), None, mt, None).await
}

pub struct Transcript {
    pub pre: Vec<ServerEvent>,
    pub mt: Vec<ServerEvent>,
    pub post: Vec<ServerEvent>,
}

impl Fixture {
    /// Close the client and collect what every server saw.
    pub async fn finish(self) -> Result<Transcript> {
        self.client.close().await;
        let pre = match self.pre {
            Some(handle) => handle.await?,
            None => Vec::new(),
        };
        let post = match self.post {
            Some(handle) => handle.await?,
            None => Vec::new(),
        };
        Ok(Transcript {
            pre,
            mt: self.mt.await?,
            post,
        })
    }
}

/// Requests the server decoded, skipping close events.
pub fn requests(events: &[ServerEvent]) -> Vec<Message> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::Text(raw) => wire::decode(raw).ok(),
            ServerEvent::Close(_) => None,
        })
        .collect()
}

// ── Canned responses ──────────────────────────────────────────────────────────

pub fn frame(message: Message) -> String {
    wire::encode(&message).expect("test message must encode")
}

pub fn translation_response(job_id: u64, target_data: Vec<TargetData>) -> TranslationResponse {
    TranslationResponse {
        job_id,
        status: StatusCode::Ok,
        status_message: None,
        target_data,
    }
}

/// Ok response translating each sentence with `f`.
pub fn translate_each(request: &TranslationRequest, f: impl Fn(&str) -> String) -> String {
    let target_data = request
        .source_sentences
        .iter()
        .map(|sentence| TargetData::ok(&f(sentence)))
        .collect();
    frame(Message::TranslationResponse(translation_response(
        request.job_id,
        target_data,
    )))
}

/// Translation server mapping each sentence with `f`.
pub fn translator(f: fn(&str) -> String) -> Handler {
    Box::new(move |message| match message {
        Message::TranslationRequest(request) => vec![translate_each(&request, f)],
        _ => Vec::new(),
    })
}

/// Processor server answering in `language` with `f` applied to the text.
pub fn processor(language: &'static str, f: fn(&str) -> String) -> Handler {
    Box::new(move |message| match message {
        Message::PreRequest(request) => vec![frame(Message::PreResponse(ok_for(
            &request, language, f,
        )))],
        Message::PostRequest(request) => vec![frame(Message::PostResponse(ok_for(
            &request, language, f,
        )))],
        _ => Vec::new(),
    })
}

fn ok_for(request: &ProcessorRequest, language: &str, f: fn(&str) -> String) -> ProcessorResponse {
    let language = if language.is_empty() {
        request.language.as_str()
    } else {
        language
    };
    ProcessorResponse::ok_for(request, language, &f(&request.text))
}

pub fn identity(text: &str) -> String {
    text.to_string()
}

pub fn uppercase(text: &str) -> String {
    text.to_uppercase()
}
