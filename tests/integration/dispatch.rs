use crate::*;

/// Answer every translation request with the given raw frames before
/// the real response.
fn noisy_translator(noise: fn(u64) -> Vec<String>) -> Handler {
    Box::new(move |message| match message {
        Message::TranslationRequest(request) => {
            let mut frames = noise(request.job_id);
            frames.push(translate_each(&request, uppercase));
            frames
        }
        _ => Vec::new(),
    })
}

#[tokio::test(start_paused = true)]
async fn unknown_kind_does_not_block_later_frames() -> Result<()> {
    let fixture = translate_only(noisy_translator(|_| {
        vec![r#"{"prot_ver":0,"msg_type":42,"job_id":1}"#.to_string()]
    }))
    .await?;

    let text = fixture.client.translate_text("en", "de", "Still here.").await?;
    assert_eq!(text, "STILL HERE.");
    assert_eq!(fixture.client.unclaimed_responses(), 0);

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_dropped() -> Result<()> {
    let fixture = translate_only(noisy_translator(|job_id| {
        vec![
            "{ definitely not json".to_string(),
            r#"{"prot_ver":0}"#.to_string(),
            r#"{"prot_ver":0,"msg_type":0}"#.to_string(),
            format!(r#"{{"prot_ver":0,"msg_type":4,"job_id":"{job_id}"}}"#),
            format!(r#"{{"prot_ver":3,"msg_type":4,"job_id":{job_id},"stat_code":2,"target_data":[]}}"#),
        ]
    }))
    .await?;

    let text = fixture.client.translate_text("en", "de", "Survived.").await?;
    assert_eq!(text, "SURVIVED.");

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stray_requests_from_server_are_ignored() -> Result<()> {
    let fixture = translate_only(noisy_translator(|_| {
        vec![
            frame(Message::LanguageRequest(Default::default())),
            frame(Message::PreRequest(ProcessorRequest::new("en", "odd"))),
        ]
    }))
    .await?;

    let text = fixture.client.translate_text("en", "de", "Fine.").await?;
    assert_eq!(text, "FINE.");
    assert_eq!(fixture.client.unclaimed_responses(), 0);

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn later_response_for_same_job_wins() -> Result<()> {
    let mt: Handler = Box::new(|message| match message {
        Message::TranslationRequest(request) => vec![
            translate_each(&request, |_| "stale".to_string()),
            translate_each(&request, |_| "fresh".to_string()),
        ],
        _ => Vec::new(),
    });
    let fixture = translate_only(mt).await?;

    let text = fixture.client.translate_text("en", "de", "Which one?").await?;
    assert_eq!(text, "fresh");

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn response_for_unknown_job_waits_unclaimed() -> Result<()> {
    let mt: Handler = Box::new(|message| match message {
        Message::TranslationRequest(request) => vec![
            frame(Message::TranslationResponse(translation_response(
                request.job_id + 1000,
                vec![TargetData::ok("orphan")],
            ))),
            translate_each(&request, identity),
        ],
        _ => Vec::new(),
    });
    let fixture = translate_only(mt).await?;

    let text = fixture.client.translate_text("en", "de", "Mine.").await?;
    assert_eq!(text, "Mine.");
    assert_eq!(fixture.client.unclaimed_responses(), 1);

    fixture.finish().await?;
    Ok(())
}
