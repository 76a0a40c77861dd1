use crate::*;

use remedi_client::{ClientError, Stage};
use remedi_core::INCOMPLETE_PLACEHOLDER;

fn to_dutch(sentence: &str) -> String {
    match sentence {
        "Hello, World." => "Waar".to_string(),
        "How are you?" => "ben je?".to_string(),
        other => format!("[{other}]"),
    }
}

#[tokio::test(start_paused = true)]
async fn translate_only_joins_sentences() -> Result<()> {
    let fixture = translate_only(translator(to_dutch)).await?;

    let text = fixture
        .client
        .translate_text("en", "nl", "Hello, World. How are you?")
        .await?;
    assert_eq!(text, "Waar ben je?");

    let transcript = fixture.finish().await?;
    let sent = requests(&transcript.mt);
    assert_eq!(sent.len(), 1, "whole text goes out as one job");
    let Message::TranslationRequest(request) = &sent[0] else {
        panic!("expected a translation request, got {:?}", sent[0]);
    };
    assert_eq!(request.source_language, "en");
    assert_eq!(request.target_language, "nl");
    assert_eq!(request.source_sentences, vec!["Hello, World.", "How are you?"]);
    assert!(request.job_id > 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn error_entry_becomes_incomplete_placeholder() -> Result<()> {
    let mt: Handler = Box::new(|message| match message {
        Message::TranslationRequest(request) => {
            let response = translation_response(
                request.job_id,
                vec![
                    TargetData::ok("Een."),
                    TargetData::ok("Twee."),
                    TargetData::failed(StatusCode::Error, "model crashed"),
                    TargetData::ok("Vier."),
                ],
            );
            vec![frame(Message::TranslationResponse(response))]
        }
        _ => Vec::new(),
    });
    let fixture = translate_only(mt).await?;

    let text = fixture
        .client
        .translate_text("en", "nl", "One. Two. Three. Four.")
        .await?;
    assert_eq!(text, format!("Een. Twee. {INCOMPLETE_PLACEHOLDER} Vier."));

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn placeholders_can_be_disabled() -> Result<()> {
    let mt: Handler = Box::new(|message| match message {
        Message::TranslationRequest(request) => {
            let response = translation_response(
                request.job_id,
                vec![
                    TargetData::ok("Een."),
                    TargetData::failed(StatusCode::Canceled, "dropped"),
                    TargetData::ok("Drie."),
                ],
            );
            vec![frame(Message::TranslationResponse(response))]
        }
        _ => Vec::new(),
    });
    let mut config = config(false, false);
    config.assembly.placeholders = false;
    config.assembly.delimiter = "|".into();
    let fixture = connect(config, None, mt, None).await?;

    let text = fixture.client.translate_text("en", "nl", "One. Two. Three.").await?;
    assert_eq!(text, "Een.|Drie.");

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_job_status_is_reported() -> Result<()> {
    let mt: Handler = Box::new(|message| match message {
        Message::TranslationRequest(request) => {
            let response = TranslationResponse {
                status: StatusCode::Error,
                status_message: Some("unsupported pair".into()),
                ..translation_response(request.job_id, Vec::new())
            };
            vec![frame(Message::TranslationResponse(response))]
        }
        _ => Vec::new(),
    });
    let fixture = translate_only(mt).await?;

    let err = fixture
        .client
        .translate_text("en", "xx", "Hello.")
        .await
        .unwrap_err();
    match err {
        ClientError::StageFailed {
            stage: Stage::Translation,
            status: StatusCode::Error,
            message,
        } => assert_eq!(message.as_deref(), Some("unsupported pair")),
        other => panic!("unexpected error: {other}"),
    }

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn request_defaults_come_from_config() -> Result<()> {
    let mut config = config(false, false);
    config.requests.priority = 7;
    config.requests.translation_info = true;
    let fixture = connect(config, None, translator(identity), None).await?;

    fixture.client.translate("en", "de", "Good morning.").await?;

    let transcript = fixture.finish().await?;
    let sent_mt = requests(&transcript.mt);
    let Message::TranslationRequest(request) = &sent_mt[0] else {
        panic!("expected a translation request");
    };
    assert_eq!(request.priority, 7);
    assert!(request.translation_info);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn concurrent_jobs_resolve_out_of_order() -> Result<()> {
    // Hold every request until three are in, then answer newest first.
    let mut held: Vec<TranslationRequest> = Vec::new();
    let mt: Handler = Box::new(move |message| {
        if let Message::TranslationRequest(request) = message {
            held.push(request);
        }
        if held.len() < 3 {
            return Vec::new();
        }
        held.drain(..)
            .rev()
            .map(|request| translate_each(&request, |s| s.to_uppercase()))
            .collect()
    });
    let fixture = translate_only(mt).await?;
    let client = &fixture.client;

    let (a, b, c) = tokio::join!(
        client.translate_text("en", "fr", "first."),
        client.translate_text("en", "fr", "second."),
        client.translate_text("en", "fr", "third."),
    );
    assert_eq!(a?, "FIRST.");
    assert_eq!(b?, "SECOND.");
    assert_eq!(c?, "THIRD.");
    assert_eq!(client.unclaimed_responses(), 0);

    let transcript = fixture.finish().await?;
    let mut ids: Vec<u64> = requests(&transcript.mt)
        .iter()
        .filter_map(|message| match message {
            Message::TranslationRequest(request) => Some(request.job_id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3, "every job gets its own id");
    Ok(())
}
