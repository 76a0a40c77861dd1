use std::time::Duration;

use crate::*;

use remedi_client::{ClientError, Stage, TransportError};

#[tokio::test(start_paused = true)]
async fn send_failure_is_surfaced_immediately() -> Result<()> {
    init_tracing();
    let connector = ChannelConnector::new();
    let server = connector.register(MT);
    let client = RemediClient::connect(&config(false, false), &connector).await?;
    drop(server);

    let start = tokio::time::Instant::now();
    let err = client.translate_text("en", "nl", "Nobody home.").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Send {
            stage: Stage::Translation,
            source: TransportError::Closed
        }
    ));
    assert_eq!(start.elapsed(), Duration::ZERO, "no polling after a failed send");

    client.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_ends_the_wait() -> Result<()> {
    let mut config = config(false, false);
    config.polling.timeout_ms = 30_000;
    let fixture = connect(config, None, Box::new(silent), None).await?;

    let start = tokio::time::Instant::now();
    let err = fixture.client.translate("en", "nl", "Lost.").await.unwrap_err();
    match err {
        ClientError::Timeout { stage, waited } => {
            assert_eq!(stage, Stage::Translation);
            assert_eq!(waited, Duration::from_secs(30));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(start.elapsed(), Duration::from_secs(30));

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn without_timeout_a_lost_job_waits_until_cancelled() -> Result<()> {
    let fixture = translate_only(Box::new(silent)).await?;

    let wait = tokio::time::timeout(
        Duration::from_secs(24 * 60 * 60),
        fixture.client.translate("en", "nl", "Lost."),
    )
    .await;
    assert!(wait.is_err(), "the client must still be waiting");

    fixture.finish().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn late_response_after_cancel_stays_unclaimed() -> Result<()> {
    // Answers only the second job, then replays the answer to the first.
    let mut seen: Vec<TranslationRequest> = Vec::new();
    let mt: Handler = Box::new(move |message| {
        let Message::TranslationRequest(request) = message else {
            return Vec::new();
        };
        seen.push(request);
        if seen.len() < 2 {
            return Vec::new();
        }
        seen.iter().rev().map(|r| translate_each(r, identity)).collect()
    });
    let fixture = translate_only(mt).await?;

    let abandoned = tokio::time::timeout(
        Duration::from_secs(1),
        fixture.client.translate_text("en", "nl", "Abandoned."),
    )
    .await;
    assert!(abandoned.is_err());

    let text = fixture.client.translate_text("en", "nl", "Kept.").await?;
    assert_eq!(text, "Kept.");

    // Let the dispatcher finish storing the replayed response.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fixture.client.unclaimed_responses(), 1);

    fixture.finish().await?;
    Ok(())
}

#[tokio::test]
async fn connect_fails_for_unreachable_endpoint() -> Result<()> {
    init_tracing();
    let connector = ChannelConnector::new();
    let _mt = connector.register(MT);

    let err = RemediClient::connect(&config(false, true), &connector)
        .await
        .err()
        .context("connect should fail without a post-processing server")?;
    assert!(matches!(
        err,
        ClientError::Connect {
            stage: Stage::PostProcessing,
            source: TransportError::Connect { .. }
        }
    ));
    Ok(())
}
