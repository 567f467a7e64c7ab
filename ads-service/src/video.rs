use std::time::Duration;

use adflow_shared::error::Result;
use adflow_shared::fb::AdsGateway;

/// Remote video processing is polled, not pushed: one check per second,
/// bounded, never an infinite loop.
pub const VIDEO_POLL_MAX_CHECKS: u32 = 60;
pub const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Returns whether the uploaded video reached `ready` within the poll
/// budget. A video still processing after the final check reports false;
/// the caller tells the user to retry later.
pub async fn wait_for_video_ready(gateway: &dyn AdsGateway, video_id: &str) -> Result<bool> {
    for check in 1..=VIDEO_POLL_MAX_CHECKS {
        let video = gateway.get_object(video_id, &["status"]).await?;
        let status = video
            .get("status")
            .and_then(|s| s["video_status"].as_str())
            .unwrap_or_default()
            .to_string();

        if status == "ready" {
            tracing::info!("Video {} ready after {} checks", video_id, check);
            return Ok(true);
        }
        if check < VIDEO_POLL_MAX_CHECKS {
            tokio::time::sleep(VIDEO_POLL_INTERVAL).await;
        }
    }

    tracing::info!("Video {} still processing after {} checks", video_id, VIDEO_POLL_MAX_CHECKS);
    Ok(false)
}
