use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alt_text_batch::*;

/// Stand-in for the hosted model: names the image by its size and type.
#[derive(Default)]
struct SizeCaptioner {
    calls: AtomicUsize,
}

impl Captioner for SizeCaptioner {
    async fn caption(&self, image: &EncodedImage) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        // Simulate the API round trip
        tokio::time::sleep(Duration::from_millis(100)).await;
        if image.data.is_empty() {
            return Err(AltTextError::EmptyCompletion);
        }
        Ok(format!(
            "Image {} ({}, {} base64 chars)",
            n,
            image.mime_type,
            image.data.len()
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let fetcher = HttpFetcher::new(reqwest::Client::new(), Duration::from_secs(10));
    let orch = Orchestrator::new(SizeCaptioner::default(), fetcher);

    let mut events = orch.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("event: {:?}", event);
        }
    });

    let ids = orch.add_files(vec![
        FileUpload::new("cat.jpg", "image/jpeg", b"cat pixels".to_vec()),
        FileUpload::new("notes.txt", "text/plain", b"skipped".to_vec()),
        FileUpload::new("dog.png", "image/png", b"dog pixels".to_vec()),
    ])?;
    println!("Added {} images", ids.len());

    let summary = orch.process_batch().await?;
    println!(
        "Batch done: {} captioned, {} failed, {} skipped in {}ms",
        summary.succeeded, summary.failed, summary.skipped, summary.duration_ms
    );

    print!("{}", orch.export_csv()?);

    // With a real API key:
    // let orch = Orchestrator::from_config(AltTextConfig::default().with_env())?;
    Ok(())
}
