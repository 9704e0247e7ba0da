use std::process::exit;

use cloudflare_images_client::{
    Client, DirectUploadRequest, ListImagesRequest, Result, SortOrder, UpdateImageRequest,
};
use serde_json::{json, Map};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Expects CLOUDFLARE_ACCOUNT_ID plus either CLOUDFLARE_API_TOKEN or
    // CLOUDFLARE_API_KEY and CLOUDFLARE_EMAIL
    let client = match Client::from_env() {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            exit(1);
        }
    };

    // Walk the first few pages of the library
    let mut request = ListImagesRequest {
        per_page: Some(100),
        sort_order: Some(SortOrder::Asc),
        ..Default::default()
    };
    for _ in 0..3 {
        let page = client.list_images(request.clone()).await?;
        for image in &page.images {
            println!(
                "- {} {:?} signed={}",
                image.id, image.filename, image.require_signed_urls
            );
        }
        match page.next_page() {
            Some(token) => request.continuation_token = Some(token.to_string()),
            None => break,
        }
    }

    // Issue a one-time upload URL
    let mut metadata = Map::new();
    metadata.insert("source".to_string(), json!("basic_usage"));
    let upload = client
        .create_direct_upload_url(DirectUploadRequest {
            metadata: Some(metadata),
            ..Default::default()
        })
        .await?;
    println!("\nUpload one image to {} (id {})", upload.upload_url, upload.id);

    // Mark it as private; the API issues a new id on this change
    if let Some(id) = std::env::args().nth(1) {
        let image = client
            .update_image(UpdateImageRequest {
                require_signed_urls: Some(true),
                ..UpdateImageRequest::new(id)
            })
            .await?;
        println!("Image {} now requires signed URLs", image.id);
    }

    Ok(())
}
