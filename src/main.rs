use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unsplash_image_fetcher::events::{PostSaved, SavePostHooks};
use unsplash_image_fetcher::image::ImageNormalizer;
use unsplash_image_fetcher::media::FsMediaLibrary;
use unsplash_image_fetcher::models::{Config, PostContext, PostId, PostStatus, PostType};
use unsplash_image_fetcher::pipeline::{FeaturedImagePipeline, PipelineServices};
use unsplash_image_fetcher::settings::{MemorySettings, SettingsStore, API_KEY_SETTING};
use unsplash_image_fetcher::unsplash::UnsplashClient;

#[derive(Debug, Parser)]
#[command(name = "unsplash-image-fetcher")]
#[command(about = "Fetch an Unsplash photo for a post title and attach it as the featured image")]
struct CliArgs {
    /// Title of the post being saved.
    #[arg(value_name = "TITLE")]
    title: String,

    /// Identifier of the post being saved.
    #[arg(long, default_value_t = 1)]
    post_id: u64,

    /// Post status at save time.
    #[arg(long, default_value = "draft", value_parser = parse_status_arg)]
    status: PostStatus,

    /// Media library root; overrides MEDIA_ROOT.
    #[arg(long)]
    media_root: Option<PathBuf>,
}

fn parse_status_arg(input: &str) -> std::result::Result<PostStatus, String> {
    match input {
        "draft" => Ok(PostStatus::Draft),
        "publish" | "published" => Ok(PostStatus::Published),
        "pending" | "future" | "private" | "trash" => Ok(PostStatus::Other),
        other => Err(format!(
            "Invalid status '{}'. Expected one of: draft, publish, pending, future, private, trash",
            other
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unsplash_image_fetcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting unsplash-image-fetcher");

    let args = CliArgs::parse();
    let config = Config::from_env();
    let media_root = args.media_root.unwrap_or(config.media_root);

    let settings = MemorySettings::new();
    if let Some(key) = &config.api_key {
        settings.set(API_KEY_SETTING, key);
    }

    let hooks = Arc::new(SavePostHooks::new());
    // One connection pool for both the API call and the download.
    let http_client = reqwest::Client::new();

    let media = FsMediaLibrary::new(&media_root)?.with_hooks(Arc::clone(&hooks));
    let normalizer =
        ImageNormalizer::new_with_client(&media_root.join("staging"), http_client.clone())?;
    let search = UnsplashClient::new_with_client(http_client);

    let pipeline = Arc::new(FeaturedImagePipeline::with_services(PipelineServices {
        settings: Arc::new(settings),
        search: Arc::new(search),
        normalizer: Arc::new(normalizer),
        media: Arc::new(media),
    }));
    hooks.register(pipeline);

    let post = PostContext {
        id: PostId(args.post_id),
        title: args.title,
        status: args.status,
        post_type: PostType::Post,
        has_featured_image: false,
    };

    info!("Saving post {} (\"{}\")", post.id, post.title);
    hooks.emit(&PostSaved::primary(post)).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_arg_valid() {
        assert_eq!(parse_status_arg("draft").unwrap(), PostStatus::Draft);
        assert_eq!(parse_status_arg("publish").unwrap(), PostStatus::Published);
        assert_eq!(parse_status_arg("pending").unwrap(), PostStatus::Other);
    }

    #[test]
    fn test_parse_status_arg_invalid() {
        let err = parse_status_arg("nonsense").unwrap_err();
        assert!(err.contains("Expected one of"));
    }
}
