use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use unsplash_image_fetcher::{
    events::{PostSaved, SavePostHooks, SavePostListener},
    image::ImageNormalizer,
    media::{FsMediaLibrary, MediaLibrary},
    models::{AttachmentStatus, PostContext, PostId, PostStatus, PostType},
    pipeline::{FeaturedImagePipeline, PipelineServices},
    settings::{MemorySettings, SettingsStore, API_KEY_SETTING},
    unsplash::MockPhotoSearch,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([180, 120, 60]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .unwrap();
    bytes
}

async fn serve_jpeg(server: &MockServer, route: &str, width: u32, height: u32) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(jpeg_bytes(width, height), "image/jpeg"))
        .mount(server)
        .await;
}

/// Wire a full host: hook bus, filesystem media library that re-fires save
/// events, a real normalizer staging under `root`, and the pipeline
/// registered as a save listener.
fn spin_up(
    root: &Path,
    search: MockPhotoSearch,
    api_key: Option<&str>,
) -> (
    Arc<SavePostHooks>,
    Arc<FsMediaLibrary>,
    Arc<FeaturedImagePipeline>,
) {
    let hooks = Arc::new(SavePostHooks::new());
    let media = Arc::new(
        FsMediaLibrary::new(root)
            .unwrap()
            .with_hooks(hooks.clone()),
    );
    let normalizer = ImageNormalizer::new(&root.join("staging")).unwrap();

    let settings = MemorySettings::new();
    if let Some(key) = api_key {
        settings.set(API_KEY_SETTING, key);
    }

    let pipeline = Arc::new(FeaturedImagePipeline::with_services(PipelineServices {
        settings: Arc::new(settings),
        search: Arc::new(search),
        normalizer: Arc::new(normalizer),
        media: media.clone(),
    }));
    hooks.register(pipeline.clone());

    (hooks, media, pipeline)
}

fn staging_is_empty(root: &Path) -> bool {
    match fs::read_dir(root.join("staging")) {
        Ok(entries) => entries.count() == 0,
        Err(_) => true,
    }
}

#[tokio::test]
async fn test_draft_save_attaches_png_featured_image() {
    let server = MockServer::start().await;
    serve_jpeg(&server, "/photos/full.jpg", 37, 23).await;

    let root = tempfile::tempdir().unwrap();
    let search =
        MockPhotoSearch::new().with_candidate(&format!("{}/photos/full.jpg", server.uri()));
    let (hooks, media, pipeline) = spin_up(root.path(), search.clone(), Some("abc123"));

    hooks
        .emit(&PostSaved::primary(PostContext::draft(7, "mountain sunrise")))
        .await;

    // The search saw the title and the key.
    assert_eq!(
        search.calls(),
        vec![("mountain sunrise".to_string(), "abc123".to_string())]
    );

    // One attachment, owned by the post, registered as PNG.
    assert_eq!(media.attachment_count(), 1);
    let record = media.attachments_for(PostId(7))[0].clone();
    assert_eq!(record.meta.mime_type, "image/png");
    assert_eq!(record.meta.description, "");
    assert_eq!(record.meta.status, AttachmentStatus::Inherit);
    assert!(record.meta.title.ends_with(".png"));

    // It is the featured image.
    assert_eq!(media.featured_image(PostId(7)).await, Some(record.id));

    // The promoted file is a decodable PNG with the source dimensions.
    assert!(record.file.starts_with(root.path().join("uploads")));
    let promoted = image::open(&record.file).unwrap();
    assert_eq!((promoted.width(), promoted.height()), (37, 23));

    let metadata = record.metadata.clone().unwrap();
    assert_eq!((metadata.width, metadata.height), (37, 23));
    assert!(!metadata.file.starts_with('/'));

    // The staged copy is gone and the claim is released.
    assert!(staging_is_empty(root.path()));
    assert!(!pipeline.is_fetching(PostId(7)));
}

struct AttachmentSaveCounter {
    seen: AtomicUsize,
}

#[async_trait]
impl SavePostListener for AttachmentSaveCounter {
    async fn on_post_saved(&self, event: &PostSaved) {
        if event.post.post_type == PostType::Attachment {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn test_attachment_insert_refires_save_without_recursing() {
    let server = MockServer::start().await;
    serve_jpeg(&server, "/photos/full.jpg", 8, 8).await;

    let root = tempfile::tempdir().unwrap();
    let search =
        MockPhotoSearch::new().with_candidate(&format!("{}/photos/full.jpg", server.uri()));
    let (hooks, media, _pipeline) = spin_up(root.path(), search.clone(), Some("abc123"));

    let counter = Arc::new(AttachmentSaveCounter {
        seen: AtomicUsize::new(0),
    });
    hooks.register(counter.clone());

    hooks
        .emit(&PostSaved::primary(PostContext::draft(7, "mountain sunrise")))
        .await;

    // Registering the attachment fired one more save event, and that event
    // did not start another fetch.
    assert_eq!(counter.seen.load(Ordering::SeqCst), 1);
    assert_eq!(media.attachment_count(), 1);
    assert_eq!(search.call_count(), 1);
}

#[tokio::test]
async fn test_published_save_is_ignored() {
    let root = tempfile::tempdir().unwrap();
    let search = MockPhotoSearch::new();
    let (hooks, media, _pipeline) = spin_up(root.path(), search.clone(), Some("abc123"));

    let mut post = PostContext::draft(7, "mountain sunrise");
    post.status = PostStatus::Published;
    hooks.emit(&PostSaved::primary(post)).await;

    assert_eq!(search.call_count(), 0);
    assert_eq!(media.attachment_count(), 0);
}

#[tokio::test]
async fn test_missing_api_key_makes_no_search_call() {
    let root = tempfile::tempdir().unwrap();
    let search = MockPhotoSearch::new();
    let (hooks, media, _pipeline) = spin_up(root.path(), search.clone(), None);

    hooks
        .emit(&PostSaved::primary(PostContext::draft(7, "mountain sunrise")))
        .await;

    assert_eq!(search.call_count(), 0);
    assert_eq!(media.attachment_count(), 0);
}

#[tokio::test]
async fn test_search_failure_leaves_post_untouched() {
    let root = tempfile::tempdir().unwrap();
    let search = MockPhotoSearch::new().with_failure(true);
    let (hooks, media, pipeline) = spin_up(root.path(), search.clone(), Some("abc123"));

    hooks
        .emit(&PostSaved::primary(PostContext::draft(7, "mountain sunrise")))
        .await;

    assert_eq!(media.attachment_count(), 0);
    assert_eq!(media.featured_image(PostId(7)).await, None);
    assert!(staging_is_empty(root.path()));
    assert!(!pipeline.is_fetching(PostId(7)));
}

#[tokio::test]
async fn test_non_image_download_aborts_without_attachment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photos/broken.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let search =
        MockPhotoSearch::new().with_candidate(&format!("{}/photos/broken.jpg", server.uri()));
    let (hooks, media, _pipeline) = spin_up(root.path(), search.clone(), Some("abc123"));

    hooks
        .emit(&PostSaved::primary(PostContext::draft(7, "mountain sunrise")))
        .await;

    assert_eq!(media.attachment_count(), 0);
    assert_eq!(media.featured_image(PostId(7)).await, None);
    assert!(staging_is_empty(root.path()));
}

#[tokio::test]
async fn test_second_save_with_featured_image_attaches_nothing() {
    let server = MockServer::start().await;
    serve_jpeg(&server, "/photos/full.jpg", 8, 8).await;

    let root = tempfile::tempdir().unwrap();
    let search =
        MockPhotoSearch::new().with_candidate(&format!("{}/photos/full.jpg", server.uri()));
    let (hooks, media, _pipeline) = spin_up(root.path(), search.clone(), Some("abc123"));

    hooks
        .emit(&PostSaved::primary(PostContext::draft(7, "mountain sunrise")))
        .await;
    assert_eq!(media.attachment_count(), 1);

    // The host reports the image on the next save of the same post; the
    // run stops before another search.
    let mut post = PostContext::draft(7, "mountain sunrise");
    post.has_featured_image = true;
    hooks.emit(&PostSaved::primary(post)).await;

    assert_eq!(media.attachment_count(), 1);
    assert_eq!(search.call_count(), 1);
}

#[tokio::test]
async fn test_library_persists_across_reopen() {
    let server = MockServer::start().await;
    serve_jpeg(&server, "/photos/full.jpg", 8, 8).await;

    let root = tempfile::tempdir().unwrap();
    {
        let search =
            MockPhotoSearch::new().with_candidate(&format!("{}/photos/full.jpg", server.uri()));
        let (hooks, media, _pipeline) = spin_up(root.path(), search, Some("abc123"));
        hooks
            .emit(&PostSaved::primary(PostContext::draft(7, "mountain sunrise")))
            .await;
        assert_eq!(media.attachment_count(), 1);
    }

    let reopened = FsMediaLibrary::new(root.path()).unwrap();
    assert_eq!(reopened.attachment_count(), 1);
    assert!(reopened.featured_image(PostId(7)).await.is_some());
}
