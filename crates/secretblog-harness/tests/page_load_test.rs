//! End-to-end page load scenarios.
//!
//! # Test Strategy
//!
//! Each test publishes a small site with [`SiteBuilder`], opens it through
//! the production [`Runtime`] with a simulated address bar, host and page,
//! then scrolls and checks what the host served and what the page rendered.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - The page only ever receives authenticated plaintext
//! - Shared resources cross the network once
//! - Every decrypted blob is released after rendering

use secretblog_app::{Boot, PageEvent, Runtime};
use secretblog_core::{
    ElementId, ElementState, FailureKind, LoadError, LoaderConfig, Locator, SESSION_KEY_ITEM, Span,
    TileCoord, VisibilityEntry,
};
use secretblog_crypto::{KeyLength, SessionKey};
use secretblog_harness::{
    FailureMode, InvariantRegistry, Rendered, RunSnapshot, SimEnv, SimFetcher, SimPage, Site,
    SiteBuilder,
};
use serde_json::json;

const PANORAMA_XMP: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF><rdf:Description
    GPano:FullPanoWidthPixels="8000" GPano:FullPanoHeightPixels="4000"
    GPano:CroppedAreaImageWidthPixels="8000" GPano:CroppedAreaImageHeightPixels="2000"
    GPano:CroppedAreaLeftPixels="0" GPano:CroppedAreaTopPixels="1000"/>
    </rdf:RDF></x:xmpmeta>"#;

fn zero_key() -> SessionKey {
    SessionKey::from_bytes(&[0u8; 16], KeyLength::Bits128).unwrap()
}

fn other_key() -> SessionKey {
    SessionKey::from_bytes(&[0x5a; 16], KeyLength::Bits128).unwrap()
}

fn locator(path: &str) -> Locator {
    Locator::parse(path).unwrap()
}

fn tile(text: &str) -> TileCoord {
    text.parse().unwrap()
}

async fn boot(site: &Site, env: &mut SimEnv, page: SimPage) -> Boot<SimPage, SimFetcher> {
    Runtime::boot(env, &site.config, site.fetcher.clone(), page, LoaderConfig::default())
        .await
        .unwrap()
}

async fn open(site: &Site, page: SimPage) -> Runtime<SimPage, SimFetcher> {
    let mut env = site.visit();
    match boot(site, &mut env, page).await {
        Boot::Ready(runtime) => runtime,
        other => panic!("page did not open: {other:?}"),
    }
}

fn assert_invariants(runtime: &Runtime<SimPage, SimFetcher>, site: &Site, context: &str) {
    let snapshot = RunSnapshot::capture(runtime, &site.fetcher);
    InvariantRegistry::standard().assert_all(&snapshot, context);
}

#[tokio::test]
async fn padded_fragment_unlocks_content_and_leaves_address() {
    let site = SiteBuilder::new(1, zero_key()).content("<p>Hello</p>").build().unwrap();
    let page = SimPage::new();
    let mut env = SimEnv::with_fragment("#AAAAAAAAAAAAAAAAAAAAAA==");

    let Boot::Ready(runtime) = boot(&site, &mut env, page.clone()).await else {
        panic!("page did not open");
    };

    assert_eq!(page.content().as_deref(), Some("<p>Hello</p>"));
    assert_eq!(env.fragment(), None);
    assert_eq!(env.fragment_clears(), 1);
    assert_eq!(
        env.storage().get(SESSION_KEY_ITEM).map(String::as_str),
        Some("AAAAAAAAAAAAAAAAAAAAAA")
    );
    assert_eq!(runtime.loader().element_count(), 0);
}

#[tokio::test]
async fn missing_key_leaves_page_untouched() {
    let site = SiteBuilder::new(1, zero_key()).content("<p>Hello</p>").build().unwrap();
    let page = SimPage::new();
    let mut env = SimEnv::new();

    let outcome = boot(&site, &mut env, page.clone()).await;

    assert!(matches!(outcome, Boot::NoKey));
    assert_eq!(page.content(), None);
    assert!(site.fetcher.requests().is_empty());
}

#[tokio::test]
async fn malformed_fragment_is_left_in_place() {
    let site = SiteBuilder::new(1, zero_key()).content("<p>Hello</p>").build().unwrap();
    let page = SimPage::new();
    let mut env = SimEnv::with_fragment("!!!");

    let outcome = boot(&site, &mut env, page.clone()).await;

    assert!(matches!(outcome, Boot::NoKey));
    assert_eq!(env.fragment(), Some("!!!"));
    assert!(env.storage().is_empty());
    assert_eq!(page.content(), None);
}

#[tokio::test]
async fn wrong_key_fails_closed() {
    let site = SiteBuilder::new(1, zero_key()).content("<p>Hello</p>").build().unwrap();
    let page = SimPage::new();
    let mut env = SimEnv::with_fragment(other_key().encode());

    let outcome = boot(&site, &mut env, page.clone()).await;

    let err = match outcome {
        Boot::Failed(err) => err,
        other => panic!("expected failure, got {other:?}"),
    };
    assert!(matches!(err, LoadError::Decryption { .. }));
    assert_eq!(err.kind(), FailureKind::Decryption);
    assert_eq!(page.content(), None);
}

#[tokio::test]
async fn missing_body_fails_as_network() {
    let site = SiteBuilder::new(1, zero_key()).build().unwrap();
    let page = SimPage::new();
    let mut env = site.visit();

    let Boot::Failed(err) = boot(&site, &mut env, page.clone()).await else {
        panic!("expected failure");
    };
    assert_eq!(err.kind(), FailureKind::Network);
    assert_eq!(page.content(), None);
}

#[tokio::test]
async fn stored_key_opens_later_pages() {
    let site = SiteBuilder::new(1, zero_key()).content("<p>Again</p>").build().unwrap();
    let page = SimPage::new();
    let mut env = site.revisit();

    assert!(matches!(boot(&site, &mut env, page.clone()).await, Boot::Ready(_)));
    assert_eq!(page.content().as_deref(), Some("<p>Again</p>"));
    assert_eq!(env.fragment_clears(), 0);
}

#[tokio::test]
async fn navigating_within_session_keeps_key() {
    let site = SiteBuilder::new(1, zero_key()).content("<p>Hi</p>").build().unwrap();
    let mut env = site.visit();

    assert!(matches!(boot(&site, &mut env, SimPage::new()).await, Boot::Ready(_)));
    env.navigate(None);
    let page = SimPage::new();
    assert!(matches!(boot(&site, &mut env, page.clone()).await, Boot::Ready(_)));
    assert_eq!(page.content().as_deref(), Some("<p>Hi</p>"));
}

#[tokio::test]
async fn derived_content_key_site_opens() {
    let key = SessionKey::from_bytes(&[0x11; 32], KeyLength::Bits256).unwrap();
    let site = SiteBuilder::derived(3, key)
        .content(r#"<img data-src="a.jpg">"#)
        .media("a.jpg", b"jpeg".to_vec())
        .build()
        .unwrap();
    let page = SimPage::new();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0]);
    runtime.run().await.unwrap();

    assert!(matches!(
        page.rendered_into(ElementId(0)).as_slice(),
        [Rendered::Image { bytes, .. }] if bytes.as_ref() == b"jpeg"
    ));
    assert_invariants(&runtime, &site, "derived site");
}

#[tokio::test]
async fn rejected_content_propagates() {
    let site = SiteBuilder::new(1, zero_key()).content("<p>Hello</p>").build().unwrap();
    let mut env = site.visit();

    let result = Runtime::boot(
        &mut env,
        &site.config,
        site.fetcher.clone(),
        SimPage::new().rejecting_content(),
        LoaderConfig::default(),
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn shared_image_fetched_once_and_shown_everywhere() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<img data-src="a.jpg"><p>text</p><img data-src="a.jpg">"#)
        .media("a.jpg", b"shared".to_vec())
        .build()
        .unwrap();
    let page = SimPage::new();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0]);
    runtime.run().await.unwrap();

    assert_eq!(site.fetcher.request_count(&locator("a.jpg")), 1);
    for element in [ElementId(0), ElementId(1)] {
        assert_eq!(runtime.loader().state(element), Some(ElementState::Loaded));
        assert!(matches!(
            page.rendered_into(element).as_slice(),
            [Rendered::Image { bytes, .. }] if bytes.as_ref() == b"shared"
        ));
    }
    assert_eq!(runtime.blobs().live_count(), 0);
    assert_invariants(&runtime, &site, "shared image");
}

#[tokio::test]
async fn repeated_visibility_never_refetches() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<img data-src="a.jpg">"#)
        .media("a.jpg", b"once".to_vec())
        .build()
        .unwrap();
    let page = SimPage::new();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0]);
    page.scroll_to([0]);
    runtime.run().await.unwrap();
    page.scroll_to([0]);
    runtime.run().await.unwrap();

    assert_eq!(site.fetcher.request_count(&locator("a.jpg")), 1);
    assert_eq!(page.rendered_into(ElementId(0)).len(), 1);
}

#[tokio::test]
async fn elements_outside_margin_stay_pending() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<img data-src="a.jpg"><img data-src="b.jpg">"#)
        .media("a.jpg", b"a".to_vec())
        .media("b.jpg", b"b".to_vec())
        .build()
        .unwrap();
    let page = SimPage::new();
    let mut runtime = open(&site, page.clone()).await;

    page.push_event(PageEvent::Viewport {
        viewport: Span::new(0, 800),
        entries: vec![
            VisibilityEntry {
                element: ElementId(0),
                bounds: Span::new(845, 100),
            },
            VisibilityEntry {
                element: ElementId(1),
                bounds: Span::new(900, 100),
            },
        ],
    });
    runtime.run().await.unwrap();

    assert_eq!(runtime.loader().state(ElementId(0)), Some(ElementState::Loaded));
    assert_eq!(runtime.loader().state(ElementId(1)), Some(ElementState::Pending));
    assert_eq!(site.fetcher.request_count(&locator("b.jpg")), 0);
}

#[tokio::test]
async fn blob_released_only_after_display() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<img data-src="a.jpg">"#)
        .media("a.jpg", b"a".to_vec())
        .build()
        .unwrap();
    let page = SimPage::manual();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0]);
    runtime.run().await.unwrap();
    assert_eq!(runtime.blobs().live_count(), 1);
    assert_eq!(runtime.loader().unreleased_blobs(), 1);

    page.push_event(PageEvent::DisplayReady { element: ElementId(0) });
    runtime.run().await.unwrap();
    assert_eq!(runtime.blobs().live_count(), 0);
    assert_eq!(runtime.loader().unreleased_blobs(), 0);
}

#[tokio::test]
async fn one_panorama_per_batch_with_crop() {
    let mut jpeg = b"\xff\xd8\xff\xe1".to_vec();
    jpeg.extend_from_slice(PANORAMA_XMP.as_bytes());
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<div data-panorama="a.jpg"></div><div data-panorama="b.jpg"></div>"#)
        .media("a.jpg", jpeg.clone())
        .media("b.jpg", b"plain".to_vec())
        .build()
        .unwrap();
    let page = SimPage::new();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0, 1]);
    runtime.run().await.unwrap();

    assert_eq!(site.fetcher.request_count(&locator("b.jpg")), 0);
    assert_eq!(runtime.loader().state(ElementId(1)), Some(ElementState::Pending));
    let rendered = page.rendered_into(ElementId(0));
    let [Rendered::Panorama { crop: Some(crop), bytes, .. }] = rendered.as_slice() else {
        panic!("panorama not shown with crop");
    };
    assert_eq!(bytes.as_ref(), jpeg.as_slice());
    assert_eq!((crop.full_width, crop.cropped_height, crop.cropped_top), (8000, 2000, 1000));

    page.scroll_to([0, 1]);
    runtime.run().await.unwrap();

    assert!(matches!(
        page.rendered_into(ElementId(1)).as_slice(),
        [Rendered::Panorama { crop: None, .. }]
    ));
    assert_invariants(&runtime, &site, "panoramas");
}

#[tokio::test]
async fn map_fetches_declared_tiles_only() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<div data-map="walk.json"></div>"#)
        .map(
            "walk.json",
            json!({ "type": "FeatureCollection", "features": [] }),
            [(tile("5_3_7"), b"png".to_vec())],
        )
        .build()
        .unwrap();
    let page = SimPage::new().with_auto_tiles();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0]);
    runtime.run().await.unwrap();
    page.push_event(PageEvent::TileRequested { element: ElementId(0), tile: tile("5_3_8") });
    runtime.run().await.unwrap();

    let declared = locator("tiles/tlflm4gojts3tmycsux233dhy5vhyp6lo7uk3axqyxzkgj47g5oa");
    let undeclared = locator("tiles/ez272emi6j36koecwdfjibiodhqnlwpyucwpibvur3a5b2jimouq");
    assert_eq!(site.fetcher.request_count(&declared), 1);
    assert_eq!(site.fetcher.request_count(&undeclared), 0);

    let rendered = page.rendered_into(ElementId(0));
    assert!(matches!(rendered.first(), Some(Rendered::Map { .. })));
    assert!(rendered.iter().any(|r| matches!(
        r,
        Rendered::Tile { tile: t, bytes, .. } if *t == tile("5_3_7") && bytes.as_ref() == b"png"
    )));
    assert_eq!(runtime.blobs().live_count(), 0);
    assert_invariants(&runtime, &site, "map");
}

#[tokio::test]
async fn evicted_tile_is_fetched_again() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<div data-map="walk.json"></div>"#)
        .map(
            "walk.json",
            json!({ "type": "FeatureCollection", "features": [] }),
            [(tile("5_3_7"), b"png".to_vec())],
        )
        .build()
        .unwrap();
    let page = SimPage::new().with_auto_tiles();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0]);
    runtime.run().await.unwrap();
    page.push_event(PageEvent::TileRequested { element: ElementId(0), tile: tile("5_3_7") });
    runtime.run().await.unwrap();

    let declared = locator("tiles/tlflm4gojts3tmycsux233dhy5vhyp6lo7uk3axqyxzkgj47g5oa");
    assert_eq!(site.fetcher.request_count(&declared), 2);
    let shown = page
        .rendered_into(ElementId(0))
        .into_iter()
        .filter(|r| matches!(r, Rendered::Tile { mime, .. } if mime == "image/png"))
        .count();
    assert_eq!(shown, 2);
    assert_eq!(runtime.blobs().live_count(), 0);
    assert_invariants(&runtime, &site, "tile re-request");
}

#[tokio::test]
async fn extensionless_media_renders_as_jpeg() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<img data-src="mfrggzdfmztwq2lk"><div data-panorama="nbswy3dpeb3w64tm"></div>"#)
        .media("mfrggzdfmztwq2lk", b"jpeg".to_vec())
        .media("nbswy3dpeb3w64tm", b"pano".to_vec())
        .build()
        .unwrap();
    let page = SimPage::new();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0]);
    runtime.run().await.unwrap();
    page.scroll_to([1]);
    runtime.run().await.unwrap();

    assert!(matches!(
        page.rendered_into(ElementId(0)).as_slice(),
        [Rendered::Image { mime, .. }] if mime == "image/jpeg"
    ));
    assert!(matches!(
        page.rendered_into(ElementId(1)).as_slice(),
        [Rendered::Panorama { mime, .. }] if mime == "image/jpeg"
    ));
    assert_invariants(&runtime, &site, "extensionless media");
}

#[tokio::test]
async fn failures_are_isolated_per_resource() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<img data-src="gone.jpg"><img data-src="bad.jpg"><img data-src="ok.jpg">"#)
        .media("bad.jpg", b"bad".to_vec())
        .media("ok.jpg", b"ok".to_vec())
        .build()
        .unwrap();
    site.fetcher.fail(locator("bad.jpg"), FailureMode::Corrupt);
    let page = SimPage::new();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0, 1, 2]);
    runtime.run().await.unwrap();

    assert_eq!(runtime.loader().state(ElementId(0)), Some(ElementState::Failed));
    assert_eq!(runtime.loader().state(ElementId(1)), Some(ElementState::Failed));
    assert_eq!(runtime.loader().state(ElementId(2)), Some(ElementState::Loaded));
    assert!(page.rendered_into(ElementId(0)).is_empty());
    assert!(page.rendered_into(ElementId(1)).is_empty());

    page.scroll_to([0, 1]);
    runtime.run().await.unwrap();
    assert_eq!(site.fetcher.request_count(&locator("gone.jpg")), 1);
    assert_eq!(site.fetcher.request_count(&locator("bad.jpg")), 1);
    assert_invariants(&runtime, &site, "failures");
}

#[tokio::test]
async fn unreadable_map_index_fails_element() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<div data-map="walk.json"></div>"#)
        .media("walk.json", b"not json".to_vec())
        .build()
        .unwrap();
    let page = SimPage::new().with_auto_tiles();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0]);
    runtime.run().await.unwrap();

    assert_eq!(runtime.loader().state(ElementId(0)), Some(ElementState::Failed));
    assert!(page.rendered().is_empty());
}

#[tokio::test]
async fn request_transcript() {
    let site = SiteBuilder::new(1, zero_key())
        .content(r#"<img data-src="photo.jpg"><div data-map="walk.json"></div>"#)
        .media("photo.jpg", b"jpeg".to_vec())
        .map("walk.json", json!([]), [(tile("5_3_7"), b"png".to_vec())])
        .build()
        .unwrap();
    let page = SimPage::new().with_auto_tiles();
    let mut runtime = open(&site, page.clone()).await;

    page.scroll_to([0, 1]);
    runtime.run().await.unwrap();

    let snapshot = RunSnapshot::capture(&runtime, &site.fetcher);
    let summary: Vec<_> =
        snapshot.requests.iter().map(|(locator, count)| format!("{locator} {count}")).collect();
    insta::assert_snapshot!(summary.join("\n"), @r"
    content 1
    photo.jpg 1
    tiles/tlflm4gojts3tmycsux233dhy5vhyp6lo7uk3axqyxzkgj47g5oa 1
    walk.json 1
    ");
}
