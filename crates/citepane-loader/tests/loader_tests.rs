//! Chunk streaming against a scripted backend.

use citepane_cache::DocumentCacheService;
use citepane_client::DocumentApi;
use citepane_document::{DocumentId, SessionId, SheetName};
use citepane_loader::{ChunkedFormattingLoader, LoaderConfig};
use citepane_test_utils::{
    sample_spreadsheet, sample_workbook, FailureMode, FakeDocumentApi,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (
    Arc<DocumentCacheService>,
    Arc<FakeDocumentApi>,
    Arc<ChunkedFormattingLoader>,
) {
    let cache = Arc::new(DocumentCacheService::new());
    cache.set_session(SessionId::new("s1"));
    let api = FakeDocumentApi::shared();
    let loader = Arc::new(ChunkedFormattingLoader::new(
        Arc::clone(&cache),
        Arc::clone(&api) as Arc<dyn DocumentApi>,
        LoaderConfig::default(),
    ));
    (cache, api, loader)
}

/// Simulate the explicit open path: fetch with formatting and cache the
/// payload, as the panel does before the stream starts.
async fn open_spreadsheet(
    cache: &DocumentCacheService,
    api: &FakeDocumentApi,
    id: &DocumentId,
) {
    let session = cache.current_session().unwrap();
    let document = api.fetch_spreadsheet(&session, id, true).await.unwrap();
    cache.store_spreadsheet(&session, id, document).unwrap();
}

#[tokio::test(start_paused = true)]
async fn small_sheet_never_triggers_the_loop() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_spreadsheet("d1", 100));
    let id = DocumentId::new("d1");
    let sheet = SheetName::new("Sheet1");
    open_spreadsheet(&cache, &api, &id).await;

    assert!(loader.start(&id, &sheet).is_none());
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 0);
    assert!(loader.is_complete(&id, &sheet));
    assert_eq!(loader.chunk_progress(&id, &sheet), Some((1, 1)));
}

#[tokio::test(start_paused = true)]
async fn large_sheet_streams_exactly_the_remaining_chunks() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_spreadsheet("d1", 350));
    let id = DocumentId::new("d1");
    let sheet = SheetName::new("Sheet1");
    open_spreadsheet(&cache, &api, &id).await;

    let handle = loader.start(&id, &sheet).expect("loop should start");
    handle.await.unwrap();

    // Rows 100-200, 200-300 and 300-350: three additional loads.
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 3);
    let document = cache.spreadsheet(&id).unwrap();
    assert_eq!(document.sheets[0].formatting.len(), 350);
    assert!(loader.is_complete(&id, &sheet));
    assert_eq!(loader.chunk_progress(&id, &sheet), Some((4, 4)));

    let last = loader.progress().borrow().clone().unwrap();
    assert!(last.is_complete());
}

#[tokio::test(start_paused = true)]
async fn chunk_failure_skips_to_the_next_chunk() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_spreadsheet("d1", 350));
    api.fail_chunk(DocumentId::new("d1"), 200, FailureMode::Timeout);
    let id = DocumentId::new("d1");
    let sheet = SheetName::new("Sheet1");
    open_spreadsheet(&cache, &api, &id).await;

    let handle = loader.start(&id, &sheet).expect("loop should start");
    handle.await.unwrap();

    // All three chunks were attempted; only the middle one failed.
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 3);
    let document = cache.spreadsheet(&id).unwrap();
    assert_eq!(document.sheets[0].formatting.len(), 250);
    assert!(!loader.is_complete(&id, &sheet));
    assert_eq!(loader.chunk_progress(&id, &sheet), Some((3, 4)));
}

#[tokio::test(start_paused = true)]
async fn slow_chunks_hit_the_deadline_but_do_not_abort_the_stream() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_spreadsheet("d1", 350));
    let id = DocumentId::new("d1");
    let sheet = SheetName::new("Sheet1");
    open_spreadsheet(&cache, &api, &id).await;
    api.set_latency(Duration::from_secs(11));

    let handle = loader.start(&id, &sheet).expect("loop should start");
    handle.await.unwrap();

    // Every chunk timed out, every chunk was still attempted.
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 3);
    let document = cache.spreadsheet(&id).unwrap();
    assert_eq!(document.sheets[0].formatting.len(), 100);
    assert!(!loader.is_complete(&id, &sheet));
}

#[tokio::test(start_paused = true)]
async fn prefetched_sheet_streams_from_row_zero() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_spreadsheet("d1", 50));
    let id = DocumentId::new("d1");
    let sheet = SheetName::new("Sheet1");

    // Prefetch path: cached without any formatting prefix.
    let session = cache.current_session().unwrap();
    let document = api.fetch_spreadsheet(&session, &id, false).await.unwrap();
    cache.store_spreadsheet(&session, &id, document).unwrap();

    let handle = loader.start(&id, &sheet).expect("loop should start");
    handle.await.unwrap();

    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 1);
    let document = cache.spreadsheet(&id).unwrap();
    assert_eq!(document.sheets[0].formatting.len(), 50);
    assert!(loader.is_complete(&id, &sheet));
}

#[tokio::test(start_paused = true)]
async fn sheets_stream_independently_and_complete_sheets_never_rerun() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_workbook("wb", &[("A", 250), ("B", 150)]));
    let id = DocumentId::new("wb");
    let sheet_a = SheetName::new("A");
    let sheet_b = SheetName::new("B");
    // Open attaches the prefix to the active sheet (A) only.
    open_spreadsheet(&cache, &api, &id).await;

    let handle = loader.start(&id, &sheet_a).expect("loop should start");
    handle.await.unwrap();
    assert!(loader.is_complete(&id, &sheet_a));
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 2);

    // Switching sheets starts an independent sequence for B, from row
    // zero since B arrived bare.
    let handle = loader.start(&id, &sheet_b).expect("loop should start");
    handle.await.unwrap();
    assert!(loader.is_complete(&id, &sheet_b));
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 4);

    // Re-activating a fully loaded sheet does not re-trigger.
    assert!(loader.start(&id, &sheet_a).is_none());
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn starting_a_new_stream_supersedes_the_old_one() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_workbook("wb", &[("A", 350), ("B", 150)]));
    let id = DocumentId::new("wb");
    let sheet_a = SheetName::new("A");
    let sheet_b = SheetName::new("B");
    open_spreadsheet(&cache, &api, &id).await;

    // Switch to B before A's loop gets a chance to run.
    let superseded = loader.start(&id, &sheet_a).expect("loop should start");
    let handle = loader.start(&id, &sheet_b).expect("loop should start");
    let _ = superseded.await;
    handle.await.unwrap();

    assert!(loader.is_complete(&id, &sheet_b));
    assert!(!loader.is_complete(&id, &sheet_a));
    // Only B's two chunks went out.
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 2);
    let document = cache.spreadsheet(&id).unwrap();
    assert_eq!(document.sheet(&sheet_a).unwrap().formatting.len(), 100);
}

#[tokio::test(start_paused = true)]
async fn session_change_discards_in_flight_results() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_spreadsheet("d1", 350));
    let id = DocumentId::new("d1");
    let sheet = SheetName::new("Sheet1");
    open_spreadsheet(&cache, &api, &id).await;

    let handle = loader.start(&id, &sheet).expect("loop should start");
    cache.set_session(SessionId::new("s2"));
    handle.await.unwrap();

    // The first chunk's result arrived under a stale session and was
    // discarded; the stream stopped rather than continuing.
    assert!(cache.spreadsheet(&id).is_none());
    assert!(!loader.is_complete(&id, &sheet));
    assert!(api.calls.chunks.load(Ordering::SeqCst) <= 1);
}

#[tokio::test(start_paused = true)]
async fn stop_aborts_the_active_stream() {
    let (cache, api, loader) = setup();
    api.insert_spreadsheet(sample_spreadsheet("d1", 350));
    let id = DocumentId::new("d1");
    let sheet = SheetName::new("Sheet1");
    open_spreadsheet(&cache, &api, &id).await;

    let handle = loader.start(&id, &sheet).expect("loop should start");
    loader.stop();
    let _ = handle.await;

    assert!(!loader.is_complete(&id, &sheet));
    assert_eq!(api.calls.chunks.load(Ordering::SeqCst), 0);
}
