use super::*;

fn src(s: &str) -> ImageSource {
    ImageSource::new(s).unwrap()
}

fn bitmap(w: u32, h: u32) -> DecodedImage {
    DecodedImage::from_premul_rgba8(w, h, &vec![255u8; (w * h * 4) as usize]).unwrap()
}

#[test]
fn begin_bumps_generation_and_goes_pending() {
    let mut slot = LoadSlot::new();
    assert!(matches!(slot.state(), LoadState::Idle));

    let a = slot.begin(src("a.png"), Instant::now());
    let b = slot.begin(src("b.png"), Instant::now());
    assert_eq!(a.generation(), 1);
    assert_eq!(b.generation(), 2);
    assert!(slot.state().is_pending());
    assert_eq!(slot.active_source(), Some(&src("b.png")));
}

#[test]
fn superseded_completion_is_stale_in_either_order() {
    // A finishes after B.
    let mut slot = LoadSlot::new();
    let a = slot.begin(src("a.png"), Instant::now());
    let b = slot.begin(src("b.png"), Instant::now());
    assert_eq!(slot.complete(b, Ok(bitmap(4, 2))), Completion::Applied);
    assert_eq!(slot.complete(a, Ok(bitmap(8, 8))), Completion::Stale);
    let img = slot.state().decoded().unwrap();
    assert_eq!((img.width(), img.height()), (4, 2));
    assert_eq!(img.generation(), b.generation());

    // A finishes before B: B stays pending, A never shows.
    let mut slot = LoadSlot::new();
    let a = slot.begin(src("a.png"), Instant::now());
    let _b = slot.begin(src("b.png"), Instant::now());
    assert_eq!(slot.complete(a, Ok(bitmap(8, 8))), Completion::Stale);
    assert!(slot.state().is_pending());
}

#[test]
fn failure_is_recorded_for_current_source_only() {
    let mut slot = LoadSlot::new();
    let a = slot.begin(src("a.png"), Instant::now());
    assert_eq!(
        slot.complete(a, Err(TimberlensError::decode("bad bytes"))),
        Completion::Applied
    );
    match slot.state() {
        LoadState::Failed { token, reason } => {
            assert_eq!(*token, a);
            assert!(reason.contains("bad bytes"));
        }
        other => panic!("unexpected state {other:?}"),
    }

    // Duplicate completion after resolution is ignored.
    assert_eq!(slot.complete(a, Ok(bitmap(1, 1))), Completion::Stale);
}

#[test]
fn cancel_discards_in_flight_decode() {
    let mut slot = LoadSlot::new();
    let a = slot.begin(src("a.png"), Instant::now());
    slot.cancel();
    assert_eq!(slot.complete(a, Ok(bitmap(1, 1))), Completion::Stale);
    assert!(matches!(slot.state(), LoadState::Idle));
    assert!(slot.active_source().is_none());
}

#[test]
fn expire_times_out_pending_and_late_success_wins() {
    let t0 = Instant::now();
    let mut slot = LoadSlot::new();
    let a = slot.begin(src("a.png"), t0);
    assert!(!slot.expire(t0 + Duration::from_millis(10), Duration::from_millis(50)));
    assert!(slot.expire(t0 + Duration::from_millis(50), Duration::from_millis(50)));
    assert!(matches!(slot.state(), LoadState::TimedOut { token } if *token == a));

    // Expiry only applies to pending decodes.
    assert!(!slot.expire(t0 + Duration::from_secs(5), Duration::from_millis(50)));

    assert_eq!(
        slot.complete(a, Err(TimberlensError::decode("late failure"))),
        Completion::Stale
    );
    assert_eq!(slot.complete(a, Ok(bitmap(2, 2))), Completion::Applied);
    assert!(slot.state().decoded().is_some());
}

#[test]
fn zero_decode_threads_is_rejected() {
    let err = ImageLoader::new(LoaderOpts::default().with_decode_threads(0)).unwrap_err();
    assert!(matches!(err, TimberlensError::Validation(_)));
}

#[test]
fn loader_reports_unreadable_source_as_failed() {
    let mut loader = ImageLoader::new(LoaderOpts::default()).unwrap();
    loader.begin(src("/no/such/dir/stack.jpg"));
    match loader.wait(Duration::from_secs(10)) {
        LoadState::Failed { reason, .. } => assert!(reason.contains("stack.jpg")),
        other => panic!("unexpected state {other:?}"),
    }
    assert!(loader.decoded().is_none());
}
