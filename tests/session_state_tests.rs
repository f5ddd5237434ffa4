// Tests for the session state machine
//
// These drive `Session` transitions directly, without a controller or any
// asynchronous work.

use loqa_clips::session::DOWNLOAD_COMPLETED;
use loqa_clips::{Encoding, Segment, Session, SessionStatus, UploadResult};

fn ready_session() -> Session {
    let mut session = Session::new();
    assert!(session.device_granted(Encoding::WebmOpus));
    session
}

fn segment(bytes: &[u8]) -> Segment {
    Segment::new(bytes.to_vec(), 0)
}

/// Record `chunks` under `name` and stop
fn recorded_session(name: &str, chunks: &[&[u8]]) -> Session {
    let mut session = ready_session();
    assert!(session.begin_recording(name));
    for chunk in chunks {
        assert!(session.append_segment(segment(chunk)));
    }
    assert!(session.finish_recording());
    session
}

#[test]
fn test_new_session_is_unready() {
    let session = Session::new();

    assert_eq!(session.status(), SessionStatus::Unready);
    assert!(!session.device_available());
    assert_eq!(session.elapsed_seconds(), 0);
    assert!(session.artifact().is_none());
    assert!(session.upload_result().is_none());
}

#[test]
fn test_start_requires_device() {
    let mut session = Session::new();
    session.device_denied();

    assert!(!session.begin_recording("demo"));
    assert_eq!(session.status(), SessionStatus::Unready);
}

#[test]
fn test_start_rejects_empty_name() {
    let mut session = ready_session();

    assert!(!session.begin_recording(""));
    assert_eq!(session.status(), SessionStatus::Ready);
    assert_eq!(session.generation(), 0);

    // Whitespace is a name like any other
    assert!(session.begin_recording(" "));
    assert_eq!(session.name(), " ");
}

#[test]
fn test_start_while_recording_is_ignored() {
    let mut session = ready_session();
    assert!(session.begin_recording("first"));
    assert!(session.append_segment(segment(b"abc")));

    assert!(!session.begin_recording("second"));
    assert_eq!(session.name(), "first");
    assert_eq!(session.segments().len(), 1);
}

#[test]
fn test_tick_only_counts_while_recording() {
    let mut session = ready_session();
    assert!(!session.tick());

    session.begin_recording("demo");
    for _ in 0..3 {
        assert!(session.tick());
    }
    assert_eq!(session.elapsed_seconds(), 3);

    session.finish_recording();
    assert!(!session.tick());
    assert_eq!(session.elapsed_seconds(), 3);
}

#[test]
fn test_segments_concatenate_in_arrival_order() {
    let session = recorded_session("demo", &[b"one-", b"two-", b"three"]);

    let artifact = session.artifact().expect("artifact after stop");
    assert_eq!(artifact.bytes(), b"one-two-three");
    assert_eq!(artifact.segment_count(), 3);
    assert_eq!(artifact.mime_type(), "audio/webm; codecs=opus");
    assert_eq!(session.status(), SessionStatus::Stopped);
}

#[test]
fn test_segments_outside_recording_are_discarded() {
    let mut session = ready_session();
    assert!(!session.append_segment(segment(b"early")));
    assert!(session.segments().is_empty());

    let mut session = recorded_session("demo", &[b"abc"]);
    assert!(!session.append_segment(segment(b"late")));
    assert_eq!(session.artifact().map(|a| a.len()), Some(3));
}

#[test]
fn test_stop_without_segments_has_no_artifact() {
    let mut session = recorded_session("silence", &[]);

    assert_eq!(session.status(), SessionStatus::Stopped);
    assert!(session.artifact().is_none());
    assert!(session.begin_upload().is_none());
    assert!(session.download_ticket().is_none());
    assert_eq!(session.status(), SessionStatus::Stopped);
}

#[test]
fn test_stop_when_not_recording_is_ignored() {
    let mut session = ready_session();
    assert!(!session.finish_recording());
    assert_eq!(session.status(), SessionStatus::Ready);
}

#[test]
fn test_restart_clears_previous_phase() {
    let mut session = recorded_session("first", &[b"abc"]);
    let ticket = session.begin_upload().expect("upload ticket");
    assert!(session.complete_upload(ticket.generation, Ok("hello".to_string())));
    assert!(session.mark_downloaded(ticket.generation));

    assert!(session.begin_recording("second"));
    assert_eq!(session.status(), SessionStatus::Recording);
    assert_eq!(session.name(), "second");
    assert_eq!(session.elapsed_seconds(), 0);
    assert!(session.segments().is_empty());
    assert!(session.artifact().is_none());
    assert!(session.upload_result().is_none());
    assert!(session.download_status().is_none());
}

#[test]
fn test_upload_success_records_transcript() {
    let mut session = recorded_session("demo", &[b"abc"]);

    let ticket = session.begin_upload().expect("upload ticket");
    assert_eq!(session.status(), SessionStatus::Uploading);
    assert_eq!(ticket.name, "demo");
    assert_eq!(ticket.artifact.bytes(), b"abc");

    assert!(session.complete_upload(ticket.generation, Ok("hello world".to_string())));
    assert_eq!(session.status(), SessionStatus::UploadSucceeded);
    assert_eq!(
        session.upload_result(),
        Some(&UploadResult::Transcript("hello world".to_string()))
    );
}

#[test]
fn test_upload_failure_records_message() {
    let mut session = recorded_session("demo", &[b"abc"]);
    let ticket = session.begin_upload().expect("upload ticket");

    assert!(session.complete_upload(ticket.generation, Err("network error".to_string())));
    assert_eq!(session.status(), SessionStatus::UploadFailed);
    assert_eq!(
        session.upload_result().map(|r| r.to_string()),
        Some("Upload failed: network error".to_string())
    );
}

#[test]
fn test_upload_in_flight_rejects_second_upload() {
    let mut session = recorded_session("demo", &[b"abc"]);

    assert!(session.begin_upload().is_some());
    assert!(session.begin_upload().is_none());
    assert_eq!(session.status(), SessionStatus::Uploading);
}

#[test]
fn test_upload_can_be_retried_after_completion() {
    let mut session = recorded_session("demo", &[b"abc"]);
    let ticket = session.begin_upload().expect("upload ticket");
    session.complete_upload(ticket.generation, Err("timeout".to_string()));

    let retry = session.begin_upload().expect("retry ticket");
    assert_eq!(retry.artifact.id(), ticket.artifact.id());
    assert_eq!(session.status(), SessionStatus::Uploading);
}

#[test]
fn test_stale_upload_completion_is_ignored() {
    let mut session = recorded_session("first", &[b"abc"]);
    let ticket = session.begin_upload().expect("upload ticket");

    assert!(session.begin_recording("second"));
    assert!(!session.complete_upload(ticket.generation, Ok("old".to_string())));

    assert_eq!(session.status(), SessionStatus::Recording);
    assert!(session.upload_result().is_none());
}

#[test]
fn test_upload_completion_without_upload_is_ignored() {
    let mut session = recorded_session("demo", &[b"abc"]);
    let generation = session.generation();

    assert!(!session.complete_upload(generation, Ok("unexpected".to_string())));
    assert_eq!(session.status(), SessionStatus::Stopped);
}

#[test]
fn test_mark_downloaded_sets_status() {
    let mut session = recorded_session("demo", &[b"abc"]);
    let ticket = session.download_ticket().expect("download ticket");

    assert!(session.mark_downloaded(ticket.generation));
    assert_eq!(session.download_status(), Some(DOWNLOAD_COMPLETED));
    // Downloading does not change the lifecycle status
    assert_eq!(session.status(), SessionStatus::Stopped);
}

#[test]
fn test_mark_downloaded_for_previous_phase_is_ignored() {
    let mut session = recorded_session("first", &[b"abc"]);
    let ticket = session.download_ticket().expect("download ticket");

    session.begin_recording("second");
    assert!(!session.mark_downloaded(ticket.generation));
    assert!(session.download_status().is_none());
}

#[test]
fn test_snapshot_reflects_session() {
    let session = recorded_session("demo", &[b"ab", b"cd"]);
    let snapshot = session.snapshot();

    assert_eq!(snapshot.status, SessionStatus::Stopped);
    assert_eq!(snapshot.name, "demo");
    assert_eq!(snapshot.segment_count, 2);
    assert!(snapshot.device_available);
    assert!(snapshot.started_at.is_some());

    let info = snapshot.artifact.expect("artifact info");
    assert_eq!(info.size_bytes, 4);
    assert_eq!(info.segment_count, 2);
}

#[test]
fn test_pcm_encoding_is_carried_into_artifact() {
    let mut session = Session::new();
    session.device_granted(Encoding::Pcm16 {
        sample_rate: 16000,
        channels: 1,
    });
    session.begin_recording("pcm");
    session.append_segment(segment(&[0, 0, 1, 0]));
    session.finish_recording();

    let artifact = session.artifact().expect("artifact");
    assert_eq!(artifact.mime_type(), "audio/L16; rate=16000; channels=1");
    assert_eq!(artifact.file_name("pcm"), "pcm.wav");
}
