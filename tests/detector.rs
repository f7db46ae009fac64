//! Detector input tests

use std::fmt::Write as _;
use std::time::Instant;

use moodtune::detector::{DetectorFrame, FrameSource, JsonLinesSource};
use moodtune::{FrameOutcome, PlaybackCategory};

mod common;
use common::{test_config, test_session};

fn replay_lines(label: &str, count: u64, step_ms: u64) -> String {
    let mut out = String::new();
    for i in 0..count {
        writeln!(
            out,
            r#"{{"faces":[{{"box":[0,0,64,64],"emotions":{{"{label}":0.9,"neutral":0.05}}}}],"timestamp_ms":{}}}"#,
            i * step_ms
        )
        .unwrap();
    }
    out
}

#[tokio::test]
async fn test_replay_file_commits_on_recorded_clock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frames.jsonl");
    std::fs::write(&path, replay_lines("happy", 8, 500)).unwrap();

    let config = test_config();
    let (mut session, backend) = test_session(&config);
    let mut source = JsonLinesSource::open(&path).await.unwrap();

    let mut committed = Vec::new();
    while let Some(frame) = source.next_frame().await.unwrap() {
        // arrival time is irrelevant, the recorded timestamps drive the debouncer
        if let FrameOutcome::Committed { category, .. } =
            session.handle_frame(&frame, Instant::now())
        {
            committed.push((category, frame.timestamp_ms));
        }
    }

    assert_eq!(committed, vec![(PlaybackCategory::new("happy"), Some(3000))]);
    assert_eq!(backend.played().len(), 1);
}

#[tokio::test]
async fn test_garbage_lines_count_as_empty_frames() {
    let input = "{\"faces\":[]}\nnot json at all\n\n{\"faces\":[{\"box\":[0,0,1,1],\"label\":\"sad\",\"confidence\":0.7}]}\n";
    let mut source = JsonLinesSource::new(input.as_bytes());

    let mut frames = Vec::new();
    while let Some(frame) = source.next_frame().await.unwrap() {
        frames.push(frame);
    }

    assert_eq!(frames.len(), 3);
    assert_eq!(frames[1], DetectorFrame::default());
    assert_eq!(frames[2].faces[0].label, "sad");
}

#[tokio::test]
async fn test_missing_replay_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(JsonLinesSource::open(&dir.path().join("absent.jsonl")).await.is_err());
}

#[test]
fn test_unknown_label_falls_back_to_neutral() {
    let config = test_config();
    let (mut session, _backend) = test_session(&config);

    let frame = DetectorFrame::from_json(
        r#"{"faces":[{"box":[0,0,10,10],"label":"bewildered","confidence":0.95}]}"#,
    )
    .unwrap();

    let FrameOutcome::Observed { category, .. } = session.handle_frame(&frame, Instant::now())
    else {
        panic!("expected an observation");
    };
    assert_eq!(category, PlaybackCategory::new("neutral"));
}
