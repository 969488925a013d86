use ingestion::processor::{EventPipeline, LineOutcome, Mode, PipelineError};
use ingestion::ParseError;
use spendgraph_core::config::{NetworkParams, ParamsError};
use spendgraph_core::error::{ErrorCode, SpendgraphError};
use spendgraph_core::model::{Amount, Event, UserId};
use spendgraph_core::sink::{FlagSink, InMemoryFlagSink, JsonlFlagSink};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::tempdir;

const BATCH: &str = r#"{"D":"3", "T":"50"}
{"event_type":"purchase", "timestamp":"2017-06-13 11:33:01", "id": "1", "amount": "16.83"}
{"event_type":"purchase", "timestamp":"2017-06-13 11:33:01", "id": "1", "amount": "59.28"}
{"event_type":"befriend", "timestamp":"2017-06-13 11:33:01", "id1": "1", "id2": "2"}
{"event_type":"befriend", "timestamp":"2017-06-13 11:33:01", "id1": "3", "id2": "1"}
{"event_type":"purchase", "timestamp":"2017-06-13 11:33:01", "id": "1", "amount": "11.20"}
{"event_type":"unfriend", "timestamp":"2017-06-13 11:33:01", "id1": "1", "id2": "3"}
"#;

const STREAM: &str = r#"{"event_type":"purchase", "timestamp":"2017-06-13 11:33:02", "id": "2", "amount": "1601.83"}
this line is not an event
{"event_type":"purchase", "timestamp":"2017-06-13 11:33:02", "id": "2", "amount": "20.00"}

{"event_type":"purchase", "timestamp":"2017-06-13 11:33:03", "id": "3", "amount": "5000"}
"#;

#[test]
fn test_batch_then_stream_end_to_end() {
    let dir = tempdir().unwrap();
    let batch_path = dir.path().join("batch_log.json");
    let stream_path = dir.path().join("stream_log.json");
    let output_path = dir.path().join("log_output").join("flagged_purchases.json");
    std::fs::write(&batch_path, BATCH).unwrap();
    std::fs::write(&stream_path, STREAM).unwrap();

    let sink = Arc::new(JsonlFlagSink::create(&output_path).unwrap());
    let mut pipeline = EventPipeline::from_batch_file(&batch_path, sink).unwrap();

    let params = pipeline.detector().params();
    assert_eq!((params.degree, params.tracked_purchases), (3, 50));
    assert_eq!(pipeline.network().history().len(), 3);

    let report = pipeline.process_stream_file(&stream_path).unwrap();
    assert_eq!(report.events, 3);
    assert_eq!(report.skipped, 1);
    // User 3 was unfriended in the batch, so its network is empty.
    assert_eq!(report.flagged, 1);

    let content = std::fs::read_to_string(&output_path).unwrap();
    assert_eq!(
        content,
        "{\"event_type\":\"purchase\",\"timestamp\":\"2017-06-13 11:33:02\",\"id\":\"2\",\"amount\":\"1601.83\",\"mean\":\"29.10\",\"sd\":\"21.46\"}\n"
    );

    let snapshot = pipeline.metrics().snapshot();
    assert_eq!(snapshot.purchase_events, 6);
    assert_eq!(snapshot.befriend_events, 2);
    assert_eq!(snapshot.unfriend_events, 1);
    assert_eq!(snapshot.skipped_lines, 1);
    assert_eq!(snapshot.flagged, 1);
    assert_eq!(snapshot.not_evaluable, 1);
    assert_eq!(snapshot.normal, 1);
}

#[test]
fn test_batch_purchases_are_never_flagged() {
    let batch = r#"{"D":1,"T":2}
{"event_type":"befriend","timestamp":"t","id1":"A","id2":"B"}
{"event_type":"purchase","timestamp":"t","id":"B","amount":"10"}
{"event_type":"purchase","timestamp":"t","id":"B","amount":"10"}
{"event_type":"purchase","timestamp":"t","id":"A","amount":"100"}
"#;
    let sink = Arc::new(InMemoryFlagSink::default());
    let mut pipeline = EventPipeline::from_batch(Cursor::new(batch), sink.clone()).unwrap();
    assert!(sink.records().unwrap().is_empty());

    // The same purchase in the stream is flagged against B's history.
    let flagged = pipeline
        .apply(
            &Event::purchase("A", Amount::parse("100").unwrap(), "t2"),
            Mode::Detect,
        )
        .unwrap()
        .unwrap();
    assert_eq!(flagged.mean, 10.0);
    assert_eq!(flagged.sd, 0.0);
    assert_eq!(sink.records().unwrap(), vec![flagged]);
}

#[test]
fn test_missing_header_is_fatal() {
    let sink = Arc::new(InMemoryFlagSink::default());
    let err = EventPipeline::from_batch(Cursor::new("\n\n"), sink).err().unwrap();
    assert!(matches!(err, PipelineError::MissingHeader));
    assert_eq!(err.error_code(), ErrorCode::InvalidConfig);
}

#[test]
fn test_negative_parameters_are_fatal() {
    let sink = Arc::new(InMemoryFlagSink::default());
    let err = EventPipeline::from_batch(Cursor::new("{\"D\":\"2\",\"T\":\"-5\"}\n"), sink)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        PipelineError::Params(ParamsError::Negative { name: "T", value: -5 })
    ));
    assert_eq!(err.error_code(), ErrorCode::InvalidConfig);
}

#[test]
fn test_header_line_is_not_replayed_as_event() {
    let sink = Arc::new(InMemoryFlagSink::default());
    let pipeline = EventPipeline::from_batch(
        Cursor::new("{\"D\":\"1\",\"T\":\"3\"}\n{\"event_type\":\"befriend\",\"timestamp\":\"t\",\"id1\":\"x\",\"id2\":\"y\"}\n"),
        sink,
    )
    .unwrap();

    assert_eq!(pipeline.metrics().snapshot().skipped_lines, 0);
    assert!(pipeline
        .network()
        .graph()
        .are_friends(&UserId::new("x"), &UserId::new("y")));
}

#[test]
fn test_stream_skips_lines_that_are_not_utf8() {
    let sink = Arc::new(InMemoryFlagSink::default());
    let mut pipeline = EventPipeline::new(NetworkParams::new(1, 2), sink.clone());

    let mut stream = Vec::new();
    stream.extend_from_slice(b"{\"event_type\":\"befriend\",\"timestamp\":\"t\",\"id1\":\"A\",\"id2\":\"B\"}\n");
    stream.extend_from_slice(b"{\"event_type\":\"purchase\",\"timestamp\":\"t\",\"id\":\"B\",\"amount\":\"10\"}\n");
    stream.extend_from_slice(b"\xff\xfe garbage\n");
    stream.extend_from_slice(b"{\"event_type\":\"purchase\",\"timestamp\":\"t\",\"id\":\"B\",\"amount\":\"10\"}\r\n");
    stream.extend_from_slice(b"{\"event_type\":\"purchase\",\"timestamp\":\"t\",\"id\":\"A\",\"amount\":\"100\"}");

    let report = pipeline.process_stream(Cursor::new(stream)).unwrap();
    assert_eq!(report.events, 4);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.flagged, 1);
    assert_eq!(sink.emitted(), 1);
    assert_eq!(pipeline.metrics().snapshot().skipped_lines, 1);
}

#[test]
fn test_batch_replay_continues_past_invalid_encoding() {
    let mut batch = b"{\"D\":\"1\",\"T\":\"2\"}\n".to_vec();
    batch.extend_from_slice(b"{\"event_type\":\"befriend\",\"timestamp\":\"t\",\"id1\":\"A\",\"id2\":\"B\"}\n");
    batch.extend_from_slice(b"\xc3\x28\n");
    batch.extend_from_slice(b"{\"event_type\":\"purchase\",\"timestamp\":\"t\",\"id\":\"B\",\"amount\":\"10\"}\n");

    let sink = Arc::new(InMemoryFlagSink::default());
    let pipeline = EventPipeline::from_batch(Cursor::new(batch), sink).unwrap();
    assert_eq!(pipeline.network().history().len(), 1);
    assert_eq!(pipeline.metrics().snapshot().skipped_lines, 1);
}

#[test]
fn test_apply_bytes_reports_invalid_encoding() {
    let sink = Arc::new(InMemoryFlagSink::default());
    let mut pipeline = EventPipeline::new(NetworkParams::new(1, 2), sink);
    let outcome = pipeline.apply_bytes(7, b"\xff\xfe", Mode::Detect).unwrap();
    assert!(matches!(
        outcome,
        LineOutcome::Skipped(ParseError::InvalidEncoding(_))
    ));
}

#[test]
fn test_set_sink_redirects_flags() {
    let batch = "{\"D\":1,\"T\":2}\n{\"event_type\":\"befriend\",\"timestamp\":\"t\",\"id1\":\"A\",\"id2\":\"B\"}\n{\"event_type\":\"purchase\",\"timestamp\":\"t\",\"id\":\"B\",\"amount\":\"10\"}\n{\"event_type\":\"purchase\",\"timestamp\":\"t\",\"id\":\"B\",\"amount\":\"10\"}\n";
    let replay_sink = Arc::new(InMemoryFlagSink::default());
    let mut pipeline = EventPipeline::from_batch(Cursor::new(batch), replay_sink.clone()).unwrap();

    let stream_sink = Arc::new(InMemoryFlagSink::default());
    pipeline.set_sink(stream_sink.clone());
    pipeline
        .apply(
            &Event::purchase("A", Amount::parse("100").unwrap(), "t2"),
            Mode::Detect,
        )
        .unwrap();

    assert_eq!(replay_sink.emitted(), 0);
    assert_eq!(stream_sink.emitted(), 1);
}
