use base64::Engine;
use meeting_ingest::SegmentMessage;
use uuid::Uuid;

#[test]
fn test_segment_message_serialization() {
    let msg = SegmentMessage {
        segment_id: Uuid::new_v4(),
        session_id: "meeting-standup".to_string(),
        pcm: base64::engine::general_purpose::STANDARD.encode([0u8; 6400]),
        sample_rate: 16000,
        channels: 1,
        sample_width_bytes: 2,
        duration_ms: 200.0,
        timestamp: "2026-08-06T14:30:00Z".to_string(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("meeting-standup"));
    assert!(json.contains("16000"));
    assert!(json.contains("\"duration_ms\":200.0"));

    let deserialized: SegmentMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.segment_id, msg.segment_id);
    assert_eq!(deserialized.session_id, "meeting-standup");
    assert_eq!(deserialized.sample_rate, 16000);
    assert_eq!(deserialized.channels, 1);
    assert_eq!(deserialized.sample_width_bytes, 2);
    assert_eq!(deserialized.duration_ms, 200.0);
}

#[test]
fn test_segment_message_pcm_round_trip() {
    let pcm_bytes: Vec<u8> = (0..=255).collect();

    let msg = SegmentMessage {
        segment_id: Uuid::new_v4(),
        session_id: "test".to_string(),
        pcm: base64::engine::general_purpose::STANDARD.encode(&pcm_bytes),
        sample_rate: 16000,
        channels: 1,
        sample_width_bytes: 2,
        duration_ms: 8.0,
        timestamp: "2026-08-06T14:30:00Z".to_string(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    let deserialized: SegmentMessage = serde_json::from_str(&json).unwrap();

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&deserialized.pcm)
        .unwrap();
    assert_eq!(decoded, pcm_bytes);
}
