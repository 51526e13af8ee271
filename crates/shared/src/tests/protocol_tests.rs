use super::*;

#[test]
fn decodes_call_as_returned_by_backend() {
    let raw = r#"{
        "id": "5f0c6f4e-8d0b-4c9a-9a57-2f4b1c3e7d10",
        "created_at": "2024-05-01T12:30:00.123456+00:00",
        "s3_key": "calls/5f0c6f4e.wav",
        "status": "uploaded",
        "original_filename": "support-call.wav",
        "duration_sec": null
    }"#;

    let call: Call = serde_json::from_str(raw).expect("decode call");
    assert_eq!(call.id.to_string(), "5f0c6f4e-8d0b-4c9a-9a57-2f4b1c3e7d10");
    assert_eq!(call.status, CallStatus::Uploaded);
    assert_eq!(call.original_filename, "support-call.wav");
    assert_eq!(call.duration_sec, None);
}

#[test]
fn keeps_unknown_status_verbatim() {
    let raw = r#"{
        "id": "abc",
        "created_at": "2024-05-01T12:30:00Z",
        "s3_key": "calls/abc.mp3",
        "status": "transcribing",
        "original_filename": "a.mp3",
        "duration_sec": 42
    }"#;

    let call: Call = serde_json::from_str(raw).expect("decode call");
    assert_eq!(call.status, CallStatus::Other("transcribing".to_string()));
    assert_eq!(call.duration_sec, Some(42));

    let encoded = serde_json::to_value(&call).expect("encode call");
    assert_eq!(encoded["status"], "transcribing");
}

#[test]
fn storage_mode_uses_lowercase_wire_names() {
    let local: StorageModeResponse =
        serde_json::from_str(r#"{"mode":"local"}"#).expect("decode local");
    let s3: StorageModeResponse = serde_json::from_str(r#"{"mode":"s3"}"#).expect("decode s3");
    assert_eq!(local.mode, StorageMode::Local);
    assert_eq!(s3.mode, StorageMode::S3);
    assert!(serde_json::from_str::<StorageModeResponse>(r#"{"mode":"gcs"}"#).is_err());
}

#[test]
fn presign_request_serializes_snake_case_fields() {
    let body = serde_json::to_value(PresignRequest {
        filename: "call.wav".into(),
        content_type: "audio/wav".into(),
    })
    .expect("encode");
    assert_eq!(
        body,
        serde_json::json!({"filename": "call.wav", "content_type": "audio/wav"})
    );
}

#[test]
fn health_status_is_case_insensitive() {
    assert!(HealthResponse {
        status: "OK".into()
    }
    .is_ok());
    assert!(!HealthResponse {
        status: "degraded".into()
    }
    .is_ok());
}
