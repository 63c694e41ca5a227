//! Serialization and defaulting of bundle models.

use ota_relay::models::bundle::{Bundle, NewBundle, Platform, DEFAULT_CHANNEL};

#[test]
fn platform_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Platform::Ios).expect("ios"), "\"ios\"");
    assert_eq!(
        serde_json::to_string(&Platform::Android).expect("android"),
        "\"android\""
    );
    assert_eq!(Platform::Android.to_string(), "android");
}

#[test]
fn minimal_payload_takes_defaults() {
    let payload: NewBundle = serde_json::from_str(
        r#"{"platform":"android","file_hash":"deadbeef","storage_uri":"s3://b/k.zip","fingerprint_hash":"fp"}"#,
    )
    .expect("payload parses");

    assert!(payload.enabled);
    assert!(!payload.should_force_update);
    assert_eq!(payload.channel, DEFAULT_CHANNEL);
    assert_eq!(payload.metadata, serde_json::json!({}));

    let bundle = payload.into_bundle().expect("valid bundle");
    assert_eq!(bundle.platform, Platform::Android);
    assert!(uuid::Uuid::parse_str(&bundle.id).is_ok());
}

#[test]
fn client_id_is_kept() {
    let id = "01890a5d-ac96-774b-bcce-b302099a8057";
    let payload: NewBundle = serde_json::from_str(&format!(
        r#"{{"id":"{id}","platform":"ios","file_hash":"h","storage_uri":"s3://b/k","target_app_version":"1.x"}}"#
    ))
    .expect("payload parses");
    assert_eq!(payload.into_bundle().expect("valid").id, id);
}

#[test]
fn unknown_platform_fails_to_parse() {
    let result = serde_json::from_str::<NewBundle>(
        r#"{"platform":"windows","file_hash":"h","storage_uri":"s3://b/k","target_app_version":"1"}"#,
    );
    assert!(result.is_err());
}

#[test]
fn bundle_json_uses_snake_case() {
    let bundle = Bundle {
        id: "01890a5d-ac96-774b-bcce-b302099a8057".into(),
        platform: Platform::Ios,
        enabled: true,
        should_force_update: true,
        file_hash: "h".into(),
        git_commit_hash: Some("abc".into()),
        message: Some("fix crash".into()),
        channel: "beta".into(),
        storage_uri: "s3://b/k".into(),
        target_app_version: Some("1.2.x".into()),
        fingerprint_hash: None,
        metadata: serde_json::json!({"app_version": "1.2.3"}),
    };
    let value = serde_json::to_value(&bundle).expect("serialize");
    assert_eq!(value["should_force_update"], true);
    assert_eq!(value["git_commit_hash"], "abc");
    assert_eq!(value["fingerprint_hash"], serde_json::Value::Null);
    assert_eq!(value["metadata"]["app_version"], "1.2.3");
}
