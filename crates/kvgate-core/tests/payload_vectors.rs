//! JSON payload vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use kvgate_core::protocol::{
    DeleteRequest, HealthResponse, HealthState, MessageResponse, SetRequest, ValueResponse,
};

fn load(name: &str) -> String {
    fs::read_to_string(format!("tests/vectors/{name}")).unwrap()
}

#[test]
fn parse_set_full() {
    let req: SetRequest = serde_json::from_str(&load("set_full.json")).unwrap();
    let (key, value) = req.into_parts().unwrap();
    assert_eq!(key, "abc-1");
    assert_eq!(value, "123");
}

#[test]
fn set_missing_value_is_bad_request() {
    let req: SetRequest = serde_json::from_str(&load("set_missing_value.json")).unwrap();
    let err = req.into_parts().expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    assert!(err.to_string().contains("`value`"));
}

#[test]
fn set_ignores_unknown_fields() {
    let req: SetRequest = serde_json::from_str(&load("set_extra_fields.json")).unwrap();
    let (key, value) = req.into_parts().unwrap();
    assert_eq!(key, "user:42");
    assert_eq!(value, r#"{"name":"ada"}"#);
}

#[test]
fn set_rejects_non_string_value() {
    let res = serde_json::from_str::<SetRequest>(r#"{"key":"a","value":5}"#);
    assert!(res.is_err());
}

#[test]
fn delete_without_key_is_bad_request() {
    let req: DeleteRequest = serde_json::from_str(&load("delete_empty.json")).unwrap();
    let err = req.into_key().expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn health_wire_names() {
    let h: HealthResponse = serde_json::from_str(&load("health_down.json")).unwrap();
    assert_eq!(h.status, HealthState::Down);
    assert_eq!(h.response_time, -1.0);
    assert_eq!(h.timestamp, 1_700_000_000);

    let up = HealthResponse {
        status: HealthState::Up,
        response_time: 0.25,
        timestamp: 1,
    };
    let v = serde_json::to_value(&up).unwrap();
    assert_eq!(v["status"], "UP");
    assert_eq!(v["responseTime"], 0.25);
}

#[test]
fn simple_bodies_serialize_flat() {
    let v = serde_json::to_value(ValueResponse {
        value: "456".into(),
    })
    .unwrap();
    assert_eq!(v, serde_json::json!({ "value": "456" }));

    let m = serde_json::to_value(MessageResponse::new(MessageResponse::KEY_NOT_FOUND)).unwrap();
    assert_eq!(m, serde_json::json!({ "message": "key not found" }));
}
