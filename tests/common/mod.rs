// Scripted transport and canned upstream payloads shared by the
// integration tests.

#![allow(dead_code)]

use llu_follower::api::{ApiRequest, RawResponse, Transport};
use llu_follower::resolver::ClientConfig;
use llu_follower::{Credentials, LluError, LluResult};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;

pub const USER_ID: &str = "7b9e7c1a-0d3e-11ee-a1b2-0242ac120002";

pub enum Scripted {
    Reply(RawResponse),
    Unreachable,
}

/// Replays scripted replies in order and records every request it saw.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Scripted>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<RawResponse>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().map(Scripted::Reply).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: Scripted) {
        self.replies.borrow_mut().push_back(reply);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|r| r.url.clone()).collect()
    }

    pub fn header(&self, index: usize, name: &str) -> Option<String> {
        self.requests.borrow()[index]
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, req: &ApiRequest) -> LluResult<RawResponse> {
        self.requests.borrow_mut().push(req.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(Scripted::Reply(res)) => Ok(res),
            Some(Scripted::Unreachable) => Err(LluError::Network("connection refused".into())),
            None => panic!("unexpected extra request to {}", req.url),
        }
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::default()
}

pub fn credentials() -> Credentials {
    Credentials::new("follower@example.com", "s3cret")
}

pub fn reply(status: u16, body: Value) -> RawResponse {
    RawResponse::new(status, body.to_string())
}

pub fn login_ok(token: &str) -> RawResponse {
    reply(
        200,
        json!({
            "status": 0,
            "data": {
                "user": {"id": USER_ID, "country": "DE"},
                "authTicket": {"token": token, "expires": 1767225600, "duration": 15552000000u64}
            }
        }),
    )
}

pub fn redirect(region: &str) -> RawResponse {
    reply(200, json!({"status": 0, "data": {"redirect": true, "region": region}}))
}

pub fn version_rejected(minimum: &str) -> RawResponse {
    reply(403, json!({"status": 920, "data": {"minimumVersion": minimum}}))
}

pub fn connections(entries: Value) -> RawResponse {
    reply(200, json!({"status": 0, "data": entries}))
}

pub fn graph(measurement: Value) -> RawResponse {
    reply(
        200,
        json!({
            "status": 0,
            "data": {
                "connection": {
                    "patientId": "p1",
                    "glucoseMeasurement": measurement
                },
                "graphData": []
            }
        }),
    )
}

pub fn measurement() -> Value {
    json!({
        "Value": 123,
        "TrendArrow": 4,
        "Timestamp": "1/31/2026 10:42:00 AM"
    })
}
