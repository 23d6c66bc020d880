// Connection discovery: which patients share their data with this follower.

use crate::api::Transport;
use crate::error::{LluError, LluResult};
use crate::session::{authed_get, SessionContext};
use serde_json::{Map, Value};
use tracing::debug;

pub const CONNECTIONS_PATH: &str = "/llu/connections";

/// One sharing relationship. `raw` keeps every upstream attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub patient_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub raw: Map<String, Value>,
}

impl Connection {
    fn from_value(value: &Value) -> LluResult<Self> {
        let raw = value
            .as_object()
            .ok_or_else(|| LluError::Extraction("connection entry is not an object".into()))?
            .clone();
        let patient_id = raw
            .get("patientId")
            .or_else(|| raw.get("patient_id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LluError::Extraction("connection entry without patientId".into()))?
            .to_string();
        let name = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Connection {
            patient_id,
            first_name: name("firstName"),
            last_name: name("lastName"),
            raw,
        })
    }
}

/// Picks the connection whose data is fetched.
pub trait ConnectionSelector {
    fn select<'a>(&self, connections: &'a [Connection]) -> Option<&'a Connection>;
}

/// Takes the first connection the upstream lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstConnection;

impl ConnectionSelector for FirstConnection {
    fn select<'a>(&self, connections: &'a [Connection]) -> Option<&'a Connection> {
        connections.first()
    }
}

/// Takes the connection with a specific patient id.
#[derive(Debug, Clone)]
pub struct ByPatientId(pub String);

impl ConnectionSelector for ByPatientId {
    fn select<'a>(&self, connections: &'a [Connection]) -> Option<&'a Connection> {
        connections.iter().find(|c| c.patient_id == self.0)
    }
}

/// Every connection visible to the follower. An empty list is valid.
pub fn list_connections<T: Transport>(
    transport: &T,
    session: &SessionContext,
) -> LluResult<Vec<Connection>> {
    let payload = authed_get(transport, session, CONNECTIONS_PATH)?;
    let entries = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| LluError::Extraction("connections data is not a list".into()))?;
    let connections = entries
        .iter()
        .map(Connection::from_value)
        .collect::<LluResult<Vec<_>>>()?;
    debug!(count = connections.len(), "Fetched connections");
    Ok(connections)
}

/// Resolve the patient id to fetch, failing with `NoConnection` when nothing
/// is shared or the selector matches nothing.
pub fn find_patient<T: Transport, S: ConnectionSelector + ?Sized>(
    transport: &T,
    session: &SessionContext,
    selector: &S,
) -> LluResult<String> {
    let connections = list_connections(transport, session)?;
    selector
        .select(&connections)
        .map(|c| c.patient_id.clone())
        .ok_or(LluError::NoConnection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conn(id: &str) -> Connection {
        Connection::from_value(&json!({"patientId": id})).unwrap()
    }

    #[test]
    fn first_connection_picks_head() {
        let list = vec![conn("p1"), conn("p2")];
        assert_eq!(FirstConnection.select(&list).unwrap().patient_id, "p1");
        assert!(FirstConnection.select(&[]).is_none());
    }

    #[test]
    fn by_patient_id_matches_exactly() {
        let list = vec![conn("p1"), conn("p2")];
        assert_eq!(ByPatientId("p2".into()).select(&list).unwrap().patient_id, "p2");
        assert!(ByPatientId("p3".into()).select(&list).is_none());
    }

    #[test]
    fn snake_case_patient_id_is_accepted() {
        let c = Connection::from_value(&json!({"patient_id": "p9", "firstName": "Ada"})).unwrap();
        assert_eq!(c.patient_id, "p9");
        assert_eq!(c.first_name.as_deref(), Some("Ada"));
        assert!(c.last_name.is_none());
    }

    #[test]
    fn entry_without_id_is_extraction_error() {
        let err = Connection::from_value(&json!({"firstName": "Ada"})).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Extraction);
    }
}
