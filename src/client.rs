// High-level client: negotiate a session, locate the patient, fetch the
// latest reading.

use crate::api::{ReqwestTransport, Transport};
use crate::connections::{self, Connection, ConnectionSelector};
use crate::error::LluResult;
use crate::reading::{self, Reading, TrendTable};
use crate::resolver::ClientConfig;
use crate::session::{self, Credentials, SessionContext};

/// Follower client. Holds no session state between calls; each operation
/// takes the `SessionContext` it should act on.
pub struct LibreLinkUpClient<T: Transport = ReqwestTransport> {
    transport: T,
    config: ClientConfig,
    trends: TrendTable,
}

impl LibreLinkUpClient<ReqwestTransport> {
    /// Client backed by a blocking reqwest transport using `config.timeout`.
    pub fn new(config: ClientConfig) -> LluResult<Self> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> LibreLinkUpClient<T> {
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            trends: TrendTable::default(),
        }
    }

    pub fn with_trend_table(mut self, trends: TrendTable) -> Self {
        self.trends = trends;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn negotiate(&self, credentials: &Credentials) -> LluResult<SessionContext> {
        session::negotiate(&self.transport, &self.config, credentials)
    }

    pub fn list_connections(&self, session: &SessionContext) -> LluResult<Vec<Connection>> {
        connections::list_connections(&self.transport, session)
    }

    pub fn find_patient<S: ConnectionSelector + ?Sized>(
        &self,
        session: &SessionContext,
        selector: &S,
    ) -> LluResult<String> {
        connections::find_patient(&self.transport, session, selector)
    }

    pub fn fetch_latest(&self, session: &SessionContext, patient_id: &str) -> LluResult<Reading> {
        reading::fetch_latest(&self.transport, session, patient_id, &self.trends)
    }

    /// Full pipeline: login, pick a connection, return its latest reading.
    pub fn last_reading<S: ConnectionSelector + ?Sized>(
        &self,
        credentials: &Credentials,
        selector: &S,
    ) -> LluResult<(SessionContext, Reading)> {
        let session = self.negotiate(credentials)?;
        let patient_id = self.find_patient(&session, selector)?;
        let reading = self.fetch_latest(&session, &patient_id)?;
        Ok((session, reading))
    }
}
