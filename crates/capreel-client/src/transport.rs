use capreel_types::{
    AckResponse, AppendEventsRequest, EventBatch, Session, SessionMetadata, SessionSummary,
    StartSessionRequest, StartSessionResponse,
};

use crate::error::{Error, Result};

/// Reliable request/response channel to the session store.
///
/// Every call is safe to retry: `start_session` creates a fresh session,
/// `send_event_batch` is idempotent per batch id, `end_session` is a no-op
/// the second time. None of the calls are cancellable mid-flight.
pub trait SessionTransport: Send + Sync {
    fn start_session(&self, user_id: &str, metadata: &SessionMetadata) -> Result<String>;

    fn send_event_batch(&self, session_id: &str, batch: &EventBatch) -> Result<()>;

    fn end_session(&self, session_id: &str) -> Result<()>;

    fn fetch_session(&self, session_id: &str) -> Result<Session>;

    fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>>;
}

/// HTTP transport against the capreel REST surface.
pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            agent: ureq::agent(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn map_err(err: ureq::Error, session_id: Option<&str>) -> Error {
    match err {
        ureq::Error::Status(404, _) => {
            Error::SessionNotFound(session_id.unwrap_or("<unknown>").to_string())
        }
        ureq::Error::Status(status, response) => Error::Server {
            status,
            message: response.into_string().unwrap_or_default(),
        },
        other => Error::Transport(other.to_string()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T> {
    response
        .into_json()
        .map_err(|e| Error::Transport(format!("invalid response body: {}", e)))
}

impl SessionTransport for HttpTransport {
    fn start_session(&self, user_id: &str, metadata: &SessionMetadata) -> Result<String> {
        let body = StartSessionRequest {
            user_id: user_id.to_string(),
            metadata: metadata.clone(),
        };
        let response = self
            .agent
            .post(&self.url("/api/sessions/start"))
            .send_json(&body)
            .map_err(|e| map_err(e, None))?;
        let parsed: StartSessionResponse = read_json(response)?;
        Ok(parsed.session_id)
    }

    fn send_event_batch(&self, session_id: &str, batch: &EventBatch) -> Result<()> {
        let body = AppendEventsRequest {
            events: batch.events.clone(),
            batch_id: Some(batch.batch_id.clone()),
        };
        let response = self
            .agent
            .post(&self.url(&format!("/api/sessions/{}/events", session_id)))
            .send_json(&body)
            .map_err(|e| map_err(e, Some(session_id)))?;
        let ack: AckResponse = read_json(response)?;
        if !ack.success {
            return Err(Error::Transport("store did not acknowledge batch".to_string()));
        }
        Ok(())
    }

    fn end_session(&self, session_id: &str) -> Result<()> {
        let response = self
            .agent
            .post(&self.url(&format!("/api/sessions/{}/end", session_id)))
            .call()
            .map_err(|e| map_err(e, Some(session_id)))?;
        let _ack: AckResponse = read_json(response)?;
        Ok(())
    }

    fn fetch_session(&self, session_id: &str) -> Result<Session> {
        let response = self
            .agent
            .get(&self.url(&format!("/api/sessions/{}", session_id)))
            .call()
            .map_err(|e| map_err(e, Some(session_id)))?;
        read_json(response)
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>> {
        let response = self
            .agent
            .get(&self.url(&format!("/api/users/{}/sessions", user_id)))
            .call()
            .map_err(|e| map_err(e, None))?;
        read_json(response)
    }
}
