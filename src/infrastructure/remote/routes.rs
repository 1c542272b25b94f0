use crate::domain::entities::ActionPayload;
use reqwest::{Method, Url};
use serde_json::Value;

/// One remote call derived from a queued action.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRoute {
    pub method: Method,
    /// Unencoded path segments below the API base URL.
    pub segments: Vec<String>,
    pub body: Option<Value>,
}

impl RemoteRoute {
    pub fn for_payload(payload: &ActionPayload) -> Result<Self, serde_json::Error> {
        let (method, segments, path_field) = match payload {
            ActionPayload::StartSession(_) => (Method::POST, owned(&["sessions"]), None),
            ActionPayload::EndSession(p) => (
                Method::POST,
                owned(&["sessions", &p.session_id.to_string(), "end"]),
                Some("sessionId"),
            ),
            ActionPayload::UpdateSession(p) => (
                Method::PATCH,
                owned(&["sessions", &p.session_id.to_string()]),
                Some("sessionId"),
            ),
            ActionPayload::CreateClient(_) => (Method::POST, owned(&["clients"]), None),
            ActionPayload::UpdateClient(p) => (
                Method::PATCH,
                owned(&["clients", p.client_id.as_str()]),
                Some("clientId"),
            ),
            ActionPayload::CreateBillingRate(p) => (
                Method::POST,
                owned(&["clients", p.client_id.as_str(), "billing-rates"]),
                Some("clientId"),
            ),
            ActionPayload::CreateInvoice(_) => (Method::POST, owned(&["invoices"]), None),
            ActionPayload::DeleteInvoice(p) => {
                return Ok(Self {
                    method: Method::DELETE,
                    segments: owned(&["invoices", p.invoice_id.as_str()]),
                    body: None,
                });
            }
        };

        let mut body = payload.remote_body()?;
        if let (Some(field), Value::Object(map)) = (path_field, &mut body) {
            map.remove(field);
        }
        // UPDATE_SESSION sends the update set itself, not the wrapper.
        if let ActionPayload::UpdateSession(p) = payload {
            body = Value::Object(p.updates.clone());
        }

        Ok(Self {
            method,
            segments,
            body: Some(body),
        })
    }

    /// Readable path for logs; not percent-encoded.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Appends the segments to `base`, percent-encoding each one.
    pub fn url(&self, base: &Url) -> Option<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(&self.segments);
        Some(url)
    }
}

fn owned(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}
