use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of mutations that can be queued offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    StartSession,
    EndSession,
    UpdateSession,
    CreateClient,
    UpdateClient,
    CreateBillingRate,
    CreateInvoice,
    DeleteInvoice,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        ActionKind::StartSession,
        ActionKind::EndSession,
        ActionKind::UpdateSession,
        ActionKind::CreateClient,
        ActionKind::UpdateClient,
        ActionKind::CreateBillingRate,
        ActionKind::CreateInvoice,
        ActionKind::DeleteInvoice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::StartSession => "START_SESSION",
            ActionKind::EndSession => "END_SESSION",
            ActionKind::UpdateSession => "UPDATE_SESSION",
            ActionKind::CreateClient => "CREATE_CLIENT",
            ActionKind::UpdateClient => "UPDATE_CLIENT",
            ActionKind::CreateBillingRate => "CREATE_BILLING_RATE",
            ActionKind::CreateInvoice => "CREATE_INVOICE",
            ActionKind::DeleteInvoice => "DELETE_INVOICE",
        }
    }

    /// Kinds whose success yields a server-assigned id for a placeholder.
    pub fn creates_entity(&self) -> bool {
        matches!(
            self,
            ActionKind::StartSession | ActionKind::CreateClient | ActionKind::CreateInvoice
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown action type: {s}"))
    }
}
