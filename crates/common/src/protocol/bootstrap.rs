// Bootstrap messages exchanged over window-level `postMessage` to hand out
// the two ends of a dedicated channel. The channel ports travel alongside the
// message in the transfer list, never inside the JSON payload.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role a peer asks for when requesting a sidebar connection. Advisory only:
/// it does not restrict which methods may be called over the channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRole {
    Guest,
    Notebook,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guest => f.write_str("guest"),
            Self::Notebook => f.write_str("notebook"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BootstrapMessage {
    /// Peer → sidebar: please create a channel for me.
    RequestSidebarConnection { role: ConnectionRole },

    /// Sidebar → peer (with role) and sidebar → itself (without role): the
    /// transferred port is one end of the new channel.
    SidebarConnection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        role: Option<ConnectionRole>,
    },
}

impl BootstrapMessage {
    /// Parse a window message; unrelated traffic yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
