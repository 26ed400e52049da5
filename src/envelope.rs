//! Control envelopes understood by the Conveyor message router.
//!
//! These are the only JSON objects this crate produces. Key names are part
//! of the server protocol and must not change. Everything inbound is passed
//! to the caller verbatim, unparsed.

use serde::Serialize;

/// A control or broadcast envelope, tagged by its `action` field.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action")]
pub enum Envelope<'a> {
    /// Application payload fanned out to the channel members
    #[serde(rename = "broadcast-action")]
    Broadcast {
        /// Raw payload, forwarded untouched
        data: &'a str,
    },
    /// Join a named channel
    #[serde(rename = "channel-connect")]
    ChannelConnect {
        /// Channel to join
        channel: &'a str,
    },
    /// Subscribe to one action name within the channel
    #[serde(rename = "add-listener")]
    AddListener {
        /// Action name to listen for
        listen: &'a str,
    },
    /// Associate a user identifier with this connection's descriptor
    #[serde(rename = "assoc-user-to-fd-action")]
    AssocUser {
        /// Server-side user identifier
        #[serde(rename = "userId")]
        user_id: i64,
    },
}

impl Envelope<'_> {
    /// Serialize to the wire representation.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}
