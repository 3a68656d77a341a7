// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire messages exchanged with neighbors.
//!
//! Every message is a single JSON object of the form
//! `{"src": ..., "dst": ..., "type": ..., "msg": ...}`. The envelope fields
//! are decoded first so that a malformed payload can still be answered with a
//! `no route` reply addressed to the sender.

use rdb::error::Error as DatastoreError;
use rdb::{Origin, PathAttributes, Prefix4, Route};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{self, Display, Formatter};
use std::net::Ipv4Addr;

pub const TYPE_UPDATE: &str = "update";
pub const TYPE_REVOKE: &str = "revoke";
pub const TYPE_DATA: &str = "data";
pub const TYPE_DUMP: &str = "dump";
pub const TYPE_TABLE: &str = "table";
pub const TYPE_NO_ROUTE: &str = "no route";

#[derive(thiserror::Error, Debug)]
pub enum MessageConvertError {
    #[error("message is not a json object")]
    NotAnObject,

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("field {0} is not a string")]
    NotAString(&'static str),

    #[error("field {field} is not an ipv4 address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("invalid {typ} payload: {err}")]
    Payload {
        typ: String,
        #[source]
        err: serde_json::Error,
    },
}

/// The addressing and type fields common to every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub typ: String,
}

impl Envelope {
    pub fn decode(value: &Value) -> Result<Self, MessageConvertError> {
        let obj = value.as_object().ok_or(MessageConvertError::NotAnObject)?;

        let field = |name: &'static str| -> Result<&str, MessageConvertError> {
            obj.get(name)
                .ok_or(MessageConvertError::MissingField(name))?
                .as_str()
                .ok_or(MessageConvertError::NotAString(name))
        };

        let address =
            |name: &'static str| -> Result<Ipv4Addr, MessageConvertError> {
                let s = field(name)?;
                s.parse().map_err(|_| MessageConvertError::InvalidAddress {
                    field: name,
                    value: s.to_owned(),
                })
            };

        Ok(Self {
            src: address("src")?,
            dst: address("dst")?,
            typ: field("type")?.to_owned(),
        })
    }
}

/// A route announcement. Field names follow the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    #[serde(rename = "localpref")]
    pub local_pref: u32,
    #[serde(rename = "ASPath")]
    pub as_path: Vec<u32>,
    pub origin: Origin,
    #[serde(rename = "selfOrigin")]
    pub self_origin: bool,
}

impl UpdateMessage {
    pub fn prefix(&self) -> Result<Prefix4, DatastoreError> {
        Prefix4::from_netmask(self.network, self.netmask)
    }

    pub fn attributes(&self) -> PathAttributes {
        PathAttributes {
            origin: self.origin,
            local_pref: self.local_pref,
            as_path: self.as_path.clone(),
            self_origin: self.self_origin,
        }
    }
}

/// One network named by a revoke message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedNetwork {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

impl RevokedNetwork {
    pub fn prefix(&self) -> Result<Prefix4, DatastoreError> {
        Prefix4::from_netmask(self.network, self.netmask)
    }
}

/// One row of a table dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub peer: Ipv4Addr,
}

impl From<&Route> for TableEntry {
    fn from(route: &Route) -> Self {
        Self {
            network: route.prefix.value,
            netmask: route.prefix.netmask(),
            peer: route.peer,
        }
    }
}

/// Echo of the envelope of a message that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoRouteMessage {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    #[serde(rename = "type")]
    pub typ: String,
}

impl From<&Envelope> for NoRouteMessage {
    fn from(envelope: &Envelope) -> Self {
        Self {
            src: envelope.src,
            dst: envelope.dst,
            typ: envelope.typ.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Update(UpdateMessage),
    Revoke(Vec<RevokedNetwork>),
    /// Opaque payload, forwarded untouched.
    Data(Value),
    Dump,
    Table(Vec<TableEntry>),
    NoRoute(NoRouteMessage),
    /// A type this router does not speak.
    Unknown(String),
}

impl Body {
    /// Decode the `msg` payload of a message whose envelope carries `typ`.
    pub fn decode(typ: &str, msg: Value) -> Result<Self, MessageConvertError> {
        let payload = |err| MessageConvertError::Payload {
            typ: typ.to_owned(),
            err,
        };
        Ok(match typ {
            TYPE_UPDATE => {
                Body::Update(serde_json::from_value(msg).map_err(payload)?)
            }
            TYPE_REVOKE => {
                Body::Revoke(serde_json::from_value(msg).map_err(payload)?)
            }
            TYPE_DATA => Body::Data(msg),
            TYPE_DUMP => Body::Dump,
            TYPE_TABLE => {
                Body::Table(serde_json::from_value(msg).map_err(payload)?)
            }
            TYPE_NO_ROUTE => {
                Body::NoRoute(serde_json::from_value(msg).map_err(payload)?)
            }
            other => Body::Unknown(other.to_owned()),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Body::Update(_) => TYPE_UPDATE,
            Body::Revoke(_) => TYPE_REVOKE,
            Body::Data(_) => TYPE_DATA,
            Body::Dump => TYPE_DUMP,
            Body::Table(_) => TYPE_TABLE,
            Body::NoRoute(_) => TYPE_NO_ROUTE,
            Body::Unknown(typ) => typ,
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Body::Update(m) => serde_json::to_value(m),
            Body::Revoke(m) => serde_json::to_value(m),
            Body::Data(m) => Ok(m.clone()),
            Body::Dump | Body::Unknown(_) => Ok(json!({})),
            Body::Table(m) => serde_json::to_value(m),
            Body::NoRoute(m) => serde_json::to_value(m),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub body: Body,
}

impl Message {
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, body: Body) -> Self {
        Self { src, dst, body }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        Ok(json!({
            "src": self.src.to_string(),
            "dst": self.dst.to_string(),
            "type": self.body.kind(),
            "msg": self.body.payload()?,
        }))
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.to_value()?)
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.body.kind(), self.src, self.dst)
    }
}

/// A message on its way to a neighbor. Either one this router built, or one
/// received from another neighbor that is passed along exactly as it arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(Message),
    Forward(Value),
}

impl Outbound {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Outbound::Message(m) => m.to_value(),
            Outbound::Forward(v) => Ok(v.clone()),
        }
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Outbound::Message(m) => m.to_wire(),
            Outbound::Forward(v) => serde_json::to_vec(v),
        }
    }
}

impl From<Message> for Outbound {
    fn from(message: Message) -> Self {
        Outbound::Message(message)
    }
}

impl Display for Outbound {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::Message(m) => m.fmt(f),
            Outbound::Forward(v) => write!(
                f,
                "forwarded {}",
                v.get("type").and_then(Value::as_str).unwrap_or("message")
            ),
        }
    }
}
