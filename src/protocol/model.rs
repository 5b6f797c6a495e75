//! # Operation Models
//!
//! The eight typed operations and their positional payload layouts. Every
//! payload is a heterogeneous sequence handed to the active codec as one
//! value; Ping and Pong carry no payload at all.
//!
//! | Kind         | Layout                                                        |
//! |--------------|---------------------------------------------------------------|
//! | Handshake    | `[session_id, encrypt_key?, auth_token?]`                     |
//! | HandshakeAck | `[connection_id: u32, server_session_id]`                     |
//! | Disconnect   | `[reason: u8, message?]`                                      |
//! | Request      | `[operation_code, parameters?, request_id: u16]`              |
//! | Response     | `[operation_code, parameters?, response_id: u16, return_code: i16, debug_message?]` |
//! | Event        | `[event_code, parameters?]`                                   |
//!
//! `?` marks positions that encode as null when absent.

use crate::core::header::OperationKind;
use crate::error::{constants, ProtocolError, Result};
use crate::serialization::value::{Map, Parameters, Value};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DisconnectReason {
    ClientDisconnect = 0,
    ServerDisconnect = 1,
    Timeout = 2,
    ProtocolViolation = 3,
    AuthenticationFailed = 4,
    ServerShutdown = 5,
    Kicked = 6,
}

impl DisconnectReason {
    pub fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            0 => DisconnectReason::ClientDisconnect,
            1 => DisconnectReason::ServerDisconnect,
            2 => DisconnectReason::Timeout,
            3 => DisconnectReason::ProtocolViolation,
            4 => DisconnectReason::AuthenticationFailed,
            5 => DisconnectReason::ServerShutdown,
            6 => DisconnectReason::Kicked,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeModel {
    pub session_id: String,
    pub encrypt_key: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeAckModel {
    pub connection_id: u32,
    pub server_session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectModel {
    pub reason: DisconnectReason,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestModel {
    pub operation_code: String,
    pub parameters: Option<Parameters>,
    pub request_id: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseModel {
    pub operation_code: String,
    pub parameters: Option<Parameters>,
    pub response_id: u16,
    pub return_code: i16,
    pub debug_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventModel {
    pub event_code: String,
    pub parameters: Option<Parameters>,
}

/// A typed operation, one variant per [`OperationKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum OperationModel {
    Ping,
    Pong,
    Handshake(HandshakeModel),
    HandshakeAck(HandshakeAckModel),
    Disconnect(DisconnectModel),
    Request(RequestModel),
    Response(ResponseModel),
    Event(EventModel),
}

macro_rules! impl_from_model {
    ($($model:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$model> for OperationModel {
                fn from(model: $model) -> Self {
                    OperationModel::$variant(model)
                }
            }
        )*
    };
}

impl_from_model!(
    HandshakeModel => Handshake,
    HandshakeAckModel => HandshakeAck,
    DisconnectModel => Disconnect,
    RequestModel => Request,
    ResponseModel => Response,
    EventModel => Event,
);

fn parameters_equivalent(a: &Option<Parameters>, b: &Option<Parameters>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|((k1, v1), (k2, v2))| k1 == k2 && v1.equivalent(v2))
        }
        _ => false,
    }
}

fn parameters_value(parameters: &Option<Parameters>) -> Value {
    parameters
        .as_ref()
        .map_or(Value::Null, |p| Value::Map(Map::from_parameters(p)))
}

impl OperationModel {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationModel::Ping => OperationKind::Ping,
            OperationModel::Pong => OperationKind::Pong,
            OperationModel::Handshake(_) => OperationKind::Handshake,
            OperationModel::HandshakeAck(_) => OperationKind::HandshakeAck,
            OperationModel::Disconnect(_) => OperationKind::Disconnect,
            OperationModel::Request(_) => OperationKind::Request,
            OperationModel::Response(_) => OperationKind::Response,
            OperationModel::Event(_) => OperationKind::Event,
        }
    }

    /// Equality up to what a codec round-trip preserves.
    ///
    /// Parameter values are compared with [`Value::equivalent`]; every other
    /// field must match exactly. A frame written with either codec decodes
    /// to a model equivalent to the one written.
    pub fn equivalent(&self, other: &OperationModel) -> bool {
        match (self, other) {
            (OperationModel::Request(a), OperationModel::Request(b)) => {
                a.operation_code == b.operation_code
                    && a.request_id == b.request_id
                    && parameters_equivalent(&a.parameters, &b.parameters)
            }
            (OperationModel::Response(a), OperationModel::Response(b)) => {
                a.operation_code == b.operation_code
                    && a.response_id == b.response_id
                    && a.return_code == b.return_code
                    && a.debug_message == b.debug_message
                    && parameters_equivalent(&a.parameters, &b.parameters)
            }
            (OperationModel::Event(a), OperationModel::Event(b)) => {
                a.event_code == b.event_code
                    && parameters_equivalent(&a.parameters, &b.parameters)
            }
            _ => self == other,
        }
    }

    /// The positional tuple for this operation, or `None` for Ping/Pong.
    pub fn to_payload(&self) -> Option<Value> {
        let fields = match self {
            OperationModel::Ping | OperationModel::Pong => return None,
            OperationModel::Handshake(m) => vec![
                Value::from(m.session_id.as_str()),
                Value::from(m.encrypt_key.clone()),
                Value::from(m.auth_token.clone()),
            ],
            OperationModel::HandshakeAck(m) => vec![
                Value::U32(m.connection_id),
                Value::from(m.server_session_id.as_str()),
            ],
            OperationModel::Disconnect(m) => vec![
                Value::U8(m.reason as u8),
                Value::from(m.message.clone()),
            ],
            OperationModel::Request(m) => vec![
                Value::from(m.operation_code.as_str()),
                parameters_value(&m.parameters),
                Value::U16(m.request_id),
            ],
            OperationModel::Response(m) => vec![
                Value::from(m.operation_code.as_str()),
                parameters_value(&m.parameters),
                Value::U16(m.response_id),
                Value::I16(m.return_code),
                Value::from(m.debug_message.clone()),
            ],
            OperationModel::Event(m) => vec![
                Value::from(m.event_code.as_str()),
                parameters_value(&m.parameters),
            ],
        };
        Some(Value::List(fields))
    }

    /// Rebuilds a model of `kind` from a decoded payload.
    ///
    /// Fails when the payload presence, arity or any field type does not
    /// match the layout of `kind`.
    pub fn from_payload(kind: OperationKind, payload: Option<Value>) -> Result<Self> {
        if !kind.has_payload() {
            return match payload {
                None => Ok(if kind == OperationKind::Ping {
                    OperationModel::Ping
                } else {
                    OperationModel::Pong
                }),
                Some(_) => Err(ProtocolError::malformed(constants::ERR_UNEXPECTED_PAYLOAD)),
            };
        }

        let items = match payload {
            None => return Err(ProtocolError::malformed(constants::ERR_MISSING_PAYLOAD)),
            Some(Value::List(items)) => items,
            Some(_) => return Err(ProtocolError::malformed(constants::ERR_NOT_A_TUPLE)),
        };

        let model = match kind {
            OperationKind::Handshake => {
                let mut f = Fields::new(kind, items, 3)?;
                HandshakeModel {
                    session_id: f.string()?,
                    encrypt_key: f.opt_string()?,
                    auth_token: f.opt_string()?,
                }
                .into()
            }
            OperationKind::HandshakeAck => {
                let mut f = Fields::new(kind, items, 2)?;
                HandshakeAckModel {
                    connection_id: f.unsigned()?,
                    server_session_id: f.string()?,
                }
                .into()
            }
            OperationKind::Disconnect => {
                let mut f = Fields::new(kind, items, 2)?;
                let code: u8 = f.unsigned()?;
                let reason = DisconnectReason::from_u8(code)
                    .ok_or_else(|| f.error(format!("unknown disconnect reason {code}")))?;
                DisconnectModel {
                    reason,
                    message: f.opt_string()?,
                }
                .into()
            }
            OperationKind::Request => {
                let mut f = Fields::new(kind, items, 3)?;
                RequestModel {
                    operation_code: f.string()?,
                    parameters: f.parameters()?,
                    request_id: f.unsigned()?,
                }
                .into()
            }
            OperationKind::Response => {
                let mut f = Fields::new(kind, items, 5)?;
                ResponseModel {
                    operation_code: f.string()?,
                    parameters: f.parameters()?,
                    response_id: f.unsigned()?,
                    return_code: f.signed()?,
                    debug_message: f.opt_string()?,
                }
                .into()
            }
            OperationKind::Event => {
                let mut f = Fields::new(kind, items, 2)?;
                EventModel {
                    event_code: f.string()?,
                    parameters: f.parameters()?,
                }
                .into()
            }
            OperationKind::Ping | OperationKind::Pong => {
                return Err(ProtocolError::malformed(constants::ERR_UNEXPECTED_PAYLOAD))
            }
        };
        Ok(model)
    }
}

/// Positional reader over a decoded tuple.
struct Fields {
    kind: OperationKind,
    items: std::vec::IntoIter<Value>,
    index: usize,
}

impl Fields {
    fn new(kind: OperationKind, items: Vec<Value>, arity: usize) -> Result<Self> {
        if items.len() != arity {
            return Err(ProtocolError::Malformed(format!(
                "{kind} expects {arity} fields, got {}",
                items.len()
            )));
        }
        Ok(Self {
            kind,
            items: items.into_iter(),
            index: 0,
        })
    }

    fn error(&self, msg: impl Display) -> ProtocolError {
        ProtocolError::Malformed(format!("{} field {}: {msg}", self.kind, self.index))
    }

    fn next(&mut self) -> Result<Value> {
        self.index += 1;
        self.items
            .next()
            .ok_or_else(|| self.error(constants::ERR_UNEXPECTED_EOF))
    }

    fn mismatch(&self, expected: &str, found: &Value) -> ProtocolError {
        self.error(format_args!("expected {expected}, found {}", found.kind()))
    }

    fn string(&mut self) -> Result<String> {
        match self.next()? {
            Value::String(s) => Ok(s),
            other => Err(self.mismatch("String", &other)),
        }
    }

    fn opt_string(&mut self) -> Result<Option<String>> {
        match self.next()? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(self.mismatch("String or Null", &other)),
        }
    }

    fn parameters(&mut self) -> Result<Option<Parameters>> {
        match self.next()? {
            Value::Null => Ok(None),
            Value::Map(map) => map
                .into_parameters()
                .map(Some)
                .map_err(|e| self.error(e)),
            other => Err(self.mismatch("Map or Null", &other)),
        }
    }

    /// Accepts any integer encoding that fits `T`, since MessagePack
    /// decodes to the narrowest width.
    fn unsigned<T: TryFrom<u64>>(&mut self) -> Result<T> {
        let value = self.next()?;
        value
            .as_u64()
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| self.mismatch(std::any::type_name::<T>(), &value))
    }

    fn signed<T: TryFrom<i64>>(&mut self) -> Result<T> {
        let value = self.next()?;
        value
            .as_i64()
            .and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| self.mismatch(std::any::type_name::<T>(), &value))
    }
}
