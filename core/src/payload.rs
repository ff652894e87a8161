//! Request payloads and their encoding into bodies or query segments.
//!
//! # Design
//! A payload's shape is decided once, when the caller's value is converted
//! into a `Payload`, rather than inspected at send time. Encoding then
//! becomes a plain match over a closed set of variants:
//!
//! | variant   | POST/PUT body                                  | GET/DELETE query        |
//! |-----------|------------------------------------------------|-------------------------|
//! | `Empty`   | empty                                          | nothing added           |
//! | `Text`    | raw bytes                                      | one raw segment         |
//! | `Bytes`   | passed through                                 | unsupported             |
//! | `Reader`  | drained in full                                | unsupported             |
//! | `Integer` | fixed-width big-endian                         | unsupported             |
//! | `Form`    | JSON if declared, else `k=v&k=v`               | one `k=v` per entry     |
//! | `Json`    | JSON if declared, else `k=v&k=v` for objects   | one `k=v` for objects   |

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{RequestError, Result};
use crate::http::HttpMethod;

/// A fixed-width integer payload, sent as its big-endian encoding.
///
/// The width comes from the Rust type, so an unsuffixed literal such as
/// `post(url, 5)` is an `i32` and sends 4 bytes. Use `i64` (or `isize`,
/// which is always widened to 8 bytes) for a platform-`int` sized body:
/// `post(url, 5i64)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integer {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

impl Integer {
    pub fn to_be_bytes(self) -> Vec<u8> {
        match self {
            Integer::I8(v) => v.to_be_bytes().to_vec(),
            Integer::I16(v) => v.to_be_bytes().to_vec(),
            Integer::I32(v) => v.to_be_bytes().to_vec(),
            Integer::I64(v) => v.to_be_bytes().to_vec(),
            Integer::U8(v) => v.to_be_bytes().to_vec(),
            Integer::U16(v) => v.to_be_bytes().to_vec(),
            Integer::U32(v) => v.to_be_bytes().to_vec(),
            Integer::U64(v) => v.to_be_bytes().to_vec(),
        }
    }
}

/// Data supplied to a verb call.
pub enum Payload {
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Reader(Box<dyn Read + Send>),
    Integer(Integer),
    Form(Map<String, Value>),
    Json(Value),
}

impl Payload {
    /// Serialize any value into a `Json` payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Payload::Json)
            .map_err(|e| RequestError::Serialization(e.to_string()))
    }

    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Payload::Reader(Box::new(reader))
    }

    /// Short name of the variant, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Text(_) => "text",
            Payload::Bytes(_) => "bytes",
            Payload::Reader(_) => "reader",
            Payload::Integer(_) => "integer",
            Payload::Form(_) => "form",
            Payload::Json(_) => "json",
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Payload::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Payload::Reader(_) => f.write_str("Reader(..)"),
            Payload::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Payload::Form(m) => f.debug_tuple("Form").field(m).finish(),
            Payload::Json(v) => f.debug_tuple("Json").field(v).finish(),
        }
    }
}

/// How form pairs built from a mapping are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormEncoding {
    /// Keys and values are written verbatim, with no escaping.
    #[default]
    Raw,
    /// Keys and values are `application/x-www-form-urlencoded` escaped.
    Percent,
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(b)
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Payload::Bytes(b.to_vec())
    }
}

macro_rules! integer_payload {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Payload {
                fn from(v: $ty) -> Self {
                    Payload::Integer(Integer::$variant(v as _))
                }
            }
        )*
    };
}

integer_payload! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => U64,
}

impl From<Integer> for Payload {
    fn from(v: Integer) -> Self {
        Payload::Integer(v)
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Payload::Empty,
            Value::String(s) => Payload::Text(s),
            Value::Object(m) => Payload::Form(m),
            other => Payload::Json(other),
        }
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(m: Map<String, Value>) -> Self {
        Payload::Form(m)
    }
}

impl From<HashMap<String, String>> for Payload {
    fn from(m: HashMap<String, String>) -> Self {
        Payload::Form(m.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
    }
}

impl From<BTreeMap<String, String>> for Payload {
    fn from(m: BTreeMap<String, String>) -> Self {
        Payload::Form(m.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Payload::Empty)
    }
}

/// Encode `payload` as a request body for `method`.
///
/// Returns `None` for GET and DELETE whatever the payload is.
pub fn encode_body(
    method: HttpMethod,
    payload: Payload,
    json_declared: bool,
    encoding: FormEncoding,
) -> Result<Option<Vec<u8>>> {
    if !method.sends_body() {
        return Ok(None);
    }

    let body = match payload {
        Payload::Empty => Vec::new(),
        Payload::Text(s) => s.into_bytes(),
        Payload::Bytes(b) => b,
        Payload::Reader(mut r) => {
            let mut buf = Vec::new();
            r.read_to_end(&mut buf)?;
            buf
        }
        Payload::Integer(i) => i.to_be_bytes(),
        Payload::Form(m) if json_declared => to_json(&m)?,
        Payload::Json(v) if json_declared => to_json(&v)?,
        Payload::Form(m) | Payload::Json(Value::Object(m)) => {
            form_pairs(&m, encoding)?.join("&").into_bytes()
        }
        Payload::Json(_) => return Err(RequestError::UnsupportedPayload("non-object json without a json content type")),
    };
    Ok(Some(body))
}

/// Query segments contributed by `payload` on a GET or DELETE.
pub fn query_segments(payload: Payload, encoding: FormEncoding) -> Result<Vec<String>> {
    match payload {
        Payload::Empty => Ok(Vec::new()),
        Payload::Text(s) if s.is_empty() => Ok(Vec::new()),
        Payload::Text(s) => Ok(vec![s]),
        Payload::Form(m) | Payload::Json(Value::Object(m)) => form_pairs(&m, encoding),
        other => Err(RequestError::UnsupportedPayload(match other {
            Payload::Bytes(_) => "bytes in a query string",
            Payload::Reader(_) => "reader in a query string",
            Payload::Integer(_) => "integer in a query string",
            _ => "non-object json in a query string",
        })),
    }
}

/// Render each entry as `key=value`. String values are used as-is, anything
/// else is JSON-serialized first.
fn form_pairs(map: &Map<String, Value>, encoding: FormEncoding) -> Result<Vec<String>> {
    map.iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => String::from_utf8(to_json(other)?)
                    .map_err(|e| RequestError::Serialization(e.to_string()))?,
            };
            Ok(match encoding {
                FormEncoding::Raw => format!("{k}={value}"),
                FormEncoding::Percent => format!("{}={}", escape(k), escape(&value)),
            })
        })
        .collect()
}

fn escape(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| RequestError::Serialization(e.to_string()))
}
