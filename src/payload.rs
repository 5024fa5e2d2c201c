//! Decides whether a value is shipped as a text payload or as a structured JSON payload.
//!
//! Anything that ends up as a string starting with `{` and ending with `}` that parses as a JSON
//! object becomes [`Payload::Structured`]. Everything else, including strings that merely look
//! like JSON, is sent verbatim as [`Payload::Text`].
//!
//! ```
//! use cflog::{classify, Json, Payload};
//! use serde_json::json;
//!
//! assert_eq!(classify("plain").unwrap(), Payload::Text("plain".to_string()));
//! assert!(classify(r#"{"message": "json string"}"#).unwrap().is_structured());
//! assert!(classify(&Json(json!({"message": "json value"}))).unwrap().is_structured());
//! assert_eq!(classify(&None::<&str>).unwrap(), Payload::Text(String::new()));
//! ```

use std::borrow::Cow;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;

/// The body of a log entry. Exactly one of the two ends up in the entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Text(String),
    Structured(Map<String, Value>),
}

impl Payload {
    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Structured(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s.as_str()),
            Payload::Structured(_) => None,
        }
    }
}

/// The shapes a loggable value can take before classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Text(Cow<'a, str>),
    /// Decoded as UTF-8, invalid sequences are replaced.
    Bytes(Cow<'a, [u8]>),
    /// A value already serialized to its JSON text.
    Document(String),
    /// Nothing to log. Always results in an empty text payload.
    Absent,
}

/// Wraps any [`Serialize`] value so that it is logged as its JSON serialization.
///
/// Records serialize to JSON objects and are therefore logged as structured payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

/// Implemented by everything that can be handed to the loggers.
pub trait Loggable {
    /// # Errors
    ///
    /// Will return [`Error::Serialization`] if the value can not be serialized to JSON.
    fn to_input(&self) -> Result<Input<'_>, Error>;
}

impl Loggable for str {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        Ok(Input::Text(Cow::Borrowed(self)))
    }
}

impl Loggable for String {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        Ok(Input::Text(Cow::Borrowed(self)))
    }
}

impl Loggable for [u8] {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        Ok(Input::Bytes(Cow::Borrowed(self)))
    }
}

impl Loggable for Vec<u8> {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        Ok(Input::Bytes(Cow::Borrowed(self)))
    }
}

impl Loggable for Value {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        Ok(Input::Document(self.to_string()))
    }
}

impl<T: Serialize> Loggable for Json<T> {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        Ok(Input::Document(serde_json::to_string(&self.0)?))
    }
}

impl<T: Loggable> Loggable for Option<T> {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        match self {
            Some(value) => value.to_input(),
            None => Ok(Input::Absent),
        }
    }
}

impl Loggable for Payload {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        match self {
            Payload::Text(s) => Ok(Input::Text(Cow::Borrowed(s))),
            Payload::Structured(map) => Ok(Input::Document(serde_json::to_string(map)?)),
        }
    }
}

impl Loggable for Input<'_> {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        Ok(match self {
            Input::Text(s) => Input::Text(Cow::Borrowed(&**s)),
            Input::Bytes(b) => Input::Bytes(Cow::Borrowed(&**b)),
            Input::Document(s) => Input::Document(s.clone()),
            Input::Absent => Input::Absent,
        })
    }
}

impl<T: Loggable + ?Sized> Loggable for &T {
    fn to_input(&self) -> Result<Input<'_>, Error> {
        (**self).to_input()
    }
}

/// Classifies `value` into a text or structured payload.
///
/// # Errors
///
/// Will return [`Error::Serialization`] only if the value can not be serialized. Malformed JSON
/// text never fails, it is logged as text.
pub fn classify<L: Loggable + ?Sized>(value: &L) -> Result<Payload, Error> {
    Ok(classify_input(value.to_input()?))
}

/// Classifies an already converted [`Input`].
pub fn classify_input(input: Input<'_>) -> Payload {
    let s = match input {
        Input::Text(s) => s,
        Input::Bytes(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
        Input::Document(s) => Cow::Owned(s),
        Input::Absent => return Payload::Text(String::new()),
    };

    // No trimming, leading or trailing whitespace keeps a document a text payload.
    if s.starts_with('{') && s.ends_with('}') {
        if let Ok(document) = serde_json::from_str::<Map<String, Value>>(&s) {
            return Payload::Structured(document);
        }
    }

    Payload::Text(s.into_owned())
}
