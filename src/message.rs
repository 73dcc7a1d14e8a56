//! The message value model.
//!
//! A [`Message`] is an opaque application value: a scalar, an ordered tuple
//! of values, or a key-value mapping. Mailboxes never interpret message
//! content except through the pattern matcher.

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A map-shaped message payload.
pub type MessageMap = FxHashMap<String, Message>;

/// An opaque message value.
///
/// Messages are cheap to construct from the usual scalar types:
///
/// ```
/// use courier::{msg, Message};
///
/// let scalar: Message = 5.into();
/// let tuple = msg!["sum", 5, 2];
/// let map = Message::map([("command".to_owned(), "exit".into())]);
/// # let _ = (scalar, tuple, map);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// The unit value, also used for JSON ``null``.
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Message>),
    Map(MessageMap),
}

impl Message {
    /// Build a tuple message from its elements.
    pub fn tuple(elements: impl IntoIterator<Item = Message>) -> Self {
        Self::Tuple(elements.into_iter().collect())
    }

    /// Build a map message from key-value pairs.
    pub fn map(entries: impl IntoIterator<Item = (String, Message)>) -> Self {
        Self::Map(MessageMap::from_iter(entries))
    }

    /// View this message as a tuple of elements.
    ///
    /// A non-tuple scalar is viewed as a 1-tuple of itself. This is the
    /// normalisation the matcher compares arities with.
    pub fn as_elements(&self) -> &[Message] {
        match self {
            Self::Tuple(elements) => elements,
            other => std::slice::from_ref(other),
        }
    }
}

macro_rules! expand_from_scalars {
    (
        $($variant:ident($source:ty)),*$(,)?
    ) => {
        $(
            impl From<$source> for Message {
                fn from(value: $source) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    }
}

expand_from_scalars!(
    Bool(bool),
    Int(i64),
    Int(i32),
    Int(u32),
    Float(f64),
);

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<()> for Message {
    fn from(_: ()) -> Self {
        Self::Nil
    }
}

impl From<Vec<Message>> for Message {
    fn from(elements: Vec<Message>) -> Self {
        Self::Tuple(elements)
    }
}

impl From<MessageMap> for Message {
    fn from(map: MessageMap) -> Self {
        Self::Map(map)
    }
}

impl From<serde_json::Value> for Message {
    /// Lift a JSON value into a message. Arrays become tuples; numbers
    /// outside the ``i64`` range fall back to floats.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Nil,
            serde_json::Value::Bool(value) => Self::Bool(value),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_f64().map(Self::Float))
                .unwrap_or(Self::Nil),
            serde_json::Value::String(value) => Self::Str(value),
            serde_json::Value::Array(values) => {
                Self::Tuple(values.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(entries) => Self::Map(MessageMap::from_iter(
                entries.into_iter().map(|(key, value)| (key, value.into())),
            )),
        }
    }
}

/// Build a tuple [`Message`] from a list of values convertible to messages.
#[macro_export]
macro_rules! msg {
    ($($element:expr),*$(,)?) => {
        $crate::Message::Tuple(vec![$($crate::Message::from($element)),*])
    };
}
