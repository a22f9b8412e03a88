//! Message payloads.

use std::fmt;

/// Content carried by a message.
///
/// The network layer never looks inside; only block code does. The set is
/// closed so that payloads stay plain values that duplicate cleanly on
/// broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// No content (beacons, acks).
    #[default]
    Empty,
    /// A single integer (counters, hop counts, ids).
    Int(i64),
    /// A list of integers (coordinates, distance vectors).
    Ints(Vec<i64>),
    /// Human-readable text.
    Text(String),
    /// Raw bytes.
    Data(Vec<u8>),
}

impl Payload {
    /// The integer value, if this is an `Int` payload.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Payload::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer list, if this is an `Ints` payload.
    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Payload::Ints(v) => Some(v),
            _ => None,
        }
    }

    /// The text, if this is a `Text` payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The bytes, if this is a `Data` payload.
    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Payload::Data(d) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => write!(f, "Empty"),
            Payload::Int(v) => write!(f, "Int({})", v),
            Payload::Ints(v) => write!(f, "Ints({} values)", v.len()),
            Payload::Text(s) => {
                if s.chars().count() > 32 {
                    let head: String = s.chars().take(32).collect();
                    write!(f, "Text(\"{}…\")", head)
                } else {
                    write!(f, "Text({:?})", s)
                }
            }
            Payload::Data(d) => write!(f, "Data({} bytes)", d.len()),
        }
    }
}
