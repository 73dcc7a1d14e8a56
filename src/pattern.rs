//! Structural pattern matching against [`Message`]s.
//!
//! A [`Pattern`] is an ordered list of elements, each a literal value (match
//! by equality), a [`TypeTag`] (match by shape, capturing the value), a
//! nested tuple pattern, or a mapping pattern (subset check, recursive).
//! Matching is a pure function of the pattern and the message; it holds no
//! state and is safe to call from any number of tasks at once.
//!
//! ```
//! use courier::{msg, pattern, Message, TypeTag};
//!
//! let pattern = pattern!["sum", TypeTag::Int, TypeTag::Int];
//! let captures = pattern.matches(&msg!["sum", 5, 2]).expect("Should match.");
//! assert_eq!(captures, vec![Message::Int(5), Message::Int(2)]);
//! ```

use crate::message::Message;

/// A type tag, matching any message value of the given shape and capturing
/// it.
///
/// [`TypeTag::Any`] is the wildcard: it matches any value at all. This is
/// most useful for capturing a sender handle or an arbitrary payload slot
/// inside an otherwise literal pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeTag {
    Any,
    Bool,
    Int,
    Float,
    Str,
    Tuple,
    Map,
}

impl TypeTag {
    /// Check whether the message value is of this shape.
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Self::Any => true,
            Self::Bool => matches!(message, Message::Bool(_)),
            Self::Int => matches!(message, Message::Int(_)),
            Self::Float => matches!(message, Message::Float(_)),
            Self::Str => matches!(message, Message::Str(_)),
            Self::Tuple => matches!(message, Message::Tuple(_)),
            Self::Map => matches!(message, Message::Map(_)),
        }
    }
}

/// One element of a [`Pattern`].
#[derive(Clone, Debug, PartialEq)]
pub enum PatternElement {
    /// Match by value equality; captures nothing.
    Literal(Message),
    /// Match by shape; captures the matched value.
    Capture(TypeTag),
    /// Match a tuple element-wise; arities must agree. Captures from the
    /// sub-patterns are flattened in element order.
    Tuple(Vec<PatternElement>),
    /// Match a mapping by subset: every key listed here must exist in the
    /// message map and its sub-pattern must match the value there. Extra
    /// keys in the message are ignored. Captures are flattened in the order
    /// the keys are listed here.
    Map(Vec<(String, PatternElement)>),
}

impl PatternElement {
    /// Build a nested tuple pattern element.
    pub fn tuple(elements: impl IntoIterator<Item = PatternElement>) -> Self {
        Self::Tuple(elements.into_iter().collect())
    }

    /// Build a mapping pattern element from key/sub-pattern pairs.
    pub fn map(entries: impl IntoIterator<Item = (String, PatternElement)>) -> Self {
        Self::Map(entries.into_iter().collect())
    }

    /// Match this element against one message value, appending any captured
    /// values to `captures`.
    ///
    /// On failure, `captures` may hold values from earlier recursion steps;
    /// [`Pattern::matches`] discards the whole buffer in that case, so no
    /// partial capture is ever exposed.
    fn matches_value(&self, value: &Message, captures: &mut Vec<Message>) -> bool {
        match self {
            Self::Literal(literal) => literal == value,
            Self::Capture(tag) => {
                if tag.matches(value) {
                    captures.push(value.clone());
                    true
                } else {
                    false
                }
            }
            Self::Tuple(elements) => {
                let Message::Tuple(values) = value else {
                    return false;
                };
                elements.len() == values.len()
                    && elements
                        .iter()
                        .zip(values)
                        .all(|(element, value)| element.matches_value(value, captures))
            }
            Self::Map(entries) => {
                let Message::Map(map) = value else {
                    return false;
                };
                entries.iter().all(|(key, element)| {
                    map.get(key)
                        .map(|value| element.matches_value(value, captures))
                        .unwrap_or(false)
                })
            }
        }
    }
}

macro_rules! expand_literal_elements {
    ($($source:ty),*$(,)?) => {
        $(
            impl From<$source> for PatternElement {
                fn from(value: $source) -> Self {
                    Self::Literal(Message::from(value))
                }
            }
        )*
    }
}

expand_literal_elements!(bool, i32, i64, u32, f64, &str, String, ());

impl From<Message> for PatternElement {
    fn from(message: Message) -> Self {
        Self::Literal(message)
    }
}

impl From<TypeTag> for PatternElement {
    fn from(tag: TypeTag) -> Self {
        Self::Capture(tag)
    }
}

/// An ordered sequence of pattern elements, offered against one message at a
/// time during a receive pass.
///
/// The empty pattern is the catch-all: it matches any message and captures
/// nothing. Any other pattern must agree in arity with the message once the
/// message is normalised to a tuple (a scalar counts as a 1-tuple).
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Pattern {
    elements: Vec<PatternElement>,
}

impl Pattern {
    /// The catch-all pattern, matching every message.
    pub fn catch_all() -> Self {
        Self::default()
    }

    /// Create a pattern from its elements.
    pub fn from_vec(elements: Vec<PatternElement>) -> Self {
        Self { elements }
    }

    /// The elements of this pattern.
    pub fn elements(&self) -> &[PatternElement] {
        &self.elements
    }

    /// Match this pattern against a message.
    ///
    /// Returns the captured values in pattern-element order, or [`None`] if
    /// the message does not match. `Some(vec![])` means "matched, nothing
    /// captured" and is distinct from no match.
    pub fn matches(&self, message: &Message) -> Option<Vec<Message>> {
        if self.elements.is_empty() {
            return Some(Vec::new());
        }

        let values = message.as_elements();
        if self.elements.len() != values.len() {
            return None;
        }

        let mut captures = Vec::new();
        self.elements
            .iter()
            .zip(values)
            .all(|(element, value)| element.matches_value(value, &mut captures))
            .then_some(captures)
    }
}

/// Build a [`Pattern`] from a list of literals and [`TypeTag`]s.
///
/// `pattern![]` is the catch-all.
#[macro_export]
macro_rules! pattern {
    () => {
        $crate::Pattern::catch_all()
    };
    ($($element:expr),+$(,)?) => {
        $crate::Pattern::from_vec(vec![$($crate::PatternElement::from($element)),+])
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::msg;

    #[test]
    fn catch_all_matches_everything() {
        for message in [
            Message::from(5),
            Message::from("reload"),
            msg![true, 2.5],
            Message::map([("a".to_owned(), 1.into())]),
        ] {
            assert_eq!(pattern![].matches(&message), Some(vec![]));
        }
    }

    #[test]
    fn type_tags_capture_matched_values() {
        let pattern = pattern!["sum", TypeTag::Int, TypeTag::Int];

        assert_eq!(
            pattern.matches(&msg!["sum", 5, 2]),
            Some(vec![Message::Int(5), Message::Int(2)])
        );
        // One element of the wrong shape fails the whole match.
        assert_eq!(pattern.matches(&msg!["sum", 5, "two"]), None);
    }

    #[test]
    fn arity_mismatch_never_matches() {
        let pattern = pattern![TypeTag::Int, TypeTag::Int];

        assert_eq!(pattern.matches(&msg![1, 2, 3]), None);
        assert_eq!(pattern.matches(&Message::from(1)), None);
    }

    #[test]
    fn literals_match_by_equality() {
        let pattern = pattern!["reload", 5];

        assert_eq!(pattern.matches(&msg!["reload", 5]), Some(vec![]));
        assert_eq!(pattern.matches(&msg!["reload", 6]), None);
    }

    #[test]
    fn scalar_messages_match_one_element_patterns() {
        assert_eq!(
            pattern![TypeTag::Int].matches(&Message::from(42)),
            Some(vec![Message::Int(42)])
        );
        assert_eq!(pattern![5].matches(&Message::from(5)), Some(vec![]));
    }

    #[test]
    fn map_patterns_are_subset_checks() {
        let message = Message::map([
            ("a".to_owned(), 1.into()),
            ("b".to_owned(), 2.into()),
        ]);

        let subset = pattern![PatternElement::map([(
            "a".to_owned(),
            PatternElement::from(1)
        )])];
        assert_eq!(subset.matches(&message), Some(vec![]));

        let excess = pattern![PatternElement::map([
            ("a".to_owned(), PatternElement::from(1)),
            ("c".to_owned(), PatternElement::from(3)),
        ])];
        assert_eq!(excess.matches(&message), None);
    }

    #[test]
    fn nested_map_patterns_capture_in_key_order() {
        let message = Message::map([(
            "values".to_owned(),
            msg![2, 42],
        )]);

        let pattern = pattern![PatternElement::map([(
            "values".to_owned(),
            PatternElement::tuple([PatternElement::from(2), TypeTag::Int.into()]),
        )])];

        assert_eq!(pattern.matches(&message), Some(vec![Message::Int(42)]));
    }

    #[test]
    fn any_tag_captures_arbitrary_values() {
        let pattern = pattern!["work", TypeTag::Any];

        assert_eq!(
            pattern.matches(&msg!["work", msg![1, 2]]),
            Some(vec![msg![1, 2]])
        );
    }

    #[test]
    fn matching_is_pure() {
        let pattern = pattern![TypeTag::Str, TypeTag::Int];
        let message = msg!["attempts", 3];

        assert_eq!(pattern.matches(&message), pattern.matches(&message));
        assert_eq!(message, msg!["attempts", 3]);
    }
}
