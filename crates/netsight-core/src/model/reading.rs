// An attribute value the backend may not know.

use std::fmt;

/// A typed attribute value, or `Unknown` when the backend left it out,
/// sent `null`, or sent one of its "unknown" sentinel strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reading<T> {
    Known(T),
    Unknown,
}

impl<T> Default for Reading<T> {
    fn default() -> Self {
        Self::Unknown
    }
}

impl<T> Reading<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    pub fn as_ref(&self) -> Reading<&T> {
        match self {
            Self::Known(v) => Reading::Known(v),
            Self::Unknown => Reading::Unknown,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Self::Known(v) => Reading::Known(f(v)),
            Self::Unknown => Reading::Unknown,
        }
    }

    /// `self` if known, otherwise `other`.
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Known(_) => self,
            Self::Unknown => other,
        }
    }
}

impl<T> From<Option<T>> for Reading<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unknown, Self::Known)
    }
}

/// Known values print as themselves, unknown ones as `-`.
impl<T: fmt::Display> fmt::Display for Reading<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => v.fmt(f),
            Self::Unknown => f.write_str("-"),
        }
    }
}
