//! Explicit field patches for partial updates.
//!
//! A `Patch` distinguishes "leave the column alone" from "set it to this
//! value", so an absent request field can never overwrite stored data.

use sea_orm::ActiveValue;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Keep,
    Set(T),
}

impl<T> Patch<T> {
    /// Converts into a sea-orm `ActiveValue`: `Keep` leaves the column out of
    /// the UPDATE entirely.
    pub fn into_active_value(self) -> ActiveValue<T>
    where
        T: Into<sea_orm::Value>,
    {
        match self {
            Self::Keep => ActiveValue::NotSet,
            Self::Set(value) => ActiveValue::Set(value),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    /// `Some` becomes `Set`; `None` means the caller did not mention the
    /// field and the stored value is kept.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Set(v),
            None => Self::Keep,
        }
    }
}
