//! Uniform access to SDK structure members.
//!
//! Members modeled as required are plain values in the generated types and
//! optional members are `Option`s. These traits fold both into `Option` so
//! conversion code reads the same for either.

use aws_sdk_quicksight::types::{IngestionStatus, LogicalTableSource};
use aws_smithy_types::DateTime as SmithyDateTime;

pub(crate) trait FieldValue<T> {
    fn into_field(self) -> Option<T>;
}

impl<T> FieldValue<T> for Option<T> {
    fn into_field(self) -> Option<T> {
        self
    }
}

pub(crate) trait FieldMut<T> {
    fn field_mut(&mut self) -> Option<&mut T>;
}

impl<T> FieldMut<T> for Option<T> {
    fn field_mut(&mut self) -> Option<&mut T> {
        self.as_mut()
    }
}

macro_rules! required_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue<$ty> for $ty {
                fn into_field(self) -> Option<$ty> {
                    Some(self)
                }
            }

            impl FieldMut<$ty> for $ty {
                fn field_mut(&mut self) -> Option<&mut $ty> {
                    Some(self)
                }
            }
        )*
    };
}

required_field!(
    String,
    Vec<String>,
    bool,
    IngestionStatus,
    SmithyDateTime,
    LogicalTableSource
);
