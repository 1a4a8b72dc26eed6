//! Newtype ids for COCO records.
//!
//! Ids are 1-based positions within one export run, so each type can be
//! built straight from a zero-based index.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! coco_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Id of the item at zero-based `index`.
            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(index as u64 + 1)
            }

            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

coco_id!(
    /// Id of an image record.
    ImageId
);
coco_id!(
    /// Id of an annotation record.
    AnnotationId
);
coco_id!(
    /// Id of a category; also the class value matched in multi-category masks.
    CategoryId
);
