use std::any::{self, Any};
use std::sync::Arc;
use std::time::Instant;

use super::{NamespacedKey, StaleTime};
use crate::error::{GlobalError, Result};

pub(crate) type Data = Arc<dyn Any + Send + Sync>;

/// A single stored value. `data == None` is an entry seeded with null.
pub(crate) struct Entry {
    data: Option<Data>,
    type_name: &'static str,
    updated_at: Instant,
    invalidated: bool,
}

impl Entry {
    pub(crate) fn new<T>(value: Option<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            data: value.map(|v| Arc::new(v) as Data),
            type_name: any::type_name::<T>(),
            updated_at: Instant::now(),
            invalidated: false,
        }
    }

    /// Clone the stored value out as `T`.
    pub(crate) fn read<T>(&self, key: &NamespacedKey) -> Result<Option<T>>
    where
        T: Clone + 'static,
    {
        let Some(data) = &self.data else {
            return Ok(None);
        };
        data.downcast_ref::<T>()
            .map(|value| Some(value.clone()))
            .ok_or_else(|| GlobalError::TypeMismatch {
                key: key.to_string(),
                expected: any::type_name::<T>(),
                found: self.type_name,
            })
    }

    pub(crate) fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub(crate) fn is_stale(&self, stale_time: StaleTime) -> bool {
        self.invalidated || stale_time.is_elapsed(self.updated_at)
    }
}
