use std::sync::Arc;

use crate::col::FieldDescriptor;
use crate::error::{Error, Result};
use crate::value::{FromValue, Value};

/// A decoded row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[FieldDescriptor]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[FieldDescriptor]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[FieldDescriptor] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert the value at `idx`
    pub fn get<T: FromValue>(&self, idx: usize) -> Result<T> {
        let value = self.values.get(idx).ok_or_else(|| {
            Error::BadUsageError(format!(
                "column index {idx} out of range for {} columns",
                self.values.len()
            ))
        })?;
        T::from_value(value.clone())
    }

    /// Convert the value of the column named `name`
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> Result<T> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.display_name == name || c.name == name)
            .ok_or_else(|| Error::BadUsageError(format!("no column named {name}")))?;
        self.get(idx)
    }
}
