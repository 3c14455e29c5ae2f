use crate::constant::{ColumnOptions, FLOATING_DECIMAL_FRACTION, TypeCode};

/// Column (or output parameter) metadata of a result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub type_code: TypeCode,
    pub options: ColumnOptions,
    /// Declared length, or precision for decimals
    pub length: i16,
    /// Declared scale. [`FLOATING_DECIMAL_FRACTION`] for a DECIMAL without scale.
    pub fraction: i16,
    pub table: String,
    pub schema: String,
    pub name: String,
    pub display_name: String,
}

impl FieldDescriptor {
    pub fn new(type_code: TypeCode, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            type_code,
            options: ColumnOptions::OPTIONAL,
            length: 0,
            fraction: 0,
            table: String::new(),
            schema: String::new(),
            display_name: name.clone(),
            name,
        }
    }

    pub fn with_length(mut self, length: i16) -> Self {
        self.length = length;
        self
    }

    pub fn with_precision_scale(mut self, precision: i16, scale: i16) -> Self {
        self.length = precision;
        self.fraction = scale;
        self
    }

    pub fn with_options(mut self, options: ColumnOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_table(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.schema = schema.into();
        self.table = table.into();
        self
    }

    pub fn nullable(&self) -> bool {
        self.options.contains(ColumnOptions::OPTIONAL)
    }

    /// Declared scale, `None` for floating decimals and non-decimal columns
    pub fn declared_scale(&self) -> Option<u32> {
        if !self.type_code.is_decimal_family() || self.fraction == FLOATING_DECIMAL_FRACTION {
            return None;
        }
        u32::try_from(self.fraction).ok()
    }

    /// `(length, true)` for variable-length columns, `(0, false)` otherwise
    pub fn length(&self) -> (i64, bool) {
        if self.type_code.is_variable_length() {
            (i64::from(self.length), true)
        } else {
            (0, false)
        }
    }

    /// `(precision, scale, true)` for decimal columns, `(0, 0, false)` otherwise.
    ///
    /// A DECIMAL without declared scale reports the maximum precision and scale.
    pub fn precision_scale(&self) -> (i64, i64, bool) {
        if !self.type_code.is_decimal_family() {
            return (0, 0, false);
        }
        if self.fraction == FLOATING_DECIMAL_FRACTION {
            return (34, 32767, true);
        }
        (i64::from(self.length), i64::from(self.fraction), true)
    }
}
