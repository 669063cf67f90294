use serde::Serialize;
use tabula_primitives::DataType;

///
/// DataColumn
///
/// Column metadata as exposed to the protocol layer.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DataColumn {
    pub name: String,
    pub data_type: DataType,

    /// One-based position within the exposed column list.
    pub ordinal: usize,
    pub nullable: bool,
    pub size: u32,
    pub precision: u32,
    pub scale: u32,
    pub auto_generated: bool,
    pub default_value: Option<String>,
}

impl DataColumn {
    /// Nullable column with no size information.
    pub fn new(name: impl Into<String>, data_type: DataType, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            ordinal,
            nullable: true,
            size: 0,
            precision: 0,
            scale: 0,
            auto_generated: false,
            default_value: None,
        }
    }

    #[must_use]
    pub const fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub const fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub const fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    #[must_use]
    pub const fn with_auto_generated(mut self, auto_generated: bool) -> Self {
        self.auto_generated = auto_generated;
        self
    }

    #[must_use]
    pub fn with_default_value(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value;
        self
    }
}
