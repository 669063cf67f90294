// Single source of truth for the normalized type table.
// Every consumer expands the same entry list through its own arm macro.
macro_rules! data_type_registry {
    ($macro:ident $(, $arg:expr)?) => {
        $macro! {
            $( @arg $arg; )?
            @entries
            (Int16, Numeric, "INT16", "Edm.Int16", ordered = true, keyable = true),
            (Int32, Numeric, "INT32", "Edm.Int32", ordered = true, keyable = true),
            (Int64, Numeric, "INT64", "Edm.Int64", ordered = true, keyable = true),
            (Single, Numeric, "SINGLE", "Edm.Single", ordered = true, keyable = false),
            (Double, Numeric, "DOUBLE", "Edm.Double", ordered = true, keyable = false),
            (Decimal, Numeric, "DECIMAL", "Edm.Decimal", ordered = true, keyable = true),
            (String, Textual, "STRING", "Edm.String", ordered = true, keyable = true),
            (Boolean, Bool, "BOOLEAN", "Edm.Boolean", ordered = true, keyable = true),
            (Binary, Binary, "BINARY", "Edm.Binary", ordered = false, keyable = false),
            (Date, Temporal, "DATE", "Edm.Date", ordered = true, keyable = true),
            (Time, Temporal, "TIMEOFDAY", "Edm.TimeOfDay", ordered = true, keyable = true),
            (DateTimeOffset, Temporal, "DATE_TIMEOFFSET", "Edm.DateTimeOffset", ordered = true, keyable = true),
            (Guid, Identifier, "GUID", "Edm.Guid", ordered = true, keyable = true),
        }
    };
}

macro_rules! metadata_from_registry {
    ( @arg $kind:expr; @entries $( ($variant:ident, $family:ident, $name:literal, $edm:literal, ordered = $ordered:expr, keyable = $keyable:expr) ),* $(,)? ) => {
        match $kind {
            $(
                $crate::DataType::$variant => $crate::DataTypeMetadata {
                    family: $crate::DataTypeFamily::$family,
                    name: $name,
                    edm_name: $edm,
                    supports_ordering: $ordered,
                    is_keyable: $keyable,
                },
            )*
        }
    };
}

macro_rules! all_from_registry {
    ( @entries $( ($variant:ident, $family:ident, $name:literal, $edm:literal, ordered = $ordered:expr, keyable = $keyable:expr) ),* $(,)? ) => {
        [ $( $crate::DataType::$variant ),* ]
    };
}
