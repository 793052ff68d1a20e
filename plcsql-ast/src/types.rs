/// Scalar types of the source language together with their Java realization.
///
/// `Null` and `Cursor` are internal sentinels: `Null` is the type of an untyped
/// `NULL` literal and `Cursor` the opaque type of a cursor handle. Neither is
/// ever the declared type of a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SqlType {
    Boolean,
    String,
    Short,
    Int,
    Bigint,
    Numeric,
    Float,
    Double,
    Date,
    Time,
    Datetime,
    Timestamp,
    Object,
    Null,
    Cursor,
}

impl SqlType {
    /// Name used in the runtime's conversion helpers (`conv<Src>To<Dst>`).
    pub fn plc_name(self) -> &'static str {
        match self {
            SqlType::Boolean => "Boolean",
            SqlType::String => "String",
            SqlType::Short => "Short",
            SqlType::Int => "Int",
            SqlType::Bigint => "Bigint",
            SqlType::Numeric => "Numeric",
            SqlType::Float => "Float",
            SqlType::Double => "Double",
            SqlType::Date => "Date",
            SqlType::Time => "Time",
            SqlType::Datetime => "Datetime",
            SqlType::Timestamp => "Timestamp",
            SqlType::Object => "Object",
            SqlType::Null => "Null",
            SqlType::Cursor => "Cursor",
        }
    }

    /// Short Java type name as written in emitted code.
    pub fn java_type(self) -> &'static str {
        match self {
            SqlType::Boolean => "Boolean",
            SqlType::String => "String",
            SqlType::Short => "Short",
            SqlType::Int => "Integer",
            SqlType::Bigint => "Long",
            SqlType::Numeric => "BigDecimal",
            SqlType::Float => "Float",
            SqlType::Double => "Double",
            SqlType::Date => "Date",
            SqlType::Time => "Time",
            SqlType::Datetime | SqlType::Timestamp => "Timestamp",
            SqlType::Object | SqlType::Null => "Object",
            SqlType::Cursor => "Query",
        }
    }

    /// Fully qualified Java type, the key used for import collection.
    pub fn java_full_type(self) -> &'static str {
        match self {
            SqlType::Boolean => "java.lang.Boolean",
            SqlType::String => "java.lang.String",
            SqlType::Short => "java.lang.Short",
            SqlType::Int => "java.lang.Integer",
            SqlType::Bigint => "java.lang.Long",
            SqlType::Numeric => "java.math.BigDecimal",
            SqlType::Float => "java.lang.Float",
            SqlType::Double => "java.lang.Double",
            SqlType::Date => "java.sql.Date",
            SqlType::Time => "java.sql.Time",
            SqlType::Datetime | SqlType::Timestamp => "java.sql.Timestamp",
            SqlType::Object => "java.lang.Object",
            SqlType::Null => "Null",
            SqlType::Cursor => "com.cubrid.plcsql.predefined.sp.SpLib.Query",
        }
    }

    /// `ResultSet` accessor that extracts a column of this type.
    pub fn result_accessor(self) -> &'static str {
        match self {
            SqlType::Boolean => "getBoolean",
            SqlType::String => "getString",
            SqlType::Short => "getShort",
            SqlType::Int => "getInt",
            SqlType::Bigint => "getLong",
            SqlType::Numeric => "getBigDecimal",
            SqlType::Float => "getFloat",
            SqlType::Double => "getDouble",
            SqlType::Date => "getDate",
            SqlType::Time => "getTime",
            SqlType::Datetime | SqlType::Timestamp => "getTimestamp",
            SqlType::Object | SqlType::Null | SqlType::Cursor => "getObject",
        }
    }

    pub fn is_sentinel(self) -> bool {
        matches!(self, SqlType::Null | SqlType::Cursor)
    }

    pub fn from_source_name(name: &str) -> Option<SqlType> {
        let ty = match name.to_ascii_uppercase().as_str() {
            "BOOLEAN" => SqlType::Boolean,
            "STRING" | "VARCHAR" | "CHAR" => SqlType::String,
            "SHORT" | "SMALLINT" => SqlType::Short,
            "INT" | "INTEGER" => SqlType::Int,
            "BIGINT" => SqlType::Bigint,
            "NUMERIC" | "DECIMAL" => SqlType::Numeric,
            "FLOAT" | "REAL" => SqlType::Float,
            "DOUBLE" => SqlType::Double,
            "DATE" => SqlType::Date,
            "TIME" => SqlType::Time,
            "DATETIME" => SqlType::Datetime,
            "TIMESTAMP" => SqlType::Timestamp,
            "OBJECT" => SqlType::Object,
            _ => return None,
        };
        Some(ty)
    }
}

/// Conversion chosen by semantic analysis for a value flowing into a typed slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Coercion {
    Identity,
    Cast(SqlType),
    Conversion {
        src: SqlType,
        dst: SqlType,
    },
    CheckPrecision {
        precision: u32,
        scale: i16,
        inner: Box<Coercion>,
    },
    CheckStrLength {
        is_char: bool,
        length: u32,
        inner: Box<Coercion>,
    },
}

impl Coercion {
    pub fn is_identity(&self) -> bool {
        matches!(self, Coercion::Identity)
    }

    /// Java types the coerced code mentions by name.
    pub fn mentioned_types(&self, out: &mut Vec<SqlType>) {
        match self {
            Coercion::Identity | Coercion::Conversion { .. } => {}
            Coercion::Cast(ty) => out.push(*ty),
            Coercion::CheckPrecision { inner, .. } | Coercion::CheckStrLength { inner, .. } => {
                inner.mentioned_types(out)
            }
        }
    }
}
