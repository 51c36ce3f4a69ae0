//! MySQL / MariaDB.

use super::{
    ColumnAlter, Dialect, enum_value_list, fold_case_outside_literals, nullability, quote_with,
    split_type,
};
use crate::model::LogicalType;

/// MySQL-family dialect: backtick quoting, emulated booleans and uuids, native
/// enum/set/json/spatial types, `AUTO_INCREMENT`, non-transactional DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '`')
    }

    fn map_type(
        &self,
        logical: &LogicalType,
        length: Option<u32>,
        scale: Option<u32>,
        enum_values: &[String],
    ) -> String {
        match logical {
            LogicalType::String => format!("VARCHAR({})", length.unwrap_or(255)),
            LogicalType::Char => format!("CHAR({})", length.unwrap_or(1)),
            LogicalType::Text => "TEXT".to_string(),
            LogicalType::MediumText => "MEDIUMTEXT".to_string(),
            LogicalType::LongText => "LONGTEXT".to_string(),
            LogicalType::Integer => "INT".to_string(),
            LogicalType::TinyInt => "TINYINT".to_string(),
            LogicalType::SmallInt => "SMALLINT".to_string(),
            LogicalType::BigInt => "BIGINT".to_string(),
            LogicalType::UnsignedBigInt => "BIGINT UNSIGNED".to_string(),
            LogicalType::Decimal => {
                let (precision, scale) = decimal_precision(length, scale);
                format!("DECIMAL({},{})", precision, scale)
            }
            LogicalType::Float => "DOUBLE".to_string(),
            LogicalType::Boolean => "TINYINT(1)".to_string(),
            LogicalType::Date => "DATE".to_string(),
            LogicalType::Time => "TIME".to_string(),
            LogicalType::DateTime => "DATETIME".to_string(),
            LogicalType::Timestamp | LogicalType::TimestampTz => "TIMESTAMP".to_string(),
            LogicalType::Year => "YEAR".to_string(),
            LogicalType::Uuid => "CHAR(36)".to_string(),
            LogicalType::Binary => match length {
                Some(length) => format!("VARBINARY({})", length),
                None => "BLOB".to_string(),
            },
            LogicalType::Json | LogicalType::Array => "JSON".to_string(),
            LogicalType::SimpleJson | LogicalType::SimpleArray => "TEXT".to_string(),
            LogicalType::Enum => format!("ENUM({})", enum_value_list(enum_values)),
            LogicalType::Set => format!("SET({})", enum_value_list(enum_values)),
            LogicalType::Geometry => "GEOMETRY".to_string(),
            LogicalType::Point => "POINT".to_string(),
            LogicalType::LineString => "LINESTRING".to_string(),
            LogicalType::Polygon => "POLYGON".to_string(),
            LogicalType::IpAddress => "VARCHAR(45)".to_string(),
            LogicalType::MacAddress => "VARCHAR(17)".to_string(),
            LogicalType::Other(_) => "VARCHAR(255)".to_string(),
        }
    }

    fn engine_suffix(&self) -> &'static str {
        " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"
    }

    fn auto_increment_keyword(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    fn auto_increment_type(&self, base: &str) -> String {
        base.to_string()
    }

    fn foreign_key_lookup_sql(&self) -> &'static str {
        "SELECT CAST(CONSTRAINT_NAME AS CHAR) FROM information_schema.KEY_COLUMN_USAGE \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_NAME = ? \
         AND REFERENCED_TABLE_NAME IS NOT NULL LIMIT 1"
    }

    fn disable_fk_checks(&self) -> &'static str {
        "SET FOREIGN_KEY_CHECKS=0"
    }

    fn enable_fk_checks(&self) -> &'static str {
        "SET FOREIGN_KEY_CHECKS=1"
    }

    fn alter_column_sql(&self, table: &str, column: &str, alter: &ColumnAlter) -> String {
        let mut sql = format!(
            "ALTER TABLE {} MODIFY COLUMN {} {}{}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            alter.base_type,
            nullability(alter.nullable)
        );
        if let Some(default) = &alter.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if alter.auto_increment {
            sql.push(' ');
            sql.push_str(self.auto_increment_keyword());
        }
        sql
    }

    fn drop_foreign_key_sql(&self, table: &str, constraint: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_identifier(table),
            self.quote_identifier(constraint)
        )
    }

    fn drop_table_sql(&self, table: &str) -> String {
        // Referencing tables are handled by the FOREIGN_KEY_CHECKS guard.
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }

    fn uuid_fk_type(&self) -> &'static str {
        "CHAR(36)"
    }

    fn int_fk_type(&self) -> &'static str {
        "INT"
    }

    fn canonical_type(&self, raw: &str) -> String {
        let folded = fold_case_outside_literals(raw);
        let (name, args, rest) = split_type(&folded);
        let name = match name {
            "integer" => "int",
            "bool" | "boolean" => return "tinyint(1)".to_string(),
            "numeric" => "decimal",
            "double precision" | "real" => "double",
            other => other,
        };
        let args = match (name, args) {
            // Display widths carry no meaning, except the boolean idiom.
            ("tinyint", Some("1")) => Some("1"),
            ("int" | "tinyint" | "smallint" | "mediumint" | "bigint", _) => None,
            (
                "text" | "tinytext" | "mediumtext" | "longtext" | "blob" | "json" | "date"
                | "datetime" | "timestamp" | "year",
                _,
            ) => None,
            (_, args) => args,
        };
        let mut out = name.to_string();
        if let Some(args) = args {
            out.push_str(&format!("({})", args));
        }
        if !rest.is_empty() {
            out.push(' ');
            out.push_str(rest);
        }
        out
    }
}

pub(super) fn decimal_precision(length: Option<u32>, scale: Option<u32>) -> (u32, u32) {
    match (length, scale) {
        (None, None) => (10, 2),
        (Some(precision), None) => (precision, 0),
        (precision, Some(scale)) => (precision.unwrap_or(10), scale),
    }
}
