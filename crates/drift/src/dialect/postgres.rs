//! PostgreSQL.

use super::mysql::decimal_precision;
use super::{
    ColumnAlter, Dialect, enum_value_list, fold_case_outside_literals, quote_with, split_type,
};
use crate::model::LogicalType;

/// Postgres-family dialect: double-quote quoting, native boolean/uuid/jsonb/inet
/// types, emulated enums, `SERIAL` types, transactional DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '"')
    }

    fn map_type(
        &self,
        logical: &LogicalType,
        length: Option<u32>,
        scale: Option<u32>,
        _enum_values: &[String],
    ) -> String {
        match logical {
            LogicalType::String => format!("VARCHAR({})", length.unwrap_or(255)),
            LogicalType::Char => format!("CHAR({})", length.unwrap_or(1)),
            LogicalType::Text | LogicalType::MediumText | LogicalType::LongText => {
                "TEXT".to_string()
            }
            LogicalType::Integer => "INTEGER".to_string(),
            LogicalType::TinyInt | LogicalType::SmallInt | LogicalType::Year => {
                "SMALLINT".to_string()
            }
            LogicalType::BigInt | LogicalType::UnsignedBigInt => "BIGINT".to_string(),
            LogicalType::Decimal => {
                let (precision, scale) = decimal_precision(length, scale);
                format!("NUMERIC({},{})", precision, scale)
            }
            LogicalType::Float => "DOUBLE PRECISION".to_string(),
            LogicalType::Boolean => "BOOLEAN".to_string(),
            LogicalType::Date => "DATE".to_string(),
            LogicalType::Time => "TIME".to_string(),
            LogicalType::DateTime | LogicalType::Timestamp => "TIMESTAMP".to_string(),
            LogicalType::TimestampTz => "TIMESTAMPTZ".to_string(),
            LogicalType::Uuid => "UUID".to_string(),
            LogicalType::Binary | LogicalType::Geometry => "BYTEA".to_string(),
            LogicalType::Json => "JSONB".to_string(),
            LogicalType::SimpleJson | LogicalType::SimpleArray | LogicalType::Set => {
                "TEXT".to_string()
            }
            LogicalType::Array => "TEXT[]".to_string(),
            // Values are enforced by `value_check`.
            LogicalType::Enum => "VARCHAR(255)".to_string(),
            LogicalType::Point => "POINT".to_string(),
            LogicalType::LineString => "PATH".to_string(),
            LogicalType::Polygon => "POLYGON".to_string(),
            LogicalType::IpAddress => "INET".to_string(),
            LogicalType::MacAddress => "MACADDR".to_string(),
            LogicalType::Other(_) => "VARCHAR(255)".to_string(),
        }
    }

    fn engine_suffix(&self) -> &'static str {
        ""
    }

    fn value_check(
        &self,
        column: &str,
        logical: &LogicalType,
        values: &[String],
    ) -> Option<String> {
        if !matches!(logical, LogicalType::Enum) || values.is_empty() {
            return None;
        }
        Some(format!(
            "CHECK ({} IN ({}))",
            self.quote_identifier(column),
            enum_value_list(values)
        ))
    }

    fn auto_increment_keyword(&self) -> &'static str {
        ""
    }

    fn auto_increment_type(&self, base: &str) -> String {
        match self.canonical_type(base).as_str() {
            "smallint" => "SMALLSERIAL".to_string(),
            "integer" => "SERIAL".to_string(),
            "bigint" => "BIGSERIAL".to_string(),
            _ => base.to_string(),
        }
    }

    fn foreign_key_lookup_sql(&self) -> &'static str {
        "SELECT tc.constraint_name::text FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
         ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = current_schema() \
         AND tc.table_name = $1 AND kcu.column_name = $2 LIMIT 1"
    }

    fn disable_fk_checks(&self) -> &'static str {
        ""
    }

    fn enable_fk_checks(&self) -> &'static str {
        ""
    }

    fn alter_column_sql(&self, table: &str, column: &str, alter: &ColumnAlter) -> String {
        let col = self.quote_identifier(column);
        let mut clauses = vec![
            format!(
                "ALTER COLUMN {} TYPE {} USING {}::{}",
                col, alter.base_type, col, alter.base_type
            ),
            if alter.nullable {
                format!("ALTER COLUMN {} DROP NOT NULL", col)
            } else {
                format!("ALTER COLUMN {} SET NOT NULL", col)
            },
        ];
        // The sequence default of a serial column is not ours to touch.
        if !alter.auto_increment {
            clauses.push(match &alter.default {
                Some(default) => format!("ALTER COLUMN {} SET DEFAULT {}", col, default),
                None => format!("ALTER COLUMN {} DROP DEFAULT", col),
            });
        }
        format!(
            "ALTER TABLE {} {}",
            self.quote_identifier(table),
            clauses.join(", ")
        )
    }

    fn drop_foreign_key_sql(&self, table: &str, constraint: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(table),
            self.quote_identifier(constraint)
        )
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", self.quote_identifier(table))
    }

    fn uuid_fk_type(&self) -> &'static str {
        "UUID"
    }

    fn int_fk_type(&self) -> &'static str {
        "INTEGER"
    }

    fn canonical_type(&self, raw: &str) -> String {
        let folded = fold_case_outside_literals(raw);
        let (name, args, rest) = split_type(&folded);
        let full_name = if rest.is_empty() {
            name.to_string()
        } else {
            format!("{} {}", name, rest)
        };
        let name = match full_name.as_str() {
            "character varying" | "varchar" => "varchar",
            "character" | "char" | "bpchar" => "char",
            "int" | "int4" | "integer" | "serial" | "serial4" => "integer",
            "int8" | "bigint" | "bigserial" | "serial8" => "bigint",
            "int2" | "smallint" | "smallserial" | "serial2" => "smallint",
            "bool" | "boolean" => "boolean",
            "float8" | "double" | "double precision" => "double precision",
            "float4" | "real" => "real",
            "numeric" | "decimal" => "numeric",
            "timestamp" | "timestamp without time zone" => "timestamp",
            "timestamptz" | "timestamp with time zone" => "timestamptz",
            "time" | "time without time zone" => "time",
            "array" | "_text" | "text[]" => "text[]",
            other => other,
        };
        let args = match name {
            "varchar" | "char" | "numeric" | "bit" | "varbit" => args,
            _ => None,
        };
        match args {
            Some(args) => format!("{}({})", name, args),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(logical: LogicalType) -> String {
        Postgres.map_type(&logical, None, None, &[])
    }

    #[test]
    fn maps_the_vocabulary() {
        assert_eq!(map(LogicalType::String), "VARCHAR(255)");
        assert_eq!(map(LogicalType::Boolean), "BOOLEAN");
        assert_eq!(map(LogicalType::Uuid), "UUID");
        assert_eq!(map(LogicalType::Json), "JSONB");
        assert_eq!(map(LogicalType::Array), "TEXT[]");
        assert_eq!(map(LogicalType::LongText), "TEXT");
        assert_eq!(map(LogicalType::UnsignedBigInt), "BIGINT");
        assert_eq!(map(LogicalType::Decimal), "NUMERIC(10,2)");
        assert_eq!(map(LogicalType::Binary), "BYTEA");
        assert_eq!(map(LogicalType::IpAddress), "INET");
        assert_eq!(map(LogicalType::MacAddress), "MACADDR");
        assert_eq!(map(LogicalType::TimestampTz), "TIMESTAMPTZ");
        assert_eq!(map(LogicalType::Other("money".into())), "VARCHAR(255)");
    }

    #[test]
    fn enums_are_emulated() {
        let values = vec!["draft".to_string()];
        assert_eq!(
            Postgres.map_type(&LogicalType::Enum, None, None, &values),
            "VARCHAR(255)"
        );
    }

    #[test]
    fn enum_values_become_a_check() {
        let values = vec!["draft".to_string(), "it's".to_string()];
        assert_eq!(
            Postgres.value_check("status", &LogicalType::Enum, &values).as_deref(),
            Some("CHECK (\"status\" IN ('draft','it''s'))")
        );
        assert_eq!(Postgres.value_check("status", &LogicalType::Enum, &[]), None);
        assert_eq!(Postgres.value_check("tags", &LogicalType::Set, &values), None);
        assert_eq!(crate::dialect::MySql.value_check("status", &LogicalType::Enum, &values), None);
    }

    #[test]
    fn auto_increment_substitutes_serial_types() {
        assert_eq!(Postgres.auto_increment_type("INTEGER"), "SERIAL");
        assert_eq!(Postgres.auto_increment_type("BIGINT"), "BIGSERIAL");
        assert_eq!(Postgres.auto_increment_type("SMALLINT"), "SMALLSERIAL");
        assert_eq!(Postgres.auto_increment_type("UUID"), "UUID");
        assert_eq!(Postgres.auto_increment_keyword(), "");
    }

    #[test]
    fn alter_is_multi_clause() {
        let alter = ColumnAlter {
            base_type: "VARCHAR(120)".to_string(),
            nullable: true,
            default: None,
            auto_increment: false,
        };
        assert_eq!(
            Postgres.alter_column_sql("user", "name", &alter),
            "ALTER TABLE \"user\" ALTER COLUMN \"name\" TYPE VARCHAR(120) USING \"name\"::VARCHAR(120), \
             ALTER COLUMN \"name\" DROP NOT NULL, ALTER COLUMN \"name\" DROP DEFAULT"
        );
    }

    #[test]
    fn alter_leaves_serial_defaults_alone() {
        let alter = ColumnAlter {
            base_type: "INTEGER".to_string(),
            nullable: false,
            default: None,
            auto_increment: true,
        };
        let sql = Postgres.alter_column_sql("ticket", "seq", &alter);
        assert!(sql.ends_with("ALTER COLUMN \"seq\" SET NOT NULL"));
    }

    #[test]
    fn transactional_ddl_needs_no_guard() {
        assert!(!Postgres.has_fk_guard());
        assert_eq!(Postgres.engine_suffix(), "");
        assert_eq!(
            Postgres.drop_table_sql("legacy"),
            "DROP TABLE IF EXISTS \"legacy\" CASCADE"
        );
        assert_eq!(
            Postgres.drop_foreign_key_sql("post", "post_author_id_fkey"),
            "ALTER TABLE \"post\" DROP CONSTRAINT \"post_author_id_fkey\""
        );
    }

    #[test]
    fn canonical_types_merge_catalog_spellings() {
        assert_eq!(Postgres.canonical_type("character varying(255)"), "varchar(255)");
        assert_eq!(Postgres.canonical_type("VARCHAR(255)"), "varchar(255)");
        assert_eq!(Postgres.canonical_type("int4"), "integer");
        assert_eq!(Postgres.canonical_type("timestamp with time zone"), "timestamptz");
        assert_eq!(Postgres.canonical_type("timestamp(6) without time zone"), "timestamp");
        assert_eq!(Postgres.canonical_type("ARRAY"), "text[]");
        assert_eq!(Postgres.canonical_type("NUMERIC(10, 2)"), "numeric(10,2)");
    }
}
