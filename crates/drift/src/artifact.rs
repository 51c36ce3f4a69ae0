//! Migration files: naming and the up/down template.
//!
//! Files are named `m<yyyy>_<mm>_<dd>_<hhmmss>_<slug>.sql`, so a plain
//! lexical sort is also the order they were generated in.

use jiff::Zoned;

/// Turn a free-form migration name into a file-name slug.
///
/// ```
/// assert_eq!(drift::artifact::slugify("Add posts & tags"), "add_posts_tags");
/// assert_eq!(drift::artifact::slugify("schema-update"), "schema_update");
/// assert_eq!(drift::artifact::slugify("!!!"), "migration");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "migration".to_string()
    } else {
        slug.to_string()
    }
}

pub fn migration_file_name(timestamp: &Zoned, name: &str) -> String {
    format!(
        "m{}_{}.sql",
        timestamp.strftime("%Y_%m_%d_%H%M%S"),
        slugify(name)
    )
}

/// Wrap forward and reverse scripts into a migration file.
pub fn render_migration(name: &str, created: &Zoned, up: &str, down: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("-- Migration: {}\n", name));
    out.push_str(&format!(
        "-- Created: {}\n",
        created.strftime("%Y-%m-%d %H:%M:%S %Z")
    ));
    out.push('\n');
    out.push_str("-- migrate:up\n");
    push_section(&mut out, up);
    out.push('\n');
    out.push_str("-- migrate:down\n");
    push_section(&mut out, down);
    out
}

fn push_section(out: &mut String, sql: &str) {
    let sql = sql.trim();
    if sql.is_empty() {
        out.push_str("-- (nothing to do)\n");
    } else {
        out.push_str(sql);
        out.push('\n');
    }
}
