//! The diff engine: declared tables + live snapshot -> ordered DDL.
//!
//! ## Algorithm
//!
//! 1. **Primary keys first.** Every supplied table's primary key is resolved
//!    before any table is diffed, because foreign keys take their type from
//!    the table they point at and forward references are common.
//! 2. **New tables** get one `CREATE TABLE` with every scalar column and every
//!    owning foreign-key column. Their foreign-key constraints are added with
//!    `ALTER TABLE ... ADD CONSTRAINT` once all tables exist.
//! 3. **Existing tables** are diffed property by property: missing columns are
//!    added, drifted columns altered, many-to-many join tables queued.
//! 4. **Unexpected columns** are dropped, foreign-key constraint first when
//!    the column carries the foreign-key suffix and the constraint resolves.
//! 5. **Unexpected tables** are dropped unless protected.
//!
//! Output phases are always CREATE/ALTER, then join tables, then drops. Inside
//! the first phase, table creates come before column changes, which come
//! before constraints, so every constraint target exists when referenced.
//!
//! ## Shared primary keys
//!
//! When an owning relation's foreign-key column has the same name as the
//! table's primary key, the primary key *is* the foreign key: no extra column
//! is emitted, the primary key takes the target's key type and, on a new
//! table, carries the foreign-key constraint.
//!
//! ```text
//! profile.user -> user     (user.id is a uuid)
//! profile pk = user_id     => "user_id" UUID NOT NULL, PRIMARY KEY ("user_id")
//!                             CONSTRAINT "fk_profile_user_id" ... REFERENCES "user" ("id")
//! ```

use crate::batch::{Change, ColumnDef, ForeignKeyDef, OnDelete, Phase, StatementBatch};
use crate::config::EngineConfig;
use crate::defaults::{defaults_match, render_default};
use crate::dialect::{self, ColumnAlter, Dialect};
use crate::lookup::{ConstraintLookup, convention_name};
use crate::model::{ColumnModel, JoinTable, PrimaryKey, RelationKind, RelationModel, TableModel};
use crate::snapshot::{ColumnSnapshot, CurrentSchema, TableSnapshot};
use crate::Result;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Computes migration batches for one dialect.
pub struct Differ {
    config: EngineConfig,
    dialect: Box<dyn Dialect>,
}

impl std::fmt::Debug for Differ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Differ")
            .field("config", &self.config)
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

/// A join table queued by an owning many-to-many relation.
struct JoinTableDecl<'a> {
    owner: &'a str,
    target: &'a str,
    join_table: &'a JoinTable,
}

/// Changes accumulated during one diff, before rendering.
#[derive(Default)]
struct Plan {
    creates: Vec<Change>,
    column_changes: Vec<Change>,
    constraints: Vec<Change>,
    join_tables: Vec<Change>,
    drops: Vec<Change>,
}

impl Differ {
    /// Build an engine for `config.driver`. Unknown drivers are an error.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let dialect = dialect::for_driver(&config.driver)?;
        debug!(driver = %config.driver, dialect = dialect.name(), "differ created");
        Ok(Self { config, dialect })
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diff `tables` against `current`.
    ///
    /// `lookup` is only consulted for unexpected columns carrying the
    /// foreign-key suffix; its errors are returned as-is.
    pub async fn diff<L: ConstraintLookup>(
        &self,
        tables: &[TableModel],
        current: &CurrentSchema,
        lookup: &L,
    ) -> Result<StatementBatch> {
        let primary_keys: HashMap<&str, PrimaryKey> = tables
            .iter()
            .map(|t| (t.name.as_str(), t.resolved_primary_key()))
            .collect();

        let mut plan = Plan::default();
        let mut join_decls: IndexMap<&str, JoinTableDecl<'_>> = IndexMap::new();

        for table in tables {
            let pk = &primary_keys[table.name.as_str()];
            for relation in &table.relations {
                if let (RelationKind::ManyToMany, Some(join_table)) =
                    (relation.kind, &relation.join_table)
                {
                    join_decls
                        .entry(join_table.name.as_str())
                        .or_insert(JoinTableDecl {
                            owner: &table.name,
                            target: &relation.target,
                            join_table,
                        });
                }
            }

            match current.table(&table.name) {
                None => {
                    debug!(table = %table.name, "table missing, creating");
                    self.create_table(table, pk, &primary_keys, &mut plan);
                }
                Some(live) => {
                    debug!(table = %table.name, columns = live.len(), "table exists, diffing");
                    self.diff_table(table, pk, live, &primary_keys, lookup, &mut plan)
                        .await?;
                }
            }
        }

        for (name, decl) in &join_decls {
            if current.has_table(name) {
                debug!(table = %name, "join table already present");
                continue;
            }
            plan.join_tables
                .push(self.create_join_table(decl, &primary_keys));
        }

        for name in current.tables.keys() {
            let expected = primary_keys.contains_key(name.as_str());
            let join = join_decls.contains_key(name.as_str());
            if expected || join {
                continue;
            }
            if self.config.is_protected(name) {
                debug!(table = %name, "protected table left alone");
                continue;
            }
            debug!(table = %name, "table no longer declared, dropping");
            plan.drops.push(Change::DropTable(name.clone()));
        }

        Ok(self.compose(plan))
    }

    fn compose(&self, plan: Plan) -> StatementBatch {
        let dialect = self.dialect();
        let mut batch = StatementBatch::new(dialect);
        let phases = [
            (Phase::CreateAlter, plan.creates),
            (Phase::CreateAlter, plan.column_changes),
            (Phase::CreateAlter, plan.constraints),
            (Phase::JoinTables, plan.join_tables),
            (Phase::Drop, plan.drops),
        ];
        for (phase, changes) in phases {
            for change in changes {
                debug!(change = %change, "planned");
                batch.push(phase, change.to_sql(dialect));
            }
        }
        info!(
            dialect = dialect.name(),
            create_alter = batch.phase(Phase::CreateAlter).len(),
            join_tables = batch.phase(Phase::JoinTables).len(),
            drops = batch.phase(Phase::Drop).len(),
            "diff complete"
        );
        batch
    }

    fn create_table(
        &self,
        table: &TableModel,
        pk: &PrimaryKey,
        primary_keys: &HashMap<&str, PrimaryKey>,
        plan: &mut Plan,
    ) {
        let mut columns = vec![self.primary_key_column(table, pk, primary_keys)];

        for column in &table.columns {
            if column.name == pk.column {
                continue;
            }
            columns.push(self.column_def(column, false));
        }

        for relation in owning_relations(table) {
            let fk_column = relation.foreign_key_column(&self.config.fk_suffix);
            let target_pk = self.target_primary_key(table, relation, primary_keys);
            if fk_column == pk.column {
                // The key cannot be nulled, so no ON DELETE action.
                let mut foreign_key =
                    self.foreign_key_def(&table.name, &fk_column, relation, &target_pk);
                foreign_key.on_delete = None;
                plan.constraints.push(Change::AddForeignKey {
                    table: table.name.clone(),
                    foreign_key,
                });
                continue;
            }
            // A scalar column of the same name already defines it.
            if table.find_column(&fk_column).is_none() {
                columns.push(self.foreign_key_column_def(&fk_column, relation, &target_pk));
            }
            plan.constraints.push(Change::AddForeignKey {
                table: table.name.clone(),
                foreign_key: self.foreign_key_def(&table.name, &fk_column, relation, &target_pk),
            });
        }

        plan.creates.push(Change::CreateTable {
            table: table.name.clone(),
            columns,
            primary_key: vec![pk.column.clone()],
            foreign_keys: Vec::new(),
            if_not_exists: false,
        });
    }

    /// The primary-key column of a new table.
    ///
    /// A declared column wins, except when an owning relation shares the key:
    /// then the key is typed after the relation target's key. With neither, a
    /// column is synthesized from the key's logical type, auto-incrementing
    /// when integer-class.
    fn primary_key_column(
        &self,
        table: &TableModel,
        pk: &PrimaryKey,
        primary_keys: &HashMap<&str, PrimaryKey>,
    ) -> ColumnDef {
        let shared = owning_relations(table)
            .find(|r| r.foreign_key_column(&self.config.fk_suffix) == pk.column);
        if let Some(relation) = shared {
            let target_pk = self.target_primary_key(table, relation, primary_keys);
            debug!(
                table = %table.name,
                column = %pk.column,
                target = %relation.target,
                "primary key shared with foreign key"
            );
            return ColumnDef {
                name: pk.column.clone(),
                sql_type: self.dialect.fk_type_for(&target_pk),
                nullable: false,
                default: None,
                auto_increment: false,
                check: None,
            };
        }

        if let Some(column) = table.find_column(&pk.column) {
            return self.column_def(column, true);
        }

        let mut synthesized = ColumnModel::new(&pk.column, pk.logical_type.clone());
        synthesized.length = pk.length;
        if pk.logical_type.is_integer_class() {
            synthesized = synthesized.auto_increment();
        }
        self.column_def(&synthesized, true)
    }

    async fn diff_table<L: ConstraintLookup>(
        &self,
        table: &TableModel,
        pk: &PrimaryKey,
        live: &TableSnapshot,
        primary_keys: &HashMap<&str, PrimaryKey>,
        lookup: &L,
        plan: &mut Plan,
    ) -> Result<()> {
        let mut expected: IndexSet<String> = IndexSet::new();
        expected.insert(pk.column.clone());
        if !live.contains_key(&pk.column) {
            warn!(
                table = %table.name,
                column = %pk.column,
                "primary key column missing from live table; not touching it"
            );
        }

        for column in &table.columns {
            expected.insert(column.name.clone());
            if column.name == pk.column {
                continue;
            }
            match live.get(&column.name) {
                None => plan.column_changes.push(Change::AddColumn {
                    table: table.name.clone(),
                    column: self.column_def(column, false),
                }),
                Some(_) if column.raw_type.is_some() => {}
                Some(snapshot) => {
                    if let Some(alter) = self.column_drift(column, snapshot) {
                        debug!(table = %table.name, column = %column.name, "column drifted");
                        plan.column_changes.push(Change::AlterColumn {
                            table: table.name.clone(),
                            column: column.name.clone(),
                            alter,
                        });
                    }
                }
            }
        }

        for relation in &table.relations {
            // Join tables were queued by the caller; inverse sides have no column.
            if !relation.kind.owns_foreign_key() {
                continue;
            }
            let fk_column = relation.foreign_key_column(&self.config.fk_suffix);
            if fk_column == pk.column {
                continue;
            }
            expected.insert(fk_column.clone());
            if live.contains_key(&fk_column) {
                continue;
            }
            let target_pk = self.target_primary_key(table, relation, primary_keys);
            // A declared scalar of the same name was already added above.
            if table.find_column(&fk_column).is_none() {
                plan.column_changes.push(Change::AddColumn {
                    table: table.name.clone(),
                    column: self.foreign_key_column_def(&fk_column, relation, &target_pk),
                });
            }
            plan.constraints.push(Change::AddForeignKey {
                table: table.name.clone(),
                foreign_key: self.foreign_key_def(&table.name, &fk_column, relation, &target_pk),
            });
        }

        for name in live.keys() {
            if expected.contains(name) {
                continue;
            }
            if name.ends_with(&self.config.fk_suffix) {
                match lookup
                    .foreign_key_name(self.dialect(), &table.name, name)
                    .await?
                {
                    Some(constraint) => plan.drops.push(Change::DropForeignKey {
                        table: table.name.clone(),
                        constraint,
                    }),
                    None => warn!(
                        table = %table.name,
                        column = %name,
                        "no foreign key constraint found; dropping column without it"
                    ),
                }
            }
            plan.drops.push(Change::DropColumn {
                table: table.name.clone(),
                column: name.clone(),
            });
        }

        Ok(())
    }

    /// Compare a declared column against its snapshot. `Some` means ALTER.
    fn column_drift(&self, column: &ColumnModel, snapshot: &ColumnSnapshot) -> Option<ColumnAlter> {
        let base_type = self.base_type(column);
        let default = self.rendered_default(column);
        let alter = ColumnAlter {
            base_type: base_type.clone(),
            nullable: column.nullable,
            default: default.clone(),
            auto_increment: column.auto_increment,
        };

        let (Some(live_type), Some(live_nullable)) = (snapshot.full_type(), snapshot.nullable)
        else {
            // State unknown: bring it in line unconditionally.
            return Some(alter);
        };

        let type_matches =
            self.dialect.canonical_type(&base_type) == self.dialect.canonical_type(&live_type);
        let nullable_matches = live_nullable == column.nullable;
        // Sequence-backed defaults belong to the engine.
        let default_matches = column.auto_increment
            || defaults_match(
                &column.logical_type,
                default.as_deref(),
                snapshot.default.as_deref(),
            );

        if type_matches && nullable_matches && default_matches {
            None
        } else {
            Some(alter)
        }
    }

    /// The declared SQL type before any auto-increment substitution.
    fn base_type(&self, column: &ColumnModel) -> String {
        match &column.raw_type {
            Some(raw) => raw.clone(),
            None => self.dialect.map_type(
                &column.logical_type,
                column.length,
                column.scale,
                &column.enum_values,
            ),
        }
    }

    fn rendered_default(&self, column: &ColumnModel) -> Option<String> {
        if column.auto_increment {
            return None;
        }
        column
            .default
            .as_ref()
            .map(|d| render_default(&column.logical_type, d))
    }

    fn column_def(&self, column: &ColumnModel, is_primary_key: bool) -> ColumnDef {
        let base = self.base_type(column);
        let sql_type = if column.auto_increment {
            self.dialect.auto_increment_type(&base)
        } else {
            base
        };
        ColumnDef {
            name: column.name.clone(),
            sql_type,
            nullable: column.nullable && !is_primary_key,
            default: self.rendered_default(column),
            auto_increment: column.auto_increment,
            check: match column.raw_type {
                Some(_) => None,
                None => self.dialect.value_check(
                    &column.name,
                    &column.logical_type,
                    &column.enum_values,
                ),
            },
        }
    }

    fn foreign_key_column_def(
        &self,
        name: &str,
        relation: &RelationModel,
        target_pk: &PrimaryKey,
    ) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            sql_type: self.dialect.fk_type_for(target_pk),
            nullable: relation.nullable,
            default: None,
            auto_increment: false,
            check: None,
        }
    }

    fn foreign_key_def(
        &self,
        table: &str,
        column: &str,
        relation: &RelationModel,
        target_pk: &PrimaryKey,
    ) -> ForeignKeyDef {
        ForeignKeyDef {
            name: convention_name(table, column),
            column: column.to_string(),
            references_table: relation.target.clone(),
            references_column: target_pk.column.clone(),
            on_delete: relation.nullable.then_some(OnDelete::SetNull),
        }
    }

    fn target_primary_key(
        &self,
        table: &TableModel,
        relation: &RelationModel,
        primary_keys: &HashMap<&str, PrimaryKey>,
    ) -> PrimaryKey {
        match primary_keys.get(relation.target.as_str()) {
            Some(pk) => pk.clone(),
            None => {
                warn!(
                    table = %table.name,
                    relation = %relation.property,
                    target = %relation.target,
                    "relation target not among supplied tables; assuming integer id"
                );
                PrimaryKey::default()
            }
        }
    }

    fn create_join_table(
        &self,
        decl: &JoinTableDecl<'_>,
        primary_keys: &HashMap<&str, PrimaryKey>,
    ) -> Change {
        let key_of = |table: &str| {
            primary_keys.get(table).cloned().unwrap_or_else(|| {
                warn!(table, join_table = %decl.join_table.name, "join table side not among supplied tables; assuming integer id");
                PrimaryKey::default()
            })
        };
        let owner_pk = key_of(decl.owner);
        let target_pk = key_of(decl.target);
        let join = decl.join_table;

        let sides = [
            (&join.join_column, decl.owner, &owner_pk),
            (&join.inverse_column, decl.target, &target_pk),
        ];
        let columns = sides
            .iter()
            .map(|(column, _, pk)| ColumnDef {
                name: (*column).clone(),
                sql_type: self.dialect.fk_type_for(pk),
                nullable: false,
                default: None,
                auto_increment: false,
                check: None,
            })
            .collect();
        let foreign_keys = sides
            .iter()
            .map(|(column, table, pk)| ForeignKeyDef {
                name: convention_name(&join.name, column),
                column: (*column).clone(),
                references_table: table.to_string(),
                references_column: pk.column.clone(),
                on_delete: Some(OnDelete::Cascade),
            })
            .collect();

        Change::CreateTable {
            table: join.name.clone(),
            columns,
            primary_key: vec![join.join_column.clone(), join.inverse_column.clone()],
            foreign_keys,
            if_not_exists: true,
        }
    }
}

fn owning_relations(table: &TableModel) -> impl Iterator<Item = &RelationModel> {
    table.relations.iter().filter(|r| r.kind.owns_foreign_key())
}
