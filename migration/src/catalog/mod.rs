//! Typed graph of every object the statistics schema installs.
//!
//! Each migration renders its DDL from these records instead of carrying raw
//! strings, so the invariants the concurrent refresh path relies on (one unique
//! index per materialized view, dependencies created first) can be checked
//! before anything touches a database.

pub mod counters;
pub mod dashboard;
pub mod helpers;
pub mod leaderboards;
pub mod order_book;
pub mod portfolio;
pub mod profile;
pub mod series;
pub mod staking;

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::annotation::{self, Annotation};
use crate::error::MigrationError;
use crate::txn_kind::{self, TxnKind};

/// Creator coin / DAO coin every price and the DeFi leaderboard is quoted against.
/// The zero PKID stands for DESO itself.
pub const BASE_COIN_PKID: &str = "BC1YLbnP7rndL92x7DbLp6bkUpCgKmgoHgKdwD";

/// Upstream tables and views the statistics read but never write
pub const BASE_TABLES: &[&str] = &[
    "block",
    "transaction",
    "transaction_partitioned",
    "affected_public_key",
    "post_entry",
    "profile_entry",
    "nft_entry",
    "nft_bid_entry",
    "dao_coin_limit_order_entry",
    "balance_entry",
    "deso_balance_entry",
    "diamond_entry",
    "account",
    "follow_entry",
    "message_entry",
    "new_message_entry",
    "stake_entry",
    "stake_reward",
    "validator_entry",
    "epoch_entry",
    "leader_schedule_entry",
    "jailed_history_event",
    "pg_class",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ObjectKind {
    Table,
    /// `signature` is the argument type list used by DROP and COMMENT
    Function { signature: &'static str },
    MaterializedView,
    View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Exactly one row with `id = 0`
    Singleton,
    /// One row per subject
    Keyed,
    /// One row per `day` or `month` bucket
    Series,
}

/// How expensive a refresh is, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshCost {
    /// Catalog statistics or a constant-size read
    Light,
    /// Bounded scan of one partition, usually time-filtered
    Medium,
    /// Full base-table scan or many-partition join
    Heavy,
}

impl fmt::Display for RefreshCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshCost::Light => "light",
            RefreshCost::Medium => "medium",
            RefreshCost::Heavy => "heavy",
        };
        f.write_str(name)
    }
}

impl FromStr for RefreshCost {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" | "l" => Ok(RefreshCost::Light),
            "medium" | "m" => Ok(RefreshCost::Medium),
            "heavy" | "h" => Ok(RefreshCost::Heavy),
            other => Err(MigrationError::Config(format!(
                "unknown refresh cost '{}', expected light, medium or heavy",
                other
            ))),
        }
    }
}

/// One installed object: table, function, materialized view or plain view
#[derive(Debug, Clone, Serialize)]
pub struct CatalogObject {
    pub name: &'static str,
    pub kind: ObjectKind,
    pub shape: Shape,
    pub unique_key: Vec<&'static str>,
    pub depends_on: Vec<&'static str>,
    pub base_tables: Vec<String>,
    pub cost: RefreshCost,
    /// SELECT for views, the full CREATE statement for tables and functions
    #[serde(skip)]
    pub body: String,
    /// Statements run after creation: secondary indexes, bootstrap inserts
    #[serde(skip)]
    pub post_create: Vec<String>,
    pub annotations: Vec<Annotation>,
}

impl CatalogObject {
    fn new(name: &'static str, kind: ObjectKind, shape: Shape, cost: RefreshCost) -> Self {
        Self {
            name,
            kind,
            shape,
            unique_key: Vec::new(),
            depends_on: Vec::new(),
            base_tables: Vec::new(),
            cost,
            body: String::new(),
            post_create: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn materialized(name: &'static str, shape: Shape, cost: RefreshCost) -> Self {
        let object = Self::new(name, ObjectKind::MaterializedView, shape, cost);
        if shape == Shape::Singleton {
            object.key(&["id"])
        } else {
            object
        }
    }

    pub fn view(name: &'static str, shape: Shape) -> Self {
        Self::new(name, ObjectKind::View, shape, RefreshCost::Light)
    }

    pub fn table(name: &'static str) -> Self {
        Self::new(name, ObjectKind::Table, Shape::Keyed, RefreshCost::Heavy)
    }

    pub fn function(name: &'static str, signature: &'static str) -> Self {
        Self::new(
            name,
            ObjectKind::Function { signature },
            Shape::Singleton,
            RefreshCost::Light,
        )
    }

    pub fn key(mut self, columns: &[&'static str]) -> Self {
        self.unique_key = columns.to_vec();
        self
    }

    pub fn depends_on(mut self, names: &[&'static str]) -> Self {
        self.depends_on.extend_from_slice(names);
        self
    }

    pub fn reads(mut self, tables: &[&str]) -> Self {
        self.base_tables
            .extend(tables.iter().map(|table| table.to_string()));
        self
    }

    /// Reads the partition holding one transaction kind
    pub fn reads_partition(mut self, kind: TxnKind) -> Self {
        self.base_tables.push(kind.partition_table());
        self
    }

    pub fn body(mut self, sql: impl Into<String>) -> Self {
        self.body = sql.into();
        self
    }

    pub fn after_create(mut self, sql: impl Into<String>) -> Self {
        self.post_create.push(sql.into());
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn is_materialized(&self) -> bool {
        self.kind == ObjectKind::MaterializedView
    }

    /// Name of the unique index backing concurrent refresh
    pub fn unique_index_name(&self) -> String {
        format!("{}_unique_idx", self.name)
    }

    /// SQL object type used by DROP and COMMENT
    fn object_type(&self) -> &'static str {
        match self.kind {
            ObjectKind::Table => "TABLE",
            ObjectKind::Function { .. } => "FUNCTION",
            ObjectKind::MaterializedView => "MATERIALIZED VIEW",
            ObjectKind::View => "VIEW",
        }
    }

    /// Name as DROP and COMMENT need it, e.g. `get_transaction_count(INT)`
    fn qualified_name(&self) -> String {
        match &self.kind {
            ObjectKind::Function { signature } => format!("{}({})", self.name, signature),
            _ => self.name.to_string(),
        }
    }

    /// Rendered comment payload
    pub fn comment(&self) -> String {
        annotation::render(&self.annotations)
    }

    pub fn create_statements(&self) -> Vec<String> {
        let mut statements = Vec::new();

        match self.kind {
            ObjectKind::Table | ObjectKind::Function { .. } => {
                statements.push(self.body.trim().to_string());
            }
            ObjectKind::MaterializedView => {
                statements.push(format!(
                    "CREATE MATERIALIZED VIEW {} AS\n{}",
                    self.name,
                    self.body.trim()
                ));
                statements.push(format!(
                    "CREATE UNIQUE INDEX {} ON {} ({})",
                    self.unique_index_name(),
                    self.name,
                    self.unique_key.join(", ")
                ));
            }
            ObjectKind::View => {
                statements.push(format!("CREATE VIEW {} AS\n{}", self.name, self.body.trim()));
            }
        }

        statements.extend(self.post_create.iter().map(|s| s.trim().to_string()));

        if !self.annotations.is_empty() {
            statements.push(annotation::comment_statement(
                self.object_type(),
                &self.qualified_name(),
                &self.annotations,
            ));
        }

        statements
    }

    /// Guarded drop; indexes and comments go with the object
    pub fn drop_statement(&self) -> String {
        format!("DROP {} IF EXISTS {}", self.object_type(), self.qualified_name())
    }

    /// Whether `body` or `post_create` references `name` as a whole identifier
    pub fn mentions(&self, name: &str) -> bool {
        mentions(&self.body, name) || self.post_create.iter().any(|s| mentions(s, name))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whole-identifier match of `name` in `sql`
pub fn mentions(sql: &str, name: &str) -> bool {
    sql.match_indices(name).any(|(start, _)| {
        let before = sql[..start].chars().next_back();
        let after = sql[start + name.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// The whole installed schema, in creation order
#[derive(Debug, Clone)]
pub struct Catalog {
    objects: Vec<CatalogObject>,
}

impl Catalog {
    pub fn new(objects: Vec<CatalogObject>) -> Self {
        Self { objects }
    }

    /// Every object in the order the migrations create them
    pub fn full() -> Self {
        let mut objects = Vec::new();
        objects.extend(helpers::first_transaction_objects());
        objects.extend(helpers::function_objects());
        objects.extend(counters::objects());
        objects.extend(series::objects());
        objects.extend(leaderboards::objects());
        objects.extend(order_book::objects());
        objects.extend(profile::objects());
        objects.extend(portfolio::objects());
        objects.extend(dashboard::objects());
        objects.extend(staking::objects());
        Self::new(objects)
    }

    pub fn objects(&self) -> &[CatalogObject] {
        &self.objects
    }

    pub fn get(&self, name: &str) -> Option<&CatalogObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn materialized_views(&self) -> impl Iterator<Item = &CatalogObject> {
        self.objects.iter().filter(|o| o.is_materialized())
    }

    /// Checks every structural invariant and reports all violations at once
    pub fn validate(&self) -> Result<(), MigrationError> {
        let mut problems = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let all_names: Vec<&str> = self.objects.iter().map(|o| o.name).collect();

        for object in &self.objects {
            if !seen.insert(object.name) {
                problems.push(format!("{} is declared twice", object.name));
            }

            if object.is_materialized() {
                if object.unique_key.is_empty() {
                    problems.push(format!("{} has no unique key", object.name));
                }
                match object.shape {
                    Shape::Singleton if object.unique_key != ["id"] => problems
                        .push(format!("singleton {} must be keyed by id", object.name)),
                    Shape::Series
                        if object.unique_key != ["day"] && object.unique_key != ["month"] =>
                    {
                        problems.push(format!(
                            "series {} must be keyed by its day or month bucket",
                            object.name
                        ))
                    }
                    _ => {}
                }
                if object.post_create.iter().any(|s| s.contains("UNIQUE INDEX")) {
                    problems.push(format!(
                        "{} declares a second unique index",
                        object.name
                    ));
                }
            } else if !object.unique_key.is_empty() && object.kind != ObjectKind::Table {
                problems.push(format!(
                    "{} is not materialized but declares a unique key",
                    object.name
                ));
            }

            for dependency in &object.depends_on {
                if !seen.contains(dependency) || *dependency == object.name {
                    problems.push(format!(
                        "{} depends on {} which is not created before it",
                        object.name, dependency
                    ));
                }
                if !object.mentions(dependency) {
                    problems.push(format!(
                        "{} declares {} but never reads it",
                        object.name, dependency
                    ));
                }
            }

            for other in &all_names {
                if *other != object.name
                    && object.mentions(other)
                    && !object.depends_on.contains(other)
                {
                    problems.push(format!(
                        "{} reads {} without declaring it",
                        object.name, other
                    ));
                }
            }

            for table in &object.base_tables {
                let known = BASE_TABLES.contains(&table.as_str())
                    || txn_kind::parse_partition_table(table).is_some();
                if !known {
                    problems.push(format!(
                        "{} reads {} which is not an upstream table",
                        object.name, table
                    ));
                } else if !object.mentions(table) {
                    problems.push(format!(
                        "{} declares upstream {} but never reads it",
                        object.name, table
                    ));
                }
            }

            if object.annotations.is_empty() {
                problems.push(format!("{} has no schema annotation", object.name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MigrationError::Catalog(problems.join("; ")))
        }
    }

    /// Materialized views in dependency order, cheapest-first among peers, up to `max_cost`.
    ///
    /// A view is left out when any materialized view it reads (directly or through
    /// plain views) is left out.
    pub fn refresh_plan(&self, max_cost: RefreshCost) -> Vec<&CatalogObject> {
        let by_name: HashMap<&str, &CatalogObject> =
            self.objects.iter().map(|o| (o.name, o)).collect();

        // materialized dependencies, looking through plain views
        let materialized_deps = |object: &CatalogObject| -> Vec<&'static str> {
            let mut deps = Vec::new();
            let mut stack: Vec<&'static str> = object.depends_on.clone();
            let mut visited = HashSet::new();
            while let Some(name) = stack.pop() {
                if !visited.insert(name) {
                    continue;
                }
                if let Some(dep) = by_name.get(name) {
                    match dep.kind {
                        ObjectKind::MaterializedView => deps.push(name),
                        ObjectKind::View => stack.extend(dep.depends_on.iter().copied()),
                        _ => {}
                    }
                }
            }
            deps
        };

        let views: Vec<&CatalogObject> = self.materialized_views().collect();
        let mut indegree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for view in &views {
            let deps = materialized_deps(view);
            indegree.insert(view.name, deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(view.name);
            }
        }

        let mut ready: VecDeque<&str> = views
            .iter()
            .filter(|v| indegree[v.name] == 0)
            .map(|v| v.name)
            .collect();
        let mut order = Vec::new();
        while let Some(name) = ready.pop_front() {
            order.push(name);
            for dependent in dependents.get(name).cloned().unwrap_or_default() {
                if let Some(count) = indegree.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }

        let mut included: HashSet<&str> = HashSet::new();
        let mut plan = Vec::new();
        for name in order {
            let view = by_name[name];
            let deps_included = materialized_deps(view)
                .iter()
                .all(|dep| included.contains(dep));
            if view.cost <= max_cost && deps_included {
                included.insert(name);
                plan.push(view);
            }
        }
        plan
    }
}

/// `CASE <column> WHEN 1 THEN ... END` with no ELSE, so unknown values give NULL
pub fn case_table(column: &str, rows: &[(i64, i64)]) -> String {
    let arms = rows
        .iter()
        .map(|(when, then)| format!("WHEN {} THEN {}", when, then))
        .collect::<Vec<_>>()
        .join(" ");
    format!("CASE {} {} END", column, arms)
}
