use std::fmt::Display;

use anyhow::anyhow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display as EnumDisplay, EnumString};

use crate::{
    arena::{Arena, ArenaIndex},
    ast::{
        CaretExpr, Cte, DerivedTable, Expr, FromExpr, FunctionArg, Ident, JoinConstraint, Query,
        QueryBody, Select, SelectItem, SourceRange, TableAlias, TableFactor,
    },
    lineage::catalog::{TableLookup, TableName},
};

/// Label under which the outermost query is exposed.
pub const FINAL_RESULT_LABEL: &str = "[final result]";

/// The clause in which a column reference was found.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumDisplay, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Clause {
    Select,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct TableRelation {
    /// The name as referenced in the query.
    pub name: TableName,
    /// Identity of the real table, shared by every reference resolving to it.
    pub table_id: String,
    pub payload: Option<Value>,
}

/// A query scope. Only valid while (and after) the resolver walks the query.
#[derive(Debug, Clone, Default)]
pub struct QueryRelation {
    pub(crate) parent: Option<ArenaIndex>,
    /// FROM bindings in declaration order.
    pub(crate) relations: IndexMap<String, ArenaIndex>,
    pub(crate) ctes: IndexMap<String, ArenaIndex>,
    column_seq: usize,
}

#[derive(Debug, Clone)]
pub enum RelationKind {
    Table(TableRelation),
    Query(QueryRelation),
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub id: String,
    pub range: Option<SourceRange>,
    pub columns: Vec<Column>,
    /// Nesting depth below the outermost query.
    pub depth: u32,
    pub kind: RelationKind,
}

impl Relation {
    fn find_column(&self, name: &Ident) -> Option<&Column> {
        self.columns.iter().find(|col| name.matches(&col.label))
    }
}

/// Walk-order invariant violations. These are bugs, not bad input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    ScopeUnderflow,
    ScopeMismatch { expected: String, found: String },
    NotAScope(String),
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::ScopeUnderflow => write!(f, "Cannot exit a scope above the root."),
            ResolveError::ScopeMismatch { expected, found } => write!(
                f,
                "Expected to exit scope `{}` but the current scope is `{}`.",
                expected, found
            ),
            ResolveError::NotAScope(id) => {
                write!(f, "Relation `{}` is a table, not a query scope.", id)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Where a found column reference is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub relation_id: String,
    /// `None` for whole-relation dependencies, i.e. anything outside the select list.
    pub column_id: Option<String>,
    pub clause: Clause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretPosition {
    Column,
    Relation,
}

/// Read-only view of the scope the resolver is in when it reaches the caret.
pub struct ScopeView<'a> {
    relations: &'a Arena<Relation>,
    scope: ArenaIndex,
}

impl<'a> ScopeView<'a> {
    fn scopes(&self) -> impl Iterator<Item = &'a QueryRelation> + use<'a> {
        let relations = self.relations;
        std::iter::successors(Some(self.scope), move |idx| match &relations[*idx].kind {
            RelationKind::Query(query) => query.parent,
            RelationKind::Table(_) => None,
        })
        .filter_map(move |idx| match &relations[idx].kind {
            RelationKind::Query(query) => Some(query),
            RelationKind::Table(_) => None,
        })
    }

    /// Binding names visible from the current scope outward, nearest first.
    pub fn visible_bindings(&self) -> Vec<&'a str> {
        let mut names: Vec<&str> = vec![];
        for scope in self.scopes() {
            for name in scope.relations.keys() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// The current scope's bindings in FROM order.
    pub fn bindings(&self) -> Vec<(&'a str, &'a Relation)> {
        let relations = self.relations;
        self.scopes()
            .next()
            .map(|scope| {
                scope
                    .relations
                    .iter()
                    .map(|(name, idx)| (name.as_str(), &relations[*idx]))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// CTE names visible from the current scope outward, nearest first.
    pub fn visible_ctes(&self) -> Vec<&'a str> {
        let mut names: Vec<&str> = vec![];
        for scope in self.scopes() {
            for name in scope.ctes.keys() {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Finds a binding walking outward from the current scope.
    pub fn resolve_relation(&self, name: &Ident) -> Option<&'a Relation> {
        let relations = self.relations;
        self.scopes().find_map(|scope| {
            scope
                .relations
                .iter()
                .find(|(key, _)| name.matches(key))
                .map(|(_, idx)| &relations[*idx])
        })
    }
}

/// Extension points invoked while resolving a query.
pub trait ResolverHooks {
    /// A relation was finalized: a table on resolution, a query scope on exit.
    fn on_relation(&mut self, relation: &Relation, alias: Option<&str>);

    /// A column reference was resolved while computing `target`.
    fn on_column_reference(&mut self, target: &Target, source_table_id: &str, source_column_id: &str);

    fn on_caret(&mut self, _view: &ScopeView<'_>, _caret: &CaretExpr, _position: CaretPosition) {}
}

pub struct ScopeResolver<'a, L: TableLookup + ?Sized, H: ResolverHooks> {
    lookup: &'a L,
    hooks: H,
    relations: Arena<Relation>,
    current: Option<ArenaIndex>,
    query_seq: usize,
    table_seq: usize,
}

impl<'a, L: TableLookup + ?Sized, H: ResolverHooks> ScopeResolver<'a, L, H> {
    pub fn new(lookup: &'a L, hooks: H) -> Self {
        Self {
            lookup,
            hooks,
            relations: Arena::default(),
            current: None,
            query_seq: 0,
            table_seq: 0,
        }
    }

    pub fn into_hooks(self) -> H {
        self.hooks
    }

    /// Resolves a top-level query, exposing it under [`FINAL_RESULT_LABEL`].
    pub fn resolve(&mut self, query: &Query) -> anyhow::Result<()> {
        let root = self.resolve_query(query)?;
        if let Some(current) = self.current {
            return Err(anyhow!(ResolveError::ScopeMismatch {
                expected: "<none>".to_owned(),
                found: self.relations[current].id.clone(),
            }));
        }
        self.hooks
            .on_relation(&self.relations[root], Some(FINAL_RESULT_LABEL));
        Ok(())
    }

    fn query(&self, idx: ArenaIndex) -> anyhow::Result<&QueryRelation> {
        match &self.relations[idx].kind {
            RelationKind::Query(query) => Ok(query),
            RelationKind::Table(_) => Err(anyhow!(ResolveError::NotAScope(
                self.relations[idx].id.clone()
            ))),
        }
    }

    fn query_mut(&mut self, idx: ArenaIndex) -> anyhow::Result<&mut QueryRelation> {
        let relation = &mut self.relations[idx];
        match &mut relation.kind {
            RelationKind::Query(query) => Ok(query),
            RelationKind::Table(_) => Err(anyhow!(ResolveError::NotAScope(relation.id.clone()))),
        }
    }

    fn enter_scope(&mut self, range: SourceRange) -> ArenaIndex {
        self.query_seq += 1;
        let depth = self
            .current
            .map_or(0, |current| self.relations[current].depth + 1);
        let idx = self.relations.allocate(Relation {
            id: format!("result_{}", self.query_seq),
            range: Some(range),
            columns: vec![],
            depth,
            kind: RelationKind::Query(QueryRelation {
                parent: self.current,
                ..Default::default()
            }),
        });
        log::trace!("Entering scope {} at depth {}", self.relations[idx].id, depth);
        self.current = Some(idx);
        idx
    }

    fn exit_scope(&mut self, expected: ArenaIndex) -> anyhow::Result<()> {
        let current = self.current.ok_or(anyhow!(ResolveError::ScopeUnderflow))?;
        if current != expected {
            return Err(anyhow!(ResolveError::ScopeMismatch {
                expected: self.relations[expected].id.clone(),
                found: self.relations[current].id.clone(),
            }));
        }
        log::trace!("Exiting scope {}", self.relations[current].id);
        self.current = self.query(current)?.parent;
        Ok(())
    }

    fn current_scope(&self) -> anyhow::Result<ArenaIndex> {
        self.current.ok_or(anyhow!(ResolveError::ScopeUnderflow))
    }

    fn bind(&mut self, scope: ArenaIndex, name: &str, relation: ArenaIndex) -> anyhow::Result<()> {
        log::trace!(
            "Binding `{}` to {} in {}",
            name,
            self.relations[relation].id,
            self.relations[scope].id
        );
        self.query_mut(scope)?
            .relations
            .insert(name.to_owned(), relation);
        Ok(())
    }

    /// Appends an output column, or reuses the one a previous set-operation term
    /// created at the same position.
    fn add_output_column(
        &mut self,
        scope: ArenaIndex,
        label: &str,
        range: Option<SourceRange>,
    ) -> anyhow::Result<String> {
        let query = self.query_mut(scope)?;
        query.column_seq += 1;
        let id = format!("column_{}", query.column_seq);
        let relation = &mut self.relations[scope];
        if !relation.columns.iter().any(|col| col.id == id) {
            relation.columns.push(Column {
                id: id.clone(),
                label: label.to_owned(),
                range,
                payload: None,
            });
        }
        Ok(id)
    }

    fn emit_reference(&mut self, target: &Target, relation: ArenaIndex, column_id: &str) {
        self.hooks
            .on_column_reference(target, &self.relations[relation].id, column_id);
    }

    fn emit_caret(&mut self, caret: &CaretExpr, position: CaretPosition) -> anyhow::Result<()> {
        let scope = self.current_scope()?;
        let view = ScopeView {
            relations: &self.relations,
            scope,
        };
        self.hooks.on_caret(&view, caret, position);
        Ok(())
    }

    /// Walks a (sub)query in a fresh child scope and returns that scope.
    /// Exposing it through `on_relation` is left to the caller, which knows the alias.
    fn resolve_query(&mut self, query: &Query) -> anyhow::Result<ArenaIndex> {
        let scope = self.enter_scope(query.range);
        self.resolve_query_in_scope(query, scope, &mut true)?;
        self.exit_scope(scope)?;
        Ok(scope)
    }

    fn resolve_query_in_scope(
        &mut self,
        query: &Query,
        scope: ArenaIndex,
        first_term: &mut bool,
    ) -> anyhow::Result<()> {
        if let Some(with) = &query.with {
            for cte in &with.ctes {
                self.resolve_cte(cte, scope)?;
            }
        }

        self.resolve_query_body(&query.body, scope, first_term)?;

        if let Some(order_by) = &query.order_by {
            let target = Target {
                relation_id: self.relations[scope].id.clone(),
                column_id: None,
                clause: Clause::OrderBy,
            };
            for item in &order_by.items {
                self.resolve_expr(&item.expr, &target)?;
            }
        }
        Ok(())
    }

    fn resolve_query_body(
        &mut self,
        body: &QueryBody,
        scope: ArenaIndex,
        first_term: &mut bool,
    ) -> anyhow::Result<()> {
        match body {
            QueryBody::Select(select) => {
                if !*first_term {
                    // Each term has its own FROM, output columns line up by position.
                    let query = self.query_mut(scope)?;
                    query.relations.clear();
                    query.column_seq = 0;
                }
                *first_term = false;
                self.resolve_select(select, scope)
            }
            QueryBody::Nested(query) => self.resolve_query_in_scope(query, scope, first_term),
            QueryBody::SetOperation(set_operation) => {
                self.resolve_query_body(&set_operation.left, scope, first_term)?;
                self.resolve_query_body(&set_operation.right, scope, first_term)
            }
        }
    }

    fn resolve_cte(&mut self, cte: &Cte, scope: ArenaIndex) -> anyhow::Result<()> {
        let child = self.resolve_query(&cte.query)?;
        self.rename_columns(child, &cte.columns);
        self.query_mut(scope)?
            .ctes
            .insert(cte.name.value.clone(), child);
        log::trace!("Registered CTE `{}` in {}", cte.name.value, self.relations[scope].id);
        self.hooks
            .on_relation(&self.relations[child], Some(&cte.name.value));
        Ok(())
    }

    fn rename_columns(&mut self, relation: ArenaIndex, names: &[Ident]) {
        let columns = &mut self.relations[relation].columns;
        for (column, name) in columns.iter_mut().zip(names) {
            column.label = name.value.clone();
        }
    }

    // The FROM clause is walked first so that every other clause sees all of its bindings.
    fn resolve_select(&mut self, select: &Select, scope: ArenaIndex) -> anyhow::Result<()> {
        if let Some(from) = &select.from {
            self.resolve_from(from, scope)?;
        }

        for item in &select.items {
            self.resolve_select_item(item, scope)?;
        }

        let relation_id = self.relations[scope].id.clone();
        let table_target = |clause| Target {
            relation_id: relation_id.clone(),
            column_id: None,
            clause,
        };

        if let Some(r#where) = &select.r#where {
            self.resolve_expr(r#where, &table_target(Clause::Where))?;
        }
        if let Some(group_by) = &select.group_by {
            let target = table_target(Clause::GroupBy);
            for expr in group_by {
                self.resolve_expr(expr, &target)?;
            }
        }
        if let Some(having) = &select.having {
            self.resolve_expr(having, &table_target(Clause::Having))?;
        }
        Ok(())
    }

    fn resolve_select_item(&mut self, item: &SelectItem, scope: ArenaIndex) -> anyhow::Result<()> {
        match item {
            SelectItem::Expr(item) => {
                let label = match (&item.alias, &item.expr) {
                    (Some(alias), _) => alias.value.clone(),
                    (None, Expr::Identifier(ident)) => ident.value.clone(),
                    (None, Expr::CompoundIdentifier(parts)) => parts
                        .last()
                        .map_or_else(|| item.text.clone(), |part| part.value.clone()),
                    (None, _) => item.text.clone(),
                };
                let column_id = self.add_output_column(scope, &label, Some(item.range))?;
                let target = Target {
                    relation_id: self.relations[scope].id.clone(),
                    column_id: Some(column_id),
                    clause: Clause::Select,
                };
                self.resolve_expr(&item.expr, &target)
            }
            SelectItem::Star(_) => {
                let sources: Vec<ArenaIndex> =
                    self.query(scope)?.relations.values().copied().collect();
                for source in sources {
                    self.expand_star(scope, source)?;
                }
                Ok(())
            }
            SelectItem::QualifiedStar(item) => {
                match self.find_relation_outward(scope, item.qualifier.base()) {
                    Some(source) => self.expand_star(scope, source),
                    None => {
                        log::trace!("Dropping unresolved star `{}.*`", item.qualifier.dotted());
                        Ok(())
                    }
                }
            }
        }
    }

    fn expand_star(&mut self, scope: ArenaIndex, source: ArenaIndex) -> anyhow::Result<()> {
        let columns = self.relations[source].columns.clone();
        for column in columns {
            let column_id = self.add_output_column(scope, &column.label, column.range)?;
            let target = Target {
                relation_id: self.relations[scope].id.clone(),
                column_id: Some(column_id),
                clause: Clause::Select,
            };
            self.emit_reference(&target, source, &column.id);
        }
        Ok(())
    }

    /// Walks a FROM item and returns the relations it bound.
    fn resolve_from(&mut self, from: &FromExpr, scope: ArenaIndex) -> anyhow::Result<Vec<ArenaIndex>> {
        match from {
            FromExpr::Table(table) => Ok(self.resolve_table(table, scope)?.into_iter().collect()),
            FromExpr::Derived(derived) => Ok(vec![self.resolve_derived(derived, scope)?]),
            FromExpr::Nested(inner) => self.resolve_from(inner, scope),
            FromExpr::Caret(caret) => {
                self.emit_caret(caret, CaretPosition::Relation)?;
                Ok(vec![])
            }
            FromExpr::Join(join) => {
                let left = self.resolve_from(&join.left, scope)?;
                let right = self.resolve_from(&join.right, scope)?;
                let target = Target {
                    relation_id: self.relations[scope].id.clone(),
                    column_id: None,
                    clause: Clause::From,
                };
                match &join.constraint {
                    JoinConstraint::On(expr) => self.resolve_expr(expr, &target)?,
                    JoinConstraint::Using(columns) => {
                        for column in columns {
                            for side in [&left, &right] {
                                let found = side.iter().find_map(|idx| {
                                    self.relations[*idx]
                                        .find_column(column)
                                        .map(|col| (*idx, col.id.clone()))
                                });
                                if let Some((relation, column_id)) = found {
                                    self.emit_reference(&target, relation, &column_id);
                                }
                            }
                        }
                    }
                    JoinConstraint::Natural | JoinConstraint::None => {}
                }
                Ok(left.into_iter().chain(right).collect())
            }
        }
    }

    fn find_cte(&self, scope: ArenaIndex, name: &Ident) -> Option<ArenaIndex> {
        let mut curr = Some(scope);
        while let Some(idx) = curr {
            let query = self.query(idx).ok()?;
            if let Some((_, cte)) = query.ctes.iter().find(|(key, _)| name.matches(key)) {
                return Some(*cte);
            }
            curr = query.parent;
        }
        None
    }

    fn find_relation_outward(&self, scope: ArenaIndex, name: &Ident) -> Option<ArenaIndex> {
        let mut curr = Some(scope);
        while let Some(idx) = curr {
            let query = self.query(idx).ok()?;
            if let Some((_, relation)) = query.relations.iter().find(|(key, _)| name.matches(key)) {
                return Some(*relation);
            }
            curr = query.parent;
        }
        None
    }

    /// Returns the bound relation, if any was bound.
    fn resolve_table(
        &mut self,
        table: &TableFactor,
        scope: ArenaIndex,
    ) -> anyhow::Result<Option<ArenaIndex>> {
        let base = table.name.base();
        let alias = table.alias.as_ref().map(|alias| &alias.name);

        if table.name.is_single() {
            if let Some(cte) = self.find_cte(scope, base) {
                let name = alias.unwrap_or(base);
                self.bind(scope, &name.value, cte)?;
                return Ok(Some(cte));
            }

            // A relation bound by an enclosing query, e.g. in a correlated subquery.
            let parent = self.query(scope)?.parent;
            let outer = parent.and_then(|parent| self.find_relation_outward(parent, base));
            if let Some(outer) = outer {
                if let Some(alias) = alias.filter(|alias| alias.value != base.value) {
                    self.bind(scope, &alias.value, outer)?;
                }
                return Ok(Some(outer));
            }
        }

        let name = TableName::from_idents(&table.name.parts);
        let (table_id, payload, columns) = match self.lookup.lookup_table(&name) {
            Some(metadata) => (
                metadata.table_id,
                metadata.payload,
                metadata
                    .columns
                    .into_iter()
                    .map(|col| Column {
                        id: col.column_id.clone(),
                        label: col.column_id,
                        range: None,
                        payload: col.payload,
                    })
                    .collect(),
            ),
            None => {
                log::debug!("Unknown table `{}`, resolving it with no columns", name);
                (name.key(), None, vec![])
            }
        };

        self.table_seq += 1;
        let depth = self.relations[scope].depth + 1;
        let relation = self.relations.allocate(Relation {
            id: format!("table_{}", self.table_seq),
            range: Some(table.range),
            columns,
            depth,
            kind: RelationKind::Table(TableRelation {
                name,
                table_id,
                payload,
            }),
        });

        let binding = alias.unwrap_or(base);
        self.bind(scope, &binding.value, relation)?;
        self.hooks.on_relation(
            &self.relations[relation],
            alias.map(|alias| alias.value.as_str()),
        );
        Ok(Some(relation))
    }

    fn resolve_derived(&mut self, derived: &DerivedTable, scope: ArenaIndex) -> anyhow::Result<ArenaIndex> {
        let child = self.resolve_query(&derived.query)?;
        let alias: Option<&TableAlias> = derived.alias.as_ref();
        if let Some(alias) = alias {
            self.rename_columns(child, &alias.columns);
        }
        let binding = match alias {
            Some(alias) => alias.name.value.clone(),
            None => self.relations[child].id.clone(),
        };
        self.bind(scope, &binding, child)?;
        self.hooks.on_relation(
            &self.relations[child],
            alias.map(|alias| alias.name.value.as_str()),
        );
        Ok(child)
    }

    fn resolve_column_reference(
        &mut self,
        qualifier: Option<&Ident>,
        column: &Ident,
        target: &Target,
    ) -> anyhow::Result<()> {
        let scope = self.current_scope()?;
        let found = match qualifier {
            Some(qualifier) => self
                .find_relation_outward(scope, qualifier)
                .and_then(|relation| {
                    self.relations[relation]
                        .find_column(column)
                        .map(|col| (relation, col.id.clone()))
                }),
            // Unqualified references never reach into enclosing queries.
            None => self.query(scope)?.relations.values().find_map(|relation| {
                self.relations[*relation]
                    .find_column(column)
                    .map(|col| (*relation, col.id.clone()))
            }),
        };

        match found {
            Some((relation, column_id)) => self.emit_reference(target, relation, &column_id),
            None => log::trace!(
                "Dropping unresolved reference `{}{}`",
                qualifier.map_or(String::new(), |q| format!("{}.", q.value)),
                column.value
            ),
        }
        Ok(())
    }

    /// Walks a subquery used as an expression; each of its output columns feeds `target`.
    fn resolve_expr_subquery(&mut self, query: &Query, target: &Target) -> anyhow::Result<()> {
        let child = self.resolve_query(query)?;
        self.hooks.on_relation(&self.relations[child], None);
        let column_ids: Vec<String> = self.relations[child]
            .columns
            .iter()
            .map(|col| col.id.clone())
            .collect();
        for column_id in column_ids {
            self.emit_reference(target, child, &column_id);
        }
        Ok(())
    }

    fn resolve_expr(&mut self, expr: &Expr, target: &Target) -> anyhow::Result<()> {
        match expr {
            Expr::Identifier(ident) => self.resolve_column_reference(None, ident, target),
            Expr::CompoundIdentifier(parts) => match parts.split_last() {
                Some((column, qualifier)) => {
                    self.resolve_column_reference(qualifier.last(), column, target)
                }
                None => Ok(()),
            },
            Expr::Literal(_) => Ok(()),
            Expr::Binary(binary) => {
                self.resolve_expr(&binary.left, target)?;
                self.resolve_expr(&binary.right, target)
            }
            Expr::Unary(unary) => self.resolve_expr(&unary.expr, target),
            Expr::Nested(expr) => self.resolve_expr(expr, target),
            Expr::Function(function) => {
                for arg in &function.args {
                    match arg {
                        FunctionArg::Expr(expr) => self.resolve_expr(expr, target)?,
                        // count(*) references no column
                        FunctionArg::Star => {}
                    }
                }
                if let Some(window) = &function.over {
                    for expr in &window.partition_by {
                        self.resolve_expr(expr, target)?;
                    }
                    for item in &window.order_by {
                        self.resolve_expr(&item.expr, target)?;
                    }
                }
                Ok(())
            }
            Expr::Case(case) => {
                if let Some(operand) = &case.operand {
                    self.resolve_expr(operand, target)?;
                }
                for (when, then) in &case.when_thens {
                    self.resolve_expr(when, target)?;
                    self.resolve_expr(then, target)?;
                }
                if let Some(r#else) = &case.r#else {
                    self.resolve_expr(r#else, target)?;
                }
                Ok(())
            }
            Expr::Cast(cast) => self.resolve_expr(&cast.expr, target),
            Expr::InList(in_list) => {
                self.resolve_expr(&in_list.expr, target)?;
                for expr in &in_list.list {
                    self.resolve_expr(expr, target)?;
                }
                Ok(())
            }
            Expr::InSubquery(in_subquery) => {
                self.resolve_expr(&in_subquery.expr, target)?;
                self.resolve_expr_subquery(&in_subquery.query, target)
            }
            Expr::Between(between) => {
                self.resolve_expr(&between.expr, target)?;
                self.resolve_expr(&between.low, target)?;
                self.resolve_expr(&between.high, target)
            }
            Expr::Like(like) => {
                self.resolve_expr(&like.expr, target)?;
                self.resolve_expr(&like.pattern, target)
            }
            Expr::Is(is) => self.resolve_expr(&is.expr, target),
            Expr::Exists(exists) => self.resolve_expr_subquery(&exists.query, target),
            Expr::Subquery(query) => self.resolve_expr_subquery(query, target),
            Expr::Caret(caret) => self.emit_caret(caret, CaretPosition::Column),
        }
    }
}
