use serde::Serialize;

use crate::{
    ast::{CARET_MARKER, CaretExpr, Query},
    lineage::{
        catalog::TableLookup,
        scope::{CaretPosition, Column, Relation, ResolverHooks, ScopeResolver, ScopeView, Target},
    },
    parser::parse_sql,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleColumn {
    /// Binding the column belongs to, `None` when the candidate is a binding name itself.
    pub relation: Option<String>,
    pub name: String,
}

/// What can be typed at the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Columns(Vec<VisibleColumn>),
    Relations {
        ctes: Vec<String>,
        /// Multi-part name already typed, for a lookup in an external catalog.
        prefix: Vec<String>,
    },
    Other,
}

/// Inserts the caret marker at `cursor`, a char offset clamped to the end of `sql`.
pub fn insert_caret(sql: &str, cursor: usize) -> String {
    let mut with_caret = String::with_capacity(sql.len() + CARET_MARKER.len_utf8());
    let mut inserted = false;
    for (offset, c) in sql.chars().enumerate() {
        if offset == cursor {
            with_caret.push(CARET_MARKER);
            inserted = true;
        }
        with_caret.push(c);
    }
    if !inserted {
        with_caret.push(CARET_MARKER);
    }
    with_caret
}

fn column_candidates(view: &ScopeView<'_>, caret: &CaretExpr) -> Vec<VisibleColumn> {
    let relation_columns = |binding: &str, relation: &Relation| -> Vec<VisibleColumn> {
        relation
            .columns
            .iter()
            .map(|col: &Column| VisibleColumn {
                relation: Some(binding.to_owned()),
                name: col.label.clone(),
            })
            .collect()
    };

    match caret.qualifier.last() {
        Some(qualifier) => view
            .resolve_relation(qualifier)
            .map(|relation| relation_columns(&qualifier.value, relation))
            .unwrap_or_default(),
        None => {
            let mut candidates: Vec<VisibleColumn> = view
                .visible_bindings()
                .into_iter()
                .map(|binding| VisibleColumn {
                    relation: None,
                    name: binding.to_owned(),
                })
                .collect();
            for (binding, relation) in view.bindings() {
                candidates.extend(relation_columns(binding, relation));
            }
            candidates
        }
    }
}

/// Records what is visible at the first caret the resolver reaches.
#[derive(Debug, Default)]
pub struct CompletionClassifier {
    completion: Option<Completion>,
}

impl CompletionClassifier {
    pub fn completion(self) -> Completion {
        self.completion.unwrap_or(Completion::Other)
    }
}

impl ResolverHooks for CompletionClassifier {
    fn on_relation(&mut self, _relation: &Relation, _alias: Option<&str>) {}

    fn on_column_reference(&mut self, _target: &Target, _source_table_id: &str, _source_column_id: &str) {}

    fn on_caret(&mut self, view: &ScopeView<'_>, caret: &CaretExpr, position: CaretPosition) {
        if self.completion.is_some() {
            return;
        }
        let completion = match position {
            CaretPosition::Column => Completion::Columns(column_candidates(view, caret)),
            CaretPosition::Relation => Completion::Relations {
                ctes: view
                    .visible_ctes()
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
                prefix: caret
                    .qualifier
                    .iter()
                    .map(|part| part.value.clone())
                    .chain(caret.prefix.clone())
                    .collect(),
            },
        };
        log::debug!("Caret at {:?} classified as {:?}", caret.range, completion);
        self.completion = Some(completion);
    }
}

/// Classifies the caret found in `query`, or [`Completion::Other`] if there is none.
pub fn classify<L: TableLookup + ?Sized>(query: &Query, lookup: &L) -> anyhow::Result<Completion> {
    let mut resolver = ScopeResolver::new(lookup, CompletionClassifier::default());
    resolver.resolve(query)?;
    Ok(resolver.into_hooks().completion())
}

/// Classifies what can be typed at char offset `cursor` of `sql`.
pub fn complete_at<L: TableLookup + ?Sized>(sql: &str, cursor: usize, lookup: &L) -> Completion {
    let ast = match parse_sql(&insert_caret(sql, cursor)) {
        Ok(ast) => ast,
        Err(err) => {
            log::debug!("Cannot classify the cursor, the query does not parse: {}", err);
            return Completion::Other;
        }
    };

    for query in &ast.queries {
        match classify(query, lookup) {
            Ok(Completion::Other) => {}
            Ok(completion) => return completion,
            Err(err) => log::debug!("Cannot classify the cursor: {}", err),
        }
    }
    Completion::Other
}
