//! Query Engine
//!
//! Executes parsed statements against a namespace. The engine owns the
//! evaluator, the `list_limit` setting and (through the evaluator) the
//! group store; the namespace itself is shared with the writers that
//! register series.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info};

use super::parser::parse_statement;
use super::{Column, QueryOutput, Statement};
use crate::config::{ApplicationConfig, QueryConfig};
use crate::error::{EvalError, Result};
use crate::groups::GroupStore;
use crate::namespace::NamespaceSource;
use crate::selector::{Evaluator, PatternMatcher, RegexLiteral, Selector, SeriesList, TermSource};
use crate::settings::ListLimitSetting;

/// Statement executor
pub struct QueryEngine {
    namespace: Arc<dyn NamespaceSource>,
    evaluator: Evaluator,
    list_limit: ListLimitSetting,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("evaluator", &self.evaluator)
            .field("list_limit", &self.list_limit)
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    /// Create an engine from application configuration
    ///
    /// Opens the groups file when `groups.path` is set.
    pub fn new<S>(namespace: Arc<S>, config: &ApplicationConfig) -> Result<Self>
    where
        S: NamespaceSource + 'static,
    {
        let groups = match &config.groups.path {
            Some(path) => GroupStore::open(path)?,
            None => GroupStore::new(),
        };
        Ok(Self::with_groups(namespace, Arc::new(groups), &config.query))
    }

    /// Create an engine with an existing group store
    pub fn with_groups<S>(namespace: Arc<S>, groups: Arc<GroupStore>, config: &QueryConfig) -> Self
    where
        S: NamespaceSource + 'static,
    {
        let matcher = PatternMatcher::new(config.matcher_config());
        Self {
            namespace,
            evaluator: Evaluator::new(matcher, groups),
            list_limit: ListLimitSetting::new(config.default_list_limit, config.max_list_limit),
        }
    }

    /// Selector evaluator
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// `list_limit` setting
    pub fn list_limit(&self) -> &ListLimitSetting {
        &self.list_limit
    }

    /// Parse and execute a statement
    pub fn execute(&self, text: &str) -> Result<QueryOutput> {
        let start = Instant::now();
        let result = parse_statement(text)
            .map_err(Into::into)
            .and_then(|statement| self.execute_statement(statement));

        match &result {
            Ok(_) => debug!(
                statement = text,
                elapsed_us = start.elapsed().as_micros() as u64,
                "statement executed"
            ),
            Err(e) => debug!(statement = text, error = %e, "statement failed"),
        }

        result
    }

    /// Execute a parsed statement
    pub fn execute_statement(&self, statement: Statement) -> Result<QueryOutput> {
        match statement {
            Statement::ListSeries {
                columns,
                selector,
                filter,
                limit,
            } => {
                let list = self.evaluator.list_where(
                    self.namespace.as_ref(),
                    selector.as_ref(),
                    filter.as_ref(),
                    limit,
                    self.list_limit.limit_config(),
                )?;
                Ok(series_rows(&columns, &list))
            },
            Statement::CountSeries { selector, filter } => {
                let series = self.evaluator.count_where(
                    self.namespace.as_ref(),
                    selector.as_ref(),
                    filter.as_ref(),
                )?;
                Ok(QueryOutput::Count { series })
            },
            Statement::AlterListLimit(requested) => {
                self.list_limit.set(requested)?;
                Ok(QueryOutput::Success {
                    success_msg: format!("list_limit set to {}", requested),
                })
            },
            Statement::ShowListLimit => Ok(QueryOutput::ListLimit {
                list_limit: self.list_limit.get(),
            }),
            Statement::CreateGroup { name, expression } => self.create_group(name, expression),
            Statement::DropGroup(name) => self.drop_group(name),
            Statement::ListGroups => self.list_groups(),
        }
    }

    fn create_group(&self, name: String, expression: RegexLiteral) -> Result<QueryOutput> {
        // Reject regexes that could never be evaluated
        self.evaluator.matcher().compile_regex(&expression)?;
        self.evaluator.groups().create(&name, expression.clone())?;

        info!(group = %name, expression = %expression, "group created");
        Ok(QueryOutput::Success {
            success_msg: format!("Group '{}' created", name),
        })
    }

    fn drop_group(&self, name: String) -> Result<QueryOutput> {
        self.evaluator.groups().delete(&name)?;

        info!(group = %name, "group dropped");
        Ok(QueryOutput::Success {
            success_msg: format!("Group '{}' dropped", name),
        })
    }

    fn list_groups(&self) -> Result<QueryOutput> {
        let mut rows = Vec::new();
        for group in self.evaluator.groups().list() {
            let selector = Selector::new(TermSource::Group(group.name.clone()), []);
            // A group dropped concurrently shows up with no series
            let series = match self.evaluator.count(self.namespace.as_ref(), Some(&selector)) {
                Ok(count) => count,
                Err(EvalError::UnknownGroup(_)) => 0,
                Err(e) => return Err(e.into()),
            };
            rows.push(vec![
                json!(group.name),
                json!(group.expression.to_string()),
                json!(series),
            ]);
        }

        Ok(QueryOutput::Groups {
            columns: vec!["name".into(), "expression".into(), "series".into()],
            groups: rows,
        })
    }
}

/// Build `list series` rows for the requested columns
fn series_rows(columns: &[Column], list: &SeriesList) -> QueryOutput {
    let columns: &[Column] = if columns.is_empty() {
        &[Column::Name]
    } else {
        columns
    };

    let series = list
        .iter()
        .map(|entry| {
            columns
                .iter()
                .map(|column| match column {
                    Column::Name => Value::from(entry.name()),
                    Column::Type => Value::from(entry.series_type().to_string()),
                    Column::Length => Value::from(entry.length()),
                })
                .collect()
        })
        .collect();

    QueryOutput::Series {
        columns: columns.iter().map(ToString::to_string).collect(),
        series,
    }
}
