//! View models for whatever renders the client's results: query state, form errors and
//! list tables.

use crate::{
    resources::{Entity, ListDocument, Resource, ResourceKind},
    ApiError, FieldErrors
};
use chrono::{DateTime, Utc};
use std::fmt;

/// The state of a query as a view sees it.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryState<T> {
    Loading,
    Ready(T),
    Failed(ApiError)
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            QueryState::Failed(e) => Some(e),
            _ => None
        }
    }
}

impl<T> From<Result<T, ApiError>> for QueryState<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => QueryState::Ready(data),
            Err(e) => QueryState::Failed(e)
        }
    }
}

/// What a form shows after a failed submit: messages next to fields, and a banner for
/// everything that can't be pinned on a field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormErrors {
    pub fields: FieldErrors,
    pub root: Option<String>
}

impl FormErrors {
    pub fn from_validation(fields: FieldErrors) -> Self {
        FormErrors { fields, root: None }
    }

    /// Map a failed mutation onto the form. `action` is the verb in progressive form, e.g.
    /// `"creating"`.
    pub fn from_api_error(error: &ApiError, action: &str, kind: ResourceKind) -> Self {
        match error {
            ApiError::Validation { field_errors } => FormErrors::from_validation(field_errors.clone()),
            other => FormErrors {
                fields: FieldErrors::new(),
                root: Some(other.detail().unwrap_or_else(|| {
                    format!("An error occurred while {} the {}", action, kind.singular())
                }))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.root.is_none()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(root) = &self.root {
            writeln!(f, "{}", root)?;
        }
        for (field, message) in &self.fields {
            writeln!(f, "  {}: {}", field, message)?;
        }
        Ok(())
    }
}

/// How an entity is shown in its list page.
pub trait Tabular: Entity {
    const COLUMNS: &'static [&'static str];

    fn row(resource: &Resource<Self::Attributes>) -> Vec<String>;
}

/// Dates are shown without the time of day.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    /// Total number of entities on the server, across all pages.
    pub total: u64
}

impl Table {
    pub fn for_list<E: Tabular>(document: &ListDocument<E::Attributes>) -> Self {
        Table {
            columns: E::COLUMNS.to_vec(),
            rows: document.data.iter().map(E::row).collect(),
            total: document.meta.total
        }
    }

    pub fn for_one<E: Tabular>(resource: &Resource<E::Attributes>) -> Self {
        Table {
            columns: E::COLUMNS.to_vec(),
            rows: vec![E::row(resource)],
            total: 1
        }
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

fn write_line<S: AsRef<str>>(
    f: &mut fmt::Formatter<'_>,
    widths: &[usize],
    cells: impl Iterator<Item = S>
) -> fmt::Result {
    let cells: Vec<String> = cells
        .zip(widths.iter())
        .map(|(cell, width)| format!("{:width$}", cell.as_ref(), width = width))
        .collect();
    writeln!(f, "{}", cells.join("  ").trim_end())
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        write_line(f, &widths, self.columns.iter())?;
        write_line(f, &widths, widths.iter().map(|width| "-".repeat(*width)))?;
        if self.rows.is_empty() {
            writeln!(f, "No entries found.")?;
        }
        for row in &self.rows {
            write_line(f, &widths, row.iter())?;
        }
        Ok(())
    }
}
