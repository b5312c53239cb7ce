//! Statement building for the data store.
//!
//! Every table and column identifier is checked against [`TableName`]'s schema
//! before it reaches SQL; values are always bound parameters. Statements are
//! built with `sea-query` and rendered for whichever backend executes them.

use super::values::Params;
use crate::entities::{ColumnSpec, TableName};
use crate::errors::{Error, Result};
use sea_orm::Value;
use sea_orm::sea_query::{
    Alias, ConditionalStatement, DeleteStatement, Expr, InsertStatement, Order, OrderedStatement,
    Query, SelectStatement, SimpleExpr, UpdateStatement,
};

/// Sort direction for [`OrderBy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

/// Column to sort select results by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    /// Column name, validated against the table schema
    pub column: String,
    /// Sort direction
    pub direction: Direction,
}

impl OrderBy {
    /// Ascending order on `column`.
    #[must_use]
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    /// Descending order on `column`.
    #[must_use]
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

/// Optional parts of a select.
///
/// The default selects every column of every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectOptions {
    /// Columns to return, `None` for all columns in schema order
    pub columns: Option<Vec<String>>,
    /// Equality conditions, AND-conjoined
    pub filter: Params,
    /// Maximum number of rows
    pub limit: Option<u64>,
    /// Result ordering
    pub order_by: Option<OrderBy>,
}

impl SelectOptions {
    /// All columns, all rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the returned columns.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Only rows matching every `column = value` pair.
    #[must_use]
    pub fn filter(mut self, filter: Params) -> Self {
        self.filter = filter;
        self
    }

    /// At most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sorts the rows.
    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }
}

/// `INSERT INTO table (cols) VALUES (?, ...)` with values in `data` order.
pub fn insert(table: TableName, data: &Params) -> Result<InsertStatement> {
    let assignments = validated(table, data)?;
    if assignments.is_empty() {
        return Err(Error::EmptyValues {
            operation: "insert",
            table: table.as_str(),
        });
    }

    let (columns, values): (Vec<Alias>, Vec<SimpleExpr>) = assignments
        .into_iter()
        .map(|(column, value)| (column, SimpleExpr::from(value)))
        .unzip();

    let mut statement = Query::insert();
    statement.into_table(Alias::new(table.as_str())).columns(columns);
    statement.values(values)?;
    Ok(statement)
}

/// `SELECT cols FROM table [WHERE ...] [ORDER BY ...] [LIMIT ?]`.
///
/// Also returns the selected columns so rows can be decoded by type.
pub fn select(
    table: TableName,
    options: &SelectOptions,
) -> Result<(SelectStatement, Vec<ColumnSpec>)> {
    let columns = match &options.columns {
        Some(names) if names.is_empty() => {
            return Err(Error::EmptyValues {
                operation: "select",
                table: table.as_str(),
            });
        }
        Some(names) => names
            .iter()
            .map(|name| table.column(name))
            .collect::<Result<Vec<_>>>()?,
        None => table.columns(),
    };

    let mut statement = Query::select();
    statement
        .columns(columns.iter().map(|column| Alias::new(column.name.as_str())))
        .from(Alias::new(table.as_str()));
    apply_filter(&mut statement, table, &options.filter)?;

    if let Some(order_by) = &options.order_by {
        let column = table.column(&order_by.column)?;
        let order = match order_by.direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        };
        statement.order_by(Alias::new(column.name), order);
    }
    if let Some(limit) = options.limit {
        statement.limit(limit);
    }
    Ok((statement, columns))
}

/// `UPDATE table SET ... WHERE ...`; SET values bind before WHERE values.
///
/// An empty `filter` is rejected, use [`update_all`] to change every row.
pub fn update(table: TableName, data: &Params, filter: &Params) -> Result<UpdateStatement> {
    require_filter("update", table, filter)?;
    let mut statement = update_all(table, data)?;
    apply_filter(&mut statement, table, filter)?;
    Ok(statement)
}

/// `UPDATE table SET ...` without a WHERE clause.
pub fn update_all(table: TableName, data: &Params) -> Result<UpdateStatement> {
    let assignments = validated(table, data)?;
    if assignments.is_empty() {
        return Err(Error::EmptyValues {
            operation: "update",
            table: table.as_str(),
        });
    }

    let mut statement = Query::update();
    statement.table(Alias::new(table.as_str())).values(
        assignments
            .into_iter()
            .map(|(column, value)| (column, SimpleExpr::from(value))),
    );
    Ok(statement)
}

/// `DELETE FROM table WHERE ...`.
///
/// An empty `filter` is rejected, use [`delete_all`] to empty the table.
pub fn delete(table: TableName, filter: &Params) -> Result<DeleteStatement> {
    require_filter("delete", table, filter)?;
    let mut statement = delete_all(table);
    apply_filter(&mut statement, table, filter)?;
    Ok(statement)
}

/// `DELETE FROM table` without a WHERE clause.
#[must_use]
pub fn delete_all(table: TableName) -> DeleteStatement {
    let mut statement = Query::delete();
    statement.from_table(Alias::new(table.as_str()));
    statement
}

fn require_filter(operation: &'static str, table: TableName, filter: &Params) -> Result<()> {
    if filter.is_empty() {
        return Err(Error::UnfilteredWrite {
            operation,
            table: table.as_str(),
        });
    }
    Ok(())
}

fn validated(table: TableName, params: &Params) -> Result<Vec<(Alias, Value)>> {
    params
        .iter()
        .map(|(name, value)| {
            let column = table.column(name)?;
            Ok((Alias::new(column.name), value.clone()))
        })
        .collect()
}

fn apply_filter<S>(statement: &mut S, table: TableName, filter: &Params) -> Result<()>
where
    S: ConditionalStatement,
{
    for (column, value) in validated(table, filter)? {
        statement.and_where(Expr::col(column).eq(value));
    }
    Ok(())
}
