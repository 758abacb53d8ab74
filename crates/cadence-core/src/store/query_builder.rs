use crate::query::{DueDate, Filter, Operator, Query};
use sqlx::{QueryBuilder, Sqlite};

/// Utility functions for building SQL queries from our AST
pub struct SqlQueryBuilder;

impl SqlQueryBuilder {
    /// Build a SQL WHERE clause from a Query AST
    pub fn build_sql_where_clause<'a>(query: &Query, qb: &mut QueryBuilder<'a, Sqlite>) {
        match query {
            Query::All => {
                qb.push("1 = 1");
            }
            Query::Filter(filter) => Self::build_filter_clause(filter, qb),
            Query::Not(query) => {
                qb.push("NOT (");
                Self::build_sql_where_clause(query, qb);
                qb.push(")");
            }
            Query::Binary { op, left, right } => {
                qb.push("(");
                Self::build_sql_where_clause(left, qb);
                match op {
                    Operator::And => qb.push(") AND ("),
                    Operator::Or => qb.push(") OR ("),
                };
                Self::build_sql_where_clause(right, qb);
                qb.push(")");
            }
        }
    }

    fn build_filter_clause<'a>(filter: &Filter, qb: &mut QueryBuilder<'a, Sqlite>) {
        match filter {
            Filter::Recurring(flag) => {
                qb.push("o.is_recurring = ");
                qb.push_bind(*flag);
            }
            Filter::Completed(flag) => {
                qb.push("o.completed = ");
                qb.push_bind(*flag);
            }
            Filter::LineageParent(id) => {
                qb.push("o.lineage_parent_id = ");
                qb.push_bind(*id);
            }
            Filter::IsRoot => {
                qb.push("o.lineage_parent_id IS NULL");
            }
            Filter::HasDueDate => {
                qb.push("o.due_at IS NOT NULL");
            }
            Filter::Due(due_date) => Self::build_due_date_clause(due_date, qb),
            Filter::TitleContains(text) => {
                qb.push("LOWER(o.title) LIKE LOWER(");
                let mut pattern = String::with_capacity(text.len() + 2);
                pattern.push('%');
                pattern.push_str(text);
                pattern.push('%');
                qb.push_bind(pattern);
                qb.push(")");
            }
        }
    }

    /// Build SQL clause for due date filters
    fn build_due_date_clause<'a>(due_date: &DueDate, qb: &mut QueryBuilder<'a, Sqlite>) {
        match due_date {
            DueDate::Before(date_time) => {
                qb.push("o.due_at < ");
                qb.push_bind(*date_time);
            }
            DueDate::OnOrAfter(date_time) => {
                qb.push("o.due_at >= ");
                qb.push_bind(*date_time);
            }
            DueDate::After(date_time) => {
                qb.push("o.due_at > ");
                qb.push_bind(*date_time);
            }
        }
    }
}
