//! SQL subset reading and writing
//!
//! Supported shape:
//! `SELECT <fields> FROM <table> [alias] [JOIN <table> [alias] ON <a> = <b>]*
//!  [WHERE <cond>] [GROUP BY <fields>] [ORDER BY <fields>] [LIMIT <n>]`
//!
//! Each clause is cut out by its own regex. There is no tokenizer, so quoted
//! literals that contain clause keywords (`'ORDER BY'`, `' and '`) are split
//! in the wrong place.

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;

use super::odata::{FilterCondition, FilterValue, OrderBy, split_top_level};

static SELECT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*SELECT\s+(?:DISTINCT\s+)?(?:TOP\s*\(?\s*(\d+)\s*\)?\s+)?(.+?)\s+FROM\s")
        .expect("select pattern")
});
static FROM_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\sFROM\s+(\w+)(?:\s+(?:AS\s+)?(\w+))?").expect("from pattern")
});
static JOIN_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)\b(?:(?:INNER|LEFT|RIGHT|FULL)\s+(?:OUTER\s+)?)?JOIN\s+(\w+)(?:\s+(?:AS\s+)?(\w+))?\s+ON\s+([\w.]+)\s*=\s*([\w.]+)",
    )
    .expect("join pattern")
});
static WHERE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\sWHERE\s+(.+?)(?:\s+ORDER\s+BY\b|\s+GROUP\s+BY\b|\s+LIMIT\b|$)").expect("where pattern")
});
static GROUP_BY_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\sGROUP\s+BY\s+(.+?)(?:\s+HAVING\b|\s+ORDER\s+BY\b|\s+LIMIT\b|$)").expect("group by pattern")
});
static ORDER_BY_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\sORDER\s+BY\s+(.+?)(?:\s+LIMIT\b|$)").expect("order by pattern"));
static LIMIT_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sLIMIT\s+(\d+)").expect("limit pattern"));

static SELECT_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(\w+)\.)?(\w+|\*)(?:\s+(?:AS\s+)?\w+)?$").expect("select item pattern")
});
static CONNECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+(AND|OR)\s+").expect("connective pattern"));
static IS_NULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([\w.]+)\s+IS\s+(NOT\s+)?NULL$").expect("is null pattern"));
static LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([\w.]+)\s+(NOT\s+)?LIKE\s+'(.*)'$").expect("like pattern"));
static IN_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^([\w.]+)\s+(NOT\s+)?IN\s*\((.*)\)$").expect("in list pattern"));
static COMPARISON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w.]+)\s*(>=|<=|!=|<>|=|>|<)\s*(.+)$").expect("comparison pattern"));

const RESERVED_ALIASES: &[&str] = &[
    "where", "join", "inner", "left", "right", "full", "outer", "cross", "on", "order", "group", "limit",
    "having",
];

/// Possibly alias-qualified column reference
#[derive(Debug, Clone, PartialEq)]
pub struct SqlField {
    pub qualifier: Option<String>,
    pub name: String,
}

impl SqlField {
    pub fn parse(text: &str) -> Self {
        match text.trim().split_once('.') {
            Some((qualifier, name)) => Self {
                qualifier: Some(qualifier.to_string()),
                name: name.to_string(),
            },
            None => Self {
                qualifier: None,
                name: text.trim().to_string(),
            },
        }
    }

    pub fn to_sql_string(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}", qualifier, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// Whether a field qualifier refers to this table by alias or by name
    pub fn is_referenced_by(&self, qualifier: &str) -> bool {
        self.name.eq_ignore_ascii_case(qualifier)
            || self.alias.as_deref().is_some_and(|alias| alias.eq_ignore_ascii_case(qualifier))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: TableRef,
    pub left: SqlField,
    pub right: SqlField,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub fields: Vec<SqlField>,
    /// Select-list items that are not plain column references (functions, expressions)
    pub unsupported_fields: Vec<String>,
    pub from: TableRef,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<String>,
    /// Read so it can be reported; OData has no grouping without `$apply`
    pub group_by: Option<String>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u32>,
}

impl SqlQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            fields: Vec::new(),
            unsupported_fields: Vec::new(),
            from: TableRef {
                name: table.into(),
                alias: None,
            },
            joins: Vec::new(),
            where_clause: None,
            group_by: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn parse(sql: &str) -> Result<Self> {
        let sql = sql.trim().trim_end_matches(';').trim_end();

        let Some((top, select_list)) = extract_select_list(sql) else {
            bail!("Expected a query of the form SELECT <fields> FROM <table>");
        };
        let Some(from) = extract_from(sql) else {
            bail!("SQL query is missing a table name after FROM");
        };

        let mut query = SqlQuery::new(from.name.clone());
        query.from = from;

        for item in split_top_level(&select_list) {
            match parse_select_item(&item) {
                Some(field) => query.fields.push(field),
                None => query.unsupported_fields.push(item),
            }
        }

        query.joins = extract_joins(sql);
        query.where_clause = extract_where(sql);
        query.group_by = extract_group_by(sql);
        query.order_by = extract_order_by(sql);
        query.limit = extract_limit(sql).or(top);

        log::debug!(
            "Parsed SQL: table={}, fields={}, joins={}",
            query.from.name,
            query.fields.len(),
            query.joins.len()
        );
        Ok(query)
    }

    pub fn to_sql(&self) -> String {
        let fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields
                .iter()
                .map(SqlField::to_sql_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", fields, self.from.name);
        if let Some(alias) = &self.from.alias {
            sql.push_str(&format!(" {}", alias));
        }

        for join in &self.joins {
            sql.push_str(&format!(" JOIN {}", join.table.name));
            if let Some(alias) = &join.table.alias {
                sql.push_str(&format!(" {}", alias));
            }
            sql.push_str(&format!(
                " ON {} = {}",
                join.left.to_sql_string(),
                join.right.to_sql_string()
            ));
        }

        if let Some(where_clause) = &self.where_clause {
            sql.push_str(&format!(" WHERE {}", where_clause));
        }

        if let Some(group_by) = &self.group_by {
            sql.push_str(&format!(" GROUP BY {}", group_by));
        }

        if !self.order_by.is_empty() {
            let orders: Vec<String> = self
                .order_by
                .iter()
                .map(|order| {
                    let direction = if order.is_descending() { "DESC" } else { "ASC" };
                    format!("{} {}", order.field(), direction)
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }
}

/// `SELECT [TOP n] <list> FROM` → (top, list)
pub fn extract_select_list(sql: &str) -> Option<(Option<u32>, String)> {
    let captures = SELECT_LIST.captures(sql)?;
    let top = captures.get(1).and_then(|m| m.as_str().parse().ok());
    Some((top, captures.get(2)?.as_str().trim().to_string()))
}

pub fn extract_from(sql: &str) -> Option<TableRef> {
    let captures = FROM_TABLE.captures(sql)?;
    Some(TableRef {
        name: captures.get(1)?.as_str().to_string(),
        alias: table_alias(captures.get(2).map(|m| m.as_str())),
    })
}

pub fn extract_joins(sql: &str) -> Vec<JoinClause> {
    JOIN_CLAUSE
        .captures_iter(sql)
        .filter_map(|captures| {
            Some(JoinClause {
                table: TableRef {
                    name: captures.get(1)?.as_str().to_string(),
                    alias: table_alias(captures.get(2).map(|m| m.as_str())),
                },
                left: SqlField::parse(captures.get(3)?.as_str()),
                right: SqlField::parse(captures.get(4)?.as_str()),
            })
        })
        .collect()
}

pub fn extract_where(sql: &str) -> Option<String> {
    WHERE_CLAUSE
        .captures(sql)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|clause| !clause.is_empty())
}

pub fn extract_group_by(sql: &str) -> Option<String> {
    GROUP_BY_CLAUSE
        .captures(sql)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
}

pub fn extract_order_by(sql: &str) -> Vec<OrderBy> {
    let Some(list) = ORDER_BY_CLAUSE.captures(sql).and_then(|c| c.get(1)) else {
        return Vec::new();
    };

    list.as_str()
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let field = parts.next()?;
            match parts.next().map(str::to_uppercase).as_deref() {
                Some("DESC") => Some(OrderBy::desc(field)),
                _ => Some(OrderBy::asc(field)),
            }
        })
        .collect()
}

pub fn extract_limit(sql: &str) -> Option<u32> {
    LIMIT_CLAUSE
        .captures(sql)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Column reference from the select list, dropping any `AS` alias
pub fn parse_select_item(item: &str) -> Option<SqlField> {
    let captures = SELECT_ITEM.captures(item.trim())?;
    Some(SqlField {
        qualifier: captures.get(1).map(|m| m.as_str().to_string()),
        name: captures.get(2)?.as_str().to_string(),
    })
}

fn table_alias(candidate: Option<&str>) -> Option<String> {
    candidate
        .filter(|alias| !RESERVED_ALIASES.contains(&alias.to_lowercase().as_str()))
        .map(str::to_string)
}

/// Translate a SQL WHERE clause into an OData `$filter` expression
///
/// `resolve_field` maps each column reference to its OData path. Conditions that match no known shape are copied
/// unchanged and reported in the returned warnings.
pub fn translate_where_to_odata<F>(where_clause: &str, resolve_field: F) -> (String, Vec<String>)
where
    F: Fn(&SqlField) -> String,
{
    let mut output = String::new();
    let mut warnings = Vec::new();
    let mut last = 0;

    for connective in CONNECTIVE.captures_iter(where_clause) {
        let (Some(whole), Some(word)) = (connective.get(0), connective.get(1)) else {
            continue;
        };
        output.push_str(&translate_condition(&where_clause[last..whole.start()], &resolve_field, &mut warnings));
        output.push(' ');
        output.push_str(&word.as_str().to_lowercase());
        output.push(' ');
        last = whole.end();
    }
    output.push_str(&translate_condition(&where_clause[last..], &resolve_field, &mut warnings));

    (output, warnings)
}

fn translate_condition<F>(condition: &str, resolve_field: &F, warnings: &mut Vec<String>) -> String
where
    F: Fn(&SqlField) -> String,
{
    let trimmed = condition.trim();
    let open = trimmed.len() - trimmed.trim_start_matches('(').len();
    let mut inner = &trimmed[open..];
    // Only unbalanced trailing parens close a group; `IN (..)` keeps its own
    let mut close = 0;
    while inner.ends_with(')') && inner.matches(')').count() > inner.matches('(').count() {
        inner = &inner[..inner.len() - 1];
        close += 1;
    }
    let inner = inner.trim();

    let translated = if let Some(captures) = IS_NULL.captures(inner) {
        let field = resolve_field(&SqlField::parse(&captures[1]));
        let op = if captures.get(2).is_some() { "ne" } else { "eq" };
        format!("{} {} null", field, op)
    } else if let Some(captures) = LIKE.captures(inner) {
        let field = resolve_field(&SqlField::parse(&captures[1]));
        let negated = captures.get(2).is_some();
        let expression = translate_like(&field, &captures[3]);
        if negated { format!("not {}", expression) } else { expression }
    } else if let Some(captures) = IN_LIST.captures(inner) {
        let field = resolve_field(&SqlField::parse(&captures[1]));
        let negated = captures.get(2).is_some();
        translate_in_list(&field, &captures[3], negated)
    } else if let Some(captures) = COMPARISON.captures(inner) {
        let field = resolve_field(&SqlField::parse(&captures[1]));
        let op = sql_operator_to_odata(&captures[2]).unwrap_or("eq");
        let value = FilterValue::parse(&captures[3]);
        format!("{} {} {}", field, op, value.to_odata_string())
    } else {
        log::warn!("Could not translate WHERE condition '{}'", inner);
        warnings.push(format!(
            "Condition '{}' could not be translated and was copied unchanged",
            inner
        ));
        inner.to_string()
    };

    format!("{}{}{}", "(".repeat(open), translated, ")".repeat(close))
}

/// `IN` becomes an `or` chain of `eq`, `NOT IN` an `and` chain of `ne`
fn translate_in_list(field: &str, values: &str, negated: bool) -> String {
    let (op, connective) = if negated { ("ne", " and ") } else { ("eq", " or ") };
    let comparisons: Vec<String> = split_top_level(values)
        .iter()
        .map(|value| format!("{} {} {}", field, op, FilterValue::parse(value).to_odata_string()))
        .collect();
    match comparisons.len() {
        1 => comparisons[0].clone(),
        _ => format!("({})", comparisons.join(connective)),
    }
}

fn translate_like(field: &str, pattern: &str) -> String {
    let value = pattern.replace("''", "'");
    let starts = value.starts_with('%');
    let ends = value.ends_with('%') && value.len() > 1;
    let core = value.trim_matches('%').replace('\'', "''");

    match (starts, ends) {
        (true, true) => format!("contains({}, '{}')", field, core),
        (false, true) => format!("startswith({}, '{}')", field, core),
        (true, false) => format!("endswith({}, '{}')", field, core),
        (false, false) => format!("{} eq '{}'", field, core),
    }
}

pub fn sql_operator_to_odata(op: &str) -> Option<&'static str> {
    match op {
        "=" => Some("eq"),
        "!=" | "<>" => Some("ne"),
        ">" => Some("gt"),
        ">=" => Some("ge"),
        "<" => Some("lt"),
        "<=" => Some("le"),
        _ => None,
    }
}

pub fn odata_operator_to_sql(op: &str) -> Option<&'static str> {
    match op {
        "eq" => Some("="),
        "ne" => Some("!="),
        "gt" => Some(">"),
        "ge" => Some(">="),
        "lt" => Some("<"),
        "le" => Some("<="),
        _ => None,
    }
}

/// Render one OData filter condition as a SQL predicate
pub fn condition_to_sql(condition: &FilterCondition) -> Option<String> {
    if condition.value == FilterValue::Null {
        return match condition.operator.as_str() {
            "eq" => Some(format!("{} IS NULL", condition.field)),
            "ne" => Some(format!("{} IS NOT NULL", condition.field)),
            _ => None,
        };
    }

    let op = odata_operator_to_sql(&condition.operator)?;
    Some(format!("{} {} {}", condition.field, op, condition.value.to_sql_string()))
}
