//! OData path form
//!
//! Every conversion routes through [`ODataQuery`]: SQL and FetchXML are parsed
//! into it, and rendered out of it. Filter handling is deliberately shallow,
//! clauses are split on ` and ` without regard for parentheses or `or` groups.

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_API_PATH: &str = "/api/data/v9.2";

/// Comparison operators understood by the clause extractor
pub const ODATA_OPERATORS: &[&str] = &["eq", "ne", "gt", "ge", "lt", "le"];

static FILTER_CONDITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([\w./]+)\s+(eq|ne|gt|ge|lt|le)\s+(.+?)\s*$")
        .expect("filter condition pattern")
});

#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    Asc(String),
    Desc(String),
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self::Asc(field.into())
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::Desc(field.into())
    }

    pub fn field(&self) -> &str {
        match self {
            OrderBy::Asc(field) | OrderBy::Desc(field) => field,
        }
    }

    pub fn is_descending(&self) -> bool {
        matches!(self, OrderBy::Desc(_))
    }

    /// Ascending is the OData default and is left implicit
    pub fn to_odata_string(&self) -> String {
        match self {
            OrderBy::Asc(field) => field.clone(),
            OrderBy::Desc(field) => format!("{} desc", field),
        }
    }
}

/// Literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Number(String),
    Boolean(bool),
    Null,
    /// Anything else (GUIDs, function calls, dates) kept verbatim
    Raw(String),
}

impl FilterValue {
    /// Read a literal written in OData or SQL syntax
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some(inner) = strip_quotes(trimmed, '\'') {
            return FilterValue::String(inner.replace("''", "'"));
        }
        if let Some(inner) = strip_quotes(trimmed, '"') {
            return FilterValue::String(inner.replace("\"\"", "\""));
        }

        match trimmed.to_lowercase().as_str() {
            "null" => return FilterValue::Null,
            "true" => return FilterValue::Boolean(true),
            "false" => return FilterValue::Boolean(false),
            _ => {}
        }

        if is_number(trimmed) {
            return FilterValue::Number(trimmed.to_string());
        }

        FilterValue::Raw(trimmed.to_string())
    }

    /// Read an attribute value from FetchXML, where nothing is quoted
    pub fn from_xml(value: &str) -> Self {
        match value {
            "true" => FilterValue::Boolean(true),
            "false" => FilterValue::Boolean(false),
            v if is_number(v) => FilterValue::Number(v.to_string()),
            v if is_guid(v) => FilterValue::Raw(v.to_string()),
            v => FilterValue::String(v.to_string()),
        }
    }

    pub fn to_odata_string(&self) -> String {
        match self {
            FilterValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            FilterValue::Number(n) => n.clone(),
            FilterValue::Boolean(b) => b.to_string(),
            FilterValue::Null => "null".to_string(),
            FilterValue::Raw(raw) => raw.clone(),
        }
    }

    /// SQL and OData share single-quoted string literals
    pub fn to_sql_string(&self) -> String {
        match self {
            FilterValue::Null => "NULL".to_string(),
            other => other.to_odata_string(),
        }
    }

    pub fn to_xml_value(&self) -> String {
        match self {
            FilterValue::String(s) => s.clone(),
            FilterValue::Number(n) => n.clone(),
            FilterValue::Boolean(b) => b.to_string(),
            FilterValue::Null => String::new(),
            FilterValue::Raw(raw) => raw.clone(),
        }
    }
}

/// One `<field> <op> <value>` clause of a `$filter`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub operator: String,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn to_odata_string(&self) -> String {
        format!("{} {} {}", self.field, self.operator, self.value.to_odata_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ODataQuery {
    /// Everything in the path before the collection segment
    pub api_path: String,
    pub collection: String,
    pub select: Vec<String>,
    pub expand: Vec<String>,
    pub filter: Option<String>,
    pub orderby: Vec<OrderBy>,
    pub top: Option<u32>,
    pub count: bool,
    /// Query-string parameters with no counterpart in the other dialects
    pub other_params: Vec<(String, String)>,
}

impl ODataQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            api_path: DEFAULT_API_PATH.to_string(),
            collection: collection.into(),
            select: Vec::new(),
            expand: Vec::new(),
            filter: None,
            orderby: Vec::new(),
            top: None,
            count: false,
            other_params: Vec::new(),
        }
    }

    pub fn with_api_path(mut self, api_path: impl Into<String>) -> Self {
        self.api_path = api_path.into();
        self
    }

    /// Parse a Web API path with optional query string
    ///
    /// Accepts a bare path (`/api/data/v9.2/accounts?...`), a full URL, or just
    /// the collection (`accounts?$top=5`).
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (path, query_string) = match text.split_once('?') {
            Some((path, qs)) => (path, Some(qs)),
            None => (text, None),
        };

        let path = strip_origin(path);
        let (api_path, segment) = match path.rfind('/') {
            Some(idx) => (&path[..idx], &path[idx + 1..]),
            None => ("", path),
        };

        // accounts(00000000-...) addresses a single record; keep the collection
        let collection = segment.split('(').next().unwrap_or_default().trim();
        if collection.is_empty() {
            bail!("OData path '{}' has no entity collection segment", text);
        }

        let mut query = ODataQuery::new(collection).with_api_path(api_path);

        if let Some(qs) = query_string {
            for (key, value) in parse_query_string(qs) {
                match key.to_lowercase().as_str() {
                    "$select" => query.select = parse_select(&value),
                    "$filter" => {
                        if !value.trim().is_empty() {
                            query.filter = Some(value.trim().to_string());
                        }
                    }
                    "$orderby" => query.orderby = parse_orderby(&value),
                    "$expand" => query.expand = split_top_level(&value),
                    "$top" => {
                        let top = value
                            .trim()
                            .parse::<u32>()
                            .map_err(|_| anyhow::anyhow!("Invalid $top value '{}'", value))?;
                        query.top = Some(top);
                    }
                    "$count" => query.count = value.trim().eq_ignore_ascii_case("true"),
                    _ => query.other_params.push((key, value)),
                }
            }
        }

        log::debug!(
            "Parsed OData path: collection={}, select={:?}, filter={:?}",
            query.collection,
            query.select,
            query.filter
        );
        Ok(query)
    }

    /// Filter clauses that match `<field> <op> <value>`, plus the ones that did not
    pub fn filter_conditions(&self) -> (Vec<FilterCondition>, Vec<String>) {
        let mut conditions = Vec::new();
        let mut rejected = Vec::new();

        if let Some(filter) = &self.filter {
            for clause in split_filter_clauses(filter) {
                match parse_filter_condition(clause) {
                    Some(condition) => conditions.push(condition),
                    None => rejected.push(clause.trim().to_string()),
                }
            }
        }

        (conditions, rejected)
    }

    /// Render as a readable (not percent-encoded) Web API path
    pub fn to_path(&self) -> String {
        let mut url = format!("{}/{}", self.api_path.trim_end_matches('/'), self.collection);
        let mut params = Vec::new();

        if !self.select.is_empty() {
            params.push(format!("$select={}", self.select.join(",")));
        }

        if !self.expand.is_empty() {
            params.push(format!("$expand={}", self.expand.join(",")));
        }

        if let Some(filter) = &self.filter {
            params.push(format!("$filter={}", filter));
        }

        if !self.orderby.is_empty() {
            let orders: Vec<String> = self.orderby.iter().map(|o| o.to_odata_string()).collect();
            params.push(format!("$orderby={}", orders.join(",")));
        }

        if let Some(top) = self.top {
            params.push(format!("$top={}", top));
        }

        if self.count {
            params.push("$count=true".to_string());
        }

        for (key, value) in &self.other_params {
            params.push(format!("{}={}", key, value));
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        url
    }
}

/// Split a query string into decoded key/value pairs
pub fn parse_query_string(query_string: &str) -> Vec<(String, String)> {
    query_string
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

/// Split `$filter` on ` and `
///
/// Case-sensitive and unaware of parentheses or `or`; a clause that contains
/// either is returned whole and will fail [`parse_filter_condition`].
pub fn split_filter_clauses(filter: &str) -> Vec<&str> {
    filter
        .split(" and ")
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .collect()
}

pub fn parse_filter_condition(clause: &str) -> Option<FilterCondition> {
    let captures = FILTER_CONDITION.captures(clause)?;
    let value = captures.get(3)?.as_str();

    // `a eq 1 or b eq 2` would otherwise swallow the `or` branch as the value
    if value.contains(" or ") && !value.starts_with('\'') {
        return None;
    }

    Some(FilterCondition {
        field: captures.get(1)?.as_str().to_string(),
        operator: captures.get(2)?.as_str().to_string(),
        value: FilterValue::parse(value),
    })
}

pub fn parse_select(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `field [asc|desc], ...`, ascending when no direction is given
pub fn parse_orderby(value: &str) -> Vec<OrderBy> {
    value
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let field = parts.next()?;
            match parts.next().map(str::to_lowercase).as_deref() {
                Some("desc") => Some(OrderBy::desc(field)),
                _ => Some(OrderBy::asc(field)),
            }
        })
        .collect()
}

/// Split on commas that are not inside parentheses (`$expand` nests `$select`)
pub fn split_top_level(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for ch in value.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn strip_origin(path: &str) -> &str {
    match path.find("://") {
        Some(idx) => {
            let rest = &path[idx + 3..];
            rest.find('/').map(|slash| &rest[slash..]).unwrap_or("")
        }
        None => path,
    }
}

fn strip_quotes(value: &str, quote: char) -> Option<&str> {
    if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
        Some(&value[1..value.len() - 1])
    } else {
        None
    }
}

fn is_number(value: &str) -> bool {
    value.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') && value.parse::<f64>().is_ok()
}

fn is_guid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}
