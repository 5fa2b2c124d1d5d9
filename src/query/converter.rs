//! Dialect conversion
//!
//! SQL and FetchXML never convert into each other directly: both are lifted
//! into [`ODataQuery`] and rendered from there. The conversions are heuristic,
//! so every non-identity result carries [`VERIFY_WARNING`].

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::fetchxml::{FetchCondition, FetchQuery, parse_fetchxml, to_fetchxml};
use super::odata::{FilterValue, ODATA_OPERATORS, ODataQuery, OrderBy};
use super::pluralization::{EntityNames, navigation_property_name};
use super::sql::{JoinClause, SqlField, SqlQuery, TableRef, condition_to_sql, translate_where_to_odata};
use crate::config::Config;

pub const VERIFY_WARNING: &str =
    "Query conversion is heuristic; verify the converted query before running it";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Sql,
    OData,
    FetchXml,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Sql, Dialect::OData, Dialect::FetchXml];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sql => "sql",
            Dialect::OData => "odata",
            Dialect::FetchXml => "fetchxml",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sql" => Ok(Dialect::Sql),
            "odata" | "webapi" => Ok(Dialect::OData),
            "fetchxml" | "fetch" | "xml" => Ok(Dialect::FetchXml),
            other => Err(format!("Unknown query dialect '{}'", other)),
        }
    }
}

/// Outcome of a conversion; failures are values, never errors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub succeeded: bool,
    pub text: String,
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl ConversionResult {
    pub fn success(text: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            succeeded: true,
            text: text.into(),
            error: None,
            warnings,
        }
    }

    pub fn failure(error: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            succeeded: false,
            text: String::new(),
            error: Some(error.into()),
            warnings,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryConverter {
    names: EntityNames,
    api_path: String,
}

impl Default for QueryConverter {
    fn default() -> Self {
        Self::new(EntityNames::default(), super::odata::DEFAULT_API_PATH)
    }
}

impl QueryConverter {
    pub fn new(names: EntityNames, api_path: impl Into<String>) -> Self {
        Self {
            names,
            api_path: api_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            EntityNames::with_mappings(&config.entity_mappings),
            config.settings.api_path.clone(),
        )
    }

    pub fn convert(&self, source: &str, from: Dialect, to: Dialect) -> ConversionResult {
        if from == to {
            return ConversionResult::success(source, Vec::new());
        }

        let mut warnings = vec![VERIFY_WARNING.to_string()];
        if source.trim().is_empty() {
            return ConversionResult::success(source, warnings);
        }

        match self.convert_via_odata(source, from, to, &mut warnings) {
            Ok(text) => {
                log::info!("Converted {} query to {} ({} warnings)", from, to, warnings.len());
                ConversionResult::success(text, warnings)
            }
            Err(e) => {
                log::warn!("Failed to convert {} query to {}: {:#}", from, to, e);
                ConversionResult::failure(format!("{:#}", e), warnings)
            }
        }
    }

    /// Convert between dialects given by name, as typed by a user
    pub fn convert_named(&self, source: &str, from: &str, to: &str) -> ConversionResult {
        match (from.parse::<Dialect>(), to.parse::<Dialect>()) {
            (Ok(from), Ok(to)) => self.convert(source, from, to),
            _ => ConversionResult::failure(
                format!("Unsupported conversion: {} to {}", from, to),
                Vec::new(),
            ),
        }
    }

    fn convert_via_odata(
        &self,
        source: &str,
        from: Dialect,
        to: Dialect,
        warnings: &mut Vec<String>,
    ) -> Result<String> {
        let odata = match from {
            Dialect::Sql => self.sql_to_odata(source, warnings)?,
            Dialect::OData => ODataQuery::parse(source)?,
            Dialect::FetchXml => self.fetchxml_to_odata(&parse_fetchxml(source)?, warnings),
        };

        let text = match to {
            Dialect::OData => odata.to_path(),
            Dialect::Sql => self.odata_to_sql(&odata, warnings).to_sql(),
            Dialect::FetchXml => to_fetchxml(&self.odata_to_fetchxml(&odata, warnings))
                .trim_end()
                .to_string(),
        };
        Ok(text)
    }

    /// Lift a SQL query into OData, turning each JOIN into an `$expand`
    pub fn sql_to_odata(&self, source: &str, warnings: &mut Vec<String>) -> Result<ODataQuery> {
        let sql = SqlQuery::parse(source)?;
        let primary = &sql.from;

        let mut odata =
            ODataQuery::new(self.names.pluralize(&primary.name)).with_api_path(self.api_path.clone());

        for item in &sql.unsupported_fields {
            warnings.push(format!(
                "Select item '{}' is not a plain column and was dropped",
                item
            ));
        }

        let mut all_primary = false;
        let mut primary_fields = Vec::new();
        let mut join_fields: Vec<Vec<String>> = vec![Vec::new(); sql.joins.len()];

        for field in &sql.fields {
            match field.qualifier.as_deref() {
                None => push_field(&mut primary_fields, &mut all_primary, &field.name),
                Some(q) if primary.is_referenced_by(q) => {
                    push_field(&mut primary_fields, &mut all_primary, &field.name)
                }
                Some(q) => match sql.joins.iter().position(|j| j.table.is_referenced_by(q)) {
                    Some(idx) if field.name != "*" => join_fields[idx].push(field.name.clone()),
                    Some(_) => {}
                    None => warnings.push(format!(
                        "Field '{}' refers to unknown table alias '{}' and was dropped",
                        field.to_sql_string(),
                        q
                    )),
                },
            }
        }

        if !all_primary {
            odata.select = primary_fields;
        }

        let navigations: Vec<String> = sql
            .joins
            .iter()
            .map(|join| self.navigation_for_join(primary, join, warnings))
            .collect();

        for (navigation, fields) in navigations.iter().zip(&join_fields) {
            if fields.is_empty() {
                odata.expand.push(navigation.clone());
            } else {
                odata.expand.push(format!("{}($select={})", navigation, fields.join(",")));
            }
        }

        if let Some(where_clause) = &sql.where_clause {
            let filters_joined = Cell::new(false);
            let (filter, where_warnings) = translate_where_to_odata(where_clause, |field| {
                match resolve_joined(&sql.joins, &navigations, primary, field) {
                    Some(path) => {
                        filters_joined.set(true);
                        path
                    }
                    None => field.name.clone(),
                }
            });
            warnings.extend(where_warnings);
            if filters_joined.get() {
                warnings.push(
                    "Conditions on joined tables were rewritten as navigation paths; collection-valued navigations need any()/all() instead"
                        .to_string(),
                );
            }
            odata.filter = Some(filter);
        }

        for order in &sql.order_by {
            let field = SqlField::parse(order.field());
            match field.qualifier.as_deref() {
                Some(q) if !primary.is_referenced_by(q) => warnings.push(format!(
                    "Ordering by joined column '{}' is not supported by $orderby and was dropped",
                    order.field()
                )),
                _ if order.is_descending() => odata.orderby.push(OrderBy::desc(field.name)),
                _ => odata.orderby.push(OrderBy::asc(field.name)),
            }
        }

        if let Some(group_by) = &sql.group_by {
            warnings.push(format!(
                "GROUP BY {} has no $select/$filter equivalent and was dropped; use $apply=groupby(...) instead",
                group_by
            ));
        }

        odata.top = sql.limit;
        Ok(odata)
    }

    /// Guess the navigation property a JOIN walks
    ///
    /// The side of the ON condition that references the primary table holds
    /// the lookup column. When neither side does, or that column is the primary
    /// key, the join is a reverse lookup and the joined collection is used.
    fn navigation_for_join(&self, primary: &TableRef, join: &JoinClause, warnings: &mut Vec<String>) -> String {
        let primary_side = [&join.left, &join.right].into_iter().find(|field| {
            field
                .qualifier
                .as_deref()
                .is_some_and(|q| primary.is_referenced_by(q) && !join.table.is_referenced_by(q))
        });

        let primary_key = format!("{}id", primary.name);
        match primary_side {
            Some(field) if !field.name.eq_ignore_ascii_case(&primary_key) => {
                let navigation = navigation_property_name(&field.name);
                warnings.push(format!(
                    "Navigation property '{}' was derived from lookup column '{}'; verify it matches the relationship's navigation property name",
                    navigation, field.name
                ));
                navigation
            }
            _ => {
                let collection = self.names.pluralize(&join.table.name);
                log::warn!("Join to '{}' treated as reverse lookup", join.table.name);
                warnings.push(format!(
                    "Join to '{}' looks like a reverse lookup; expanding '{}' may need manual adjustment",
                    join.table.name, collection
                ));
                collection
            }
        }
    }

    pub fn odata_to_sql(&self, odata: &ODataQuery, warnings: &mut Vec<String>) -> SqlQuery {
        let mut sql = SqlQuery::new(self.names.singularize(&odata.collection));
        sql.fields = odata.select.iter().map(|field| SqlField::parse(field)).collect();

        let (conditions, rejected) = odata.filter_conditions();
        report_rejected_clauses(&rejected, warnings);

        let predicates: Vec<String> = conditions
            .iter()
            .filter_map(|condition| {
                let predicate = condition_to_sql(condition);
                if predicate.is_none() {
                    warnings.push(format!(
                        "Filter clause '{}' has no SQL equivalent and was dropped",
                        condition.to_odata_string()
                    ));
                }
                predicate
            })
            .collect();
        if !predicates.is_empty() {
            sql.where_clause = Some(predicates.join(" AND "));
        }

        sql.order_by = odata.orderby.clone();
        sql.limit = odata.top;
        report_unconverted_params(odata, "JOIN clauses", warnings);
        sql
    }

    pub fn fetchxml_to_odata(&self, fetch: &FetchQuery, warnings: &mut Vec<String>) -> ODataQuery {
        let mut odata =
            ODataQuery::new(self.names.pluralize(&fetch.entity)).with_api_path(self.api_path.clone());

        if !fetch.all_attributes {
            odata.select = fetch.attributes.clone();
        }

        let clauses: Vec<String> = fetch
            .conditions
            .iter()
            .map(|condition| fetch_condition_to_odata(condition, warnings))
            .collect();
        if !clauses.is_empty() {
            odata.filter = Some(clauses.join(" and "));
        }
        if fetch.has_or_filter {
            warnings.push("An 'or' filter group was flattened into 'and' conditions".to_string());
        }

        for link in &fetch.link_entities {
            warnings.push(format!(
                "link-entity '{}' was not converted; add an $expand manually",
                link
            ));
        }

        odata.orderby = fetch.orders.clone();
        odata.top = fetch.top;
        odata
    }

    pub fn odata_to_fetchxml(&self, odata: &ODataQuery, warnings: &mut Vec<String>) -> FetchQuery {
        let mut fetch = FetchQuery {
            entity: self.names.singularize(&odata.collection),
            attributes: odata.select.clone(),
            all_attributes: odata.select.is_empty(),
            orders: odata.orderby.clone(),
            top: odata.top,
            ..FetchQuery::default()
        };

        let (conditions, rejected) = odata.filter_conditions();
        report_rejected_clauses(&rejected, warnings);

        fetch.conditions = conditions
            .into_iter()
            .map(|condition| {
                let (operator, value) = match (&condition.value, condition.operator.as_str()) {
                    (FilterValue::Null, "eq") => ("null".to_string(), None),
                    (FilterValue::Null, "ne") => ("not-null".to_string(), None),
                    (value, operator) => (operator.to_string(), Some(value.to_xml_value())),
                };
                FetchCondition {
                    attribute: condition.field,
                    operator,
                    value,
                }
            })
            .collect();

        report_unconverted_params(odata, "link-entity elements", warnings);
        fetch
    }
}

/// Convert with default entity names and API path
pub fn convert(source: &str, from: Dialect, to: Dialect) -> ConversionResult {
    QueryConverter::default().convert(source, from, to)
}

fn push_field(fields: &mut Vec<String>, all: &mut bool, name: &str) {
    if name == "*" {
        *all = true;
    } else {
        fields.push(name.to_string());
    }
}

fn resolve_joined(
    joins: &[JoinClause],
    navigations: &[String],
    primary: &TableRef,
    field: &SqlField,
) -> Option<String> {
    let qualifier = field.qualifier.as_deref()?;
    if primary.is_referenced_by(qualifier) {
        return None;
    }
    let idx = joins.iter().position(|join| join.table.is_referenced_by(qualifier))?;
    Some(format!("{}/{}", navigations[idx], field.name))
}

fn fetch_condition_to_odata(condition: &FetchCondition, warnings: &mut Vec<String>) -> String {
    let attribute = &condition.attribute;
    let operator = condition.operator.as_str();

    match (&condition.value, operator) {
        (None, "null") => format!("{} eq null", attribute),
        (None, "not-null") => format!("{} ne null", attribute),
        (None, _) => {
            warnings.push(format!(
                "Condition operator '{}' on '{}' has no value and no OData equivalent",
                operator, attribute
            ));
            format!("{} {}", attribute, operator)
        }
        (Some(value), _) => {
            if !ODATA_OPERATORS.contains(&operator) {
                warnings.push(format!(
                    "Condition operator '{}' has no direct OData equivalent and was passed through unchanged",
                    operator
                ));
            }
            format!("{} {} {}", attribute, operator, FilterValue::from_xml(value).to_odata_string())
        }
    }
}

fn report_rejected_clauses(rejected: &[String], warnings: &mut Vec<String>) {
    for clause in rejected {
        log::warn!("Skipping unparseable filter clause '{}'", clause);
        warnings.push(format!(
            "Filter clause '{}' is not a simple '<field> <op> <value>' comparison and was dropped",
            clause
        ));
    }
}

fn report_unconverted_params(odata: &ODataQuery, expand_hint: &str, warnings: &mut Vec<String>) {
    if !odata.expand.is_empty() {
        warnings.push(format!(
            "$expand={} was not converted; add {} manually",
            odata.expand.join(","),
            expand_hint
        ));
    }
    if odata.count {
        warnings.push("$count=true was not converted; the total record count must be requested separately".to_string());
    }
    for (key, value) in &odata.other_params {
        warnings.push(format!("Parameter {}={} has no equivalent and was dropped", key, value));
    }
}
