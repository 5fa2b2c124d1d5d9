use powertools::query::fetchxml::parse_fetchxml;
use powertools::query::{Dialect, QueryConverter, VERIFY_WARNING, convert};

use super::assert_succeeded;

#[test]
fn test_select_star_uses_collection_name() {
    let result = convert("SELECT * FROM account", Dialect::Sql, Dialect::OData);
    assert_succeeded(&result);
    assert_eq!(result.text, "/api/data/v9.2/accounts");
    assert_eq!(result.warnings[0], VERIFY_WARNING);
}

#[test]
fn test_join_becomes_expand_with_warning() {
    let result = convert(
        "SELECT a.name, b.name FROM account a JOIN contact b ON a.primarycontactid = b.contactid",
        Dialect::Sql,
        Dialect::OData,
    );
    assert_succeeded(&result);
    assert_eq!(
        result.text,
        "/api/data/v9.2/accounts?$select=name&$expand=primarycontact($select=name)"
    );
    assert!(
        result
            .warnings
            .iter()
            .any(|w| w.contains("primarycontact") && w.contains("verify"))
    );
}

#[test]
fn test_where_order_and_limit() {
    let result = convert(
        "SELECT name, revenue FROM account WHERE statecode = 0 AND name LIKE 'Con%' ORDER BY revenue DESC LIMIT 5",
        Dialect::Sql,
        Dialect::OData,
    );
    assert_succeeded(&result);
    assert_eq!(
        result.text,
        "/api/data/v9.2/accounts?$select=name,revenue&$filter=statecode eq 0 and startswith(name, 'Con')&$orderby=revenue desc&$top=5"
    );
}

#[test]
fn test_filter_on_joined_table_uses_navigation_path() {
    let result = convert(
        "SELECT a.name FROM account a JOIN contact c ON a.primarycontactid = c.contactid WHERE c.lastname = 'Smith'",
        Dialect::Sql,
        Dialect::OData,
    );
    assert_succeeded(&result);
    assert!(result.text.ends_with("$filter=primarycontact/lastname eq 'Smith'"));
    assert!(result.warnings.iter().any(|w| w.contains("navigation paths")));
}

#[test]
fn test_sql_to_fetchxml() {
    let result = convert(
        "SELECT fullname FROM contact WHERE lastname = 'Smith' AND parentcustomerid IS NULL ORDER BY fullname",
        Dialect::Sql,
        Dialect::FetchXml,
    );
    assert_succeeded(&result);

    let fetch = parse_fetchxml(&result.text).unwrap();
    assert_eq!(fetch.entity, "contact");
    assert_eq!(fetch.attributes, vec!["fullname"]);
    assert_eq!(fetch.conditions.len(), 2);
    assert_eq!(fetch.conditions[0].value.as_deref(), Some("Smith"));
    assert_eq!(fetch.conditions[1].operator, "null");
    assert_eq!(fetch.conditions[1].value, None);
}

#[test]
fn test_malformed_sql_fails_without_panicking() {
    let result = convert("DELETE FROM account", Dialect::Sql, Dialect::OData);
    assert!(!result.succeeded);
    assert!(result.error.is_some());
    assert!(result.text.is_empty());
}

#[test]
fn test_entity_mappings_from_config() {
    let mut config = powertools::config::Config::default();
    config.add_entity_mapping("cgk_thesis".to_string(), "cgk_theses".to_string());
    let converter = QueryConverter::from_config(&config);

    let result = converter.convert("SELECT * FROM cgk_thesis", Dialect::Sql, Dialect::OData);
    assert_eq!(result.text, "/api/data/v9.2/cgk_theses");

    let back = converter.convert(&result.text, Dialect::OData, Dialect::Sql);
    assert_eq!(back.text, "SELECT * FROM cgk_thesis");
}
