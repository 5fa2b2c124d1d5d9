use powertools::query::fetchxml::parse_fetchxml;
use powertools::query::odata::OrderBy;
use powertools::query::{Dialect, convert};

use super::{assert_succeeded, normalize_xml};

const CONTACTS: &str =
    "/api/data/v9.2/contacts?$select=fullname,emailaddress&$filter=statecode eq 0&$orderby=fullname";

#[test]
fn test_odata_to_fetchxml() {
    let result = convert(CONTACTS, Dialect::OData, Dialect::FetchXml);
    assert_succeeded(&result);

    let fetch = parse_fetchxml(&result.text).unwrap();
    assert_eq!(fetch.entity, "contact");
    assert_eq!(fetch.attributes, vec!["fullname", "emailaddress"]);
    assert_eq!(fetch.conditions.len(), 1);
    assert_eq!(fetch.conditions[0].attribute, "statecode");
    assert_eq!(fetch.conditions[0].operator, "eq");
    assert_eq!(fetch.conditions[0].value.as_deref(), Some("0"));
    assert_eq!(fetch.orders, vec![OrderBy::asc("fullname")]);

    let expected = r#"
        <fetch version="1.0" output-format="xml-platform" mapping="logical" distinct="false">
          <entity name="contact">
            <attribute name="fullname" />
            <attribute name="emailaddress" />
            <filter type="and">
              <condition attribute="statecode" operator="eq" value="0" />
            </filter>
            <order attribute="fullname" />
          </entity>
        </fetch>"#;
    assert_eq!(normalize_xml(&result.text), normalize_xml(expected));
}

#[test]
fn test_odata_to_sql() {
    let result = convert(
        "/api/data/v9.2/opportunities?$select=name,estimatedvalue&$filter=estimatedvalue ge 5000 and name ne 'Test'&$orderby=estimatedvalue desc&$top=10",
        Dialect::OData,
        Dialect::Sql,
    );
    assert_succeeded(&result);
    assert_eq!(
        result.text,
        "SELECT name, estimatedvalue FROM opportunity WHERE estimatedvalue >= 5000 AND name != 'Test' ORDER BY estimatedvalue DESC LIMIT 10"
    );
}

#[test]
fn test_complex_filter_clauses_are_dropped_with_warning() {
    let result = convert(
        "/api/data/v9.2/accounts?$filter=contains(name,'x') and statecode eq 0",
        Dialect::OData,
        Dialect::Sql,
    );
    assert_succeeded(&result);
    assert_eq!(result.text, "SELECT * FROM account WHERE statecode = 0");
    assert!(result.warnings.iter().any(|w| w.contains("contains(name,'x')")));
}

#[test]
fn test_expand_is_reported_not_converted() {
    let result = convert(
        "/api/data/v9.2/accounts?$expand=primarycontactid($select=fullname)",
        Dialect::OData,
        Dialect::FetchXml,
    );
    assert_succeeded(&result);
    assert!(result.warnings.iter().any(|w| w.contains("$expand")));
    assert!(result.text.contains("<all-attributes />"));
}

#[test]
fn test_missing_collection_fails() {
    let result = convert("/api/data/v9.2/", Dialect::OData, Dialect::Sql);
    assert!(!result.succeeded);
}
