use powertools::query::{Dialect, convert};

use super::assert_succeeded;

#[test]
fn test_fetchxml_to_sql() {
    let xml = r#"<fetch top="10">
  <entity name="account">
    <attribute name="name" />
    <filter type="and">
      <condition attribute="statecode" operator="eq" value="0" />
      <condition attribute="revenue" operator="gt" value="1000" />
      <condition attribute="name" operator="ne" value="Contoso" />
    </filter>
    <order attribute="name" descending="true" />
  </entity>
</fetch>"#;
    let result = convert(xml, Dialect::FetchXml, Dialect::Sql);
    assert_succeeded(&result);
    assert_eq!(
        result.text,
        "SELECT name FROM account WHERE statecode = 0 AND revenue > 1000 AND name != 'Contoso' ORDER BY name DESC LIMIT 10"
    );
}

#[test]
fn test_fetchxml_to_odata_null_operators() {
    let xml = r#"<fetch><entity name="contact">
        <all-attributes />
        <filter><condition attribute="parentcustomerid" operator="not-null" /></filter>
    </entity></fetch>"#;
    let result = convert(xml, Dialect::FetchXml, Dialect::OData);
    assert_succeeded(&result);
    assert_eq!(result.text, "/api/data/v9.2/contacts?$filter=parentcustomerid ne null");
}

#[test]
fn test_unknown_operator_passes_through_with_warning() {
    let xml = r#"<fetch><entity name="account"><filter>
        <condition attribute="name" operator="like" value="%contoso%" />
    </filter></entity></fetch>"#;
    let result = convert(xml, Dialect::FetchXml, Dialect::OData);
    assert_succeeded(&result);
    assert!(result.text.ends_with("$filter=name like '%contoso%'"));
    assert!(result.warnings.iter().any(|w| w.contains("'like'")));
}

#[test]
fn test_link_entity_and_or_filter_warnings() {
    let xml = r#"<fetch><entity name="account">
        <attribute name="name" />
        <filter type="or">
            <condition attribute="statecode" operator="eq" value="0" />
            <condition attribute="statecode" operator="eq" value="1" />
        </filter>
        <link-entity name="contact" from="contactid" to="primarycontactid" />
    </entity></fetch>"#;
    let result = convert(xml, Dialect::FetchXml, Dialect::OData);
    assert_succeeded(&result);
    assert!(result.warnings.iter().any(|w| w.contains("'or' filter")));
    assert!(result.warnings.iter().any(|w| w.contains("link-entity 'contact'")));
}

#[test]
fn test_malformed_markup_is_a_failure_result() {
    let result = convert("<fetch><entity name=\"account\">", Dialect::FetchXml, Dialect::Sql);
    assert!(!result.succeeded);
    assert!(result.error.unwrap().contains("Failed to parse FetchXML"));

    let result = convert("<fetch><entity /></fetch>", Dialect::FetchXml, Dialect::OData);
    assert!(!result.succeeded);
    assert!(result.error.unwrap().contains("name"));
}
