mod fetchxml_source;
mod identity;
mod odata_source;
mod sql_source;

use powertools::query::ConversionResult;

/// Normalize XML for comparison by removing indentation and newlines
pub fn normalize_xml(xml: &str) -> String {
    xml.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("")
}

pub fn assert_succeeded(result: &ConversionResult) {
    if !result.succeeded {
        panic!("conversion failed: {:?}", result.error);
    }
}
