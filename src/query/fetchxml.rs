//! FetchXML reading and writing
//!
//! Only the parts of FetchXML that have an OData counterpart are modelled:
//! one root entity, its attributes, flat conditions, ordering and `top`.

use anyhow::{Result, bail};
use roxmltree::{Document, Node};

use super::odata::OrderBy;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchQuery {
    pub entity: String,
    pub attributes: Vec<String>,
    pub all_attributes: bool,
    pub conditions: Vec<FetchCondition>,
    pub orders: Vec<OrderBy>,
    pub top: Option<u32>,
    /// `link-entity` names found under the root entity (not converted)
    pub link_entities: Vec<String>,
    /// Whether any filter under the root entity was `type="or"`
    pub has_or_filter: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCondition {
    pub attribute: String,
    pub operator: String,
    pub value: Option<String>,
}

/// Parse a FetchXML document
///
/// Fails when the markup is malformed, when there is not exactly one
/// `<entity>` element, or when that element has no `name`.
pub fn parse_fetchxml(xml: &str) -> Result<FetchQuery> {
    let doc = Document::parse(xml).map_err(|e| anyhow::anyhow!("Failed to parse FetchXML: {}", e))?;

    let entities: Vec<Node> = doc.descendants().filter(|n| n.has_tag_name("entity")).collect();
    let entity_node = match entities.as_slice() {
        [single] => *single,
        [] => bail!("No entity element found in FetchXML"),
        many => bail!("FetchXML must contain exactly one entity element, found {}", many.len()),
    };

    let entity_name = entity_node
        .attribute("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Entity element missing 'name' attribute"))?;

    let mut query = FetchQuery {
        entity: entity_name.to_string(),
        ..FetchQuery::default()
    };

    let root = doc.root_element();
    if root.has_tag_name("fetch") {
        query.top = root
            .attribute("top")
            .or_else(|| root.attribute("count"))
            .and_then(|value| value.trim().parse::<u32>().ok());
    }

    for child in entity_node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "attribute" => {
                if let Some(name) = child.attribute("name") {
                    query.attributes.push(name.to_string());
                }
            }
            "all-attributes" => query.all_attributes = true,
            "order" => {
                if let Some(attribute) = child.attribute("attribute") {
                    if child.attribute("descending") == Some("true") {
                        query.orders.push(OrderBy::desc(attribute));
                    } else {
                        query.orders.push(OrderBy::asc(attribute));
                    }
                }
            }
            "filter" => collect_conditions(child, &mut query),
            "link-entity" => {
                query
                    .link_entities
                    .push(child.attribute("name").unwrap_or("unnamed").to_string());
            }
            other => log::debug!("Ignoring FetchXML element <{}>", other),
        }
    }

    log::debug!(
        "Parsed FetchXML: entity={}, attributes={}, conditions={}",
        query.entity,
        query.attributes.len(),
        query.conditions.len()
    );
    Ok(query)
}

fn collect_conditions(filter: Node, query: &mut FetchQuery) {
    if filter.attribute("type") == Some("or") {
        query.has_or_filter = true;
    }

    for child in filter.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "condition" => {
                let Some(attribute) = child.attribute("attribute") else {
                    continue;
                };
                query.conditions.push(FetchCondition {
                    attribute: attribute.to_string(),
                    operator: child.attribute("operator").unwrap_or("eq").to_string(),
                    value: child.attribute("value").map(str::to_string),
                });
            }
            "filter" => collect_conditions(child, query),
            _ => {}
        }
    }
}

/// Render a [`FetchQuery`] as an indented FetchXML document
pub fn to_fetchxml(query: &FetchQuery) -> String {
    let mut generator = XmlGenerator::new();
    generator.generate(query);
    generator.buffer
}

/// XML generation helper struct
#[derive(Debug)]
struct XmlGenerator {
    indent_level: usize,
    buffer: String,
}

impl XmlGenerator {
    fn new() -> Self {
        Self {
            indent_level: 0,
            buffer: String::new(),
        }
    }

    fn generate(&mut self, query: &FetchQuery) {
        let mut fetch_attrs = vec![
            ("version", "1.0".to_string()),
            ("output-format", "xml-platform".to_string()),
            ("mapping", "logical".to_string()),
            ("distinct", "false".to_string()),
        ];
        if let Some(top) = query.top {
            fetch_attrs.push(("top", top.to_string()));
        }
        self.add_opening_tag("fetch", &fetch_attrs);
        self.indent();

        self.add_opening_tag("entity", &[("name", query.entity.clone())]);
        self.indent();

        if query.all_attributes || query.attributes.is_empty() {
            self.add_self_closing_tag("all-attributes", &[]);
        } else {
            for attribute in &query.attributes {
                self.add_self_closing_tag("attribute", &[("name", attribute.clone())]);
            }
        }

        if !query.conditions.is_empty() {
            self.add_opening_tag("filter", &[("type", "and".to_string())]);
            self.indent();
            for condition in &query.conditions {
                let mut attrs = vec![
                    ("attribute", condition.attribute.clone()),
                    ("operator", condition.operator.clone()),
                ];
                if let Some(value) = &condition.value {
                    attrs.push(("value", value.clone()));
                }
                self.add_self_closing_tag("condition", &attrs);
            }
            self.unindent();
            self.add_closing_tag("filter");
        }

        for order in &query.orders {
            let mut attrs = vec![("attribute", order.field().to_string())];
            if order.is_descending() {
                attrs.push(("descending", "true".to_string()));
            }
            self.add_self_closing_tag("order", &attrs);
        }

        self.unindent();
        self.add_closing_tag("entity");
        self.unindent();
        self.add_closing_tag("fetch");
    }

    fn add_line(&mut self, content: &str) {
        self.buffer.push_str(&"  ".repeat(self.indent_level));
        self.buffer.push_str(content);
        self.buffer.push('\n');
    }

    fn add_opening_tag(&mut self, tag: &str, attributes: &[(&str, String)]) {
        let line = format!("<{}{}>", tag, render_attributes(attributes));
        self.add_line(&line);
    }

    fn add_closing_tag(&mut self, tag: &str) {
        self.add_line(&format!("</{}>", tag));
    }

    fn add_self_closing_tag(&mut self, tag: &str, attributes: &[(&str, String)]) {
        let line = format!("<{}{} />", tag, render_attributes(attributes));
        self.add_line(&line);
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn unindent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }
}

fn render_attributes(attributes: &[(&str, String)]) -> String {
    attributes
        .iter()
        .map(|(name, value)| format!(" {}=\"{}\"", name, escape_xml(value)))
        .collect()
}

/// Escape XML special characters
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
