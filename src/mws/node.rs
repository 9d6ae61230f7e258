//! Owned XML element tree returned from response parsing.
//!
//! Paths use a small XPath subset: `/A/B`, `A/B`, `//A`, `*`. Namespace prefixes in
//! a path are ignored, as are the namespaces declared in the document.

use serde::Serialize;
use std::collections::BTreeMap;

/// An element with its attributes, trimmed text and child elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlNode {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> Result<Self, roxmltree::Error> {
        // Leading whitespace before the declaration is tolerated.
        let doc = roxmltree::Document::parse(xml.trim_start())?;
        Ok(Self::from_element(doc.root_element()))
    }

    fn from_element(node: roxmltree::Node<'_, '_>) -> Self {
        let attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let text: String = node
            .children()
            .filter(|c| c.is_text())
            .filter_map(|c| c.text())
            .collect();
        let text = text.trim();

        Self {
            name: node.tag_name().name().to_string(),
            namespace: node.tag_name().namespace().map(str::to_string),
            attributes,
            text: if text.is_empty() { None } else { Some(text.to_string()) },
            children: node.children().filter(|c| c.is_element()).map(Self::from_element).collect(),
        }
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Evaluates `path` relative to this element.
    pub fn find_all(&self, path: &str) -> Vec<&XmlNode> {
        parse_path(path).iter().fold(vec![self], |context, step| step.apply(&context))
    }

    pub fn find(&self, path: &str) -> Option<&XmlNode> {
        self.find_all(path).into_iter().next()
    }

    /// Text of the first element matching `path`.
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(|n| n.text.as_deref())
    }

    /// Evaluates `path` against the document this element is the root of.
    ///
    /// Both `/Root/Child` and `Root/Child` start at the document, so the first
    /// step must name the root element (or be `*` or a descendant step).
    pub fn select(&self, path: &str) -> Vec<&XmlNode> {
        let steps = parse_path(path);
        let Some((first, rest)) = steps.split_first() else {
            return Vec::new();
        };

        let start = match first.axis {
            Axis::Child if first.matches(self) => vec![self],
            Axis::Child => Vec::new(),
            Axis::Descendant => {
                let mut all = vec![self];
                collect_descendants(self, &mut all);
                all.into_iter().filter(|n| first.matches(n)).collect()
            }
        };

        rest.iter().fold(start, |context, step| step.apply(&context))
    }

    /// Renders the element back to XML (namespaces omitted).
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out, 0);
        out
    }

    fn write_xml(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", key, escape(value)));
        }

        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');

        if self.children.is_empty() {
            if let Some(text) = &self.text {
                out.push_str(&escape(text));
            }
        } else {
            out.push('\n');
            if let Some(text) = &self.text {
                out.push_str(&format!("{}  {}\n", indent, escape(text)));
            }
            for child in &self.children {
                child.write_xml(out, depth + 1);
            }
            out.push_str(&indent);
        }

        out.push_str(&format!("</{}>\n", self.name));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    /// `None` matches any element.
    name: Option<String>,
}

impl Step {
    fn matches(&self, node: &XmlNode) -> bool {
        self.name.as_deref().map_or(true, |name| name == node.name)
    }

    fn apply<'a>(&self, context: &[&'a XmlNode]) -> Vec<&'a XmlNode> {
        let mut out: Vec<&'a XmlNode> = Vec::new();

        for &node in context {
            let candidates: Vec<&'a XmlNode> = match self.axis {
                Axis::Child => node.children.iter().collect(),
                Axis::Descendant => {
                    let mut all = Vec::new();
                    collect_descendants(node, &mut all);
                    all
                }
            };

            for candidate in candidates {
                if self.matches(candidate) && !out.iter().any(|n| std::ptr::eq(*n, candidate)) {
                    out.push(candidate);
                }
            }
        }

        out
    }
}

fn collect_descendants<'a>(node: &'a XmlNode, out: &mut Vec<&'a XmlNode>) {
    for child in &node.children {
        out.push(child);
        collect_descendants(child, out);
    }
}

fn parse_path(path: &str) -> Vec<Step> {
    let mut steps = Vec::new();
    let mut axis = Axis::Child;

    for (i, segment) in path.trim().split('/').enumerate() {
        let segment = segment.trim();
        if segment.is_empty() {
            // A leading slash anchors at the document; any later empty segment is `//`.
            if i > 0 {
                axis = Axis::Descendant;
            }
            continue;
        }

        let name = match segment {
            "*" => None,
            s => Some(s.rsplit(':').next().unwrap_or(s).to_string()),
        };
        steps.push(Step { axis, name });
        axis = Axis::Child;
    }

    steps
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = r#"
        <?xml version="1.0"?>
        <ListOrdersResponse xmlns="https://mws.amazonservices.com/Orders/2011-01-01">
          <ListOrdersResult>
            <Orders>
              <Order><AmazonOrderId>1</AmazonOrderId></Order>
              <Order><AmazonOrderId>2</AmazonOrderId></Order>
            </Orders>
            <CreatedBefore>2012-11-19T20:54:33Z</CreatedBefore>
          </ListOrdersResult>
          <ResponseMetadata>
            <RequestId>931137cb-add7-4232-ac08-b701435c8447</RequestId>
          </ResponseMetadata>
        </ListOrdersResponse>
    "#;

    #[test]
    fn test_parse_with_leading_whitespace() {
        let root = XmlNode::parse(ORDERS).unwrap();
        assert_eq!(root.name, "ListOrdersResponse");
        assert_eq!(
            root.namespace.as_deref(),
            Some("https://mws.amazonservices.com/Orders/2011-01-01")
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert!(XmlNode::parse("<Unclosed>").is_err());
    }

    #[test]
    fn test_child_and_text() {
        let root = XmlNode::parse(ORDERS).unwrap();
        let result = root.child("ListOrdersResult").unwrap();
        assert_eq!(result.text_at("CreatedBefore"), Some("2012-11-19T20:54:33Z"));
        assert!(result.text.is_none());
    }

    #[test]
    fn test_select_absolute_and_relative() {
        let root = XmlNode::parse(ORDERS).unwrap();
        for path in ["/ListOrdersResponse/ListOrdersResult", "ListOrdersResponse/ListOrdersResult"] {
            let found = root.select(path);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].name, "ListOrdersResult");
        }
    }

    #[test]
    fn test_select_wrong_root() {
        let root = XmlNode::parse(ORDERS).unwrap();
        assert!(root.select("AmazonEnvelope/Message").is_empty());
    }

    #[test]
    fn test_select_descendant() {
        let root = XmlNode::parse(ORDERS).unwrap();
        let ids: Vec<_> = root
            .select("//Order/AmazonOrderId")
            .iter()
            .filter_map(|n| n.text.as_deref())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_select_wildcard_and_prefix() {
        let root = XmlNode::parse(ORDERS).unwrap();
        assert_eq!(root.select("/*/ns:ListOrdersResult").len(), 1);
        assert_eq!(root.select("/*/*").len(), 2);
    }

    #[test]
    fn test_find_relative_to_node() {
        let root = XmlNode::parse(ORDERS).unwrap();
        let result = root.child("ListOrdersResult").unwrap();
        assert_eq!(result.find_all("Orders/Order").len(), 2);
        assert_eq!(result.children_named("Orders").count(), 1);
    }

    #[test]
    fn test_attributes_and_to_xml() {
        let root = XmlNode::parse(r#"<A x="1"><B>t &amp; u</B><C/></A>"#).unwrap();
        assert_eq!(root.attributes.get("x").map(String::as_str), Some("1"));
        assert_eq!(root.to_xml(), "<A x=\"1\">\n  <B>t &amp; u</B>\n  <C/>\n</A>\n");
    }

    #[test]
    fn test_json_skips_empty_fields() {
        let root = XmlNode::parse("<A><B>1</B></A>").unwrap();
        let json = serde_json::to_string(&root).unwrap();
        assert_eq!(json, r#"{"name":"A","children":[{"name":"B","text":"1"}]}"#);
    }
}
