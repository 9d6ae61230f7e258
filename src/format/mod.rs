//! Output formatting for result nodes (XML, JSON).

use crate::config::OutputFormat;
use crate::mws::{Marketplace, XmlNode};

/// Formats nodes for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a single node.
    pub fn format_node(&self, node: &XmlNode) -> String {
        match self.format {
            OutputFormat::Xml => node.to_xml().trim_end().to_string(),
            OutputFormat::Json => {
                serde_json::to_string_pretty(node).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }

    /// Formats the marketplace table.
    pub fn format_marketplaces(&self, marketplaces: &[Marketplace]) -> String {
        if self.format == OutputFormat::Json {
            let rows: Vec<_> = marketplaces
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "code": m.to_string(),
                        "id": m.id(),
                        "host": m.host(),
                    })
                })
                .collect();
            return serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string());
        }

        let mut lines = Vec::new();
        lines.push(format!("{:<6} {:<16} {}", "Code", "MarketplaceId", "Host"));
        lines.push(format!("{:-<6} {:-<16} {:-<28}", "", "", ""));
        for m in marketplaces {
            lines.push(format!("{:<6} {:<16} {}", m.to_string(), m.id(), m.host()));
        }
        lines.join("\n")
    }
}
