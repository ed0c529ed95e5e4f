//! datatree
//!
//! Small structured data tree used to persist and display registry state.
//!
//! A [`DataTree`] is an element with an optional default namespace, prefix
//! declarations, an optional text value and ordered children. Elements
//! without value and children act as presence markers (`<has-data/>`).
//!
//! Two renderings exist:
//! - compact XML via [`DataTree::to_xml`], for display and comparison
//! - JSON via serde, for persistence
//!
//! # Example
//!
//! ```
//! use modreg::datatree::DataTree;
//!
//! let mut module = DataTree::new("module").with_namespace("urn:modreg");
//! module.push(DataTree::leaf("name", "test"));
//! module.push(DataTree::new("has-data"));
//!
//! assert_eq!(
//!     module.to_xml(),
//!     r#"<module xmlns="urn:modreg"><name>test</name><has-data/></module>"#
//! );
//! ```

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// A prefix-to-namespace declaration carried by an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NsDecl {
    pub prefix: String,
    pub uri: String,
}

/// One element of a structured tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataTree {
    /// Element name.
    pub name: String,

    /// Default namespace. `None` inherits the parent's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Prefix declarations, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<NsDecl>,

    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Child elements, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DataTree>,
}

impl DataTree {
    /// An empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            prefixes: Vec::new(),
            value: None,
            children: Vec::new(),
        }
    }

    /// An element holding text.
    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(name)
        }
    }

    /// Set the default namespace.
    pub fn with_namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self
    }

    /// Add a prefix declaration.
    pub fn with_prefix(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.prefixes.push(NsDecl {
            prefix: prefix.into(),
            uri: uri.into(),
        });
        self
    }

    /// Append a child element.
    pub fn push(&mut self, child: DataTree) {
        self.children.push(child);
    }

    /// Whether this element carries neither text nor children.
    pub fn is_marker(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Compact XML rendering.
    ///
    /// A namespace equal to the inherited default is not repeated.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out, None);
        out
    }

    fn write_xml(&self, out: &mut String, inherited: Option<&str>) {
        out.push('<');
        out.push_str(&self.name);

        let namespace = self.namespace.as_deref().or(inherited);
        if let Some(ns) = self.namespace.as_deref() {
            if Some(ns) != inherited {
                let _ = write!(out, " xmlns=\"{}\"", escape(ns, true));
            }
        }
        for decl in &self.prefixes {
            let _ = write!(out, " xmlns:{}=\"{}\"", decl.prefix, escape(&decl.uri, true));
        }

        if self.is_marker() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(value) = &self.value {
            out.push_str(&escape(value, false));
        }
        for child in &self.children {
            child.write_xml(out, namespace);
        }
        let _ = write!(out, "</{}>", self.name);
    }

    /// Compact JSON rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented JSON rendering.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataTree {
        let mut root = DataTree::new("modules").with_namespace("urn:modreg");
        let mut module = DataTree::new("module").with_namespace("urn:modreg");
        module.push(DataTree::leaf("name", "refs"));
        module.push(
            DataTree::leaf("xpath", "/r:inst-id").with_prefix("r", "urn:refs"),
        );
        root.push(module);
        root
    }

    #[test]
    fn inherited_namespace_is_not_repeated() {
        assert_eq!(
            sample().to_xml(),
            "<modules xmlns=\"urn:modreg\"><module><name>refs</name>\
             <xpath xmlns:r=\"urn:refs\">/r:inst-id</xpath></module></modules>"
        );
    }

    #[test]
    fn text_is_escaped() {
        let tree = DataTree::leaf("expr", "a < b && c > d");
        assert_eq!(tree.to_xml(), "<expr>a &lt; b &amp;&amp; c &gt; d</expr>");
    }

    #[test]
    fn markers_are_self_closing() {
        assert_eq!(DataTree::new("removed").to_xml(), "<removed/>");
        assert!(DataTree::new("removed").is_marker());
        assert!(!DataTree::leaf("name", "").is_marker());
    }

    #[test]
    fn json_skips_empty_fields() {
        let json = DataTree::leaf("name", "test").to_json().unwrap();
        assert_eq!(json, r#"{"name":"name","value":"test"}"#);
    }

    #[test]
    fn json_round_trip() {
        let tree = sample();
        let json = tree.to_json().unwrap();
        assert_eq!(serde_json::from_str::<DataTree>(&json).unwrap(), tree);
    }

    #[test]
    fn json_rejects_unknown_fields() {
        assert!(serde_json::from_str::<DataTree>(r#"{"name":"x","colour":"red"}"#).is_err());
    }
}
