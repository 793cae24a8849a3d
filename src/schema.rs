//! Static description of the typed data model.
//!
//! A [`SchemaNode`] tree is declared once (in code via the builder methods, or
//! from JSON via [`load_json`]) and validated into a [`SchemaRegistry`]. The
//! registry is immutable afterwards and is shared read-only by the renderer
//! and the parser.
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SchemaLoadError};

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static field-name pattern")
});

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A (system, code, display) triple from an external vocabulary.
///
/// Matching is always by (system, code); `display` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    #[serde(default)]
    pub display: String,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>, display: impl Into<String>) -> Self {
        Self { system: system.into(), code: code.into(), display: display.into() }
    }

    pub fn same_code(&self, system: &str, code: &str) -> bool {
        self.system == system && self.code == code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Integer,
    Decimal,
    String,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    #[default]
    Equals,
    NotEquals,
}

impl Comparator {
    pub fn holds(self, matched: bool) -> bool {
        match self {
            Comparator::Equals => matched,
            Comparator::NotEquals => !matched,
        }
    }
}

/// "Relevant only when the field at `depends_on` compares to `expected`".
/// `depends_on` is a schema path; it is not checked at build time, a dangling
/// reference simply leaves the field unconditionally visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRule {
    pub depends_on: String,
    #[serde(default)]
    pub comparator: Comparator,
    pub expected: Coding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(flatten)]
    pub coding: Coding,
}

impl Variant {
    pub fn new(name: impl Into<String>, coding: Coding) -> Self {
        Self { name: name.into(), coding }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaKind {
    Composite { children: Vec<SchemaNode> },
    Enum { variants: Vec<Variant> },
    CompositeValue {
        #[serde(rename = "type")]
        type_id: String,
    },
    Scalar {
        #[serde(rename = "type")]
        ty: ScalarType,
    },
}

impl SchemaKind {
    pub fn label(&self) -> &'static str {
        match self {
            SchemaKind::Composite { .. } => "composite",
            SchemaKind::Enum { .. } => "enum",
            SchemaKind::CompositeValue { .. } => "composite value",
            SchemaKind::Scalar { ty: ScalarType::Integer } => "integer",
            SchemaKind::Scalar { ty: ScalarType::Decimal } => "decimal",
            SchemaKind::Scalar { ty: ScalarType::String } => "string",
            SchemaKind::Scalar { ty: ScalarType::Date } => "date",
        }
    }
}

/// One declared field of the typed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    pub name: String,
    #[serde(rename = "text")]
    pub display_text: String,
    #[serde(flatten)]
    pub kind: SchemaKind,
    /// Inherited by descendants that do not declare their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, rename = "visibleIf", skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityRule>,
    #[serde(default)]
    pub ignore_in_form: bool,
    #[serde(default)]
    pub combo_box: bool,
    /// Coded meaning or unit for scalar fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_binding: Option<Coding>,
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

impl SchemaNode {
    fn with_kind(name: impl Into<String>, text: impl Into<String>, kind: SchemaKind) -> Self {
        Self {
            name: name.into(),
            display_text: text.into(),
            kind,
            profile: None,
            visibility: None,
            ignore_in_form: false,
            combo_box: false,
            code_binding: None,
        }
    }

    pub fn composite(name: impl Into<String>, text: impl Into<String>, children: Vec<SchemaNode>) -> Self {
        Self::with_kind(name, text, SchemaKind::Composite { children })
    }

    pub fn enumeration(name: impl Into<String>, text: impl Into<String>, variants: Vec<Variant>) -> Self {
        Self::with_kind(name, text, SchemaKind::Enum { variants })
    }

    pub fn composite_value(name: impl Into<String>, text: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self::with_kind(name, text, SchemaKind::CompositeValue { type_id: type_id.into() })
    }

    pub fn scalar(name: impl Into<String>, text: impl Into<String>, ty: ScalarType) -> Self {
        Self::with_kind(name, text, SchemaKind::Scalar { ty })
    }

    pub fn visible_if(mut self, depends_on: impl Into<String>, comparator: Comparator, expected: Coding) -> Self {
        self.visibility = Some(VisibilityRule { depends_on: depends_on.into(), comparator, expected });
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_code_binding(mut self, coding: Coding) -> Self {
        self.code_binding = Some(coding);
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore_in_form = true;
        self
    }

    pub fn combo_box(mut self) -> Self {
        self.combo_box = true;
        self
    }

    pub fn children(&self) -> &[SchemaNode] {
        match &self.kind {
            SchemaKind::Composite { children } => children,
            _ => &[],
        }
    }

    /// Exact (system, code) lookup; display text never participates.
    pub fn variant_for(&self, system: &str, code: &str) -> Option<&Variant> {
        match &self.kind {
            SchemaKind::Enum { variants } => variants.iter().find(|v| v.coding.same_code(system, code)),
            _ => None,
        }
    }

    pub fn variant_named(&self, name: &str) -> Option<&Variant> {
        match &self.kind {
            SchemaKind::Enum { variants } => variants.iter().find(|v| v.name == name),
            _ => None,
        }
    }
}

/// Dot-join a child name onto a schema path. The root's path is empty.
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

/// A validated, immutable schema.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    root: SchemaNode,
    paths: IndexSet<String>,
}

impl SchemaRegistry {
    /// Validate the tree and index every schema path.
    ///
    /// Rejects duplicate paths, duplicate (system, code) pairs inside one enum,
    /// empty enums, field names that are not identifiers and a root that is
    /// not a composite.
    pub fn build(root: SchemaNode) -> Result<Self, ConfigError> {
        let SchemaKind::Composite { children } = &root.kind else {
            return Err(ConfigError::RootNotComposite { name: root.name.clone(), kind: root.kind.label() });
        };
        let mut paths = IndexSet::new();
        for child in children {
            index_node(child, "", &mut paths)?;
        }
        tracing::debug!(model = %root.name, fields = paths.len(), "schema registry built");
        Ok(Self { root, paths })
    }

    pub fn describe(&self) -> &SchemaNode {
        &self.root
    }

    pub fn contains(&self, path: &str) -> bool {
        path.is_empty() || self.paths.contains(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Look a node up by schema path (`""` is the root).
    pub fn node(&self, path: &str) -> Option<&SchemaNode> {
        if path.is_empty() {
            return Some(&self.root);
        }
        let mut node = &self.root;
        for segment in path.split('.') {
            node = node.children().iter().find(|c| c.name == segment)?;
        }
        Some(node)
    }
}

fn index_node(node: &SchemaNode, parent: &str, paths: &mut IndexSet<String>) -> Result<(), ConfigError> {
    if !FIELD_NAME.is_match(&node.name) {
        return Err(ConfigError::InvalidFieldName {
            parent: parent.to_string(),
            name: node.name.clone(),
        });
    }
    let path = join_path(parent, &node.name);
    if !paths.insert(path.clone()) {
        return Err(ConfigError::DuplicatePath(path));
    }
    match &node.kind {
        SchemaKind::Composite { children } => {
            for child in children {
                index_node(child, &path, paths)?;
            }
        }
        SchemaKind::Enum { variants } => {
            if variants.is_empty() {
                return Err(ConfigError::EmptyEnum(path));
            }
            let mut seen = IndexSet::new();
            for v in variants {
                if !seen.insert((v.coding.system.as_str(), v.coding.code.as_str())) {
                    return Err(ConfigError::DuplicateEnumCode {
                        path,
                        system: v.coding.system.clone(),
                        code: v.coding.code.clone(),
                    });
                }
            }
        }
        SchemaKind::CompositeValue { .. } | SchemaKind::Scalar { .. } => {}
    }
    Ok(())
}

/// Read a declarative JSON schema and validate it.
pub fn load_json(src: &str) -> Result<SchemaRegistry, SchemaLoadError> {
    let root: SchemaNode = crate::path_de::from_str_with_path(src)?;
    Ok(SchemaRegistry::build(root)?)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    fn yes() -> Coding { Coding::new("http://snomed.info/sct", "373066001", "Yes") }
    fn no() -> Coding { Coding::new("http://snomed.info/sct", "373067005", "No") }

    fn yes_no(name: &str) -> SchemaNode {
        SchemaNode::enumeration(name, name, vec![Variant::new("YES", yes()), Variant::new("NO", no())])
    }

    #[test]
    fn paths_exclude_the_root_name() {
        let root = SchemaNode::composite("Model", "Model", vec![
            yes_no("hasCondition"),
            SchemaNode::composite("details", "Details", vec![yes_no("subField")]),
        ]);
        let reg = SchemaRegistry::build(root).unwrap();
        let paths: Vec<_> = reg.paths().collect();
        assert_eq!(paths, vec!["hasCondition", "details", "details.subField"]);
        assert_eq!(reg.node("details.subField").unwrap().name, "subField");
        assert_eq!(reg.node("").unwrap().name, "Model");
        assert!(reg.node("details.missing").is_none());
    }

    #[test]
    fn duplicate_sibling_names_are_rejected() {
        let root = SchemaNode::composite("Model", "Model", vec![yes_no("a"), yes_no("a")]);
        assert_eq!(SchemaRegistry::build(root).unwrap_err(), ConfigError::DuplicatePath("a".into()));
    }

    #[test]
    fn duplicate_enum_codes_are_rejected_even_with_different_display() {
        let mut again = yes();
        again.display = "Affirmative".into();
        let root = SchemaNode::composite("Model", "Model", vec![
            SchemaNode::enumeration("e", "E", vec![Variant::new("YES", yes()), Variant::new("ALSO_YES", again)]),
        ]);
        assert!(matches!(
            SchemaRegistry::build(root),
            Err(ConfigError::DuplicateEnumCode { path, .. }) if path == "e"
        ));
    }

    #[test]
    fn root_must_be_a_composite() {
        let dup = Coding::new("s", "1", "");
        let root = SchemaNode::enumeration("Root", "Root", vec![Variant::new("A", dup.clone()), Variant::new("B", dup)]);
        assert_eq!(
            SchemaRegistry::build(root).unwrap_err(),
            ConfigError::RootNotComposite { name: "Root".into(), kind: "enum" }
        );
        let root = SchemaNode::scalar("Root", "Root", ScalarType::Integer);
        assert!(matches!(SchemaRegistry::build(root), Err(ConfigError::RootNotComposite { .. })));

        let src = r#"{"name": "Root", "text": "Root", "kind": "scalar", "type": "integer"}"#;
        assert!(matches!(
            load_json(src),
            Err(SchemaLoadError::Config(ConfigError::RootNotComposite { .. }))
        ));
    }

    #[test]
    fn dotted_names_are_rejected() {
        let root = SchemaNode::composite("Model", "Model", vec![yes_no("a.b")]);
        assert!(matches!(SchemaRegistry::build(root), Err(ConfigError::InvalidFieldName { .. })));
    }

    #[test]
    fn variant_lookup_ignores_display() {
        let node = yes_no("e");
        assert_eq!(node.variant_for("http://snomed.info/sct", "373066001").unwrap().name, "YES");
        assert!(node.variant_for("http://snomed.info/sct", "999").is_none());
        assert!(node.variant_for("http://loinc.org", "373066001").is_none());
    }

    #[test]
    fn loads_declarative_json() {
        let src = serde_json::json!({
            "name": "Model",
            "text": "Model",
            "kind": "composite",
            "profile": "http://example.org/profile",
            "children": [
                {"name": "weight", "text": "Weight", "kind": "scalar", "type": "decimal",
                 "codeBinding": {"system": "http://unitsofmeasure.org", "code": "kg"}},
                {"name": "onset", "text": "Onset", "kind": "composite_value", "type": "status_date",
                 "visibleIf": {"dependsOn": "weight", "expected": {"system": "s", "code": "c"}}}
            ]
        })
        .to_string();
        let reg = load_json(&src).unwrap();
        let weight = reg.node("weight").unwrap();
        assert_eq!(weight.kind, SchemaKind::Scalar { ty: ScalarType::Decimal });
        assert_eq!(weight.code_binding.as_ref().unwrap().code, "kg");
        let onset = reg.node("onset").unwrap();
        assert_eq!(onset.visibility.as_ref().unwrap().comparator, Comparator::Equals);
    }

    #[test]
    fn load_errors_carry_a_json_path() {
        let src = r#"{"name": "Model", "text": "M", "kind": "composite",
                      "children": [{"name": "x", "text": "X", "kind": "scalar", "type": "colour"}]}"#;
        let err = load_json(src).unwrap_err().to_string();
        assert!(err.contains("JSON path"), "{err}");
    }
}
