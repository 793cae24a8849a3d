// Generic form tree. No schema types leak in here except `Coding`, so a wire
// encoder only needs this module.

use serde::Serialize;

use crate::schema::{Coding, Comparator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Group,
    Choice,
    Decimal,
    Integer,
    Date,
    String,
}

impl ItemKind {
    pub fn is_leaf(self) -> bool {
        !matches!(self, ItemKind::Group)
    }

    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Group => "group",
            ItemKind::Choice => "choice",
            ItemKind::Decimal => "decimal",
            ItemKind::Integer => "integer",
            ItemKind::Date => "date",
            ItemKind::String => "string",
        }
    }
}

/// What a predicate points at. Rendering produces `SchemaPath`; the resolver
/// rewrites it to `Position` or drops the predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateTarget {
    SchemaPath(String),
    Position(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibilityPredicate {
    pub target: PredicateTarget,
    pub comparator: Comparator,
    pub expected: Coding,
}

/// Opaque pass-through for the wire encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Coding>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub combo_box: bool,
}

/// Marks an item as one part of a composite value rooted at `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositePart {
    pub type_id: String,
    pub prefix: String,
    pub suffix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormItem {
    /// Assigned by the resolver; `None` straight out of the renderer.
    pub position_id: Option<String>,
    pub schema_path: String,
    pub display_text: String,
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub answer_options: Vec<Coding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FormItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityPredicate>,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositePart>,
}

impl FormItem {
    pub fn new(schema_path: impl Into<String>, display_text: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            position_id: None,
            schema_path: schema_path.into(),
            display_text: display_text.into(),
            kind,
            answer_options: Vec::new(),
            children: Vec::new(),
            visibility: None,
            metadata: Metadata::default(),
            composite: None,
        }
    }

    pub fn choice(schema_path: impl Into<String>, display_text: impl Into<String>, options: Vec<Coding>) -> Self {
        let mut item = Self::new(schema_path, display_text, ItemKind::Choice);
        item.answer_options = options;
        item
    }

    /// Visibility against another item, still addressed by schema path.
    pub fn visible_if(mut self, schema_path: impl Into<String>, comparator: Comparator, expected: Coding) -> Self {
        self.visibility = Some(VisibilityPredicate {
            target: PredicateTarget::SchemaPath(schema_path.into()),
            comparator,
            expected,
        });
        self
    }

    /// Pre-order iterator over this item and all descendants.
    pub fn iter(&self) -> impl Iterator<Item = &FormItem> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let item = stack.pop()?;
            stack.extend(item.children.iter().rev());
            Some(item)
        })
    }

    pub fn find_by_schema_path(&self, path: &str) -> Option<&FormItem> {
        self.iter().find(|item| item.schema_path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_is_pre_order_in_declaration_order() {
        let mut root = FormItem::new("", "root", ItemKind::Group);
        let mut group = FormItem::new("g", "g", ItemKind::Group);
        group.children.push(FormItem::new("g.x", "x", ItemKind::String));
        root.children.push(FormItem::new("a", "a", ItemKind::Integer));
        root.children.push(group);
        root.children.push(FormItem::new("b", "b", ItemKind::Date));
        let order: Vec<_> = root.iter().map(|i| i.schema_path.as_str()).collect();
        assert_eq!(order, vec!["", "a", "g", "g.x", "b"]);
    }
}
