use crate::composite::CompositeRegistry;
use crate::error::ConfigError;
use crate::form::{CompositePart, FormItem, ItemKind, PredicateTarget, VisibilityPredicate};
use crate::schema::{join_path, ScalarType, SchemaKind, SchemaNode, SchemaRegistry};

/// Schema → form compiler. Output still addresses visibility predicates by
/// schema path and carries no position ids; run the resolver next.
pub struct FormRenderer<'a> {
    composites: &'a CompositeRegistry,
}

impl<'a> FormRenderer<'a> {
    pub fn new(composites: &'a CompositeRegistry) -> Self {
        Self { composites }
    }

    pub fn render(&self, schema: &SchemaRegistry) -> Result<FormItem, ConfigError> {
        let root = schema.describe();
        // fail before building anything if a composite type is unknown
        check_composites(root, "", self.composites)?;
        let form = self.render_node(root, String::new(), root.profile.as_deref())?;
        tracing::debug!(model = %root.name, items = form.iter().count(), "form rendered");
        Ok(form)
    }

    fn render_node(&self, node: &SchemaNode, path: String, inherited: Option<&str>) -> Result<FormItem, ConfigError> {
        let profile = node.profile.as_deref().or(inherited);

        let mut item = match &node.kind {
            SchemaKind::Composite { children } => {
                let mut group = FormItem::new(path.clone(), node.display_text.clone(), ItemKind::Group);
                for child in children.iter().filter(|c| !c.ignore_in_form) {
                    group.children.push(self.render_node(child, join_path(&path, &child.name), profile)?);
                }
                group
            }
            SchemaKind::Enum { variants } => FormItem::choice(
                path.clone(),
                node.display_text.clone(),
                variants.iter().map(|v| v.coding.clone()).collect(),
            ),
            SchemaKind::CompositeValue { type_id } => {
                let renderer = self.composites.get(type_id).ok_or_else(|| ConfigError::MissingCompositeRenderer {
                    path: path.clone(),
                    type_id: type_id.clone(),
                })?;
                let mut group = FormItem::new(path.clone(), node.display_text.clone(), ItemKind::Group);
                group.children = renderer.render(&path);
                for child in &mut group.children {
                    tag_parts(child, type_id, &path, profile);
                }
                group
            }
            SchemaKind::Scalar { ty } => {
                let mut leaf = FormItem::new(path.clone(), node.display_text.clone(), scalar_item_kind(*ty));
                leaf.metadata.unit = node.code_binding.clone();
                leaf
            }
        };

        item.metadata.profile = profile.map(str::to_string);
        item.metadata.combo_box = node.combo_box;
        item.visibility = node.visibility.as_ref().map(|rule| VisibilityPredicate {
            target: PredicateTarget::SchemaPath(rule.depends_on.clone()),
            comparator: rule.comparator,
            expected: rule.expected.clone(),
        });
        Ok(item)
    }
}

pub fn scalar_item_kind(ty: ScalarType) -> ItemKind {
    match ty {
        ScalarType::Integer => ItemKind::Integer,
        ScalarType::Decimal => ItemKind::Decimal,
        ScalarType::String => ItemKind::String,
        ScalarType::Date => ItemKind::Date,
    }
}

fn check_composites(node: &SchemaNode, path: &str, composites: &CompositeRegistry) -> Result<(), ConfigError> {
    match &node.kind {
        SchemaKind::CompositeValue { type_id } if !composites.contains(type_id) => {
            Err(ConfigError::MissingCompositeRenderer { path: path.to_string(), type_id: type_id.clone() })
        }
        SchemaKind::Composite { children } => children
            .iter()
            .try_for_each(|c| check_composites(c, &join_path(path, &c.name), composites)),
        _ => Ok(()),
    }
}

fn tag_parts(item: &mut FormItem, type_id: &str, prefix: &str, profile: Option<&str>) {
    let suffix = item
        .schema_path
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(&item.schema_path)
        .to_string();
    item.composite = Some(CompositePart { type_id: type_id.to_string(), prefix: prefix.to_string(), suffix });
    if item.metadata.profile.is_none() {
        item.metadata.profile = profile.map(str::to_string);
    }
    for child in &mut item.children {
        tag_parts(child, type_id, prefix, profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::Presence;
    use crate::schema::{Coding, Comparator};

    fn example_schema() -> SchemaRegistry {
        SchemaRegistry::build(SchemaNode::composite("Model", "Model", vec![
            SchemaNode::enumeration("hasCondition", "Has condition?", Presence::variants()),
            SchemaNode::composite("details", "Details", vec![
                SchemaNode::enumeration("subField", "Sub field", Presence::variants()),
            ])
            .visible_if("hasCondition", Comparator::Equals, Presence::Yes.coding()),
        ]))
        .unwrap()
    }

    #[test]
    fn renders_groups_choices_and_unresolved_predicates() {
        let composites = CompositeRegistry::with_builtins();
        let form = FormRenderer::new(&composites).render(&example_schema()).unwrap();
        assert_eq!(form.kind, ItemKind::Group);
        assert_eq!(form.schema_path, "");
        assert_eq!(form.children.len(), 2);

        let has = &form.children[0];
        assert_eq!(has.kind, ItemKind::Choice);
        assert_eq!(has.answer_options, Presence::ALL.map(Presence::coding).to_vec());

        let details = &form.children[1];
        assert_eq!(details.kind, ItemKind::Group);
        assert_eq!(details.children[0].schema_path, "details.subField");
        let pred = details.visibility.as_ref().unwrap();
        assert_eq!(pred.target, PredicateTarget::SchemaPath("hasCondition".into()));
        assert!(form.iter().all(|i| i.position_id.is_none()));
    }

    #[test]
    fn ignored_fields_are_skipped_and_profiles_inherited() {
        let schema = SchemaRegistry::build(
            SchemaNode::composite("Model", "Model", vec![
                SchemaNode::scalar("note", "Note", ScalarType::String).ignored(),
                SchemaNode::scalar("weight", "Weight", ScalarType::Decimal)
                    .with_code_binding(Coding::new("http://unitsofmeasure.org", "kg", "kilogram")),
                SchemaNode::composite("other", "Other", vec![
                    SchemaNode::scalar("count", "Count", ScalarType::Integer),
                ])
                .with_profile("http://example.org/other"),
                SchemaNode::composite_value("onset", "Onset", "status_date").combo_box(),
            ])
            .with_profile("http://example.org/root"),
        )
        .unwrap();
        let composites = CompositeRegistry::with_builtins();
        let form = FormRenderer::new(&composites).render(&schema).unwrap();

        assert!(form.find_by_schema_path("note").is_none());
        let weight = form.find_by_schema_path("weight").unwrap();
        assert_eq!(weight.metadata.unit.as_ref().unwrap().code, "kg");
        assert_eq!(weight.metadata.profile.as_deref(), Some("http://example.org/root"));
        let count = form.find_by_schema_path("other.count").unwrap();
        assert_eq!(count.metadata.profile.as_deref(), Some("http://example.org/other"));

        let onset = form.find_by_schema_path("onset").unwrap();
        assert!(onset.metadata.combo_box);
        let date = form.find_by_schema_path("onset.date").unwrap();
        let part = date.composite.as_ref().unwrap();
        assert_eq!((part.prefix.as_str(), part.suffix.as_str()), ("onset", "date"));
        assert_eq!(date.metadata.profile.as_deref(), Some("http://example.org/root"));
    }

    #[test]
    fn unknown_composite_type_fails_at_render_start() {
        let schema = SchemaRegistry::build(SchemaNode::composite("Model", "Model", vec![
            SchemaNode::composite("nested", "Nested", vec![
                SchemaNode::composite_value("bp", "Blood pressure", "blood_pressure").ignored(),
            ]),
        ]))
        .unwrap();
        let composites = CompositeRegistry::with_builtins();
        let err = FormRenderer::new(&composites).render(&schema).unwrap_err();
        assert_eq!(err, ConfigError::MissingCompositeRenderer {
            path: "nested.bp".into(),
            type_id: "blood_pressure".into(),
        });
    }
}
