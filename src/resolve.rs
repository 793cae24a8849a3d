//! Position id assignment and predicate rewriting.
//!
//! Ids come from tree shape only: the root is `1`, its children `1.1`, `1.2`,
//! and so on in declaration order. Re-running on an unchanged tree yields the
//! same ids.
use indexmap::{IndexMap, IndexSet};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::form::{FormItem, PredicateTarget};

pub const ROOT_POSITION: &str = "1";

/// Schema path → position id, in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    by_schema_path: IndexMap<String, String>,
}

impl PositionIndex {
    pub fn position_of(&self, schema_path: &str) -> Option<&str> {
        self.by_schema_path.get(schema_path).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_schema_path.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_schema_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_schema_path.is_empty()
    }
}

/// Assign position ids in place and rewrite every predicate to point at a
/// position. Predicates whose dependency is not in the form are dropped and
/// reported; the rest of the tree is unaffected.
pub fn resolve(form: &mut FormItem, diagnostics: &mut Diagnostics) -> PositionIndex {
    let mut index = PositionIndex::default();
    assign(form, ROOT_POSITION.to_string(), &mut index);

    let positions: IndexSet<String> = index.by_schema_path.values().cloned().collect();
    let mut rewritten = 0usize;
    rewrite(form, &index, &positions, diagnostics, &mut rewritten);
    tracing::debug!(items = index.len(), predicates = rewritten, "positions resolved");
    index
}

fn assign(item: &mut FormItem, id: String, index: &mut PositionIndex) {
    index.by_schema_path.insert(item.schema_path.clone(), id.clone());
    for (i, child) in item.children.iter_mut().enumerate() {
        assign(child, format!("{id}.{}", i + 1), index);
    }
    item.position_id = Some(id);
}

fn rewrite(
    item: &mut FormItem,
    index: &PositionIndex,
    positions: &IndexSet<String>,
    diagnostics: &mut Diagnostics,
    rewritten: &mut usize,
) {
    if let Some(pred) = item.visibility.as_mut() {
        let resolved = match &pred.target {
            PredicateTarget::SchemaPath(path) => index.position_of(path).map(str::to_string),
            PredicateTarget::Position(pos) => positions.contains(pos).then(|| pos.clone()),
        };
        match resolved {
            Some(pos) => {
                pred.target = PredicateTarget::Position(pos);
                *rewritten += 1;
            }
            None => {
                let depends_on = match &pred.target {
                    PredicateTarget::SchemaPath(p) | PredicateTarget::Position(p) => p.clone(),
                };
                diagnostics.push(Diagnostic::DanglingDependency { item: item.schema_path.clone(), depends_on });
                item.visibility = None;
            }
        }
    }
    for child in &mut item.children {
        rewrite(child, index, positions, diagnostics, rewritten);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{CompositeRegistry, Presence};
    use crate::render::FormRenderer;
    use crate::schema::{Comparator, SchemaNode, SchemaRegistry};

    fn rendered(children: Vec<SchemaNode>) -> FormItem {
        let schema = SchemaRegistry::build(SchemaNode::composite("Model", "Model", children)).unwrap();
        FormRenderer::new(&CompositeRegistry::with_builtins()).render(&schema).unwrap()
    }

    fn example() -> FormItem {
        rendered(vec![
            SchemaNode::enumeration("hasCondition", "Has condition?", Presence::variants()),
            SchemaNode::composite("details", "Details", vec![
                SchemaNode::enumeration("subField", "Sub field", Presence::variants()),
            ])
            .visible_if("hasCondition", Comparator::Equals, Presence::Yes.coding()),
        ])
    }

    #[test]
    fn assigns_dotted_positions_and_rewrites_predicates() {
        let mut form = example();
        let mut diags = Diagnostics::new();
        let index = resolve(&mut form, &mut diags);

        assert_eq!(form.position_id.as_deref(), Some("1"));
        assert_eq!(form.children[0].position_id.as_deref(), Some("1.1"));
        let details = &form.children[1];
        assert_eq!(details.position_id.as_deref(), Some("1.2"));
        assert_eq!(details.children[0].position_id.as_deref(), Some("1.2.1"));
        assert_eq!(
            details.visibility.as_ref().unwrap().target,
            PredicateTarget::Position("1.1".into())
        );
        let order: Vec<_> = index.iter().map(|(path, _)| path).collect();
        assert_eq!(order, vec!["", "hasCondition", "details", "details.subField"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn resolving_twice_is_deterministic() {
        let mut once = example();
        let mut diags = Diagnostics::new();
        let first = resolve(&mut once, &mut diags);
        let mut twice = once.clone();
        let second = resolve(&mut twice, &mut diags);
        assert_eq!(first, second);
        assert_eq!(once, twice);
        assert!(diags.is_empty());
    }

    #[test]
    fn dangling_dependency_drops_only_that_predicate() {
        let mut form = rendered(vec![
            SchemaNode::enumeration("a", "A", Presence::variants()),
            SchemaNode::enumeration("b", "B", Presence::variants())
                .visible_if("doesNotExist", Comparator::Equals, Presence::Yes.coding()),
            SchemaNode::enumeration("c", "C", Presence::variants())
                .visible_if("a", Comparator::NotEquals, Presence::No.coding()),
        ]);
        let mut diags = Diagnostics::new();
        resolve(&mut form, &mut diags);

        assert!(form.children[1].visibility.is_none());
        assert_eq!(form.children[1].position_id.as_deref(), Some("1.2"));
        assert_eq!(
            form.children[2].visibility.as_ref().unwrap().target,
            PredicateTarget::Position("1.1".into())
        );
        let all: Vec<_> = diags.iter().cloned().collect();
        assert_eq!(all, vec![Diagnostic::DanglingDependency { item: "b".into(), depends_on: "doesNotExist".into() }]);
    }

    #[test]
    fn composite_sibling_predicates_resolve() {
        let mut form = rendered(vec![SchemaNode::composite_value("onset", "Onset", "status_date")]);
        let mut diags = Diagnostics::new();
        resolve(&mut form, &mut diags);
        let date = form.find_by_schema_path("onset.date").unwrap();
        assert_eq!(date.position_id.as_deref(), Some("1.1.2"));
        assert_eq!(date.visibility.as_ref().unwrap().target, PredicateTarget::Position("1.1.1".into()));
    }
}
