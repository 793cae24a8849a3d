//! Built-in clinical history model, used by the CLI when no schema file is
//! given and by the tests.
use crate::composite::Presence;
use crate::error::ConfigError;
use crate::schema::{Coding, Comparator, ScalarType, SchemaNode, SchemaRegistry, Variant};

pub const PROFILE: &str = "http://example.org/fhir/StructureDefinition/clinical-history";
pub const VITALS_PROFILE: &str = "http://example.org/fhir/StructureDefinition/vital-signs";

const SNOMED: &str = "http://snomed.info/sct";
const UCUM: &str = "http://unitsofmeasure.org";

fn severity() -> Vec<Variant> {
    vec![
        Variant::new("MILD", Coding::new(SNOMED, "255604002", "Mild")),
        Variant::new("MODERATE", Coding::new(SNOMED, "6736007", "Moderate")),
        Variant::new("SEVERE", Coding::new(SNOMED, "24484000", "Severe")),
    ]
}

pub fn schema() -> SchemaNode {
    SchemaNode::composite("ClinicalHistory", "Clinical history", vec![
        SchemaNode::enumeration("hasCondition", "Has the condition been diagnosed?", Presence::variants()),
        SchemaNode::composite("details", "Diagnosis", vec![
            SchemaNode::composite_value("diagnosis", "Diagnosis confirmed", "status_date"),
            SchemaNode::enumeration("severity", "Severity", severity()).combo_box(),
            SchemaNode::scalar("ageAtOnset", "Age at onset", ScalarType::Integer)
                .with_code_binding(Coding::new(UCUM, "a", "year")),
        ])
        .visible_if("hasCondition", Comparator::Equals, Presence::Yes.coding()),
        SchemaNode::composite("vitals", "Vital signs", vec![
            SchemaNode::scalar("bodyWeight", "Body weight", ScalarType::Decimal)
                .with_code_binding(Coding::new(UCUM, "kg", "kilogram")),
            SchemaNode::composite_value("height", "Body height", "quantity"),
            SchemaNode::scalar("measuredOn", "Measured on", ScalarType::Date),
        ])
        .with_profile(VITALS_PROFILE),
        SchemaNode::enumeration("smoker", "Current smoker?", Presence::variants()),
        SchemaNode::scalar("packYears", "Pack years", ScalarType::Integer)
            .visible_if("smoker", Comparator::Equals, Presence::Yes.coding()),
        SchemaNode::scalar("comment", "Comment", ScalarType::String),
        SchemaNode::scalar("recordId", "Internal record id", ScalarType::String).ignored(),
    ])
    .with_profile(PROFILE)
}

pub fn registry() -> Result<SchemaRegistry, ConfigError> {
    SchemaRegistry::build(schema())
}
