//! Declarative attribute tables for every resource type and the single
//! routine that validates untyped configuration against them

pub mod waf;

use crate::diagnostics::Diagnostic;
use serde_json::{Map, Value};
use std::net::IpAddr;
use std::sync::OnceLock;

pub const FIREWALL_RULE: &str = "coxedge_firewall_rule";
pub const SCRIPT: &str = "coxedge_script";
pub const WAF_SETTINGS: &str = "coxedge_waf_settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    Computed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Bool,
    Int,
    StringList,
    /// Nested attribute table, written as an object or a one-element list
    Block(Vec<FieldSpec>),
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Int => "number",
            FieldKind::StringList => "list of strings",
            FieldKind::Block(_) => "block",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    None,
    /// String that must parse as a boolean (`true`, `F`, `0`, ...)
    BoolString,
    OneOf(&'static [&'static str]),
    IpAddress,
    Positive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    pub description: &'static str,
    pub validation: Validation,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional,
            description: "",
            validation: Validation::None,
        }
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Every resource schema the provider knows, built once.
pub fn catalog() -> &'static [ResourceSchema] {
    static CATALOG: OnceLock<Vec<ResourceSchema>> = OnceLock::new();

    CATALOG.get_or_init(|| vec![firewall_rule(), script(), waf::waf_settings()])
}

pub fn lookup(type_name: &str) -> Option<&'static ResourceSchema> {
    catalog().iter().find(|s| s.type_name == type_name)
}

fn firewall_rule() -> ResourceSchema {
    ResourceSchema {
        type_name: FIREWALL_RULE,
        description: "Manages an IP allow/block rule of a site's firewall",
        fields: vec![
            FieldSpec::new("id", FieldKind::String)
                .computed()
                .description("The unique identifier for the rule."),
            FieldSpec::new("environment_name", FieldKind::String)
                .required()
                .description("The name of the environment that the site belongs to."),
            FieldSpec::new("site_id", FieldKind::String)
                .required()
                .description("The ID of the site for which the firewall rule is applied to."),
            FieldSpec::new("stack_id", FieldKind::String)
                .computed()
                .description("The ID of the stack that the site belongs to."),
            FieldSpec::new("action", FieldKind::String)
                .required()
                .description("Either ALLOW or BLOCK.")
                .validation(Validation::OneOf(&["ALLOW", "BLOCK"])),
            FieldSpec::new("ip_start", FieldKind::String)
                .required()
                .description("The start ip address for the rule.")
                .validation(Validation::IpAddress),
            FieldSpec::new("ip_end", FieldKind::String)
                .optional()
                .description("The end ip address for the rule.")
                .validation(Validation::IpAddress),
            FieldSpec::new("name", FieldKind::String)
                .required()
                .description("The name of the rule."),
            FieldSpec::new("enabled", FieldKind::Bool)
                .optional()
                .description("Whether or not the rule is enabled. Defaults to true."),
            FieldSpec::new("last_updated", FieldKind::String)
                .computed()
                .description("Time of the last update applied by the provider."),
        ],
    }
}

fn script() -> ResourceSchema {
    ResourceSchema {
        type_name: SCRIPT,
        description: "Manages an edge script attached to site routes",
        fields: vec![
            FieldSpec::new("id", FieldKind::String)
                .computed()
                .description("The unique identifier for the script."),
            FieldSpec::new("stack_id", FieldKind::String)
                .computed()
                .description("The ID of the stack that the script belongs to."),
            FieldSpec::new("site_id", FieldKind::String)
                .required()
                .description("The ID of the site that the script belongs to."),
            FieldSpec::new("environment_name", FieldKind::String)
                .required()
                .description("The name of the environment that the site belongs to."),
            FieldSpec::new("name", FieldKind::String)
                .required()
                .description("The name of the script."),
            FieldSpec::new("created_at", FieldKind::String)
                .computed()
                .description("Creation timestamp of the script."),
            FieldSpec::new("updated_at", FieldKind::String)
                .computed()
                .description("The date on which the script was last updated."),
            FieldSpec::new("version", FieldKind::String)
                .computed()
                .description("The version number of the script."),
            FieldSpec::new("code", FieldKind::String)
                .required()
                .description("The JavaScript code used for the script."),
            FieldSpec::new("routes", FieldKind::StringList)
                .required()
                .description("The routes that incoming requests should respond with a script."),
            FieldSpec::new("last_updated", FieldKind::String)
                .computed()
                .description("Time of the last update applied by the provider."),
        ],
    }
}

/// Boolean spellings accepted for string toggles.
pub fn parse_bool_string(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Check `attrs` against `schema`. An empty result means the configuration
/// is acceptable; null values count as absent.
pub fn validate(schema: &ResourceSchema, attrs: &Map<String, Value>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_fields(&schema.fields, attrs, "", &mut diagnostics);
    diagnostics
}

fn validate_fields(
    fields: &[FieldSpec],
    attrs: &Map<String, Value>,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for field in fields {
        let path = format!("{}{}", prefix, field.name);
        let value = attrs.get(field.name).filter(|v| !v.is_null());

        match (field.presence, value) {
            (Presence::Required, None) => diagnostics.push(
                Diagnostic::error(
                    "Missing required attribute",
                    format!("The {:?} attribute is required", field.name),
                )
                .with_attribute(&path),
            ),
            (Presence::Computed, Some(_)) => diagnostics.push(
                Diagnostic::error(
                    "Computed attribute",
                    format!("{:?} is set by the service and cannot be configured", field.name),
                )
                .with_attribute(&path),
            ),
            (_, Some(value)) => validate_value(field, value, &path, diagnostics),
            (_, None) => {}
        }
    }

    for name in attrs.keys() {
        if !fields.iter().any(|f| f.name == name) {
            diagnostics.push(
                Diagnostic::error(
                    "Unsupported attribute",
                    format!("An attribute named {:?} is not expected here", name),
                )
                .with_attribute(format!("{}{}", prefix, name)),
            );
        }
    }
}

fn validate_value(field: &FieldSpec, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let type_mismatch = || {
        Diagnostic::error(
            "Incorrect attribute value type",
            format!("{:?} must be a {}", field.name, field.kind.name()),
        )
        .with_attribute(path)
    };

    match (&field.kind, value) {
        (FieldKind::String, Value::String(s)) => {
            if let Some(diag) = check_rule(&field.validation, s) {
                diagnostics.push(diag.with_attribute(path));
            }
        }
        (FieldKind::Bool, Value::Bool(_)) => {}
        (FieldKind::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            if field.validation == Validation::Positive && n.as_i64().is_some_and(|n| n <= 0) {
                diagnostics.push(
                    Diagnostic::error("wrong value", format!("{} is not a positive number", n))
                        .with_attribute(path),
                );
            }
        }
        (FieldKind::StringList, Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(s) => {
                        if let Some(diag) = check_rule(&field.validation, s) {
                            diagnostics.push(diag.with_attribute(format!("{}.{}", path, i)));
                        }
                    }
                    None => diagnostics.push(type_mismatch()),
                }
            }
        }
        (FieldKind::Block(nested), Value::Object(block)) => {
            validate_fields(nested, block, &format!("{}.", path), diagnostics);
        }
        (FieldKind::Block(nested), Value::Array(items)) => match items.as_slice() {
            [] => {}
            [Value::Object(block)] => {
                validate_fields(nested, block, &format!("{}.", path), diagnostics);
            }
            _ => diagnostics.push(
                Diagnostic::error(
                    "Too many blocks",
                    format!("At most one {:?} block may be configured", field.name),
                )
                .with_attribute(path),
            ),
        },
        _ => diagnostics.push(type_mismatch()),
    }
}

fn check_rule(validation: &Validation, value: &str) -> Option<Diagnostic> {
    match validation {
        Validation::BoolString if parse_bool_string(value).is_none() => Some(Diagnostic::error(
            "wrong value",
            format!("{:?} is not {:?}", value, "Boolean value"),
        )),
        Validation::OneOf(allowed) if !allowed.contains(&value) => Some(Diagnostic::error(
            "wrong value",
            format!("{:?} is not one of {}", value, allowed.join(", ")),
        )),
        Validation::IpAddress if value.parse::<IpAddr>().is_err() => Some(Diagnostic::error(
            "wrong value",
            format!("{:?} is not a valid IP address", value),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn catalog_lists_every_resource_once() {
        let names: Vec<&str> = catalog().iter().map(|s| s.type_name).collect();
        assert_eq!(names, vec![FIREWALL_RULE, SCRIPT, WAF_SETTINGS]);
        assert!(lookup(SCRIPT).is_some());
        assert!(lookup("coxedge_unknown").is_none());
    }

    #[test]
    fn valid_firewall_rule_has_no_diagnostics() {
        let schema = lookup(FIREWALL_RULE).unwrap();
        let diags = validate(
            schema,
            &attrs(json!({
                "environment_name": "prod",
                "site_id": "site-1",
                "action": "BLOCK",
                "ip_start": "10.0.0.1",
                "ip_end": null,
                "name": "block-scanner",
                "enabled": true
            })),
        );
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn reports_missing_required_and_computed_attributes() {
        let schema = lookup(FIREWALL_RULE).unwrap();
        let diags = validate(
            schema,
            &attrs(json!({
                "environment_name": "prod",
                "site_id": "site-1",
                "action": "ALLOW",
                "ip_start": "10.0.0.1",
                "id": "fw-1"
            })),
        );

        let summaries: Vec<(&str, Option<&str>)> = diags
            .iter()
            .map(|d| (d.summary.as_str(), d.attribute.as_deref()))
            .collect();
        assert!(summaries.contains(&("Computed attribute", Some("id"))));
        assert!(summaries.contains(&("Missing required attribute", Some("name"))));
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn rejects_unknown_action_and_bad_ip() {
        let schema = lookup(FIREWALL_RULE).unwrap();
        let diags = validate(
            schema,
            &attrs(json!({
                "environment_name": "prod",
                "site_id": "site-1",
                "action": "DENY",
                "ip_start": "10.0.0.300",
                "name": "x"
            })),
        );

        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.summary == "wrong value"));
        assert!(diags[0].detail.contains("ALLOW, BLOCK"));
    }

    #[test]
    fn rejects_wrong_types_and_unknown_attributes() {
        let schema = lookup(SCRIPT).unwrap();
        let diags = validate(
            schema,
            &attrs(json!({
                "environment_name": "prod",
                "site_id": "site-1",
                "name": "redirect",
                "code": "addEventListener()",
                "routes": ["/a", 7],
                "runtime": "v8"
            })),
        );

        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].summary, "Incorrect attribute value type");
        assert_eq!(diags[0].attribute.as_deref(), Some("routes"));
        assert_eq!(diags[1].summary, "Unsupported attribute");
        assert_eq!(diags[1].attribute.as_deref(), Some("runtime"));
    }

    #[test]
    fn bool_strings_follow_boolean_spellings() {
        for accepted in ["true", "false", "T", "f", "1", "0", "TRUE", "False"] {
            assert!(parse_bool_string(accepted).is_some(), "{accepted}");
        }
        for rejected in ["yes", "no", "", "tRUE", "2"] {
            assert!(parse_bool_string(rejected).is_none(), "{rejected}");
        }
    }
}
