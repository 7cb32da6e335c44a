//! Static validation of a command log against the schema registry,
//! without executing anything. Catches the problems a replay would hit
//! (unknown types/operations, references to objects not yet created,
//! duplicate construction ids) plus shape problems a replay might let
//! slide (undeclared or missing parameters, kind mismatches).

use std::collections::HashMap;
use std::fmt;

use gsp_protocol::{Cid, CommandLog, Envelope, Oid, TARGET_PARAM, Value};

use crate::schema::{ParamKind, ParamSpec, SchemaRegistry};

/// One problem found in a log, tagged with the offending command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command {cid}: {message}")]
pub struct LintIssue {
    pub cid: Cid,
    pub message: String,
}

/// Walk the whole log and report every issue found. An empty result
/// means a replay in this order would find every reference resolvable
/// and every envelope well formed.
pub fn lint_log(schemas: &SchemaRegistry, log: &CommandLog) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    // Created ids and their type names, in log order.
    let mut created: HashMap<Oid, String> = HashMap::new();

    for envelope in log {
        lint_envelope(schemas, envelope, &mut created, &mut issues);
    }
    issues
}

/// Hard-failure form: the first issue, if any.
pub fn check_log(schemas: &SchemaRegistry, log: &CommandLog) -> Result<(), LintIssue> {
    match lint_log(schemas, log).into_iter().next() {
        Some(issue) => Err(issue),
        None => Ok(()),
    }
}

fn lint_envelope(
    schemas: &SchemaRegistry,
    envelope: &Envelope,
    created: &mut HashMap<Oid, String>,
    issues: &mut Vec<LintIssue>,
) {
    let cid = envelope.cid;
    let mut report = |message: String| issues.push(LintIssue { cid, message });

    let Some(target) = envelope.target_oid() else {
        report("no usable `id` parameter".to_string());
        return;
    };

    let type_name = &envelope.method.type_name;
    let Ok(schema) = schemas.get(type_name) else {
        report(format!("unknown type `{type_name}`"));
        return;
    };

    let declared: &[ParamSpec] = match &envelope.method.operation {
        None => {
            if created.contains_key(&target) {
                report(format!("duplicate construction of {target}"));
            } else {
                created.insert(target, type_name.clone());
            }
            schema.params()
        }
        Some(operation) => {
            match created.get(&target) {
                None => report(format!("mutation of {target} before its construction")),
                Some(actual) if actual != type_name => report(format!(
                    "mutation addresses {target} as `{type_name}` but it is a `{actual}`"
                )),
                Some(_) => {}
            }
            match schema.operation(operation) {
                Ok(op) => op.params(),
                Err(_) => {
                    report(format!("type `{type_name}` has no operation `{operation}`"));
                    return;
                }
            }
        }
    };

    for spec in declared {
        match envelope.parameters.get(spec.name) {
            None => report(format!("missing parameter `{}`", spec.name)),
            Some(value) => {
                if !spec.kinds.iter().any(|kind| kind.accepts_value(value)) {
                    report(format!(
                        "parameter `{}` has kind {}, expected {}",
                        spec.name,
                        value.kind(),
                        ExpectedKinds(&spec.kinds)
                    ));
                }
                lint_reference(spec, value, created, &mut report);
            }
        }
    }

    for (name, _) in envelope.parameters.iter() {
        if name != TARGET_PARAM && !declared.iter().any(|spec| spec.name == name) {
            report(format!("parameter `{name}` is not declared"));
        }
    }
}

/// Reference parameters must point at an object created earlier in the
/// log, and at one of the declared type.
fn lint_reference(
    spec: &ParamSpec,
    value: &Value,
    created: &HashMap<Oid, String>,
    report: &mut impl FnMut(String),
) {
    let Value::Ref(oid) = value else {
        return;
    };
    let expected: Vec<&'static str> = spec
        .kinds
        .iter()
        .filter_map(|kind| match kind {
            ParamKind::Ref(type_name) => Some(*type_name),
            _ => None,
        })
        .collect();
    if expected.is_empty() {
        return;
    }
    match created.get(oid) {
        None => report(format!(
            "parameter `{}` references {oid}, which is not created earlier in the log",
            spec.name
        )),
        Some(actual) if !expected.contains(&actual.as_str()) => report(format!(
            "parameter `{}` references {oid}, a `{actual}`, expected {}",
            spec.name,
            expected.join(" | ")
        )),
        Some(_) => {}
    }
}

struct ExpectedKinds<'a>(&'a [ParamKind]);

impl fmt::Display for ExpectedKinds<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, kind) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{kind}")?;
        }
        Ok(())
    }
}
