use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::scan::ScanCommand;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("step {0}: {1}")]
    Step(usize, String),
}

/// An ordered list of scan commands loaded from YAML.
///
/// ```yaml
/// variables:
///   horizon: 1024
/// steps:
///   - action: forward
///   - action: horizontal_sweep
///     points: 12
///     elevation: $horizon
///     passes: 2
///     after: 5s
/// ```
#[derive(Debug, Clone)]
pub struct Plan {
    pub variables: HashMap<String, serde_yaml::Value>,
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub command: ScanCommand,
    /// Pause once the command is done.
    pub after: Option<Duration>,
}

impl Plan {
    pub fn from_file(path: &str) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, PlanError> {
        let root: serde_yaml::Value = serde_yaml::from_str(yaml)?;

        let variables: HashMap<String, serde_yaml::Value> = root
            .get("variables")
            .map(|v| serde_yaml::from_value(v.clone()))
            .transpose()?
            .unwrap_or_default();

        let steps = root
            .get("steps")
            .and_then(|v| v.as_sequence())
            .ok_or_else(|| PlanError::Step(0, "missing 'steps'".into()))?
            .iter()
            .enumerate()
            .map(|(i, v)| parse_step(i + 1, v, &variables))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Plan { variables, steps })
    }
}

fn parse_step(
    i: usize,
    value: &serde_yaml::Value,
    vars: &HashMap<String, serde_yaml::Value>,
) -> Result<PlanStep, PlanError> {
    let err = |msg: &str| PlanError::Step(i, msg.into());
    let resolved = resolve_value(value, vars);
    let mut map = resolved
        .as_mapping()
        .cloned()
        .ok_or_else(|| err("expected mapping"))?;

    let after = map
        .remove("after")
        .map(|v| {
            v.as_str()
                .ok_or_else(|| err("'after' must be a duration string"))
                .and_then(|s| humantime::parse_duration(s.trim()).map_err(|e| err(&e.to_string())))
        })
        .transpose()?;

    if map.get("action").is_none() {
        return Err(err("missing 'action'"));
    }
    let command: ScanCommand = serde_yaml::from_value(serde_yaml::Value::Mapping(map))
        .map_err(|e| err(&e.to_string()))?;

    match &command {
        ScanCommand::HorizontalSweep { points: 0, .. } | ScanCommand::SectionSweep { points: 0, .. } => {
            return Err(err("points must be at least 1"));
        }
        ScanCommand::SectionSweep { start, end, .. } if start >= end => {
            return Err(err("section start must be below end"));
        }
        _ => {}
    }

    Ok(PlanStep { command, after })
}

fn resolve_value(
    value: &serde_yaml::Value,
    vars: &HashMap<String, serde_yaml::Value>,
) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::String(s) => {
            // Whole value "$var" keeps the variable's type
            let t = s.trim();
            if let Some(name) = t.strip_prefix('$') {
                if !name.contains(' ') {
                    if let Some(v) = vars.get(name) {
                        return v.clone();
                    }
                }
            }
            let mut result = s.clone();
            for (name, val) in vars {
                let pattern = format!("${}", name);
                if let Some(rep) = simple_to_string(val) {
                    result = result.replace(&pattern, &rep);
                }
            }
            serde_yaml::Value::String(result)
        }
        serde_yaml::Value::Mapping(m) => serde_yaml::Value::Mapping(
            m.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, vars)))
                .collect(),
        ),
        serde_yaml::Value::Sequence(s) => {
            serde_yaml::Value::Sequence(s.iter().map(|v| resolve_value(v, vars)).collect())
        }
        other => other.clone(),
    }
}

fn simple_to_string(v: &serde_yaml::Value) -> Option<String> {
    match v {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
