use crate::config::RuleConfig;
use crate::patterns::rules::{self, parse_rule};
use crate::patterns::Rule;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fmt;

/// A rule with the name and description shown to the user.
#[derive(Debug, Clone)]
pub struct Policy {
    pub id: u8,
    pub name: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub rule: Rule,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}, \"{}\"", self.name, self.description)?;
        write!(f, "{}", self.rule)
    }
}

fn standard(id: u8, name: &'static str, description: &'static str, rule: &Rule) -> Policy {
    Policy {
        id,
        name: Cow::Borrowed(name),
        description: Cow::Borrowed(description),
        rule: rule.clone(),
    }
}

/// Maps the numeric rule ids accepted on the command line to policies.
///
/// Ids 1-4 are the built-in standards; rules from the config file follow
/// from 5 in file order.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    policies: Vec<Policy>,
}

impl PolicyTable {
    pub fn builtin() -> Self {
        Self {
            policies: vec![
                standard(1, "Fast", "Data will be overwritten with zeroes (1 pass)", &rules::FAST),
                standard(2, "VSITR", "German VSITR (7 passes)", &rules::VSITR),
                standard(
                    3,
                    "UsDod5220_22_M",
                    "US Department of Defense DoD 5220.22-M (3 passes)",
                    &rules::DOD_5220_22_M,
                ),
                standard(4, "Gutmann", "Peter Gutmann Secure Method (35 passes)", &rules::GUTMANN),
            ],
        }
    }

    pub fn with_custom(custom: &[RuleConfig]) -> Result<Self> {
        let mut table = Self::builtin();
        for config in custom {
            let id = u8::try_from(table.policies.len() + 1)
                .context("Too many rules in config file")?;
            let rule = parse_rule(&config.passes)
                .with_context(|| format!("Invalid rule '{}' in config file", config.name))?;
            table.policies.push(Policy {
                id,
                name: Cow::Owned(config.name.clone()),
                description: Cow::Owned(config.description.clone()),
                rule,
            });
        }
        Ok(table)
    }

    pub fn get(&self, id: u8) -> Option<&Policy> {
        self.policies.iter().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Policy> {
        self.policies.iter()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}
