use rockwatch_common::types::Severity;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RecipientGroupName {
    Emergency,
    Managers,
    Operators,
}

/// Severity → group membership. Higher severities reach strictly more groups.
pub fn groups_for(severity: Severity) -> &'static [RecipientGroupName] {
    use RecipientGroupName::*;
    match severity {
        Severity::High => &[Emergency, Managers, Operators],
        Severity::Medium => &[Managers, Operators],
        Severity::Low => &[Operators],
    }
}

/// Contact endpoints of one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipientGroup {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
}

/// Appends the non-blank entries of `src` to `dst`, skipping ones already present.
fn merge_distinct(dst: &mut Vec<String>, src: &[String]) {
    for entry in src {
        let entry = entry.trim();
        if !entry.is_empty() && !dst.iter().any(|e| e == entry) {
            dst.push(entry.to_string());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipientDirectory {
    #[serde(default)]
    pub emergency: RecipientGroup,
    #[serde(default)]
    pub managers: RecipientGroup,
    #[serde(default)]
    pub operators: RecipientGroup,
}

/// Union of endpoints across the groups selected for a severity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRecipients {
    pub groups: Vec<RecipientGroupName>,
    /// Distinct addresses, first-seen order.
    pub emails: Vec<String>,
    /// Distinct phone numbers, first-seen order.
    pub phones: Vec<String>,
}

impl ResolvedRecipients {
    pub fn endpoint_count(&self) -> usize {
        self.emails.len() + self.phones.len()
    }
}

impl RecipientDirectory {
    pub fn group(&self, name: RecipientGroupName) -> &RecipientGroup {
        match name {
            RecipientGroupName::Emergency => &self.emergency,
            RecipientGroupName::Managers => &self.managers,
            RecipientGroupName::Operators => &self.operators,
        }
    }

    pub fn resolve(&self, severity: Severity) -> ResolvedRecipients {
        let mut resolved = ResolvedRecipients {
            groups: groups_for(severity).to_vec(),
            ..Default::default()
        };
        for name in groups_for(severity) {
            let group = self.group(*name);
            merge_distinct(&mut resolved.emails, &group.emails);
            merge_distinct(&mut resolved.phones, &group.phones);
        }
        resolved
    }
}
