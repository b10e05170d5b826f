use std::str::FromStr;

use common_auth::Role;

use crate::error::PolicyError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct RouteRule {
    prefix: String,
    roles: Vec<Role>,
}

/// Path-prefix to allowed-roles table.
///
/// Prefixes match as raw string prefixes, so `/admin` also covers
/// `/administrator`. The longest matching prefix wins. A path with no
/// matching rule admits any authenticated caller; a rule with no roles admits
/// nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePolicy {
    // Sorted longest prefix first; lookup takes the first hit.
    rules: Vec<RouteRule>,
}

impl RoutePolicy {
    /// Build from `(prefix, roles)` pairs. A repeated prefix replaces the
    /// earlier entry.
    pub fn new<I, P>(rules: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<Role>)>,
        P: Into<String>,
    {
        let mut table: Vec<RouteRule> = Vec::new();
        for (prefix, roles) in rules {
            let prefix = prefix.into();
            match table.iter_mut().find(|rule| rule.prefix == prefix) {
                Some(existing) => existing.roles = roles,
                None => table.push(RouteRule { prefix, roles }),
            }
        }
        table.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Self { rules: table }
    }

    /// The built-in table for the tutoring portal.
    pub fn tutoring_default() -> Self {
        use Role::*;
        Self::new([
            ("/admin", vec![Admin]),
            ("/api/admin", vec![Admin]),
            ("/teacher", vec![Teacher, Admin]),
            ("/api/teacher", vec![Teacher, Admin]),
            ("/student", vec![Student]),
        ])
    }

    /// Parse `"/admin=ADMIN;/teacher=TEACHER,ADMIN"`. Blank entries are
    /// skipped; `"/locked="` lists no roles and so locks the prefix.
    pub fn parse(spec: &str) -> Result<Self, PolicyError> {
        let mut rules = Vec::new();
        for entry in spec.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (prefix, roles) = entry
                .split_once('=')
                .ok_or_else(|| PolicyError::MissingSeparator(entry.to_string()))?;
            let prefix = prefix.trim();
            if !prefix.starts_with('/') {
                return Err(PolicyError::InvalidPrefix(prefix.to_string()));
            }

            let roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(|r| {
                    r.parse::<Role>().map_err(|_| PolicyError::UnknownRole {
                        prefix: prefix.to_string(),
                        role: r.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rules.push((prefix.to_string(), roles));
        }
        Ok(Self::new(rules))
    }

    /// Roles of the longest matching rule, or `None` when no rule matches.
    pub fn allowed_roles(&self, path: &str) -> Option<&[Role]> {
        self.rules
            .iter()
            .find(|rule| path.starts_with(rule.prefix.as_str()))
            .map(|rule| rule.roles.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in lookup order.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &[Role])> {
        self.rules
            .iter()
            .map(|rule| (rule.prefix.as_str(), rule.roles.as_slice()))
    }
}

impl FromStr for RoutePolicy {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}
