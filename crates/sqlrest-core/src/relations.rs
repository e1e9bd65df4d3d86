//! The relations environment threaded through lowering.
//!
//! Built while lowering `FROM`, then read-only: every other clause lowerer
//! resolves qualified column references against it. It is lowering-time
//! only and never appears in the output request model.

use crate::model::EmbeddedTarget;

/// The primary (first, un-joined) relation named in `FROM`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimaryRelation {
    pub name: String,
    pub alias: Option<String>,
}

impl PrimaryRelation {
    /// The name other clauses use to address this relation: the alias if
    /// one was given, otherwise the relation's own name.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// The relations visible while lowering a single `SELECT`.
#[derive(Clone, Debug)]
pub struct RelationsEnv {
    pub primary: PrimaryRelation,
    pub joined: Vec<EmbeddedTarget>,
}

impl RelationsEnv {
    pub fn bare(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            primary: PrimaryRelation {
                name: name.into(),
                alias,
            },
            joined: Vec::new(),
        }
    }

    /// The reference (alias-or-name) a joined target is addressed by.
    pub fn joined_reference(target: &EmbeddedTarget) -> &str {
        target.alias.as_deref().unwrap_or(&target.relation)
    }

    /// Look up a joined target by the name a qualified column or `GROUP BY`
    /// entry used to address it, recursing into nested embeds.
    ///
    /// Resolution (spec.md §4.3 pass 2): a target's reference is its alias
    /// if it has one, otherwise its relation name, matching how SQL itself
    /// addresses a joined relation (`authors b` is reached as `b`, `authors`
    /// with no alias is reached as `authors`), regardless of spread mode.
    pub fn find_by_reference<'a>(
        targets: &'a [EmbeddedTarget],
        name: &str,
    ) -> Option<&'a EmbeddedTarget> {
        for target in targets {
            if Self::joined_reference(target) == name {
                return Some(target);
            }
            if let Some(found) = Self::find_by_reference_nested(target, name) {
                return Some(found);
            }
        }
        None
    }

    fn find_by_reference_nested<'a>(
        target: &'a EmbeddedTarget,
        name: &str,
    ) -> Option<&'a EmbeddedTarget> {
        let nested: Vec<&EmbeddedTarget> = target
            .targets
            .iter()
            .filter_map(|t| match t {
                crate::model::Target::Embedded(e) => Some(e),
                _ => None,
            })
            .collect();
        for n in &nested {
            if Self::joined_reference(n) == name {
                return Some(n);
            }
        }
        None
    }

    /// Is `name` the primary relation's reference, an already-joined
    /// relation's reference, or neither?
    pub fn contains_reference(&self, name: &str) -> bool {
        if self.primary.reference() == name {
            return true;
        }
        self.joined.iter().any(|t| Self::joined_reference(t) == name)
            || self
                .joined
                .iter()
                .any(|t| Self::find_by_reference_nested(t, name).is_some())
    }
}
