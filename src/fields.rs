//! Alias-aware field lookup over a tokenized block.

use crate::block::Line;
use crate::hexnorm;
use crate::standards::FieldAliases;

pub struct FieldExtractor<'s> {
    aliases: &'s FieldAliases,
}

impl<'s> FieldExtractor<'s> {
    pub fn new(aliases: &'s FieldAliases) -> Self {
        Self { aliases }
    }

    /// Value of the first line keyed by any alias of `logical`, tried in alias order,
    /// passed through the hex normalizer. Empty values count as absent.
    pub fn flat(&self, lines: &[Line<'_>], logical: &str) -> Option<String> {
        for alias in self.aliases.resolve(logical) {
            if let Some(value) = lines.iter().find(|l| l.key_is(alias)).and_then(|l| l.value) {
                let normalized = hexnorm::normalize(value);
                if !normalized.is_empty() {
                    return Some(normalized);
                }
            }
        }
        None
    }

    /// `child = value` on or after the first line named `parent`; also accepts the
    /// dotted `parent.child = value` spelling.
    pub fn nested(&self, lines: &[Line<'_>], parent: &str, child: &str) -> Option<String> {
        let start = lines.iter().position(|l| l.is_named(parent))?;
        let dotted = format!("{}.{}", parent, child);
        lines[start..]
            .iter()
            .find(|l| l.key_is(child) || l.key_is(&dotted))
            .and_then(|l| l.value)
            .map(str::to_string)
            .filter(|v| !v.is_empty())
    }

    /// `callId.main`, then `contentIdentifier.main`, then the flat `callId` aliases.
    pub fn call_id(&self, lines: &[Line<'_>]) -> Option<String> {
        self.nested(lines, "callId", "main")
            .or_else(|| self.nested(lines, "contentIdentifier", "main"))
            .or_else(|| self.flat(lines, "callId"))
    }

    pub fn aliases(&self) -> &'s FieldAliases {
        self.aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::tokenize;
    use crate::standards::Standards;

    #[test]
    fn test_flat_alias_order() {
        let table = Standards::default();
        let fx = FieldExtractor::new(&table.aliases);
        let lines = tokenize("call-ID = second\ncallID = first-by-alias-order", 1);
        assert_eq!(fx.flat(&lines, "callId").as_deref(), Some("first-by-alias-order"));
    }

    #[test]
    fn test_flat_is_hex_normalized() {
        let table = Standards::default();
        let fx = FieldExtractor::new(&table.aliases);
        let lines = tokenize("caseId = 434153452d3031", 1);
        assert_eq!(fx.flat(&lines, "caseId").as_deref(), Some("CASE-01"));
    }

    #[test]
    fn test_flat_unknown_logical_uses_own_name() {
        let standards = Standards::empty();
        let fx = FieldExtractor::new(&standards.aliases);
        let lines = tokenize("timestamp = 2025-01-15T14:30:00Z", 1);
        assert_eq!(fx.flat(&lines, "timestamp").as_deref(), Some("2025-01-15T14:30:00Z"));
        assert_eq!(fx.flat(&lines, "caseId"), None);
    }

    #[test]
    fn test_call_id_resolution_order() {
        let table = Standards::default();
        let fx = FieldExtractor::new(&table.aliases);

        let nested = tokenize("callId = flat\ncallId\n  main = 003A1486D04F061E", 1);
        assert_eq!(fx.call_id(&nested).as_deref(), Some("003A1486D04F061E"));

        let content = tokenize("contentIdentifier\n  main = CC-7\ncallId = flat", 1);
        assert_eq!(fx.call_id(&content).as_deref(), Some("CC-7"));

        let dotted = tokenize("callId.main = DOT-1", 1);
        assert_eq!(fx.call_id(&dotted).as_deref(), Some("DOT-1"));

        let flat = tokenize("callID = only-flat", 1);
        assert_eq!(fx.call_id(&flat).as_deref(), Some("only-flat"));

        assert_eq!(fx.call_id(&tokenize("nothing = here", 1)), None);
    }
}
