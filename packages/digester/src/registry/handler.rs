//! Rule trait definition.

use crate::digester::Digester;
use crate::error::Result;

use super::types::Attributes;

/// Trait for rules bound to a pattern.
///
/// The digester calls `begin` when a matching element opens, `body` with the
/// element's collected text when it closes, then `end` (in reverse
/// registration order), and `finish` once after the whole document.
///
/// Rules receive the digester on every call instead of holding a reference
/// to it, and may be registered under several patterns. State that lives for
/// one matched element belongs on the digester's stacks; state a rule must
/// keep itself has to survive nested matches of the same pattern.
pub trait Rule {
    /// Called when a matching element opens.
    fn begin(&self, _digester: &mut Digester, _attributes: &Attributes) -> Result<()> {
        Ok(())
    }

    /// Called with the trimmed body text of a matching element.
    fn body(&self, _digester: &mut Digester, _text: &str) -> Result<()> {
        Ok(())
    }

    /// Called when a matching element closes, after `body`.
    fn end(&self, _digester: &mut Digester) -> Result<()> {
        Ok(())
    }

    /// Called once after the whole document has been processed.
    fn finish(&self, _digester: &mut Digester) -> Result<()> {
        Ok(())
    }

    /// Drop state left behind by an aborted parse.
    fn clear(&self) {}

    /// Short description used in diagnostics and errors.
    fn describe(&self) -> String {
        let name = std::any::type_name::<Self>();
        format!("{}[]", name.rsplit("::").next().unwrap_or(name))
    }
}

/// A reusable bundle of rule registrations.
pub trait RuleSet {
    /// Register this set's rules on `digester`.
    fn add_rule_instances(&self, digester: &mut Digester) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl Rule for Silent {}

    #[test]
    fn test_default_hooks_do_nothing() {
        let mut digester = Digester::new();
        let rule = Silent;

        assert!(rule.begin(&mut digester, &Attributes::new()).is_ok());
        assert!(rule.body(&mut digester, "text").is_ok());
        assert!(rule.end(&mut digester).is_ok());
        assert!(rule.finish(&mut digester).is_ok());
        assert_eq!(digester.count(), 0);
    }

    #[test]
    fn test_default_describe() {
        assert_eq!(Silent.describe(), "Silent[]");
    }
}
