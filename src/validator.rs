//! Record validation
//!
//! The parser does not define a rule language of its own. [`Validator`]
//! wraps an external rule-evaluation engine behind a single pass/fail
//! contract: the engine receives a record's field mapping, the configured
//! rule set, and a message resolver, and decides whether the record passes.
//!
//! The message resolver exists only because rule engines typically demand
//! one for user-facing text; this core produces none, so [`EchoResolver`]
//! answers every lookup with the key itself.

use std::collections::HashMap;

use crate::record::Record;

/// Declarative validation rules: field name to rule expressions
///
/// Rule expressions are opaque to the parser and are passed through to the
/// engine unchanged.
pub type RuleSet = HashMap<String, Vec<String>>;

/// Resolves rule keys to human-readable messages
pub trait MessageResolver {
    fn resolve(&self, key: &str) -> String;
}

/// Locale-neutral resolver that echoes keys back as messages
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoResolver;

impl MessageResolver for EchoResolver {
    fn resolve(&self, key: &str) -> String {
        key.to_string()
    }
}

/// External rule-evaluation engine contract
pub trait RuleEngine {
    /// Evaluate a rule set against a field mapping; true means pass
    fn evaluate(
        &self,
        fields: &[(String, String)],
        rules: &RuleSet,
        messages: &dyn MessageResolver,
    ) -> bool;
}

/// Adapter putting a rule engine behind a pass/fail check on records
///
/// Holds the rule set for its lifetime and never mutates the record;
/// flipping the validity flag is the parser's responsibility.
pub struct Validator {
    rules: RuleSet,
    engine: Box<dyn RuleEngine>,
    messages: EchoResolver,
}

impl Validator {
    /// Create a validator from a rule set and an engine
    pub fn new(rules: RuleSet, engine: Box<dyn RuleEngine>) -> Self {
        Self {
            rules,
            engine,
            messages: EchoResolver,
        }
    }

    /// Check a record against the configured rules
    pub fn is_valid(&self, record: &Record) -> bool {
        self.engine
            .evaluate(record.fields(), &self.rules, &self.messages)
    }
}
