//! The digester: drives rules from XML events and owns all parse state.

use std::io::Read;
use std::path::Path;
use std::rc::Rc;

use crate::config::DigesterConfig;
use crate::convert::ScalarKind;
use crate::error::{DigestError, Result};
use crate::loader::TypeRegistry;
use crate::object::{Bindable, ObjectRef};
use crate::registry::handlers::{
    CallMethodRule, CallParamRule, FactoryCreateRule, ObjectCreateRule, ObjectCreationFactory,
    SetNextRule, SetPropertiesRule, SetPropertyRule,
};
use crate::registry::{
    Attributes, BodyTextStack, MatchTracker, ObjectStack, ParamFrame, ParamStack, Rule, RuleSet,
    Rules,
};
use crate::xml::{self, ContentHandler};

/// Event-driven object graph builder.
///
/// Register rules against nesting patterns, then parse a document. Every
/// element whose path matches a pattern fires that pattern's rules: `begin`
/// when it opens, `body` and `end` when it closes. The first object pushed
/// onto the empty object stack becomes the root and is returned by the parse.
///
/// # Example
///
/// ```
/// use regelrecht_digester::{Digester, Record};
///
/// let mut digester = Digester::new();
/// digester.add_object_create("config", "Record", None).unwrap();
/// digester.add_set_properties("config").unwrap();
///
/// let root = digester.parse_str(r#"<config name="demo"/>"#).unwrap().unwrap();
/// assert_eq!(root.borrow::<Record>().unwrap().get("name"), Some("demo"));
/// ```
#[derive(Debug, Default)]
pub struct Digester {
    config: DigesterConfig,
    rules: Rules,
    types: TypeRegistry,
    matcher: MatchTracker,
    stack: ObjectStack,
    params: ParamStack,
    body: BodyTextStack,
}

impl Digester {
    /// Create a digester with the default configuration and type registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a digester with a custom configuration.
    #[must_use]
    pub fn with_config(config: DigesterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &DigesterConfig {
        &self.config
    }

    /// Report element and attribute names in upper case.
    pub fn set_case_folding(&mut self, case_folding: bool) {
        self.config.case_folding = case_folding;
    }

    // --- Rules ---

    /// Registered rules.
    #[must_use]
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    /// Registered rules, for direct registration.
    pub fn rules_mut(&mut self) -> &mut Rules {
        &mut self.rules
    }

    /// Replace the rule registry. Its rules are dispatched by this digester
    /// from now on.
    pub fn set_rules(&mut self, rules: Rules) {
        self.rules = rules;
    }

    /// Types available to object-create rules.
    #[must_use]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Types available to object-create rules, for registration.
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Make `T` available to object-create rules under `name`.
    ///
    /// # Errors
    /// `IllegalClassName` if `name` is not a valid type name.
    pub fn register_type<T: Bindable + Default>(&mut self, name: &str) -> Result<()> {
        self.types.register::<T>(name)
    }

    /// Register a rule for a pattern.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_rule(&mut self, pattern: &str, rule: impl Rule + 'static) -> Result<()> {
        self.rules.add(pattern, Rc::new(rule))
    }

    /// Register one rule instance under a pattern; the same instance may be
    /// registered under several.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_shared_rule(&mut self, pattern: &str, rule: Rc<dyn Rule>) -> Result<()> {
        self.rules.add(pattern, rule)
    }

    /// Create an object of type `class_name` (or the type named by
    /// `attribute_name`, when present) for every matching element.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_object_create(
        &mut self,
        pattern: &str,
        class_name: &str,
        attribute_name: Option<&str>,
    ) -> Result<()> {
        let rule = ObjectCreateRule::new(class_name);
        match attribute_name {
            Some(attribute) => self.add_rule(pattern, rule.with_attribute(attribute)),
            None => self.add_rule(pattern, rule),
        }
    }

    /// Create objects through a factory for every matching element.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_factory_create(
        &mut self,
        pattern: &str,
        factory: impl ObjectCreationFactory + 'static,
    ) -> Result<()> {
        self.add_rule(pattern, FactoryCreateRule::new(factory))
    }

    /// Set one property on the top object from a name/value attribute pair.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_set_property(&mut self, pattern: &str, name: &str, value: &str) -> Result<()> {
        self.add_rule(pattern, SetPropertyRule::new(name, value))
    }

    /// Copy every attribute onto the property of the same name.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_set_properties(&mut self, pattern: &str) -> Result<()> {
        let rule = SetPropertiesRule::new()
            .with_ignore_missing_property(self.config.ignore_missing_property);
        self.add_rule(pattern, rule)
    }

    /// Copy attributes onto properties, renaming `attribute_names[i]` to
    /// `property_names[i]`.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_set_properties_with(
        &mut self,
        pattern: &str,
        attribute_names: &[&str],
        property_names: &[&str],
    ) -> Result<()> {
        let rule = SetPropertiesRule::with_mapping(
            attribute_names.iter().copied(),
            property_names.iter().copied(),
        )
        .with_ignore_missing_property(self.config.ignore_missing_property);
        self.add_rule(pattern, rule)
    }

    /// Pass the top object to `method_name` on its parent.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_set_next(&mut self, pattern: &str, method_name: &str) -> Result<()> {
        self.add_rule(pattern, SetNextRule::new(method_name))
    }

    /// Call `method_name` on the top object with `param_count` string
    /// parameters, or with the body text when the count is zero.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_call_method(
        &mut self,
        pattern: &str,
        method_name: &str,
        param_count: usize,
    ) -> Result<()> {
        self.add_rule(pattern, CallMethodRule::new(method_name, param_count))
    }

    /// Like [`Digester::add_call_method`] with explicit parameter kinds.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_call_method_with_types(
        &mut self,
        pattern: &str,
        method_name: &str,
        param_count: usize,
        param_types: &[ScalarKind],
    ) -> Result<()> {
        let rule =
            CallMethodRule::new(method_name, param_count).with_param_types(param_types.to_vec());
        self.add_rule(pattern, rule)
    }

    /// Fill parameter `param_index` of the enclosing call with the body text.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_call_param(&mut self, pattern: &str, param_index: usize) -> Result<()> {
        self.add_rule(pattern, CallParamRule::new(param_index))
    }

    /// Fill parameter `param_index` of the enclosing call with an attribute.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_call_param_attribute(
        &mut self,
        pattern: &str,
        param_index: usize,
        attribute_name: &str,
    ) -> Result<()> {
        self.add_rule(
            pattern,
            CallParamRule::from_attribute(param_index, attribute_name),
        )
    }

    /// Fill parameter `param_index` of the enclosing call with a stacked
    /// object.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add_call_param_from_stack(
        &mut self,
        pattern: &str,
        param_index: usize,
        stack_index: usize,
    ) -> Result<()> {
        self.add_rule(pattern, CallParamRule::from_stack(param_index, stack_index))
    }

    /// Register every rule of a rule set.
    ///
    /// # Errors
    /// Whatever the rule set reports.
    pub fn add_rule_set(&mut self, rule_set: &dyn RuleSet) -> Result<()> {
        rule_set.add_rule_instances(self)
    }

    // --- Object stack ---

    /// Push an object. On an empty stack it becomes the root.
    pub fn push(&mut self, object: ObjectRef) {
        self.stack.push(object);
    }

    /// Pop the top object.
    pub fn pop(&mut self) -> Option<ObjectRef> {
        let popped = self.stack.pop();
        if popped.is_none() {
            tracing::warn!(path = %self.matcher.path(), "Empty stack (returning None)");
        }
        popped
    }

    /// Return the `n`-th object from the top (0 is the top).
    #[must_use]
    pub fn peek(&self, n: usize) -> Option<ObjectRef> {
        let object = self.stack.peek(n).cloned();
        if object.is_none() {
            tracing::warn!(
                path = %self.matcher.path(),
                index = n,
                count = self.stack.count(),
                "Stack underflow (returning None)"
            );
        }
        object
    }

    /// Number of objects on the stack.
    #[must_use]
    pub fn count(&self) -> usize {
        self.stack.count()
    }

    /// The first object pushed since the stack was last empty.
    #[must_use]
    pub fn root(&self) -> Option<ObjectRef> {
        self.stack.root().cloned()
    }

    // --- Parameter stack ---

    /// Push a parameter frame of `size` empty slots.
    pub fn push_params(&mut self, size: usize) {
        self.params.push(size);
    }

    /// Return the `n`-th parameter frame from the top for writing.
    pub fn peek_params(&mut self, n: usize) -> Option<&mut ParamFrame> {
        self.params.peek(n)
    }

    /// Pop the top parameter frame.
    pub fn pop_params(&mut self) -> Option<ParamFrame> {
        self.params.pop()
    }

    // --- Match state ---

    /// Slash-joined names of the currently open elements.
    #[must_use]
    pub fn current_path(&self) -> &str {
        self.matcher.path()
    }

    /// Number of currently open elements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.matcher.depth()
    }

    /// Reset all parse state so the digester can process another document.
    ///
    /// Rules, types and the root survive; each rule drops its own pending
    /// state.
    pub fn clear(&mut self) {
        for rule in self.rules.rules() {
            rule.clear();
        }
        self.matcher.clear();
        self.body.clear();
        self.stack.clear();
        self.params.clear();
    }

    // --- Parsing ---

    /// Parse a document held in memory and return the root object.
    ///
    /// # Errors
    /// `Xml` for malformed documents, `Rule` when a rule fails.
    pub fn parse_str(&mut self, document: &str) -> Result<Option<ObjectRef>> {
        let case_folding = self.config.case_folding;
        xml::drive(document, self, case_folding)?;
        self.finish()?;
        Ok(self.root())
    }

    /// Read and parse a document file.
    ///
    /// # Errors
    /// `Io` if the file cannot be read, otherwise as [`Digester::parse_str`].
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<Option<ObjectRef>> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Parsing document");
        let document = std::fs::read_to_string(path).map_err(|source| DigestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_str(&document)
    }

    /// Read a whole stream and parse it.
    ///
    /// # Errors
    /// `Read` if the stream fails, otherwise as [`Digester::parse_str`].
    pub fn parse_reader(&mut self, mut reader: impl Read) -> Result<Option<ObjectRef>> {
        let mut document = String::new();
        reader.read_to_string(&mut document)?;
        self.parse_str(&document)
    }

    /// Run every rule's `finish` hook in registration order.
    fn finish(&mut self) -> Result<()> {
        let rules = self.rules.rules().to_vec();
        for rule in &rules {
            rule.finish(self)
                .map_err(|err| self.rule_failed(rule.as_ref(), "finish", err))?;
        }
        Ok(())
    }

    fn rule_failed(
        &self,
        rule: &dyn Rule,
        phase: &'static str,
        source: DigestError,
    ) -> DigestError {
        let err = DigestError::Rule {
            rule: rule.describe(),
            phase,
            path: self.matcher.path().to_string(),
            source: Box::new(source),
        };
        tracing::error!(error = %err, "Rule failed");
        err
    }
}

impl ContentHandler for Digester {
    fn start_element(&mut self, name: &str, attributes: &Attributes) -> Result<()> {
        self.body.open();
        self.matcher.push(name);
        tracing::debug!(path = %self.matcher.path(), depth = self.matcher.depth(), "Element open");

        let matched = self.rules.matches(self.matcher.path()).to_vec();
        for rule in &matched {
            tracing::debug!(rule = %rule.describe(), "Fire begin()");
            rule.begin(self, attributes)
                .map_err(|err| self.rule_failed(rule.as_ref(), "begin", err))?;
        }
        Ok(())
    }

    fn characters(&mut self, chunk: &str) -> Result<()> {
        self.body.append(chunk.trim());
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        tracing::debug!(path = %self.matcher.path(), element = %name, "Element close");

        let matched = self.rules.matches(self.matcher.path()).to_vec();
        let text = self.body.current().to_string();
        for rule in &matched {
            tracing::debug!(rule = %rule.describe(), "Fire body()");
            rule.body(self, &text)
                .map_err(|err| self.rule_failed(rule.as_ref(), "body", err))?;
        }

        self.body.close();

        for rule in matched.iter().rev() {
            tracing::debug!(rule = %rule.describe(), "Fire end()");
            rule.end(self)
                .map_err(|err| self.rule_failed(rule.as_ref(), "end", err))?;
        }

        self.matcher.pop();
        Ok(())
    }
}
