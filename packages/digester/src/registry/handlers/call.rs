//! Method call rules.
//!
//! [`CallMethodRule`] invokes a method on a stacked object when its element
//! closes. Arguments come from the element's body text, or from a parameter
//! frame that [`CallParamRule`]s on nested elements fill in:
//!
//! ```text
//! <server>                      CallMethodRule::new("setEndpoint", 2)
//!   <host>example.org</host>    CallParamRule::new(0)
//!   <port>8080</port>           CallParamRule::new(1)
//! </server>
//! ```

use std::cell::RefCell;

use crate::convert::{convert, convert_absent, ScalarKind};
use crate::digester::Digester;
use crate::error::{DigestError, Result};
use crate::object::{Args, Value};
use crate::registry::handler::Rule;
use crate::registry::types::{Attributes, Param};

/// Rule that invokes a named method when its element closes.
pub struct CallMethodRule {
    target_offset: isize,
    method_name: String,
    param_count: usize,
    param_types: Vec<ScalarKind>,
    body_texts: RefCell<Vec<String>>,
}

impl CallMethodRule {
    /// Create a rule calling `method_name` with `param_count` string
    /// parameters on the top object.
    ///
    /// With a count of zero the element's body text is the single argument.
    pub fn new(method_name: impl Into<String>, param_count: usize) -> Self {
        Self {
            target_offset: 0,
            method_name: method_name.into(),
            param_count,
            param_types: vec![ScalarKind::String; param_count.max(1)],
            body_texts: RefCell::new(Vec::new()),
        }
    }

    /// Declare the parameter kinds.
    ///
    /// The call receives exactly one argument per kind, whatever the
    /// parameter count. An empty list together with a parameter count of zero makes the call
    /// take no arguments at all.
    #[must_use]
    pub fn with_param_types(mut self, param_types: Vec<ScalarKind>) -> Self {
        self.param_types = if param_types.is_empty() {
            vec![ScalarKind::String; self.param_count]
        } else {
            param_types
        };
        self
    }

    /// Call the method on another stacked object.
    ///
    /// Zero or positive offsets count down from the top of the stack; negative
    /// offsets count up from the bottom, so `-1` is the root.
    #[must_use]
    pub fn with_target_offset(mut self, target_offset: isize) -> Self {
        self.target_offset = target_offset;
        self
    }

    /// Resolve the raw argument list, `None` when the call is skipped.
    fn collect_params(&self, digester: &mut Digester) -> Result<Option<Vec<Option<Param>>>> {
        if self.param_count > 0 {
            let frame = digester.pop_params().ok_or_else(|| {
                DigestError::protocol(format!(
                    "[CallMethodRule]{} Parameter frame missing for \"{}\"",
                    digester.current_path(),
                    self.method_name
                ))
            })?;
            if self.param_count == 1 && frame.get(0).is_none() {
                return Ok(None);
            }
            return Ok(Some(frame.into_slots()));
        }

        let text = self.body_texts.borrow_mut().pop().unwrap_or_default();
        if self.param_types.is_empty() {
            return Ok(Some(Vec::new()));
        }
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(vec![Some(Param::Text(text))]))
    }

    /// Build one argument per declared type. Slots beyond the declared
    /// types are dropped; unfilled slots take the kind's zero value.
    fn convert_params(&self, params: Vec<Option<Param>>) -> Result<Vec<Value>> {
        let mut params = params.into_iter();
        self.param_types
            .iter()
            .map(|&kind| match params.next().flatten() {
                Some(Param::Text(text)) => convert(&text, kind),
                Some(Param::Object(object)) => Ok(Value::Object(object)),
                None => Ok(convert_absent(kind)),
            })
            .collect()
    }
}

impl Rule for CallMethodRule {
    fn begin(&self, digester: &mut Digester, _attributes: &Attributes) -> Result<()> {
        if self.param_count > 0 {
            digester.push_params(self.param_count);
        }
        Ok(())
    }

    fn body(&self, _digester: &mut Digester, text: &str) -> Result<()> {
        if self.param_count == 0 {
            self.body_texts.borrow_mut().push(text.trim().to_string());
        }
        Ok(())
    }

    fn end(&self, digester: &mut Digester) -> Result<()> {
        let Some(params) = self.collect_params(digester)? else {
            tracing::debug!(
                path = %digester.current_path(),
                method = %self.method_name,
                "Skipping call without parameters"
            );
            return Ok(());
        };
        let values = self.convert_params(params)?;

        let target = if self.target_offset >= 0 {
            digester.peek(self.target_offset.unsigned_abs())
        } else {
            (digester.count() as isize)
                .checked_add(self.target_offset)
                .and_then(|index| usize::try_from(index).ok())
                .and_then(|index| digester.peek(index))
        };
        let Some(target) = target else {
            return Err(DigestError::protocol(format!(
                "[CallMethodRule]{} Call target is null (targetOffset={}, stackdepth={})",
                digester.current_path(),
                self.target_offset,
                digester.count()
            )));
        };

        if !target.members().has_method(&self.method_name) {
            return Err(DigestError::NoSuchMethod {
                type_name: target.type_name().to_string(),
                method: self.method_name.clone(),
            });
        }

        let args = Args::new(&self.method_name, values);
        tracing::debug!(
            path = %digester.current_path(),
            class = %target.type_name(),
            call = %args,
            "Calling method"
        );
        target.invoke(&self.method_name, &args)
    }

    fn clear(&self) {
        self.body_texts.borrow_mut().clear();
    }

    fn describe(&self) -> String {
        let types: Vec<&str> = self.param_types.iter().map(ScalarKind::as_str).collect();
        format!(
            "CallMethodRule[methodName={}, paramCount={}, paramTypes={{{}}}]",
            self.method_name,
            self.param_count,
            types.join(", ")
        )
    }
}

/// Where a [`CallParamRule`] takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParamSource {
    Body,
    Attribute(String),
    Stack(usize),
}

/// Rule that fills one slot of the enclosing call's parameter frame.
pub struct CallParamRule {
    param_index: usize,
    source: ParamSource,
    body_texts: RefCell<Vec<String>>,
}

impl CallParamRule {
    /// Fill slot `param_index` with the element's body text.
    #[must_use]
    pub fn new(param_index: usize) -> Self {
        Self::with_source(param_index, ParamSource::Body)
    }

    /// Fill slot `param_index` with the value of an attribute.
    pub fn from_attribute(param_index: usize, attribute_name: impl Into<String>) -> Self {
        Self::with_source(param_index, ParamSource::Attribute(attribute_name.into()))
    }

    /// Fill slot `param_index` with the object `stack_index` entries below
    /// the top of the object stack.
    #[must_use]
    pub fn from_stack(param_index: usize, stack_index: usize) -> Self {
        Self::with_source(param_index, ParamSource::Stack(stack_index))
    }

    fn with_source(param_index: usize, source: ParamSource) -> Self {
        Self {
            param_index,
            source,
            body_texts: RefCell::new(Vec::new()),
        }
    }

    fn store(&self, digester: &mut Digester, param: Param) -> Result<()> {
        let path = digester.current_path().to_string();
        let frame = digester.peek_params(0).ok_or_else(|| {
            DigestError::protocol(format!(
                "[CallParamRule]{path} No parameter frame for index {}",
                self.param_index
            ))
        })?;
        tracing::debug!(path = %path, index = self.param_index, value = %param, "Setting parameter");
        frame.set(self.param_index, param)
    }
}

impl Rule for CallParamRule {
    fn begin(&self, digester: &mut Digester, attributes: &Attributes) -> Result<()> {
        let param = match &self.source {
            ParamSource::Body => return Ok(()),
            ParamSource::Attribute(name) => match attributes.get(name) {
                Some(value) => Param::Text(value.to_string()),
                None => return Ok(()),
            },
            ParamSource::Stack(index) => match digester.peek(*index) {
                Some(object) => Param::Object(object),
                None => return Ok(()),
            },
        };
        self.store(digester, param)
    }

    fn body(&self, _digester: &mut Digester, text: &str) -> Result<()> {
        if self.source == ParamSource::Body {
            self.body_texts.borrow_mut().push(text.trim().to_string());
        }
        Ok(())
    }

    fn end(&self, digester: &mut Digester) -> Result<()> {
        if self.source != ParamSource::Body {
            return Ok(());
        }
        let text = self.body_texts.borrow_mut().pop().unwrap_or_default();
        self.store(digester, Param::Text(text))
    }

    fn clear(&self) {
        self.body_texts.borrow_mut().clear();
    }

    fn describe(&self) -> String {
        match &self.source {
            ParamSource::Body => format!("CallParamRule[paramIndex={}]", self.param_index),
            ParamSource::Attribute(name) => format!(
                "CallParamRule[paramIndex={}, attributeName={}]",
                self.param_index, name
            ),
            ParamSource::Stack(index) => format!(
                "CallParamRule[paramIndex={}, stackIndex={}]",
                self.param_index, index
            ),
        }
    }
}
