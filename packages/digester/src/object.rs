//! Object model for digested values.
//!
//! Rules never know the concrete types they build. Every type that can live
//! on the object stack implements [`Bindable`], which hands out a [`Members`]
//! table: a name-keyed dispatch table of property setters and method invokers,
//! built once per type. [`ObjectRef`] pairs a shared, type-erased object with
//! that table so rules can set properties and call methods by name.
//!
//! # Example
//!
//! ```
//! use std::sync::LazyLock;
//! use regelrecht_digester::object::{Bindable, Members, ObjectRef};
//!
//! #[derive(Default)]
//! struct Server {
//!     host: String,
//! }
//!
//! static SERVER_MEMBERS: LazyLock<Members> = LazyLock::new(|| {
//!     Members::builder::<Server>("Server")
//!         .property("host", |server, value| {
//!             server.host = value.to_string();
//!             Ok(())
//!         })
//!         .build()
//! });
//!
//! impl Bindable for Server {
//!     fn members() -> &'static Members {
//!         &SERVER_MEMBERS
//!     }
//! }
//!
//! let server = ObjectRef::new(Server::default());
//! server.set_property("host", "localhost").unwrap();
//! assert_eq!(server.borrow::<Server>().unwrap().host, "localhost");
//! ```

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{DigestError, Result};

type Setter = Box<dyn Fn(&mut dyn Any, &str) -> Result<()> + Send + Sync>;
type Invoker = Box<dyn Fn(&mut dyn Any, &Args) -> Result<()> + Send + Sync>;
type PropertyFallback = Box<dyn Fn(&mut dyn Any, &str, &str) -> Result<()> + Send + Sync>;
type MethodFallback = Box<dyn Fn(&mut dyn Any, &str, &Args) -> Result<()> + Send + Sync>;

/// A type that can be created and populated by digester rules.
pub trait Bindable: Any {
    /// The dispatch table shared by every instance of this type.
    fn members() -> &'static Members;
}

/// Name-keyed dispatch table for one bindable type.
pub struct Members {
    type_name: &'static str,
    properties: HashMap<&'static str, Setter>,
    methods: HashMap<&'static str, Invoker>,
    any_property: Option<PropertyFallback>,
    any_method: Option<MethodFallback>,
}

impl Members {
    /// Start building the table for `T`.
    #[must_use]
    pub fn builder<T: Any>(type_name: &'static str) -> MembersBuilder<T> {
        MembersBuilder {
            members: Members {
                type_name,
                properties: HashMap::new(),
                methods: HashMap::new(),
                any_property: None,
                any_method: None,
            },
            _marker: PhantomData,
        }
    }

    /// Name of the described type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check if a property with this name can be set.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.any_property.is_some() || self.properties.contains_key(name)
    }

    /// Check if a method with this name can be invoked.
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.any_method.is_some() || self.methods.contains_key(name)
    }

    fn set_property(&self, target: &mut dyn Any, name: &str, value: &str) -> Result<()> {
        if let Some(setter) = self.properties.get(name) {
            return setter(target, value);
        }
        match &self.any_property {
            Some(fallback) => fallback(target, name, value),
            None => Err(DigestError::NoSuchProperty {
                type_name: self.type_name.to_string(),
                property: name.to_string(),
            }),
        }
    }

    fn invoke(&self, target: &mut dyn Any, name: &str, args: &Args) -> Result<()> {
        if let Some(invoker) = self.methods.get(name) {
            return invoker(target, args);
        }
        match &self.any_method {
            Some(fallback) => fallback(target, name, args),
            None => Err(DigestError::NoSuchMethod {
                type_name: self.type_name.to_string(),
                method: name.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Members {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut properties: Vec<_> = self.properties.keys().collect();
        properties.sort();
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();

        f.debug_struct("Members")
            .field("type_name", &self.type_name)
            .field("properties", &properties)
            .field("methods", &methods)
            .field("any_property", &self.any_property.is_some())
            .field("any_method", &self.any_method.is_some())
            .finish()
    }
}

/// Builder for a [`Members`] table.
pub struct MembersBuilder<T> {
    members: Members,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> MembersBuilder<T> {
    /// Register a settable property.
    #[must_use]
    pub fn property<F>(mut self, name: &'static str, setter: F) -> Self
    where
        F: Fn(&mut T, &str) -> Result<()> + Send + Sync + 'static,
    {
        let type_name = self.members.type_name;
        self.members.properties.insert(
            name,
            Box::new(move |target: &mut dyn Any, value: &str| -> Result<()> {
                setter(downcast::<T>(target, type_name)?, value)
            }),
        );
        self
    }

    /// Register an invocable method.
    #[must_use]
    pub fn method<F>(mut self, name: &'static str, invoker: F) -> Self
    where
        F: Fn(&mut T, &Args) -> Result<()> + Send + Sync + 'static,
    {
        let type_name = self.members.type_name;
        self.members.methods.insert(
            name,
            Box::new(move |target: &mut dyn Any, args: &Args| -> Result<()> {
                invoker(downcast::<T>(target, type_name)?, args)
            }),
        );
        self
    }

    /// Accept every property name not registered explicitly.
    #[must_use]
    pub fn any_property<F>(mut self, setter: F) -> Self
    where
        F: Fn(&mut T, &str, &str) -> Result<()> + Send + Sync + 'static,
    {
        let type_name = self.members.type_name;
        self.members.any_property = Some(Box::new(
            move |target: &mut dyn Any, name: &str, value: &str| -> Result<()> {
                setter(downcast::<T>(target, type_name)?, name, value)
            },
        ));
        self
    }

    /// Accept every method name not registered explicitly.
    #[must_use]
    pub fn any_method<F>(mut self, invoker: F) -> Self
    where
        F: Fn(&mut T, &str, &Args) -> Result<()> + Send + Sync + 'static,
    {
        let type_name = self.members.type_name;
        self.members.any_method = Some(Box::new(
            move |target: &mut dyn Any, name: &str, args: &Args| -> Result<()> {
                invoker(downcast::<T>(target, type_name)?, name, args)
            },
        ));
        self
    }

    /// Finish the table.
    #[must_use]
    pub fn build(self) -> Members {
        self.members
    }
}

fn downcast<'a, T: Any>(target: &'a mut dyn Any, type_name: &str) -> Result<&'a mut T> {
    target.downcast_mut::<T>().ok_or_else(|| {
        DigestError::protocol(format!(
            "members of \"{type_name}\" dispatched on an object of another type"
        ))
    })
}

/// Shared handle to an object on (or taken from) the object stack.
///
/// Cloning the handle shares the object; equality is identity.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Rc<RefCell<dyn Any>>,
    members: &'static Members,
}

impl ObjectRef {
    /// Wrap a bindable value.
    pub fn new<T: Bindable>(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
            members: T::members(),
        }
    }

    /// Name of the wrapped type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.members.type_name
    }

    /// Dispatch table of the wrapped type.
    #[must_use]
    pub fn members(&self) -> &'static Members {
        self.members
    }

    /// Check if both handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Check if the wrapped object is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.inner
            .try_borrow()
            .map(|inner| inner.is::<T>())
            .unwrap_or(false)
    }

    /// Borrow the object as a `T`.
    ///
    /// Returns `None` if the object is another type or mutably borrowed.
    #[must_use]
    pub fn borrow<T: Any>(&self) -> Option<Ref<'_, T>> {
        let inner = self.inner.try_borrow().ok()?;
        Ref::filter_map(inner, |any| any.downcast_ref::<T>()).ok()
    }

    /// Mutably borrow the object as a `T`.
    #[must_use]
    pub fn borrow_mut<T: Any>(&self) -> Option<RefMut<'_, T>> {
        let inner = self.inner.try_borrow_mut().ok()?;
        RefMut::filter_map(inner, |any| any.downcast_mut::<T>()).ok()
    }

    /// Set a property by name.
    ///
    /// # Errors
    /// `NoSuchProperty` if the type does not expose it, or whatever the setter
    /// returns.
    pub fn set_property(&self, name: &str, value: &str) -> Result<()> {
        let mut target = self.inner.try_borrow_mut().map_err(|_| self.busy())?;
        self.members.set_property(&mut *target, name, value)
    }

    /// Invoke a method by name.
    ///
    /// # Errors
    /// `NoSuchMethod` if the type does not expose it, or whatever the invoker
    /// returns.
    pub fn invoke(&self, name: &str, args: &Args) -> Result<()> {
        let mut target = self.inner.try_borrow_mut().map_err(|_| self.busy())?;
        self.members.invoke(&mut *target, name, args)
    }

    fn busy(&self) -> DigestError {
        DigestError::protocol(format!(
            "object of type \"{}\" is already borrowed",
            self.type_name()
        ))
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:p})", self.type_name(), Rc::as_ptr(&self.inner))
    }
}

/// A converted argument or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Object(ObjectRef),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Object(o) => f.write_str(o.type_name()),
        }
    }
}

/// Arguments of a method invocation, with typed accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    method: String,
    values: Vec<Value>,
}

impl Args {
    /// Create the argument list for a call to `method`.
    pub fn new(method: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            values,
        }
    }

    /// Name of the invoked method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the call has no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All argument values in order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get the argument at `index`.
    ///
    /// # Errors
    /// `Argument` if the call has fewer arguments.
    pub fn get(&self, index: usize) -> Result<&Value> {
        self.values
            .get(index)
            .ok_or_else(|| self.invalid(index, "missing argument"))
    }

    /// Get a string argument.
    pub fn str(&self, index: usize) -> Result<&str> {
        match self.get(index)? {
            Value::Str(s) => Ok(s),
            other => Err(self.invalid(index, &format!("expected string, got {other:?}"))),
        }
    }

    /// Get an integer argument.
    pub fn int(&self, index: usize) -> Result<i64> {
        match self.get(index)? {
            Value::Int(i) => Ok(*i),
            other => Err(self.invalid(index, &format!("expected integer, got {other:?}"))),
        }
    }

    /// Get a float argument. Integers are widened.
    pub fn float(&self, index: usize) -> Result<f64> {
        match self.get(index)? {
            Value::Float(x) => Ok(*x),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Ok(*i as f64),
            other => Err(self.invalid(index, &format!("expected float, got {other:?}"))),
        }
    }

    /// Get a boolean argument.
    pub fn boolean(&self, index: usize) -> Result<bool> {
        match self.get(index)? {
            Value::Bool(b) => Ok(*b),
            other => Err(self.invalid(index, &format!("expected boolean, got {other:?}"))),
        }
    }

    /// Get an object argument.
    pub fn object(&self, index: usize) -> Result<ObjectRef> {
        match self.get(index)? {
            Value::Object(o) => Ok(o.clone()),
            other => Err(self.invalid(index, &format!("expected object, got {other:?}"))),
        }
    }

    fn invalid(&self, index: usize, message: &str) -> DigestError {
        DigestError::Argument {
            member: self.method.clone(),
            index,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method)?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    #[derive(Default)]
    struct Counter {
        label: String,
        total: i64,
        children: Vec<ObjectRef>,
    }

    static COUNTER_MEMBERS: LazyLock<Members> = LazyLock::new(|| {
        Members::builder::<Counter>("Counter")
            .property("label", |counter, value| {
                counter.label = value.to_string();
                Ok(())
            })
            .method("add", |counter, args| {
                counter.total += args.int(0)?;
                Ok(())
            })
            .method("addChild", |counter, args| {
                counter.children.push(args.object(0)?);
                Ok(())
            })
            .build()
    });

    impl Bindable for Counter {
        fn members() -> &'static Members {
            &COUNTER_MEMBERS
        }
    }

    #[test]
    fn test_set_property() {
        let counter = ObjectRef::new(Counter::default());
        counter.set_property("label", "clicks").unwrap();
        assert_eq!(counter.borrow::<Counter>().unwrap().label, "clicks");
    }

    #[test]
    fn test_set_missing_property() {
        let counter = ObjectRef::new(Counter::default());
        let err = counter.set_property("colour", "red").unwrap_err();
        assert!(matches!(err, DigestError::NoSuchProperty { .. }));
    }

    #[test]
    fn test_invoke() {
        let counter = ObjectRef::new(Counter::default());
        counter
            .invoke("add", &Args::new("add", vec![Value::Int(3)]))
            .unwrap();
        counter
            .invoke("add", &Args::new("add", vec![Value::Int(4)]))
            .unwrap();
        assert_eq!(counter.borrow::<Counter>().unwrap().total, 7);
    }

    #[test]
    fn test_invoke_missing_method() {
        let counter = ObjectRef::new(Counter::default());
        let err = counter.invoke("reset", &Args::new("reset", vec![])).unwrap_err();
        assert!(matches!(err, DigestError::NoSuchMethod { .. }));
    }

    #[test]
    fn test_invoke_wrong_argument() {
        let counter = ObjectRef::new(Counter::default());
        let err = counter
            .invoke("add", &Args::new("add", vec![Value::Str("x".to_string())]))
            .unwrap_err();
        assert!(matches!(err, DigestError::Argument { index: 0, .. }));
    }

    #[test]
    fn test_object_argument_is_shared() {
        let parent = ObjectRef::new(Counter::default());
        let child = ObjectRef::new(Counter::default());
        parent
            .invoke("addChild", &Args::new("addChild", vec![Value::Object(child.clone())]))
            .unwrap();

        child.set_property("label", "late").unwrap();
        let parent = parent.borrow::<Counter>().unwrap();
        assert!(parent.children[0].ptr_eq(&child));
        assert_eq!(parent.children[0].borrow::<Counter>().unwrap().label, "late");
    }

    #[test]
    fn test_borrow_wrong_type() {
        let counter = ObjectRef::new(Counter::default());
        assert!(counter.is::<Counter>());
        assert!(!counter.is::<String>());
        assert!(counter.borrow::<String>().is_none());
    }

    #[test]
    fn test_args_display() {
        let args = Args::new("setPort", vec![Value::Int(80), Value::Bool(true)]);
        assert_eq!(args.to_string(), "setPort(80,true)");
    }
}
