//! Subscribers and the arguments they are called with.

use core::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Error type subscribers return.
pub type HandlerError = Box<dyn core::error::Error + Send + Sync>;

type Handler = dyn Fn(&Call) -> Result<Value, HandlerError> + Send + Sync;

// ─────────────────────────────────────────────────────────────────────────────
// Call
// ─────────────────────────────────────────────────────────────────────────────

/// Positional and keyword arguments passed to a subscriber.
///
/// ```
/// use plexus_events::Call;
/// use serde_json::json;
///
/// let call = Call::new().arg("alice").arg(3).kwarg("verbose", true);
/// assert_eq!(call.arg_at(1), Some(&json!(3)));
/// assert_eq!(call.kwarg_value("verbose"), Some(&json!(true)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Call {
    args: Vec<Value>,
    kwargs: Map<String, Value>,
}

impl Call {
    /// Creates a call with no arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a call from positional arguments.
    pub fn from_args<I, V>(args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            kwargs: Map::new(),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Returns the positional arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Returns the keyword arguments.
    #[must_use]
    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    /// Returns the positional argument at `index`.
    #[must_use]
    pub fn arg_at(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Returns a keyword argument.
    #[must_use]
    pub fn kwarg_value(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriber
// ─────────────────────────────────────────────────────────────────────────────

/// A shared callable bound to events.
///
/// Clones share the handler. Two subscribers are equal when they share a
/// handler; the name is only used for logging.
#[derive(Clone)]
pub struct Subscriber {
    name: Arc<str>,
    handler: Arc<Handler>,
}

impl Subscriber {
    /// Creates a subscriber from a fallible handler.
    pub fn new<F>(name: impl Into<Arc<str>>, handler: F) -> Self
    where
        F: Fn(&Call) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    /// Creates a subscriber from a handler that cannot fail.
    pub fn from_fn<F, R>(name: impl Into<Arc<str>>, handler: F) -> Self
    where
        F: Fn(&Call) -> R + Send + Sync + 'static,
        R: Into<Value>,
    {
        Self::new(name, move |call: &Call| Ok(handler(call).into()))
    }

    /// Returns the subscriber's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the handler.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub fn call(&self, call: &Call) -> Result<Value, HandlerError> {
        (self.handler)(call)
    }

    /// Returns `true` if both subscribers share a handler.
    #[must_use]
    pub fn ptr_eq(&self, other: &Subscriber) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Subscriber").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_follows_the_handler() {
        let a = Subscriber::from_fn("a", |_: &Call| 1);
        let same = a.clone();
        let lookalike = Subscriber::from_fn("a", |_: &Call| 1);

        assert_eq!(a, same);
        assert_ne!(a, lookalike);
    }

    #[test]
    fn call_passes_arguments() {
        let sum = Subscriber::from_fn("sum", |call: &Call| {
            call.args().iter().filter_map(Value::as_i64).sum::<i64>()
        });
        let result = sum.call(&Call::from_args([1, 2, 3])).unwrap();
        assert_eq!(result, json!(6));
    }

    #[test]
    fn handler_errors_surface() {
        let failing = Subscriber::new("failing", |_: &Call| Err("boom".into()));
        let err = failing.call(&Call::new()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
