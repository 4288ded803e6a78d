//! Registry of locally served methods

use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by a handler; `None` or `null` sends no response
pub type HandlerFuture = Pin<Box<dyn Future<Output = Option<Value>> + Send>>;

/// A locally registered method
pub type Handler = Arc<dyn Fn(Vec<Value>) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a `Handler`
pub fn async_handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Value>> + Send + 'static,
{
    Arc::new(move |args| Box::pin(f(args)) as HandlerFuture)
}

/// Wrap a synchronous closure as a `Handler`
pub fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(Vec<Value>) -> Option<Value> + Send + Sync + 'static,
{
    Arc::new(move |args| {
        let result = f(args);
        Box::pin(async move { result }) as HandlerFuture
    })
}

/// Method name → handler, one handler per method
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handler, returning the one it replaced
    pub fn insert(&self, method: &str, handler: Handler) -> Option<Handler> {
        self.handlers.insert(method.to_string(), handler)
    }

    /// Get the current handler for a method
    pub fn get(&self, method: &str) -> Option<Handler> {
        self.handlers.get(method).map(|entry| entry.value().clone())
    }

    /// Remove a method's handler
    pub fn remove(&self, method: &str) -> Option<Handler> {
        self.handlers.remove(method).map(|(_, handler)| handler)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        methods.sort();
        methods
    }

    /// Number of registered methods
    pub fn count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replace_returns_previous() {
        let registry = HandlerRegistry::new();
        assert!(registry.insert("open", sync_handler(|_| Some(json!(1)))).is_none());
        let previous = registry.insert("open", sync_handler(|_| Some(json!(2))));

        let previous = previous.expect("first handler returned");
        assert_eq!(previous(vec![]).await, Some(json!(1)));

        let current = registry.get("open").unwrap();
        assert_eq!(current(vec![]).await, Some(json!(2)));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_async_handler_receives_args() {
        let handler = async_handler(|args: Vec<Value>| async move {
            tokio::task::yield_now().await;
            Some(Value::from(args.len()))
        });
        assert_eq!(handler(vec![json!(1), json!(2)]).await, Some(json!(2)));
    }

    #[test]
    fn test_methods_sorted() {
        let registry = HandlerRegistry::new();
        registry.insert("state", sync_handler(|_| None));
        registry.insert("close", sync_handler(|_| None));
        registry.insert("open", sync_handler(|_| None));
        assert_eq!(registry.methods(), vec!["close", "open", "state"]);

        assert!(registry.remove("open").is_some());
        assert!(!registry.contains("open"));
    }
}
