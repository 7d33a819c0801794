//! Intent to action dispatch

use std::collections::HashMap;

use axum::body::Bytes;
use futures::future::{BoxFuture, FutureExt};

use super::response::ClassificationResponse;
use super::schema::Intent;
use crate::Result;
use crate::actions::Actions;

/// Everything a handler may need about the triggering request
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub audio: Bytes,
    pub transcription: String,
    pub intent: Intent,
    pub response: Option<ClassificationResponse>,
}

impl DispatchContext {
    /// Bundle a classified request; the intent is taken from `response`
    #[must_use]
    pub fn new(audio: Bytes, transcription: String, response: ClassificationResponse) -> Self {
        Self {
            audio,
            transcription,
            intent: response.intent(),
            response: Some(response),
        }
    }
}

/// One-shot handler future
pub type HandlerFuture<'a> = BoxFuture<'a, Result<()>>;

/// One-shot handler bound to a single request
pub type Handler<'a> = Box<dyn FnOnce() -> HandlerFuture<'a> + Send + 'a>;

/// Per-request mapping from intent to handler
pub struct HandlerRegistry<'a> {
    handlers: HashMap<Intent, Handler<'a>>,
}

impl Default for HandlerRegistry<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> HandlerRegistry<'a> {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry covering every intent, bound to `ctx` and `actions`
    #[must_use]
    pub fn for_context(ctx: &'a DispatchContext, actions: &'a dyn Actions) -> Self {
        let mut registry = Self::new();
        for intent in Intent::ALL {
            match intent {
                Intent::LightsOn => registry.register(intent, move || actions.lights_on()),
                Intent::LightsOff => registry.register(intent, move || actions.lights_off()),
                Intent::SetAlarm => registry.register(intent, move || actions.set_alarm()),
                Intent::CheckWeather => registry.register(intent, move || actions.check_weather()),
                Intent::Talk => registry.register(intent, move || actions.talk(&ctx.transcription)),
                Intent::NotForMe => registry.register(intent, move || actions.not_for_me()),
                Intent::Unknown => registry.register(intent, move || actions.unknown()),
            }
        }
        registry
    }

    /// Register `handler` for `intent`, replacing any previous one
    pub fn register<F, Fut>(&mut self, intent: Intent, handler: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<()>> + Send + 'a,
    {
        self.handlers
            .insert(intent, Box::new(move || handler().boxed()));
    }

    /// Whether a handler is registered for `intent`
    #[must_use]
    pub fn contains(&self, intent: Intent) -> bool {
        self.handlers.contains_key(&intent)
    }

    /// Number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `intent`
    ///
    /// Handler failures are logged and swallowed. Returns whether a handler ran.
    pub async fn invoke(mut self, intent: Intent) -> bool {
        let Some(handler) = self.handlers.remove(&intent) else {
            tracing::warn!(%intent, "unknown intent, no handler registered");
            return false;
        };

        tracing::debug!(%intent, "invoking intent handler");
        if let Err(e) = handler().await {
            tracing::error!(%intent, error = %e, "intent handler failed");
        }
        true
    }
}

/// Route `ctx` to the handler for its intent
///
/// Always completes; the registry is total over [`Intent::ALL`].
pub async fn dispatch(ctx: &DispatchContext, actions: &dyn Actions) {
    HandlerRegistry::for_context(ctx, actions)
        .invoke(ctx.intent)
        .await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::Error;

    /// Records how often each action ran
    #[derive(Default)]
    struct CountingActions {
        counts: [AtomicUsize; 7],
        talked: std::sync::Mutex<Vec<String>>,
    }

    impl CountingActions {
        fn bump(&self, intent: Intent) {
            let index = Intent::ALL.iter().position(|i| *i == intent).unwrap();
            self.counts[index].fetch_add(1, Ordering::SeqCst);
        }

        fn count(&self, intent: Intent) -> usize {
            let index = Intent::ALL.iter().position(|i| *i == intent).unwrap();
            self.counts[index].load(Ordering::SeqCst)
        }

        fn total(&self) -> usize {
            self.counts.iter().map(|c| c.load(Ordering::SeqCst)).sum()
        }
    }

    #[async_trait]
    impl Actions for CountingActions {
        async fn lights_on(&self) -> Result<()> {
            self.bump(Intent::LightsOn);
            Ok(())
        }

        async fn lights_off(&self) -> Result<()> {
            self.bump(Intent::LightsOff);
            Ok(())
        }

        async fn set_alarm(&self) -> Result<()> {
            self.bump(Intent::SetAlarm);
            Ok(())
        }

        async fn check_weather(&self) -> Result<()> {
            self.bump(Intent::CheckWeather);
            Err(Error::Config("weather service unavailable".to_string()))
        }

        async fn talk(&self, transcription: &str) -> Result<()> {
            self.bump(Intent::Talk);
            self.talked.lock().unwrap().push(transcription.to_string());
            Ok(())
        }

        async fn not_for_me(&self) -> Result<()> {
            self.bump(Intent::NotForMe);
            Ok(())
        }

        async fn unknown(&self) -> Result<()> {
            self.bump(Intent::Unknown);
            Ok(())
        }
    }

    fn context(intent: Intent, transcription: &str) -> DispatchContext {
        DispatchContext {
            audio: Bytes::from_static(b"RIFF"),
            transcription: transcription.to_string(),
            intent,
            response: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_is_total() {
        for intent in Intent::ALL {
            let actions = CountingActions::default();
            dispatch(&context(intent, "hello"), &actions).await;

            assert_eq!(actions.count(intent), 1, "{intent} handler not invoked once");
            assert_eq!(actions.total(), 1, "{intent} invoked other handlers");
        }
    }

    #[tokio::test]
    async fn test_registry_covers_every_intent() {
        let actions = CountingActions::default();
        let ctx = context(Intent::Unknown, "");
        let registry = HandlerRegistry::for_context(&ctx, &actions);

        assert_eq!(registry.len(), Intent::ALL.len());
        for intent in Intent::ALL {
            assert!(registry.contains(intent));
        }
    }

    #[tokio::test]
    async fn test_talk_receives_transcription() {
        let actions = CountingActions::default();
        dispatch(&context(Intent::Talk, "how are you today"), &actions).await;

        assert_eq!(*actions.talked.lock().unwrap(), vec!["how are you today"]);
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_propagate() {
        let actions = CountingActions::default();
        dispatch(&context(Intent::CheckWeather, "weather?"), &actions).await;

        assert_eq!(actions.count(Intent::CheckWeather), 1);
    }

    #[tokio::test]
    async fn test_missing_handler_is_noop() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(!registry.invoke(Intent::LightsOn).await);
    }

    #[tokio::test]
    async fn test_register_custom_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();

        let counter = calls.clone();
        registry.register(Intent::SetAlarm, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert!(registry.invoke(Intent::SetAlarm).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_register_overrides_table_entry() {
        let actions = CountingActions::default();
        let ctx = context(Intent::LightsOn, "lights on");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut registry = HandlerRegistry::for_context(&ctx, &actions);
        let counter = calls.clone();
        registry.register(Intent::LightsOn, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(registry.len(), Intent::ALL.len());
        assert!(registry.invoke(ctx.intent).await);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(actions.total(), 0);
    }
}
