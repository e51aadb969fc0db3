use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::wire::{Interest, Name, SignedData};

/// Produces replies for interests under a registered prefix
#[async_trait]
pub trait InterestHandler: Send + Sync {
    /// Reply to `interest`, or return `None` to stay silent
    async fn handle(&self, interest: &Interest) -> Option<SignedData>;
}

#[derive(Clone)]
struct Route {
    prefix: Name,
    handler: Arc<dyn InterestHandler>,
}

/// Dispatches inbound interests to the handler with the longest matching prefix
#[derive(Clone, Default)]
pub struct InterestRouter {
    routes: Arc<RwLock<Vec<Route>>>,
}

impl fmt::Debug for InterestRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefixes: Vec<String> = self
            .routes
            .read()
            .iter()
            .map(|route| route.prefix.to_string())
            .collect();
        f.debug_struct("InterestRouter")
            .field("prefixes", &prefixes)
            .finish()
    }
}

impl InterestRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for interests under `prefix`, replacing any
    /// handler already registered for the same prefix
    pub fn register(&self, prefix: Name, handler: Arc<dyn InterestHandler>) {
        let mut routes = self.routes.write();
        routes.retain(|route| route.prefix != prefix);
        tracing::debug!(prefix = %prefix, "registered interest handler");
        routes.push(Route { prefix, handler });
    }

    pub fn unregister(&self, prefix: &Name) {
        self.routes.write().retain(|route| route.prefix != *prefix);
    }

    fn lookup(&self, name: &Name) -> Option<Arc<dyn InterestHandler>> {
        self.routes
            .read()
            .iter()
            .filter(|route| route.prefix.is_prefix_of(name))
            .max_by_key(|route| route.prefix.len())
            .map(|route| route.handler.clone())
    }

    /// Hand `interest` to its handler
    pub async fn dispatch(&self, interest: &Interest) -> Option<SignedData> {
        let Some(handler) = self.lookup(&interest.name) else {
            tracing::debug!(name = %interest.name, "no handler for interest");
            return None;
        };
        let reply = handler.handle(interest).await?;
        if !interest.matches(&reply.name) {
            tracing::warn!(
                name = %interest.name,
                reply = %reply.name,
                "handler reply does not satisfy interest, dropping"
            );
            return None;
        }
        Some(reply)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::crypto::SecretKey;
    use crate::wire::Component;

    struct Echo {
        key: SecretKey,
        tag: u8,
    }

    #[async_trait]
    impl InterestHandler for Echo {
        async fn handle(&self, interest: &Interest) -> Option<SignedData> {
            Some(SignedData::sign(
                interest.name.clone(),
                None,
                vec![self.tag],
                &self.key,
            ))
        }
    }

    fn echo(tag: u8) -> Arc<dyn InterestHandler> {
        Arc::new(Echo {
            key: SecretKey::generate().unwrap(),
            tag,
        })
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let router = InterestRouter::new();
        router.register(Name::from_path("/team"), echo(1));
        router.register(Name::from_path("/team/root"), echo(2));

        let name = Name::from_path("/team/root").append(Component::keyword("DSK"));
        let reply = router
            .dispatch(&Interest::new(name, Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(reply.content, vec![2]);

        let other = Interest::new(Name::from_path("/team/chat"), Duration::from_secs(1));
        assert_eq!(router.dispatch(&other).await.unwrap().content, vec![1]);
    }

    #[tokio::test]
    async fn test_unrouted_and_unregistered() {
        let router = InterestRouter::new();
        let prefix = Name::from_path("/team");
        router.register(prefix.clone(), echo(1));

        let stray = Interest::new(Name::from_path("/elsewhere"), Duration::from_secs(1));
        assert!(router.dispatch(&stray).await.is_none());

        router.unregister(&prefix);
        let interest = Interest::new(Name::from_path("/team/x"), Duration::from_secs(1));
        assert!(router.dispatch(&interest).await.is_none());
    }
}
