#![deny(private_interfaces)]

pub mod appresult;
pub mod auth;
pub mod config;
pub mod content;
pub mod conversations;
pub mod error;
pub mod graph;
pub mod id;
pub mod models;
pub mod notifications;
pub mod posts;
pub mod realtime;
pub mod session;
pub mod store;
pub mod users;

use std::sync::Arc;

use axum::{extract::FromRef, Router};

pub use appresult::{AppError, AppResult};

use config::Config;
use content::ContentQuery;
use conversations::Conversations;
use graph::SocialGraph;
use notifications::Aggregator;
use realtime::{Dispatcher, PresenceRegistry};
use store::DocumentStore;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub graph: SocialGraph,
    pub content: ContentQuery,
    pub conversations: Conversations,
    pub aggregator: Aggregator,
    pub presence: Arc<PresenceRegistry>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        let graph = SocialGraph::new(store.clone());
        let content = ContentQuery::new(store.clone());
        let presence = Arc::new(PresenceRegistry::new(graph.clone()));

        Self {
            config: Arc::new(config),
            conversations: Conversations::new(store),
            aggregator: Aggregator::new(graph.clone(), content.clone()),
            dispatcher: Dispatcher::new(presence.clone(), graph.clone()),
            presence,
            graph,
            content,
        }
    }
}

/// Every route, without the session and HTTP layers `main` adds.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(notifications::router())
        .merge(posts::router())
        .merge(users::router())
        .merge(conversations::router())
        .merge(realtime::router())
}
