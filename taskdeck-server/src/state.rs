//! Application state shared by all handlers

use std::sync::Arc;

use taskdeck_core::ExpiryPolicy;

use crate::email::EmailSender;
use crate::store::{DirectoryStore, SessionStore, WorkspaceStore};

/// Application state: the storage backend, the email sender and the expiry
/// policy. The backend is a single store implementing all three storage
/// traits, injected once at startup.
pub struct AppState<St, E> {
    pub store: Arc<St>,
    pub email_sender: E,
    pub expiry: ExpiryPolicy,
}

impl<St, E> AppState<St, E>
where
    St: DirectoryStore + WorkspaceStore + SessionStore,
    E: EmailSender,
{
    pub fn new(store: St, email_sender: E, expiry: ExpiryPolicy) -> Self {
        Self {
            store: Arc::new(store),
            email_sender,
            expiry,
        }
    }
}
