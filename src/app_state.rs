use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use crate::responder::Responder;

#[derive(Clone)]
pub struct AppState {
    pub responder: Arc<Responder>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}
