use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use crate::{config::AppConfig, engine::{Mode, RecommendationEngine}};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<RecommendationEngine>,
    pub status: Arc<Mutex<Status>>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn new(config: AppConfig, engine: RecommendationEngine, shutdown_tx: Option<oneshot::Sender<()>>) -> Self {
        let mode = engine.mode();
        let message = match mode {
            Mode::Ml => "Servidor listo. Modelo ML cargado.",
            Mode::Rules => "Servidor listo. Usando el sistema de reglas.",
        };
        Self {
            config,
            engine: Arc::new(engine),
            status: Arc::new(Mutex::new(Status {
                mode,
                message: message.to_string(),
                recommendations_served: 0,
                ml_fallbacks: 0,
            })),
            shutdown_sender: Arc::new(Mutex::new(shutdown_tx)),
        }
    }

    /// Copia del estado actual. Un mutex envenenado no impide leerlo.
    pub fn snapshot(&self) -> Status {
        self.status.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn record_served(&self, fell_back: bool) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        status.recommendations_served += 1;
        if fell_back {
            status.ml_fallbacks += 1;
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Status {
    pub mode: Mode,
    pub message: String,
    pub recommendations_served: u64,
    // Consultas en modo ML resueltas por la cascada.
    pub ml_fallbacks: u64,
}
