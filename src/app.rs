//! Application context handed to every command.
//!
//! Holds what used to be process-wide state: the loaded configuration, the
//! formatter built from it, the backend selection and the set of requests in
//! flight. Changing settings goes through [`AppContext::reload`] rather than
//! restarting anything.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::{Backend, HttpBackend, LocalStore};
use crate::config::{self, Config};
use crate::convert::{Engine, InFlight};
use crate::document::LocaleFormatter;
use crate::error::{DeskError, Result};

pub struct AppContext {
    cfg_dir: PathBuf,
    config: Config,
    formatter: LocaleFormatter,
    in_flight: InFlight,
}

impl AppContext {
    pub fn load(cfg_dir: PathBuf) -> Result<Self> {
        if !cfg_dir.exists() {
            return Err(DeskError::ConfigNotFound(cfg_dir));
        }
        let config = config::load_config(&cfg_dir)?;
        let formatter = LocaleFormatter::new(&config.documents);
        Ok(Self {
            cfg_dir,
            config,
            formatter,
            in_flight: InFlight::new(),
        })
    }

    /// Re-read config.toml and rebuild everything derived from it. Requests
    /// in flight are kept.
    pub fn reload(&mut self) -> Result<()> {
        self.config = config::load_config(&self.cfg_dir)?;
        self.formatter = LocaleFormatter::new(&self.config.documents);
        tracing::info!(path = %self.cfg_dir.display(), "configuration reloaded");
        Ok(())
    }

    pub fn cfg_dir(&self) -> &PathBuf {
        &self.cfg_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn formatter(&self) -> &LocaleFormatter {
        &self.formatter
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn is_remote(&self) -> bool {
        self.config.api.is_some()
    }

    pub fn mode(&self) -> &'static str {
        if self.is_remote() {
            "remote API"
        } else {
            "local ledger"
        }
    }

    /// The REST API when `[api]` is configured, the local ledger otherwise
    pub fn open_backend(&self) -> Result<Box<dyn Backend>> {
        match &self.config.api {
            Some(api) => {
                tracing::debug!(base_url = %api.base_url, "using remote backend");
                Ok(Box::new(HttpBackend::new(api)))
            }
            None => Ok(Box::new(self.open_local()?)),
        }
    }

    pub fn open_local(&self) -> Result<LocalStore> {
        LocalStore::open(&self.cfg_dir, self.config.numbering.clone())
    }

    /// Engine over `backend` sharing this context's in-flight set
    pub fn engine<'a>(&self, backend: &'a mut dyn Backend) -> Engine<'a> {
        Engine::with_in_flight(backend, self.in_flight.clone())
    }

    pub fn output_dir(&self) -> PathBuf {
        config::expand_path(&self.config.documents.output_dir)
    }
}

/// Liveness of the view that started a request. Results that arrive after
/// the view was closed are dropped instead of applied.
#[derive(Debug, Clone)]
pub struct View {
    alive: Arc<AtomicBool>,
}

impl View {
    pub fn open() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Run `apply` with the result if the view is still open; returns whether
    /// it ran
    pub fn deliver<T>(&self, result: T, apply: impl FnOnce(T)) -> bool {
        if !self.is_open() {
            tracing::debug!("view closed, discarding result");
            return false;
        }
        apply(result);
        true
    }
}

impl Default for View {
    fn default() -> Self {
        Self::open()
    }
}
