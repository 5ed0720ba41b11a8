// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{coefficients::CoefficientTable, config::Config, models::catalog::Catalog};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub coefficients: Arc<CoefficientTable>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<Catalog> {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for Arc<CoefficientTable> {
    fn from_ref(state: &AppState) -> Self {
        state.coefficients.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
