// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::Gateway;
use crate::config::VerificationConfig;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub config: Arc<VerificationConfig>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let config = Arc::clone(gateway.config());
        Self { gateway, config }
    }
}
