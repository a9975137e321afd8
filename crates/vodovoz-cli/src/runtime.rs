// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::sync::mpsc::Sender;
use tracing::debug;
use vodovoz_app::{CatalogResponse, Product};
use vodovoz_client::{CatalogClient, FetchError};
use vodovoz_tui::{CatalogRuntime, InternalEvent};

/// Fetches from the live backend on a worker thread.
pub struct ClientRuntime {
    client: CatalogClient,
}

impl ClientRuntime {
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }
}

impl CatalogRuntime for ClientRuntime {
    fn fetch_catalog(&mut self) -> Result<CatalogResponse, FetchError> {
        self.client.fetch()
    }

    fn image_url(&self, product: &Product) -> Option<String> {
        self.client.image_url(product).map(String::from)
    }

    fn spawn_fetch(&mut self, request_id: u64, tx: Sender<InternalEvent>) -> Result<()> {
        // Detached: the screen may quit before the request finishes.
        let _worker = self.client.spawn_fetch(move |result| {
            if tx
                .send(InternalEvent::CatalogFetched { request_id, result })
                .is_err()
            {
                debug!(request_id, "screen closed before catalog arrived");
            }
        });
        Ok(())
    }
}

/// Serves a fixed catalog without touching the network.
pub struct DemoRuntime {
    catalog: CatalogResponse,
    image_base_url: String,
}

impl DemoRuntime {
    pub fn new(catalog: CatalogResponse, image_base_url: &str) -> Self {
        Self {
            catalog,
            image_base_url: image_base_url.to_owned(),
        }
    }
}

impl CatalogRuntime for DemoRuntime {
    fn fetch_catalog(&mut self) -> Result<CatalogResponse, FetchError> {
        Ok(self.catalog.clone())
    }

    fn image_url(&self, product: &Product) -> Option<String> {
        product.image_url(&self.image_base_url).map(String::from)
    }
}
