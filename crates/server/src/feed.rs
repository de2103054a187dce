use crate::state::AppState;
use futures_util::StreamExt;
use reqwest::{Client, header::ACCEPT_ENCODING};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error};

pub async fn poll_trains(state: Arc<AppState>, url: String, interval: Duration) {
    let client = Client::new();
    loop {
        match fetch(&client, &url).await {
            Some(snapshot) => state.train_snapshots.push(snapshot),
            None => state.engine.lock().await.refresh(),
        }
        tokio::time::sleep(interval).await;
    }
}

pub async fn poll_flights(state: Arc<AppState>, url: String, interval: Duration) {
    let client = Client::new();
    loop {
        match fetch(&client, &url).await {
            Some(snapshot) => state.flight_snapshots.push(snapshot),
            None => state.engine.lock().await.refresh(),
        }
        tokio::time::sleep(interval).await;
    }
}

async fn fetch<T: DeserializeOwned>(client: &Client, url: &str) -> Option<T> {
    let response = client
        .get(url)
        .header(ACCEPT_ENCODING, "gzip, deflate")
        .send()
        .await
        .map_err(|err| error!("Failed to fetch {url}: {err}"))
        .ok()?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("Feed {url} answered {status}: {body}");
        return None;
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let data = chunk
            .map_err(|err| error!("Failed to fetch chunk from {url}: {err}"))
            .ok()?;
        body.extend_from_slice(&data);
    }
    debug!("Fetched {} bytes from {url}", body.len());

    serde_json::from_slice(&body)
        .map_err(|err| error!("Failed to parse feed {url}: {err}"))
        .ok()
}
