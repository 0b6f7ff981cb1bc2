//! Common test utilities - CantripTest harness for end-to-end testing

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cantrip::{Config, Server};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// Test harness that spawns a real cantrip server on a random port
pub struct CantripTest {
    pub addr: SocketAddr,
    pub client: Client,
    server: Arc<Server>,
    _handle: JoinHandle<()>,
}

impl CantripTest {
    /// Start a new test server instance
    pub async fn start() -> Result<Self> {
        Self::start_with(Config::default()).await
    }

    /// Start a test server with custom settings; the bind address is replaced
    pub async fn start_with(mut config: Config) -> Result<Self> {
        // Find a random available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        config.bind_addr = addr;

        let server = Arc::new(Server::new(config).await?);
        let server_clone = server.clone();

        // Spawn the server in a background task
        let handle = tokio::spawn(async move {
            if let Err(e) = server_clone.run().await {
                eprintln!("Server error: {}", e);
            }
        });

        let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

        // Poll until server is ready (max 2 seconds)
        let mut ready = false;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if client
                .get(format!("http://{}/health", addr))
                .send()
                .await
                .is_ok()
            {
                ready = true;
                break;
            }
        }

        if !ready {
            panic!("Server failed to start within 2 seconds");
        }

        Ok(Self {
            addr,
            client,
            server,
            _handle: handle,
        })
    }

    /// Get the base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}{}", self.base_url(), path))
            .json(body)
            .send()
            .await?)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(format!("{}{}", self.base_url(), path))
            .send()
            .await?)
    }

    /// Get direct access to the server for assertions
    pub fn server(&self) -> Arc<Server> {
        self.server.clone()
    }

    /// Create a character with average scores and return its name
    pub async fn create_character(&self, owner: &str, name: &str, level: i32) -> Result<String> {
        let resp = self
            .post(
                "/characters",
                &json!({
                    "owner_id": owner,
                    "name": name,
                    "level": level,
                    "initiative": 0,
                    "abilities": {
                        "strength": 14, "dexterity": 12, "constitution": 12,
                        "intelligence": 10, "wisdom": 10, "charisma": 10
                    }
                }),
            )
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("character creation failed: {}", resp.status());
        }
        let body: Value = resp.json().await?;
        Ok(body["character"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    /// Run the attack wizard to completion with the given events
    pub async fn create_attack(
        &self,
        owner: &str,
        character: &str,
        attack: &str,
        events: &[Value],
    ) -> Result<Value> {
        let body: Value = self
            .post(
                "/wizards",
                &json!({"owner_id": owner, "character": character, "attack": attack}),
            )
            .await?
            .json()
            .await?;
        let id = body["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("wizard did not start: {}", body))?
            .to_string();

        let mut last = body;
        for event in events {
            last = self
                .post(
                    &format!("/wizards/{}", id),
                    &json!({"owner_id": owner, "event": event}),
                )
                .await?
                .json()
                .await?;
        }
        Ok(last)
    }
}

impl Drop for CantripTest {
    fn drop(&mut self) {
        self.server.shutdown();
    }
}
