//! Screenshot Parser Client (spec §6.3, C5).
//!
//! Grounded on `crates/tools/src/builtins/web.rs`'s `reqwest::Client`
//! construction style (`.timeout(...)`, `.user_agent(...)`).

use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
struct ParseRequest<'a> {
    image_url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bbox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bubble {
    pub bbox: Bbox,
    pub text: String,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ParseData {
    bubbles: Vec<Bubble>,
}

#[derive(Debug, Clone, Deserialize)]
struct ParseResponse {
    code: i32,
    msg: String,
    data: Option<ParseData>,
}

pub struct ScreenshotClient {
    base_url: String,
    client: reqwest::Client,
}

impl ScreenshotClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("chatcoach-collab/0.1")
            .build()
            .unwrap_or_default();
        Self { base_url: base_url.into(), client }
    }

    /// `code == 0` is success; any other code is fatal for this image
    /// (spec §6.3).
    pub async fn parse(&self, image_url: &str) -> Result<Vec<Bubble>> {
        let response = self
            .client
            .post(format!("{}/parse", self.base_url))
            .json(&ParseRequest { image_url })
            .send()
            .await?
            .json::<ParseResponse>()
            .await?;

        if response.code != 0 {
            bail!("screenshot parser returned code {}: {}", response.code, response.msg);
        }

        Ok(response.data.map(|d| d.bubbles).unwrap_or_default())
    }
}
