//! W3C WebDriver adapter
//!
//! Speaks the WebDriver wire protocol (JSON over HTTP) to a driver process
//! such as chromedriver. Only the handful of commands the crawler needs are
//! implemented.
//!
//! # Error mapping
//!
//! | WebDriver `error` | DriverError |
//! |-------------------|-------------|
//! | `stale element reference` | `Stale` |
//! | `no such element` | `NoSuchElement` |
//! | `javascript error` | `Script` |
//! | `timeout`, `script timeout` | `Timeout` |
//! | anything else | `Protocol` |

use crate::config::WebDriverConfig;
use crate::crawler::driver::{AutomationDriver, DriverError, DriverResult, ElementHandle};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Key under which W3C drivers return element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Interval between polls in `wait_until_url_contains`
const URL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A live WebDriver session
pub struct WebDriverClient {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverClient {
    /// Starts a new browser session
    ///
    /// # Arguments
    ///
    /// * `config` - Driver endpoint and browser profile settings
    ///
    /// # Returns
    ///
    /// * `Ok(WebDriverClient)` - Session created
    /// * `Err(DriverError)` - Driver unreachable or session refused
    pub async fn connect(config: &WebDriverConfig) -> DriverResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let response = send(
            &client,
            Method::POST,
            &format!("{}/session", base_url),
            Some(session_capabilities(config)),
        )
        .await?;

        let session_id = response
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol {
                code: "session not created".to_string(),
                message: format!("response has no sessionId: {}", response),
            })?
            .to_string();

        tracing::info!("WebDriver session {} started", session_id);

        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    fn session_url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> DriverResult<Value> {
        send(&self.client, method, &self.session_url(path), body).await
    }

    async fn find_elements(&self, using: &str, value: &str) -> DriverResult<Vec<ElementHandle>> {
        let found = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": using, "value": value })),
            )
            .await?;

        Ok(found
            .as_array()
            .map(|refs| refs.iter().filter_map(element_from_value).collect())
            .unwrap_or_default())
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn current_url(&self) -> DriverResult<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl AutomationDriver for WebDriverClient {
    async fn navigate_to(&self, url: &str) -> DriverResult<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn wait_until_url_contains(&self, fragment: &str, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.current_url().await?.contains(fragment) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what: format!("URL containing {}", fragment),
                    timeout,
                });
            }
            tokio::time::sleep(URL_POLL_INTERVAL).await;
        }
    }

    async fn find_visible_elements(&self, selector: &str) -> DriverResult<Vec<ElementHandle>> {
        let mut visible = Vec::new();
        for element in self.find_elements("css selector", selector).await? {
            // An element that detaches mid-check is dropped, not the whole list
            match self.is_displayed(&element).await {
                Ok(true) => visible.push(element),
                Ok(false) => {}
                Err(e) => tracing::debug!("Skipping element {}: {}", element.id(), e),
            }
        }
        Ok(visible)
    }

    async fn find_elements_with_text(&self, text: &str) -> DriverResult<Vec<ElementHandle>> {
        self.find_elements("xpath", &format!("//div[text()={}]", xpath_literal(text)))
            .await
    }

    async fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool> {
        let value = self
            .command(
                Method::GET,
                &format!("/element/{}/displayed", element.id()),
                None,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> DriverResult<()> {
        self.execute(
            "arguments[0].scrollIntoView({behavior: 'smooth', block: 'end'});",
            vec![element_to_value(element)],
        )
        .await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        // Script click: overlays on the feed intercept native clicks
        self.execute("arguments[0].click();", vec![element_to_value(element)])
            .await?;
        Ok(())
    }

    async fn scroll_by(&self, pixels: i64) -> DriverResult<()> {
        self.execute("window.scrollBy(0, arguments[0]);", vec![json!(pixels)])
            .await?;
        Ok(())
    }

    async fn read_text(&self, element: &ElementHandle) -> DriverResult<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.id()), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn quit(&self) -> DriverResult<()> {
        self.command(Method::DELETE, "", None).await?;
        tracing::info!("WebDriver session {} closed", self.session_id);
        Ok(())
    }
}

/// Sends one WebDriver command and unwraps the `value` envelope
async fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> DriverResult<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(classify_error(code, message));
    }

    if !status.is_success() {
        return Err(DriverError::Protocol {
            code: status.as_u16().to_string(),
            message: value.to_string(),
        });
    }

    Ok(value)
}

fn classify_error(code: &str, message: String) -> DriverError {
    match code {
        "stale element reference" => DriverError::Stale(message),
        "no such element" => DriverError::NoSuchElement(message),
        "javascript error" => DriverError::Script(message),
        "timeout" | "script timeout" => DriverError::Timeout {
            what: message,
            timeout: Duration::ZERO,
        },
        other => DriverError::Protocol {
            code: other.to_string(),
            message,
        },
    }
}

fn session_capabilities(config: &WebDriverConfig) -> Value {
    let mut args = Vec::new();
    if let Some(dir) = &config.user_data_dir {
        args.push(format!("user-data-dir={}", dir));
        args.push("profile-directory=Default".to_string());
    }
    if config.headless {
        args.push("--headless=new".to_string());
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

fn element_from_value(value: &Value) -> Option<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementHandle(id.to_string()))
}

fn element_to_value(element: &ElementHandle) -> Value {
    json!({ ELEMENT_KEY: element.id() })
}

/// Quotes a string for use inside an XPath expression
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
