//! Chromium backend for the headless-browser strategy

use super::browser::{
    wait_for_event, BrowserLauncher, BrowserPage, RenderError, SessionCookie, SessionState,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::Page;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const READY_STATE_POLL: Duration = Duration::from_millis(250);

/// Lifecycle event name Chromium emits once no requests are in flight
const NETWORK_IDLE: &str = "networkIdle";

/// Launches a local Chromium per render
pub struct ChromiumLauncher {
    headless: bool,
    user_agent: String,
}

impl ChromiumLauncher {
    pub fn new(headless: bool, user_agent: &str) -> Self {
        Self {
            headless,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn from_config(config: &crate::config::FetchConfig) -> Self {
        Self::new(config.browser_headless, &config.user_agent)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(
        &self,
        session: Option<&SessionState>,
    ) -> Result<Box<dyn BrowserPage>, RenderError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1366, 900)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg(format!("--user-agent={}", self.user_agent));
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let mut guard = ChromiumPage {
            browser,
            page: None,
            lifecycle: None,
            handler_task,
        };

        let page = match guard.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                Box::new(guard).close().await;
                return Err(RenderError::Launch(e.to_string()));
            }
        };

        if let Some(state) = session {
            let cookies: Vec<CookieParam> = state.cookies.iter().filter_map(to_cookie_param).collect();
            if !cookies.is_empty() {
                if let Err(e) = page.set_cookies(cookies).await {
                    tracing::warn!("Failed to restore browser session cookies: {}", e);
                }
            }
        }

        guard.page = Some(page);
        Ok(Box::new(guard))
    }
}

fn to_cookie_param(cookie: &SessionCookie) -> Option<CookieParam> {
    CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only)
        .build()
        .ok()
}

/// A launched browser with its single page
struct ChromiumPage {
    browser: Browser,
    page: Option<Page>,
    /// Lifecycle events of the current navigation
    lifecycle: Option<BoxStream<'static, Arc<EventLifecycleEvent>>>,
    handler_task: JoinHandle<()>,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Navigation("page already closed".to_string()))
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&mut self, url: &str) -> Result<(), RenderError> {
        let page = self.page()?;

        // Subscribe before navigating so an early networkIdle is not missed
        let lifecycle = match page.execute(SetLifecycleEventsEnabledParams::new(true)).await {
            Ok(_) => match page.event_listener::<EventLifecycleEvent>().await {
                Ok(events) => Some(events.boxed()),
                Err(e) => {
                    tracing::debug!("Lifecycle events unavailable: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::debug!("Could not enable lifecycle events: {}", e);
                None
            }
        };

        page.goto(url)
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        self.lifecycle = lifecycle;
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<(), RenderError> {
        let lifecycle = self.lifecycle.take();
        let page = self.page()?;

        let Some(mut events) = lifecycle else {
            return wait_for_ready_state(page, timeout).await;
        };

        let main_frame = page.mainframe().await.ok().flatten();
        let is_idle = |event: &Arc<EventLifecycleEvent>| {
            let in_main_frame = main_frame
                .as_ref()
                .map_or(true, |frame| *frame == event.frame_id);
            in_main_frame && event.name == NETWORK_IDLE
        };

        if wait_for_event(&mut events, timeout, is_idle).await? {
            Ok(())
        } else {
            wait_for_ready_state(page, timeout).await
        }
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.page()?
            .content()
            .await
            .map_err(|e| RenderError::Content(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        let mut this = self;
        if let Some(page) = this.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!("Failed to close page: {}", e);
            }
        }
        if let Err(e) = this.browser.close().await {
            tracing::debug!("Failed to close browser: {}", e);
        }
        let _ = this.browser.wait().await;
        this.handler_task.abort();
    }
}

/// Polls `document.readyState` when lifecycle events are unavailable
async fn wait_for_ready_state(page: &Page, timeout: Duration) -> Result<(), RenderError> {
    let started = Instant::now();

    loop {
        let state = page
            .evaluate("document.readyState")
            .await
            .ok()
            .and_then(|r| r.into_value::<String>().ok());
        if state.as_deref() == Some("complete") {
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(RenderError::Timeout(timeout));
        }
        tokio::time::sleep(READY_STATE_POLL).await;
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        // Browser's own drop kills the child process; the handler must go too
        self.handler_task.abort();
    }
}
