use std::time::Duration;

use thiserror::Error;

/// A single page failed to load. Recoverable: the pipeline skips the page.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("timed out loading {url}")]
    Timeout { url: String },
    #[error("failed to load {url}: {message}")]
    Navigation { url: String, message: String },
}

/// The browser could not be started. Fatal to the run.
#[derive(Error, Debug)]
#[error("browser launch failed: {0}")]
pub struct LaunchError(pub String);

/// One browser tab: load a URL, hand back the rendered document.
pub trait Browser {
    fn goto(&mut self, url: &str) -> Result<String, PageError>;

    /// Release the underlying resource. Called exactly once by [`BrowserSession`].
    fn close(&mut self);
}

pub trait BrowserLauncher {
    type Browser: Browser;

    fn launch(&self) -> Result<Self::Browser, LaunchError>;
}

/// Owns a browser for the length of a run and closes it on every exit path,
/// including early returns and unwinding.
pub struct BrowserSession<B: Browser> {
    browser: B,
    closed: bool,
}

impl<B: Browser> BrowserSession<B> {
    pub fn new(browser: B) -> Self {
        Self { browser, closed: false }
    }

    pub fn goto(&mut self, url: &str) -> Result<String, PageError> {
        self.browser.goto(url)
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.browser.close();
        }
    }
}

impl<B: Browser> Drop for BrowserSession<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Launches plain HTTP sessions. The listings site renders its rows
/// server-side, so a fetched document is equivalent to the rendered DOM.
pub struct HttpLauncher {
    pub page_timeout: Duration,
    pub user_agent: String,
}

impl BrowserLauncher for HttpLauncher {
    type Browser = HttpBrowser;

    fn launch(&self) -> Result<HttpBrowser, LaunchError> {
        if self.page_timeout.is_zero() {
            return Err(LaunchError("page timeout must be greater than zero".into()));
        }
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.page_timeout))
            .user_agent(self.user_agent.as_str())
            .build();
        log::debug!("Launched HTTP session (timeout {:?})", self.page_timeout);
        Ok(HttpBrowser {
            agent: config.into(),
            pages_loaded: 0,
        })
    }
}

pub struct HttpBrowser {
    agent: ureq::Agent,
    pages_loaded: usize,
}

impl Browser for HttpBrowser {
    fn goto(&mut self, url: &str) -> Result<String, PageError> {
        log::debug!("GET {url}");
        let mut response = self.agent.get(url).call().map_err(|e| page_error(url, e))?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| page_error(url, e))?;
        self.pages_loaded += 1;
        Ok(body)
    }

    fn close(&mut self) {
        log::debug!("Closing HTTP session after {} pages", self.pages_loaded);
    }
}

fn page_error(url: &str, e: ureq::Error) -> PageError {
    match e {
        ureq::Error::Timeout(_) => PageError::Timeout { url: url.to_string() },
        other => PageError::Navigation {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingBrowser {
        closes: Rc<Cell<usize>>,
    }

    impl Browser for CountingBrowser {
        fn goto(&mut self, url: &str) -> Result<String, PageError> {
            Ok(url.to_string())
        }

        fn close(&mut self) {
            self.closes.set(self.closes.get() + 1);
        }
    }

    #[test]
    fn test_session_closes_once_on_explicit_close() {
        let closes = Rc::new(Cell::new(0));
        let mut session = BrowserSession::new(CountingBrowser { closes: closes.clone() });
        assert_eq!(session.goto("a").unwrap(), "a");
        session.close();
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_session_closes_on_drop() {
        let closes = Rc::new(Cell::new(0));
        {
            let _session = BrowserSession::new(CountingBrowser { closes: closes.clone() });
        }
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_zero_timeout_refused() {
        let launcher = HttpLauncher {
            page_timeout: Duration::ZERO,
            user_agent: "test".into(),
        };
        assert!(launcher.launch().is_err());
    }
}
