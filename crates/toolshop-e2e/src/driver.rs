//! Driver - abstract browser automation seam.
//!
//! Page objects talk to the browser only through [`Driver`]. The Chromium
//! implementation lives in `browser` (feature `browser`); [`MockDriver`] is an
//! in-memory page used by the unit tests of page objects and fixtures.
//!
//! All methods take `&self` so one session can be shared between the page
//! objects of a test and its teardown; implementations use interior
//! mutability.

use crate::config::Config;
use crate::fixture::SessionLauncher;
use crate::locator::Selector;
use crate::network::{HttpMethod, SharedTracker};
use crate::result::{E2eError, E2eResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot of the first element matching a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementState {
    /// Number of matching elements
    pub count: usize,
    /// First match is rendered and has a non-empty box
    pub visible: bool,
    /// First match is not disabled
    pub enabled: bool,
}

impl ElementState {
    /// First match can receive a click
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        self.count > 0 && self.visible && self.enabled
    }
}

/// Abstract driver trait for browser automation
#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> E2eResult<()>;

    /// Current page URL
    async fn current_url(&self) -> E2eResult<String>;

    /// Count, visibility and enabled state of the first match
    async fn element_state(&self, selector: &Selector) -> E2eResult<ElementState>;

    /// Number of matches
    async fn count(&self, selector: &Selector) -> E2eResult<usize> {
        Ok(self.element_state(selector).await?.count)
    }

    /// Click the first match
    async fn click(&self, selector: &Selector) -> E2eResult<()>;

    /// Empty the first match's value
    async fn clear(&self, selector: &Selector) -> E2eResult<()>;

    /// Type into the first match at the current caret
    async fn type_text(&self, selector: &Selector, text: &str) -> E2eResult<()>;

    /// Choose the `<option>` whose label is `label`
    async fn select_option(&self, selector: &Selector, label: &str) -> E2eResult<()>;

    /// Press a named key ("Enter", "Tab", ...) with the first match focused
    async fn press(&self, selector: &Selector, key: &str) -> E2eResult<()>;

    /// Assign `value` programmatically and fire `input` and `change`
    async fn set_value(&self, selector: &Selector, value: &str) -> E2eResult<()>;

    /// Rendered text of the first match, `None` when nothing matches
    async fn text(&self, selector: &Selector) -> E2eResult<Option<String>>;

    /// Input value of the first match, `None` when nothing matches
    async fn value(&self, selector: &Selector) -> E2eResult<Option<String>>;

    /// Write a `localStorage` entry for the current origin
    async fn set_local_storage(&self, key: &str, value: &str) -> E2eResult<()>;

    /// Read a `localStorage` entry for the current origin
    async fn local_storage(&self, key: &str) -> E2eResult<Option<String>>;

    /// Full-page PNG screenshot
    async fn screenshot(&self) -> E2eResult<Vec<u8>>;

    /// Request bookkeeping for the current page
    fn network(&self) -> SharedTracker;

    /// Close the session; later calls are no-ops
    async fn close(&self) -> E2eResult<()>;
}

/// One mock element (or group of identical matches)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Number of matches once the element has appeared
    pub count: usize,
    /// Whether it renders visibly
    pub visible: bool,
    /// Whether it accepts input
    pub enabled: bool,
    /// Polls of `element_state` before the element appears
    pub appear_after_polls: usize,
    /// Rendered text
    pub text: String,
    /// Input value
    pub value: String,
    /// `<option>` labels, for selects
    pub options: Vec<String>,
    polls: usize,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            count: 1,
            visible: true,
            enabled: true,
            appear_after_polls: 0,
            text: String::new(),
            value: String::new(),
            options: Vec::new(),
            polls: 0,
        }
    }
}

impl MockElement {
    /// A single visible, enabled element
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the match count
    #[must_use]
    pub const fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the rendered text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the initial value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Render it hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Render it disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Appear only after `polls` state queries
    #[must_use]
    pub const fn appear_after(mut self, polls: usize) -> Self {
        self.appear_after_polls = polls;
        self
    }

    /// Offer these `<option>` labels
    #[must_use]
    pub fn options<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = labels.into_iter().map(Into::into).collect();
        self
    }

    fn has_appeared(&self) -> bool {
        self.polls > self.appear_after_polls || self.appear_after_polls == 0
    }
}

/// Reaction run against the page state when a trigger fires
pub type Reaction = Box<dyn Fn(&mut MockState) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Trigger {
    Goto(String),
    Click(String),
    Press(String, String),
}

/// Mutable state behind a [`MockDriver`]
pub struct MockState {
    /// Current URL
    pub url: String,
    /// Elements keyed by selector string
    pub elements: HashMap<String, MockElement>,
    /// `localStorage` contents
    pub local_storage: HashMap<String, String>,
    /// Every driver call, in order
    pub history: Vec<String>,
    /// Bytes returned by `screenshot`; `None` makes it fail
    pub screenshot: Option<Vec<u8>>,
    /// Request bookkeeping
    pub network: SharedTracker,
    /// Whether `close` was called
    pub closed: bool,
    reactions: Vec<(Trigger, Reaction)>,
    next_request: usize,
}

impl fmt::Debug for MockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockState")
            .field("url", &self.url)
            .field("elements", &self.elements)
            .field("history", &self.history)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl MockState {
    /// Add or replace an element
    pub fn insert(&mut self, selector: &Selector, element: MockElement) {
        self.elements.insert(selector.to_string(), element);
    }

    /// Remove an element
    pub fn remove(&mut self, selector: &Selector) {
        self.elements.remove(&selector.to_string());
    }

    /// Mutable access to an element
    pub fn element_mut(&mut self, selector: &Selector) -> Option<&mut MockElement> {
        self.elements.get_mut(&selector.to_string())
    }

    /// Record a request that completes immediately
    pub fn complete_request(&mut self, url: &str) {
        let id = self.start_request(url);
        self.network.lock().request_finished(&id);
    }

    /// Record a request that stays in flight; returns its id
    pub fn start_request(&mut self, url: &str) -> String {
        self.next_request += 1;
        let id = format!("mock-{}", self.next_request);
        self.network.lock().request_started(&id, url, HttpMethod::Get);
        id
    }

    fn fire(&mut self, trigger: &Trigger) {
        let reactions = std::mem::take(&mut self.reactions);
        for (t, reaction) in &reactions {
            if t == trigger {
                reaction(self);
            }
        }
        let added = std::mem::replace(&mut self.reactions, reactions);
        self.reactions.extend(added);
    }

    fn existing(&mut self, selector: &Selector) -> E2eResult<&mut MockElement> {
        match self.elements.get_mut(&selector.to_string()) {
            Some(element) if element.has_appeared() && element.count > 0 => Ok(element),
            _ => Err(E2eError::Page {
                message: format!("no element matches {selector}"),
            }),
        }
    }
}

/// In-memory driver for unit testing page objects and fixtures
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Blank page at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let state = MockState {
            url: "about:blank".to_string(),
            elements: HashMap::new(),
            local_storage: HashMap::new(),
            history: Vec::new(),
            screenshot: Some(vec![0x89, b'P', b'N', b'G']),
            network: SharedTracker::new(),
            closed: false,
            reactions: Vec::new(),
            next_request: 0,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Lock the page state
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add or replace an element
    #[must_use]
    pub fn with_element(self, selector: &Selector, element: MockElement) -> Self {
        self.state().insert(selector, element);
        self
    }

    /// Run `reaction` after every navigation to exactly `url`
    pub fn on_goto(&self, url: &str, reaction: impl Fn(&mut MockState) + Send + Sync + 'static) {
        self.state()
            .reactions
            .push((Trigger::Goto(url.to_string()), Box::new(reaction)));
    }

    /// Run `reaction` after every click on `selector`
    pub fn on_click(
        &self,
        selector: &Selector,
        reaction: impl Fn(&mut MockState) + Send + Sync + 'static,
    ) {
        self.state()
            .reactions
            .push((Trigger::Click(selector.to_string()), Box::new(reaction)));
    }

    /// Run `reaction` after every press of `key` on `selector`
    pub fn on_press(
        &self,
        selector: &Selector,
        key: &str,
        reaction: impl Fn(&mut MockState) + Send + Sync + 'static,
    ) {
        self.state().reactions.push((
            Trigger::Press(selector.to_string(), key.to_string()),
            Box::new(reaction),
        ));
    }

    /// Make `screenshot` fail
    pub fn fail_screenshots(&self) {
        self.state().screenshot = None;
    }

    /// Call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, call: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(call))
    }

    /// Current value of an element
    #[must_use]
    pub fn value_of(&self, selector: &Selector) -> Option<String> {
        self.state()
            .elements
            .get(&selector.to_string())
            .map(|e| e.value.clone())
    }

    /// Whether `close` was called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state();
        state.history.push(format!("goto:{url}"));
        state.url = url.to_string();
        state.network.lock().reset_inflight();
        state.fire(&Trigger::Goto(url.to_string()));
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.state().url.clone())
    }

    async fn element_state(&self, selector: &Selector) -> E2eResult<ElementState> {
        let mut state = self.state();
        let Some(element) = state.elements.get_mut(&selector.to_string()) else {
            return Ok(ElementState::default());
        };
        element.polls += 1;
        if !element.has_appeared() {
            return Ok(ElementState::default());
        }
        Ok(ElementState {
            count: element.count,
            visible: element.count > 0 && element.visible,
            enabled: element.enabled,
        })
    }

    async fn click(&self, selector: &Selector) -> E2eResult<()> {
        let mut state = self.state();
        state.existing(selector)?;
        state.history.push(format!("click:{selector}"));
        state.fire(&Trigger::Click(selector.to_string()));
        Ok(())
    }

    async fn clear(&self, selector: &Selector) -> E2eResult<()> {
        let mut state = self.state();
        state.existing(selector)?.value.clear();
        state.history.push(format!("clear:{selector}"));
        Ok(())
    }

    async fn type_text(&self, selector: &Selector, text: &str) -> E2eResult<()> {
        let mut state = self.state();
        state.existing(selector)?.value.push_str(text);
        state.history.push(format!("type:{selector}:{text}"));
        Ok(())
    }

    async fn select_option(&self, selector: &Selector, label: &str) -> E2eResult<()> {
        let mut state = self.state();
        let element = state.existing(selector)?;
        if !element.options.is_empty() && !element.options.iter().any(|o| o == label) {
            return Err(E2eError::Page {
                message: format!("{selector} has no option labelled {label:?}"),
            });
        }
        element.value = label.to_string();
        state.history.push(format!("select:{selector}:{label}"));
        Ok(())
    }

    async fn press(&self, selector: &Selector, key: &str) -> E2eResult<()> {
        let mut state = self.state();
        state.existing(selector)?;
        state.history.push(format!("press:{selector}:{key}"));
        state.fire(&Trigger::Press(selector.to_string(), key.to_string()));
        Ok(())
    }

    async fn set_value(&self, selector: &Selector, value: &str) -> E2eResult<()> {
        let mut state = self.state();
        state.existing(selector)?.value = value.to_string();
        state.history.push(format!("set_value:{selector}:{value}"));
        Ok(())
    }

    async fn text(&self, selector: &Selector) -> E2eResult<Option<String>> {
        let state = self.state();
        Ok(state
            .elements
            .get(&selector.to_string())
            .filter(|e| e.has_appeared() && e.count > 0)
            .map(|e| e.text.clone()))
    }

    async fn value(&self, selector: &Selector) -> E2eResult<Option<String>> {
        let state = self.state();
        Ok(state
            .elements
            .get(&selector.to_string())
            .filter(|e| e.has_appeared() && e.count > 0)
            .map(|e| e.value.clone()))
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> E2eResult<()> {
        let mut state = self.state();
        if !state.url.starts_with("http") {
            return Err(E2eError::Page {
                message: format!("localStorage is not available on {}", state.url),
            });
        }
        state.local_storage.insert(key.to_string(), value.to_string());
        state.history.push(format!("set_local_storage:{key}"));
        Ok(())
    }

    async fn local_storage(&self, key: &str) -> E2eResult<Option<String>> {
        Ok(self.state().local_storage.get(key).cloned())
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        let mut state = self.state();
        state.history.push("screenshot".to_string());
        state.screenshot.clone().ok_or_else(|| E2eError::Screenshot {
            message: "page crashed".to_string(),
        })
    }

    fn network(&self) -> SharedTracker {
        self.state().network.clone()
    }

    async fn close(&self) -> E2eResult<()> {
        let mut state = self.state();
        if !state.closed {
            state.closed = true;
            state.history.push("close".to_string());
        }
        Ok(())
    }
}

/// Launcher handing out one shared [`MockDriver`]
#[derive(Debug, Clone, Default)]
pub struct MockLauncher {
    driver: MockDriver,
    launches: Arc<AtomicUsize>,
    fail_with: Option<String>,
}

impl MockLauncher {
    /// Launcher returning `driver` on every launch
    #[must_use]
    pub fn new(driver: MockDriver) -> Self {
        Self {
            driver,
            launches: Arc::new(AtomicUsize::new(0)),
            fail_with: None,
        }
    }

    /// Launcher whose every launch fails
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::default()
        }
    }

    /// The driver handed out
    #[must_use]
    pub const fn driver(&self) -> &MockDriver {
        &self.driver
    }

    /// Number of launches so far
    #[must_use]
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    async fn launch(&self, _config: &Config) -> E2eResult<Arc<dyn Driver>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(E2eError::BrowserLaunch {
                message: message.clone(),
            });
        }
        Ok(Arc::new(self.driver.clone()))
    }
}
