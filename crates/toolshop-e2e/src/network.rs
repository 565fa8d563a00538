//! Network activity tracking.
//!
//! The browser driver feeds request lifecycle events into a
//! [`NetworkTracker`]; page objects read it to decide when the page has gone
//! quiet (network idle) and to observe that a specific request was sent.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// HTTP methods seen on captured requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// PATCH request
    Patch,
    /// Anything else (HEAD, OPTIONS, ...)
    Other,
}

impl HttpMethod {
    /// Parse from a method name
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            _ => Self::Other,
        }
    }

    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Other => "OTHER",
        }
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Glob pattern (e.g., "**/products?by_category=*")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Glob(pattern) => glob_matches(pattern, url),
            Self::Any => true,
        }
    }
}

fn glob_matches(pattern: &str, url: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let last = parts.len() - 1;
    if last == 0 {
        return url == pattern;
    }
    let Some(mut rest) = url.strip_prefix(parts[0]) else {
        return false;
    };
    for part in &parts[1..last] {
        match rest.find(part) {
            Some(found) => rest = &rest[found + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(parts[last])
}

/// Lifecycle of a captured request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Sent, no response body yet
    Pending,
    /// Loading finished
    Finished,
    /// Loading failed or was cancelled
    Failed,
}

/// A request observed on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    /// Driver-assigned request id
    pub request_id: String,
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Current status
    pub status: RequestStatus,
}

/// Position in the request log; requests after the mark are "new"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RequestMark(usize);

/// In-flight request bookkeeping for one page
#[derive(Debug)]
pub struct NetworkTracker {
    inflight: HashMap<String, usize>,
    log: Vec<CapturedRequest>,
    last_activity: Instant,
}

impl Default for NetworkTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkTracker {
    /// Create an empty tracker; the quiet window starts now
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflight: HashMap::new(),
            log: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    /// Record a request being sent. `data:` URLs never hit the network and
    /// are ignored.
    pub fn request_started(&mut self, request_id: &str, url: &str, method: HttpMethod) {
        if url.starts_with("data:") {
            return;
        }
        self.last_activity = Instant::now();
        if let Some(&index) = self.inflight.get(request_id) {
            // redirect: same id, new URL
            if let Some(entry) = self.log.get_mut(index) {
                entry.url = url.to_string();
            }
            return;
        }
        self.inflight.insert(request_id.to_string(), self.log.len());
        self.log.push(CapturedRequest {
            request_id: request_id.to_string(),
            url: url.to_string(),
            method,
            status: RequestStatus::Pending,
        });
    }

    /// Record a request completing
    pub fn request_finished(&mut self, request_id: &str) {
        self.settle(request_id, RequestStatus::Finished);
    }

    /// Record a request failing
    pub fn request_failed(&mut self, request_id: &str) {
        self.settle(request_id, RequestStatus::Failed);
    }

    fn settle(&mut self, request_id: &str, status: RequestStatus) {
        if let Some(index) = self.inflight.remove(request_id) {
            self.last_activity = Instant::now();
            if let Some(entry) = self.log.get_mut(index) {
                entry.status = status;
            }
        }
    }

    /// Forget in-flight requests of the previous document
    pub fn reset_inflight(&mut self) {
        for index in self.inflight.values() {
            if let Some(entry) = self.log.get_mut(*index) {
                entry.status = RequestStatus::Failed;
            }
        }
        self.inflight.clear();
        self.last_activity = Instant::now();
    }

    /// Number of requests still in flight
    #[must_use]
    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Time since the last request started or settled
    #[must_use]
    pub fn quiet_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Nothing in flight for at least `threshold`
    #[must_use]
    pub fn is_idle(&self, threshold: Duration) -> bool {
        self.inflight.is_empty() && self.quiet_for() >= threshold
    }

    /// Current end of the request log
    #[must_use]
    pub fn mark(&self) -> RequestMark {
        RequestMark(self.log.len())
    }

    /// Every request observed so far
    #[must_use]
    pub fn requests(&self) -> &[CapturedRequest] {
        &self.log
    }

    /// Requests observed after `mark`
    #[must_use]
    pub fn requests_since(&self, mark: RequestMark) -> &[CapturedRequest] {
        self.log.get(mark.0..).unwrap_or_default()
    }

    /// First request after `mark` whose URL satisfies `predicate`
    #[must_use]
    pub fn find_since(
        &self,
        mark: RequestMark,
        predicate: impl Fn(&str) -> bool,
    ) -> Option<&CapturedRequest> {
        self.requests_since(mark)
            .iter()
            .find(|request| predicate(&request.url))
    }
}

/// Tracker shared between the driver's event listeners and the page objects
#[derive(Debug, Clone, Default)]
pub struct SharedTracker(Arc<Mutex<NetworkTracker>>);

impl SharedTracker {
    /// Create a fresh shared tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the tracker. A poisoned lock is recovered; the bookkeeping stays
    /// usable after a listener panic.
    pub fn lock(&self) -> MutexGuard<'_, NetworkTracker> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
