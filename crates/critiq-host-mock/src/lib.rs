//! Mock Host implementation for testing the Critiq client core
//!
//! This provides a mock implementation of the `Host` trait that can be used
//! for unit testing the session and publication services without a browser.
//!
//! The page tree is a flat list of nodes kept in document order. Nodes that
//! belong to a component's encapsulated root are reached by document-wide
//! queries and the text scan, as open shadow roots are, and only
//! `query_in_component` is scoped to one component.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use critiq_host::{
    AuthFuture, AuthProvider, ClickHandler, Deferred, Host, HostError, LocalTask, LogLevel,
    NavigationIntent, RemoteLogoutResponse, StoreKind,
};

/// Handle to a node of the simulated page tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockNodeId(u32);

impl MockNodeId {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Simulated node state
struct MockNode {
    /// Selectors this element answers to (ignored for text nodes)
    selectors: Vec<String>,
    attributes: BTreeMap<String, String>,
    /// Some for text nodes
    text: Option<String>,
    /// Component whose encapsulated root holds this node
    component: Option<MockNodeId>,
    attached: bool,
}

impl MockNode {
    fn is_text(&self) -> bool {
        self.text.is_some() && self.selectors.is_empty()
    }
}

/// Simulated key-value store with fault injection
#[derive(Default)]
struct MockStore {
    entries: BTreeMap<String, String>,
    unavailable: bool,
    reject_writes: bool,
    reject_clear: bool,
    failing_removals: Vec<String>,
}

/// Mock Host for unit testing
///
/// Provides simulated stores, page tree, navigation, dialogs, timers and a
/// task queue. Every log line is captured for assertions.
pub struct MockHost {
    durable: RefCell<MockStore>,
    ephemeral: RefCell<MockStore>,
    nodes: RefCell<Vec<MockNode>>,
    click_handlers: RefCell<BTreeMap<u32, ClickHandler>>,
    fail_queries: Cell<bool>,
    fail_node_removals: Cell<bool>,
    location: RefCell<String>,
    /// When set, the simulated router follows every dispatched intent
    router_follows: Cell<bool>,
    fail_dispatch: Cell<bool>,
    intents: RefCell<Vec<NavigationIntent>>,
    hard_navigations: RefCell<Vec<String>>,
    confirm_answer: Cell<bool>,
    confirms: RefCell<Vec<String>>,
    alerts: RefCell<Vec<String>>,
    timers: RefCell<Vec<(u32, Deferred)>>,
    tasks: RefCell<Vec<LocalTask>>,
    log: RefCell<Vec<(LogLevel, String)>>,
}

impl MockHost {
    /// Create a new mock host at location `/`
    pub fn new() -> Self {
        Self::at("/")
    }

    /// Create a mock host at a specific location path
    pub fn at(path: &str) -> Self {
        Self {
            durable: RefCell::new(MockStore::default()),
            ephemeral: RefCell::new(MockStore::default()),
            nodes: RefCell::new(Vec::new()),
            click_handlers: RefCell::new(BTreeMap::new()),
            fail_queries: Cell::new(false),
            fail_node_removals: Cell::new(false),
            location: RefCell::new(String::from(path)),
            router_follows: Cell::new(false),
            fail_dispatch: Cell::new(false),
            intents: RefCell::new(Vec::new()),
            hard_navigations: RefCell::new(Vec::new()),
            confirm_answer: Cell::new(true),
            confirms: RefCell::new(Vec::new()),
            alerts: RefCell::new(Vec::new()),
            timers: RefCell::new(Vec::new()),
            tasks: RefCell::new(Vec::new()),
            log: RefCell::new(Vec::new()),
        }
    }

    fn store(&self, kind: StoreKind) -> &RefCell<MockStore> {
        match kind {
            StoreKind::Durable => &self.durable,
            StoreKind::Ephemeral => &self.ephemeral,
        }
    }

    // === Stores ===

    /// Seed a value, bypassing fault injection
    pub fn seed(&self, kind: StoreKind, key: &str, value: &str) {
        self.store(kind)
            .borrow_mut()
            .entries
            .insert(String::from(key), String::from(value));
    }

    /// Read a value, bypassing fault injection
    pub fn peek(&self, kind: StoreKind, key: &str) -> Option<String> {
        self.store(kind).borrow().entries.get(key).cloned()
    }

    /// Number of keys held by a store
    pub fn store_len(&self, kind: StoreKind) -> usize {
        self.store(kind).borrow().entries.len()
    }

    /// Make every operation on a store fail with `StorageUnavailable`
    pub fn set_store_unavailable(&self, kind: StoreKind, unavailable: bool) {
        self.store(kind).borrow_mut().unavailable = unavailable;
    }

    /// Make writes to a store fail
    pub fn reject_writes(&self, kind: StoreKind) {
        self.store(kind).borrow_mut().reject_writes = true;
    }

    /// Make clearing a store fail
    pub fn reject_clear(&self, kind: StoreKind) {
        self.store(kind).borrow_mut().reject_clear = true;
    }

    /// Make removal of one key fail
    pub fn fail_removal_of(&self, kind: StoreKind, key: &str) {
        self.store(kind)
            .borrow_mut()
            .failing_removals
            .push(String::from(key));
    }

    // === Page Tree ===

    fn push_node(&self, node: MockNode) -> MockNodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        MockNodeId((nodes.len() - 1) as u32)
    }

    /// Append an element to the document, answering to the given selectors
    pub fn add_element(&self, selectors: &[&str]) -> MockNodeId {
        self.push_node(MockNode {
            selectors: selectors.iter().map(|s| String::from(*s)).collect(),
            attributes: BTreeMap::new(),
            text: None,
            component: None,
            attached: true,
        })
    }

    /// Append an element inside a component's encapsulated root
    pub fn add_component_child(&self, component: MockNodeId, selectors: &[&str]) -> MockNodeId {
        self.push_node(MockNode {
            selectors: selectors.iter().map(|s| String::from(*s)).collect(),
            attributes: BTreeMap::new(),
            text: None,
            component: Some(component),
            attached: true,
        })
    }

    /// Append a text node to the document body
    pub fn add_text(&self, text: &str) -> MockNodeId {
        self.push_node(MockNode {
            selectors: Vec::new(),
            attributes: BTreeMap::new(),
            text: Some(String::from(text)),
            component: None,
            attached: true,
        })
    }

    /// Append a text node inside a component's encapsulated root
    pub fn add_component_text(&self, component: MockNodeId, text: &str) -> MockNodeId {
        self.push_node(MockNode {
            selectors: Vec::new(),
            attributes: BTreeMap::new(),
            text: Some(String::from(text)),
            component: Some(component),
            attached: true,
        })
    }

    /// Set an attribute directly, as external code mutating the tree would
    pub fn mark(&self, node: MockNodeId, name: &str, value: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(node.0 as usize) {
            n.attributes.insert(String::from(name), String::from(value));
        }
    }

    pub fn attribute(&self, node: MockNodeId, name: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    pub fn is_attached(&self, node: MockNodeId) -> bool {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .map(|n| n.attached)
            .unwrap_or(false)
    }

    pub fn text_of(&self, node: MockNodeId) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .and_then(|n| n.text.clone())
    }

    /// Attached elements carrying `name=value`, in document order
    pub fn attached_with_attribute(&self, name: &str, value: &str) -> Vec<MockNodeId> {
        self.nodes
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.attached && n.attributes.get(name).map(String::as_str) == Some(value))
            .map(|(i, _)| MockNodeId(i as u32))
            .collect()
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.set(fail);
    }

    pub fn set_fail_node_removals(&self, fail: bool) {
        self.fail_node_removals.set(fail);
    }

    /// Simulate a user click. Returns false if no handler is bound.
    pub fn click(&self, node: MockNodeId) -> bool {
        let handler = self.click_handlers.borrow_mut().remove(&node.0);
        match handler {
            Some(mut handler) => {
                handler();
                self.click_handlers.borrow_mut().insert(node.0, handler);
                true
            }
            None => false,
        }
    }

    pub fn has_click_handler(&self, node: MockNodeId) -> bool {
        self.click_handlers.borrow().contains_key(&node.0)
    }

    // === Navigation ===

    pub fn location(&self) -> String {
        self.location.borrow().clone()
    }

    pub fn set_location(&self, path: &str) {
        *self.location.borrow_mut() = String::from(path);
    }

    /// Let the simulated router act on dispatched intents
    pub fn set_router_follows(&self, follows: bool) {
        self.router_follows.set(follows);
    }

    pub fn set_fail_dispatch(&self, fail: bool) {
        self.fail_dispatch.set(fail);
    }

    pub fn intents(&self) -> Vec<NavigationIntent> {
        self.intents.borrow().clone()
    }

    pub fn hard_navigations(&self) -> Vec<String> {
        self.hard_navigations.borrow().clone()
    }

    // === Dialogs ===

    pub fn set_confirm_answer(&self, answer: bool) {
        self.confirm_answer.set(answer);
    }

    pub fn confirms(&self) -> Vec<String> {
        self.confirms.borrow().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    // === Scheduling ===

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn timer_delays(&self) -> Vec<u32> {
        self.timers.borrow().iter().map(|(d, _)| *d).collect()
    }

    /// Fire every scheduled timer, including ones scheduled while firing
    pub fn run_timers(&self) -> usize {
        let mut fired = 0;
        loop {
            let due = std::mem::take(&mut *self.timers.borrow_mut());
            if due.is_empty() {
                return fired;
            }
            for (_, task) in due {
                task();
                fired += 1;
            }
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Drive every spawned task to completion, in spawn order
    pub async fn run_tasks(&self) -> usize {
        let mut completed = 0;
        loop {
            let next = {
                let mut tasks = self.tasks.borrow_mut();
                if tasks.is_empty() {
                    None
                } else {
                    Some(tasks.remove(0))
                }
            };
            match next {
                Some(task) => {
                    task.await;
                    completed += 1;
                }
                None => return completed,
            }
        }
    }

    // === Log ===

    pub fn get_log(&self) -> Vec<(LogLevel, String)> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// Check if a specific message was logged
    pub fn has_log_containing(&self, substr: &str) -> bool {
        self.log.borrow().iter().any(|(_, msg)| msg.contains(substr))
    }

    /// Messages logged at `Warn` or above
    pub fn warnings(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter(|(level, _)| *level >= LogLevel::Warn)
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `[name="value"]`, unescaping `\"` and `\\` in the value
fn parse_attribute_selector(selector: &str) -> Option<(String, String)> {
    let inner = selector.strip_prefix('[')?.strip_suffix(']')?;
    let (name, quoted) = inner.split_once('=')?;
    let quoted = quoted.strip_prefix('"')?.strip_suffix('"')?;

    let mut value = String::new();
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            value.push(chars.next()?);
        } else {
            value.push(c);
        }
    }
    Some((String::from(name), value))
}

impl Host for MockHost {
    type Node = MockNodeId;

    fn store_get(&self, store: StoreKind, key: &str) -> Result<Option<String>, HostError> {
        let s = self.store(store).borrow();
        if s.unavailable {
            return Err(HostError::StorageUnavailable);
        }
        Ok(s.entries.get(key).cloned())
    }

    fn store_set(&self, store: StoreKind, key: &str, value: &str) -> Result<(), HostError> {
        let mut s = self.store(store).borrow_mut();
        if s.unavailable {
            return Err(HostError::StorageUnavailable);
        }
        if s.reject_writes {
            return Err(HostError::StorageError(String::from("quota exceeded")));
        }
        s.entries.insert(String::from(key), String::from(value));
        Ok(())
    }

    fn store_remove(&self, store: StoreKind, key: &str) -> Result<(), HostError> {
        let mut s = self.store(store).borrow_mut();
        if s.unavailable {
            return Err(HostError::StorageUnavailable);
        }
        if s.failing_removals.iter().any(|k| k == key) {
            return Err(HostError::StorageError(format!("cannot remove {}", key)));
        }
        s.entries.remove(key);
        Ok(())
    }

    fn store_clear(&self, store: StoreKind) -> Result<(), HostError> {
        let mut s = self.store(store).borrow_mut();
        if s.unavailable {
            return Err(HostError::StorageUnavailable);
        }
        if s.reject_clear {
            return Err(HostError::StorageError(String::from("clear rejected")));
        }
        s.entries.clear();
        Ok(())
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Self::Node>, HostError> {
        if self.fail_queries.get() {
            return Err(HostError::InvalidSelector(String::from(selector)));
        }
        let attribute = parse_attribute_selector(selector);
        let nodes = self.nodes.borrow();
        Ok(nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.attached && !n.is_text())
            .filter(|(_, n)| match &attribute {
                Some((name, value)) => n.attributes.get(name) == Some(value),
                None => n.selectors.iter().any(|s| s == selector),
            })
            .map(|(i, _)| MockNodeId(i as u32))
            .collect())
    }

    fn query_in_component(
        &self,
        component: &Self::Node,
        selector: &str,
    ) -> Result<Option<Self::Node>, HostError> {
        if self.fail_queries.get() {
            return Err(HostError::InvalidSelector(String::from(selector)));
        }
        let nodes = self.nodes.borrow();
        Ok(nodes
            .iter()
            .enumerate()
            .find(|(_, n)| {
                n.attached
                    && n.component == Some(*component)
                    && n.selectors.iter().any(|s| s == selector)
            })
            .map(|(i, _)| MockNodeId(i as u32)))
    }

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), HostError> {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(node.0 as usize) {
            Some(n) if n.attached && !n.is_text() => {
                n.attributes.insert(String::from(name), String::from(value));
                Ok(())
            }
            _ => Err(HostError::NodeNotFound),
        }
    }

    fn remove_node(&self, node: &Self::Node) -> Result<(), HostError> {
        if self.fail_node_removals.get() {
            return Err(HostError::DomError(String::from("removal blocked")));
        }
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(node.0 as usize) {
            Some(n) if n.attached => n.attached = false,
            _ => return Err(HostError::NodeNotFound),
        }
        // Children of the component's root go with it
        for child in nodes.iter_mut().filter(|n| n.component == Some(*node)) {
            child.attached = false;
        }
        Ok(())
    }

    fn text_nodes(&self) -> Result<Vec<Self::Node>, HostError> {
        if self.fail_queries.get() {
            return Err(HostError::DomError(String::from("tree walker unavailable")));
        }
        Ok(self
            .nodes
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.attached && n.is_text())
            .map(|(i, _)| MockNodeId(i as u32))
            .collect())
    }

    fn text_content(&self, node: &Self::Node) -> Option<String> {
        self.text_of(*node)
    }

    fn set_text_content(&self, node: &Self::Node, text: &str) -> Result<(), HostError> {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(node.0 as usize) {
            Some(n) if n.attached => {
                n.text = Some(String::from(text));
                Ok(())
            }
            _ => Err(HostError::NodeNotFound),
        }
    }

    fn bind_click(&self, node: &Self::Node, handler: ClickHandler) -> Result<(), HostError> {
        if !self.is_attached(*node) {
            return Err(HostError::NodeNotFound);
        }
        self.click_handlers.borrow_mut().insert(node.0, handler);
        Ok(())
    }

    fn location_path(&self) -> String {
        self.location()
    }

    fn dispatch_navigation(&self, intent: &NavigationIntent) -> Result<(), HostError> {
        if self.fail_dispatch.get() {
            return Err(HostError::NavigationError(String::from("dispatch failed")));
        }
        self.intents.borrow_mut().push(intent.clone());
        if self.router_follows.get() {
            self.set_location(&intent.route);
        }
        Ok(())
    }

    fn hard_navigate(&self, route: &str) -> Result<(), HostError> {
        self.hard_navigations.borrow_mut().push(String::from(route));
        self.set_location(route);
        Ok(())
    }

    fn confirm(&self, message: &str) -> bool {
        self.confirms.borrow_mut().push(String::from(message));
        self.confirm_answer.get()
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(String::from(message));
    }

    fn schedule(&self, delay_ms: u32, task: Deferred) {
        self.timers.borrow_mut().push((delay_ms, task));
    }

    fn spawn_local(&self, task: LocalTask) {
        self.tasks.borrow_mut().push(task);
    }

    fn log(&self, level: LogLevel, msg: &str) {
        self.log.borrow_mut().push((level, String::from(msg)));
    }
}

/// Scripted behavior of [`MockAuth`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockAuthBehavior {
    /// Answer `{ success: true }`
    Succeed,
    /// Answer `{ success: false }` with an optional message
    Reject(Option<String>),
    /// Fail as if the provider threw
    Fail(String),
    /// Behave as if the provider is not loaded
    Unavailable,
}

/// Mock authentication collaborator
pub struct MockAuth {
    behavior: RefCell<MockAuthBehavior>,
    calls: Cell<u32>,
}

impl MockAuth {
    pub fn new(behavior: MockAuthBehavior) -> Self {
        Self {
            behavior: RefCell::new(behavior),
            calls: Cell::new(0),
        }
    }

    pub fn set_behavior(&self, behavior: MockAuthBehavior) {
        *self.behavior.borrow_mut() = behavior;
    }

    /// Number of logout requests received
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl Default for MockAuth {
    fn default() -> Self {
        Self::new(MockAuthBehavior::Succeed)
    }
}

impl AuthProvider for MockAuth {
    fn logout_user(&self) -> AuthFuture {
        self.calls.set(self.calls.get() + 1);
        let behavior = self.behavior.borrow().clone();
        Box::pin(async move {
            match behavior {
                MockAuthBehavior::Succeed => Ok(RemoteLogoutResponse {
                    success: true,
                    message: None,
                }),
                MockAuthBehavior::Reject(message) => Ok(RemoteLogoutResponse {
                    success: false,
                    message,
                }),
                MockAuthBehavior::Fail(e) => Err(HostError::RemoteError(e)),
                MockAuthBehavior::Unavailable => Err(HostError::ProviderUnavailable),
            }
        })
    }
}
