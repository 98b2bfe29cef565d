//! Side drawers that screens register while they are mounted.
//!
//! A screen receives a [`DrawerHost`] capability, registers its drawers on
//! construction and unregisters them when dropped. At most one drawer is
//! open at a time.

use parking_lot::RwLock;

/// Drawers the Logs Insights screen contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DrawerId {
    /// Recently run queries.
    History,
    /// The saved query library.
    SavedQueries,
}

impl DrawerId {
    /// Display title for the drawer trigger.
    pub fn title(&self) -> &'static str {
        match self {
            Self::History => "History",
            Self::SavedQueries => "Saved Queries",
        }
    }
}

/// Capability to register and open drawers.
pub trait DrawerHost: Send + Sync {
    /// Make a drawer available.
    fn register(&self, drawers: &[DrawerId]);

    /// Remove drawers; an open one among them is closed.
    fn unregister(&self, drawers: &[DrawerId]);

    /// The open drawer, if any.
    fn active(&self) -> Option<DrawerId>;

    /// Open a registered drawer, or close with `None`.
    fn set_active(&self, drawer: Option<DrawerId>);
}

#[derive(Debug, Default)]
struct DockState {
    registered: Vec<DrawerId>,
    active: Option<DrawerId>,
}

/// In-memory drawer host.
#[derive(Debug, Default)]
pub struct DrawerDock {
    state: RwLock<DockState>,
}

impl DrawerDock {
    /// Create an empty dock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered drawers in registration order.
    pub fn registered(&self) -> Vec<DrawerId> {
        self.state.read().registered.clone()
    }

    /// Check if a drawer is registered.
    pub fn is_registered(&self, drawer: DrawerId) -> bool {
        self.state.read().registered.contains(&drawer)
    }
}

impl DrawerHost for DrawerDock {
    fn register(&self, drawers: &[DrawerId]) {
        let mut state = self.state.write();
        for drawer in drawers {
            if !state.registered.contains(drawer) {
                state.registered.push(*drawer);
            }
        }
        tracing::trace!(drawers = ?drawers, "Drawers registered");
    }

    fn unregister(&self, drawers: &[DrawerId]) {
        let mut state = self.state.write();
        state.registered.retain(|d| !drawers.contains(d));
        if state.active.is_some_and(|a| drawers.contains(&a)) {
            state.active = None;
        }
        tracing::trace!(drawers = ?drawers, "Drawers unregistered");
    }

    fn active(&self) -> Option<DrawerId> {
        self.state.read().active
    }

    fn set_active(&self, drawer: Option<DrawerId>) {
        let mut state = self.state.write();
        match drawer {
            Some(d) if !state.registered.contains(&d) => {
                tracing::debug!(drawer = ?d, "Ignoring request to open unregistered drawer");
            }
            _ => state.active = drawer,
        }
    }
}
