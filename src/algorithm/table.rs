//! The precomputed dispatch table.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::error::{SimError, SimResult};
use crate::message::IncomingMessage;
use crate::node::NodeAccess;

use super::{Action, NodeAlgorithm, Status};

/// An action bound in the table.
pub type Handler<A> =
    fn(&A, &mut NodeAccess<'_, <A as NodeAlgorithm>::Status>, &IncomingMessage<'_>);

/// Maps (status, event) to handlers.
///
/// Filled once by [`NodeAlgorithm::actions`] and validated before the run
/// starts; lookups afterwards never fail, they just fall through to
/// defaults.
pub struct ActionTable<A: NodeAlgorithm> {
    by_header: BTreeMap<(A::Status, String), Handler<A>>,
    by_action: BTreeMap<(A::Status, Action), Handler<A>>,
    defaults: BTreeMap<A::Status, Handler<A>>,
    global_default: Option<Handler<A>>,
    conflicts: Vec<String>,
}

impl<A: NodeAlgorithm> Default for ActionTable<A> {
    fn default() -> Self {
        ActionTable {
            by_header: BTreeMap::new(),
            by_action: BTreeMap::new(),
            defaults: BTreeMap::new(),
            global_default: None,
            conflicts: Vec::new(),
        }
    }
}

impl<A: NodeAlgorithm> ActionTable<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an action family for `status`.
    pub fn on(&mut self, status: A::Status, action: Action, handler: Handler<A>) -> &mut Self {
        if self.by_action.insert((status, action), handler).is_some() {
            self.conflicts.push(format!("{:?} / {:?} bound twice", status, action));
        }
        self
    }

    /// Bind a handler for messages carrying `header` received in `status`.
    /// Takes precedence over the `Receiving` binding.
    pub fn on_header(
        &mut self,
        status: A::Status,
        header: impl Into<String>,
        handler: Handler<A>,
    ) -> &mut Self {
        let header = header.into();
        if self.by_header.insert((status, header.clone()), handler).is_some() {
            self.conflicts.push(format!("{:?} / '{}' bound twice", status, header));
        }
        self
    }

    /// Fallback for any event in `status`.
    pub fn default_for(&mut self, status: A::Status, handler: Handler<A>) -> &mut Self {
        if self.defaults.insert(status, handler).is_some() {
            self.conflicts.push(format!("default for {:?} bound twice", status));
        }
        self
    }

    /// Fallback for any event in any status.
    pub fn global_default(&mut self, handler: Handler<A>) -> &mut Self {
        if self.global_default.replace(handler).is_some() {
            self.conflicts.push("global default bound twice".into());
        }
        self
    }

    /// Find the handler for an event, most specific binding first.
    pub fn lookup(&self, status: A::Status, action: Action, header: &str) -> Option<Handler<A>> {
        let by_header = match action {
            Action::Receiving => self.by_header.get(&(status, header.to_owned())),
            _ => None,
        };
        by_header
            .or_else(|| self.by_action.get(&(status, action)))
            .or_else(|| self.defaults.get(&status))
            .copied()
            .or(self.global_default)
    }

    /// `true` if anything at all would handle events in `status`.
    pub fn handles(&self, status: A::Status) -> bool {
        self.global_default.is_some()
            || self.defaults.contains_key(&status)
            || self.by_action.keys().any(|(s, _)| *s == status)
            || self.by_header.keys().any(|(s, _)| *s == status)
    }

    fn bound_statuses(&self) -> BTreeSet<A::Status> {
        self.by_header
            .keys()
            .map(|(s, _)| *s)
            .chain(self.by_action.keys().map(|(s, _)| *s))
            .chain(self.defaults.keys().copied())
            .collect()
    }

    /// Check the table against the algorithm's declared statuses.
    pub(crate) fn validate(&self, initial: &[A::Status], terminal: &[A::Status]) -> SimResult<()> {
        let all = A::Status::all();
        if all.is_empty() {
            return Err(SimError::InvalidStatusTable("no statuses declared".into()));
        }
        let declared: BTreeSet<A::Status> = all.iter().copied().collect();
        if declared.len() != all.len() {
            return Err(SimError::InvalidStatusTable(
                "a status is listed more than once".into(),
            ));
        }
        if let Some(conflict) = self.conflicts.first() {
            return Err(SimError::InvalidStatusTable(conflict.clone()));
        }
        if let Some(stray) = self.bound_statuses().into_iter().find(|s| !declared.contains(s)) {
            return Err(SimError::InvalidStatusTable(format!(
                "{:?} has actions but is not a declared status",
                stray
            )));
        }
        for (role, set) in [("initial", initial), ("terminal", terminal)] {
            if let Some(stray) = set.iter().find(|s| !declared.contains(*s)) {
                return Err(SimError::InvalidStatusTable(format!(
                    "{} status {:?} is not a declared status",
                    role, stray
                )));
            }
        }
        for status in all {
            if !self.handles(*status) && !terminal.contains(status) {
                warn!(status = ?status, "status has no actions and is not terminal");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::network::Network;
    use crate::node::{Node, NodeId};
    use crate::time::VirtualTime;
    use serde_json::Value;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Light {
        Red,
        Green,
    }

    impl Status for Light {
        fn all() -> &'static [Self] {
            &[Light::Red, Light::Green]
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    enum Twice {
        A,
    }

    impl Status for Twice {
        fn all() -> &'static [Self] {
            &[Twice::A, Twice::A]
        }
    }

    struct Lights;

    impl Lights {
        fn go(&self, node: &mut NodeAccess<'_, Light>, _: &IncomingMessage<'_>) {
            node.set_status(Light::Green);
        }

        fn stop(&self, node: &mut NodeAccess<'_, Light>, _: &IncomingMessage<'_>) {
            node.set_status(Light::Red);
        }

        fn noop(&self, _: &mut NodeAccess<'_, Light>, _: &IncomingMessage<'_>) {}
    }

    impl NodeAlgorithm for Lights {
        type Status = Light;

        fn actions(&self, table: &mut ActionTable<Self>) {
            table
                .on(Light::Red, Action::Receiving, Self::noop)
                .on_header(Light::Red, "GO", Self::go)
                .default_for(Light::Green, Self::stop);
        }

        fn initial_status(&self) -> Light {
            Light::Red
        }
    }

    struct Broken;

    impl NodeAlgorithm for Broken {
        type Status = Twice;

        fn actions(&self, _: &mut ActionTable<Self>) {}

        fn initial_status(&self) -> Twice {
            Twice::A
        }
    }

    fn table() -> ActionTable<Lights> {
        let mut table = ActionTable::new();
        Lights.actions(&mut table);
        table
    }

    /// Run `handler` on a lone node in `from` and return its new status.
    fn apply(handler: Handler<Lights>, from: Light) -> Light {
        let net = Network::with_nodes(1);
        let mut node = Node::new(NodeId::new(0), from);
        let mut next_alarm = 0;
        let payload = Value::Null;
        let msg =
            IncomingMessage::new(MessageKind::Normal, "", &payload, None, VirtualTime::ZERO, None);
        let mut access = NodeAccess::new(&mut node, &net, VirtualTime::ZERO, 1.0, &mut next_alarm);
        handler(&Lights, &mut access, &msg);
        drop(access);
        node.status()
    }

    #[test]
    fn test_lookup_prefers_header_binding() {
        let t = table();
        let go = t.lookup(Light::Red, Action::Receiving, "GO").unwrap();
        let other = t.lookup(Light::Red, Action::Receiving, "WAIT").unwrap();
        assert_eq!(apply(go, Light::Red), Light::Green);
        assert_eq!(apply(other, Light::Red), Light::Red);
    }

    #[test]
    fn test_lookup_falls_back_to_status_default() {
        let t = table();
        let h = t.lookup(Light::Green, Action::Alarm, "whatever").unwrap();
        assert_eq!(apply(h, Light::Green), Light::Red);
        // Headers only steer receiving actions.
        assert!(t.lookup(Light::Red, Action::Spontaneously, "GO").is_none());
    }

    #[test]
    fn test_global_default_catches_the_rest() {
        let mut t = table();
        assert!(t.lookup(Light::Red, Action::Alarm, "").is_none());
        t.global_default(Lights::go);
        let h = t.lookup(Light::Red, Action::Alarm, "").unwrap();
        assert_eq!(apply(h, Light::Red), Light::Green);
    }

    #[test]
    fn test_validate_ok() {
        assert!(table().validate(&[Light::Red], &[Light::Green]).is_ok());
    }

    #[test]
    fn test_validate_rejects_double_binding() {
        let mut t = table();
        t.on_header(Light::Red, "GO", Lights::stop);
        let err = t.validate(&[Light::Red], &[]).unwrap_err();
        assert!(matches!(err, SimError::InvalidStatusTable(ref m) if m.contains("'GO'")));
    }

    #[test]
    fn test_validate_rejects_duplicate_statuses() {
        let t: ActionTable<Broken> = ActionTable::new();
        assert!(t.validate(&[Twice::A], &[]).is_err());
    }

    #[test]
    fn test_action_for_kind() {
        assert_eq!(Action::for_kind(MessageKind::Normal), Action::Receiving);
        assert_eq!(Action::for_kind(MessageKind::Initialization), Action::Spontaneously);
        assert_eq!(Action::for_kind(MessageKind::Alarm), Action::Alarm);
    }
}
