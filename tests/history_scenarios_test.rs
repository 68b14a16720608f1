//! End-to-end navigation scenarios through the public API.
//!
//! Each test plays the event stream a flow engine would publish for a
//! realistic user journey and checks history and the navigate output.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::Map;

use view_history::bus::{InMemoryFlowScope, RecordingSink};
use view_history::history::{
    Capacity, FlowEnd, FlowTransition, HistoryConfig, HistoryEvent, HistoryPolicy, JumpStep,
    NavigationHistory, StateDef,
};

struct Engine {
    history: NavigationHistory,
    scope: Arc<InMemoryFlowScope>,
    sink: Arc<RecordingSink>,
}

impl Engine {
    fn new(max_size: Capacity) -> Self {
        let scope = Arc::new(InMemoryFlowScope::new());
        let sink = Arc::new(RecordingSink::new());
        let mut history = NavigationHistory::new(
            HistoryConfig {
                back_event: "nav:back".to_string(),
                max_size,
            },
            scope.clone(),
            sink.clone(),
        );
        history.start();
        Self {
            history,
            scope,
            sink,
        }
    }

    fn view(&mut self, flow: &str, id: &str, node: &str, path: &[JumpStep]) {
        self.history.handle(HistoryEvent::Transition(
            FlowTransition::new(flow, id, node, StateDef::view(HistoryPolicy::Default))
                .with_path(path.to_vec()),
        ));
    }

    fn enter(
        &mut self,
        flow: &str,
        id: &str,
        node: &str,
        sub: &str,
        history: HistoryPolicy,
        modal: bool,
    ) {
        self.history.handle(HistoryEvent::Transition(FlowTransition::new(
            flow,
            id,
            node,
            StateDef::flow(sub, history, modal),
        )));
    }

    fn finish(&mut self, flow: &str, id: &str) {
        self.history.handle(HistoryEvent::Transition(FlowTransition::new(
            flow,
            id,
            "end",
            StateDef::End,
        )));
        self.history
            .handle(HistoryEvent::FlowEnd(FlowEnd::new(flow, id)));
    }

    fn back(&mut self) -> bool {
        self.history
            .handle(HistoryEvent::Named {
                name: "nav:back".to_string(),
                options: Map::new(),
            })
            .is_some()
    }

    fn nodes(&self) -> Vec<String> {
        self.history
            .history()
            .iter()
            .map(|r| r.node_name().to_string())
            .collect()
    }
}

#[test]
fn test_three_views_with_limit_two() {
    let mut engine = Engine::new(Capacity::Limited(2));
    engine.view("main", "m1", "t1", &[]);
    engine.view("main", "m1", "t2", &[]);
    engine.view("main", "m1", "t3", &[]);
    assert_eq!(engine.nodes(), vec!["t1", "t2"]);

    assert!(engine.back());
    let request = &engine.sink.requests()[0];
    assert_eq!(request.jump.last().unwrap().node_name, "t2");
    assert_eq!(engine.nodes(), vec!["t1"]);
    assert!(engine.history.current_transition().is_none());
}

#[test]
fn test_modal_login_disappears_from_history() {
    let mut engine = Engine::new(Capacity::Unbounded);
    engine.view("shop", "s1", "catalog", &[]);
    engine.view("shop", "s1", "product", &[]);
    engine.enter("shop", "s1", "login", "login", HistoryPolicy::Default, true);

    let login_path = [JumpStep::new("s1", "login").with_modal(true)];
    engine.view("login", "l1", "credentials", &login_path);
    engine.view("login", "l1", "two-factor", &login_path);
    engine.finish("login", "l1");
    assert_eq!(engine.nodes(), vec!["catalog", "product"]);

    engine.view("shop", "s1", "checkout", &[]);
    assert!(engine.back());

    let request = &engine.sink.requests()[0];
    assert_eq!(request.jump.len(), 1);
    assert_eq!(request.jump[0].node_name, "product");
    assert_eq!(engine.nodes(), vec!["catalog"]);
}

#[test]
fn test_back_into_finished_subflow_uses_captured_scope() {
    let mut engine = Engine::new(Capacity::Unbounded);
    engine.scope.put("app-1", r#"{"user":"ada"}"#);
    engine.view("app", "app-1", "dashboard", &[]);
    engine.enter("app", "app-1", "settings", "settings", HistoryPolicy::Default, false);

    engine.scope.put("settings-1", r#"{"tab":"privacy"}"#);
    let path = [JumpStep::new("app-1", "settings")];
    engine.view("settings", "settings-1", "general", &path);
    engine.view("settings", "settings-1", "privacy", &path);
    engine.finish("settings", "settings-1");
    engine.scope.remove("settings-1");

    engine.view("app", "app-1", "dashboard", &[]);
    assert_eq!(engine.nodes(), vec!["dashboard", "general", "privacy"]);

    assert!(engine.back());
    let request = &engine.sink.requests()[0];
    assert_eq!(request.jump.len(), 2);
    assert_eq!(request.jump[0].node_name, "settings");
    assert_eq!(request.jump[0].input.as_deref(), Some(r#"{"user":"ada"}"#));
    assert_eq!(request.jump[0].force_flow_id.as_deref(), Some("app-1"));
    assert_eq!(request.jump[1].node_name, "privacy");
    assert_eq!(request.jump[1].input.as_deref(), Some(r#"{"tab":"privacy"}"#));
    assert_eq!(request.jump[1].force_flow_id.as_deref(), Some("settings-1"));
}

#[test]
fn test_back_with_nothing_known_sends_empty_input() {
    let mut engine = Engine::new(Capacity::Unbounded);
    let path = [JumpStep::new("gone-1", "wizard")];
    engine.view("wizard", "gone-2", "step", &path);
    engine.view("wizard", "gone-2", "next", &path);

    assert!(engine.back());
    let request = &engine.sink.requests()[0];
    assert!(request.jump.iter().all(|jump| jump.input.is_none()));
}

#[test]
fn test_repeated_back_walks_to_start() {
    let mut engine = Engine::new(Capacity::Unbounded);
    for node in ["a", "b", "c", "d"] {
        engine.view("main", "m1", node, &[]);
    }

    assert!(engine.back());
    assert!(engine.back());
    assert!(engine.back());
    assert!(!engine.back());

    let visited: Vec<String> = engine
        .sink
        .requests()
        .iter()
        .map(|r| r.jump[0].node_name.clone())
        .collect();
    assert_eq!(visited, vec!["c", "b", "a"]);
}

#[test]
fn test_snapshot_survives_new_instance() {
    let mut engine = Engine::new(Capacity::Unbounded);
    engine.scope.put("sub-1", "captured");
    engine.view("sub", "sub-1", "form", &[JumpStep::new("m1", "sub")]);
    engine.finish("sub", "sub-1");
    engine.view("main", "m1", "home", &[]);

    let snapshot = engine.history.serialize().unwrap();

    let mut reloaded = Engine::new(Capacity::Unbounded);
    reloaded.history.deserialize(&snapshot).unwrap();
    assert!(reloaded.back());

    let request = &reloaded.sink.requests()[0];
    assert_eq!(request.jump[1].node_name, "form");
    assert_eq!(request.jump[1].input.as_deref(), Some("captured"));
}
