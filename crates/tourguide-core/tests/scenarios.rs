//! End-to-end lifecycle scenarios against a snapshot page.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use tourguide_core::events::{
    STEP_SELECTOR_FAILED, TOUR_COMPLETED, TOUR_DISMISSED, TOUR_SHOWN,
};
use tourguide_core::memory::{
    MemoryStore, RecordingRenderer, RecordingTelemetry, StaticFlags, StaticTourSource,
};
use tourguide_core::{Collaborators, ManagerConfig, OutcomeKeys, TourManager, TourState};
use tourguide_dom::{PageSnapshot, SnapshotDom, SnapshotNode};
use tourguide_protocols::{
    AutoData, DismissReason, ElementSelector, KeyValueStore, NodeId, SelectorEntry,
    SelectorGroup, Step, Tour,
};
use tourguide_resolver::find_element;

struct Page {
    dom: Arc<SnapshotDom>,
    body: NodeId,
    save: NodeId,
    export: NodeId,
    help: NodeId,
}

fn page() -> Page {
    let mut page = PageSnapshot::new("https://app.example.com/reports");
    let body = page.append(None, SnapshotNode::new("body"));
    let toolbar = page.append(Some(body), SnapshotNode::new("div").with_class("toolbar"));
    let save = page.append(
        Some(toolbar),
        SnapshotNode::new("button").with_id("save").with_class("primary"),
    );
    let export = page.append(
        Some(toolbar),
        SnapshotNode::new("button").with_id("export").with_text("Export"),
    );
    let help = page.append(Some(body), SnapshotNode::new("a").with_id("help"));
    Page {
        dom: Arc::new(SnapshotDom::new(page)),
        body,
        save,
        export,
        help,
    }
}

struct Env {
    store: Arc<MemoryStore>,
    telemetry: Arc<RecordingTelemetry>,
    renderer: Arc<RecordingRenderer>,
    manager: TourManager,
}

fn env(dom: Arc<SnapshotDom>, store: MemoryStore, tours: Vec<Tour>) -> Env {
    let store = Arc::new(store);
    let telemetry = Arc::new(RecordingTelemetry::new());
    let renderer = Arc::new(RecordingRenderer::new());
    let manager = TourManager::new(
        Collaborators {
            dom,
            source: Arc::new(StaticTourSource::new(tours)),
            store: store.clone(),
            flags: Arc::new(StaticFlags::new()),
            telemetry: telemetry.clone(),
            renderer: renderer.clone(),
        },
        ManagerConfig::default(),
    )
    .unwrap();
    Env {
        store,
        telemetry,
        renderer,
        manager,
    }
}

#[tokio::test]
async fn test_future_start_date_is_never_eligible() {
    let p = page();
    let tour = Tour::new("launch", vec![Step::element("s", "#save")])
        .with_dates(Some(Utc::now() + Duration::days(3)), None);
    let e = env(p.dom.clone(), MemoryStore::new(), vec![tour.clone()]);

    assert!(e.manager.check_eligibility(&tour).is_err());
    e.manager.tick().await;
    e.manager.tick().await;
    assert!(e.manager.state().is_idle());
    assert_eq!(e.renderer.render_count(), 0);
}

#[tokio::test]
async fn test_element_removed_mid_tour_dismisses() {
    let p = page();
    let tour = Tour::new(
        "reports",
        vec![
            Step::element("save", "#save"),
            Step::element("export", "#export"),
            Step::modal("done"),
        ],
    );
    let e = env(p.dom.clone(), MemoryStore::new(), vec![tour]);
    e.manager.tick().await;
    assert_eq!(e.renderer.last().unwrap().target, Some(p.save));

    p.dom.remove(p.export);
    e.renderer.actions().unwrap().next();

    assert!(matches!(e.manager.state(), TourState::Idle));
    let failures = e.telemetry.named(STEP_SELECTOR_FAILED);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["step_index"], json!(1));
    assert_eq!(failures[0]["phase"], json!("runtime"));
    let dismissed = e.telemetry.named(TOUR_DISMISSED);
    assert_eq!(dismissed.len(), 1);
    assert_eq!(
        dismissed[0]["dismiss_reason"],
        json!(DismissReason::ElementUnavailable.as_str())
    );
    assert_eq!(e.telemetry.count(TOUR_COMPLETED), 0);
}

#[tokio::test]
async fn test_dismissed_tour_keeps_working_trigger() {
    let p = page();
    let keys = OutcomeKeys::default();
    let store = MemoryStore::new()
        .with(keys.dismissed("help"), json!(true))
        .with(keys.dismissed("help-inline"), json!(true));
    let triggered = Tour::new("help", vec![Step::modal("m")]).with_trigger_selector("#help");
    let inline = Tour::new("help-inline", vec![Step::modal("m")]);
    let e = env(p.dom.clone(), store, vec![triggered, inline]);
    assert!(e.store.get_bool(&e.manager.keys().dismissed("help")));

    e.manager.tick().await;
    e.manager.tick().await;
    assert!(e.manager.state().is_idle());
    assert_eq!(e.renderer.render_count(), 0);
    assert_eq!(e.telemetry.count(TOUR_SHOWN), 0);
    assert_eq!(p.dom.listeners_on(p.help), 1);

    p.dom.click(p.help);
    assert_eq!(e.manager.active_tour().unwrap().id, "help");
    assert_eq!(e.renderer.render_count(), 1);
}

fn inferred_step(id: &str, selector: ElementSelector) -> Step {
    let mut step = Step::element(id, "").with_inference(selector);
    step.selector = None;
    step
}

#[tokio::test]
async fn test_inferred_target_rendered_late_shows_on_later_tick() {
    let p = page();
    let data = AutoData {
        text_groups: vec![],
        notext_groups: vec![SelectorGroup {
            cardinality: 1,
            css_selectors: vec![SelectorEntry::new("#late", 0)],
        }],
    };
    let selector = ElementSelector::new(serde_json::to_string(&data).unwrap());
    let tour = Tour::new("late", vec![inferred_step("s", selector)]);
    let e = env(p.dom.clone(), MemoryStore::new(), vec![tour]);

    e.manager.tick().await;
    assert!(e.manager.state().is_idle());
    assert_eq!(e.renderer.render_count(), 0);
    assert_eq!(e.telemetry.count(TOUR_SHOWN), 0);
    assert_eq!(e.telemetry.count(TOUR_DISMISSED), 0);
    let failures = e.telemetry.named(STEP_SELECTOR_FAILED);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["phase"], json!("validation"));
    assert!(!e.store.get_bool(&e.manager.keys().dismissed("late")));
    assert!(e.store.get(&e.manager.keys().last_seen("product_tour")).is_none());

    let late = p.dom.append(Some(p.body), SnapshotNode::new("div").with_id("late"));
    e.manager.tick().await;
    assert_eq!(e.manager.active_tour().unwrap().id, "late");
    assert_eq!(e.renderer.last().unwrap().target, Some(late));
    assert_eq!(e.telemetry.count(TOUR_SHOWN), 1);
}

fn descriptor(precision: f64) -> ElementSelector {
    let data = AutoData {
        text_groups: vec![],
        notext_groups: vec![
            SelectorGroup {
                cardinality: 1,
                css_selectors: vec![SelectorEntry::new("#renamed-save", 0)],
            },
            SelectorGroup {
                cardinality: 5,
                css_selectors: vec![SelectorEntry::new(".toolbar .primary", 0)],
            },
        ],
    };
    ElementSelector::new(serde_json::to_string(&data).unwrap()).with_precision(precision)
}

#[tokio::test]
async fn test_precision_controls_fallback_to_general_group() {
    let p = page();
    assert_eq!(find_element(p.dom.as_ref(), &descriptor(1.0)), None);
    assert_eq!(find_element(p.dom.as_ref(), &descriptor(0.0)), Some(p.save));

    let fuzzy = |precision| {
        let step = inferred_step("save", descriptor(precision));
        Tour::new(format!("fuzzy-{precision}"), vec![step])
    };

    let strict = env(p.dom.clone(), MemoryStore::new(), vec![fuzzy(1.0)]);
    strict.manager.tick().await;
    assert!(strict.manager.state().is_idle());
    assert_eq!(strict.renderer.render_count(), 0);
    assert_eq!(strict.telemetry.count(TOUR_SHOWN), 0);
    assert_eq!(strict.telemetry.count(TOUR_DISMISSED), 0);
    assert!(!strict.store.get_bool(&strict.manager.keys().dismissed("fuzzy-1")));

    let loose = env(p.dom.clone(), MemoryStore::new(), vec![fuzzy(0.0)]);
    loose.manager.tick().await;
    assert_eq!(loose.renderer.last().unwrap().target, Some(p.save));
}
