use super::*;
use crate::events::{
    BANNER_CONTAINER_FAILED, STEP_COMPLETED, STEP_SELECTOR_FAILED, STEP_SHOWN, TOUR_COMPLETED,
    TOUR_DISMISSED, TOUR_SHOWN,
};
use crate::memory::{
    MemoryStore, RecordingRenderer, RecordingTelemetry, StaticFlags, StaticTourSource,
};
use serde_json::json;
use std::time::Duration;
use tourguide_dom::{PageSnapshot, SnapshotDom, SnapshotNode};
use tourguide_protocols::{DisplayFrequency, NodeId, Progression, Properties, Step, StepType};
use tourguide_runloop::PollConfig;

struct Nodes {
    save: NodeId,
    help: NodeId,
    slot: NodeId,
    first_item: NodeId,
}

struct Harness {
    dom: Arc<SnapshotDom>,
    source: Arc<StaticTourSource>,
    store: Arc<MemoryStore>,
    telemetry: Arc<RecordingTelemetry>,
    renderer: Arc<RecordingRenderer>,
    manager: TourManager,
    nodes: Nodes,
}

impl Harness {
    fn new(tours: Vec<Tour>) -> Self {
        Self::with_config(tours, ManagerConfig::default())
    }

    fn with_config(tours: Vec<Tour>, config: ManagerConfig) -> Self {
        let mut page = PageSnapshot::new("https://app.example.com/dashboard");
        let body = page.append(None, SnapshotNode::new("body"));
        let save = page.append(
            Some(body),
            SnapshotNode::new("button").with_id("save").with_text("Save"),
        );
        let help = page.append(Some(body), SnapshotNode::new("button").with_id("help"));
        let slot = page.append(Some(body), SnapshotNode::new("div").with_id("banner-slot"));
        let list = page.append(Some(body), SnapshotNode::new("ul"));
        let first_item = page.append(Some(list), SnapshotNode::new("li"));
        page.append(Some(list), SnapshotNode::new("li"));
        page.append(Some(body), SnapshotNode::new("div").with_id("drawer").hidden());

        let dom = Arc::new(SnapshotDom::new(page));
        let source = Arc::new(StaticTourSource::new(tours));
        let store = Arc::new(MemoryStore::new());
        let telemetry = Arc::new(RecordingTelemetry::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let collab = Collaborators {
            dom: dom.clone(),
            source: source.clone(),
            store: store.clone(),
            flags: Arc::new(StaticFlags::new()),
            telemetry: telemetry.clone(),
            renderer: renderer.clone(),
        };
        let manager = TourManager::new(collab, config).unwrap();

        Self {
            dom,
            source,
            store,
            telemetry,
            renderer,
            manager,
            nodes: Nodes {
                save,
                help,
                slot,
                first_item,
            },
        }
    }

    fn actions(&self) -> Arc<dyn tourguide_protocols::StepActions> {
        self.renderer.actions().expect("a step was rendered")
    }

    fn showing(&self) -> Option<(String, usize)> {
        match self.manager.state() {
            TourState::Showing {
                tour, step_index, ..
            } => Some((tour.id.clone(), step_index)),
            _ => None,
        }
    }
}

fn modal_tour(id: &str, steps: usize) -> Tour {
    let steps = (0..steps).map(|i| Step::modal(format!("{id}-{i}"))).collect();
    Tour::new(id, steps)
}

#[tokio::test]
async fn test_tick_starts_first_eligible_tour() {
    let h = Harness::new(vec![modal_tour("welcome", 2), modal_tour("billing", 1)]);
    h.manager.tick().await;

    assert_eq!(h.showing(), Some(("welcome".to_string(), 0)));
    let render = h.renderer.last().unwrap();
    assert_eq!(render.step_index, 0);
    assert_eq!(render.total_steps, 2);
    assert_eq!(render.render_reason, RenderReason::Auto);
    assert_eq!(h.telemetry.names(), vec![TOUR_SHOWN, STEP_SHOWN]);
    assert!(h.store.get("last_seen_product_tour").is_some());
}

#[tokio::test]
async fn test_at_most_one_tour_active() {
    let h = Harness::new(vec![modal_tour("welcome", 2), modal_tour("billing", 1)]);
    h.manager.tick().await;
    h.manager.tick().await;

    assert_eq!(h.renderer.render_count(), 1);
    assert_eq!(h.telemetry.count(TOUR_SHOWN), 1);
    assert_eq!(
        h.manager.show_tour("billing").await.unwrap_err().to_string(),
        OrchestratorError::TourActive("welcome".into()).to_string()
    );
}

#[tokio::test]
async fn test_validation_failure_falls_through_to_next_candidate() {
    let broken = Tour::new(
        "broken",
        vec![Step::modal("intro"), Step::element("missing", "#nowhere")],
    );
    let h = Harness::new(vec![broken, modal_tour("fallback", 1)]);
    h.manager.tick().await;

    assert_eq!(h.showing(), Some(("fallback".to_string(), 0)));
    let failures = h.telemetry.named(STEP_SELECTOR_FAILED);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["tour_id"], json!("broken"));
    assert_eq!(failures[0]["step_index"], json!(1));
    assert_eq!(failures[0]["error"], json!("not_found"));
    assert_eq!(failures[0]["phase"], json!("validation"));
    assert!(h.store.get("last_seen_product_tour").is_some());
}

#[tokio::test]
async fn test_hidden_element_fails_validation() {
    let h = Harness::new(vec![Tour::new("t", vec![Step::element("s", "#drawer")])]);
    h.manager.tick().await;

    assert!(h.manager.state().is_idle());
    assert_eq!(h.renderer.render_count(), 0);
    assert_eq!(
        h.telemetry.named(STEP_SELECTOR_FAILED)[0]["error"],
        json!("not_visible")
    );
}

#[tokio::test]
async fn test_multiple_matches_reported_but_shown() {
    let h = Harness::new(vec![Tour::new("t", vec![Step::element("s", "li")])]);
    h.manager.tick().await;

    assert_eq!(h.showing(), Some(("t".to_string(), 0)));
    assert_eq!(h.renderer.last().unwrap().target, Some(h.nodes.first_item));
    let reports = h.telemetry.named(STEP_SELECTOR_FAILED);
    // once during validation, once when the step renders
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|p| p["error"] == json!("multiple_matches")));
    assert_eq!(reports[0]["match_count"], json!(2));
}

#[tokio::test]
async fn test_next_previous_and_complete() {
    let h = Harness::new(vec![modal_tour("t", 3)]);
    h.manager.tick().await;

    h.actions().next();
    assert_eq!(h.showing(), Some(("t".to_string(), 1)));
    h.actions().previous();
    assert_eq!(h.showing(), Some(("t".to_string(), 0)));
    h.actions().next();
    h.actions().next();
    assert_eq!(h.showing(), Some(("t".to_string(), 2)));
    assert_eq!(h.renderer.render_count(), 5);

    h.actions().next();
    assert!(h.manager.state().is_idle());
    assert_eq!(h.store.get("tour_completed_t"), Some(json!(true)));
    assert_eq!(h.renderer.unmounted(), vec!["t".to_string()]);
    assert_eq!(h.telemetry.count(STEP_COMPLETED), 4);
    assert_eq!(h.telemetry.count(TOUR_COMPLETED), 1);
    assert_eq!(
        h.telemetry.person_properties(),
        vec![Properties::from([("tour_completed_t".to_string(), json!(true))])]
    );
}

#[tokio::test]
async fn test_previous_on_first_step_is_noop() {
    let h = Harness::new(vec![modal_tour("t", 2)]);
    h.manager.tick().await;
    h.actions().previous();

    assert_eq!(h.showing(), Some(("t".to_string(), 0)));
    assert_eq!(h.renderer.render_count(), 1);
}

#[tokio::test]
async fn test_stale_actions_are_ignored() {
    let h = Harness::new(vec![modal_tour("t", 3)]);
    h.manager.tick().await;

    let first = h.actions();
    first.next();
    first.next();
    first.dismiss(DismissReason::UserClickedSkip);

    assert_eq!(h.showing(), Some(("t".to_string(), 1)));
    assert_eq!(h.renderer.render_count(), 2);
    assert_eq!(h.telemetry.count(STEP_COMPLETED), 1);
    assert_eq!(h.telemetry.count(TOUR_DISMISSED), 0);
}

#[tokio::test]
async fn test_double_finish_completes_once() {
    let h = Harness::new(vec![modal_tour("t", 1)]);
    h.manager.tick().await;

    let actions = h.actions();
    actions.next();
    actions.next();

    assert_eq!(h.telemetry.count(TOUR_COMPLETED), 1);
    assert_eq!(h.telemetry.person_properties().len(), 1);
    assert_eq!(h.renderer.unmounted().len(), 1);
}

#[tokio::test]
async fn test_finished_tours_are_not_shown_again() {
    let h = Harness::new(vec![modal_tour("done", 1), modal_tour("skipped", 1)]);
    h.manager.tick().await;
    h.actions().next();
    h.manager.tick().await;
    h.actions().dismiss(DismissReason::EscapeKey);
    h.manager.tick().await;

    assert!(h.manager.state().is_idle());
    assert_eq!(h.renderer.render_count(), 2);
}

#[tokio::test]
async fn test_always_frequency_shows_again() {
    let mut tour = modal_tour("tips", 1);
    tour.display_frequency = DisplayFrequency::Always;
    let h = Harness::new(vec![tour]);

    h.manager.tick().await;
    h.actions().next();
    h.manager.tick().await;

    assert_eq!(h.showing(), Some(("tips".to_string(), 0)));
    assert_eq!(h.telemetry.count(TOUR_SHOWN), 2);
}

#[tokio::test]
async fn test_dismiss_records_reason_and_step() {
    let h = Harness::new(vec![modal_tour("t", 3)]);
    h.manager.tick().await;
    h.actions().next();
    h.actions().dismiss(DismissReason::UserClickedOutside);

    assert!(h.manager.state().is_idle());
    assert_eq!(h.store.get("tour_dismissed_t"), Some(json!(true)));
    assert!(h.store.get("tour_completed_t").is_none());
    let dismissed = h.telemetry.named(TOUR_DISMISSED);
    assert_eq!(dismissed.len(), 1);
    assert_eq!(dismissed[0]["dismiss_reason"], json!("user_clicked_outside"));
    assert_eq!(dismissed[0]["step_index"], json!(1));
    assert_eq!(h.renderer.unmounted(), vec!["t".to_string()]);
    assert!(h.telemetry.person_properties().is_empty());
}

#[tokio::test]
async fn test_element_lost_at_runtime_dismisses() {
    let tour = Tour::new("t", vec![Step::modal("intro"), Step::element("save", "#save")]);
    let h = Harness::new(vec![tour]);
    h.manager.tick().await;

    h.dom.remove(h.nodes.save);
    h.actions().next();

    assert!(h.manager.state().is_idle());
    assert_eq!(h.renderer.render_count(), 1);
    let failure = h.telemetry.named(STEP_SELECTOR_FAILED);
    assert_eq!(failure.len(), 1);
    assert_eq!(failure[0]["phase"], json!("runtime"));
    assert_eq!(failure[0]["step_index"], json!(1));
    let dismissed = h.telemetry.named(TOUR_DISMISSED);
    assert_eq!(dismissed[0]["dismiss_reason"], json!("element_unavailable"));
    assert_eq!(h.store.get("tour_dismissed_t"), Some(json!(true)));
}

#[tokio::test]
async fn test_click_progression_advances_on_target_click() {
    let tour = Tour::new(
        "t",
        vec![
            Step::element("save", "#save").with_progression(Progression::Click),
            Step::modal("done"),
        ],
    );
    let h = Harness::new(vec![tour]);
    h.manager.tick().await;

    assert_eq!(h.renderer.last().unwrap().target, Some(h.nodes.save));
    assert_eq!(h.dom.listeners_on(h.nodes.save), 1);

    h.dom.click(h.nodes.save);
    assert_eq!(h.showing(), Some(("t".to_string(), 1)));
    assert_eq!(h.dom.listeners_on(h.nodes.save), 0);

    h.dom.click(h.nodes.save);
    assert_eq!(h.showing(), Some(("t".to_string(), 1)));
}

#[tokio::test]
async fn test_button_progression_leaves_target_alone() {
    let h = Harness::new(vec![Tour::new("t", vec![Step::element("save", "#save")])]);
    h.manager.tick().await;

    h.dom.click(h.nodes.save);
    assert_eq!(h.showing(), Some(("t".to_string(), 0)));
    assert_eq!(h.dom.listener_count(), 0);
}

fn banner(container: &str) -> Step {
    let mut step = Step::modal("banner").with_type(StepType::Banner);
    step.banner_container_selector = Some(container.to_string());
    step
}

#[tokio::test]
async fn test_banner_container_resolves() {
    let h = Harness::new(vec![Tour::new("t", vec![banner("#banner-slot")])]);
    h.manager.tick().await;

    assert_eq!(h.renderer.last().unwrap().container, Some(h.nodes.slot));
    assert_eq!(h.telemetry.count(BANNER_CONTAINER_FAILED), 0);
}

#[tokio::test]
async fn test_banner_container_failure_falls_back() {
    let h = Harness::new(vec![Tour::new("t", vec![banner("#no-slot")])]);
    h.manager.tick().await;

    assert_eq!(h.showing(), Some(("t".to_string(), 0)));
    assert_eq!(h.renderer.last().unwrap().container, None);
    let failures = h.telemetry.named(BANNER_CONTAINER_FAILED);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["selector"], json!("#no-slot"));
    assert_eq!(failures[0]["error"], json!("not_found"));
}

#[tokio::test]
async fn test_survey_response_is_recorded() {
    let survey = Step::modal("rate").with_type(StepType::Survey);
    let h = Harness::new(vec![Tour::new("t", vec![survey, Step::modal("thanks")])]);
    h.manager.tick().await;

    h.actions().submit_survey(json!({ "rating": 5 }));
    assert_eq!(h.showing(), Some(("t".to_string(), 1)));
    let completed = h.telemetry.named(STEP_COMPLETED);
    assert_eq!(completed[0]["survey_response"], json!({ "rating": 5 }));
}

#[tokio::test]
async fn test_trigger_click_starts_tour() {
    let tour = modal_tour("help", 1).with_trigger_selector("#help");
    let h = Harness::new(vec![tour]);
    h.manager.tick().await;

    assert!(h.manager.state().is_idle());
    assert!(h.manager.triggers().contains("help"));

    h.dom.click(h.nodes.help);
    assert_eq!(h.showing(), Some(("help".to_string(), 0)));
    assert_eq!(h.renderer.last().unwrap().render_reason, RenderReason::Trigger);

    // trigger tours ignore completion state
    h.actions().next();
    h.dom.click(h.nodes.help);
    assert_eq!(h.telemetry.count(TOUR_SHOWN), 2);
}

#[tokio::test]
async fn test_trigger_ignored_while_tour_active() {
    let h = Harness::new(vec![
        modal_tour("welcome", 2),
        modal_tour("help", 1).with_trigger_selector("#help"),
    ]);
    h.manager.tick().await;
    h.dom.click(h.nodes.help);

    assert_eq!(h.showing(), Some(("welcome".to_string(), 0)));
    assert_eq!(h.renderer.render_count(), 1);
}

#[tokio::test]
async fn test_removed_trigger_tour_is_pruned() {
    let h = Harness::new(vec![modal_tour("help", 1).with_trigger_selector("#help")]);
    h.manager.tick().await;
    assert_eq!(h.dom.listeners_on(h.nodes.help), 1);

    h.source.set(vec![]);
    h.manager.tick().await;
    assert!(h.manager.triggers().is_empty());
    assert_eq!(h.dom.listener_count(), 0);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let h = Harness::new(vec![
        modal_tour("welcome", 2),
        modal_tour("help", 1).with_trigger_selector("#help"),
    ]);
    h.manager.tick().await;

    h.manager.stop();
    h.manager.stop();

    assert!(h.manager.state().is_idle());
    assert_eq!(h.renderer.unmounted(), vec!["welcome".to_string()]);
    assert_eq!(h.dom.listener_count(), 0);
    assert!(h.manager.triggers().is_empty());

    h.manager.tick().await;
    assert_eq!(h.renderer.render_count(), 1);
}

#[tokio::test]
async fn test_stale_actions_after_stop_do_nothing() {
    let h = Harness::new(vec![modal_tour("t", 2)]);
    h.manager.tick().await;
    let actions = h.actions();
    h.manager.stop();

    actions.next();
    actions.dismiss(DismissReason::UserClickedSkip);
    assert!(h.manager.state().is_idle());
    assert_eq!(h.telemetry.count(STEP_COMPLETED), 0);
    assert!(h.store.get("tour_dismissed_t").is_none());
}

#[tokio::test]
async fn test_show_tour_bypasses_eligibility() {
    let h = Harness::new(vec![modal_tour("t", 1)]);
    h.store.set("tour_completed_t", json!(true)).unwrap();

    h.manager.tick().await;
    assert!(h.manager.state().is_idle());

    h.manager.show_tour("t").await.unwrap();
    assert_eq!(h.renderer.last().unwrap().render_reason, RenderReason::Api);
    assert!(matches!(
        h.manager.show_tour("missing").await,
        Err(OrchestratorError::TourNotFound(_))
    ));
}

#[tokio::test]
async fn test_show_tour_still_validates() {
    let h = Harness::new(vec![Tour::new("t", vec![Step::element("s", "#nowhere")])]);
    let err = h.manager.show_tour("t").await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::ValidationFailed { failures: 1, .. }
    ));
    assert!(h.manager.state().is_idle());
}

#[tokio::test]
async fn test_show_empty_tour_fails() {
    let h = Harness::new(vec![Tour::new("empty", vec![])]);
    assert!(matches!(
        h.manager.show_tour("empty").await,
        Err(OrchestratorError::EmptyTour(_))
    ));
}

#[tokio::test]
async fn test_dismiss_active() {
    let h = Harness::new(vec![modal_tour("t", 2)]);
    assert!(matches!(
        h.manager.dismiss_active(DismissReason::Api),
        Err(OrchestratorError::NoActiveTour)
    ));

    h.manager.tick().await;
    h.manager.dismiss_active(DismissReason::Api).unwrap();
    assert!(h.manager.state().is_idle());
    assert_eq!(
        h.telemetry.named(TOUR_DISMISSED)[0]["dismiss_reason"],
        json!("api")
    );
}

#[tokio::test]
async fn test_reset_tour_makes_it_eligible_again() {
    let h = Harness::new(vec![modal_tour("t", 1)]);
    h.manager.tick().await;
    h.actions().dismiss(DismissReason::UserClickedSkip);
    h.manager.tick().await;
    assert_eq!(h.renderer.render_count(), 1);

    h.manager.reset_tour("t").unwrap();
    h.manager.tick().await;
    assert_eq!(h.renderer.render_count(), 2);
}

#[tokio::test]
async fn test_source_failure_skips_tick() {
    let h = Harness::new(vec![modal_tour("t", 1)]);
    h.source.fail_with(Some("offline"));
    h.manager.tick().await;
    assert!(h.manager.state().is_idle());

    h.source.fail_with(None);
    h.manager.tick().await;
    assert_eq!(h.showing(), Some(("t".to_string(), 0)));
}

#[tokio::test]
async fn test_store_failure_does_not_block_lifecycle() {
    let h = Harness::new(vec![modal_tour("t", 1)]);
    h.store.set_read_only(true);
    h.manager.tick().await;
    h.actions().next();

    assert!(h.manager.state().is_idle());
    assert_eq!(h.telemetry.count(TOUR_COMPLETED), 1);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_telemetry_disabled() {
    let config = ManagerConfig {
        telemetry_enabled: false,
        ..ManagerConfig::default()
    };
    let h = Harness::with_config(vec![modal_tour("t", 1)], config);
    h.manager.tick().await;
    h.actions().next();

    assert!(h.telemetry.events().is_empty());
    assert!(h.telemetry.person_properties().is_empty());
    assert_eq!(h.store.get("tour_completed_t"), Some(json!(true)));
}

#[tokio::test]
async fn test_key_prefix_applies_to_outcomes() {
    let config = ManagerConfig {
        key_prefix: "acme_".into(),
        ..ManagerConfig::default()
    };
    let h = Harness::with_config(vec![modal_tour("t", 1)], config);
    h.manager.tick().await;
    h.actions().next();

    assert_eq!(h.store.get("acme_tour_completed_t"), Some(json!(true)));
    assert!(h.store.get("acme_last_seen_product_tour").is_some());
}

#[tokio::test]
async fn test_check_eligibility() {
    let h = Harness::new(vec![]);
    assert!(h.manager.check_eligibility(&modal_tour("t", 1)).is_ok());
    assert_eq!(
        h.manager.check_eligibility(&Tour::new("empty", vec![])),
        Err(Ineligibility::NoSteps)
    );
}

#[tokio::test(start_paused = true)]
async fn test_poll_loop_drives_ticks() {
    let config = ManagerConfig {
        poll: PollConfig::every(Duration::from_millis(500)),
        ..ManagerConfig::default()
    };
    let h = Harness::with_config(vec![], config);
    h.manager.start().unwrap();
    assert_eq!(h.manager.poll_status(), PollStatus::Running);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(h.manager.state().is_idle());

    h.source.set(vec![modal_tour("t", 1)]);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.showing(), Some(("t".to_string(), 0)));

    h.manager.set_page_hidden(true).unwrap();
    assert_eq!(h.manager.poll_status(), PollStatus::Paused);
    let fetches = h.source.fetch_count();
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(h.source.fetch_count(), fetches);

    h.manager.set_page_hidden(false).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(h.source.fetch_count() > fetches);

    h.manager.stop();
    assert_eq!(h.manager.poll_status(), PollStatus::Stopped);
}
