//! `validate` and `resolve` subcommands.

use anyhow::{Context, Result, bail};
use serde::Serialize;

use tourguide_core::{StepCheck, preflight};
use tourguide_resolver::resolve_step_target;

use crate::cli::{OutputFormat, PageArgs};
use crate::page::{LoadedPage, describe};

#[derive(Serialize)]
struct TourReport<'a> {
    tour_id: &'a str,
    ok: bool,
    checks: Vec<StepCheck>,
}

/// Pre-flight every element-targeting step, as the orchestrator does before
/// showing a tour.
pub(crate) fn validate(
    args: &PageArgs,
    only: Option<&str>,
    precision: f64,
    format: OutputFormat,
) -> Result<()> {
    let page = LoadedPage::load(args)?;
    if let Some(id) = only {
        page.tour(id)?;
    }

    let reports: Vec<TourReport> = page
        .tours
        .iter()
        .filter(|t| only.is_none_or(|id| t.id == id))
        .map(|tour| {
            let checks = preflight(page.dom.as_ref(), tour, precision);
            TourReport {
                tour_id: &tour.id,
                ok: !checks.iter().any(StepCheck::is_failure),
                checks,
            }
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Table => {
            println!(
                "{:<20} {:<6} {:<30} {:<18} {}",
                "TOUR", "STEP", "TARGET", "RESULT", "MATCHES"
            );
            println!("{}", "-".repeat(84));
            for report in &reports {
                if report.checks.is_empty() {
                    println!("{:<20} {:<6} {:<30} {:<18} -", report.tour_id, "-", "-", "no targets");
                }
                for check in &report.checks {
                    let result = check.result.error.map_or("ok", |e| e.as_str());
                    println!(
                        "{:<20} {:<6} {:<30} {:<18} {}",
                        report.tour_id, check.step_index, check.label(), result, check.result.match_count
                    );
                }
            }
        }
    }

    let failed = reports.iter().filter(|r| !r.ok).count();
    if failed > 0 {
        bail!("{} of {} tours failed validation", failed, reports.len());
    }
    Ok(())
}

/// Resolve one step's target the way it would be resolved at render time.
pub(crate) fn resolve(args: &PageArgs, tour_id: &str, step_index: usize, precision: f64) -> Result<()> {
    let page = LoadedPage::load(args)?;
    let tour = page.tour(tour_id)?;
    let step = tour
        .step(step_index)
        .with_context(|| format!("tour '{}' has {} steps", tour_id, tour.total_steps()))?;

    let strategy = if step.uses_inference() { "fuzzy" } else { "exact" };
    let Some(result) = resolve_step_target(page.dom.as_ref(), step, precision) else {
        println!("Step {} ({}) does not target an element", step_index, step.step_type.as_str());
        return Ok(());
    };

    println!("strategy: {}", strategy);
    if let Some(selector) = step.css_selector() {
        println!("selector: {}", selector);
    }
    match result.element {
        Some(node) => println!("element:  {}", describe(&page.dom, node)),
        None => println!("element:  none"),
    }
    if let Some(error) = result.error {
        println!("error:    {} ({} matches)", error, result.match_count);
    }

    if !result.is_usable() {
        bail!("step {} of tour '{}' cannot be shown on this page", step_index, tour_id);
    }
    Ok(())
}
