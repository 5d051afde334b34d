use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use livelist_core::{ChangeEvent, ConcatenatedView, Recorder, Sequence, ViewOptions};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::scenario::{Item, Scenario};

/// Result of replaying a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub name: String,
    pub initial: Vec<Item>,
    pub steps: Vec<StepReport>,
    #[serde(rename = "final")]
    pub final_contents: Vec<Item>,
    /// True if a subscriber replaying every event ended with the view contents.
    pub mirror_matches: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// 1-based step number.
    pub index: usize,
    pub step: String,
    pub events: Vec<ChangeEvent<Item>>,
    pub size: usize,
}

impl RunReport {
    pub fn event_count(&self) -> usize {
        self.steps.iter().map(|step| step.events.len()).sum()
    }
}

/// Outcome of `check`: the scenario replayed with verification after every step.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub steps: usize,
    pub events: usize,
    pub size: usize,
    pub failures: Vec<String>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

pub fn run_file(path: &Path, verify: bool) -> Result<RunReport> {
    let scenario = Scenario::load(path)?;
    run_scenario(&scenario, verify)
}

/// Replay every step, collecting the events each one produced.
pub fn run_scenario(scenario: &Scenario, verify: bool) -> Result<RunReport> {
    let name = scenario.display_name().to_string();
    let scenario_span = info_span!("scenario", name = %name);
    let _scenario_guard = scenario_span.enter();

    let source = scenario.build_source();
    let options = ViewOptions::default()
        .with_name(name.clone())
        .with_verify_after_transaction(verify);
    let view = ConcatenatedView::with_options(source.clone(), options).context("build view")?;
    let recorder = Rc::new(RefCell::new(Recorder::new()));
    view.subscribe_with_initial(Rc::clone(&recorder))
        .context("subscribe recorder")?;
    let initial = view.to_vec();
    recorder.borrow_mut().clear();
    info!(segments = view.segment_count(), size = initial.len(), "scenario loaded");

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (number, step) in (1..).zip(&scenario.steps) {
        let step_span = info_span!("step", index = number);
        let _step_guard = step_span.enter();
        step.apply(&source)
            .with_context(|| format!("step {number} ({step}) failed"))?;
        if verify {
            view.verify()
                .with_context(|| format!("view inconsistent after step {number} ({step})"))?;
        }
        let events: Vec<ChangeEvent<Item>> = recorder.borrow().events().cloned().collect();
        recorder.borrow_mut().clear();
        info!(step = %step, events = events.len(), size = view.size(), "step applied");
        steps.push(StepReport {
            index: number,
            step: step.to_string(),
            events,
            size: view.size(),
        });
    }

    let final_contents = view.to_vec();
    let mirror_matches = recorder.borrow().mirror() == final_contents.as_slice();
    if !mirror_matches {
        warn!("replayed events disagree with the view contents");
    }
    debug!(size = final_contents.len(), "scenario finished");
    Ok(RunReport {
        name,
        initial,
        steps,
        final_contents,
        mirror_matches,
    })
}

pub fn check_file(path: &Path) -> Result<CheckReport> {
    let scenario = Scenario::load(path)?;
    check_scenario(&scenario)
}

/// Replay the scenario and compare the view against a naive flatten of the
/// sources after every step. Failed steps and mismatches are collected and
/// the remaining steps still run.
pub fn check_scenario(scenario: &Scenario) -> Result<CheckReport> {
    let name = scenario.display_name().to_string();
    let check_span = info_span!("check", name = %name);
    let _check_guard = check_span.enter();

    let source = scenario.build_source();
    let options = ViewOptions::default().with_name(name.clone());
    let view = ConcatenatedView::with_options(source.clone(), options).context("build view")?;
    let recorder = Rc::new(RefCell::new(Recorder::new()));
    view.subscribe_with_initial(Rc::clone(&recorder))
        .context("subscribe recorder")?;
    recorder.borrow_mut().clear();

    let mut failures = Vec::new();
    let mut events = 0;
    for (number, step) in (1..).zip(&scenario.steps) {
        let step_span = info_span!("step", index = number);
        let _step_guard = step_span.enter();
        if let Err(error) = step.apply(&source) {
            warn!(%error, "step failed");
            failures.push(format!("step {number} ({step}) failed: {error}"));
        }
        events += recorder.borrow().events().count();
        recorder.borrow_mut().clear();

        let expected: Vec<Item> = source.to_vec().iter().flat_map(Sequence::to_vec).collect();
        if view.to_vec() != expected {
            failures.push(format!("step {number} ({step}): view differs from the sources"));
        }
        if recorder.borrow().mirror() != expected.as_slice() {
            failures.push(format!(
                "step {number} ({step}): replayed events differ from the sources"
            ));
        }
        if let Err(error) = view.verify() {
            failures.push(format!("step {number} ({step}): {error}"));
        }
    }

    if failures.is_empty() {
        info!(steps = scenario.steps.len(), events, "check passed");
    } else {
        warn!(failures = failures.len(), "check failed");
    }
    Ok(CheckReport {
        name,
        steps: scenario.steps.len(),
        events,
        size: view.size(),
        failures,
    })
}

/// Fail unless the report passed.
pub fn ensure_passed(report: &CheckReport) -> Result<()> {
    if !report.passed() {
        bail!(
            "{} failed {} check(s): {}",
            report.name,
            report.failures.len(),
            report.failures.join("; ")
        );
    }
    Ok(())
}
