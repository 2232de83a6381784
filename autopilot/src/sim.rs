//! Scripted simulation for `autopilot simulate`.
//!
//! A [`Scenario`] describes what the host shows on every tick and a list of
//! scripted tasks. [`run_simulation`] queues the tasks on a [`Scheduler`] and
//! ticks it against the timeline until every task has finished, a task fails,
//! or the tick limit is reached.

use std::rc::Rc;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::keys::Key;
use crate::core::screen::{Host, ScreenState};
use crate::core::task::{ExclusiveTask, TaskContext, TaskFuture};
use crate::core::types::StateChange;
use crate::io::config::SchedulerConfig;
use crate::io::diagnostics::Diagnostics;
use crate::io::scenario::{Scenario, ScriptStep, TaskScript};
use crate::scheduler::{Scheduler, TickOutcome};

/// Host snapshot for one tick of a scenario timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptedHost {
    screen: ScreenState,
    dismissed: bool,
}

impl ScriptedHost {
    /// What the scenario shows at `tick`: the latest frame at or before it.
    pub fn at(scenario: &Scenario, tick: u64) -> Self {
        let screen = scenario
            .screens
            .iter()
            .take_while(|frame| frame.tick <= tick)
            .last()
            .map(|frame| ScreenState {
                id: frame.id.clone(),
                focus: frame.focus.clone(),
                parent_id: frame.parent_id.clone(),
                parent_focus: frame.parent_focus.clone(),
            })
            .unwrap_or_default();
        let dismissed = scenario.dismissed.iter().any(|range| range.contains(tick));
        Self { screen, dismissed }
    }
}

impl Host for ScriptedHost {
    fn current_screen(&self) -> ScreenState {
        self.screen.clone()
    }

    fn is_dismissed(&self) -> bool {
        self.dismissed
    }
}

/// Exclusive task that plays back a [`TaskScript`].
#[derive(Debug, Clone)]
pub struct ScriptedTask {
    script: Rc<TaskScript>,
}

impl ScriptedTask {
    pub fn new(script: TaskScript) -> Self {
        Self {
            script: Rc::new(script),
        }
    }

    async fn play(&self, cx: TaskContext<ScriptedHost>) -> Result<()> {
        for step in &self.script.steps {
            match step {
                ScriptStep::Delay { steps } => cx.delay_steps(*steps).await?,
                ScriptStep::Key { key } => cx.key(*key).await?,
                ScriptStep::Burst { keys } => {
                    for key in keys {
                        cx.key_no_delay(*key);
                    }
                }
                ScriptStep::Text { text } => cx.text(text).await?,
                ScriptStep::Expect(expected) => cx.expect_screen(expected.clone()).await?,
                ScriptStep::Await(expected) => cx.await_screen(expected.clone()).await?,
                ScriptStep::Clear => cx.clear_expectation(),
            }
        }
        Ok(())
    }
}

impl ExclusiveTask<ScriptedHost> for ScriptedTask {
    fn description(&self) -> &str {
        &self.script.description
    }

    fn run(self: Rc<Self>, cx: TaskContext<ScriptedHost>) -> TaskFuture {
        Box::pin(async move { self.play(cx).await })
    }

    fn wait_multiplier(&self) -> Option<usize> {
        self.script.wait_multiplier
    }

    fn alternate_frontend_blacklisted(&self) -> bool {
        self.script.blacklisted
    }

    fn replace_on_screen_change(&self) -> Option<Rc<dyn ExclusiveTask<ScriptedHost>>> {
        if !self.script.restart_on_screen_change {
            return None;
        }
        Some(Rc::new(Self {
            script: Rc::clone(&self.script),
        }))
    }
}

/// Keys fed to the host on one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFeed {
    pub tick: u64,
    pub keys: Vec<Key>,
}

/// Reason why `run_simulation` stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimulationStop {
    /// Every task ran to completion.
    Drained,
    /// Tasks were still active or queued after `max_ticks` ticks.
    TickLimit { max_ticks: u64 },
    /// A task failed fatally.
    Halted { task: String, error: String },
}

/// Summary of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationOutcome {
    pub ticks: u64,
    pub stop: SimulationStop,
    /// Descriptions of tasks that completed, in completion order.
    pub completed: Vec<String>,
    pub feeds: Vec<KeyFeed>,
}

/// Play `scenario` against a fresh scheduler.
///
/// `on_feed` sees every key feed as it happens. A fatal task error stops the
/// run with [`SimulationStop::Halted`]; it is also reported to `diagnostics`.
pub fn run_simulation<F: FnMut(&KeyFeed)>(
    scenario: &Scenario,
    config: &SchedulerConfig,
    diagnostics: Box<dyn Diagnostics>,
    max_ticks: u64,
    mut on_feed: F,
) -> Result<SimulationOutcome> {
    config.validate()?;
    scenario.validate()?;

    let mut scheduler: Scheduler<ScriptedHost> = Scheduler::new(config, diagnostics);
    for script in &scenario.tasks {
        scheduler.enqueue(ScriptedTask::new(script.clone()));
    }

    let mut completed = Vec::new();
    let mut feeds = Vec::new();
    let mut previous_screen: Option<String> = None;
    let mut tick = 0u64;

    let stop = loop {
        if scheduler.is_drained() {
            break SimulationStop::Drained;
        }
        if tick >= max_ticks {
            break SimulationStop::TickLimit { max_ticks };
        }

        if let Some(change) = scenario.frontend.iter().find(|change| change.tick == tick) {
            scheduler.set_alternate_frontend(change.attached);
        }

        let host = Rc::new(ScriptedHost::at(scenario, tick));
        let screen_id = host.current_screen().id;
        if previous_screen
            .as_ref()
            .is_some_and(|previous| *previous != screen_id)
        {
            debug!(tick, screen = %screen_id, "viewscreen changed");
            scheduler.on_state_change(StateChange::ViewscreenChanged);
        }
        previous_screen = Some(screen_id);

        let running = scheduler.next_description().map(str::to_string);
        let mut fed = Vec::new();
        let result = scheduler.tick(host, &mut |keys: Vec<Key>| fed.extend(keys));
        if !fed.is_empty() {
            let feed = KeyFeed { tick, keys: fed };
            on_feed(&feed);
            feeds.push(feed);
        }
        tick += 1;

        match result {
            Ok(TickOutcome::Completed { task }) => completed.push(task),
            Ok(_) => {}
            Err(err) => {
                break SimulationStop::Halted {
                    task: running.unwrap_or_default(),
                    error: format!("{err:#}"),
                };
            }
        }
    };

    info!(
        scenario = %scenario.name,
        ticks = tick,
        completed = completed.len(),
        ?stop,
        "simulation finished"
    );
    Ok(SimulationOutcome {
        ticks: tick,
        stop,
        completed,
        feeds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::screen::ScreenExpectation;
    use crate::io::scenario::{FrontendChange, ScreenFrame, TickRange};
    use crate::test_support::RecordingDiagnostics;

    fn frame(tick: u64, id: &str) -> ScreenFrame {
        ScreenFrame {
            tick,
            id: id.to_string(),
            focus: Vec::new(),
            parent_id: None,
            parent_focus: Vec::new(),
        }
    }

    fn script(description: &str, steps: Vec<ScriptStep>) -> TaskScript {
        TaskScript {
            description: description.to_string(),
            wait_multiplier: None,
            blacklisted: false,
            restart_on_screen_change: false,
            steps,
        }
    }

    fn simulate(scenario: &Scenario, max_ticks: u64) -> (SimulationOutcome, RecordingDiagnostics) {
        let diagnostics = RecordingDiagnostics::default();
        let outcome = run_simulation(
            scenario,
            &SchedulerConfig::default(),
            Box::new(diagnostics.clone()),
            max_ticks,
            |_| {},
        )
        .expect("simulate");
        (outcome, diagnostics)
    }

    #[test]
    fn host_follows_the_timeline() {
        let scenario = Scenario {
            screens: vec![frame(0, "title"), frame(3, "dwarfmode")],
            dismissed: vec![TickRange { from: 2, until: 4 }],
            ..Scenario::default()
        };
        assert_eq!(ScriptedHost::at(&scenario, 2).current_screen().id, "title");
        assert!(ScriptedHost::at(&scenario, 2).is_dismissed());
        assert_eq!(ScriptedHost::at(&scenario, 7).current_screen().id, "dwarfmode");
        assert!(!ScriptedHost::at(&scenario, 4).is_dismissed());
    }

    #[test]
    fn empty_scenario_drains_immediately() {
        let (outcome, _) = simulate(&Scenario::default(), 10);
        assert_eq!(outcome.stop, SimulationStop::Drained);
        assert_eq!(outcome.ticks, 0);
    }

    #[test]
    fn scripted_tasks_feed_keys_in_order() {
        let scenario = Scenario {
            screens: vec![frame(0, "dwarfmode")],
            tasks: vec![
                script(
                    "first",
                    vec![
                        ScriptStep::Expect(ScreenExpectation::new("dwarfmode")),
                        ScriptStep::Key { key: Key::Military },
                    ],
                ),
                script(
                    "second",
                    vec![
                        ScriptStep::Burst {
                            keys: vec![Key::CursorDown, Key::Select],
                        },
                        ScriptStep::Text {
                            text: "ok".to_string(),
                        },
                    ],
                ),
            ],
            ..Scenario::default()
        };

        let (outcome, diagnostics) = simulate(&scenario, 20);
        assert_eq!(outcome.stop, SimulationStop::Drained);
        assert_eq!(outcome.completed, vec!["first".to_string(), "second".to_string()]);
        let keys: Vec<Vec<Key>> = outcome.feeds.iter().map(|feed| feed.keys.clone()).collect();
        assert_eq!(
            keys,
            vec![
                vec![Key::Military],
                vec![Key::CursorDown, Key::Select, Key::Char(b'o')],
                vec![Key::Char(b'k')],
            ]
        );
        assert!(diagnostics.reports.borrow().is_empty());
    }

    #[test]
    fn await_waits_for_the_timeline() {
        let scenario = Scenario {
            screens: vec![frame(0, "dwarfmode"), frame(4, "military")],
            tasks: vec![script(
                "draft",
                vec![
                    ScriptStep::Key { key: Key::Military },
                    ScriptStep::Await(ScreenExpectation::new("military")),
                    ScriptStep::Key { key: Key::Select },
                ],
            )],
            ..Scenario::default()
        };

        let (outcome, _) = simulate(&scenario, 20);
        assert_eq!(outcome.stop, SimulationStop::Drained);
        assert_eq!(
            outcome.feeds,
            vec![
                KeyFeed {
                    tick: 0,
                    keys: vec![Key::Military],
                },
                KeyFeed {
                    tick: 4,
                    keys: vec![Key::Select],
                },
            ]
        );
    }

    #[test]
    fn mismatch_halts_and_reports() {
        let scenario = Scenario {
            screens: vec![frame(0, "dwarfmode")],
            tasks: vec![
                script(
                    "wrong",
                    vec![
                        ScriptStep::Expect(ScreenExpectation::new("trade")),
                        ScriptStep::Key { key: Key::Select },
                    ],
                ),
                script("never", vec![ScriptStep::Key { key: Key::Select }]),
            ],
            ..Scenario::default()
        };

        let (outcome, diagnostics) = simulate(&scenario, 20);
        match &outcome.stop {
            SimulationStop::Halted { task, error } => {
                assert_eq!(task, "wrong");
                assert!(error.contains("trade"));
            }
            other => panic!("expected halt, got {other:?}"),
        }
        assert!(outcome.feeds.is_empty());
        assert_eq!(diagnostics.reports.borrow().len(), 1);
    }

    #[test]
    fn tick_limit_stops_a_waiting_task() {
        let scenario = Scenario {
            screens: vec![frame(0, "dwarfmode")],
            tasks: vec![script(
                "patient",
                vec![ScriptStep::Await(ScreenExpectation::new("never"))],
            )],
            ..Scenario::default()
        };

        let (outcome, _) = simulate(&scenario, 5);
        assert_eq!(outcome.stop, SimulationStop::TickLimit { max_ticks: 5 });
        assert_eq!(outcome.ticks, 5);
    }

    #[test]
    fn screen_change_restarts_flagged_task() {
        let mut restarting = script(
            "restarting",
            vec![
                ScriptStep::Key { key: Key::Select },
                ScriptStep::Delay { steps: 3 },
            ],
        );
        restarting.restart_on_screen_change = true;
        let scenario = Scenario {
            screens: vec![frame(0, "a"), frame(2, "b")],
            tasks: vec![restarting],
            ..Scenario::default()
        };

        let (outcome, _) = simulate(&scenario, 20);
        assert_eq!(outcome.stop, SimulationStop::Drained);
        let ticks: Vec<u64> = outcome.feeds.iter().map(|feed| feed.tick).collect();
        assert_eq!(ticks, vec![0, 2]);
    }

    #[test]
    fn blacklisted_task_waits_for_frontend_detach() {
        let mut military = script("military", vec![ScriptStep::Key { key: Key::Military }]);
        military.blacklisted = true;
        let scenario = Scenario {
            screens: vec![frame(0, "dwarfmode")],
            frontend: vec![
                FrontendChange {
                    tick: 0,
                    attached: true,
                },
                FrontendChange {
                    tick: 3,
                    attached: false,
                },
            ],
            tasks: vec![military],
            ..Scenario::default()
        };

        let (outcome, _) = simulate(&scenario, 20);
        assert_eq!(outcome.stop, SimulationStop::Drained);
        assert_eq!(outcome.feeds[0].tick, 3);
    }

    #[test]
    fn dismissed_ticks_delay_the_next_key() {
        let scenario = Scenario {
            screens: vec![frame(0, "dwarfmode")],
            dismissed: vec![TickRange { from: 1, until: 4 }],
            tasks: vec![script(
                "two keys",
                vec![
                    ScriptStep::Key { key: Key::Select },
                    ScriptStep::Key { key: Key::Select },
                ],
            )],
            ..Scenario::default()
        };

        let (outcome, _) = simulate(&scenario, 20);
        let ticks: Vec<u64> = outcome.feeds.iter().map(|feed| feed.tick).collect();
        assert_eq!(ticks, vec![0, 4]);
    }
}
