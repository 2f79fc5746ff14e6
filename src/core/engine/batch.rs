use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use indicatif::ProgressBar;
use log::warn;

use crate::types::{EngineError, SourceUnit};

/// One unit that failed to parse or instrument. Kept apart from coverage
/// data so a failed unit can never masquerade as "100% uncovered".
#[derive(Debug)]
pub struct UnitFailure {
    pub unit_name: String,
    pub error: EngineError,
}

#[derive(Debug)]
pub struct BatchSummary<T> {
    pub completed: Vec<T>,
    pub failed: Vec<UnitFailure>,
    pub interrupted: bool,
}

impl<T> BatchSummary<T> {
    pub fn clean(&self) -> bool {
        self.failed.is_empty() && !self.interrupted
    }
}

/// Run `worker` over every unit on a bounded pool of scoped threads.
///
/// Units share nothing while in flight, so they parallelize freely; the
/// `running` flag is checked between units only, which is the batch's
/// cancellation granularity; completed units are always retained.
/// Unit-scoped errors are collected and the batch keeps going.
pub fn process_units<T, F>(
    units: &[SourceUnit],
    concurrency: usize,
    running: &AtomicBool,
    progress: Option<&ProgressBar>,
    worker: F,
) -> BatchSummary<T>
where
    T: Send,
    F: Fn(&SourceUnit) -> Result<T, EngineError> + Sync,
{
    let next = AtomicUsize::new(0);
    let completed: Mutex<Vec<(usize, T)>> = Mutex::new(Vec::new());
    let failed: Mutex<Vec<(usize, UnitFailure)>> = Mutex::new(Vec::new());

    let workers = concurrency.clamp(1, units.len().max(1));
    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= units.len() {
                        break;
                    }
                    let unit = &units[index];
                    match worker(unit) {
                        Ok(value) => completed.lock().unwrap().push((index, value)),
                        Err(error) => {
                            warn!("{}: {error}", unit.name);
                            failed.lock().unwrap().push((
                                index,
                                UnitFailure {
                                    unit_name: unit.name.clone(),
                                    error,
                                },
                            ));
                        }
                    }
                    if let Some(bar) = progress {
                        bar.inc(1);
                    }
                }
            });
        }
    });

    // Results come back in worker-completion order; restore source order so
    // batch output is deterministic
    let mut completed = completed.into_inner().unwrap();
    completed.sort_by_key(|(index, _)| *index);
    let mut failed = failed.into_inner().unwrap();
    failed.sort_by_key(|(index, _)| *index);

    BatchSummary {
        completed: completed.into_iter().map(|(_, v)| v).collect(),
        failed: failed.into_iter().map(|(_, f)| f).collect(),
        interrupted: !running.load(Ordering::SeqCst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: usize) -> Vec<SourceUnit> {
        (0..n)
            .map(|i| SourceUnit::new(format!("u{i}.sim"), format!("print({i});\n")))
            .collect()
    }

    #[test]
    fn results_come_back_in_source_order() {
        let units = units(16);
        let running = AtomicBool::new(true);
        let summary = process_units(&units, 4, &running, None, |u| Ok(u.name.clone()));
        assert!(summary.clean());
        let names: Vec<_> = units.iter().map(|u| u.name.clone()).collect();
        assert_eq!(summary.completed, names);
    }

    #[test]
    fn unit_failures_do_not_stop_the_batch() {
        let units = units(6);
        let running = AtomicBool::new(true);
        let summary = process_units(&units, 2, &running, None, |u| {
            if u.name == "u3.sim" {
                Err(EngineError::malformed(&u.name, 1, "unexpected token"))
            } else {
                Ok(())
            }
        });
        assert_eq!(summary.completed.len(), 5);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].unit_name, "u3.sim");
        assert!(!summary.clean());
    }

    #[test]
    fn cleared_flag_stops_before_the_next_unit() {
        let units = units(8);
        let running = AtomicBool::new(false);
        let summary = process_units(&units, 2, &running, None, |_| Ok(()));
        assert!(summary.completed.is_empty());
        assert!(summary.interrupted);
    }
}
