use tracing::debug;

/// Collects background jobs during start-up and launches them together.
pub struct TaskRunner {
    tasks: Vec<(&'static str, Box<dyn FnOnce() + Send>)>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.tasks.push((name, Box::new(task)));
    }

    pub fn start_all(self) {
        for (name, task) in self.tasks {
            debug!("starting background task {}", name);
            task();
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn start_all_runs_every_task_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut runner = TaskRunner::new();
        for name in ["a", "b"] {
            let counter = counter.clone();
            runner.add_task(name, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        runner.start_all();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
