use tickwork_scheduler::jobs;

/// Print every registered descriptor and its firing policy.
pub fn run() -> anyhow::Result<()> {
    let registry = jobs::registry();
    println!(
        "{:<32} {:<18} {:>8} {:>6} {:>7} {:>12}",
        "NAME", "SCHEDULE", "WEEKDAY", "INIT", "RETRY", "RETRY DELAY"
    );
    for job in &registry {
        let schedule = if job.schedule.is_empty() {
            "(manual)".to_owned()
        } else if job.schedule.len() > 3 {
            format!("{} slots", job.schedule.len())
        } else {
            job.schedule
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        };
        let retry = if job.retry_on_failure {
            job.max_retries.to_string()
        } else {
            "off".to_owned()
        };
        println!(
            "{:<32} {:<18} {:>8} {:>6} {:>7} {:>11}s",
            job.name,
            schedule,
            if job.skip_on_weekends { "only" } else { "all" },
            if job.run_at_init { "yes" } else { "no" },
            retry,
            job.retry_delay.as_secs(),
        );
    }
    Ok(())
}
