use anyhow::bail;
use chrono::{DateTime, Utc};

use tickwork_daemon::DaemonConfig;
use tickwork_scheduler::{jobs, persist};
use tickwork_state::JobStateKind;
use tickwork_state_redis::RedisStateStore;

fn fmt_ts(t: Option<DateTime<Utc>>) -> String {
    t.map_or_else(|| "-".to_owned(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Print persisted state for one descriptor or all of them.
///
/// `in_flight` is process-local to the running daemon; from here every
/// job reports not-in-flight.
pub async fn run(config: &DaemonConfig, name: Option<&str>) -> anyhow::Result<()> {
    let store = RedisStateStore::new(&config.state)?;
    let registry = jobs::registry();

    let selected: Vec<_> = match name {
        Some(name) => {
            let Some(job) = registry.iter().find(|job| job.name == name) else {
                bail!("unknown job: {name}");
            };
            vec![job.clone()]
        }
        None => registry,
    };

    println!(
        "{:<32} {:<20} {:<20} {:>6} {:>10}",
        "NAME", "LAST RUN (UTC)", "LAST COMPLETION", "RETRY", "IN FLIGHT"
    );
    for job in &selected {
        let last_run = persist::read_timestamp(&store, JobStateKind::LastRun, job.name).await;
        let last_completion =
            persist::read_timestamp(&store, JobStateKind::LastCompletion, job.name).await;
        let retry_count = persist::read_retry_count(&store, job.name).await;
        println!(
            "{:<32} {:<20} {:<20} {:>6} {:>10}",
            job.name,
            fmt_ts(last_run),
            fmt_ts(last_completion),
            retry_count,
            "no",
        );
    }
    Ok(())
}
