use tickwork_daemon::DaemonConfig;
use tickwork_state::StateStore;
use tickwork_state_redis::RedisStateStore;

/// Sorted set maintained by the task-queue subsystem; the scheduler
/// core never touches it.
const TASK_QUEUE_SET: &str = "tasks:queue";

/// Print the auxiliary task queue in score order.
pub async fn run(config: &DaemonConfig) -> anyhow::Result<()> {
    let store = RedisStateStore::new(&config.state)?;
    let entries = store.zrange(TASK_QUEUE_SET, 0, -1).await?;
    if entries.is_empty() {
        println!("(queue empty)");
        return Ok(());
    }
    for (position, entry) in entries.iter().enumerate() {
        println!("{position:>4}  {entry}");
    }
    Ok(())
}
