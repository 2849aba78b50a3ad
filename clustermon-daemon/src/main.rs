//! clustermond: the daemon binary wiring the scheduler, executors,
//! cluster node and external interfaces together (spec §5, §6).

mod authority;
mod cli;
mod dispatch;
mod events;
mod logging;
mod periodic;
mod pipe;
mod restart;
mod shutdown;
mod transport;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use clustermon_checkable::spawn_sweep as spawn_checkable_sweep;
use clustermon_cluster::{ClusterNode, ReplayLog};
use clustermon_exec::ExecutorPool;
use clustermon_interfaces::{CommandRegistry, NullIdoSink, NullPerfdataSink, ProgramStatus};
use clustermon_notify::{spawn_sweep as spawn_notify_sweep, NotifyExecutor};
use clustermon_scheduler::Scheduler;
use clustermon_store::Store;
use clustermon_types::{AlwaysInside, Endpoint};

use authority::ClusterAuthority;
use cli::Cli;
use dispatch::{CheckDispatcher, CheckResultSink};
use events::EventRouter;
use transport::LoggingTransport;

fn wall_clock() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = clustermon_config::load_config(&cli.config)?;
    if let Some(ready_file) = &cli.restart_ready_file {
        restart::signal_ready(ready_file)?;
    }

    logging::init(&config.logging.level);
    tracing::info!(config = ?cli.config, "clustermond starting");
    if !cli.foreground {
        tracing::info!("no --foreground flag given; staying attached to the controlling terminal regardless (this build never forks)");
    }

    let store = Arc::new(Store::new());
    let status = Arc::new(ProgramStatus::new().with_start_time(wall_clock()));
    for peer in &config.cluster.peers {
        store.insert_endpoint(Endpoint::new(peer.name.clone(), peer.host.clone(), peer.port));
    }

    let restart_requested = Arc::new(AtomicBool::new(false));
    let command_registry = Arc::new(build_command_registry(restart_requested.clone()));

    let authority = Arc::new(ClusterAuthority::new());
    let scheduler = Arc::new(Scheduler::new(store.clone(), authority.clone(), AlwaysInside, wall_clock));

    let ido_sink: Arc<dyn clustermon_interfaces::IdoSink> = Arc::new(NullIdoSink);
    let perfdata_sink: Arc<dyn clustermon_interfaces::PerfdataSink> = Arc::new(NullPerfdataSink);

    let result_sink = Arc::new(CheckResultSink {
        store: store.clone(),
        scheduler: scheduler.clone(),
        status: status.clone(),
        perfdata_sink: perfdata_sink.clone(),
        identity: config.cluster.identity.clone(),
        now: Arc::new(wall_clock),
    });
    let pool = Arc::new(ExecutorPool::new(config.exec.max_workers, result_sink, Arc::new(wall_clock)));
    let check_timeout = Duration::from_secs_f64(config.exec.check_timeout_secs);

    let shutdown_flag = shutdown::install();

    let scheduler_for_thread = scheduler.clone();
    let dispatcher = CheckDispatcher {
        store: store.clone(),
        pool: pool.clone(),
        check_timeout,
    };
    let scheduler_thread = std::thread::Builder::new()
        .name("clustermon-scheduler".to_string())
        .spawn(move || scheduler_for_thread.run(&dispatcher))
        .expect("failed to spawn clustermon-scheduler thread");

    let checkable_sweep = spawn_checkable_sweep(store.clone(), wall_clock);

    let notify_executor = Arc::new(NotifyExecutor::new(config.notify.workers, store.clone()));
    let sweep_authority = authority.clone();
    let notify_sweep = spawn_notify_sweep(
        store.clone(),
        Arc::new(AlwaysInside) as Arc<dyn clustermon_types::TimePeriodRegistry>,
        notify_executor.clone(),
        Arc::new(move |id: &clustermon_types::CheckableId| sweep_authority.holds_notification_authority(id)),
        wall_clock,
    );

    let transport = Arc::new(LoggingTransport::new(config.cluster.identity.clone()));
    let cluster_node = if config.cluster.identity.is_empty() {
        tracing::info!("cluster.identity unset; running as a standalone, non-clustered node");
        None
    } else {
        let features = clustermon_types::endpoint::Features::CHECKER | clustermon_types::endpoint::Features::NOTIFICATIONS;
        let node = Arc::new(ClusterNode::new(
            config.cluster.identity.clone(),
            features,
            store.clone(),
            Arc::new(ReplayLog::new()),
            transport.clone(),
        ));
        Some(node.spawn(wall_clock))
    };

    let event_router = Arc::new(EventRouter {
        store: store.clone(),
        scheduler: scheduler.clone(),
        authority: authority.clone(),
        notify_executor: notify_executor.clone(),
        transport: transport.clone(),
        ido_sink: ido_sink.clone(),
        identity: config.cluster.identity.clone(),
        now: Arc::new(wall_clock),
    });
    let event_router_thread = event_router.spawn(shutdown_flag.clone());

    let pipe_thread = pipe::spawn(
        PathBuf::from(&config.interfaces.command_pipe_path),
        store.clone(),
        status.clone(),
        command_registry.clone(),
        shutdown_flag.clone(),
    );
    let status_writer_thread =
        periodic::spawn_status_writer(PathBuf::from(&config.interfaces.status_file_path), store.clone(), status.clone(), shutdown_flag.clone());
    let ido_heartbeat_thread = periodic::spawn_ido_heartbeat(ido_sink.clone(), status.clone(), shutdown_flag.clone());

    run_until_shutdown(&shutdown_flag, &restart_requested);

    scheduler.stop();
    if let Some(mut node) = cluster_node {
        node.stop();
    }
    let _ = scheduler_thread.join();
    checkable_sweep.stop();
    let mut notify_sweep = notify_sweep;
    notify_sweep.stop();
    let _ = event_router_thread.join();
    let _ = pipe_thread.join();
    let _ = status_writer_thread.join();
    let _ = ido_heartbeat_thread.join();

    tracing::info!("clustermond stopped");
    Ok(())
}

/// Block until either a shutdown signal or a restart request is observed.
/// On a restart request, attempt the two-phase handoff (spec §5); if it
/// fails, clear the flag and keep running rather than retrying in a tight
/// loop.
fn run_until_shutdown(shutdown_flag: &Arc<AtomicBool>, restart_requested: &Arc<AtomicBool>) {
    loop {
        if shutdown_flag.load(Ordering::SeqCst) {
            return;
        }
        if restart_requested.swap(false, Ordering::SeqCst) {
            let handed_off = restart::attempt(|| {
                if shutdown_flag.load(Ordering::SeqCst) {
                    tracing::warn!("shutdown observed mid-restart; continuing as the current process");
                }
            });
            if handed_off {
                return;
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn build_command_registry(restart_requested: Arc<AtomicBool>) -> CommandRegistry {
    let mut registry = CommandRegistry::default();
    registry.register("RESTART_PROGRAM", 0, 0, move |_store, _status, _argv, _ts| {
        restart_requested.store(true, Ordering::SeqCst);
        Ok(())
    });
    registry
}
