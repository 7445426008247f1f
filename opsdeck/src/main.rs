// OpsDeck - terminal dashboard for event operations
// Renders the activity feed and backup coverage panels, once or live

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use opsdeck_common::{DashboardConfig, EventRef, SessionContext};
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

mod api_client;
mod cli_args;
mod error;
mod live_view;
mod panels;
mod render;

use api_client::DashboardApiClient;
use cli_args::CliArgs;
use panels::{ActivityFeedPanel, BackupCoveragePanel};
use render::{render_activity_view, render_backup_view};

struct Dashboard {
    session: SessionContext,
    activity: Option<ActivityFeedPanel>,
    backups: Option<BackupCoveragePanel>,
}

impl Dashboard {
    fn new(args: &CliArgs, config: &DashboardConfig) -> Result<Self> {
        let client = DashboardApiClient::new(config).context("Failed to create API client")?;
        log::debug!("API client ready for {}", client.base_url());

        let session = SessionContext::new(
            config.operator.clone(),
            args.event.map(|id| EventRef { id, name: None }),
        );

        let activity = args.mode.shows_activity().then(|| {
            let panel = ActivityFeedPanel::new(client.clone(), config);
            panel.set_filter_bucket(args.filter);
            panel
        });
        let backups = args
            .mode
            .shows_backups()
            .then(|| BackupCoveragePanel::new(client, config));

        Ok(Self {
            session,
            activity,
            backups,
        })
    }

    async fn attach(&self) {
        tokio::join!(
            async {
                if let Some(panel) = &self.activity {
                    panel.attach(&self.session).await;
                }
            },
            async {
                if let Some(panel) = &self.backups {
                    panel.attach(&self.session).await;
                }
            }
        );
    }

    async fn refresh(&self) {
        tokio::join!(
            async {
                if let Some(panel) = &self.activity {
                    panel.refresh().await;
                }
            },
            async {
                if let Some(panel) = &self.backups {
                    panel.refresh().await;
                }
            }
        );
    }

    fn set_live(&self, live: bool) {
        if let Some(panel) = &self.activity {
            panel.set_live(live);
        }
        if let Some(panel) = &self.backups {
            panel.set_live(live);
        }
    }

    fn detach(&self) {
        if let Some(panel) = &self.activity {
            panel.detach();
        }
        if let Some(panel) = &self.backups {
            panel.detach();
        }
    }

    fn is_loading(&self) -> bool {
        self.activity.as_ref().is_some_and(|p| p.view().is_loading)
            || self.backups.as_ref().is_some_and(|p| p.view().is_loading)
    }

    fn render(&self) -> String {
        let now = Utc::now();
        let mut sections = Vec::new();
        if let Some(panel) = &self.activity {
            sections.push(render_activity_view(&panel.view(), &self.session, now));
        }
        if let Some(panel) = &self.backups {
            sections.push(render_backup_view(&panel.view(), &self.session, now));
        }
        sections.join("\n")
    }

    /// Print a fresh render whenever a panel settles, until `interrupt` resolves
    ///
    /// Each line read from `input` forces an immediate refresh. The interrupt
    /// is polled throughout, including while a refresh is running.
    async fn run_live<I, R>(&self, interrupt: I, input: R) -> Result<()>
    where
        I: Future<Output = std::io::Result<()>>,
        R: AsyncBufRead + Unpin,
    {
        tokio::pin!(interrupt);
        let mut activity_rx = self.activity.as_ref().map(|p| p.subscribe());
        let mut backups_rx = self.backups.as_ref().map(|p| p.subscribe());
        let mut lines = Some(input.lines());
        let mut manual_refresh: Option<LocalBoxFuture<'_, ()>> = None;

        self.set_live(true);
        tokio::select! {
            _ = self.attach() => println!("{}", self.render()),
            signal = &mut interrupt => {
                signal.context("Failed to listen for Ctrl-C")?;
                log::info!("Interrupted during initial load");
                self.detach();
                return Ok(());
            }
        }

        loop {
            tokio::select! {
                changed = async {
                    match activity_rx.as_mut() {
                        Some(rx) => rx.changed().await,
                        None => std::future::pending().await,
                    }
                } => {
                    changed.context("Activity panel closed")?;
                }
                changed = async {
                    match backups_rx.as_mut() {
                        Some(rx) => rx.changed().await,
                        None => std::future::pending().await,
                    }
                } => {
                    changed.context("Backup panel closed")?;
                }
                line = async {
                    match lines.as_mut() {
                        Some(lines) => lines.next_line().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match line {
                        Ok(Some(_)) if manual_refresh.is_none() => {
                            log::debug!("Manual refresh requested");
                            manual_refresh = Some(self.refresh().boxed_local());
                        }
                        Ok(Some(_)) => log::debug!("Refresh already running"),
                        // input closed or unreadable; keep running on the timer
                        Ok(None) | Err(_) => lines = None,
                    }
                    continue;
                }
                _ = async {
                    match manual_refresh.as_mut() {
                        Some(refresh) => refresh.await,
                        None => std::future::pending().await,
                    }
                } => {
                    manual_refresh = None;
                    continue;
                }
                signal = &mut interrupt => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    log::info!("Interrupted, stopping live refresh");
                    break;
                }
            }

            if !self.is_loading() {
                println!("{}", self.render());
            }
        }

        // Cancels any manual refresh still in flight
        drop(manual_refresh);
        self.detach();
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();

    // Load configuration
    let config = DashboardConfig::new().context("Failed to load configuration")?;
    log::info!(
        "OpsDeck starting against {} (refresh every {}s)",
        config.api_base_url,
        config.refresh_interval_secs
    );

    let dashboard = Dashboard::new(&args, &config)?;
    log::debug!("Session: {}", dashboard.session.describe());

    if args.once {
        dashboard.attach().await;
        println!("{}", dashboard.render());
        return Ok(());
    }

    dashboard
        .run_live(tokio::signal::ctrl_c(), BufReader::new(tokio::io::stdin()))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn args(list: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("opsdeck").chain(list.iter().copied())).unwrap()
    }

    /// Answers the first `served` connections with `{}` and leaves the rest hanging
    async fn stalling_server(served: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            let mut accepted = 0;
            while let Ok((mut socket, _)) = listener.accept().await {
                accepted += 1;
                if accepted > served {
                    held.push(socket);
                    continue;
                }
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let response = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                                    Content-Length: 2\r\nConnection: close\r\n\r\n{}";
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}")
    }

    #[test]
    fn test_dashboard_builds_selected_panels() {
        let config = DashboardConfig::default();
        let dashboard = Dashboard::new(&args(&["backups", "--event", "3"]), &config).unwrap();

        assert!(dashboard.activity.is_none());
        assert!(dashboard.backups.is_some());
        assert_eq!(dashboard.session.active_event_id(), Some(3));
        assert!(dashboard.render().contains("Backup Coverage"));
    }

    #[test]
    fn test_dashboard_applies_filter() {
        let config = DashboardConfig::default();
        let dashboard = Dashboard::new(&args(&["activity", "--filter", "media"]), &config).unwrap();

        assert!(dashboard.backups.is_none());
        let panel = dashboard.activity.as_ref().unwrap();
        assert_eq!(panel.filter_bucket(), opsdeck_common::FilterBucket::Media);
    }

    #[tokio::test]
    async fn test_interrupt_during_manual_refresh_stops_live_mode() {
        // Feed and stats for the initial load succeed; the manual refresh hangs
        let config = DashboardConfig {
            api_base_url: stalling_server(2).await,
            ..DashboardConfig::default()
        };
        let dashboard = Dashboard::new(&args(&["activity"]), &config).unwrap();

        let interrupt = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        };
        let input: &[u8] = b"\n";

        let finished =
            tokio::time::timeout(Duration::from_secs(5), dashboard.run_live(interrupt, input))
                .await;

        assert!(finished.is_ok(), "live mode ignored the interrupt");
        finished.unwrap().unwrap();
        assert!(!dashboard.is_loading());
        assert!(dashboard.activity.as_ref().unwrap().view().last_updated.is_some());
    }

    #[tokio::test]
    async fn test_interrupt_during_initial_load_stops_live_mode() {
        let config = DashboardConfig {
            api_base_url: stalling_server(0).await,
            ..DashboardConfig::default()
        };
        let dashboard = Dashboard::new(&args(&["ops"]), &config).unwrap();

        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        };
        let input: &[u8] = b"";

        let finished =
            tokio::time::timeout(Duration::from_secs(5), dashboard.run_live(interrupt, input))
                .await;

        assert!(finished.is_ok(), "initial load ignored the interrupt");
        finished.unwrap().unwrap();
        assert!(!dashboard.is_loading());
    }
}
