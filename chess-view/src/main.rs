use anyhow::Result;
use chess_view::client::{self, UserCommand};
use chess_view::console::{self, ConsoleSink};
use chess_view::network;
use chess_view::settings::ClientSettings;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = ClientSettings::load();

    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(settings.log_level.directive().parse()?))
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| settings.server_address.clone());
    info!("Connecting to {} via {:?}", addr, settings.transport);

    let (gateway, inbox) = network::connect(settings.transport, &addr).await?;

    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match console::parse_command(&line) {
                Ok(Some(command)) => {
                    let quit = command == UserCommand::Quit;
                    if cmd_tx.send(command).await.is_err() || quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => println!("{} (commands: <square>, promote <piece>, board, quit)", e),
            }
        }
    });

    client::run(
        gateway,
        inbox,
        cmd_rx,
        ConsoleSink::new(settings.sfx_volume),
        settings.cadence,
    )
    .await?;

    info!("Session ended");
    Ok(())
}
