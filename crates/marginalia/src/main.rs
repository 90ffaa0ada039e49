use anyhow::Result;
use doccore::Document;
use log::LevelFilter;
use marginalia::{CommandProcessor, Config, DraftStore, Editor, EditorSession, GridGeometry, SessionEvent};
use std::env;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger with debug fallback for development
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("marginalia", LevelFilter::Debug);
    }
    logger.init();

    let config = Config::load().await.unwrap_or_else(|e| {
        log::warn!("Falling back to default config: {}", e);
        Config::default()
    });

    // Optional document JSON from the command line
    let args: Vec<String> = env::args().collect();
    let document = match args.get(1) {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            let document = Document::from_json(&json)?;
            log::info!("Loaded document from {}", path);
            document
        }
        None => Document::empty(),
    };

    let (mut session, mut events) = EditorSession::mount(Some(Editor::new(document)), config)?;
    session.attach_geometry(Box::new(GridGeometry::new(80, 8.0, 20.0)));

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Update(_) => log::debug!("Document updated"),
                SessionEvent::Notice { level, message } => log::info!("[{:?}] {}", level, message),
                other => log::debug!("{:?}", other),
            }
        }
    });

    let drafts = DraftStore::new()?;
    let processor = CommandProcessor::new();
    let mut should_quit = false;
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while !should_quit {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let output = match processor
            .execute_command(&line, &mut session, &drafts, &mut should_quit)
            .await
        {
            Ok(output) => output,
            Err(e) => format!("Error: {}", e),
        };
        if !output.is_empty() {
            stdout.write_all(output.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        session.settle().await;
    }

    session.unmount();
    Ok(())
}
